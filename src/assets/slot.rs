//! Single-image field

use crate::assets::{AssetDiff, AssetItem, PreviewRegistry, Reconcile};
use crate::error::{Error, Result};
use crate::types::{AssetId, MediaFile};
use tracing::debug;

/// Holds at most one image
///
/// Replacing a new item discards it outright. Replacing or removing the
/// existing item puts its reference in the deletion manifest.
#[derive(Debug)]
pub struct AssetSlot {
    field: String,
    current: Option<AssetItem>,
    retired: Option<AssetItem>,
    baseline: Option<String>,
    seeded: bool,
    next_id: u64,
    previews: PreviewRegistry,
}

impl AssetSlot {
    /// Create an unseeded slot for a multipart field
    pub fn new(field: impl Into<String>, previews: PreviewRegistry) -> Self {
        Self {
            field: field.into(),
            current: None,
            retired: None,
            baseline: None,
            seeded: false,
            next_id: 0,
            previews,
        }
    }

    /// Initialize from the entity's current server value
    pub fn seed(&mut self, existing: Option<String>) -> Result<Option<AssetId>> {
        if self.seeded {
            return Err(Error::AlreadySeeded(self.field.clone()));
        }
        self.seeded = true;
        self.baseline.clone_from(&existing);

        let id = existing.map(|url| {
            let id = self.allocate_id();
            self.current = Some(AssetItem::existing(id, url));
            id
        });
        Ok(id)
    }

    /// Put a new file in the slot, displacing whatever was there
    pub fn replace(&mut self, file: MediaFile) -> AssetId {
        self.retire_current();
        let id = self.allocate_id();
        debug!("Slot {}: {} -> {id}", self.field, file.name);
        self.current = Some(AssetItem::new_file(id, file, &self.previews));
        id
    }

    /// Remove the item with this id
    pub fn remove(&mut self, id: AssetId) -> Result<()> {
        if self.current.as_ref().map(AssetItem::id) != Some(id) {
            return Err(Error::UnknownAsset(id));
        }
        self.retire_current();
        Ok(())
    }

    /// Empty the slot
    pub fn clear(&mut self) {
        self.retire_current();
    }

    /// The active item, if any
    pub const fn current(&self) -> Option<&AssetItem> {
        self.current.as_ref()
    }

    /// Whether the slot holds anything
    pub const fn is_filled(&self) -> bool {
        self.current.is_some()
    }

    fn retire_current(&mut self) {
        let Some(mut item) = self.current.take() else {
            return;
        };
        if item.url().is_some() {
            item.mark_removed();
            self.retired = Some(item);
        } else {
            item.discard();
        }
    }

    const fn allocate_id(&mut self) -> AssetId {
        self.next_id += 1;
        AssetId(self.next_id)
    }
}

impl Reconcile for AssetSlot {
    fn field(&self) -> &str {
        &self.field
    }

    fn diff(&self) -> AssetDiff<'_> {
        let mut diff = AssetDiff::default();

        if let Some(item) = &self.current {
            if let Some(url) = item.url() {
                diff.keep_existing.push(url);
            } else if let Some(file) = item.file() {
                diff.new_items.push(file);
            }
        }

        if let (Some(retired), Some(baseline)) = (&self.retired, &self.baseline) {
            if let Some(url) = retired.url().filter(|u| *u == baseline.as_str()) {
                diff.deletions.push(url);
            }
        }

        diff
    }

    fn active_len(&self) -> usize {
        usize::from(self.current.is_some())
    }

    fn reset(&mut self) {
        if let Some(item) = self.current.take() {
            item.discard();
        }
        self.retired = None;
        self.baseline = None;
        self.seeded = false;
    }
}
