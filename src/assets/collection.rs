//! Ordered multi-image field

use crate::assets::{AssetDiff, AssetItem, PreviewRegistry, Reconcile};
use crate::error::{Error, Result};
use crate::types::{AssetId, MediaFile};
use std::collections::HashSet;
use tracing::debug;

/// Ordered sequence of images
///
/// Existing items keep server order; new items follow in insertion order.
/// The collection itself is unbounded; callers enforce caps through
/// [`Reconcile::active_len`].
#[derive(Debug)]
pub struct AssetCollection {
    field: String,
    deletion_field: String,
    items: Vec<AssetItem>,
    baseline: HashSet<String>,
    seeded: bool,
    next_id: u64,
    previews: PreviewRegistry,
}

impl AssetCollection {
    /// Create an unseeded collection for a multipart field
    ///
    /// The deletion manifest goes under `deleted<Field>s` unless overridden
    /// with [`AssetCollection::with_deletion_field`].
    pub fn new(field: impl Into<String>, previews: PreviewRegistry) -> Self {
        let field = field.into();
        Self {
            deletion_field: default_deletion_field(&field),
            field,
            items: Vec::new(),
            baseline: HashSet::new(),
            seeded: false,
            next_id: 0,
            previews,
        }
    }

    /// Override the multipart field carrying the deletion manifest
    #[must_use]
    pub fn with_deletion_field(mut self, name: impl Into<String>) -> Self {
        self.deletion_field = name.into();
        self
    }

    /// Multipart field carrying the deletion manifest
    pub fn deletion_field(&self) -> &str {
        &self.deletion_field
    }

    /// Initialize from the entity's current server images, in server order
    pub fn seed<I>(&mut self, existing: I) -> Result<Vec<AssetId>>
    where
        I: IntoIterator<Item = String>,
    {
        if self.seeded {
            return Err(Error::AlreadySeeded(self.field.clone()));
        }
        self.seeded = true;

        let mut ids = Vec::new();
        for url in existing {
            if !self.baseline.insert(url.clone()) {
                debug!("Collection {}: ignoring duplicate {url}", self.field);
                continue;
            }
            let id = self.allocate_id();
            self.items.push(AssetItem::existing(id, url));
            ids.push(id);
        }
        Ok(ids)
    }

    /// Append a new file
    pub fn add(&mut self, file: MediaFile) -> AssetId {
        let id = self.allocate_id();
        debug!("Collection {}: add {} as {id}", self.field, file.name);
        self.items.push(AssetItem::new_file(id, file, &self.previews));
        id
    }

    /// Remove an active item
    ///
    /// Existing items move to pending-removal; new items are discarded.
    pub fn remove(&mut self, id: AssetId) -> Result<()> {
        let idx = self
            .items
            .iter()
            .position(|item| item.id() == id && item.is_active())
            .ok_or(Error::UnknownAsset(id))?;

        if self.items[idx].url().is_some() {
            self.items[idx].mark_removed();
        } else {
            self.items.remove(idx).discard();
        }
        Ok(())
    }

    /// Find the active existing item with this reference
    pub fn find_existing(&self, url: &str) -> Option<AssetId> {
        self.active().find(|item| item.url() == Some(url)).map(AssetItem::id)
    }

    /// Active items in display order
    pub fn active(&self) -> impl Iterator<Item = &AssetItem> {
        self.items.iter().filter(|item| item.is_active())
    }

    const fn allocate_id(&mut self) -> AssetId {
        self.next_id += 1;
        AssetId(self.next_id)
    }
}

/// `heroImage` → `deletedHeroImages`, `images` → `deletedImages`
fn default_deletion_field(field: &str) -> String {
    let mut chars = field.chars();
    let capitalized: String = chars
        .next()
        .map(|c| c.to_uppercase().chain(chars).collect())
        .unwrap_or_default();
    let plural = if capitalized.ends_with('s') { "" } else { "s" };
    format!("deleted{capitalized}{plural}")
}

impl Reconcile for AssetCollection {
    fn field(&self) -> &str {
        &self.field
    }

    fn diff(&self) -> AssetDiff<'_> {
        let mut diff = AssetDiff::default();

        for item in &self.items {
            match (item.url(), item.file(), item.is_active()) {
                (Some(url), _, true) => diff.keep_existing.push(url),
                (Some(url), _, false) if self.baseline.contains(url) => {
                    diff.deletions.push(url);
                }
                (None, Some(file), true) => diff.new_items.push(file),
                _ => {}
            }
        }

        diff
    }

    fn active_len(&self) -> usize {
        self.active().count()
    }

    fn reset(&mut self) {
        for item in self.items.drain(..) {
            item.discard();
        }
        self.baseline.clear();
        self.seeded = false;
    }
}
