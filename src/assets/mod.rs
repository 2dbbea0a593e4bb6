//! Asset list reconciliation
//!
//! Tracks, per image-bearing field, which images the server already has,
//! which were added in this session, and which existing ones were removed.
//! At submit time [`Reconcile::diff`] yields exactly what the server needs.
//!
//! Item lifecycle:
//! - existing → existing-pending-removal (listed in the deletion manifest)
//! - new → discarded (gone, preview released, nothing recorded)
//!
//! Neither terminal state returns to active; re-adding creates a new item.

mod collection;
mod preview;
mod slot;

pub use collection::AssetCollection;
pub use preview::{PreviewHandle, PreviewRegistry};
pub use slot::AssetSlot;

use crate::types::{AssetId, MediaFile};

/// Where an item came from
#[derive(Debug)]
pub enum AssetOrigin {
    /// Known to the server when the form opened
    Existing {
        /// Durable reference URL
        url: String,
    },
    /// Selected in this session
    New {
        /// Prepared file contents
        file: MediaFile,
        /// Thumbnail handle, released when the item leaves the form
        preview: PreviewHandle,
    },
}

/// Lifecycle status of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStatus {
    /// Part of the current selection
    Active,
    /// Existing item the user removed
    PendingRemoval,
}

/// One managed image
///
/// The origin is fixed at creation; only the status moves.
#[derive(Debug)]
pub struct AssetItem {
    id: AssetId,
    origin: AssetOrigin,
    status: AssetStatus,
}

impl AssetItem {
    pub(crate) const fn existing(id: AssetId, url: String) -> Self {
        Self {
            id,
            origin: AssetOrigin::Existing { url },
            status: AssetStatus::Active,
        }
    }

    pub(crate) fn new_file(id: AssetId, file: MediaFile, previews: &PreviewRegistry) -> Self {
        let preview = previews.create(&file);
        Self {
            id,
            origin: AssetOrigin::New { file, preview },
            status: AssetStatus::Active,
        }
    }

    /// Item id
    pub const fn id(&self) -> AssetId {
        self.id
    }

    /// Item origin
    pub const fn origin(&self) -> &AssetOrigin {
        &self.origin
    }

    /// Current status
    pub const fn status(&self) -> AssetStatus {
        self.status
    }

    /// Whether the item is still part of the selection
    pub fn is_active(&self) -> bool {
        self.status == AssetStatus::Active
    }

    /// Reference URL of an existing item
    pub fn url(&self) -> Option<&str> {
        match &self.origin {
            AssetOrigin::Existing { url } => Some(url),
            AssetOrigin::New { .. } => None,
        }
    }

    /// File of a new item
    pub const fn file(&self) -> Option<&MediaFile> {
        match &self.origin {
            AssetOrigin::Existing { .. } => None,
            AssetOrigin::New { file, .. } => Some(file),
        }
    }

    /// What a UI renders for this item: the server URL or the preview locator
    pub fn display_source(&self) -> String {
        match &self.origin {
            AssetOrigin::Existing { url } => url.clone(),
            AssetOrigin::New { preview, .. } => preview.locator(),
        }
    }

    /// Move an existing item to pending-removal
    pub(crate) fn mark_removed(&mut self) {
        self.status = AssetStatus::PendingRemoval;
    }

    /// Drop a new item, releasing its preview
    pub(crate) fn discard(self) {
        if let AssetOrigin::New { preview, .. } = self.origin {
            preview.release();
        }
    }
}

/// What changed in a field relative to its baseline
///
/// A snapshot borrowed from the reconciler; computing it never mutates state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetDiff<'a> {
    /// Existing references still selected, in server order
    pub keep_existing: Vec<&'a str>,
    /// New files, in insertion order
    pub new_items: Vec<&'a MediaFile>,
    /// Baseline references the server should delete
    pub deletions: Vec<&'a str>,
}

impl AssetDiff<'_> {
    /// Whether the server needs to be told anything about this field
    pub fn is_unchanged(&self) -> bool {
        self.new_items.is_empty() && self.deletions.is_empty()
    }
}

/// Shared behaviour of slots and collections
pub trait Reconcile {
    /// Multipart field name
    fn field(&self) -> &str;

    /// Diff current state against the seeded baseline
    fn diff(&self) -> AssetDiff<'_>;

    /// Number of active items
    fn active_len(&self) -> usize;

    /// Drop all state, releasing previews, ready to be seeded again
    fn reset(&mut self);
}
