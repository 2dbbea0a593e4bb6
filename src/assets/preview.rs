//! Preview handles for newly selected images
//!
//! A preview handle stands in for an in-memory buffer while a thumbnail is
//! rendered before upload. Every handle must be released when its item is
//! discarded or its form goes away; the registry tracks what is still
//! outstanding so leaks show up in tests.

use crate::types::MediaFile;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::debug;

#[derive(Debug, Default)]
struct RegistryState {
    next_id: u64,
    live: HashMap<u64, String>,
}

/// Issues and tracks preview handles
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl PreviewRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a handle for a file
    pub fn create(&self, file: &MediaFile) -> PreviewHandle {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.next_id += 1;
        let id = state.next_id;
        state.live.insert(id, file.name.clone());

        PreviewHandle {
            id,
            registry: Arc::downgrade(&self.state),
        }
    }

    /// Number of handles not yet released
    pub fn live(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .live
            .len()
    }

    /// Whether a locator still refers to a live handle
    pub fn is_live(&self, locator: &str) -> bool {
        let Some(id) = locator
            .strip_prefix(LOCATOR_PREFIX)
            .and_then(|n| n.parse::<u64>().ok())
        else {
            return false;
        };

        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .live
            .contains_key(&id)
    }
}

const LOCATOR_PREFIX: &str = "preview://";

/// Handle to a rendered preview of an unsubmitted image
///
/// Released explicitly with [`PreviewHandle::release`] or implicitly on drop.
pub struct PreviewHandle {
    id: u64,
    registry: Weak<Mutex<RegistryState>>,
}

impl PreviewHandle {
    /// Locator a UI can use to render the thumbnail
    pub fn locator(&self) -> String {
        format!("{LOCATOR_PREFIX}{}", self.id)
    }

    /// Release the preview
    pub fn release(self) {
        // Drop does the work
    }

    fn release_inner(&self) {
        let Some(state) = self.registry.upgrade() else {
            return;
        };
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(name) = state.live.remove(&self.id) {
            debug!("Released preview {} for {name}", self.id);
        }
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PreviewHandle").field(&self.locator()).finish()
    }
}
