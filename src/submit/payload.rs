//! Payload assembly
//!
//! Turns scalar fields plus slot and collection state into the ordered list
//! of multipart parts the server expects:
//! - scalars verbatim, string-encoded
//! - a slot's file only when the slot holds a new item
//! - each new collection item under the collection's field, insertion order
//! - the collection's deletion manifest as one JSON array, only when non-empty

use crate::assets::{AssetCollection, AssetSlot, Reconcile};
use crate::error::Result;
use crate::types::MediaFile;
use tracing::debug;

/// One multipart part
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadPart {
    /// Text field
    Text {
        /// Field name
        name: String,
        /// Field value
        value: String,
    },
    /// Binary file field
    File {
        /// Field name
        name: String,
        /// File contents
        file: MediaFile,
    },
}

impl PayloadPart {
    /// Field name of this part
    pub fn name(&self) -> &str {
        match self {
            Self::Text { name, .. } | Self::File { name, .. } => name,
        }
    }

    /// Bytes this part contributes to the declared total
    pub fn len(&self) -> u64 {
        match self {
            Self::Text { value, .. } => value.len() as u64,
            Self::File { file, .. } => file.size(),
        }
    }

    /// Whether the part carries no bytes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outbound multipart payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionPayload {
    parts: Vec<PayloadPart>,
}

impl From<Vec<PayloadPart>> for SubmissionPayload {
    fn from(parts: Vec<PayloadPart>) -> Self {
        Self { parts }
    }
}

impl SubmissionPayload {
    /// All parts in wire order
    pub fn parts(&self) -> &[PayloadPart] {
        &self.parts
    }

    /// Consume into parts
    pub fn into_parts(self) -> Vec<PayloadPart> {
        self.parts
    }

    /// First text value for a field
    pub fn text(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            PayloadPart::Text { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// Every file attached under a field, in order
    pub fn files(&self, name: &str) -> Vec<&MediaFile> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                PayloadPart::File { name: n, file } if n == name => Some(file),
                _ => None,
            })
            .collect()
    }

    /// Whether any part uses this field name
    pub fn has_field(&self, name: &str) -> bool {
        self.parts.iter().any(|part| part.name() == name)
    }

    /// Declared total size used for progress reporting
    pub fn total_bytes(&self) -> u64 {
        self.parts.iter().map(PayloadPart::len).sum()
    }

    /// Number of binary parts
    pub fn file_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|part| matches!(part, PayloadPart::File { .. }))
            .count()
    }

    fn push_text(&mut self, name: &str, value: impl Into<String>) {
        self.parts.push(PayloadPart::Text {
            name: name.to_string(),
            value: value.into(),
        });
    }

    fn push_file(&mut self, name: &str, file: &MediaFile) {
        self.parts.push(PayloadPart::File {
            name: name.to_string(),
            file: file.clone(),
        });
    }
}

/// Build the outbound payload
///
/// Reads each reconciler's diff once; nothing is mutated, so a failed
/// submission can be assembled again from the same state.
pub fn assemble(
    fields: &[(String, String)],
    slots: &[&AssetSlot],
    collections: &[&AssetCollection],
) -> Result<SubmissionPayload> {
    let mut payload = SubmissionPayload::default();

    for (name, value) in fields {
        payload.push_text(name, value.as_str());
    }

    for slot in slots {
        let diff = slot.diff();
        // Absent field means "keep the current server value"
        for file in diff.new_items {
            payload.push_file(slot.field(), file);
        }
    }

    for collection in collections {
        let diff = collection.diff();
        for file in &diff.new_items {
            payload.push_file(collection.field(), file);
        }
        if !diff.deletions.is_empty() {
            let manifest = serde_json::to_string(&diff.deletions)?;
            payload.push_text(collection.deletion_field(), manifest);
        }
        debug!(
            "Collection {}: keep {}, add {}, delete {}",
            collection.field(),
            diff.keep_existing.len(),
            diff.new_items.len(),
            diff.deletions.len()
        );
    }

    Ok(payload)
}
