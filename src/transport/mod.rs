//! Transport collaborators
//!
//! The pipeline hands a finished payload to a [`Transport`] and never
//! retries on its own. [`HttpTransport`] is the reqwest implementation;
//! tests substitute a recording mock.

mod http;

pub use http::{HttpTransport, CHUNK_SIZE};

use crate::error::Result;
use crate::submit::{ProgressSink, SubmissionPayload};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// HTTP method implied by the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Create a new entity (`POST /<resource>`)
    Create,
    /// Update an existing entity (`PUT /<resource>/<id>`)
    Update,
}

/// Which entity a submission is for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    /// API resource path segment, e.g. `product`
    pub resource: String,
    /// Entity id when editing
    pub id: Option<String>,
}

impl UploadTarget {
    /// Target for creating a new entity
    pub fn create(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            id: None,
        }
    }

    /// Target for updating an existing entity
    pub fn update(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            id: Some(id.into()),
        }
    }

    /// Create or update
    pub const fn method(&self) -> Method {
        if self.id.is_some() {
            Method::Update
        } else {
            Method::Create
        }
    }

    /// Path relative to the API base, ids percent-encoded
    pub fn path(&self) -> String {
        match &self.id {
            Some(id) => format!("{}/{}", self.resource, urlencoding::encode(id)),
            None => self.resource.clone(),
        }
    }
}

impl fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.method() {
            Method::Create => "POST",
            Method::Update => "PUT",
        };
        write!(f, "{verb} /{}", self.path())
    }
}

/// One submission handed to a transport
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Where to send it
    pub target: UploadTarget,
    /// What to send
    pub payload: SubmissionPayload,
}

/// Sends assembled payloads to the persistence service
///
/// Implementations report `(loaded, total)` through the sink as bytes are
/// handed off and return the entity from the server's `{ "data": ... }`
/// envelope. Non-2xx responses and network failures map to
/// [`crate::error::Error::Transport`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request
    async fn send(&self, request: UploadRequest, progress: ProgressSink) -> Result<Value>;
}
