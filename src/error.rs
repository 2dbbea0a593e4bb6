//! Error types for storefront-media

use crate::types::AssetId;
use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the media pipeline and its collaborators
#[derive(Debug, Error)]
pub enum Error {
    /// Input could not be decoded as a raster image
    #[error("unsupported image format for {name}: {reason}")]
    UnsupportedFormat {
        /// File name as selected by the user
        name: String,
        /// Decoder message
        reason: String,
    },

    /// Recompression of an oversized image failed
    #[error("compression failed for {name}: {reason}")]
    CompressionFailure {
        /// File name as selected by the user
        name: String,
        /// Encoder or decoder message
        reason: String,
    },

    /// Required scalar field missing or malformed, or a cap exceeded
    #[error("validation failed: {0}")]
    Validation(String),

    /// Submission rejected by the server or failed in transit
    #[error("{}", transport_message(*status, message))]
    Transport {
        /// HTTP status, when a response was received
        status: Option<u16>,
        /// Server-provided or network error message
        message: String,
    },

    /// No active item with this id in the slot or collection
    #[error("unknown asset: {0}")]
    UnknownAsset(AssetId),

    /// The form has no image field with this name
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// A slot or collection was seeded twice without a reset
    #[error("field already seeded: {0}")]
    AlreadySeeded(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Image codec error
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

fn transport_message(status: Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("submission failed ({code}): {message}"),
        None => format!("submission failed: {message}"),
    }
}

impl Error {
    /// Whether this error is contained to a single file and never blocks a submission
    pub const fn is_per_file(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat { .. } | Self::CompressionFailure { .. }
        )
    }
}
