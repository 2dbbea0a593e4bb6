//! Core types for storefront-media

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// MIME type for PNG output
pub const MIME_PNG: &str = "image/png";

/// MIME type for JPEG output
pub const MIME_JPEG: &str = "image/jpeg";

/// Fallback MIME type for files with no recognizable extension
pub const MIME_UNKNOWN: &str = "application/octet-stream";

/// Identifier of an asset, unique within its slot or collection for one form session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub u64);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An in-memory image file with its declared MIME type
#[derive(Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// File name including extension
    pub name: String,
    /// Declared MIME type
    pub mime: String,
    /// Raw file contents
    pub bytes: Vec<u8>,
}

impl fmt::Debug for MediaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl MediaFile {
    /// Create a file from a name, declared MIME type, and contents
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, deriving the MIME type from its extension
    pub async fn read(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());
        let mime = mime_for_name(&name).to_string();
        Ok(Self { name, mime, bytes })
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// File name without its final extension
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 => &self.name[..idx],
            _ => &self.name,
        }
    }

    /// Whether the declared type is PNG or JPEG
    pub fn is_canonical(&self) -> bool {
        is_canonical_mime(&self.mime)
    }

    /// Same stem with a new extension
    pub fn renamed(&self, extension: &str) -> String {
        format!("{}.{extension}", self.stem())
    }
}

/// Whether a MIME type is one of the canonical raster encodings
pub fn is_canonical_mime(mime: &str) -> bool {
    let mime = mime.trim().to_ascii_lowercase();
    matches!(mime.as_str(), "image/png" | "image/jpeg" | "image/jpg")
}

/// Guess a MIME type from a file name's extension
pub fn mime_for_name(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => MIME_PNG,
        "jpg" | "jpeg" => MIME_JPEG,
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "ico" => "image/x-icon",
        "heic" => "image/heic",
        "avif" => "image/avif",
        _ => MIME_UNKNOWN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_strips_last_extension() {
        let file = MediaFile::new("summer.sale.webp", "image/webp", vec![]);
        assert_eq!(file.stem(), "summer.sale");
        assert_eq!(file.renamed("png"), "summer.sale.png");
    }

    #[test]
    fn test_stem_without_extension() {
        assert_eq!(MediaFile::new("banner", "image/gif", vec![]).stem(), "banner");
        assert_eq!(MediaFile::new(".hidden", "image/gif", vec![]).stem(), ".hidden");
    }

    #[test]
    fn test_canonical_mime() {
        assert!(is_canonical_mime("image/png"));
        assert!(is_canonical_mime("IMAGE/JPEG"));
        assert!(is_canonical_mime("image/jpg"));
        assert!(!is_canonical_mime("image/webp"));
        assert!(!is_canonical_mime(""));
    }

    #[test]
    fn test_mime_for_name() {
        assert_eq!(mime_for_name("a.PNG"), MIME_PNG);
        assert_eq!(mime_for_name("a.jpeg"), MIME_JPEG);
        assert_eq!(mime_for_name("a.webp"), "image/webp");
        assert_eq!(mime_for_name("README"), MIME_UNKNOWN);
    }

    #[test]
    fn test_debug_hides_bytes() {
        let file = MediaFile::new("a.png", MIME_PNG, vec![0; 1024]);
        let debug = format!("{file:?}");
        assert!(debug.contains("size: 1024"));
        assert!(!debug.contains("bytes"));
    }
}
