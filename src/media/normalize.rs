//! Format normalization
//!
//! Guarantees every candidate image is PNG or JPEG before it goes any
//! further. Anything else is decoded and re-encoded as PNG at its native
//! pixel size.

use crate::error::{Error, Result};
use crate::types::{MediaFile, MIME_PNG};
use image::ImageOutputFormat;
use std::io::Cursor;
use tracing::debug;

/// Normalize a file to a canonical raster encoding
///
/// PNG and JPEG inputs are returned untouched. Other inputs are decoded by
/// sniffing their content (declared types are often wrong) and re-encoded
/// as PNG under `<stem>.png`. Decoding runs on the blocking pool.
pub async fn normalize(file: MediaFile) -> Result<MediaFile> {
    if file.is_canonical() {
        return Ok(file);
    }

    tokio::task::spawn_blocking(move || normalize_blocking(&file))
        .await
        .map_err(|e| Error::Internal(format!("normalize task failed: {e}")))?
}

/// Synchronous normalization body
pub fn normalize_blocking(file: &MediaFile) -> Result<MediaFile> {
    if file.is_canonical() {
        return Ok(file.clone());
    }

    let img = image::load_from_memory(&file.bytes).map_err(|e| Error::UnsupportedFormat {
        name: file.name.clone(),
        reason: e.to_string(),
    })?;

    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageOutputFormat::Png)
        .map_err(|e| Error::UnsupportedFormat {
            name: file.name.clone(),
            reason: format!("PNG encode failed: {e}"),
        })?;

    let converted = MediaFile::new(file.renamed("png"), MIME_PNG, out.into_inner());
    debug!(
        "Normalized {} ({}) to {} ({} -> {} bytes)",
        file.name,
        file.mime,
        converted.name,
        file.size(),
        converted.size()
    );

    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MIME_JPEG;
    use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

    fn checkerboard(width: u32, height: u32) -> DynamicImage {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        DynamicImage::ImageRgba8(img)
    }

    fn encode(img: &DynamicImage, format: ImageOutputFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    #[tokio::test]
    async fn test_canonical_input_returned_unchanged() {
        let png = MediaFile::new("logo.png", MIME_PNG, vec![1, 2, 3]);
        let jpeg = MediaFile::new("hero.jpg", MIME_JPEG, vec![4, 5, 6]);

        assert_eq!(normalize(png.clone()).await.unwrap(), png);
        assert_eq!(normalize(jpeg.clone()).await.unwrap(), jpeg);
    }

    #[tokio::test]
    async fn test_non_canonical_converted_to_png() {
        let img = checkerboard(7, 5);
        let bmp = MediaFile::new("banner.bmp", "image/bmp", encode(&img, ImageOutputFormat::Bmp));

        let out = normalize(bmp).await.unwrap();

        assert_eq!(out.mime, MIME_PNG);
        assert_eq!(out.name, "banner.png");
        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!(decoded.to_rgba8(), img.to_rgba8());
    }

    #[tokio::test]
    async fn test_mislabelled_webp_decoded_by_content() {
        let img = checkerboard(4, 4);
        let file = MediaFile::new("promo.webp", "image/webp", encode(&img, ImageOutputFormat::Gif));

        let out = normalize(file).await.unwrap();

        assert_eq!(out.mime, MIME_PNG);
        assert_eq!(out.name, "promo.png");
        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (4, 4));
    }

    #[tokio::test]
    async fn test_corrupt_input_is_unsupported() {
        let file = MediaFile::new("broken.webp", "image/webp", b"not an image".to_vec());

        let err = normalize(file).await.unwrap_err();

        match err {
            Error::UnsupportedFormat { name, .. } => assert_eq!(name, "broken.webp"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }
}
