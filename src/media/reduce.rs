//! Conditional size reduction
//!
//! Files at or under the threshold pass through untouched. Larger files are
//! fit to a maximum edge and recompressed until they land under the target
//! size. A failed recompression is never fatal: the original file is handed
//! back together with the error so the caller can warn about it.

use crate::error::Error;
use crate::types::{MediaFile, MIME_JPEG, MIME_PNG};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Files larger than this are recompressed (500 KiB)
pub const DEFAULT_THRESHOLD_BYTES: u64 = 500 * 1024;

/// Size ceiling recompression aims for (0.5 MB)
pub const DEFAULT_TARGET_BYTES: u64 = 512 * 1024;

/// Longer-edge bound for landing and most form images
pub const STANDARD_MAX_DIMENSION: u32 = 1280;

/// Longer-edge bound for catalog images
pub const CATALOG_MAX_DIMENSION: u32 = 1920;

const INITIAL_QUALITY: u8 = 90;
const QUALITY_STEP: u8 = 10;
const MIN_QUALITY: u8 = 40;
const SCALE_STEP: f64 = 0.8;
const MIN_EDGE: u32 = 64;

/// Reduction budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReduceOptions {
    /// Files at or below this size are left alone
    pub threshold_bytes: u64,
    /// Bound on the longer edge after reduction
    pub max_dimension_px: u32,
    /// Size ceiling for the recompressed output
    pub target_bytes: u64,
}

impl ReduceOptions {
    /// Preset for landing page and most form images
    pub const fn standard() -> Self {
        Self {
            threshold_bytes: DEFAULT_THRESHOLD_BYTES,
            max_dimension_px: STANDARD_MAX_DIMENSION,
            target_bytes: DEFAULT_TARGET_BYTES,
        }
    }

    /// Preset for catalog product and category images
    pub const fn catalog() -> Self {
        Self {
            max_dimension_px: CATALOG_MAX_DIMENSION,
            ..Self::standard()
        }
    }
}

impl Default for ReduceOptions {
    fn default() -> Self {
        Self::standard()
    }
}

/// What happened to a file passed through the reducer
#[derive(Debug)]
pub enum ReduceOutcome {
    /// Under threshold, or recompression would not have helped
    Untouched,
    /// Recompressed
    Compressed {
        /// Size before
        original_bytes: u64,
        /// Size after
        final_bytes: u64,
    },
    /// Recompression failed; the original is returned
    Failed(Error),
}

/// Reducer output: always a usable file, plus what happened to it
#[derive(Debug)]
pub struct Reduced {
    /// The file to submit
    pub file: MediaFile,
    /// Advisory outcome
    pub outcome: ReduceOutcome,
}

impl Reduced {
    const fn untouched(file: MediaFile) -> Self {
        Self {
            file,
            outcome: ReduceOutcome::Untouched,
        }
    }

    /// Discard the outcome and keep the file
    pub fn into_file(self) -> MediaFile {
        self.file
    }
}

/// Shrink a file if it exceeds the threshold
///
/// Never fails: on any recompression error the original file is returned
/// with [`ReduceOutcome::Failed`].
pub async fn reduce_if_large(file: MediaFile, options: ReduceOptions) -> Reduced {
    if file.size() <= options.threshold_bytes {
        return Reduced::untouched(file);
    }

    let original = Arc::new(file);
    let input = Arc::clone(&original);
    let joined = tokio::task::spawn_blocking(move || recompress(&input, &options)).await;
    let file = Arc::try_unwrap(original).unwrap_or_else(|shared| (*shared).clone());

    let result = joined.unwrap_or_else(|e| {
        Err(Error::CompressionFailure {
            name: file.name.clone(),
            reason: format!("compression task failed: {e}"),
        })
    });

    settle(file, result)
}

/// Synchronous variant of [`reduce_if_large`]
pub fn reduce_if_large_blocking(file: MediaFile, options: &ReduceOptions) -> Reduced {
    if file.size() <= options.threshold_bytes {
        return Reduced::untouched(file);
    }

    let result = recompress(&file, options);
    settle(file, result)
}

fn settle(file: MediaFile, result: Result<Option<MediaFile>, Error>) -> Reduced {
    match result {
        Ok(Some(smaller)) => {
            let original_bytes = file.size();
            let final_bytes = smaller.size();
            info!(
                "Compressed {}: {} KiB -> {} KiB",
                file.name,
                original_bytes / 1024,
                final_bytes / 1024
            );
            Reduced {
                file: smaller,
                outcome: ReduceOutcome::Compressed {
                    original_bytes,
                    final_bytes,
                },
            }
        }
        Ok(None) => {
            debug!("Recompression did not shrink {}, keeping original", file.name);
            Reduced::untouched(file)
        }
        Err(e) => {
            warn!("Image compression failed, using original: {e}");
            Reduced {
                file,
                outcome: ReduceOutcome::Failed(e),
            }
        }
    }
}

/// Recompress, returning `None` when the result is not smaller than the input
fn recompress(file: &MediaFile, options: &ReduceOptions) -> Result<Option<MediaFile>, Error> {
    let failure = |reason: String| Error::CompressionFailure {
        name: file.name.clone(),
        reason,
    };

    let img = image::load_from_memory(&file.bytes).map_err(|e| failure(e.to_string()))?;
    let keep_png = has_transparency(&img);
    let mut img = fit_within(img, options.max_dimension_px);

    let mut best: Option<Vec<u8>> = None;
    loop {
        let candidate = if keep_png {
            encode(&img, ImageOutputFormat::Png)
        } else {
            encode_jpeg_to_target(&img, options.target_bytes)
        }
        .map_err(|e| failure(e.to_string()))?;

        let fits = candidate.len() as u64 <= options.target_bytes;
        if best.as_ref().is_none_or(|b| candidate.len() < b.len()) {
            best = Some(candidate);
        }

        let (w, h) = img.dimensions();
        if fits || w.max(h) <= MIN_EDGE {
            break;
        }

        debug!("{} still above target at {w}x{h}, scaling down", file.name);
        img = scale(&img, SCALE_STEP);
    }

    let Some(bytes) = best else {
        return Err(failure("no encoding produced".to_string()));
    };

    if bytes.len() as u64 >= file.size() {
        return Ok(None);
    }

    let (name, mime) = if keep_png {
        (file.renamed("png"), MIME_PNG)
    } else {
        (file.renamed("jpg"), MIME_JPEG)
    };

    Ok(Some(MediaFile::new(name, mime, bytes)))
}

/// Encode as JPEG, stepping quality down until under target or at the floor
fn encode_jpeg_to_target(img: &DynamicImage, target_bytes: u64) -> image::ImageResult<Vec<u8>> {
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut quality = INITIAL_QUALITY;
    loop {
        let bytes = encode(&rgb, ImageOutputFormat::Jpeg(quality))?;
        if bytes.len() as u64 <= target_bytes || quality <= MIN_QUALITY {
            return Ok(bytes);
        }
        quality = quality.saturating_sub(QUALITY_STEP).max(MIN_QUALITY);
    }
}

fn encode(img: &DynamicImage, format: ImageOutputFormat) -> image::ImageResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format)?;
    Ok(out.into_inner())
}

fn has_transparency(img: &DynamicImage) -> bool {
    if !img.color().has_alpha() {
        return false;
    }
    img.to_rgba8().pixels().any(|p| p.0[3] < u8::MAX)
}

fn fit_within(img: DynamicImage, max_edge: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    if w.max(h) <= max_edge {
        return img;
    }
    img.resize(max_edge, max_edge, FilterType::Triangle)
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn scale(img: &DynamicImage, factor: f64) -> DynamicImage {
    let (w, h) = img.dimensions();
    let nw = ((f64::from(w) * factor).round() as u32).max(1);
    let nh = ((f64::from(h) * factor).round() as u32).max(1);
    img.resize(nw, nh, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    /// Deterministic per-pixel noise
    fn noise(x: u32, y: u32, salt: u32) -> u8 {
        let mut v = x.wrapping_mul(0x9E37_79B1) ^ y.wrapping_mul(0x85EB_CA77) ^ salt;
        v ^= v >> 15;
        v = v.wrapping_mul(0x2C1B_3C6D);
        v ^= v >> 12;
        (v & 0xFF) as u8
    }

    /// Smooth gradient with grain, so it is large at high quality but shrinks well
    fn grainy_photo(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            let base = ((x + y) % 224) as u8;
            Rgb([
                base + noise(x, y, 1) / 8,
                base + noise(x, y, 2) / 8,
                base + noise(x, y, 3) / 8,
            ])
        }))
    }

    fn to_file(name: &str, img: &DynamicImage, format: ImageOutputFormat, mime: &str) -> MediaFile {
        MediaFile::new(name, mime, encode(img, format).unwrap())
    }

    #[tokio::test]
    async fn test_small_file_returned_byte_for_byte() {
        let file = MediaFile::new("tiny.jpg", MIME_JPEG, b"not even decoded".to_vec());

        let reduced = reduce_if_large(file.clone(), ReduceOptions::standard()).await;

        assert!(matches!(reduced.outcome, ReduceOutcome::Untouched));
        assert_eq!(reduced.file, file);
    }

    #[tokio::test]
    async fn test_file_exactly_at_threshold_untouched() {
        let options = ReduceOptions {
            threshold_bytes: 16,
            ..ReduceOptions::standard()
        };
        let file = MediaFile::new("edge.png", MIME_PNG, vec![7; 16]);

        let reduced = reduce_if_large(file.clone(), options).await;

        assert!(matches!(reduced.outcome, ReduceOutcome::Untouched));
        assert_eq!(reduced.file, file);
    }

    #[tokio::test]
    async fn test_large_photo_fits_budget() {
        let img = grainy_photo(4000, 3000);
        let file = to_file("storefront.jpg", &img, ImageOutputFormat::Jpeg(95), MIME_JPEG);
        assert!(file.size() > DEFAULT_THRESHOLD_BYTES);

        let reduced = reduce_if_large(file, ReduceOptions::standard()).await;

        assert!(matches!(reduced.outcome, ReduceOutcome::Compressed { .. }));
        assert!(reduced.file.size() <= DEFAULT_TARGET_BYTES);
        assert_eq!(reduced.file.mime, MIME_JPEG);
        assert_eq!(reduced.file.name, "storefront.jpg");

        let out = image::load_from_memory(&reduced.file.bytes).unwrap();
        let (w, h) = out.dimensions();
        assert!(w.max(h) <= STANDARD_MAX_DIMENSION);
    }

    #[tokio::test]
    async fn test_corrupt_large_file_falls_back_to_original() {
        let file = MediaFile::new("broken.jpg", MIME_JPEG, vec![0xAB; 600 * 1024]);

        let reduced = reduce_if_large(file.clone(), ReduceOptions::standard()).await;

        assert_eq!(reduced.file, file);
        match reduced.outcome {
            ReduceOutcome::Failed(Error::CompressionFailure { name, .. }) => {
                assert_eq!(name, "broken.jpg");
            }
            other => panic!("expected CompressionFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_transparent_image_stays_png() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(800, 800, |x, y| {
            Rgba([noise(x, y, 4), noise(x, y, 5), noise(x, y, 6), 100])
        }));
        let file = to_file("badge.png", &img, ImageOutputFormat::Png, MIME_PNG);
        assert!(file.size() > DEFAULT_THRESHOLD_BYTES);

        let reduced = reduce_if_large_blocking(file, &ReduceOptions::standard());

        assert!(matches!(reduced.outcome, ReduceOutcome::Compressed { .. }));
        assert_eq!(reduced.file.mime, MIME_PNG);
        assert!(reduced.file.size() <= DEFAULT_TARGET_BYTES);
    }

    #[test]
    fn test_recompression_that_grows_keeps_original() {
        let options = ReduceOptions {
            threshold_bytes: 0,
            ..ReduceOptions::standard()
        };
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([10, 20, 30])));
        let file = to_file("dot.png", &img, ImageOutputFormat::Png, MIME_PNG);

        let reduced = reduce_if_large_blocking(file.clone(), &options);

        assert!(matches!(reduced.outcome, ReduceOutcome::Untouched));
        assert_eq!(reduced.file, file);
    }

    #[test]
    fn test_presets() {
        assert_eq!(ReduceOptions::default(), ReduceOptions::standard());
        assert_eq!(ReduceOptions::standard().max_dimension_px, 1280);
        assert_eq!(ReduceOptions::catalog().max_dimension_px, 1920);
        assert_eq!(ReduceOptions::catalog().threshold_bytes, 500 * 1024);
    }

    #[test]
    fn test_fit_within_preserves_aspect() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(4000, 3000));
        let fitted = fit_within(img, 1280);
        assert_eq!(fitted.dimensions(), (1280, 960));
    }
}
