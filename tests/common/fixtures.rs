//! Test data factories for storefront-media types
//!
//! These are test utilities - not all may be used in every test binary.

#![allow(dead_code)]

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use storefront_media::assets::{AssetCollection, AssetSlot, PreviewRegistry};
use storefront_media::form::ExistingEntity;
use storefront_media::types::{MediaFile, MIME_JPEG, MIME_PNG};

fn encode(img: &DynamicImage, format: ImageOutputFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}

/// Opaque two-tone checkerboard
pub fn checkerboard(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        if (x / 4 + y / 4) % 2 == 0 {
            Rgb([200, 40, 40])
        } else {
            Rgb([20, 20, 160])
        }
    })
}

/// Small PNG file
pub fn png(name: &str, width: u32, height: u32) -> MediaFile {
    let img = DynamicImage::ImageRgb8(checkerboard(width, height));
    MediaFile::new(name, MIME_PNG, encode(&img, ImageOutputFormat::Png))
}

/// GIF content declared with an arbitrary MIME type
pub fn gif_as(name: &str, mime: &str, width: u32, height: u32) -> MediaFile {
    let img = DynamicImage::ImageRgb8(checkerboard(width, height));
    MediaFile::new(name, mime, encode(&img, ImageOutputFormat::Gif))
}

/// BMP file
pub fn bmp(name: &str, width: u32, height: u32) -> MediaFile {
    let img = DynamicImage::ImageRgb8(checkerboard(width, height));
    MediaFile::new(name, "image/bmp", encode(&img, ImageOutputFormat::Bmp))
}

/// Grainy photo-like JPEG, large enough to need reduction
pub fn photo_jpeg(name: &str, width: u32, height: u32) -> MediaFile {
    let mut seed: u32 = 0x9E37_79B9;
    let img = RgbImage::from_fn(width, height, |x, y| {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        let noise = (seed & 0x1F) as u8;
        Rgb([
            ((x * 255 / width) as u8).saturating_add(noise),
            ((y * 255 / height) as u8).saturating_add(noise),
            (((x + y) * 127 / (width + height)) as u8).saturating_add(noise),
        ])
    });
    let bytes = encode(&DynamicImage::ImageRgb8(img), ImageOutputFormat::Jpeg(95));
    MediaFile::new(name, MIME_JPEG, bytes)
}

/// Semi-transparent PNG
pub fn transparent_png(name: &str, width: u32, height: u32) -> MediaFile {
    let img = RgbaImage::from_fn(width, height, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 90, 128]));
    MediaFile::new(name, MIME_PNG, encode(&DynamicImage::ImageRgba8(img), ImageOutputFormat::Png))
}

/// Oversized buffer that claims to be a JPEG but does not decode
pub fn corrupt_jpeg(name: &str, len: usize) -> MediaFile {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.resize(len, 0x5A);
    MediaFile::new(name, MIME_JPEG, bytes)
}

/// Tiny placeholder file whose contents are never decoded
pub fn stub(name: &str) -> MediaFile {
    MediaFile::new(name, MIME_JPEG, name.as_bytes().to_vec())
}

/// Collection seeded with the given references
pub fn seeded_collection(field: &str, refs: &[&str]) -> (AssetCollection, PreviewRegistry) {
    let previews = PreviewRegistry::new();
    let mut collection = AssetCollection::new(field, previews.clone());
    collection
        .seed(refs.iter().map(ToString::to_string))
        .unwrap();
    (collection, previews)
}

/// Slot seeded with an optional reference
pub fn seeded_slot(field: &str, existing: Option<&str>) -> (AssetSlot, PreviewRegistry) {
    let previews = PreviewRegistry::new();
    let mut slot = AssetSlot::new(field, previews.clone());
    slot.seed(existing.map(ToString::to_string)).unwrap();
    (slot, previews)
}

/// Landing page as the server would return it
pub fn landing_entity() -> ExistingEntity {
    ExistingEntity::new("landing-1")
        .with_field("storeName", "Corner Shop")
        .with_field("colourCode", "#1A2B3C")
        .with_image("image", "https://cdn.shop.test/logo.png")
        .with_image("heroImage", "https://cdn.shop.test/hero-a.png")
        .with_image("heroImage", "https://cdn.shop.test/hero-b.png")
}

/// Product as the server would return it
pub fn product_entity(images: &[&str]) -> ExistingEntity {
    images.iter().fold(
        ExistingEntity::new("product-1")
            .with_field("name", "Stoneware Mug")
            .with_field("description", "Hand-thrown, 350 ml")
            .with_field("category", "kitchen")
            .with_field("price", "18.50")
            .with_field("stockCount", "12"),
        |entity, url| entity.with_image("productImage", *url),
    )
}

/// Write a file into a directory and return its path
pub fn write_file(dir: &Path, file: &MediaFile) -> PathBuf {
    let path = dir.join(&file.name);
    std::fs::write(&path, &file.bytes).unwrap();
    path
}
