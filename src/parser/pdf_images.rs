//! Normalization of PDF image XObjects to PNG.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use serde_json::json;

use crate::error::{Error, Result};
use crate::model::DocumentImage;

use super::backend::BackendImage;
use super::layout::XObjectPlacement;

/// A decoded image re-encoded as PNG.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decode an image XObject and re-encode it as PNG.
///
/// JPEG streams are decoded through `image`; fully decoded streams are
/// read as 8-bit gray or RGB samples. Anything else is rejected.
pub fn normalize(raw: &BackendImage) -> Result<NormalizedImage> {
    let decoded = match raw.filter.as_deref() {
        Some("DCTDecode") => image::load_from_memory_with_format(&raw.data, ImageFormat::Jpeg)?,
        None => from_samples(raw)?,
        Some(other) => {
            return Err(Error::ImageDecode(format!(
                "{}: unsupported filter {}",
                raw.name, other
            )))
        }
    };

    let (width, height) = (decoded.width(), decoded.height());
    let mut png = Vec::new();
    decoded.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(NormalizedImage { png, width, height })
}

fn from_samples(raw: &BackendImage) -> Result<DynamicImage> {
    if raw.bits_per_component != 8 {
        return Err(Error::ImageDecode(format!(
            "{}: {} bits per component",
            raw.name, raw.bits_per_component
        )));
    }
    let (w, h) = (raw.width, raw.height);
    let pixels = w as usize * h as usize;

    let image = match raw.components {
        Some(1) if raw.data.len() >= pixels => {
            GrayImage::from_raw(w, h, raw.data[..pixels].to_vec()).map(DynamicImage::ImageLuma8)
        }
        Some(3) if raw.data.len() >= pixels * 3 => {
            RgbImage::from_raw(w, h, raw.data[..pixels * 3].to_vec()).map(DynamicImage::ImageRgb8)
        }
        _ => None,
    };

    image.ok_or_else(|| {
        Error::ImageDecode(format!(
            "{}: unsupported colour space or short sample data",
            raw.name
        ))
    })
}

/// Build image records for a page from its `Do` placements.
///
/// Placements are numbered in paint order; an XObject that fails to decode
/// is logged and skipped without renumbering the rest.
pub fn page_images(
    page_number: u32,
    placements: &[XObjectPlacement],
    available: &[BackendImage],
    include_data: bool,
) -> Vec<DocumentImage> {
    let mut images = Vec::new();
    let mut index = 0;

    for placement in placements {
        let Some(raw) = available.iter().find(|img| img.name == placement.name) else {
            continue;
        };
        index += 1;

        let normalized = match normalize(raw) {
            Ok(n) => n,
            Err(e) => {
                log::warn!("Page {}: skipping image {}: {}", page_number, raw.name, e);
                continue;
            }
        };

        let mut image = DocumentImage::new(
            format!("pdf-image-{}-{}", page_number, index),
            "image/png",
        )
        .with_dimensions(normalized.width, normalized.height)
        .with_meta("page", page_number)
        .with_meta(
            "bbox",
            json!([placement.x0, placement.top, placement.x1, placement.bottom]),
        )
        .with_meta("area", placement.area())
        .with_meta("size_bytes", normalized.png.len())
        .with_meta("name", raw.name.clone());

        if include_data {
            image = image.with_payload(&normalized.png);
        }
        images.push(image);
    }

    images
}
