//! Export - JPEG encoding and download naming for composed backgrounds

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hashing::sha256_hex;

pub const BACKGROUND_SUFFIX: &str = "zoom-background";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("JPEG encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Quality must be between 1 and 100, got {0}")]
    InvalidQuality(u8),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedFile {
    pub filename: String,
    pub format: String,
    pub size: [u32; 2],
    pub data_base64: String,
    pub hash: String,
}

impl ExportedFile {
    pub fn jpeg(filename: String, size: [u32; 2], data: &[u8]) -> Self {
        Self {
            filename,
            format: "jpg".to_string(),
            size,
            data_base64: base64::engine::general_purpose::STANDARD.encode(data),
            hash: sha256_hex(data),
        }
    }

    pub fn decode_data(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.data_base64)
    }
}

/// Encode a composed surface as JPEG. JPEG has no alpha; pixels are
/// flattened onto black.
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, ExportError> {
    if quality == 0 || quality > 100 {
        return Err(ExportError::InvalidQuality(quality));
    }

    let rgb: Vec<u8> = image
        .pixels()
        .flat_map(|p| {
            let a = p[3] as u16;
            [
                (p[0] as u16 * a / 255) as u8,
                (p[1] as u16 * a / 255) as u8,
                (p[2] as u16 * a / 255) as u8,
            ]
        })
        .collect();

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality).encode(
        &rgb,
        image.width(),
        image.height(),
        ColorType::Rgb8,
    )?;
    Ok(bytes)
}

/// Download filename for a background: `Jane-Smith-zoom-background.jpg`.
///
/// Every run of characters other than ASCII letters and digits collapses to a
/// single hyphen.
pub fn background_filename(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');

    if slug.is_empty() {
        format!("{}.jpg", BACKGROUND_SUFFIX)
    } else {
        format!("{}-{}.jpg", slug, BACKGROUND_SUFFIX)
    }
}
