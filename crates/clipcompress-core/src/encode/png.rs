//! Lossless PNG encoding.
//!
//! PNG is what the system clipboard accepts most reliably, so clipboard
//! output is forced to it. Opaque images are written as RGB to save the
//! alpha plane.

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::ExtendedColorType;
use image::ImageEncoder;

use super::{validate_rgba, EncodeError};
use crate::format::OutputFormat;

/// Encode RGBA pixel data to PNG bytes with maximum compression.
pub fn encode_png(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, EncodeError> {
    validate_rgba(pixels, width, height)?;

    let opaque = pixels.chunks_exact(4).all(|px| px[3] == u8::MAX);
    let (data, color) = if opaque {
        let rgb: Vec<u8> = pixels
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        (rgb, ExtendedColorType::Rgb8)
    } else {
        (pixels.to_vec(), ExtendedColorType::Rgba8)
    };

    let mut buffer = Vec::new();
    PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, FilterType::Adaptive)
        .write_image(&data, width, height, color)
        .map_err(|e| EncodeError::EncodingFailed {
            format: OutputFormat::Png,
            message: e.to_string(),
        })?;

    Ok(buffer)
}
