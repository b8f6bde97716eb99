//! Lossless WebP encoding.

use image::codecs::webp::WebPEncoder;
use image::ExtendedColorType;
use image::ImageEncoder;

use super::{validate_rgba, EncodeError};
use crate::format::OutputFormat;

/// Encode RGBA pixel data to lossless WebP bytes.
///
/// The `image` crate's WebP encoder is lossless only, so size is controlled
/// purely by dimensions.
pub fn encode_webp(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, EncodeError> {
    validate_rgba(pixels, width, height)?;

    let mut buffer = Vec::new();
    WebPEncoder::new_lossless(&mut buffer)
        .write_image(pixels, width, height, ExtendedColorType::Rgba8)
        .map_err(|e| EncodeError::EncodingFailed {
            format: OutputFormat::Webp,
            message: e.to_string(),
        })?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_webp_decodes_back() {
        let pixels: Vec<u8> = (0..8 * 8 * 4)
            .map(|i| if i % 4 == 3 { 255 } else { (i * 7 % 251) as u8 })
            .collect();
        let webp = encode_webp(&pixels, 8, 8).unwrap();

        let decoded = image::load_from_memory(&webp).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (8, 8));
        assert_eq!(decoded.into_raw(), pixels);
    }

    #[test]
    fn test_encode_webp_invalid_pixel_data() {
        assert!(matches!(
            encode_webp(&[0u8; 10], 2, 2),
            Err(EncodeError::InvalidPixelData { .. })
        ));
    }
}
