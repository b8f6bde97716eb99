//! Source image decoding with media type validation and EXIF orientation.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageFormat};

use super::{DecodeError, DecodedImage};

/// Orientation tag value for "already upright".
const UPRIGHT: u32 = 1;

/// Detect the container format from the leading magic bytes.
///
/// This is the media type check that runs before any decode work, so text
/// or other non-image payloads are rejected without touching a decoder.
///
/// # Errors
///
/// Returns `DecodeError::UnrecognizedFormat` for empty input or an unknown
/// signature.
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::UnrecognizedFormat);
    }
    image::guess_format(bytes).map_err(|_| DecodeError::UnrecognizedFormat)
}

/// Decode an image from bytes into RGBA pixels.
///
/// JPEG sources have their EXIF orientation applied so the pixels are upright,
/// the way a browser draws them onto a canvas.
///
/// # Errors
///
/// - `DecodeError::UnrecognizedFormat` if the bytes are not an image
/// - `DecodeError::UnsupportedFormat` if the format is recognized but not compiled in
/// - `DecodeError::CorruptedFile` if the decoder fails
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let format = detect_format(bytes)?;
    if !format.reading_enabled() {
        return Err(DecodeError::UnsupportedFormat(format!("{:?}", format)));
    }

    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    let img = if format == ImageFormat::Jpeg {
        upright(img, exif_orientation(bytes))
    } else {
        img
    };
    let rgba = img.into_rgba8();

    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidDimensions { width, height });
    }

    log::debug!("Decoded {:?} source: {}x{}", format, width, height);

    Ok(DecodedImage::from_rgba_image(rgba).with_source_format(format))
}

/// EXIF orientation tag (1-8) of a JPEG, or 1 when missing or unreadable.
fn exif_orientation(bytes: &[u8]) -> u32 {
    Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()
        .and_then(|exif| {
            exif.get_field(Tag::Orientation, In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        })
        .unwrap_or(UPRIGHT)
}

/// Rotate and flip so an image tagged with `orientation` displays upright.
/// Unknown values are left alone.
fn upright(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}
