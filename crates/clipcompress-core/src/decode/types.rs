//! Core types for image decoding.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a source could not be turned into a raster.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The bytes do not start with the signature of any known image format.
    #[error("Unrecognized image format")]
    UnrecognizedFormat,

    /// The format was recognized but this build cannot decode it.
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The decoder rejected the payload (truncated or damaged data).
    #[error("Corrupted or incomplete image file: {0}")]
    CorruptedFile(String),

    /// A resample was requested with a zero dimension.
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Resampling kernel.
///
/// The engine defaults to Lanczos3; downscaled photos stay sharp and the
/// encoder does not waste bytes on aliasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterType {
    Nearest,
    /// Triangle filter.
    Bilinear,
    CatmullRom,
    #[default]
    Lanczos3,
}

impl FilterType {
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            FilterType::Nearest => image::imageops::FilterType::Nearest,
            FilterType::Bilinear => image::imageops::FilterType::Triangle,
            FilterType::CatmullRom => image::imageops::FilterType::CatmullRom,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// A decoded image with RGBA pixel data.
///
/// This is the raster the compression engine searches over. It is never
/// mutated once decoded; resampling produces a new image.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
    /// Container format the pixels were decoded from, if known.
    pub source_format: Option<ImageFormat>,
}

impl DecodedImage {
    /// Bytes per pixel of the `pixels` buffer.
    pub const CHANNELS: usize = 4;

    /// Wrap an RGBA buffer. Debug builds check its length.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            width as usize * height as usize * Self::CHANNELS,
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            pixels,
            source_format: None,
        }
    }

    pub fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.into_raw(),
            source_format: None,
        }
    }

    /// Tag the image with the format it was decoded from.
    pub fn with_source_format(mut self, format: ImageFormat) -> Self {
        self.source_format = Some(format);
        self
    }

    /// Borrow the pixels as an `image` buffer view for resampling.
    pub fn as_rgba_view(&self) -> Option<image::ImageBuffer<image::Rgba<u8>, &[u8]>> {
        image::ImageBuffer::from_raw(self.width, self.height, self.pixels.as_slice())
    }

    /// Whether any pixel is not fully opaque.
    pub fn has_transparency(&self) -> bool {
        self.pixels
            .chunks_exact(Self::CHANNELS)
            .any(|px| px[3] != u8::MAX)
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// True for zero-area images or images without pixel data.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }
}
