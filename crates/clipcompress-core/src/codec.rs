//! Raster and encode primitives the compression engine depends on.
//!
//! The engine never talks to a decoder or encoder directly; it goes through
//! these two traits so the search can be exercised with synthetic codecs and
//! so another raster backend can be dropped in. Implementations must be
//! stateless: the same inputs always produce the same output.

use crate::decode::{self, DecodeError, DecodedImage, FilterType};
use crate::encode::{self, EncodeError};
use crate::format::OutputFormat;

/// Decode bytes into a raster and resample rasters.
pub trait Rasterizer {
    /// Decode `bytes`, validating the media type first.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError>;

    /// Produce a new raster of exactly `width` x `height`.
    fn resample(
        &self,
        image: &DecodedImage,
        width: u32,
        height: u32,
    ) -> Result<DecodedImage, DecodeError>;
}

/// Turn a raster into encoded bytes.
pub trait Encoder {
    /// Encode `image` as `format` at `quality` (1-100).
    fn encode(
        &self,
        image: &DecodedImage,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Vec<u8>, EncodeError>;
}

/// The default codec, backed by the `image` crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageCodec {
    filter: FilterType,
}

impl ImageCodec {
    /// Create a codec resampling with `filter`.
    ///
    /// Nearest-neighbour is upgraded to bilinear; the engine only resamples
    /// with interpolating filters.
    pub fn with_filter(filter: FilterType) -> Self {
        let filter = match filter {
            FilterType::Nearest => FilterType::Bilinear,
            other => other,
        };
        Self { filter }
    }

    pub fn filter(&self) -> FilterType {
        self.filter
    }
}

impl Default for ImageCodec {
    fn default() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }
}

impl Rasterizer for ImageCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        decode::decode_image(bytes)
    }

    fn resample(
        &self,
        image: &DecodedImage,
        width: u32,
        height: u32,
    ) -> Result<DecodedImage, DecodeError> {
        decode::resize(image, width, height, self.filter)
    }
}

impl Encoder for ImageCodec {
    fn encode(
        &self,
        image: &DecodedImage,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Vec<u8>, EncodeError> {
        encode::encode_image(image, format, quality)
    }
}

impl<T: Rasterizer + ?Sized> Rasterizer for &T {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        (**self).decode(bytes)
    }

    fn resample(
        &self,
        image: &DecodedImage,
        width: u32,
        height: u32,
    ) -> Result<DecodedImage, DecodeError> {
        (**self).resample(image, width, height)
    }
}

impl<T: Encoder + ?Sized> Encoder for &T {
    fn encode(
        &self,
        image: &DecodedImage,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Vec<u8>, EncodeError> {
        (**self).encode(image, format, quality)
    }
}
