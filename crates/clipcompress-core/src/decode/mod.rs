//! Image decoding and resampling for ClipCompress.
//!
//! This module provides functionality for:
//! - Validating that a payload is an image before decoding it
//! - Decoding JPEG, PNG, WebP, GIF and BMP sources into RGBA pixels
//! - Aspect-preserving resampling with high-quality filters
//!
//! # Architecture
//!
//! Sources arrive from three places: a page image fetched over the network,
//! a clipboard paste and a drag-and-drop. All of them end up here as raw
//! bytes. Decoding happens once per compression; every later step works on
//! the decoded raster.

mod resize;
mod source;
mod types;

pub use resize::{decay_width, height_for_width, resize, target_dimensions};
pub use source::{decode_image, detect_format};
pub use types::{DecodeError, DecodedImage, FilterType};
