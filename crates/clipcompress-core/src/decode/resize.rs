//! Resampling and aspect-preserving dimension math.
//!
//! All dimension helpers floor rather than round, so repeated shrinking never
//! grows the pixel area. Heights are always derived from the *source*
//! dimensions, which keeps every derived size within one pixel of the source
//! aspect ratio no matter how many steps were taken.

use super::{DecodeError, DecodedImage, FilterType};

/// Resize an image to exact dimensions.
///
/// # Errors
///
/// Returns `DecodeError::InvalidDimensions` for a zero target dimension and
/// `DecodeError::CorruptedFile` if the pixel buffer does not match the
/// declared size.
pub fn resize(
    image: &DecodedImage,
    width: u32,
    height: u32,
    filter: FilterType,
) -> Result<DecodedImage, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidDimensions { width, height });
    }

    // Fast path: if dimensions match, just clone
    if image.width == width && image.height == height {
        return Ok(image.clone());
    }

    let view = image
        .as_rgba_view()
        .ok_or_else(|| DecodeError::CorruptedFile("Pixel buffer size mismatch".to_string()))?;

    let resized = image::imageops::resize(&view, width, height, filter.to_image_filter());

    let mut out = DecodedImage::from_rgba_image(resized);
    out.source_format = image.source_format;
    Ok(out)
}

/// Height that keeps the source aspect ratio at `width`, floored, never 0.
///
/// Saturates at `u32::MAX` when the exact height does not fit; such sizes
/// are far past any output pixel limit.
pub fn height_for_width(source_width: u32, source_height: u32, width: u32) -> u32 {
    if source_width == 0 {
        return 0;
    }
    let height = u64::from(source_height) * u64::from(width) / u64::from(source_width);
    u32::try_from(height).unwrap_or(u32::MAX).max(1)
}

/// Initial output dimensions for a `[min_width, max_width]` window.
///
/// Images wider than `max_width` are scaled down to it; anything that ends up
/// narrower than `min_width` is scaled up to it. The minimum wins, so small
/// sources are upscaled. Images already inside the window keep their size.
pub fn target_dimensions(
    source_width: u32,
    source_height: u32,
    min_width: u32,
    max_width: u32,
) -> (u32, u32) {
    if source_width == 0 || source_height == 0 {
        return (0, 0);
    }

    let mut width = source_width;
    if width > max_width {
        width = max_width;
    }
    if width < min_width {
        width = min_width;
    }

    if width == source_width {
        (source_width, source_height)
    } else {
        (width, height_for_width(source_width, source_height, width))
    }
}

/// Shrink `width` by a decay factor, flooring and never going below `min_width`.
///
/// Always makes progress while `width > min_width`: a factor that would leave
/// the width unchanged after flooring still removes one pixel.
pub fn decay_width(width: u32, decay: f64, min_width: u32) -> u32 {
    if width <= min_width {
        return width;
    }
    let mut next = (width as f64 * decay).floor() as u32;
    if next >= width {
        next = width - 1;
    }
    next.max(min_width)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: derived heights stay within one pixel of the source aspect ratio.
        #[test]
        fn prop_height_within_one_pixel(
            src_w in 1u32..=8000,
            src_h in 1u32..=8000,
            width in 1u32..=8000,
        ) {
            let height = height_for_width(src_w, src_h, width);
            let exact = src_h as f64 * width as f64 / src_w as f64;
            prop_assert!((height as f64 - exact).abs() <= 1.0);
        }

        /// Property: heights past `u32::MAX` saturate instead of wrapping.
        #[test]
        fn prop_height_never_wraps(
            src_w in 1u32..=16,
            src_h in 50_000u32..=u32::MAX,
            width in 50_000u32..=u32::MAX,
        ) {
            let height = height_for_width(src_w, src_h, width);
            let exact = u64::from(src_h) * u64::from(width) / u64::from(src_w);
            if exact > u64::from(u32::MAX) {
                prop_assert_eq!(height, u32::MAX);
            } else {
                prop_assert_eq!(u64::from(height), exact.max(1));
            }
        }

        /// Property: the initial width always lands inside the window.
        #[test]
        fn prop_target_width_in_window(
            src_w in 1u32..=8000,
            src_h in 1u32..=8000,
            min in 1u32..=4000,
            extra in 0u32..=4000,
        ) {
            let max = min + extra;
            let (w, h) = target_dimensions(src_w, src_h, min, max);
            prop_assert!(w >= min && w <= max);
            prop_assert!(h >= 1);
        }

        /// Property: decay never increases the width or crosses the minimum.
        #[test]
        fn prop_decay_monotonic(
            width in 1u32..=8000,
            min in 1u32..=8000,
            decay in 0.05f64..0.999,
        ) {
            let next = decay_width(width, decay, min);
            prop_assert!(next <= width);
            if width > min {
                prop_assert!(next < width);
                prop_assert!(next >= min);
            }
        }
    }
}
