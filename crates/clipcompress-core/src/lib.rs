//! ClipCompress Core - size-budget image compression
//!
//! This crate provides the core of ClipCompress: decoding a source image,
//! searching over output dimensions and encode quality until the result fits
//! a byte budget, and the request/response plumbing around it.

pub mod codec;
pub mod compress;
pub mod decode;
pub mod encode;
pub mod fetch;
pub mod format;
pub mod message;

pub use codec::{Encoder, ImageCodec, Rasterizer};
pub use compress::{
    CompressError, CompressionEngine, CompressionResult, ConfigError, Enforcement, PhaseOrder,
    SearchPolicy, Settings, TargetSpec,
};
pub use decode::{DecodeError, DecodedImage, FilterType};
pub use encode::EncodeError;
pub use format::OutputFormat;

/// Compress `source` to fit `spec` with the default engine.
///
/// Shorthand for `CompressionEngine::new().compress(source, spec)`.
pub fn compress(source: &[u8], spec: &TargetSpec) -> Result<CompressionResult, CompressError> {
    CompressionEngine::new().compress(source, spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_rejects_empty_input() {
        let result = compress(&[], &TargetSpec::default());
        assert!(matches!(
            result,
            Err(CompressError::Decode(DecodeError::UnrecognizedFormat))
        ));
    }

    #[test]
    fn test_compress_invalid_spec_before_decode() {
        let spec = TargetSpec::new(100, 200, 1000);
        assert!(matches!(
            compress(&[], &spec),
            Err(CompressError::Config(ConfigError::MinWidthExceedsMaxWidth { .. }))
        ));
    }
}
