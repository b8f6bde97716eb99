//! Caller constraints for one compression and the stored settings they are
//! resolved from.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::OutputFormat;

/// Default output width bound (both min and max), in pixels.
pub const DEFAULT_WIDTH: u32 = 400;
/// Default byte budget: 1 MiB.
pub const DEFAULT_MAX_FILE_SIZE: usize = 1_048_576;
/// Default preferred quality.
pub const DEFAULT_QUALITY: u8 = 100;
/// Default output format.
pub const DEFAULT_FORMAT: OutputFormat = OutputFormat::Jpeg;

const BYTES_PER_MEGABYTE: f64 = 1_048_576.0;
const MIN_MEGABYTES: f64 = 0.1;
const MAX_MEGABYTES: f64 = 10.0;

/// Inconsistent compression constraints. Never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("minWidth ({min_width}) must not exceed maxWidth ({max_width})")]
    MinWidthExceedsMaxWidth { min_width: u32, max_width: u32 },

    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error("quality must be between 1 and 100, got {0}")]
    QualityOutOfRange(u8),

    #[error("quality floor ({floor}) must not exceed quality cap ({cap})")]
    QualityFloorAboveCap { floor: u8, cap: u8 },

    #[error("dimension decay must be in (0, 1), got {0}")]
    InvalidDecay(f64),

    #[error("output of {width}x{height} exceeds the {max_pixels} pixel limit")]
    OutputTooLarge {
        width: u32,
        height: u32,
        max_pixels: u64,
    },
}

/// Constraints for a single compression call.
///
/// Immutable for the duration of the call. Validate with
/// [`TargetSpec::validate`] before searching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSpec {
    /// Upper bound on output width.
    pub max_width: u32,
    /// Lower bound on output width. Smaller sources are upscaled to it.
    pub min_width: u32,
    /// Byte budget for the encoded output.
    pub max_file_size: usize,
    /// Preferred quality (1-100); the search starts at or below this.
    pub quality: u8,
    /// Output format. `None` infers it from the source.
    #[serde(default)]
    pub format: Option<OutputFormat>,
}

impl Default for TargetSpec {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_WIDTH,
            min_width: DEFAULT_WIDTH,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            quality: DEFAULT_QUALITY,
            format: Some(DEFAULT_FORMAT),
        }
    }
}

impl TargetSpec {
    /// Spec with explicit bounds, full quality and an inferred format.
    pub fn new(max_width: u32, min_width: u32, max_file_size: usize) -> Self {
        Self {
            max_width,
            min_width,
            max_file_size,
            quality: DEFAULT_QUALITY,
            format: None,
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Force PNG output, the format clipboards accept most reliably.
    pub fn for_clipboard(self) -> Self {
        self.with_format(OutputFormat::Png)
    }

    /// Check every invariant. Called before any decode work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_width == 0 {
            return Err(ConfigError::ZeroValue { field: "maxWidth" });
        }
        if self.min_width == 0 {
            return Err(ConfigError::ZeroValue { field: "minWidth" });
        }
        if self.max_file_size == 0 {
            return Err(ConfigError::ZeroValue {
                field: "maxFileSize",
            });
        }
        if self.min_width > self.max_width {
            return Err(ConfigError::MinWidthExceedsMaxWidth {
                min_width: self.min_width,
                max_width: self.max_width,
            });
        }
        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::QualityOutOfRange(self.quality));
        }
        Ok(())
    }
}

/// Settings as kept in the extension's key/value store.
///
/// Every key may be missing; [`Settings::resolve`] fills the gaps with the
/// defaults the extension installs on first run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub format: Option<OutputFormat>,
    pub quality: Option<u8>,
    pub max_width: Option<u32>,
    pub min_width: Option<u32>,
    pub max_file_size: Option<usize>,
}

impl Settings {
    /// Fill missing keys with defaults. The result still needs validating.
    pub fn resolve(&self) -> TargetSpec {
        let defaults = TargetSpec::default();
        TargetSpec {
            max_width: self.max_width.unwrap_or(defaults.max_width),
            min_width: self.min_width.unwrap_or(defaults.min_width),
            max_file_size: self.max_file_size.unwrap_or(defaults.max_file_size),
            quality: self.quality.unwrap_or(defaults.quality),
            format: self.format.or(defaults.format),
        }
    }
}

/// Convert a megabyte figure from the settings form into a byte budget,
/// clamped to the form's 0.1-10 MB range.
pub fn megabytes_to_bytes(megabytes: f64) -> usize {
    let clamped = if megabytes.is_nan() {
        MIN_MEGABYTES
    } else {
        megabytes.clamp(MIN_MEGABYTES, MAX_MEGABYTES)
    };
    (clamped * BYTES_PER_MEGABYTE).floor() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_spec_matches_installed_settings() {
        let spec = TargetSpec::default();
        assert_eq!(spec.max_width, 400);
        assert_eq!(spec.min_width, 400);
        assert_eq!(spec.max_file_size, 1_048_576);
        assert_eq!(spec.quality, 100);
        assert_eq!(spec.format, Some(OutputFormat::Jpeg));
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_min_above_max_is_config_error() {
        let spec = TargetSpec::new(400, 2000, 1_048_576);
        assert_eq!(
            spec.validate(),
            Err(ConfigError::MinWidthExceedsMaxWidth {
                min_width: 2000,
                max_width: 400
            })
        );
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(matches!(
            TargetSpec::new(0, 0, 10).validate(),
            Err(ConfigError::ZeroValue { field: "maxWidth" })
        ));
        assert!(matches!(
            TargetSpec::new(10, 0, 10).validate(),
            Err(ConfigError::ZeroValue { field: "minWidth" })
        ));
        assert!(matches!(
            TargetSpec::new(10, 10, 0).validate(),
            Err(ConfigError::ZeroValue {
                field: "maxFileSize"
            })
        ));
    }

    #[test]
    fn test_quality_range() {
        let spec = TargetSpec::new(10, 10, 10);
        assert_eq!(
            spec.with_quality(0).validate(),
            Err(ConfigError::QualityOutOfRange(0))
        );
        assert_eq!(
            spec.with_quality(101).validate(),
            Err(ConfigError::QualityOutOfRange(101))
        );
        assert!(spec.with_quality(1).validate().is_ok());
    }

    #[test]
    fn test_for_clipboard_forces_png() {
        let spec = TargetSpec::default().for_clipboard();
        assert_eq!(spec.format, Some(OutputFormat::Png));
    }

    #[test]
    fn test_spec_deserializes_camel_case() {
        let json = r#"{"maxWidth":800,"minWidth":400,"maxFileSize":500000,"quality":75}"#;
        let spec: TargetSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.max_width, 800);
        assert_eq!(spec.min_width, 400);
        assert_eq!(spec.max_file_size, 500_000);
        assert_eq!(spec.quality, 75);
        assert_eq!(spec.format, None);
    }

    #[test]
    fn test_settings_resolve_fills_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"maxWidth":1200,"format":"png"}"#).unwrap();
        let spec = settings.resolve();
        assert_eq!(spec.max_width, 1200);
        assert_eq!(spec.min_width, 400);
        assert_eq!(spec.quality, 100);
        assert_eq!(spec.format, Some(OutputFormat::Png));
    }

    #[test]
    fn test_empty_settings_resolve_to_default_spec() {
        assert_eq!(Settings::default().resolve(), TargetSpec::default());
    }

    #[test]
    fn test_megabytes_to_bytes() {
        assert_eq!(megabytes_to_bytes(1.0), 1_048_576);
        assert_eq!(megabytes_to_bytes(0.0), 104_857);
        assert_eq!(megabytes_to_bytes(50.0), 10_485_760);
        assert_eq!(megabytes_to_bytes(f64::NAN), 104_857);
    }
}
