//! Tunable knobs of the compression search.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Largest output raster, in pixels. Matches the canvas area limit browsers
/// enforce (16384 x 16384).
pub const DEFAULT_MAX_OUTPUT_PIXELS: u64 = 268_435_456;

/// Which knob the search turns first when an attempt is over budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PhaseOrder {
    /// Lower quality down to the floor, then shrink dimensions.
    #[default]
    QualityFirst,
    /// Shrink dimensions down to the minimum width, then lower quality.
    ScaleFirst,
}

/// What happens when the search cannot meet the byte budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Enforcement {
    /// Fail with `CompressError::Infeasible`.
    #[default]
    Strict,
    /// Return the smallest attempt, flagged `best_effort`.
    BestEffort,
}

/// Search constants. The defaults are the quality-first policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchPolicy {
    /// Attempts in the main loop. One extra floor attempt may follow.
    pub max_attempts: u32,
    /// Starting quality never exceeds this.
    pub quality_cap: u8,
    /// Quality is never lowered below this.
    pub quality_floor: u8,
    /// Quality points removed per quality step. Zero disables the quality phase.
    pub quality_step: u8,
    /// Width multiplier per dimension step, in (0, 1).
    pub dimension_decay: f64,
    pub phase_order: PhaseOrder,
    pub enforcement: Enforcement,
    /// Ceiling on `width * height` of any trial. Upscaling a tall, narrow
    /// source to the minimum width can otherwise ask for gigabytes.
    pub max_output_pixels: u64,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self::quality_first()
    }
}

impl SearchPolicy {
    /// Lower quality in steps of 10 from at most 90 down to 50, then shrink
    /// width by 20% per step.
    pub fn quality_first() -> Self {
        Self {
            max_attempts: 5,
            quality_cap: 90,
            quality_floor: 50,
            quality_step: 10,
            dimension_decay: 0.8,
            phase_order: PhaseOrder::QualityFirst,
            enforcement: Enforcement::Strict,
            max_output_pixels: DEFAULT_MAX_OUTPUT_PIXELS,
        }
    }

    /// Shrink width by 20% per step down to the minimum, then lower quality.
    pub fn scale_first() -> Self {
        Self {
            phase_order: PhaseOrder::ScaleFirst,
            ..Self::quality_first()
        }
    }

    /// Keep the starting quality and only shrink dimensions.
    pub fn fixed_quality() -> Self {
        Self {
            quality_step: 0,
            phase_order: PhaseOrder::ScaleFirst,
            ..Self::quality_first()
        }
    }

    pub fn with_enforcement(mut self, enforcement: Enforcement) -> Self {
        self.enforcement = enforcement;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Check the constants before a search uses them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroValue {
                field: "maxAttempts",
            });
        }
        if !(1..=100).contains(&self.quality_cap) {
            return Err(ConfigError::QualityOutOfRange(self.quality_cap));
        }
        if !(1..=100).contains(&self.quality_floor) {
            return Err(ConfigError::QualityOutOfRange(self.quality_floor));
        }
        if self.quality_floor > self.quality_cap {
            return Err(ConfigError::QualityFloorAboveCap {
                floor: self.quality_floor,
                cap: self.quality_cap,
            });
        }
        if !(self.dimension_decay > 0.0 && self.dimension_decay < 1.0) {
            return Err(ConfigError::InvalidDecay(self.dimension_decay));
        }
        if self.max_output_pixels == 0 {
            return Err(ConfigError::ZeroValue {
                field: "maxOutputPixels",
            });
        }
        Ok(())
    }

    /// Reject an output raster larger than `max_output_pixels`.
    ///
    /// Trials never grow after the first, so checking the initial
    /// dimensions covers the whole search.
    pub fn check_output_size(&self, width: u32, height: u32) -> Result<(), ConfigError> {
        let pixels = u64::from(width) * u64::from(height);
        if pixels > self.max_output_pixels {
            return Err(ConfigError::OutputTooLarge {
                width,
                height,
                max_pixels: self.max_output_pixels,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_quality_first() {
        let policy = SearchPolicy::default();
        assert_eq!(policy.phase_order, PhaseOrder::QualityFirst);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.quality_cap, 90);
        assert_eq!(policy.quality_floor, 50);
        assert_eq!(policy.quality_step, 10);
        assert_eq!(policy.enforcement, Enforcement::Strict);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_presets_validate() {
        assert!(SearchPolicy::scale_first().validate().is_ok());
        assert!(SearchPolicy::fixed_quality().validate().is_ok());
    }

    #[test]
    fn test_invalid_decay() {
        for decay in [0.0, 1.0, 1.5, -0.2, f64::NAN] {
            let policy = SearchPolicy {
                dimension_decay: decay,
                ..SearchPolicy::default()
            };
            assert!(matches!(
                policy.validate(),
                Err(ConfigError::InvalidDecay(_))
            ));
        }
    }

    #[test]
    fn test_floor_above_cap() {
        let policy = SearchPolicy {
            quality_floor: 95,
            ..SearchPolicy::default()
        };
        assert_eq!(
            policy.validate(),
            Err(ConfigError::QualityFloorAboveCap { floor: 95, cap: 90 })
        );
    }

    #[test]
    fn test_zero_attempts() {
        let policy = SearchPolicy::default().with_max_attempts(0);
        assert!(matches!(
            policy.validate(),
            Err(ConfigError::ZeroValue {
                field: "maxAttempts"
            })
        ));
    }

    #[test]
    fn test_zero_output_pixels() {
        let policy = SearchPolicy {
            max_output_pixels: 0,
            ..SearchPolicy::default()
        };
        assert!(matches!(
            policy.validate(),
            Err(ConfigError::ZeroValue {
                field: "maxOutputPixels"
            })
        ));
    }

    #[test]
    fn test_output_size_ceiling() {
        let policy = SearchPolicy::default();
        assert!(policy.check_output_size(16_384, 16_384).is_ok());
        assert_eq!(
            policy.check_output_size(400, 16_000_000),
            Err(ConfigError::OutputTooLarge {
                width: 400,
                height: 16_000_000,
                max_pixels: DEFAULT_MAX_OUTPUT_PIXELS,
            })
        );
        // No overflow at the u32 extremes
        assert!(policy.check_output_size(u32::MAX, u32::MAX).is_err());
    }

    #[test]
    fn test_policy_deserializes_partial() {
        let policy: SearchPolicy =
            serde_json::from_str(r#"{"phaseOrder":"scaleFirst","enforcement":"bestEffort"}"#)
                .unwrap();
        assert_eq!(policy.phase_order, PhaseOrder::ScaleFirst);
        assert_eq!(policy.enforcement, Enforcement::BestEffort);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.max_output_pixels, DEFAULT_MAX_OUTPUT_PIXELS);
    }
}
