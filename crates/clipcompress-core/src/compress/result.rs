//! Attempts, results and the terminal error of a compression call.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ConfigError, Trial};
use crate::decode::DecodeError;
use crate::encode::EncodeError;
use crate::format::OutputFormat;

/// One encoded trial and its size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub size: usize,
}

impl Attempt {
    /// The trial this attempt encoded.
    pub fn trial(&self) -> Trial {
        Trial {
            width: self.width,
            height: self.height,
            quality: self.quality,
        }
    }
}

/// Encoded output handed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionResult {
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Quality the bytes were encoded at (ignored by lossless formats).
    pub quality: u8,
    pub format: OutputFormat,
    /// Size of the source payload in bytes.
    pub original_size: usize,
    /// Size of `bytes`.
    pub compressed_size: usize,
    /// Set when the budget was not met and the caller accepted the smallest
    /// attempt instead.
    pub best_effort: bool,
    /// Every attempt made, in order.
    pub attempts: Vec<Attempt>,
}

impl CompressionResult {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Percentage of the original size saved. Negative when the output grew,
    /// which happens when small sources are upscaled.
    pub fn savings_percent(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        (self.original_size as f64 - self.compressed_size as f64) / self.original_size as f64
            * 100.0
    }
}

/// Terminal failure of a compression call.
#[derive(Debug, Error)]
pub enum CompressError {
    #[error("Invalid compression settings: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not decode image: {0}")]
    Decode(#[from] DecodeError),

    #[error("Could not encode image: {0}")]
    Encode(#[from] EncodeError),

    /// The caller stopped an awaited search.
    #[error("Compression was cancelled")]
    Cancelled,

    /// Strict enforcement and no attempt met the budget.
    #[error(
        "Could not compress image below {max_file_size} bytes (smallest attempt: {best_size} bytes after {} attempts)",
        .attempts.len()
    )]
    Infeasible {
        max_file_size: usize,
        best_size: usize,
        attempts: Vec<Attempt>,
    },
}

impl CompressError {
    /// Attempts made before the failure. Only `Infeasible` carries any.
    pub fn attempts(&self) -> &[Attempt] {
        match self {
            CompressError::Infeasible { attempts, .. } => attempts,
            _ => &[],
        }
    }
}
