//! Request/response shapes exchanged between the extension's scripts, and
//! the user-facing text built from them.

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compress::{Attempt, CompressError, CompressionResult, Settings, TargetSpec};
use crate::fetch::FetchError;
use crate::format::OutputFormat;

const USER_ERROR_PREFIX: &str = "Failed to process image: ";

/// A malformed request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("No image URL provided")]
    MissingImageUrl,

    #[error("No image data provided")]
    MissingImageData,

    #[error("Missing compression settings")]
    MissingSettings,

    #[error("Invalid image data: {0}")]
    InvalidImageData(String),

    /// The message is not a known request shape
    #[error("Malformed request: {0}")]
    Malformed(String),
}

/// Anything that can end a request.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Message(#[from] MessageError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Compress(#[from] CompressError),
}

/// A request as it arrives over the message channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CompressRequest {
    /// Download a page image and compress it.
    #[serde(rename_all = "camelCase")]
    FetchAndCompress {
        image_url: Option<String>,
        settings: Option<Settings>,
    },
    /// Compress an image read from the clipboard (a data URL).
    #[serde(rename_all = "camelCase")]
    CompressClipboardImage {
        image_data: Option<String>,
        settings: Option<Settings>,
    },
}

/// A validated request, ready to run.
#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    Fetch { url: String, spec: TargetSpec },
    Clipboard { bytes: Vec<u8>, spec: TargetSpec },
}

impl CompressRequest {
    /// Check required fields and resolve settings into a spec.
    ///
    /// Clipboard jobs always produce PNG.
    pub fn into_job(self) -> Result<Job, MessageError> {
        match self {
            CompressRequest::FetchAndCompress {
                image_url,
                settings,
            } => {
                let url = image_url
                    .filter(|url| !url.is_empty())
                    .ok_or(MessageError::MissingImageUrl)?;
                let settings = settings.ok_or(MessageError::MissingSettings)?;
                Ok(Job::Fetch {
                    url,
                    spec: settings.resolve(),
                })
            }
            CompressRequest::CompressClipboardImage {
                image_data,
                settings,
            } => {
                let data = image_data
                    .filter(|data| !data.is_empty())
                    .ok_or(MessageError::MissingImageData)?;
                let settings = settings.ok_or(MessageError::MissingSettings)?;
                Ok(Job::Clipboard {
                    bytes: decode_data_url(&data)?,
                    spec: settings.resolve().for_clipboard(),
                })
            }
        }
    }
}

/// Decode a `data:<mime>;base64,<payload>` URL, or a bare base64 string.
pub fn decode_data_url(data: &str) -> Result<Vec<u8>, MessageError> {
    let payload = match data.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| MessageError::InvalidImageData("missing ',' in data URL".into()))?;
            if !header.ends_with(";base64") {
                return Err(MessageError::InvalidImageData(
                    "data URL is not base64-encoded".into(),
                ));
            }
            payload
        }
        None => data,
    };

    general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| MessageError::InvalidImageData(e.to_string()))
}

/// What the caller gets back about a successful compression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionSummary {
    pub original_size: usize,
    pub compressed_size: usize,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub format: OutputFormat,
    pub mime_type: String,
    /// Percent saved, one decimal place.
    pub ratio: String,
    pub best_effort: bool,
    pub attempts: Vec<Attempt>,
}

impl From<&CompressionResult> for CompressionSummary {
    fn from(result: &CompressionResult) -> Self {
        Self {
            original_size: result.original_size,
            compressed_size: result.compressed_size,
            width: result.width,
            height: result.height,
            quality: result.quality,
            format: result.format,
            mime_type: result.mime_type().to_string(),
            ratio: format!("{:.1}", result.savings_percent()),
            best_effort: result.best_effort,
            attempts: result.attempts.clone(),
        }
    }
}

/// Reply sent back over the message channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<CompressionSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompressResponse {
    pub fn success(summary: CompressionSummary) -> Self {
        Self {
            success: true,
            result: Some(summary),
            error: None,
        }
    }

    /// Failure reply carrying [`user_message`] text.
    pub fn failure(error: &ProcessError) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(user_message(error)),
        }
    }
}

/// Text shown to the user when a request fails.
pub fn user_message(error: &ProcessError) -> String {
    let detail = match error {
        ProcessError::Fetch(fetch) => match fetch.root() {
            FetchError::Network(_) => {
                "Could not download the image. Please check your internet connection.".to_string()
            }
            FetchError::Http { .. } => {
                "The image server returned an error. Please try again later.".to_string()
            }
            FetchError::NotAnImage { .. } => {
                "The URL does not point to a valid image file.".to_string()
            }
            other => other.to_string(),
        },
        other => other.to_string(),
    };
    format!("{USER_ERROR_PREFIX}{detail}")
}

/// Human-readable byte count: `512 B`, `1.5 KB`, `2.0 MB`.
pub fn format_file_size(bytes: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * 1024;

    if bytes < KIB {
        format!("{bytes} B")
    } else if bytes < MIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    }
}

/// Notification text for a successful compression.
pub fn success_message(summary: &CompressionSummary) -> String {
    format!(
        "Image compressed and copied! ({} → {}, {}% smaller)",
        format_file_size(summary.original_size),
        format_file_size(summary.compressed_size),
        summary.ratio
    )
}
