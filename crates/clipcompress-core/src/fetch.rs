//! Downloading page images before compression.
//!
//! The transport itself lives with the host (the wasm crate uses the
//! browser's `fetch`); this module owns what happens around it: URL
//! normalization, response validation and the retry loop.

use std::future::Future;

use log::{debug, info, warn};
use thiserror::Error;

/// Downloads above this many bytes get a "this may take a moment" hint.
pub const LARGE_DOWNLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Errors from fetching a source image.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// The server answered with a non-success status
    #[error("HTTP error! status: {status}")]
    Http { status: u16 },

    /// The response body is not an image
    #[error("Response is not an image (content type: {content_type:?})")]
    NotAnImage { content_type: String },

    /// The request never produced a response
    #[error("Failed to fetch: {0}")]
    Network(String),

    /// Every attempt failed
    #[error("Failed to fetch image after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// The error behind a `RetriesExhausted`, or `self`.
    pub fn root(&self) -> &FetchError {
        match self {
            FetchError::RetriesExhausted { last, .. } => last.root(),
            other => other,
        }
    }
}

/// A downloaded response body and the headers the pipeline cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub content_length: Option<u64>,
}

/// How often and how patiently to retry a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the `attempt`-th failure (1-based).
    /// Grows linearly: 1s, 2s, 3s with the defaults.
    pub fn delay_for(&self, attempt: u32) -> u32 {
        self.base_delay_ms.saturating_mul(attempt)
    }
}

/// Rewrite Wikimedia thumbnail URLs to the original file.
///
/// `.../commons/thumb/a/ab/Cat.jpg/220px-Cat.jpg` becomes
/// `.../commons/a/ab/Cat.jpg`. Other URLs are returned unchanged.
pub fn normalize_image_url(url: &str) -> String {
    if !(url.contains("wikimedia.org") || url.contains("wikipedia.org")) {
        return url.to_string();
    }

    let mut normalized = url.replacen("/thumb/", "/", 1);
    if let Some(slash) = normalized.rfind('/') {
        if is_thumbnail_segment(&normalized[slash + 1..]) {
            normalized.truncate(slash);
        }
    }

    if normalized != url {
        debug!("Normalized Wikimedia URL {} -> {}", url, normalized);
    }
    normalized
}

/// Matches `<digits>px-<name>`.
fn is_thumbnail_segment(segment: &str) -> bool {
    let digits = segment.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return false;
    }
    segment[digits..]
        .strip_prefix("px-")
        .is_some_and(|name| !name.is_empty())
}

/// Reject responses whose content type is not `image/*`.
pub fn validate_content_type(content_type: &str) -> Result<(), FetchError> {
    if content_type.starts_with("image/") {
        Ok(())
    } else {
        Err(FetchError::NotAnImage {
            content_type: content_type.to_string(),
        })
    }
}

pub fn is_large_download(content_length: Option<u64>) -> bool {
    content_length.is_some_and(|len| len > LARGE_DOWNLOAD_BYTES)
}

/// Download `url` with retries.
///
/// `fetch_once` performs a single request; `sleep` waits the given number
/// of milliseconds. A response that is not an image counts as a failed
/// attempt, like a network or HTTP error.
///
/// # Errors
///
/// Returns `FetchError::RetriesExhausted` carrying the last failure once
/// `policy.max_attempts` attempts have failed.
pub async fn fetch_with_retry<F, Fut, S, SFut>(
    url: &str,
    policy: RetryPolicy,
    mut fetch_once: F,
    mut sleep: S,
) -> Result<FetchedImage, FetchError>
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<FetchedImage, FetchError>>,
    S: FnMut(u32) -> SFut,
    SFut: Future<Output = ()>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        debug!("Fetch attempt {} for {}", attempt, url);

        let outcome = match fetch_once(url).await {
            Ok(image) => validate_content_type(&image.content_type).map(|()| image),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(image) => {
                if is_large_download(image.content_length) {
                    info!(
                        "Downloading large image ({:?} bytes), this may take a moment",
                        image.content_length
                    );
                }
                debug!(
                    "Fetched {} bytes of {} from {}",
                    image.bytes.len(),
                    image.content_type,
                    url
                );
                return Ok(image);
            }
            Err(err) => {
                warn!("Fetch attempt {} for {} failed: {}", attempt, url, err);
                if attempt >= max_attempts {
                    return Err(FetchError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                sleep(policy.delay_for(attempt)).await;
            }
        }
    }
}
