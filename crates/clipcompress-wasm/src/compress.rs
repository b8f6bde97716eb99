//! Compression WASM bindings.
//!
//! # Functions
//!
//! - [`compress_image`] - Compress bytes to fit the stored settings (blocking)
//! - [`compress_image_async`] - Same, yielding to the event loop between attempts
//! - [`compress_clipboard_image`] - Compress to PNG for the clipboard
//!
//! # Example
//!
//! ```typescript
//! import { compress_image_async } from '@clipcompress/wasm';
//!
//! const controller = new AbortController();
//! const bytes = new Uint8Array(await blob.arrayBuffer());
//! const result = await compress_image_async(bytes, settings, controller.signal);
//! const out = new Blob([result.bytes()], { type: result.mime_type });
//! ```

use clipcompress_core::compress::{
    CompressError, CompressionEngine, CompressionResult, TargetSpec,
};
use js_sys::Promise;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::AbortSignal;

use crate::timer;
use crate::types::{settings_from_js, JsCompressionResult};

/// Map an engine error to the value a binding rejects with.
pub(crate) fn compress_error_to_js(error: CompressError) -> JsValue {
    match error {
        CompressError::Cancelled => timer::abort_error(),
        other => JsValue::from_str(&other.to_string()),
    }
}

/// Run the awaited search, yielding one macrotask per attempt.
pub(crate) async fn run_compression(
    bytes: &[u8],
    spec: &TargetSpec,
    signal: Option<AbortSignal>,
) -> Result<CompressionResult, CompressError> {
    CompressionEngine::new()
        .compress_async(bytes, spec, || timer::yield_to_host(signal.clone()))
        .await
}

/// Compress an image to fit the stored settings, blocking the calling thread.
///
/// Prefer [`compress_image_async`] on the main thread; large sources can take
/// several encodes.
///
/// # Arguments
///
/// * `bytes` - Encoded source image (JPEG, PNG, WebP, GIF or BMP)
/// * `settings` - Stored settings object; missing keys use the defaults
///
/// # Errors
///
/// Rejects invalid settings, undecodable input and budgets that cannot be met.
#[wasm_bindgen]
pub fn compress_image(bytes: &[u8], settings: JsValue) -> Result<JsCompressionResult, JsValue> {
    let spec = settings_from_js(settings)?.resolve();
    CompressionEngine::new()
        .compress(bytes, &spec)
        .map(JsCompressionResult::from)
        .map_err(compress_error_to_js)
}

/// Compress an image for the clipboard. Output is always PNG.
#[wasm_bindgen]
pub fn compress_clipboard_image(
    bytes: &[u8],
    settings: JsValue,
) -> Result<JsCompressionResult, JsValue> {
    let spec = settings_from_js(settings)?.resolve().for_clipboard();
    CompressionEngine::new()
        .compress(bytes, &spec)
        .map(JsCompressionResult::from)
        .map_err(compress_error_to_js)
}

/// Compress an image without blocking the event loop.
///
/// Resolves to a `JsCompressionResult`. Aborting `signal` rejects the
/// promise with an `AbortError` at the next attempt boundary.
#[wasm_bindgen]
pub fn compress_image_async(
    bytes: Vec<u8>,
    settings: JsValue,
    signal: Option<AbortSignal>,
) -> Promise {
    let spec = match settings_from_js(settings) {
        Ok(settings) => settings.resolve(),
        Err(err) => return Promise::reject(&err),
    };

    future_to_promise(async move {
        run_compression(&bytes, &spec, signal)
            .await
            .map(|result| JsCompressionResult::from(result).into())
            .map_err(compress_error_to_js)
    })
}
