//! ClipCompress WASM - WebAssembly bindings for ClipCompress
//!
//! This crate exposes the clipcompress-core engine to the browser extension's
//! service worker and content scripts.
//!
//! # Module Structure
//!
//! - `compress` - Compress image bytes (blocking and awaited)
//! - `fetch` - Download page images and handle request messages
//! - `types` - WASM-compatible wrapper types for results
//! - `logger` - `log` backend writing to the browser console
//! - `timer` - `setTimeout` sleeps and `AbortSignal` checks
//!
//! # Usage
//!
//! ```typescript
//! import init, { handle_request, set_log_level } from '@clipcompress/wasm';
//!
//! await init();
//! set_log_level('debug');
//!
//! const response = await handle_request({
//!   type: 'fetchAndCompress',
//!   imageUrl: info.srcUrl,
//!   settings,
//! });
//! if (response.success) {
//!   const blob = new Blob([response.result.bytes], { type: response.result.mimeType });
//! }
//! ```

use wasm_bindgen::prelude::*;

mod compress;
mod fetch;
mod logger;
mod timer;
mod types;

// Re-export public types
pub use compress::{compress_clipboard_image, compress_image, compress_image_async};
pub use fetch::{fetch_and_compress, handle_request};
pub use types::JsCompressionResult;

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    logger::install();
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Byte budget for the settings form's megabyte field, clamped to 0.1-10 MB.
#[wasm_bindgen]
pub fn megabytes_to_bytes(megabytes: f64) -> usize {
    clipcompress_core::compress::megabytes_to_bytes(megabytes)
}

/// Set the console log level (`off`, `error`, `warn`, `info`, `debug`, `trace`).
#[wasm_bindgen]
pub fn set_log_level(level: &str) -> Result<(), JsValue> {
    let filter = logger::parse_level(level)
        .ok_or_else(|| JsValue::from_str(&format!("Unknown log level: {}", level)))?;
    log::set_max_level(filter);
    Ok(())
}
