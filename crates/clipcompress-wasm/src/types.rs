//! WASM-compatible wrapper types for compression results.
//!
//! This module provides JavaScript-friendly types that wrap the core
//! ClipCompress types, handling the conversion between Rust and JavaScript
//! data representations.

use clipcompress_core::compress::{CompressionResult, Settings};
use clipcompress_core::message::CompressionSummary;
use wasm_bindgen::prelude::*;

/// A compressed image wrapper for JavaScript.
///
/// # Memory Management
///
/// The encoded bytes live in WASM memory. `bytes()` copies them into a
/// `Uint8Array`, which is what a `Blob` or `ClipboardItem` needs anyway.
///
/// The `free()` method can be called to explicitly release WASM memory, but this is
/// optional as wasm-bindgen's finalizer will handle cleanup automatically.
#[wasm_bindgen]
pub struct JsCompressionResult {
    inner: CompressionResult,
}

#[wasm_bindgen]
impl JsCompressionResult {
    /// Output width in pixels
    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    /// Output height in pixels
    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    #[wasm_bindgen(getter)]
    pub fn quality(&self) -> u8 {
        self.inner.quality
    }

    /// Output format name (`jpeg`, `png` or `webp`)
    #[wasm_bindgen(getter)]
    pub fn format(&self) -> String {
        self.inner.format.to_string()
    }

    /// MIME type for the `Blob` / `ClipboardItem`
    #[wasm_bindgen(getter)]
    pub fn mime_type(&self) -> String {
        self.inner.mime_type().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn original_size(&self) -> usize {
        self.inner.original_size
    }

    #[wasm_bindgen(getter)]
    pub fn compressed_size(&self) -> usize {
        self.inner.compressed_size
    }

    /// True when the byte budget was not met and this is the smallest attempt
    #[wasm_bindgen(getter)]
    pub fn best_effort(&self) -> bool {
        self.inner.best_effort
    }

    #[wasm_bindgen(getter)]
    pub fn attempt_count(&self) -> usize {
        self.inner.attempts.len()
    }

    /// Returns the encoded image as Uint8Array (a copy).
    pub fn bytes(&self) -> Vec<u8> {
        self.inner.bytes.clone()
    }

    /// Sizes, ratio and attempt log as a plain object.
    pub fn summary(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&CompressionSummary::from(&self.inner))
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Explicitly free WASM memory.
    pub fn free(self) {
        // Dropping self releases the memory
    }
}

impl From<CompressionResult> for JsCompressionResult {
    fn from(inner: CompressionResult) -> Self {
        Self { inner }
    }
}

/// Read stored settings passed from JavaScript. `undefined` and `null`
/// mean "all defaults".
pub(crate) fn settings_from_js(value: JsValue) -> Result<Settings, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(Settings::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}
