//! Timers and cancellation on the host event loop.
//!
//! Works in both a page (`Window`) and the extension's service worker
//! (`WorkerGlobalScope`).

use std::ops::ControlFlow;

use js_sys::{Function, Promise};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortSignal, Window, WorkerGlobalScope};

fn set_timeout(callback: &Function, ms: i32) -> Result<i32, JsValue> {
    let global = js_sys::global();
    if let Some(window) = global.dyn_ref::<Window>() {
        window.set_timeout_with_callback_and_timeout_and_arguments_0(callback, ms)
    } else if let Some(worker) = global.dyn_ref::<WorkerGlobalScope>() {
        worker.set_timeout_with_callback_and_timeout_and_arguments_0(callback, ms)
    } else {
        Err(JsValue::from_str("setTimeout is not available in this context"))
    }
}

/// Resolve after `ms` milliseconds.
pub(crate) async fn sleep(ms: u32) -> Result<(), JsValue> {
    let delay = i32::try_from(ms).unwrap_or(i32::MAX);
    let promise = Promise::new(&mut |resolve, reject| {
        if let Err(err) = set_timeout(&resolve, delay) {
            let _ = reject.call1(&JsValue::UNDEFINED, &err);
        }
    });
    JsFuture::from(promise).await.map(|_| ())
}

pub(crate) fn is_aborted(signal: Option<&AbortSignal>) -> bool {
    signal.is_some_and(AbortSignal::aborted)
}

/// Hand the event loop back for one macrotask, then report whether the
/// caller should keep going.
pub(crate) async fn yield_to_host(signal: Option<AbortSignal>) -> ControlFlow<()> {
    if is_aborted(signal.as_ref()) {
        return ControlFlow::Break(());
    }
    if let Err(err) = sleep(0).await {
        log::debug!("Yield skipped: {:?}", err);
    }
    if is_aborted(signal.as_ref()) {
        ControlFlow::Break(())
    } else {
        ControlFlow::Continue(())
    }
}

/// The `AbortError` a cancelled operation rejects with, matching what
/// `fetch` raises.
pub(crate) fn abort_error() -> JsValue {
    let error = js_sys::Error::new("The operation was aborted.");
    error.set_name("AbortError");
    error.into()
}
