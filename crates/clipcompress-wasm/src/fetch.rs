//! Page-image download and the message-channel entry point.
//!
//! # Functions
//!
//! - [`fetch_and_compress`] - Download an image (with retries) and compress it
//! - [`handle_request`] - Run a `fetchAndCompress` / `compressClipboardImage` message

use clipcompress_core::compress::{CompressionResult, TargetSpec};
use clipcompress_core::fetch::{
    fetch_with_retry, normalize_image_url, FetchError, FetchedImage, RetryPolicy,
};
use clipcompress_core::message::{
    success_message, user_message, CompressRequest, CompressResponse, CompressionSummary, Job,
    MessageError, ProcessError,
};
use js_sys::{Promise, Reflect, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, JsFuture};
use web_sys::{AbortSignal, Request, RequestCredentials, RequestInit, RequestMode, Response};

use crate::compress::run_compression;
use crate::timer;
use crate::types::{settings_from_js, JsCompressionResult};

/// Best-effort text for a rejected JS promise.
fn describe_js_error(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value
        .as_string()
        .unwrap_or_else(|| format!("{:?}", value))
}

fn network_error(value: JsValue) -> FetchError {
    FetchError::Network(describe_js_error(&value))
}

fn start_fetch(request: &Request) -> Result<Promise, JsValue> {
    let global = js_sys::global();
    if let Some(window) = global.dyn_ref::<web_sys::Window>() {
        Ok(window.fetch_with_request(request))
    } else if let Some(worker) = global.dyn_ref::<web_sys::WorkerGlobalScope>() {
        Ok(worker.fetch_with_request(request))
    } else {
        Err(JsValue::from_str("fetch is not available in this context"))
    }
}

/// One GET request for an image, CORS mode, no credentials.
async fn fetch_once(url: String, signal: Option<AbortSignal>) -> Result<FetchedImage, FetchError> {
    let init = RequestInit::new();
    init.set_method("GET");
    init.set_mode(RequestMode::Cors);
    init.set_credentials(RequestCredentials::Omit);
    init.set_signal(signal.as_ref());

    let request = Request::new_with_str_and_init(&url, &init).map_err(network_error)?;
    request
        .headers()
        .set("Accept", "image/*")
        .map_err(network_error)?;

    let response: Response = JsFuture::from(start_fetch(&request).map_err(network_error)?)
        .await
        .map_err(network_error)?
        .dyn_into()
        .map_err(network_error)?;

    if !response.ok() {
        return Err(FetchError::Http {
            status: response.status(),
        });
    }

    let headers = response.headers();
    let content_type = headers
        .get("content-type")
        .map_err(network_error)?
        .unwrap_or_default();
    let content_length = headers
        .get("content-length")
        .ok()
        .flatten()
        .and_then(|len| len.parse().ok());

    let buffer = JsFuture::from(response.array_buffer().map_err(network_error)?)
        .await
        .map_err(network_error)?;

    Ok(FetchedImage {
        bytes: Uint8Array::new(&buffer).to_vec(),
        content_type,
        content_length,
    })
}

async fn download(url: &str, signal: Option<AbortSignal>) -> Result<FetchedImage, FetchError> {
    let url = normalize_image_url(url);
    let fetch_signal = signal.clone();
    fetch_with_retry(
        &url,
        RetryPolicy::default(),
        |url: &str| fetch_once(url.to_string(), fetch_signal.clone()),
        |ms| {
            let aborted = timer::is_aborted(signal.as_ref());
            async move {
                if aborted {
                    return;
                }
                if let Err(err) = timer::sleep(ms).await {
                    log::debug!("Retry delay skipped: {:?}", err);
                }
            }
        },
    )
    .await
}

async fn run_job(job: Job, signal: Option<AbortSignal>) -> Result<CompressionResult, ProcessError> {
    let (bytes, spec): (Vec<u8>, TargetSpec) = match job {
        Job::Fetch { url, spec } => (download(&url, signal.clone()).await?.bytes, spec),
        Job::Clipboard { bytes, spec } => (bytes, spec),
    };
    Ok(run_compression(&bytes, &spec, signal).await?)
}

/// Download the image at `url` and compress it to fit `settings`.
///
/// Wikimedia thumbnail URLs are rewritten to the original file first. The
/// download is retried up to three times. Rejects with the user-facing error
/// text, or with an `AbortError` once `signal` is aborted.
#[wasm_bindgen]
pub fn fetch_and_compress(url: String, settings: JsValue, signal: Option<AbortSignal>) -> Promise {
    let spec = match settings_from_js(settings) {
        Ok(settings) => settings.resolve(),
        Err(err) => return Promise::reject(&err),
    };

    future_to_promise(async move {
        let job = Job::Fetch { url, spec };
        match run_job(job, signal.clone()).await {
            Ok(result) => Ok(JsCompressionResult::from(result).into()),
            Err(_) if timer::is_aborted(signal.as_ref()) => Err(timer::abort_error()),
            Err(err) => Err(JsValue::from_str(&user_message(&err))),
        }
    })
}

/// Handle a request message and resolve to its response object.
///
/// The promise always resolves: failures become
/// `{ success: false, error }` with user-facing text. On success
/// `response.result.bytes` holds the encoded image as a `Uint8Array`.
#[wasm_bindgen]
pub fn handle_request(request: JsValue, signal: Option<AbortSignal>) -> Promise {
    future_to_promise(async move {
        let outcome = match serde_wasm_bindgen::from_value::<CompressRequest>(request) {
            Ok(request) => match request.into_job() {
                Ok(job) => run_job(job, signal).await,
                Err(err) => Err(err.into()),
            },
            Err(err) => Err(MessageError::Malformed(err.to_string()).into()),
        };

        match outcome {
            Ok(result) => {
                let summary = CompressionSummary::from(&result);
                log::info!("{}", success_message(&summary));
                respond(CompressResponse::success(summary), Some(&result.bytes))
            }
            Err(err) => {
                log::warn!("Request failed: {}", err);
                respond(CompressResponse::failure(&err), None)
            }
        }
    })
}

fn respond(response: CompressResponse, bytes: Option<&[u8]>) -> Result<JsValue, JsValue> {
    let value =
        serde_wasm_bindgen::to_value(&response).map_err(|e| JsValue::from_str(&e.to_string()))?;
    if let Some(bytes) = bytes {
        let result = Reflect::get(&value, &JsValue::from_str("result"))?;
        Reflect::set(
            &result,
            &JsValue::from_str("bytes"),
            &Uint8Array::from(bytes).into(),
        )?;
    }
    Ok(value)
}
