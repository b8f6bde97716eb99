//! Drives a [`SearchState`] with a rasterizer and an encoder.

use std::future::Future;
use std::ops::ControlFlow;

use log::{debug, info, warn};

use super::{
    Attempt, CompressError, CompressionResult, Decision, Enforcement, SearchPolicy, SearchState,
    TargetSpec, Trial,
};
use crate::codec::{Encoder, ImageCodec, Rasterizer};
use crate::decode::DecodedImage;
use crate::format::OutputFormat;

/// Shrinks images to fit a [`TargetSpec`].
///
/// The engine holds only its codecs and search constants; each call builds
/// its own search state and drops it on return, so one engine can serve
/// concurrent calls.
#[derive(Debug, Clone)]
pub struct CompressionEngine<R = ImageCodec, E = ImageCodec> {
    rasterizer: R,
    encoder: E,
    policy: SearchPolicy,
}

impl CompressionEngine {
    /// Engine backed by the `image` crate with the default policy.
    pub fn new() -> Self {
        Self::with_codecs(ImageCodec::default(), ImageCodec::default())
    }
}

impl Default for CompressionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rasterizer, E: Encoder> CompressionEngine<R, E> {
    pub fn with_codecs(rasterizer: R, encoder: E) -> Self {
        Self {
            rasterizer,
            encoder,
            policy: SearchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SearchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &SearchPolicy {
        &self.policy
    }

    /// Compress `source` to fit `spec`, blocking until done.
    ///
    /// # Errors
    ///
    /// - `CompressError::Config` for an inconsistent spec or policy, before decoding,
    ///   or when the initial output would exceed the policy's pixel limit
    /// - `CompressError::Decode` if `source` is not a decodable image
    /// - `CompressError::Encode` if the encoder rejects a trial
    /// - `CompressError::Infeasible` if the budget cannot be met under strict enforcement
    pub fn compress(
        &self,
        source: &[u8],
        spec: &TargetSpec,
    ) -> Result<CompressionResult, CompressError> {
        self.check(spec)?;
        let mut run = self.start(source, spec)?;
        loop {
            if let Some(result) = run.step()? {
                return Ok(result);
            }
        }
    }

    /// Compress `source` to fit `spec`, awaiting `yield_now()` before the
    /// decode and before every attempt.
    ///
    /// The yield future is how a single-threaded host gets its event loop
    /// back between the expensive steps. Resolving it to
    /// `ControlFlow::Break` stops the search with `CompressError::Cancelled`.
    /// Dropping the returned future also abandons the search; the partially
    /// built state goes with it.
    pub async fn compress_async<Y, F>(
        &self,
        source: &[u8],
        spec: &TargetSpec,
        mut yield_now: Y,
    ) -> Result<CompressionResult, CompressError>
    where
        Y: FnMut() -> F,
        F: Future<Output = ControlFlow<()>>,
    {
        self.check(spec)?;
        if yield_now().await.is_break() {
            return Err(CompressError::Cancelled);
        }
        let mut run = self.start(source, spec)?;
        loop {
            if yield_now().await.is_break() {
                debug!("Cancelled after {} attempts", run.search.attempts().len());
                return Err(CompressError::Cancelled);
            }
            if let Some(result) = run.step()? {
                return Ok(result);
            }
        }
    }

    fn check(&self, spec: &TargetSpec) -> Result<(), CompressError> {
        spec.validate()?;
        self.policy.validate()?;
        Ok(())
    }

    fn start(&self, source: &[u8], spec: &TargetSpec) -> Result<Run<'_, R, E>, CompressError> {
        let image = self.rasterizer.decode(source)?;
        let format = spec
            .format
            .unwrap_or_else(|| OutputFormat::infer(image.source_format));
        let search = SearchState::new(image.width, image.height, spec, format, self.policy);
        if let Some(first) = search.next_trial() {
            self.policy.check_output_size(first.width, first.height)?;
        }

        debug!(
            "Compressing {}x{} source ({} bytes) to {} within {} bytes, width {}..={}",
            image.width,
            image.height,
            source.len(),
            format,
            spec.max_file_size,
            spec.min_width,
            spec.max_width
        );

        Ok(Run {
            engine: self,
            source: image,
            resampled: None,
            format,
            search,
            original_size: source.len(),
            max_file_size: spec.max_file_size,
            best: None,
        })
    }
}

/// State of one in-flight compression.
struct Run<'a, R, E> {
    engine: &'a CompressionEngine<R, E>,
    source: DecodedImage,
    /// Last resampled raster; quality-only steps reuse it.
    resampled: Option<DecodedImage>,
    format: OutputFormat,
    search: SearchState,
    original_size: usize,
    max_file_size: usize,
    /// Smallest over-budget encoding so far.
    best: Option<(Trial, Vec<u8>)>,
}

impl<R: Rasterizer, E: Encoder> Run<'_, R, E> {
    /// Make one attempt. `Ok(None)` means another attempt is needed.
    fn step(&mut self) -> Result<Option<CompressionResult>, CompressError> {
        let Some(trial) = self.search.next_trial() else {
            return self.give_up().map(Some);
        };

        let bytes = self.encode(trial)?;
        let decision = self.search.record(bytes.len());

        debug!(
            "Attempt {} ({:?}): {}x{} q{} -> {} bytes",
            self.search.attempts().len(),
            decision,
            trial.width,
            trial.height,
            trial.quality,
            bytes.len()
        );

        match decision {
            Decision::Accept => Ok(Some(self.finish(trial, bytes, false))),
            Decision::Retry => {
                self.keep_if_smaller(trial, bytes);
                Ok(None)
            }
            Decision::GiveUp => {
                self.keep_if_smaller(trial, bytes);
                self.give_up().map(Some)
            }
        }
    }

    fn encode(&mut self, trial: Trial) -> Result<Vec<u8>, CompressError> {
        let engine = self.engine;
        if trial.width == self.source.width && trial.height == self.source.height {
            return Ok(engine.encoder.encode(&self.source, self.format, trial.quality)?);
        }

        let image = match self.resampled.take() {
            Some(img) if img.width == trial.width && img.height == trial.height => img,
            _ => engine
                .rasterizer
                .resample(&self.source, trial.width, trial.height)?,
        };
        let bytes = engine.encoder.encode(&image, self.format, trial.quality)?;
        self.resampled = Some(image);
        Ok(bytes)
    }

    fn keep_if_smaller(&mut self, trial: Trial, bytes: Vec<u8>) {
        let smaller = self
            .best
            .as_ref()
            .is_none_or(|(_, best)| bytes.len() < best.len());
        if smaller {
            self.best = Some((trial, bytes));
        }
    }

    fn give_up(&mut self) -> Result<CompressionResult, CompressError> {
        let attempts = self.search.attempts().to_vec();
        let best_size = attempts.iter().map(|a| a.size).min().unwrap_or(0);

        match (self.engine.policy.enforcement, self.best.take()) {
            (Enforcement::BestEffort, Some((trial, bytes))) => {
                info!(
                    "Budget of {} bytes not met after {} attempts; keeping best effort of {} bytes",
                    self.max_file_size,
                    attempts.len(),
                    bytes.len()
                );
                Ok(self.finish(trial, bytes, true))
            }
            _ => {
                warn!(
                    "Budget of {} bytes not met after {} attempts (smallest {} bytes)",
                    self.max_file_size,
                    attempts.len(),
                    best_size
                );
                Err(CompressError::Infeasible {
                    max_file_size: self.max_file_size,
                    best_size,
                    attempts,
                })
            }
        }
    }

    fn finish(&self, trial: Trial, bytes: Vec<u8>, best_effort: bool) -> CompressionResult {
        let attempts: Vec<Attempt> = self.search.attempts().to_vec();
        if !best_effort {
            info!(
                "Compressed {} -> {} bytes at {}x{} q{} in {} attempt(s)",
                self.original_size,
                bytes.len(),
                trial.width,
                trial.height,
                trial.quality,
                attempts.len()
            );
        }
        CompressionResult {
            compressed_size: bytes.len(),
            bytes,
            width: trial.width,
            height: trial.height,
            quality: trial.quality,
            format: self.format,
            original_size: self.original_size,
            best_effort,
            attempts,
        }
    }
}
