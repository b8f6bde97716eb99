//! Adaptive compression search.
//!
//! Given a source image and a [`TargetSpec`] (width window plus byte
//! budget), the engine decodes the source once, picks initial dimensions
//! inside the window, then alternates encode attempts with reductions of
//! quality and width until an attempt fits the budget or the search bounds
//! run out.
//!
//! # Architecture
//!
//! - [`spec`](TargetSpec): caller constraints and stored settings
//! - [`SearchPolicy`]: the search constants (step sizes, ordering, enforcement)
//! - [`SearchState`]: pure decision logic, one [`Trial`] at a time
//! - [`CompressionEngine`]: drives the state with a rasterizer and an encoder

mod engine;
mod policy;
mod result;
mod search;
mod spec;

pub use engine::CompressionEngine;
pub use policy::{Enforcement, PhaseOrder, SearchPolicy, DEFAULT_MAX_OUTPUT_PIXELS};
pub use result::{Attempt, CompressError, CompressionResult};
pub use search::{Decision, SearchPhase, SearchState, Trial};
pub use spec::{
    megabytes_to_bytes, ConfigError, Settings, TargetSpec, DEFAULT_FORMAT, DEFAULT_MAX_FILE_SIZE,
    DEFAULT_QUALITY, DEFAULT_WIDTH,
};
