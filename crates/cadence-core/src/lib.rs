//! Cadence Core - buffers and stage contract for block-based audio analysis
//!
//! This crate provides the pieces every other cadence crate builds on: the
//! sample containers that flow through a pipeline, the trait that all
//! analysis stages implement, and a general IIR filter stage.
//!
//! # Core Abstractions
//!
//! ## Buffers
//!
//! - [`SampleBuffer`] - Fixed-capacity `f32` block
//! - [`ComplexBuffer`] - Polar spectrum frame (magnitudes and phases)
//! - [`LongBuffer`] - `f64` coefficient storage
//!
//! ## Stages
//!
//! - [`AnalysisStage`] - Construct, `process` a block, read `output`, `release`
//! - [`Filter`] - Order-N direct-form-I IIR filter with RBJ biquad designers
//! - [`StageError`] - Construction failures (unknown mode tokens, bad sizes)
//!
//! ## Utilities
//!
//! - Level math: [`db_to_linear`], [`linear_to_db`], [`level_db`], [`is_silence`]
//! - Pitch units: [`freq_to_midi`], [`freq_to_bin`], [`hz_to_mel`], etc.
//!
//! # Lifecycle
//!
//! Buffers and stages hold their storage in an `Option`. `release()` drops it
//! and is idempotent; afterwards sizes read as 0 and operations become no-ops
//! reported through [`log_released`].
//!
//! # Features
//!
//! - `tracing` - emit `tracing` events for released-handle misuse and
//!   degraded operations. Without it the diagnostics compile away.

pub mod biquad;
pub mod buffer;
pub mod error;
pub mod filter;
pub mod math;
pub mod stage;

pub use biquad::BiquadDesign;
pub use buffer::{ComplexBuffer, LongBuffer, SampleBuffer};
pub use error::StageError;
pub use filter::Filter;
pub use math::{
    bin_to_freq, db_to_linear, freq_to_bin, freq_to_midi, hz_to_mel, is_silence, level_db,
    linear_to_db, median, mel_to_hz, midi_to_freq, ms_to_samples, parabolic_offset, princarg,
};
pub use stage::AnalysisStage;

/// Reports an operation on a released handle.
///
/// Logged at `warn` with the component and operation names when the
/// `tracing` feature is enabled.
#[inline]
pub fn log_released(component: &'static str, operation: &'static str) {
    #[cfg(feature = "tracing")]
    tracing::warn!(component, operation, "operation on released handle ignored");
    #[cfg(not(feature = "tracing"))]
    let _ = (component, operation);
}
