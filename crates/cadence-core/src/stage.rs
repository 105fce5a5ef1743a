//! The analysis stage contract.
//!
//! Every DSP object in the workspace (onset and tempo detectors, pitch
//! tracker, phase vocoder, filter bank, IIR filter) is an owned handle with the
//! same shape: it is constructed from mode and size parameters, fed one input
//! block per call, exposes one result buffer, and is torn down by an explicit
//! [`release`](AnalysisStage::release).
//!
//! ## Released handles
//!
//! After `release`, every operation must degrade to a no-op (or a zero
//! value) and emit a diagnostic through [`log_released`](crate::log_released).
//! A streaming loop that outlives one of its stages keeps running instead of
//! touching freed state.

/// Object that consumes one input block and updates one internal result.
///
/// # Example
///
/// ```rust
/// use cadence_core::{AnalysisStage, Filter, SampleBuffer};
///
/// let mut filter = Filter::new(3, 4).unwrap();
/// let input = SampleBuffer::from_slice(&[1.0, 0.0, 0.0, 0.0]);
///
/// filter.process(&input);
/// assert_eq!(filter.output().to_vec(), vec![1.0, 0.0, 0.0, 0.0]);
///
/// filter.release();
/// filter.release();
/// filter.process(&input);
/// assert_eq!(filter.output().size(), 0);
/// ```
pub trait AnalysisStage {
    /// Block type consumed per call.
    type Input;
    /// Result type owned by the stage.
    type Output;

    /// Runs the stage over one input block.
    fn process(&mut self, input: &Self::Input);

    /// Result of the most recent [`process`](Self::process) call.
    ///
    /// The buffer is owned by the stage and overwritten by the next call;
    /// copy it out to keep it.
    fn output(&self) -> &Self::Output;

    /// Frees the internal state and the result buffer. Idempotent.
    fn release(&mut self);

    /// Whether [`release`](Self::release) has been called.
    fn is_released(&self) -> bool;
}
