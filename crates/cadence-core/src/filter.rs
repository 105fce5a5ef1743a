//! Order-N direct-form-I IIR filter stage.
//!
//! The filter keeps `order` feedforward taps `b[0..order]` and `order`
//! feedback taps `a[0..order]` with `a[0] == 1`:
//!
//! ```text
//! y[n] = sum(b[i] * x[n-i], i = 0..order)
//!      - sum(a[i] * y[n-i], i = 1..order)
//! ```
//!
//! A new filter is a passthrough (`b[0] = a[0] = 1`, all other taps zero).
//! Order 3 is a biquad and can be designed with [`Filter::set_lowpass`] and
//! friends.

use crate::biquad::{self, BiquadDesign};
use crate::buffer::{LongBuffer, SampleBuffer};
use crate::error::StageError;
use crate::log_released;
use crate::stage::AnalysisStage;

const COMPONENT: &str = "filter";

/// Default sample rate used by the biquad designers.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

#[derive(Debug, Clone)]
struct FilterState {
    order: usize,
    sample_rate: u32,
    feedforward: LongBuffer,
    feedback: LongBuffer,
    /// x[n-1], x[n-2], ...
    x: Vec<f64>,
    /// y[n-1], y[n-2], ...
    y: Vec<f64>,
}

impl FilterState {
    fn run(&mut self, samples: &mut [f32]) {
        let b = self.feedforward.as_slice();
        let a = self.feedback.as_slice();
        let memory = self.order - 1;
        if b.len() < self.order || a.len() < self.order {
            #[cfg(feature = "tracing")]
            tracing::warn!(order = self.order, b = b.len(), a = a.len(), "filter: coefficient buffers shorter than order");
            return;
        }

        for sample in samples.iter_mut() {
            let input = f64::from(*sample);
            let mut acc = b[0] * input;
            for j in 0..memory {
                acc += b[j + 1] * self.x[j] - a[j + 1] * self.y[j];
            }
            if memory > 0 {
                self.x.copy_within(0..memory - 1, 1);
                self.y.copy_within(0..memory - 1, 1);
                self.x[0] = input;
                self.y[0] = acc;
            }
            *sample = acc as f32;
        }
    }

    fn reset(&mut self) {
        self.x.fill(0.0);
        self.y.fill(0.0);
    }
}

/// IIR filter with owned coefficient buffers and a result buffer of
/// `buf_size` samples.
///
/// # Example
///
/// ```rust
/// use cadence_core::{Filter, SampleBuffer};
///
/// let mut filter = Filter::new(3, 64).unwrap();
/// filter.set_sample_rate(48000);
/// filter.set_lowpass(1000.0, 0.707).unwrap();
///
/// let mut block = SampleBuffer::new(64);
/// block.fill(1.0);
/// filter.process_in_place(&mut block);
/// assert!(block.get(63).unwrap() > 0.9);
/// ```
#[derive(Debug, Clone)]
pub struct Filter {
    state: Option<FilterState>,
    out: SampleBuffer,
}

impl Filter {
    /// Creates a passthrough filter of the given order.
    ///
    /// `order` must be at least 1; `buf_size` sets the capacity of the
    /// result buffer used by [`process_out_of_place`](Self::process_out_of_place).
    pub fn new(order: usize, buf_size: usize) -> Result<Self, StageError> {
        if order == 0 {
            return Err(StageError::invalid_size("filter order", order));
        }
        Ok(Self::passthrough(order, buf_size))
    }

    /// Creates a passthrough second-order section (order 3).
    pub fn biquad(buf_size: usize) -> Self {
        Self::passthrough(3, buf_size)
    }

    fn passthrough(order: usize, buf_size: usize) -> Self {
        let mut feedforward = LongBuffer::new(order);
        let mut feedback = LongBuffer::new(order);
        feedforward.as_mut_slice()[0] = 1.0;
        feedback.as_mut_slice()[0] = 1.0;

        Self {
            state: Some(FilterState {
                order,
                sample_rate: DEFAULT_SAMPLE_RATE,
                feedforward,
                feedback,
                x: vec![0.0; order - 1],
                y: vec![0.0; order - 1],
            }),
            out: SampleBuffer::new(buf_size),
        }
    }

    /// Filters `buffer` in place, carrying state across calls.
    pub fn process_in_place(&mut self, buffer: &mut SampleBuffer) {
        let Some(state) = self.state.as_mut() else {
            log_released(COMPONENT, "process_in_place");
            return;
        };
        state.run(buffer.as_mut_slice());
    }

    /// Filters `input` into the owned result buffer.
    ///
    /// Copies `min(input.size(), buf_size)` samples; the rest of the result
    /// buffer is zeroed.
    pub fn process_out_of_place(&mut self, input: &SampleBuffer) {
        let Some(state) = self.state.as_mut() else {
            log_released(COMPONENT, "process_out_of_place");
            return;
        };
        let n = self.out.copy_from(input.as_slice());
        let out = self.out.as_mut_slice();
        out[n..].fill(0.0);
        state.run(&mut out[..n]);
    }

    /// Zero-phase filtering: a forward pass, then a pass over the reversed
    /// signal, reversed back.
    ///
    /// `work_size` is the capacity of the scratch buffer used for the
    /// reversed pass. When it is smaller than `buffer.size()` the call does
    /// nothing and logs a warning. State is cleared before each pass.
    pub fn process_forward_backward(&mut self, buffer: &mut SampleBuffer, work_size: usize) {
        let Some(state) = self.state.as_mut() else {
            log_released(COMPONENT, "process_forward_backward");
            return;
        };
        let len = buffer.size();
        if work_size < len {
            #[cfg(feature = "tracing")]
            tracing::warn!(work_size, len, "filter: scratch buffer too small for forward/backward pass");
            return;
        }

        state.reset();
        state.run(buffer.as_mut_slice());

        let mut scratch = SampleBuffer::new(work_size);
        let tmp = &mut scratch.as_mut_slice()[..len];
        for (dst, src) in tmp.iter_mut().zip(buffer.as_slice().iter().rev()) {
            *dst = *src;
        }
        state.reset();
        state.run(tmp);

        for (dst, src) in buffer.as_mut_slice().iter_mut().zip(tmp.iter().rev()) {
            *dst = *src;
        }
        scratch.release();
    }

    /// Clears the filter memory without touching the coefficients.
    pub fn reset(&mut self) {
        match self.state.as_mut() {
            Some(state) => state.reset(),
            None => log_released(COMPONENT, "reset"),
        }
    }

    /// Feedback taps `a[0..order]`; `None` once released.
    pub fn feedback_coefficients(&self) -> Option<&LongBuffer> {
        self.state.as_ref().map(|s| &s.feedback)
    }

    /// Feedforward taps `b[0..order]`; `None` once released.
    pub fn feedforward_coefficients(&self) -> Option<&LongBuffer> {
        self.state.as_ref().map(|s| &s.feedforward)
    }

    /// Mutable feedback taps for custom designs.
    ///
    /// The slice has exactly `order` entries; the storage itself stays owned
    /// by the filter and cannot be released or resized through it.
    pub fn feedback_coefficients_mut(&mut self) -> Option<&mut [f64]> {
        self.state.as_mut().map(|s| s.feedback.as_mut_slice())
    }

    /// Mutable feedforward taps for custom designs. See
    /// [`feedback_coefficients_mut`](Self::feedback_coefficients_mut).
    pub fn feedforward_coefficients_mut(&mut self) -> Option<&mut [f64]> {
        self.state.as_mut().map(|s| s.feedforward.as_mut_slice())
    }

    /// Filter order (number of taps per side), 0 once released.
    pub fn order(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.order)
    }

    /// Sample rate used by the designers, 0 once released.
    pub fn sample_rate(&self) -> u32 {
        self.state.as_ref().map_or(0, |s| s.sample_rate)
    }

    /// Sets the sample rate used by subsequent designs.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        match self.state.as_mut() {
            Some(state) => state.sample_rate = sample_rate,
            None => log_released(COMPONENT, "set_sample_rate"),
        }
    }

    /// Loads normalized biquad taps (order 3 only).
    pub fn set_biquad(&mut self, b0: f64, b1: f64, b2: f64, a1: f64, a2: f64) -> Result<(), StageError> {
        self.apply(BiquadDesign {
            b: [b0, b1, b2],
            a: [1.0, a1, a2],
        })
    }

    /// Designs a low-pass section at the current sample rate (order 3 only).
    pub fn set_lowpass(&mut self, frequency: f64, q: f64) -> Result<(), StageError> {
        let sr = f64::from(self.sample_rate());
        self.apply(biquad::lowpass(frequency, q, sr))
    }

    /// Designs a high-pass section at the current sample rate (order 3 only).
    pub fn set_highpass(&mut self, frequency: f64, q: f64) -> Result<(), StageError> {
        let sr = f64::from(self.sample_rate());
        self.apply(biquad::highpass(frequency, q, sr))
    }

    /// Designs a band-pass section at the current sample rate (order 3 only).
    pub fn set_bandpass(&mut self, frequency: f64, q: f64) -> Result<(), StageError> {
        let sr = f64::from(self.sample_rate());
        self.apply(biquad::bandpass(frequency, q, sr))
    }

    fn apply(&mut self, design: BiquadDesign) -> Result<(), StageError> {
        let Some(state) = self.state.as_mut() else {
            log_released(COMPONENT, "set_coefficients");
            return Ok(());
        };
        if state.order != 3 {
            return Err(StageError::InvalidOrder {
                expected: 3,
                actual: state.order,
            });
        }
        state.feedforward = LongBuffer::from_slice(&design.b);
        state.feedback = LongBuffer::from_slice(&design.a);
        Ok(())
    }
}

impl AnalysisStage for Filter {
    type Input = SampleBuffer;
    type Output = SampleBuffer;

    fn process(&mut self, input: &SampleBuffer) {
        self.process_out_of_place(input);
    }

    fn output(&self) -> &SampleBuffer {
        &self.out
    }

    fn release(&mut self) {
        if let Some(mut state) = self.state.take() {
            state.feedforward.release();
            state.feedback.release();
        }
        self.out.release();
    }

    fn is_released(&self) -> bool {
        self.state.is_none()
    }
}
