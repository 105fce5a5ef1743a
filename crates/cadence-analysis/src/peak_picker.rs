//! Adaptive peak picking over a stream of detection-function values.
//!
//! The picker keeps the last `pre + post + 1` values, smooths them with a
//! zero-phase low-pass [`Filter`], and compares the value `post` frames back
//! with a moving threshold:
//!
//! ```text
//! thresholded = smoothed[pre] - median(smoothed) - threshold * mean(smoothed)
//! ```
//!
//! A peak is reported when the previous thresholded value is positive and
//! larger than both of its neighbours, so a peak is confirmed `post + 1`
//! frames after the value that caused it.

use cadence_core::{Filter, SampleBuffer, median};

/// Frames of past context.
pub const DEFAULT_PRE: usize = 1;
/// Frames of look-ahead.
pub const DEFAULT_POST: usize = 5;
/// Default threshold multiplier of the moving mean.
pub const DEFAULT_THRESHOLD: f32 = 0.1;

// Second-order low-pass used to smooth the history window.
const SMOOTH_B: [f64; 3] = [0.1600, 0.3200, 0.1600];
const SMOOTH_A: [f64; 2] = [-0.5949, 0.2348];

/// Moving-median peak picker.
#[derive(Debug, Clone)]
pub struct PeakPicker {
    threshold: f32,
    pre: usize,
    history: Vec<f32>,
    smoothed: SampleBuffer,
    scratch: Vec<f32>,
    smoother: Filter,
    peek: [f32; 3],
}

impl PeakPicker {
    /// Creates a picker with the default window (`pre = 1`, `post = 5`).
    pub fn new(threshold: f32) -> Self {
        Self::with_window(threshold, DEFAULT_PRE, DEFAULT_POST)
    }

    /// Creates a picker with explicit past and look-ahead lengths.
    pub fn with_window(threshold: f32, pre: usize, post: usize) -> Self {
        let len = pre + post + 1;
        let mut smoother = Filter::biquad(len);
        if let Some(b) = smoother.feedforward_coefficients_mut() {
            b.copy_from_slice(&SMOOTH_B);
        }
        if let Some(a) = smoother.feedback_coefficients_mut() {
            a[1..].copy_from_slice(&SMOOTH_A);
        }

        Self {
            threshold,
            pre,
            history: vec![0.0; len],
            smoothed: SampleBuffer::new(len),
            scratch: vec![0.0; len],
            smoother,
            peek: [0.0; 3],
        }
    }

    /// Threshold multiplier.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Sets the threshold multiplier.
    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    /// Frames between a value entering the picker and its peak being reported.
    pub fn delay(&self) -> usize {
        self.history.len() - self.pre
    }

    /// Latest thresholded value.
    pub fn thresholded(&self) -> f32 {
        self.peek[2]
    }

    /// Pushes one detection-function value. Returns `true` when a peak is
    /// confirmed.
    pub fn push(&mut self, value: f32) -> bool {
        self.history.rotate_left(1);
        if let Some(last) = self.history.last_mut() {
            *last = value;
        }

        let len = self.history.len();
        self.smoothed.copy_from(&self.history);
        self.smoother.process_forward_backward(&mut self.smoothed, len);
        let smoothed = self.smoothed.as_slice();

        let mean = smoothed.iter().sum::<f32>() / len as f32;
        self.scratch.copy_from_slice(smoothed);
        let med = median(&mut self.scratch);
        let current = smoothed[self.pre];

        self.peek.rotate_left(1);
        self.peek[2] = current - med - mean * self.threshold;

        let [p0, p1, p2] = self.peek;
        p1 > 0.0 && p1 > p0 && p1 > p2
    }

    /// Clears the history.
    pub fn reset(&mut self) {
        self.history.fill(0.0);
        self.peek = [0.0; 3];
    }
}

impl Default for PeakPicker {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}
