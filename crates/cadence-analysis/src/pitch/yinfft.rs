//! YIN with an FFT-computed difference function.
//!
//! The autocorrelation comes from the power spectrum of the zero-padded
//! frame, so the cost is `O(n log n)` instead of `O(n^2)`. The difference
//! function is normalized by its overlap length; the estimate is the first
//! dip within a small margin of the global minimum of the normalized curve.

use cadence_core::parabolic_offset;
use rustfft::num_complex::Complex;

use super::Estimate;
use crate::fft::Fft;

/// Default threshold on the normalized difference at the chosen lag.
pub const DEFAULT_TOLERANCE: f32 = 0.85;

/// Dips within this margin of the global minimum compete on lag.
const OCTAVE_MARGIN: f32 = 0.1;

#[derive(Debug)]
pub(crate) struct YinFft {
    pub(crate) tolerance: f32,
    fft: Fft,
    spectrum: Vec<Complex<f32>>,
    energy: Vec<f32>,
    cmndf: Vec<f32>,
}

impl YinFft {
    pub(crate) fn new(buf_size: usize) -> Self {
        let fft_size = (2 * buf_size).next_power_of_two();
        Self {
            tolerance: DEFAULT_TOLERANCE,
            fft: Fft::new(fft_size),
            spectrum: vec![Complex::new(0.0, 0.0); fft_size],
            energy: vec![0.0; buf_size + 1],
            cmndf: vec![1.0; buf_size / 2],
        }
    }

    pub(crate) fn detect(&mut self, frame: &[f32], sample_rate: f32) -> Estimate {
        let n = frame.len().min(self.energy.len() - 1);
        let width = self.cmndf.len().min(n / 2);
        if width < 3 {
            return Estimate::UNVOICED;
        }
        let frame = &frame[..n];

        // Autocorrelation via |X|^2.
        for (slot, x) in self.spectrum.iter_mut().zip(frame.iter().chain(std::iter::repeat(&0.0))) {
            *slot = Complex::new(*x, 0.0);
        }
        self.fft.forward_complex(&mut self.spectrum);
        for c in self.spectrum.iter_mut() {
            *c = Complex::new(c.norm_sqr(), 0.0);
        }
        self.fft.inverse_complex(&mut self.spectrum);

        self.energy[0] = 0.0;
        for (i, x) in frame.iter().enumerate() {
            self.energy[i + 1] = self.energy[i] + x * x;
        }

        self.cmndf[0] = 1.0;
        let mut running = 0.0;
        for tau in 1..width {
            let head = self.energy[n - tau];
            let tail = self.energy[n] - self.energy[tau];
            let d = (head + tail - 2.0 * self.spectrum[tau].re).max(0.0);
            let d = d * n as f32 / (n - tau) as f32;
            running += d;
            self.cmndf[tau] = if running > 0.0 { d * tau as f32 / running } else { 1.0 };
        }

        let cmndf = &self.cmndf[..width];
        let (min_tau, min_val) = cmndf
            .iter()
            .copied()
            .enumerate()
            .skip(2)
            .fold((0, f32::MAX), |best, (t, v)| if v < best.1 { (t, v) } else { best });
        if min_tau == 0 || min_val >= self.tolerance {
            return Estimate {
                freq: 0.0,
                confidence: (1.0 - min_val).clamp(0.0, 1.0),
            };
        }

        // First local minimum close to the global one.
        let limit = min_val + OCTAVE_MARGIN;
        let tau = (2..width - 1)
            .find(|&t| cmndf[t] <= limit && cmndf[t] <= cmndf[t - 1] && cmndf[t] <= cmndf[t + 1])
            .unwrap_or(min_tau);

        let period = if tau + 1 < width {
            tau as f32 + parabolic_offset(cmndf[tau - 1], cmndf[tau], cmndf[tau + 1])
        } else {
            tau as f32
        };
        Estimate {
            freq: sample_rate / period,
            confidence: (1.0 - cmndf[tau]).clamp(0.0, 1.0),
        }
    }
}
