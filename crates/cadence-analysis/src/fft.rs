//! FFT wrapper with windowing functions

use cadence_core::{ComplexBuffer, StageError};
use rustfft::{FftPlanner, num_complex::Complex};
use std::f32::consts::PI;
use std::str::FromStr;
use std::sync::Arc;

/// Window function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    /// Rectangular (no windowing)
    Rectangular,
    /// Hann window (raised cosine)
    #[default]
    Hann,
    /// Hamming window
    Hamming,
    /// Blackman window
    Blackman,
}

impl Window {
    /// Apply window to a buffer
    pub fn apply(&self, buffer: &mut [f32]) {
        let n = buffer.len();
        match self {
            Window::Rectangular => {}
            Window::Hann => {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    let w = 0.5 * (1.0 - (2.0 * PI * i as f32 / n as f32).cos());
                    *sample *= w;
                }
            }
            Window::Hamming => {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    let w = 0.54 - 0.46 * (2.0 * PI * i as f32 / n as f32).cos();
                    *sample *= w;
                }
            }
            Window::Blackman => {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    let x = 2.0 * PI * i as f32 / n as f32;
                    let w = 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos();
                    *sample *= w;
                }
            }
        }
    }

    /// Get window coefficients
    pub fn coefficients(&self, size: usize) -> Vec<f32> {
        let mut coeffs = vec![1.0; size];
        self.apply(&mut coeffs);
        coeffs
    }
}

impl FromStr for Window {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rectangle" | "rectangular" | "ones" => Ok(Window::Rectangular),
            "hann" | "hanning" | "default" => Ok(Window::Hann),
            "hamming" => Ok(Window::Hamming),
            "blackman" => Ok(Window::Blackman),
            other => Err(StageError::unknown_mode("window", other)),
        }
    }
}

/// FFT processor with cached plans and scratch space
pub struct Fft {
    fft: Arc<dyn rustfft::Fft<f32>>,
    ifft: Arc<dyn rustfft::Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    size: usize,
}

impl std::fmt::Debug for Fft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fft").field("size", &self.size).finish()
    }
}

impl Fft {
    /// Create a new FFT processor for the given size
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);

        Self {
            fft,
            ifft,
            buffer: vec![Complex::new(0.0, 0.0); size],
            size,
        }
    }

    /// Get FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of positive-frequency bins (DC to Nyquist)
    pub fn bins(&self) -> usize {
        self.size / 2 + 1
    }

    /// Forward FFT of real input into a polar frame.
    ///
    /// Input is zero-padded or truncated to the FFT size. Writes
    /// `min(size/2 + 1, grain.size())` bins.
    pub fn forward_polar(&mut self, input: &[f32], grain: &mut ComplexBuffer) {
        for (slot, x) in self.buffer.iter_mut().zip(input.iter().chain(std::iter::repeat(&0.0))) {
            *slot = Complex::new(*x, 0.0);
        }
        self.fft.process(&mut self.buffer);

        let (norm, phase) = grain.split_mut();
        for ((n, p), c) in norm.iter_mut().zip(phase.iter_mut()).zip(self.buffer.iter()) {
            *n = c.norm();
            *p = c.arg();
        }
    }

    /// Inverse FFT of a polar frame holding `size/2 + 1` bins.
    ///
    /// Negative frequencies are rebuilt by conjugate symmetry. Writes
    /// `min(size, out.len())` samples, scaled by `1/size`.
    pub fn inverse_polar(&mut self, grain: &ComplexBuffer, out: &mut [f32]) {
        let norm = grain.magnitudes_slice();
        let phase = grain.phases_slice();
        let bins = self.bins().min(norm.len());

        self.buffer.fill(Complex::new(0.0, 0.0));
        for k in 0..bins {
            self.buffer[k] = Complex::from_polar(norm[k], phase[k]);
        }
        // Mirror for negative frequencies (conjugate symmetry)
        for k in 1..bins {
            let mirror = self.size - k;
            if mirror >= bins {
                self.buffer[mirror] = self.buffer[k].conj();
            }
        }

        self.ifft.process(&mut self.buffer);

        let scale = 1.0 / self.size as f32;
        for (o, c) in out.iter_mut().zip(self.buffer.iter()) {
            *o = c.re * scale;
        }
    }

    /// Perform forward FFT on complex input (in-place)
    pub fn forward_complex(&self, buffer: &mut [Complex<f32>]) {
        self.fft.process(buffer);
    }

    /// Perform inverse FFT on complex buffer (in-place)
    pub fn inverse_complex(&self, buffer: &mut [Complex<f32>]) {
        self.ifft.process(buffer);

        // Normalize
        let scale = 1.0 / self.size as f32;
        for c in buffer.iter_mut() {
            *c *= scale;
        }
    }
}
