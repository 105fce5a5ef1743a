//! Spectral filter bank.
//!
//! Projects the magnitudes of a phase vocoder grain through an
//! `n_filters × (win_size / 2 + 1)` weight matrix, one band energy per row.
//! [`FilterBank::set_mel_coefficients`] lays out triangular filters evenly
//! spaced on the Mel scale; any other layout can be loaded with
//! [`FilterBank::set_coefficients`].
//!
//! # Example
//!
//! ```rust
//! use cadence_analysis::{FilterBank, PhaseVoc};
//! use cadence_core::{AnalysisStage, SampleBuffer};
//!
//! let mut pv = PhaseVoc::new(1024, 256).unwrap();
//! let mut bank = FilterBank::new(40, 1024).unwrap();
//! bank.set_mel_coefficients(44100.0).unwrap();
//!
//! pv.process(&SampleBuffer::new(256));
//! bank.process(pv.grain());
//! assert_eq!(bank.output().size(), 40);
//! ```

use cadence_core::{AnalysisStage, ComplexBuffer, SampleBuffer, StageError, hz_to_mel, log_released, mel_to_hz};

const COMPONENT: &str = "filterbank";

#[derive(Debug, Clone)]
struct BankState {
    win_size: usize,
    /// One row of `bins` weights per filter.
    filters: Vec<Vec<f32>>,
}

impl BankState {
    fn bins(&self) -> usize {
        self.win_size / 2 + 1
    }
}

/// Bank of spectral band filters.
#[derive(Debug)]
pub struct FilterBank {
    state: Option<BankState>,
    out: SampleBuffer,
}

impl FilterBank {
    /// Creates a bank of `n_filters` all-zero filters over grains of a
    /// `win_size`-point transform.
    pub fn new(n_filters: usize, win_size: usize) -> Result<Self, StageError> {
        if n_filters == 0 {
            return Err(StageError::invalid_size("filter count", n_filters));
        }
        if win_size < 2 {
            return Err(StageError::invalid_size("window size", win_size));
        }
        let bins = win_size / 2 + 1;
        Ok(Self {
            state: Some(BankState {
                win_size,
                filters: vec![vec![0.0; bins]; n_filters],
            }),
            out: SampleBuffer::new(n_filters),
        })
    }

    /// Number of filters, 0 once released.
    pub fn n_filters(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.filters.len())
    }

    /// Weight matrix, one row per filter. Empty once released.
    pub fn coefficients(&self) -> &[Vec<f32>] {
        self.state.as_ref().map(|s| s.filters.as_slice()).unwrap_or(&[])
    }

    /// Replaces the weight matrix. The shape must match the bank.
    pub fn set_coefficients(&mut self, matrix: &[Vec<f32>]) -> Result<(), StageError> {
        let Some(state) = self.state.as_mut() else {
            log_released(COMPONENT, "set_coefficients");
            return Ok(());
        };
        if matrix.len() != state.filters.len() {
            return Err(StageError::invalid_size("filter count", matrix.len()));
        }
        let bins = state.bins();
        if let Some(row) = matrix.iter().find(|row| row.len() != bins) {
            return Err(StageError::invalid_size("filter length", row.len()));
        }
        for (dst, src) in state.filters.iter_mut().zip(matrix) {
            dst.copy_from_slice(src);
        }
        Ok(())
    }

    /// Triangular Mel filters spanning 0 Hz to Nyquist.
    pub fn set_mel_coefficients(&mut self, sample_rate: f32) -> Result<(), StageError> {
        self.set_mel_coefficients_range(sample_rate, 0.0, sample_rate / 2.0)
    }

    /// Triangular Mel filters spanning `[fmin, fmax]`.
    ///
    /// Filter edges are evenly spaced in Mel; each triangle peaks at 1 on its
    /// center frequency and reaches 0 on its neighbours' centers.
    pub fn set_mel_coefficients_range(&mut self, sample_rate: f32, fmin: f32, fmax: f32) -> Result<(), StageError> {
        let Some(state) = self.state.as_mut() else {
            log_released(COMPONENT, "set_mel_coefficients");
            return Ok(());
        };
        if !(sample_rate > 0.0 && fmin >= 0.0 && fmax > fmin && fmax <= sample_rate / 2.0) {
            return Err(StageError::InvalidRange { low: fmin, high: fmax });
        }

        let n = state.filters.len();
        let mel_min = hz_to_mel(fmin);
        let mel_max = hz_to_mel(fmax);
        let edges: Vec<f32> = (0..n + 2)
            .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f32 / (n + 1) as f32))
            .collect();

        let bin_hz = sample_rate / state.win_size as f32;
        for (m, filter) in state.filters.iter_mut().enumerate() {
            let (left, center, right) = (edges[m], edges[m + 1], edges[m + 2]);
            for (k, weight) in filter.iter_mut().enumerate() {
                let f = k as f32 * bin_hz;
                *weight = if f > left && f <= center {
                    (f - left) / (center - left)
                } else if f > center && f < right {
                    (right - f) / (right - center)
                } else {
                    0.0
                };
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(filters = n, fmin, fmax, sample_rate, "mel filter bank laid out");
        Ok(())
    }
}

impl AnalysisStage for FilterBank {
    type Input = ComplexBuffer;
    type Output = SampleBuffer;

    fn process(&mut self, grain: &ComplexBuffer) {
        let Some(state) = self.state.as_ref() else {
            log_released(COMPONENT, "process");
            return;
        };
        let mags = grain.magnitudes_slice();
        for (slot, filter) in self.out.as_mut_slice().iter_mut().zip(&state.filters) {
            *slot = filter.iter().zip(mags).map(|(w, m)| w * m).sum();
        }
    }

    fn output(&self) -> &SampleBuffer {
        &self.out
    }

    fn release(&mut self) {
        self.state = None;
        self.out.release();
    }

    fn is_released(&self) -> bool {
        self.state.is_none()
    }
}
