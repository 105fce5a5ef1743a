//! Phase vocoder: sliding-window STFT analysis and overlap-add resynthesis.
//!
//! Each call to [`PhaseVoc::process`] shifts `hop_size` new samples into a
//! `win_size` frame, applies the analysis window and produces one grain of
//! `win_size / 2 + 1` polar bins. [`PhaseVoc::reverse_process`] runs the
//! inverse: one grain in, `hop_size` samples out, delayed by
//! `win_size - hop_size` samples. With the default Hann window the round trip
//! reconstructs the input exactly for `hop_size <= win_size / 4`.

use cadence_core::{AnalysisStage, ComplexBuffer, SampleBuffer, StageError, log_released};

use crate::fft::{Fft, Window};

const COMPONENT: &str = "phase vocoder";

#[derive(Debug)]
struct PvocState {
    win_size: usize,
    hop_size: usize,
    fft: Fft,
    window: Vec<f32>,
    /// Most recent `win_size` input samples, oldest first.
    frame: Vec<f32>,
    windowed: Vec<f32>,
    /// Overlap-add accumulator.
    synth: Vec<f32>,
    ifft_out: Vec<f32>,
    /// `hop / sum(w^2)`, normalizes the analysis and synthesis windows.
    ola_scale: f32,
}

/// Phase vocoder stage.
///
/// # Example
///
/// ```rust
/// use cadence_analysis::PhaseVoc;
/// use cadence_core::{AnalysisStage, SampleBuffer};
///
/// let mut pv = PhaseVoc::new(512, 128).unwrap();
/// let block = SampleBuffer::new(128);
/// pv.process(&block);
/// assert_eq!(pv.output().size(), 257);
///
/// let mut out = SampleBuffer::new(128);
/// pv.reverse_process(None, &mut out);
/// ```
#[derive(Debug)]
pub struct PhaseVoc {
    state: Option<PvocState>,
    grain: ComplexBuffer,
}

impl PhaseVoc {
    /// Creates a phase vocoder with a Hann window.
    pub fn new(win_size: usize, hop_size: usize) -> Result<Self, StageError> {
        Self::with_window(win_size, hop_size, Window::Hann)
    }

    /// Creates a phase vocoder with the given analysis/synthesis window.
    pub fn with_window(win_size: usize, hop_size: usize, window: Window) -> Result<Self, StageError> {
        if win_size < 2 {
            return Err(StageError::invalid_size("window size", win_size));
        }
        if hop_size == 0 || hop_size > win_size {
            return Err(StageError::invalid_size("hop size", hop_size));
        }

        let window = window.coefficients(win_size);
        let energy: f32 = window.iter().map(|w| w * w).sum();
        let ola_scale = if energy > 0.0 { hop_size as f32 / energy } else { 0.0 };

        let bins = win_size / 2 + 1;
        Ok(Self {
            state: Some(PvocState {
                win_size,
                hop_size,
                fft: Fft::new(win_size),
                window,
                frame: vec![0.0; win_size],
                windowed: vec![0.0; win_size],
                synth: vec![0.0; win_size],
                ifft_out: vec![0.0; win_size],
                ola_scale,
            }),
            grain: ComplexBuffer::new(bins),
        })
    }

    /// Analysis window length, 0 once released.
    pub fn win_size(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.win_size)
    }

    /// Samples consumed and produced per call, 0 once released.
    pub fn hop_size(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.hop_size)
    }

    /// Latest grain (same as [`AnalysisStage::output`]).
    pub fn grain(&self) -> &ComplexBuffer {
        &self.grain
    }

    /// Resynthesizes `hop_size` samples into `out`.
    ///
    /// Uses `grain` when given, else the grain from the last
    /// [`process`](AnalysisStage::process) call. Samples of `out` beyond
    /// `hop_size` are zeroed.
    pub fn reverse_process(&mut self, grain: Option<&ComplexBuffer>, out: &mut SampleBuffer) {
        let Some(state) = self.state.as_mut() else {
            log_released(COMPONENT, "reverse_process");
            return;
        };
        let grain = grain.unwrap_or(&self.grain);
        let hop = state.hop_size;

        state.fft.inverse_polar(grain, &mut state.ifft_out);
        for ((acc, x), w) in state
            .synth
            .iter_mut()
            .zip(state.ifft_out.iter())
            .zip(state.window.iter())
        {
            *acc += x * w * state.ola_scale;
        }

        let out = out.as_mut_slice();
        let n = hop.min(out.len());
        out[..n].copy_from_slice(&state.synth[..n]);
        out[n..].fill(0.0);

        state.synth.copy_within(hop.., 0);
        let len = state.synth.len();
        state.synth[len - hop..].fill(0.0);
    }
}

impl AnalysisStage for PhaseVoc {
    type Input = SampleBuffer;
    type Output = ComplexBuffer;

    /// Consumes `min(hop_size, input.size())` samples; a shorter input is
    /// padded with zeros.
    fn process(&mut self, input: &SampleBuffer) {
        let Some(state) = self.state.as_mut() else {
            log_released(COMPONENT, "process");
            return;
        };
        let hop = state.hop_size;
        let win = state.win_size;

        state.frame.copy_within(hop.., 0);
        let tail = &mut state.frame[win - hop..];
        let n = tail.len().min(input.size());
        tail[..n].copy_from_slice(&input.as_slice()[..n]);
        tail[n..].fill(0.0);

        for ((dst, x), w) in state
            .windowed
            .iter_mut()
            .zip(state.frame.iter())
            .zip(state.window.iter())
        {
            *dst = x * w;
        }
        state.fft.forward_polar(&state.windowed, &mut self.grain);
    }

    fn output(&self) -> &ComplexBuffer {
        &self.grain
    }

    fn release(&mut self) {
        self.state = None;
        self.grain.release();
    }

    fn is_released(&self) -> bool {
        self.state.is_none()
    }
}
