//! Onset detection.
//!
//! Chain per block: [`PhaseVoc`] grain → [`SpecDesc`] detection function →
//! [`PeakPicker`] → silence gate → minimum inter-onset interval.
//!
//! A peak is confirmed several blocks after the sound that caused it, so the
//! silence gate looks at every block still inside the peak picker window
//! rather than only the current one.

use cadence_core::{AnalysisStage, SampleBuffer, StageError, level_db, log_released, ms_to_samples};

use crate::peak_picker::PeakPicker;
use crate::phase_vocoder::PhaseVoc;
use crate::specdesc::{OnsetMode, SpecDesc};

const COMPONENT: &str = "onset";

/// Default peak-picking threshold.
pub const DEFAULT_THRESHOLD: f32 = 0.3;
/// Default silence gate in dB.
pub const DEFAULT_SILENCE_DB: f32 = -70.0;
/// Default minimum inter-onset interval in milliseconds.
pub const DEFAULT_MINIOI_MS: f32 = 20.0;

#[derive(Debug)]
struct OnsetState {
    pv: PhaseVoc,
    desc: SpecDesc,
    picker: PeakPicker,
    hop_size: usize,
    sample_rate: u32,
    silence_db: f32,
    minioi: u64,
    /// Samples consumed so far.
    total: u64,
    last_onset: Option<u64>,
    /// Levels of the blocks still inside the peak picker window, oldest first.
    levels: Vec<f32>,
}

impl OnsetState {
    fn delay(&self) -> u64 {
        (self.picker.delay() * self.hop_size) as u64
    }

    /// Pushes the level of the current block; returns whether every block
    /// in the window is below the silence gate.
    fn gate(&mut self, level: f32) -> bool {
        self.levels.rotate_left(1);
        if let Some(last) = self.levels.last_mut() {
            *last = level;
        }
        self.levels.iter().all(|&l| l < self.silence_db)
    }

    fn accept(&mut self, position: u64) -> bool {
        match self.last_onset {
            Some(last) if position < last + self.minioi => false,
            _ => {
                self.last_onset = Some(position);
                true
            }
        }
    }
}

/// Onset detector.
///
/// # Example
///
/// ```rust
/// use cadence_analysis::Onset;
/// use cadence_core::{AnalysisStage, SampleBuffer};
///
/// let mut onset = Onset::new("hfc".parse().unwrap(), 1024, 256, 44100).unwrap();
/// let mut block = SampleBuffer::new(256);
/// for _ in 0..20 {
///     onset.process(&block);
///     assert_eq!(onset.output().get(0), Some(0.0));
/// }
/// block.set(0, 1.0);
/// onset.process(&block);
/// ```
#[derive(Debug)]
pub struct Onset {
    state: Option<OnsetState>,
    out: SampleBuffer,
}

impl Onset {
    /// Creates an onset detector.
    ///
    /// `buf_size` is the analysis window, `hop_size` the block size fed to
    /// [`process`](AnalysisStage::process).
    pub fn new(mode: OnsetMode, buf_size: usize, hop_size: usize, sample_rate: u32) -> Result<Self, StageError> {
        if sample_rate == 0 {
            return Err(StageError::invalid_size("sample rate", 0));
        }
        let pv = PhaseVoc::new(buf_size, hop_size)?;
        let desc = SpecDesc::new(mode, pv.grain().size())?;
        let minioi = ms_to_samples(DEFAULT_MINIOI_MS, sample_rate as f32) as u64;

        #[cfg(feature = "tracing")]
        tracing::debug!(%mode, buf_size, hop_size, sample_rate, "onset detector created");

        let picker = PeakPicker::new(DEFAULT_THRESHOLD);
        let levels = vec![f32::NEG_INFINITY; picker.delay() + 1];

        Ok(Self {
            state: Some(OnsetState {
                pv,
                desc,
                picker,
                hop_size,
                sample_rate,
                silence_db: DEFAULT_SILENCE_DB,
                minioi,
                total: 0,
                last_onset: None,
                levels,
            }),
            out: SampleBuffer::new(hop_size),
        })
    }

    /// Detection function in use.
    pub fn mode(&self) -> Option<OnsetMode> {
        self.state.as_ref().map(|s| s.desc.mode())
    }

    /// Sets the silence gate in dB. Blocks quieter than this never trigger.
    pub fn set_silence(&mut self, silence_db: f32) {
        match self.state.as_mut() {
            Some(state) => state.silence_db = silence_db,
            None => log_released(COMPONENT, "set_silence"),
        }
    }

    /// Silence gate in dB, 0 once released.
    pub fn silence(&self) -> f32 {
        self.state.as_ref().map_or(0.0, |s| s.silence_db)
    }

    /// Sets the peak-picking threshold.
    pub fn set_threshold(&mut self, threshold: f32) {
        match self.state.as_mut() {
            Some(state) => state.picker.set_threshold(threshold),
            None => log_released(COMPONENT, "set_threshold"),
        }
    }

    /// Peak-picking threshold, 0 once released.
    pub fn threshold(&self) -> f32 {
        self.state.as_ref().map_or(0.0, |s| s.picker.threshold())
    }

    /// Sets the minimum interval between two onsets.
    pub fn set_minioi_ms(&mut self, ms: f32) {
        match self.state.as_mut() {
            Some(state) => state.minioi = ms_to_samples(ms.max(0.0), state.sample_rate as f32) as u64,
            None => log_released(COMPONENT, "set_minioi_ms"),
        }
    }

    /// Position of the most recent onset in samples, 0 if none yet.
    pub fn last_onset(&self) -> u64 {
        self.state.as_ref().and_then(|s| s.last_onset).unwrap_or(0)
    }

    /// Position of the most recent onset in seconds.
    pub fn last_onset_s(&self) -> f64 {
        match self.state.as_ref() {
            Some(s) => s.last_onset.unwrap_or(0) as f64 / f64::from(s.sample_rate),
            None => 0.0,
        }
    }

    /// Latest detection-function value.
    pub fn descriptor(&self) -> f32 {
        self.state.as_ref().map_or(0.0, |s| s.desc.value())
    }

    /// Latency between an onset in the signal and its report, in samples.
    pub fn delay(&self) -> u64 {
        self.state.as_ref().map_or(0, OnsetState::delay)
    }
}

impl AnalysisStage for Onset {
    type Input = SampleBuffer;
    type Output = SampleBuffer;

    fn process(&mut self, input: &SampleBuffer) {
        let Some(state) = self.state.as_mut() else {
            log_released(COMPONENT, "process");
            return;
        };

        state.pv.process(input);
        state.desc.process(state.pv.grain());
        let peak = state.picker.push(state.desc.value());

        let hop = input.as_slice();
        let level = level_db(&hop[..state.hop_size.min(hop.len())]);
        let window_silent = state.gate(level);
        let delay = state.delay();
        let mut detected = false;
        if peak && !window_silent {
            let position = state.total.saturating_sub(delay);
            detected = state.accept(position);
        } else if state.last_onset.is_none() && state.total <= delay && level >= state.silence_db {
            // First sound in the stream counts as an onset.
            detected = state.accept(state.total);
        }

        state.total += state.hop_size as u64;
        self.out.clear();
        if detected {
            self.out.set(0, 1.0);
            #[cfg(feature = "tracing")]
            tracing::trace!(position = ?state.last_onset, "onset");
        }
    }

    fn output(&self) -> &SampleBuffer {
        &self.out
    }

    fn release(&mut self) {
        if let Some(mut state) = self.state.take() {
            state.pv.release();
            state.desc.release();
        }
        self.out.release();
    }

    fn is_released(&self) -> bool {
        self.state.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 44100;
    const HOP: usize = 256;

    fn click_train(period: usize, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let phase = i % period;
                if phase < 64 {
                    // Short decaying burst
                    let env = 1.0 - phase as f32 / 64.0;
                    env * if phase % 2 == 0 { 0.8 } else { -0.8 }
                } else {
                    0.0
                }
            })
            .collect()
    }

    fn run(onset: &mut Onset, signal: &[f32]) -> Vec<u64> {
        let mut onsets = Vec::new();
        for chunk in signal.chunks(HOP) {
            onset.process(&SampleBuffer::from_slice(chunk));
            if onset.output().get(0) == Some(1.0) {
                onsets.push(onset.last_onset());
            }
        }
        onsets
    }

    #[test]
    fn test_defaults() {
        let onset = Onset::new(OnsetMode::Hfc, 1024, HOP, SR).unwrap();
        assert_eq!(onset.threshold(), DEFAULT_THRESHOLD);
        assert_eq!(onset.silence(), DEFAULT_SILENCE_DB);
        assert_eq!(onset.output().size(), HOP);
        assert_eq!(onset.mode(), Some(OnsetMode::Hfc));
    }

    #[test]
    fn test_invalid_construction() {
        assert!(Onset::new(OnsetMode::Hfc, 1024, 0, SR).is_err());
        assert!(Onset::new(OnsetMode::Hfc, 1024, HOP, 0).is_err());
    }

    #[test]
    fn test_silence_produces_no_onsets() {
        let mut onset = Onset::new(OnsetMode::Energy, 1024, HOP, SR).unwrap();
        let onsets = run(&mut onset, &vec![0.0; SR as usize]);
        assert!(onsets.is_empty());
    }

    #[test]
    fn test_click_train_detected() {
        // One click every 0.5 s for 4 s, starting after 0.25 s of silence.
        let mut signal = vec![0.0; SR as usize / 4];
        signal.extend(click_train(SR as usize / 2, SR as usize * 4));

        for mode in [OnsetMode::Hfc, OnsetMode::Energy, OnsetMode::SpecFlux] {
            let mut onset = Onset::new(mode, 1024, HOP, SR).unwrap();
            let onsets = run(&mut onset, &signal);
            assert!(
                (6..=9).contains(&onsets.len()),
                "{mode}: {} onsets at {onsets:?}",
                onsets.len()
            );
            // Consecutive onsets are roughly half a second apart.
            for pair in onsets.windows(2) {
                let gap = pair[1] - pair[0];
                assert!(gap > SR as u64 / 4, "{mode}: gap {gap}");
            }
        }
    }

    #[test]
    fn test_minioi_suppresses_close_onsets() {
        let mut onset = Onset::new(OnsetMode::Energy, 1024, HOP, SR).unwrap();
        onset.set_minioi_ms(2000.0);
        let mut signal = vec![0.0; SR as usize / 4];
        signal.extend(click_train(SR as usize / 2, SR as usize * 3));
        let onsets = run(&mut onset, &signal);
        assert!(onsets.len() <= 2, "{onsets:?}");
    }

    #[test]
    fn test_release() {
        let mut onset = Onset::new(OnsetMode::Hfc, 512, HOP, SR).unwrap();
        onset.release();
        onset.release();
        onset.process(&SampleBuffer::new(HOP));
        assert!(onset.is_released());
        assert_eq!(onset.output().size(), 0);
        assert_eq!(onset.last_onset(), 0);
        assert_eq!(onset.descriptor(), 0.0);
        onset.set_threshold(0.5);
        assert_eq!(onset.threshold(), 0.0);
    }
}
