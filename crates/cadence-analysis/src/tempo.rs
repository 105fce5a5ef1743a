//! Beat tracking.
//!
//! The onset detection function (phase vocoder → spectral descriptor → peak
//! picker threshold, clipped at zero) is accumulated over a window of about
//! six seconds. Every quarter window the beat period is re-estimated from the
//! autocorrelation of that window over lags covering 40 to 250 BPM, refined
//! with a parabolic fit. The beat phase is the offset whose comb of past
//! frames, spaced one period apart, collects the most energy. Beats are then
//! predicted forward from the last aligned beat.

use cadence_core::{AnalysisStage, SampleBuffer, StageError, level_db, log_released, parabolic_offset};

use crate::peak_picker::{DEFAULT_POST, PeakPicker};
use crate::phase_vocoder::PhaseVoc;
use crate::specdesc::{OnsetMode, SpecDesc};

const COMPONENT: &str = "tempo";

/// Default peak-picking threshold.
pub const DEFAULT_THRESHOLD: f32 = 0.3;
/// Default silence gate in dB.
pub const DEFAULT_SILENCE_DB: f32 = -90.0;
/// Lowest tempo considered.
pub const MIN_BPM: f32 = 40.0;
/// Highest tempo considered.
pub const MAX_BPM: f32 = 250.0;
/// Length of the analysis window in seconds (rounded up to a power of two
/// in frames).
const WINDOW_SECONDS: f32 = 5.8;

#[derive(Debug)]
struct TempoState {
    pv: PhaseVoc,
    desc: SpecDesc,
    picker: PeakPicker,
    hop_size: usize,
    sample_rate: u32,
    silence_db: f32,
    /// Thresholded detection function, oldest first.
    dfframe: Vec<f32>,
    step: usize,
    counter: usize,
    /// Index of the current block.
    frame: u64,
    /// Beat period in frames.
    period: Option<f32>,
    confidence: f32,
    next_beat: Option<f64>,
    last_beat: Option<u64>,
    /// Blocks since the last one above the silence gate.
    quiet_frames: u64,
}

impl TempoState {
    fn frames_per_second(&self) -> f32 {
        self.sample_rate as f32 / self.hop_size as f32
    }

    fn lag_range(&self) -> (usize, usize) {
        let fps = self.frames_per_second();
        let lo = ((60.0 / MAX_BPM * fps).floor() as usize).max(1);
        let hi = ((60.0 / MIN_BPM * fps).ceil() as usize).min(self.dfframe.len().saturating_sub(2));
        (lo, hi)
    }

    fn autocorrelation(&self, lag: usize) -> f32 {
        self.dfframe
            .iter()
            .skip(lag)
            .zip(self.dfframe.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    /// Re-estimates period, confidence and beat phase from the window.
    fn estimate(&mut self) {
        let (lo, hi) = self.lag_range();
        if lo >= hi {
            return;
        }
        let energy = self.autocorrelation(0);
        if energy <= 0.0 {
            return;
        }

        let mut best_lag = lo;
        let mut best = f32::MIN;
        for lag in lo..=hi {
            let value = self.autocorrelation(lag);
            if value > best {
                best = value;
                best_lag = lag;
            }
        }
        if best <= 0.0 {
            return;
        }

        let left = self.autocorrelation(best_lag - 1);
        let right = self.autocorrelation(best_lag + 1);
        let period = best_lag as f32 + parabolic_offset(left, best, right);
        self.period = Some(period);
        self.confidence = (best / energy).clamp(0.0, 1.0);

        // Beat phase: frames back from the newest sample of the window.
        let spacing = (period.round() as usize).max(1);
        let len = self.dfframe.len();
        let mut best_phase = 0;
        let mut best_score = f32::MIN;
        for phase in 0..spacing.min(len) {
            let score: f32 = (0..)
                .map(|k| phase + k * spacing)
                .take_while(|&back| back < len)
                .map(|back| self.dfframe[len - 1 - back])
                .sum();
            if score > best_score {
                best_score = score;
                best_phase = phase;
            }
        }

        // The newest thresholded value describes the block `DEFAULT_POST`
        // frames back.
        let last = self.frame as f64 - (DEFAULT_POST + best_phase) as f64;
        let period = f64::from(period);
        // Snap the pending prediction onto the new beat grid.
        let mut next = match self.next_beat {
            Some(pending) => last + ((pending - last) / period).round() * period,
            None => last,
        };
        while next < self.frame as f64 - 1.5 {
            next += period;
        }
        self.next_beat = Some(next);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            bpm = 60.0 * self.frames_per_second() / period as f32,
            confidence = self.confidence,
            "tempo estimate"
        );
    }

    /// Whether the current block is a beat. Advances the prediction.
    fn beat_due(&mut self) -> bool {
        let (Some(next), Some(period)) = (self.next_beat, self.period) else {
            return false;
        };
        let now = self.frame as f64;
        if now + 0.5 < next {
            return false;
        }
        let mut upcoming = next;
        while upcoming <= now + 0.5 {
            upcoming += f64::from(period);
        }
        self.next_beat = Some(upcoming);
        self.quiet_frames <= u64::from(period.ceil() as u32)
    }
}

fn window_frames(sample_rate: u32, hop_size: usize) -> usize {
    let frames = (WINDOW_SECONDS * sample_rate as f32 / hop_size as f32).ceil() as usize;
    frames.max(4).next_power_of_two()
}

/// Tempo (beat) tracker.
#[derive(Debug)]
pub struct Tempo {
    state: Option<TempoState>,
    out: SampleBuffer,
}

impl Tempo {
    /// Creates a tempo tracker using `mode` as its detection function.
    pub fn new(mode: OnsetMode, buf_size: usize, hop_size: usize, sample_rate: u32) -> Result<Self, StageError> {
        if sample_rate == 0 {
            return Err(StageError::invalid_size("sample rate", 0));
        }
        let pv = PhaseVoc::new(buf_size, hop_size)?;
        let desc = SpecDesc::new(mode, pv.grain().size())?;
        let winlen = window_frames(sample_rate, hop_size);

        #[cfg(feature = "tracing")]
        tracing::debug!(%mode, buf_size, hop_size, sample_rate, winlen, "tempo tracker created");

        Ok(Self {
            state: Some(TempoState {
                pv,
                desc,
                picker: PeakPicker::new(DEFAULT_THRESHOLD),
                hop_size,
                sample_rate,
                silence_db: DEFAULT_SILENCE_DB,
                dfframe: vec![0.0; winlen],
                step: winlen / 4,
                counter: 0,
                frame: 0,
                period: None,
                confidence: 0.0,
                next_beat: None,
                last_beat: None,
                quiet_frames: 0,
            }),
            out: SampleBuffer::new(hop_size),
        })
    }

    /// Estimated tempo in beats per minute, 0 before the first estimate.
    pub fn bpm(&self) -> f32 {
        match self.state.as_ref() {
            Some(s) => s.period.map_or(0.0, |p| 60.0 * s.frames_per_second() / p),
            None => 0.0,
        }
    }

    /// Confidence of the current estimate in `[0, 1]`.
    pub fn confidence(&self) -> f32 {
        self.state.as_ref().map_or(0.0, |s| s.confidence)
    }

    /// Beat period in seconds, 0 before the first estimate.
    pub fn period_s(&self) -> f32 {
        match self.state.as_ref() {
            Some(s) => s.period.map_or(0.0, |p| p / s.frames_per_second()),
            None => 0.0,
        }
    }

    /// Position of the most recent beat in samples.
    pub fn last_beat(&self) -> u64 {
        self.state.as_ref().and_then(|s| s.last_beat).unwrap_or(0)
    }

    /// Position of the most recent beat in seconds.
    pub fn last_beat_s(&self) -> f64 {
        match self.state.as_ref() {
            Some(s) => s.last_beat.unwrap_or(0) as f64 / f64::from(s.sample_rate),
            None => 0.0,
        }
    }

    /// Sets the silence gate in dB.
    pub fn set_silence(&mut self, silence_db: f32) {
        match self.state.as_mut() {
            Some(state) => state.silence_db = silence_db,
            None => log_released(COMPONENT, "set_silence"),
        }
    }

    /// Sets the peak-picking threshold.
    pub fn set_threshold(&mut self, threshold: f32) {
        match self.state.as_mut() {
            Some(state) => state.picker.set_threshold(threshold),
            None => log_released(COMPONENT, "set_threshold"),
        }
    }
}

impl AnalysisStage for Tempo {
    type Input = SampleBuffer;
    type Output = SampleBuffer;

    fn process(&mut self, input: &SampleBuffer) {
        let Some(state) = self.state.as_mut() else {
            log_released(COMPONENT, "process");
            return;
        };

        state.pv.process(input);
        state.desc.process(state.pv.grain());
        state.picker.push(state.desc.value());

        state.dfframe.rotate_left(1);
        if let Some(last) = state.dfframe.last_mut() {
            *last = state.picker.thresholded().max(0.0);
        }

        let hop = input.as_slice();
        if level_db(&hop[..state.hop_size.min(hop.len())]) < state.silence_db {
            state.quiet_frames += 1;
        } else {
            state.quiet_frames = 0;
        }

        state.counter += 1;
        if state.counter >= state.step {
            state.counter = 0;
            state.estimate();
        }

        let beat = state.beat_due();
        self.out.clear();
        if beat {
            self.out.set(0, 1.0);
            state.last_beat = Some(state.frame * state.hop_size as u64);
        }
        state.frame += 1;
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
                    let env = 1.0 - phase as f32 / 64.0;
                    env * if phase % 2 == 0 { 0.8 } else { -0.8 }
                } else {
                    0.0
                }
            })
            .collect()
    }

    #[test]
    fn test_window_is_power_of_two() {
        let frames = window_frames(SR, HOP);
        assert!(frames.is_power_of_two());
        assert_eq!(frames, 1024);
    }

    #[test]
    fn test_no_estimate_before_data() {
        let mut tempo = Tempo::new(OnsetMode::SpecDiff, 1024, HOP, SR).unwrap();
        assert_eq!(tempo.bpm(), 0.0);
        assert_eq!(tempo.confidence(), 0.0);
        for _ in 0..400 {
            tempo.process(&SampleBuffer::new(HOP));
            assert_eq!(tempo.output().get(0), Some(0.0));
        }
        assert_eq!(tempo.bpm(), 0.0);
    }

    #[test]
    fn test_click_train_tempo() {
        // 120 BPM for 12 seconds.
        let signal = click_train(SR as usize / 2, SR as usize * 12);
        let mut tempo = Tempo::new(OnsetMode::SpecDiff, 1024, HOP, SR).unwrap();

        let mut beats = Vec::new();
        for (i, chunk) in signal.chunks(HOP).enumerate() {
            tempo.process(&SampleBuffer::from_slice(chunk));
            if tempo.output().get(0) == Some(1.0) {
                beats.push(i);
            }
        }

        let bpm = tempo.bpm();
        assert!((bpm - 120.0).abs() < 3.0, "bpm {bpm}");
        assert!(tempo.confidence() > 0.0);
        assert!((tempo.period_s() - 0.5).abs() < 0.02);

        // Beats in the second half are about half a second apart.
        let late: Vec<usize> = beats.iter().copied().filter(|&b| b > 1000).collect();
        assert!(late.len() >= 8, "beats {beats:?}");
        for pair in late.windows(2) {
            let gap = (pair[1] - pair[0]) as f32 * HOP as f32 / SR as f32;
            assert!((gap - 0.5).abs() < 0.05, "gap {gap}s in {late:?}");
        }
    }

    #[test]
    fn test_release() {
        let mut tempo = Tempo::new(OnsetMode::Hfc, 1024, HOP, SR).unwrap();
        tempo.release();
        tempo.release();
        tempo.process(&SampleBuffer::new(HOP));
        assert!(tempo.is_released());
        assert_eq!(tempo.bpm(), 0.0);
        assert_eq!(tempo.confidence(), 0.0);
        assert_eq!(tempo.output().size(), 0);
    }
}
