//! Monophonic pitch tracking.
//!
//! [`Pitch`] slides a `buf_size` frame over the incoming hops and runs one of
//! several estimators on it:
//!
//! | method | domain | notes |
//! |---|---|---|
//! | `yin` | time | cumulative mean normalized difference, tolerance 0.15 |
//! | `yinfft` (default) | spectral | FFT difference function, tolerance 0.85 |
//! | `schmitt` | time | hysteresis zero-crossing counter |
//! | `fcomb` | spectral | harmonic comb over the strongest peaks |
//! | `mcomb` | spectral | harmonic sum over every bin |
//!
//! The estimate is written to slot 0 of the result buffer in the selected
//! [`PitchUnit`]; unvoiced and silent frames give 0.

mod comb;
mod schmitt;
mod yin;
mod yinfft;

use std::fmt;
use std::str::FromStr;

use cadence_core::{AnalysisStage, SampleBuffer, StageError, freq_to_bin, freq_to_midi, level_db, log_released};

use comb::{Fcomb, Mcomb};
use schmitt::Schmitt;
use yin::Yin;
use yinfft::YinFft;

pub use yin::DEFAULT_TOLERANCE as YIN_TOLERANCE;
pub use yinfft::DEFAULT_TOLERANCE as YINFFT_TOLERANCE;

const COMPONENT: &str = "pitch";

/// Default silence gate in dB.
pub const DEFAULT_SILENCE_DB: f32 = -50.0;

/// Raw estimator output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Estimate {
    /// Fundamental in Hz, 0 when unvoiced.
    pub(crate) freq: f32,
    pub(crate) confidence: f32,
}

impl Estimate {
    pub(crate) const UNVOICED: Estimate = Estimate {
        freq: 0.0,
        confidence: 0.0,
    };
}

/// Pitch estimation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PitchMethod {
    /// YIN
    Yin,
    /// FFT-accelerated YIN
    #[default]
    YinFft,
    /// Schmitt trigger
    Schmitt,
    /// Fast spectral comb
    Fcomb,
    /// Multiple-comb harmonic sum
    Mcomb,
}

impl PitchMethod {
    /// Canonical token.
    pub fn as_str(&self) -> &'static str {
        match self {
            PitchMethod::Yin => "yin",
            PitchMethod::YinFft => "yinfft",
            PitchMethod::Schmitt => "schmitt",
            PitchMethod::Fcomb => "fcomb",
            PitchMethod::Mcomb => "mcomb",
        }
    }
}

impl fmt::Display for PitchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PitchMethod {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" | "yinfft" => Ok(PitchMethod::YinFft),
            "yin" => Ok(PitchMethod::Yin),
            "schmitt" => Ok(PitchMethod::Schmitt),
            "fcomb" => Ok(PitchMethod::Fcomb),
            "mcomb" => Ok(PitchMethod::Mcomb),
            other => Err(StageError::unknown_mode("pitch method", other)),
        }
    }
}

/// Unit of the value written to the result buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PitchUnit {
    /// Hertz
    #[default]
    Freq,
    /// MIDI note number (fractional)
    Midi,
    /// MIDI cents (`midi * 100`)
    Cent,
    /// FFT bin of a `buf_size`-point transform
    Bin,
}

impl PitchUnit {
    /// Canonical token.
    pub fn as_str(&self) -> &'static str {
        match self {
            PitchUnit::Freq => "freq",
            PitchUnit::Midi => "midi",
            PitchUnit::Cent => "cent",
            PitchUnit::Bin => "bin",
        }
    }

    fn convert(self, freq: f32, sample_rate: f32, buf_size: usize) -> f32 {
        if freq <= 0.0 {
            return 0.0;
        }
        match self {
            PitchUnit::Freq => freq,
            PitchUnit::Midi => freq_to_midi(freq),
            PitchUnit::Cent => freq_to_midi(freq) * 100.0,
            PitchUnit::Bin => freq_to_bin(freq, sample_rate, buf_size),
        }
    }
}

impl fmt::Display for PitchUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PitchUnit {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "freq" | "hertz" | "Hz" | "hz" | "default" => Ok(PitchUnit::Freq),
            "midi" => Ok(PitchUnit::Midi),
            "cent" => Ok(PitchUnit::Cent),
            "bin" => Ok(PitchUnit::Bin),
            other => Err(StageError::unknown_mode("pitch unit", other)),
        }
    }
}

#[derive(Debug)]
enum Detector {
    Yin(Yin),
    YinFft(YinFft),
    Schmitt(Schmitt),
    Fcomb(Fcomb),
    Mcomb(Mcomb),
}

impl Detector {
    fn new(method: PitchMethod, buf_size: usize) -> Self {
        match method {
            PitchMethod::Yin => Detector::Yin(Yin::new(buf_size)),
            PitchMethod::YinFft => Detector::YinFft(YinFft::new(buf_size)),
            PitchMethod::Schmitt => Detector::Schmitt(Schmitt),
            PitchMethod::Fcomb => Detector::Fcomb(Fcomb::new(buf_size)),
            PitchMethod::Mcomb => Detector::Mcomb(Mcomb::new(buf_size)),
        }
    }

    fn detect(&mut self, frame: &[f32], sample_rate: f32) -> Estimate {
        match self {
            Detector::Yin(d) => d.detect(frame, sample_rate),
            Detector::YinFft(d) => d.detect(frame, sample_rate),
            Detector::Schmitt(d) => d.detect(frame, sample_rate),
            Detector::Fcomb(d) => d.detect(frame, sample_rate),
            Detector::Mcomb(d) => d.detect(frame, sample_rate),
        }
    }

    /// Sets the tolerance of the YIN variants; other methods have none.
    fn set_tolerance(&mut self, tolerance: f32) {
        match self {
            Detector::Yin(d) => d.tolerance = tolerance,
            Detector::YinFft(d) => d.tolerance = tolerance,
            _ => {}
        }
    }

    fn tolerance(&self) -> f32 {
        match self {
            Detector::Yin(d) => d.tolerance,
            Detector::YinFft(d) => d.tolerance,
            _ => 0.0,
        }
    }
}

#[derive(Debug)]
struct PitchState {
    method: PitchMethod,
    detector: Detector,
    unit: PitchUnit,
    buf_size: usize,
    hop_size: usize,
    sample_rate: u32,
    silence_db: f32,
    /// Most recent `buf_size` samples, oldest first.
    frame: Vec<f32>,
    confidence: f32,
}

/// Pitch tracker.
///
/// # Example
///
/// ```rust
/// use cadence_analysis::{Pitch, PitchMethod};
/// use cadence_core::{AnalysisStage, SampleBuffer};
///
/// let mut pitch = Pitch::new(PitchMethod::Yin, 2048, 512, 44100).unwrap();
/// pitch.set_unit("midi".parse().unwrap());
///
/// let sine: Vec<f32> = (0..4096)
///     .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
///     .collect();
/// for hop in sine.chunks(512) {
///     pitch.process(&SampleBuffer::from_slice(hop));
/// }
/// let note = pitch.output().get(0).unwrap();
/// assert!((note - 69.0).abs() < 0.1);
/// ```
#[derive(Debug)]
pub struct Pitch {
    state: Option<PitchState>,
    out: SampleBuffer,
}

impl Pitch {
    /// Creates a pitch tracker.
    ///
    /// `buf_size` is the analysis frame, `hop_size` the block size fed to
    /// [`process`](AnalysisStage::process).
    pub fn new(method: PitchMethod, buf_size: usize, hop_size: usize, sample_rate: u32) -> Result<Self, StageError> {
        if buf_size < 4 {
            return Err(StageError::invalid_size("buffer size", buf_size));
        }
        if hop_size == 0 || hop_size > buf_size {
            return Err(StageError::invalid_size("hop size", hop_size));
        }
        if sample_rate == 0 {
            return Err(StageError::invalid_size("sample rate", 0));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(%method, buf_size, hop_size, sample_rate, "pitch tracker created");

        Ok(Self {
            state: Some(PitchState {
                method,
                detector: Detector::new(method, buf_size),
                unit: PitchUnit::default(),
                buf_size,
                hop_size,
                sample_rate,
                silence_db: DEFAULT_SILENCE_DB,
                frame: vec![0.0; buf_size],
                confidence: 0.0,
            }),
            out: SampleBuffer::new(hop_size),
        })
    }

    /// Estimation method, `None` once released.
    pub fn method(&self) -> Option<PitchMethod> {
        self.state.as_ref().map(|s| s.method)
    }

    /// Sets the YIN tolerance. Ignored by the other methods.
    pub fn set_tolerance(&mut self, tolerance: f32) {
        match self.state.as_mut() {
            Some(state) => state.detector.set_tolerance(tolerance),
            None => log_released(COMPONENT, "set_tolerance"),
        }
    }

    /// Current tolerance, 0 for methods without one.
    pub fn tolerance(&self) -> f32 {
        self.state.as_ref().map_or(0.0, |s| s.detector.tolerance())
    }

    /// Selects the output unit.
    pub fn set_unit(&mut self, unit: PitchUnit) {
        match self.state.as_mut() {
            Some(state) => state.unit = unit,
            None => log_released(COMPONENT, "set_unit"),
        }
    }

    /// Output unit, `None` once released.
    pub fn unit(&self) -> Option<PitchUnit> {
        self.state.as_ref().map(|s| s.unit)
    }

    /// Sets the silence gate in dB.
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

    /// Confidence of the latest estimate in `[0, 1]`.
    pub fn confidence(&self) -> f32 {
        self.state.as_ref().map_or(0.0, |s| s.confidence)
    }
}

impl AnalysisStage for Pitch {
    type Input = SampleBuffer;
    type Output = SampleBuffer;

    fn process(&mut self, input: &SampleBuffer) {
        let Some(state) = self.state.as_mut() else {
            log_released(COMPONENT, "process");
            return;
        };

        let hop = state.hop_size;
        let len = state.frame.len();
        state.frame.copy_within(hop.., 0);
        let tail = &mut state.frame[len - hop..];
        let n = tail.len().min(input.size());
        tail[..n].copy_from_slice(&input.as_slice()[..n]);
        tail[n..].fill(0.0);

        let sample_rate = state.sample_rate as f32;
        let estimate = if level_db(&state.frame) < state.silence_db {
            Estimate::UNVOICED
        } else {
            state.detector.detect(&state.frame, sample_rate)
        };
        state.confidence = estimate.confidence;

        self.out.clear();
        self.out.set(0, state.unit.convert(estimate.freq, sample_rate, state.buf_size));
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
