//! Spectral descriptors: onset detection functions over phase vocoder grains.
//!
//! Each method reduces one grain (and, for the change-based methods, the
//! previous one or two) to a single novelty value. Higher values mean a
//! more likely note onset.
//!
//! | method | value |
//! |---|---|
//! | `energy` | `sum(m^2)` |
//! | `hfc` | `sum(k * m)` (high-frequency content) |
//! | `complex` | distance between each bin and its phase/magnitude prediction |
//! | `phase` | mean absolute phase deviation |
//! | `specdiff` | `sum(sqrt(abs(m^2 - m_prev^2)))` |
//! | `kl` | `sum(m * ln(1 + m / (m_prev + eps)))` |
//! | `mkl` | `sum(ln(1 + m / (m_prev + eps)))` |
//! | `specflux` | `sum(max(m - m_prev, 0))` |

use std::fmt;
use std::str::FromStr;

use cadence_core::{AnalysisStage, ComplexBuffer, SampleBuffer, StageError, log_released, princarg};

const COMPONENT: &str = "spectral descriptor";
const KL_EPSILON: f32 = 0.1;

/// Onset detection function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnsetMode {
    /// Frame energy
    Energy,
    /// High-frequency content
    #[default]
    Hfc,
    /// Complex-domain prediction error
    Complex,
    /// Phase deviation
    Phase,
    /// Spectral difference
    SpecDiff,
    /// Kullback-Leibler
    Kl,
    /// Modified Kullback-Leibler
    Mkl,
    /// Spectral flux
    SpecFlux,
}

impl OnsetMode {
    /// Every method, in token order.
    pub const ALL: [OnsetMode; 8] = [
        OnsetMode::Energy,
        OnsetMode::Hfc,
        OnsetMode::Complex,
        OnsetMode::Phase,
        OnsetMode::SpecDiff,
        OnsetMode::Kl,
        OnsetMode::Mkl,
        OnsetMode::SpecFlux,
    ];

    /// Canonical token.
    pub fn as_str(&self) -> &'static str {
        match self {
            OnsetMode::Energy => "energy",
            OnsetMode::Hfc => "hfc",
            OnsetMode::Complex => "complex",
            OnsetMode::Phase => "phase",
            OnsetMode::SpecDiff => "specdiff",
            OnsetMode::Kl => "kl",
            OnsetMode::Mkl => "mkl",
            OnsetMode::SpecFlux => "specflux",
        }
    }
}

impl fmt::Display for OnsetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OnsetMode {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "energy" => Ok(OnsetMode::Energy),
            "hfc" | "default" => Ok(OnsetMode::Hfc),
            "complex" | "complexdomain" => Ok(OnsetMode::Complex),
            "phase" => Ok(OnsetMode::Phase),
            "specdiff" => Ok(OnsetMode::SpecDiff),
            "kl" | "k1" => Ok(OnsetMode::Kl),
            "mkl" | "mk1" => Ok(OnsetMode::Mkl),
            "specflux" => Ok(OnsetMode::SpecFlux),
            other => Err(StageError::unknown_mode("onset mode", other)),
        }
    }
}

#[derive(Debug, Clone)]
struct History {
    prev_norm: Vec<f32>,
    prev_phase: Vec<f32>,
    prev2_phase: Vec<f32>,
}

/// Spectral descriptor stage: one grain in, one value out.
#[derive(Debug, Clone)]
pub struct SpecDesc {
    mode: OnsetMode,
    history: Option<History>,
    out: SampleBuffer,
}

impl SpecDesc {
    /// Creates a descriptor for grains of `bins` bins.
    pub fn new(mode: OnsetMode, bins: usize) -> Result<Self, StageError> {
        if bins == 0 {
            return Err(StageError::invalid_size("bin count", bins));
        }
        Ok(Self {
            mode,
            history: Some(History {
                prev_norm: vec![0.0; bins],
                prev_phase: vec![0.0; bins],
                prev2_phase: vec![0.0; bins],
            }),
            out: SampleBuffer::new(1),
        })
    }

    /// Selected method.
    pub fn mode(&self) -> OnsetMode {
        self.mode
    }

    /// Latest descriptor value, 0 once released.
    pub fn value(&self) -> f32 {
        self.out.get(0).unwrap_or(0.0)
    }
}

fn compute(mode: OnsetMode, h: &History, norm: &[f32], phase: &[f32]) -> f32 {
    let bins = norm.len().min(h.prev_norm.len());
    let (norm, phase) = (&norm[..bins], &phase[..bins.min(phase.len())]);
    let prev = &h.prev_norm[..bins];

    match mode {
        OnsetMode::Energy => norm.iter().map(|m| m * m).sum(),
        OnsetMode::Hfc => norm.iter().enumerate().map(|(k, m)| k as f32 * m).sum(),
        OnsetMode::Complex => norm
            .iter()
            .zip(phase)
            .enumerate()
            .map(|(k, (&m, &p))| {
                let target = 2.0 * h.prev_phase[k] - h.prev2_phase[k];
                let old = prev[k];
                let d = m * m + old * old - 2.0 * m * old * princarg(p - target).cos();
                d.max(0.0).sqrt()
            })
            .sum(),
        OnsetMode::Phase => {
            if phase.is_empty() {
                return 0.0;
            }
            let dev: f32 = phase
                .iter()
                .enumerate()
                .map(|(k, &p)| princarg(p - 2.0 * h.prev_phase[k] + h.prev2_phase[k]).abs())
                .sum();
            dev / phase.len() as f32
        }
        OnsetMode::SpecDiff => norm
            .iter()
            .zip(prev)
            .map(|(m, o)| (m * m - o * o).abs().sqrt())
            .sum(),
        OnsetMode::Kl => norm
            .iter()
            .zip(prev)
            .map(|(m, o)| m * (m / (o + KL_EPSILON)).ln_1p())
            .sum(),
        OnsetMode::Mkl => norm
            .iter()
            .zip(prev)
            .map(|(m, o)| (m / (o + KL_EPSILON)).ln_1p())
            .sum(),
        OnsetMode::SpecFlux => norm.iter().zip(prev).map(|(m, o)| (m - o).max(0.0)).sum(),
    }
}

impl AnalysisStage for SpecDesc {
    type Input = ComplexBuffer;
    type Output = SampleBuffer;

    fn process(&mut self, grain: &ComplexBuffer) {
        let Some(h) = self.history.as_mut() else {
            log_released(COMPONENT, "process");
            return;
        };
        let norm = grain.magnitudes_slice();
        let phase = grain.phases_slice();
        let value = compute(self.mode, h, norm, phase);
        self.out.set(0, value);

        let n = norm.len().min(h.prev_norm.len());
        h.prev_norm[..n].copy_from_slice(&norm[..n]);
        std::mem::swap(&mut h.prev2_phase, &mut h.prev_phase);
        let n = phase.len().min(h.prev_phase.len());
        h.prev_phase[..n].copy_from_slice(&phase[..n]);
    }

    fn output(&self) -> &SampleBuffer {
        &self.out
    }

    fn release(&mut self) {
        self.history = None;
        self.out.release();
    }

    fn is_released(&self) -> bool {
        self.history.is_none()
    }
}
