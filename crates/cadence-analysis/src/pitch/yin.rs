//! YIN fundamental frequency estimator (de Cheveigné & Kawahara, 2002).
//!
//! Time-domain difference function over half the frame, cumulative mean
//! normalization, then the first dip below the tolerance.

use cadence_core::parabolic_offset;

use super::Estimate;

/// Default absolute threshold on the normalized difference.
pub const DEFAULT_TOLERANCE: f32 = 0.15;

#[derive(Debug, Clone)]
pub(crate) struct Yin {
    pub(crate) tolerance: f32,
    cmndf: Vec<f32>,
}

impl Yin {
    pub(crate) fn new(buf_size: usize) -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            cmndf: vec![1.0; buf_size / 2],
        }
    }

    pub(crate) fn detect(&mut self, frame: &[f32], sample_rate: f32) -> Estimate {
        let width = self.cmndf.len().min(frame.len() / 2);
        if width < 3 {
            return Estimate::UNVOICED;
        }

        self.cmndf[0] = 1.0;
        let mut running = 0.0;
        for tau in 1..width {
            let d: f32 = frame[..width]
                .iter()
                .zip(&frame[tau..tau + width])
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            running += d;
            self.cmndf[tau] = if running > 0.0 { d * tau as f32 / running } else { 1.0 };
        }

        let cmndf = &self.cmndf[..width];
        let Some(mut tau) = (2..width).find(|&t| cmndf[t] < self.tolerance) else {
            let best = cmndf[1..].iter().copied().fold(1.0f32, f32::min);
            return Estimate {
                freq: 0.0,
                confidence: (1.0 - best).max(0.0),
            };
        };
        while tau + 1 < width && cmndf[tau + 1] < cmndf[tau] {
            tau += 1;
        }

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
