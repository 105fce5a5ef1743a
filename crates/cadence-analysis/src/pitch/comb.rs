//! Spectral comb estimators.
//!
//! Both work on the magnitude spectrum of the Hann-windowed frame:
//!
//! - `fcomb` takes the strongest spectral peaks as candidates and keeps the
//!   one whose harmonic series collects the most magnitude.
//! - `mcomb` sums weighted harmonics for every bin (a multiple-comb
//!   harmonic sum) and takes the best-scoring bin.

use cadence_core::{ComplexBuffer, bin_to_freq, parabolic_offset};

use super::Estimate;
use crate::fft::{Fft, Window};

const HARMONICS: usize = 5;
const CANDIDATES: usize = 5;

#[derive(Debug)]
struct Spectrum {
    fft: Fft,
    window: Vec<f32>,
    windowed: Vec<f32>,
    grain: ComplexBuffer,
}

impl Spectrum {
    fn new(buf_size: usize) -> Self {
        let fft = Fft::new(buf_size);
        let bins = fft.bins();
        Self {
            fft,
            window: Window::Hann.coefficients(buf_size),
            windowed: vec![0.0; buf_size],
            grain: ComplexBuffer::new(bins),
        }
    }

    fn analyze(&mut self, frame: &[f32]) -> &[f32] {
        for ((dst, x), w) in self.windowed.iter_mut().zip(frame).zip(&self.window) {
            *dst = x * w;
        }
        self.fft.forward_polar(&self.windowed, &mut self.grain);
        self.grain.magnitudes_slice()
    }
}

/// Refined position of a local maximum at `k`.
fn refine(values: &[f32], k: usize) -> f32 {
    if k == 0 || k + 1 >= values.len() {
        return k as f32;
    }
    k as f32 + parabolic_offset(values[k - 1], values[k], values[k + 1])
}

/// Magnitude around a fractional bin, taking the larger neighbour.
fn magnitude_near(mags: &[f32], bin: f32) -> f32 {
    let lo = bin.floor() as usize;
    let hi = lo + 1;
    match (mags.get(lo), mags.get(hi)) {
        (Some(&a), Some(&b)) => a.max(b),
        (Some(&a), None) => a,
        _ => 0.0,
    }
}

#[derive(Debug)]
pub(crate) struct Fcomb {
    spectrum: Spectrum,
    buf_size: usize,
}

impl Fcomb {
    pub(crate) fn new(buf_size: usize) -> Self {
        Self {
            spectrum: Spectrum::new(buf_size),
            buf_size,
        }
    }

    pub(crate) fn detect(&mut self, frame: &[f32], sample_rate: f32) -> Estimate {
        let buf_size = self.buf_size;
        let mags = self.spectrum.analyze(frame);

        let mut peaks: Vec<(usize, f32)> = (1..mags.len().saturating_sub(1))
            .filter(|&k| mags[k] > mags[k - 1] && mags[k] >= mags[k + 1])
            .map(|k| (k, mags[k]))
            .collect();
        peaks.sort_unstable_by(|a, b| b.1.total_cmp(&a.1));
        peaks.truncate(CANDIDATES);
        let total: f32 = mags.iter().sum();
        if peaks.is_empty() || total <= 0.0 {
            return Estimate::UNVOICED;
        }

        let mut best_bin = 0.0;
        let mut best_score = 0.0;
        for &(k, _) in &peaks {
            let bin = refine(mags, k);
            let score: f32 = (1..=HARMONICS)
                .map(|h| magnitude_near(mags, bin * h as f32))
                .sum();
            if score > best_score || (score == best_score && bin < best_bin) {
                best_score = score;
                best_bin = bin;
            }
        }

        Estimate {
            freq: bin_to_freq(best_bin, sample_rate, buf_size),
            confidence: (best_score / total).clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Mcomb {
    spectrum: Spectrum,
    scores: Vec<f32>,
    buf_size: usize,
}

impl Mcomb {
    pub(crate) fn new(buf_size: usize) -> Self {
        let spectrum = Spectrum::new(buf_size);
        let bins = spectrum.grain.size();
        Self {
            spectrum,
            scores: vec![0.0; bins],
            buf_size,
        }
    }

    pub(crate) fn detect(&mut self, frame: &[f32], sample_rate: f32) -> Estimate {
        let buf_size = self.buf_size;
        let mags = self.spectrum.analyze(frame);
        let total: f32 = mags.iter().sum();
        if total <= 0.0 {
            return Estimate::UNVOICED;
        }

        self.scores.fill(0.0);
        for k in 1..mags.len() {
            self.scores[k] = (1..=HARMONICS)
                .map(|h| k * h)
                .take_while(|&bin| bin < mags.len())
                .enumerate()
                .map(|(i, bin)| mags[bin] / (i + 1) as f32)
                .sum();
        }

        let (best, score) = self
            .scores
            .iter()
            .copied()
            .enumerate()
            .skip(1)
            .fold((0, 0.0f32), |acc, (k, v)| if v > acc.1 { (k, v) } else { acc });
        if best == 0 {
            return Estimate::UNVOICED;
        }

        Estimate {
            freq: bin_to_freq(refine(mags, best), sample_rate, buf_size),
            confidence: (mags[best] / score).clamp(0.0, 1.0),
        }
    }
}
