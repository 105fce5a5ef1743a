//! Mathematical utility functions for analysis stages.
//!
//! # Level Conversions
//!
//! - [`db_to_linear`] / [`linear_to_db`] - Convert between dB and linear gain
//! - [`level_db`] / [`is_silence`] - Block loudness and silence gating
//!
//! # Pitch Units
//!
//! - [`freq_to_midi`] / [`midi_to_freq`] - Hz to MIDI note number and back
//! - [`freq_to_bin`] / [`bin_to_freq`] - Hz to FFT bin index and back
//! - [`hz_to_mel`] / [`mel_to_hz`] - Mel scale (O'Shaughnessy formula)
//!
//! # Utilities
//!
//! - [`princarg`] - Wrap a phase into `(-PI, PI]`
//! - [`parabolic_offset`] - Sub-bin peak refinement
//! - [`median`] - Median of a small scratch slice
//! - [`ms_to_samples`] - Time conversions

use core::f32::consts::PI;
use libm::{expf, floorf, log2f, logf, powf};

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use cadence_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels.
///
/// # Example
/// ```rust
/// use cadence_core::linear_to_db;
///
/// assert!((linear_to_db(1.0) - 0.0).abs() < 0.001);
/// assert!((linear_to_db(0.5) - (-6.02)).abs() < 0.01);
/// ```
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    // 20 * log10(linear) = 20 * ln(linear) / ln(10)
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Mean power of a block in dB (`10 * log10(sum(x^2) / len)`).
///
/// An empty or all-zero block returns `f32::NEG_INFINITY`.
pub fn level_db(block: &[f32]) -> f32 {
    if block.is_empty() {
        return f32::NEG_INFINITY;
    }
    let energy: f32 = block.iter().map(|x| x * x).sum();
    if energy <= 0.0 {
        return f32::NEG_INFINITY;
    }
    const FACTOR: f32 = 10.0 / core::f32::consts::LN_10;
    logf(energy / block.len() as f32) * FACTOR
}

/// Whether a block's level is below `threshold_db`.
#[inline]
pub fn is_silence(block: &[f32], threshold_db: f32) -> bool {
    level_db(block) < threshold_db
}

/// Frequency in Hz to (fractional) MIDI note number. Non-positive input maps to 0.
///
/// # Example
/// ```rust
/// use cadence_core::freq_to_midi;
///
/// assert!((freq_to_midi(440.0) - 69.0).abs() < 1e-4);
/// ```
#[inline]
pub fn freq_to_midi(freq: f32) -> f32 {
    if freq <= 0.0 {
        return 0.0;
    }
    69.0 + 12.0 * log2f(freq / 440.0)
}

/// MIDI note number to frequency in Hz.
#[inline]
pub fn midi_to_freq(midi: f32) -> f32 {
    440.0 * powf(2.0, (midi - 69.0) / 12.0)
}

/// Frequency in Hz to fractional FFT bin for a transform of `fft_size` points.
#[inline]
pub fn freq_to_bin(freq: f32, sample_rate: f32, fft_size: usize) -> f32 {
    if sample_rate <= 0.0 {
        return 0.0;
    }
    freq * fft_size as f32 / sample_rate
}

/// Fractional FFT bin to frequency in Hz.
#[inline]
pub fn bin_to_freq(bin: f32, sample_rate: f32, fft_size: usize) -> f32 {
    if fft_size == 0 {
        return 0.0;
    }
    bin * sample_rate / fft_size as f32
}

/// Convert Hz to Mel.
#[inline]
pub fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * libm::log10f(1.0 + hz / 700.0)
}

/// Convert Mel to Hz.
#[inline]
pub fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (powf(10.0, mel / 2595.0) - 1.0)
}

/// Wrap a phase value into `(-PI, PI]`.
#[inline]
pub fn princarg(phase: f32) -> f32 {
    let two_pi = 2.0 * PI;
    let wrapped = phase - two_pi * floorf((phase + PI) / two_pi);
    if wrapped <= -PI { wrapped + two_pi } else { wrapped }
}

/// Offset in `[-0.5, 0.5]` of the vertex of the parabola through three
/// equally spaced points, relative to the middle one.
#[inline]
pub fn parabolic_offset(left: f32, center: f32, right: f32) -> f32 {
    let denom = left - 2.0 * center + right;
    if denom.abs() < 1e-12 {
        return 0.0;
    }
    (0.5 * (left - right) / denom).clamp(-0.5, 0.5)
}

/// Median of `values`, reordering them in place. Empty input returns 0.
pub fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    }
}

/// Convert milliseconds to samples.
#[inline]
pub fn ms_to_samples(ms: f32, sample_rate: f32) -> f32 {
    ms * sample_rate / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_roundtrip() {
        for db in [-40.0f32, -6.0, 0.0, 6.0] {
            assert!((linear_to_db(db_to_linear(db)) - db).abs() < 1e-3);
        }
    }

    #[test]
    fn test_level_db() {
        assert_eq!(level_db(&[]), f32::NEG_INFINITY);
        assert_eq!(level_db(&[0.0; 64]), f32::NEG_INFINITY);
        // Full-scale square wave: mean power 1.0 -> 0 dB
        let square: Vec<f32> = (0..64).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!(level_db(&square).abs() < 1e-4);
        assert!(is_silence(&[0.0001; 64], -70.0));
        assert!(!is_silence(&square, -70.0));
    }

    #[test]
    fn test_midi_conversions() {
        assert!((freq_to_midi(880.0) - 81.0).abs() < 1e-3);
        assert_eq!(freq_to_midi(0.0), 0.0);
        assert!((midi_to_freq(69.0) - 440.0).abs() < 1e-2);
    }

    #[test]
    fn test_bin_conversions() {
        let bin = freq_to_bin(1000.0, 48000.0, 1024);
        assert!((bin_to_freq(bin, 48000.0, 1024) - 1000.0).abs() < 1e-2);
        assert_eq!(freq_to_bin(1000.0, 0.0, 1024), 0.0);
    }

    #[test]
    fn test_mel_roundtrip() {
        for hz in [100.0f32, 1000.0, 8000.0] {
            assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 0.5);
        }
    }

    #[test]
    fn test_princarg() {
        assert!((princarg(3.0 * PI).abs() - PI).abs() < 1e-4);
        assert!((princarg(-0.5) + 0.5).abs() < 1e-6);
        assert!((princarg(2.0 * PI + 0.25) - 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_parabolic_offset() {
        assert_eq!(parabolic_offset(1.0, 2.0, 1.0), 0.0);
        assert!(parabolic_offset(1.0, 2.0, 1.5) > 0.0);
        assert!(parabolic_offset(1.5, 2.0, 1.0) < 0.0);
    }

    #[test]
    fn test_median() {
        let mut empty: [f32; 0] = [];
        assert_eq!(median(&mut empty), 0.0);
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 2.0, 3.0]), 2.5);
    }
}
