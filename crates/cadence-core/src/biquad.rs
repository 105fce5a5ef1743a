//! Second-order section designers.
//!
//! Coefficients follow the RBJ Audio EQ Cookbook and are returned already
//! normalized by `a0`, in the layout [`Filter`](crate::Filter) stores them:
//!
//! ```text
//! y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2]
//!                - a1*y[n-1] - a2*y[n-2]
//! ```

use core::f64::consts::PI;
use libm::{cos, sin};

/// Normalized biquad coefficients (`a[0] == 1.0`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadDesign {
    /// Feedforward taps `b0, b1, b2`.
    pub b: [f64; 3],
    /// Feedback taps `1.0, a1, a2`.
    pub a: [f64; 3],
}

impl BiquadDesign {
    /// Builds a design from raw cookbook values, normalizing by `a0`.
    pub fn from_raw(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        let inv = 1.0 / a0;
        Self {
            b: [b0 * inv, b1 * inv, b2 * inv],
            a: [1.0, a1 * inv, a2 * inv],
        }
    }

    /// Magnitude response at `freq` Hz.
    pub fn magnitude_at(&self, freq: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * freq / sample_rate;
        let (c1, s1, c2, s2) = (cos(w), sin(w), cos(2.0 * w), sin(2.0 * w));
        let num_re = self.b[0] + self.b[1] * c1 + self.b[2] * c2;
        let num_im = -(self.b[1] * s1 + self.b[2] * s2);
        let den_re = self.a[0] + self.a[1] * c1 + self.a[2] * c2;
        let den_im = -(self.a[1] * s1 + self.a[2] * s2);
        ((num_re * num_re + num_im * num_im) / (den_re * den_re + den_im * den_im)).sqrt()
    }
}

/// Shared cookbook intermediates for a cutoff/center frequency.
struct Prewarp {
    cos_omega: f64,
    alpha: f64,
}

fn prewarp(frequency: f64, q: f64, sample_rate: f64) -> Prewarp {
    let omega = 2.0 * PI * frequency / sample_rate;
    Prewarp {
        cos_omega: cos(omega),
        alpha: sin(omega) / (2.0 * q),
    }
}

/// Low-pass section.
///
/// # Arguments
///
/// * `frequency` - Cutoff frequency in Hz
/// * `q` - Q factor (0.707 for Butterworth response)
/// * `sample_rate` - Sample rate in Hz
pub fn lowpass(frequency: f64, q: f64, sample_rate: f64) -> BiquadDesign {
    let Prewarp { cos_omega, alpha } = prewarp(frequency, q, sample_rate);
    BiquadDesign::from_raw(
        (1.0 - cos_omega) / 2.0,
        1.0 - cos_omega,
        (1.0 - cos_omega) / 2.0,
        1.0 + alpha,
        -2.0 * cos_omega,
        1.0 - alpha,
    )
}

/// High-pass section.
pub fn highpass(frequency: f64, q: f64, sample_rate: f64) -> BiquadDesign {
    let Prewarp { cos_omega, alpha } = prewarp(frequency, q, sample_rate);
    BiquadDesign::from_raw(
        (1.0 + cos_omega) / 2.0,
        -(1.0 + cos_omega),
        (1.0 + cos_omega) / 2.0,
        1.0 + alpha,
        -2.0 * cos_omega,
        1.0 - alpha,
    )
}

/// Band-pass section with constant 0 dB peak gain.
pub fn bandpass(frequency: f64, q: f64, sample_rate: f64) -> BiquadDesign {
    let Prewarp { cos_omega, alpha } = prewarp(frequency, q, sample_rate);
    BiquadDesign::from_raw(alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha)
}
