//! Integration tests for cadence-core filters and buffers.
//!
//! Verifies filter accuracy with signal-level measurements: sine wave
//! analysis for the biquad designers, zero-phase filtering, and the
//! released-handle behaviour shared by every stage.

use cadence_core::{AnalysisStage, Filter, SampleBuffer, level_db};

const SAMPLE_RATE: u32 = 48000;
const TAU: f32 = core::f32::consts::TAU;

/// Generate a sine wave buffer at the given frequency.
fn generate_sine(freq_hz: f32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|n| libm::sinf(TAU * freq_hz * n as f32 / SAMPLE_RATE as f32))
        .collect()
}

/// Gain in dB of a designed filter at `freq_hz`, measured after settling.
fn measure_response(filter: &mut Filter, freq_hz: f32) -> f32 {
    let signal = generate_sine(freq_hz, 8192);
    let mut block = SampleBuffer::from_slice(&signal);
    filter.reset();
    filter.process_in_place(&mut block);
    let settled = &block.as_slice()[4096..];
    level_db(settled) - level_db(&signal[4096..])
}

// ============================================================================
// 1. Filter frequency responses
// ============================================================================

#[test]
fn lowpass_passes_low_attenuates_high() {
    let mut filter = Filter::new(3, 0).unwrap();
    filter.set_sample_rate(SAMPLE_RATE);
    filter.set_lowpass(1000.0, 0.707).unwrap();

    let pass = measure_response(&mut filter, 100.0);
    let stop = measure_response(&mut filter, 10000.0);
    assert!(pass.abs() < 0.5, "passband gain {pass} dB");
    assert!(stop < -30.0, "stopband gain {stop} dB");
}

#[test]
fn highpass_attenuates_low() {
    let mut filter = Filter::new(3, 0).unwrap();
    filter.set_sample_rate(SAMPLE_RATE);
    filter.set_highpass(2000.0, 0.707).unwrap();

    assert!(measure_response(&mut filter, 100.0) < -40.0);
    assert!(measure_response(&mut filter, 15000.0).abs() < 0.5);
}

#[test]
fn bandpass_peaks_at_center() {
    let mut filter = Filter::new(3, 0).unwrap();
    filter.set_sample_rate(SAMPLE_RATE);
    filter.set_bandpass(3000.0, 4.0).unwrap();

    let center = measure_response(&mut filter, 3000.0);
    let below = measure_response(&mut filter, 300.0);
    assert!(center.abs() < 0.5, "center gain {center} dB");
    assert!(below < -20.0);
}

// ============================================================================
// 2. Zero-phase filtering
// ============================================================================

#[test]
fn forward_backward_doubles_attenuation() {
    let mut single = Filter::new(3, 0).unwrap();
    single.set_sample_rate(SAMPLE_RATE);
    single.set_lowpass(1000.0, 0.707).unwrap();
    let mut double = single.clone();

    let signal = generate_sine(1000.0, 4096);
    let mut once = SampleBuffer::from_slice(&signal);
    single.process_in_place(&mut once);
    let mut twice = SampleBuffer::from_slice(&signal);
    double.process_forward_backward(&mut twice, 4096);

    let mid = 1024..3072;
    let once_db = level_db(&once.as_slice()[mid.clone()]) - level_db(&signal[mid.clone()]);
    let twice_db = level_db(&twice.as_slice()[mid.clone()]) - level_db(&signal[mid]);
    assert!((twice_db - 2.0 * once_db).abs() < 0.5, "{once_db} dB vs {twice_db} dB");
}

#[test]
fn forward_backward_has_no_phase_shift() {
    let mut filter = Filter::new(3, 0).unwrap();
    filter.set_sample_rate(SAMPLE_RATE);
    filter.set_lowpass(2000.0, 0.707).unwrap();

    let signal = generate_sine(200.0, 4800);
    let mut block = SampleBuffer::from_slice(&signal);
    filter.process_forward_backward(&mut block, 4800);

    // Far from both edges the filtered sine lines up with the input.
    for i in 1200..3600 {
        assert!((block.as_slice()[i] - signal[i]).abs() < 0.02, "sample {i}");
    }
}

// ============================================================================
// 3. Lifecycle
// ============================================================================

#[test]
fn coefficient_views_are_borrowed() {
    let mut filter = Filter::new(3, 16).unwrap();
    filter.set_lowpass(500.0, 0.707).unwrap();
    let b = filter.feedforward_coefficients().map(|c| c.to_vec()).unwrap();
    let a = filter.feedback_coefficients().map(|c| c.to_vec()).unwrap();
    assert_eq!(b.len(), 3);
    assert_eq!(a[0], 1.0);

    filter.release();
    assert!(filter.feedforward_coefficients().is_none());
    // Copies taken before release survive it.
    assert_eq!(b.len(), 3);
}

#[test]
fn stage_release_is_idempotent() {
    let mut filter = Filter::new(2, 32).unwrap();
    let input = SampleBuffer::from_slice(&[0.5; 32]);
    filter.process(&input);
    assert_eq!(filter.output().size(), 32);

    for _ in 0..3 {
        filter.release();
    }
    filter.process(&input);
    assert!(filter.is_released());
    assert_eq!(filter.output().size(), 0);
}
