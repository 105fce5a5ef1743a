//! Integration tests for cadence-cli.
//!
//! Each test writes a synthetic WAV file and runs the `cadence` binary on it.

use std::f32::consts::PI;
use std::path::{Path, PathBuf};
use std::process::Command;

use cadence_core::SampleBuffer;
use cadence_io::{Sink, WavSink};
use tempfile::TempDir;

const SR: u32 = 44100;

/// Helper to get the path to the `cadence` binary built by cargo.
fn cadence_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_cadence"))
}

fn write_wav(dir: &TempDir, name: &str, samples: &[f32]) -> PathBuf {
    let path = dir.path().join(name);
    let mut sink = WavSink::open(path.to_str().unwrap(), SR).unwrap();
    sink.write(&SampleBuffer::from_slice(samples), samples.len());
    sink.close();
    path
}

/// Clicks every `period` samples, starting after a short silence.
fn click_train(period: usize, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            if i < SR as usize / 4 {
                return 0.0;
            }
            let phase = (i - SR as usize / 4) % period;
            if phase < 64 {
                let env = 1.0 - phase as f32 / 64.0;
                env * if phase % 2 == 0 { 0.8 } else { -0.8 }
            } else {
                0.0
            }
        })
        .collect()
}

fn sine(freq: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| 0.5 * (2.0 * PI * freq * i as f32 / SR as f32).sin())
        .collect()
}

fn stdout_of(args: &[&str], file: &Path) -> String {
    let output = cadence_bin()
        .args(args)
        .arg(file)
        .output()
        .expect("failed to run cadence");
    assert!(
        output.status.success(),
        "cadence {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ---------------------------------------------------------------------------
// Analysis commands
// ---------------------------------------------------------------------------

#[test]
fn cli_onset_reports_clicks() {
    let dir = TempDir::new().unwrap();
    let file = write_wav(&dir, "clicks.wav", &click_train(SR as usize / 2, SR as usize * 3));

    let stdout = stdout_of(&["onset"], &file);
    let onsets: Vec<f64> = stdout
        .lines()
        .filter_map(|l| l.strip_prefix("onset "))
        .map(|t| t.parse().unwrap())
        .collect();

    assert!(onsets.len() >= 3, "too few onsets:\n{stdout}");
    assert!(onsets.windows(2).all(|w| w[1] > w[0]));
    assert!(stdout.contains(&format!("Processed: {}", SR * 3)));
}

#[test]
fn cli_onset_accepts_mode_aliases() {
    let dir = TempDir::new().unwrap();
    let file = write_wav(&dir, "clicks.wav", &click_train(SR as usize / 2, SR as usize));
    for mode in ["energy", "specflux", "k1", "mk1", "default"] {
        stdout_of(&["onset", "--mode", mode], &file);
    }
}

#[test]
fn cli_tempo_prints_summary() {
    let dir = TempDir::new().unwrap();
    let file = write_wav(&dir, "beat.wav", &click_train(SR as usize / 2, SR as usize * 12));

    let stdout = stdout_of(&["tempo", "--bufsize", "1024"], &file);
    assert!(stdout.contains("BPM:"), "{stdout}");
    assert!(stdout.contains("Confidence:"));

    let bpm: f32 = stdout
        .lines()
        .find_map(|l| l.strip_prefix("BPM: "))
        .unwrap()
        .parse()
        .unwrap();
    assert!((bpm - 120.0).abs() < 5.0, "bpm {bpm}");
}

#[test]
fn cli_pitch_tracks_sine() {
    let dir = TempDir::new().unwrap();
    let file = write_wav(&dir, "a440.wav", &sine(440.0, SR as usize));

    let stdout = stdout_of(&["pitch", "--method", "yin", "--bufsize", "2048", "--blocksize", "512"], &file);
    let values: Vec<f32> = stdout
        .lines()
        .filter_map(|l| l.strip_prefix("pitch "))
        .filter_map(|l| l.split_whitespace().nth(1))
        .map(|v| v.parse().unwrap())
        .collect();

    assert!(values.len() > 20, "{stdout}");
    let tail = &values[values.len() - 10..];
    assert!(tail.iter().all(|f| (f - 440.0).abs() < 3.0), "{tail:?}");
}

#[test]
fn cli_pitch_midi_unit() {
    let dir = TempDir::new().unwrap();
    let file = write_wav(&dir, "a440.wav", &sine(440.0, SR as usize));

    let stdout = stdout_of(&["pitch", "--unit", "midi", "--bufsize", "2048"], &file);
    let last: f32 = stdout
        .lines()
        .filter_map(|l| l.strip_prefix("pitch "))
        .filter_map(|l| l.split_whitespace().nth(1))
        .last()
        .unwrap()
        .parse()
        .unwrap();
    assert!((last - 69.0).abs() < 0.2, "midi {last}");
}

// ---------------------------------------------------------------------------
// Copy
// ---------------------------------------------------------------------------

#[test]
fn cli_copy_writes_sink() {
    let dir = TempDir::new().unwrap();
    let input = write_wav(&dir, "in.wav", &sine(220.0, 5000));
    let output = dir.path().join("out.wav");

    let result = cadence_bin()
        .args(["copy"])
        .arg(&input)
        .arg(&output)
        .output()
        .unwrap();
    assert!(result.status.success());
    assert!(String::from_utf8_lossy(&result.stdout).contains("Wrote: 5000"));
    assert!(output.exists());
}

#[test]
fn cli_config_file_supplies_source() {
    let dir = TempDir::new().unwrap();
    let input = write_wav(&dir, "in.wav", &click_train(SR as usize / 2, SR as usize));
    let config = dir.path().join("cadence.toml");
    std::fs::write(
        &config,
        format!("source = {:?}\nblock_size = 512\nbuffer_size = 1024\n", input.to_str().unwrap()),
    )
    .unwrap();

    let output = cadence_bin()
        .args(["onset", "--config"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains(&format!("Processed: {SR}")));
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn cli_missing_source_fails() {
    let output = cadence_bin().arg("onset").output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no source"));
}

#[test]
fn cli_unreadable_source_fails() {
    let output = cadence_bin()
        .args(["tempo", "/nonexistent/input.wav"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("/nonexistent/input.wav"));
}

#[test]
fn cli_unknown_mode_fails() {
    let dir = TempDir::new().unwrap();
    let file = write_wav(&dir, "clicks.wav", &click_train(SR as usize / 2, SR as usize));
    let output = cadence_bin()
        .args(["onset", "--mode", "bogus"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn cli_copy_without_sink_fails() {
    let dir = TempDir::new().unwrap();
    let input = write_wav(&dir, "in.wav", &sine(220.0, 1000));
    let output = cadence_bin().arg("copy").arg(&input).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no sink"));
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[test]
fn cli_verbose_logs_drain_total() {
    let dir = TempDir::new().unwrap();
    let file = write_wav(&dir, "clicks.wav", &click_train(SR as usize / 2, SR as usize));
    let output = cadence_bin()
        .env_remove("RUST_LOG")
        .args(["onset", "--verbose"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("pipeline drained"), "{stderr}");
    assert!(stderr.contains(&SR.to_string()), "{stderr}");
}
