//! Shared CLI helpers used across multiple commands.

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use cadence_core::{AnalysisStage, SampleBuffer};
use cadence_io::{Pipeline, PipelineConfig, Process};
use clap::Args;

/// Flags shared by every command.
///
/// Values given on the command line override those from `--config`.
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// Input WAV file
    #[arg(value_name = "SOURCE")]
    pub source: Option<PathBuf>,

    /// Sample rate in Hz, 0 to use the file's [default: 0]
    #[arg(long)]
    pub samplerate: Option<u32>,

    /// Samples per block (analysis hop) [default: 256]
    #[arg(long)]
    pub blocksize: Option<usize>,

    /// Working buffer and analysis window size [default: 512]
    #[arg(long)]
    pub bufsize: Option<usize>,

    /// Silence gate in dB [default: -90]
    #[arg(long, allow_negative_numbers = true)]
    pub silence: Option<f32>,

    /// Peak-picking threshold, 0 for the detector default [default: 0]
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Print every block and debug logs
    #[arg(short, long)]
    pub verbose: bool,

    /// TOML file with pipeline settings
    #[arg(long, value_name = "TOML")]
    pub config: Option<PathBuf>,
}

impl PipelineArgs {
    /// Merges `--config` with the command-line flags and checks the result.
    pub fn resolve(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(source) = &self.source {
            config.source = Some(source.clone());
        }
        if let Some(rate) = self.samplerate {
            config.sample_rate = rate;
        }
        if let Some(block) = self.blocksize {
            config.block_size = block;
        }
        if let Some(buf) = self.bufsize {
            config.buffer_size = buf;
        }
        if let Some(silence) = self.silence {
            config.silence = silence;
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        config.verbose |= self.verbose;

        if config.source.is_none() {
            anyhow::bail!("no source given: pass SOURCE or set `source` in --config");
        }
        config.validate()?;

        if config.verbose
            && let Some(source) = &config.source
        {
            println!("Input file: {}", source.display());
        }
        Ok(config)
    }
}

/// Drains `pipeline` through `stage` on a worker thread.
///
/// After every block `extract` may produce a value, which is sent back over a
/// channel and handed to `emit` on the calling thread. Returns the total
/// sample count and the stage, for final readings.
pub fn drain<S, T, F>(
    mut pipeline: Pipeline,
    mut stage: S,
    mut extract: F,
    mut emit: impl FnMut(T),
) -> anyhow::Result<(usize, S)>
where
    S: AnalysisStage<Input = SampleBuffer> + Send + 'static,
    T: Send + 'static,
    F: FnMut(&S, u64) -> Option<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();

    let worker = thread::spawn(move || {
        let mut block = 0_u64;
        let mut feed = |buf: &mut SampleBuffer| {
            stage.process(buf);
            if let Some(value) = extract(&stage, block) {
                // The receiver only goes away if the main thread panicked.
                let _ = tx.send(value);
            }
            block += 1;
        };
        let total = pipeline.process_all(&mut [&mut feed as &mut dyn Process]);
        pipeline.close();
        (total, stage)
    });

    for value in rx {
        emit(value);
    }

    let (total, stage) = worker
        .join()
        .map_err(|_| anyhow::anyhow!("analysis thread panicked"))?;
    tracing::debug!(total, "pipeline drained");
    Ok((total, stage))
}

/// Seconds at the start of block `index`.
pub fn block_time(index: u64, block_size: usize, sample_rate: u32) -> f64 {
    (index * block_size as u64) as f64 / f64::from(sample_rate.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_requires_source() {
        let err = PipelineArgs::default().resolve().unwrap_err();
        assert!(err.to_string().contains("no source"));
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = PipelineArgs {
            source: Some(PathBuf::from("in.wav")),
            blocksize: Some(128),
            silence: Some(-60.0),
            ..PipelineArgs::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.block_size, 128);
        assert_eq!(config.buffer_size, 512);
        assert_eq!(config.silence, -60.0);
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.toml");
        std::fs::write(&path, "source = \"a.wav\"\nblock_size = 64\nbuffer_size = 1024\n").unwrap();

        let args = PipelineArgs {
            bufsize: Some(2048),
            config: Some(path),
            ..PipelineArgs::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.source_uri().as_deref(), Some("a.wav"));
        assert_eq!(config.block_size, 64);
        assert_eq!(config.buffer_size, 2048);
    }

    #[test]
    fn test_zero_blocksize_rejected() {
        let args = PipelineArgs {
            source: Some(PathBuf::from("in.wav")),
            blocksize: Some(0),
            ..PipelineArgs::default()
        };
        assert!(args.resolve().is_err());
    }

    #[test]
    fn test_block_time() {
        assert_eq!(block_time(0, 256, 44100), 0.0);
        assert!((block_time(172, 256, 44100) - 0.998).abs() < 1e-3);
    }
}
