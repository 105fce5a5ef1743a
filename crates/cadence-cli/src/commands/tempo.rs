//! Beat tracking command.

use cadence_analysis::{OnsetMode, Tempo};
use cadence_core::AnalysisStage;
use cadence_io::Pipeline;
use clap::Args;

use super::common::{PipelineArgs, drain};

#[derive(Args)]
pub struct TempoArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Detection function: energy, hfc, complex, phase, specdiff, kl, mkl, specflux
    #[arg(long, default_value = "specdiff")]
    mode: OnsetMode,
}

pub fn run(args: TempoArgs) -> anyhow::Result<()> {
    let config = args.pipeline.resolve()?;
    let pipeline = Pipeline::from_config(&config)?;

    let mut tempo = Tempo::new(args.mode, config.buffer_size, config.block_size, pipeline.sample_rate())?;
    tempo.set_silence(config.silence);
    if config.threshold > 0.0 {
        tempo.set_threshold(config.threshold);
    }

    let (total, tempo) = drain(
        pipeline,
        tempo,
        |tempo: &Tempo, _block| (tempo.output().get(0) == Some(1.0)).then(|| tempo.last_beat_s()),
        |at| println!("beat {at:.6}"),
    )?;

    println!("Processed: {total}");
    println!("BPM: {:.2}", tempo.bpm());
    println!("Confidence: {:.3}", tempo.confidence());
    Ok(())
}
