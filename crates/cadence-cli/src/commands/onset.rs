//! Onset detection command.

use cadence_analysis::{Onset, OnsetMode};
use cadence_core::AnalysisStage;
use cadence_io::Pipeline;
use clap::Args;

use super::common::{PipelineArgs, drain};

#[derive(Args)]
pub struct OnsetArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Detection function: energy, hfc, complex, phase, specdiff, kl, mkl, specflux
    #[arg(long, default_value = "hfc")]
    mode: OnsetMode,

    /// Minimum interval between onsets in milliseconds
    #[arg(long)]
    minioi: Option<f32>,
}

pub fn run(args: OnsetArgs) -> anyhow::Result<()> {
    let config = args.pipeline.resolve()?;
    let pipeline = Pipeline::from_config(&config)?;

    let mut onset = Onset::new(args.mode, config.buffer_size, config.block_size, pipeline.sample_rate())?;
    onset.set_silence(config.silence);
    if config.threshold > 0.0 {
        onset.set_threshold(config.threshold);
    }
    if let Some(ms) = args.minioi {
        onset.set_minioi_ms(ms);
    }

    let verbose = config.verbose;
    let (total, _) = drain(
        pipeline,
        onset,
        move |onset: &Onset, _block| {
            let hit = onset.output().get(0) == Some(1.0);
            (hit || verbose).then(|| (hit, onset.last_onset_s(), onset.descriptor()))
        },
        |(hit, at, descriptor)| {
            if hit {
                println!("onset {at:.6}");
            } else {
                println!("  descriptor {descriptor:.6}");
            }
        },
    )?;

    println!("Processed: {total}");
    Ok(())
}
