//! Pitch tracking command.

use cadence_analysis::{Pitch, PitchMethod, PitchUnit};
use cadence_core::AnalysisStage;
use cadence_io::Pipeline;
use clap::Args;

use super::common::{PipelineArgs, block_time, drain};

#[derive(Args)]
pub struct PitchArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Method: default, yin, yinfft, mcomb, schmitt, fcomb
    #[arg(long, default_value = "default")]
    method: PitchMethod,

    /// Output unit: freq, hz, midi, cent, bin
    #[arg(long, default_value = "freq")]
    unit: PitchUnit,

    /// YIN tolerance (yin and yinfft only)
    #[arg(long)]
    tolerance: Option<f32>,
}

pub fn run(args: PitchArgs) -> anyhow::Result<()> {
    let config = args.pipeline.resolve()?;
    let pipeline = Pipeline::from_config(&config)?;
    let sample_rate = pipeline.sample_rate();

    let mut pitch = Pitch::new(args.method, config.buffer_size, config.block_size, sample_rate)?;
    pitch.set_unit(args.unit);
    if let Some(tolerance) = args.tolerance {
        pitch.set_tolerance(tolerance);
    }
    // The pitch gate has its own default; only an explicit flag replaces it.
    if args.pipeline.silence.is_some() {
        pitch.set_silence(config.silence);
    }

    let verbose = config.verbose;
    let block_size = config.block_size;
    let (total, _) = drain(
        pipeline,
        pitch,
        move |pitch: &Pitch, block| {
            let value = pitch.output().get(0).unwrap_or(0.0);
            (value != 0.0 || verbose).then(|| (block_time(block, block_size, sample_rate), value))
        },
        |(at, value)| println!("pitch {at:.6} {value:.6}"),
    )?;

    if verbose {
        println!("Processed: {total}");
    }
    Ok(())
}
