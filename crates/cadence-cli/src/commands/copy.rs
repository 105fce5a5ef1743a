//! Block-by-block WAV copy.

use std::path::PathBuf;

use cadence_io::Pipeline;
use clap::Args;

use super::common::PipelineArgs;

#[derive(Args)]
pub struct CopyArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Output WAV file
    #[arg(value_name = "SINK")]
    sink: Option<PathBuf>,
}

pub fn run(args: CopyArgs) -> anyhow::Result<()> {
    let mut config = args.pipeline.resolve()?;
    if let Some(sink) = args.sink {
        config.sink = Some(sink);
    }
    if config.sink.is_none() {
        anyhow::bail!("no sink given: pass SINK or set `sink` in --config");
    }

    let mut pipeline = Pipeline::from_config(&config)?;
    let total = pipeline.process_all(&mut []);
    pipeline.close();

    println!("Wrote: {total}");
    Ok(())
}
