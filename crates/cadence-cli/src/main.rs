//! Cadence CLI - onset, tempo and pitch tracking over WAV files.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(author, version, about = "Streaming audio analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print onset times
    Onset(commands::onset::OnsetArgs),

    /// Track beats and estimate tempo
    Tempo(commands::tempo::TempoArgs),

    /// Print the pitch of every block
    Pitch(commands::pitch::PitchArgs),

    /// Copy a WAV file block by block
    Copy(commands::copy::CopyArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Commands::Onset(args) => args.pipeline.verbose,
            Commands::Tempo(args) => args.pipeline.verbose,
            Commands::Pitch(args) => args.pipeline.verbose,
            Commands::Copy(args) => args.pipeline.verbose,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.command.verbose() { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onset(args) => commands::onset::run(args),
        Commands::Tempo(args) => commands::tempo::run(args),
        Commands::Pitch(args) => commands::pitch::run(args),
        Commands::Copy(args) => commands::copy::run(args),
    }
}
