use clap::{CommandFactory, Parser, Subcommand, ValueHint};
use nwsynth_io::OutputFormat;
use std::path::PathBuf;

/// Synthesize operation tables from simulator outputs
#[derive(Parser, Debug)]
#[command(name = "nwsynth", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve syntheses from a case directory and export them
    Synthesize(SynthesizeArgs),
    /// Print the catalog of supported syntheses
    List,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SynthesizeArgs {
    /// Case directory (registry/ and outputs/)
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub case: PathBuf,

    /// Output directory (overrides [output].directory)
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub out: Option<PathBuf>,

    /// Output format: parquet or csv (overrides [output].format)
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Worker threads, 0 for every CPU (overrides [run].processors)
    #[arg(long)]
    pub processors: Option<usize>,

    /// TOML configuration file
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Syntheses to resolve, e.g. CMO_SBM EVER_SIN; none means all supported
    pub variables: Vec<String>,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
