pub mod cli;
pub mod config;

pub use cli::{build_cli_command, Cli, Commands, SynthesizeArgs};
pub use config::{load_config, NwsynthConfig, ResolvedRun};
