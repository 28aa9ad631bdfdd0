//! Optional TOML configuration for `nwsynth synthesize`.
//!
//! ```toml
//! [run]
//! processors = 8
//! timeout_seconds = 3600
//!
//! [output]
//! format = "csv"
//! directory = "out"
//! ```
//!
//! Command-line flags take precedence over every value here.

use anyhow::{anyhow, Context, Result};
use nwsynth_algo::SynthesisConfig;
use nwsynth_io::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::SynthesizeArgs;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NwsynthConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Worker pool settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Worker threads (0 = every CPU)
    pub processors: Option<usize>,
    /// Per-entity task timeout
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: Option<OutputFormat>,
    pub directory: Option<PathBuf>,
}

pub fn load_config(path: &Path) -> Result<NwsynthConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file '{}'", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parsing config file '{}'", path.display()))
}

/// Settings of one run after applying command-line overrides.
#[derive(Debug, Clone)]
pub struct ResolvedRun {
    pub synthesis: SynthesisConfig,
    pub out: PathBuf,
    pub format: OutputFormat,
}

impl NwsynthConfig {
    pub fn resolve(&self, args: &SynthesizeArgs) -> Result<ResolvedRun> {
        let out = args
            .out
            .clone()
            .or_else(|| self.output.directory.clone())
            .ok_or_else(|| anyhow!("no output directory: pass --out or set [output].directory"))?;
        let mut synthesis = SynthesisConfig::default()
            .with_processors(args.processors.or(self.run.processors).unwrap_or(0));
        if let Some(seconds) = self.run.timeout_seconds {
            synthesis = synthesis.with_task_timeout(Duration::from_secs(seconds));
        }
        Ok(ResolvedRun {
            synthesis,
            out,
            format: args.format.or(self.output.format).unwrap_or_default(),
        })
    }
}
