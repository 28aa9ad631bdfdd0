use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use nwsynth_core::{SynthError, SynthesisKey};

/// A synthesis that did not make it to the outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedSynthesis {
    pub key: String,
    pub error: String,
}

/// Outcome of one `synthesize` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisReport {
    pub created_at: DateTime<Utc>,
    /// Successful keys, in resolution order (the metadata order).
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedSynthesis>,
}

impl Default for SynthesisReport {
    fn default() -> Self {
        Self {
            created_at: Utc::now(),
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl SynthesisReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, key: &SynthesisKey) {
        self.succeeded.push(key.to_string());
    }

    pub fn record_failure(&mut self, key: &SynthesisKey, error: &SynthError) {
        self.failed.push(FailedSynthesis {
            key: key.to_string(),
            error: error.to_string(),
        });
    }

    /// Nothing was requested or nothing succeeded.
    pub fn is_total_failure(&self) -> bool {
        self.succeeded.is_empty()
    }
}

pub fn write_report(path: &Path, report: &SynthesisReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating report directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report).context("serializing synthesis report")?;
    fs::write(path, json)
        .with_context(|| format!("writing synthesis report '{}'", path.display()))?;
    Ok(())
}

pub fn load_report(path: &Path) -> Result<SynthesisReport> {
    let file = fs::File::open(path)
        .with_context(|| format!("opening synthesis report '{}'", path.display()))?;
    serde_json::from_reader(file)
        .with_context(|| format!("parsing synthesis report '{}'", path.display()))
}
