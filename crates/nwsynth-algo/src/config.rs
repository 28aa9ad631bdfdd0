use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-entity tasks are abandoned after this long.
pub const DEFAULT_TASK_TIMEOUT_SECS: u64 = 3600;

/// Runtime settings of a synthesis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Worker threads for the spatial fan-out; 0 uses every CPU.
    pub processors: usize,
    /// Ceiling on the wait for each per-entity task.
    pub task_timeout: Duration,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            processors: 0,
            task_timeout: Duration::from_secs(DEFAULT_TASK_TIMEOUT_SECS),
        }
    }
}

impl SynthesisConfig {
    pub fn with_processors(mut self, processors: usize) -> Self {
        self.processors = processors;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Effective worker count.
    pub fn thread_count(&self) -> usize {
        if self.processors == 0 {
            num_cpus::get()
        } else {
            self.processors
        }
    }
}
