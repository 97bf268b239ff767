//! Solver configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};

/// Upper bound on parallel workers; each owns one leading extra-nonce-2 byte.
pub const MAX_WORKER_THREADS: usize = 256;

/// Tuning for a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Number of worker threads, each searching its own extra-nonce-2 partition
    /// (default: 1)
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Hashes between cancellation checks (default: 4096)
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,

    /// Give up after this many milliseconds; unset means no deadline.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Log the throughput line when a share is found (default: true)
    #[serde(default = "default_log_throughput")]
    pub log_throughput: bool,
}

fn default_worker_threads() -> usize {
    1
}

fn default_check_interval() -> u64 {
    4096
}

fn default_log_throughput() -> bool {
    true
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            worker_threads: default_worker_threads(),
            check_interval: default_check_interval(),
            timeout_ms: None,
            log_throughput: default_log_throughput(),
        }
    }
}

impl SolverConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SolverConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 || self.worker_threads > MAX_WORKER_THREADS {
            return Err(SolverError::Config(format!(
                "worker_threads must be between 1 and {}, got {}",
                MAX_WORKER_THREADS, self.worker_threads
            )));
        }
        if self.check_interval == 0 {
            return Err(SolverError::Config("check_interval must be positive".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
