//! Cooperative cancellation for a running search.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Result, SolverError};

/// Shared stop signal with an optional deadline.
///
/// Clones share the same flag, so any holder can stop every search watching
/// it. The search polls the token between batches of hashes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that also expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        CancelToken {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `Err(Cancelled)` once cancelled, `Err(TimedOut)` past the deadline.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(SolverError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(SolverError::TimedOut),
            _ => Ok(()),
        }
    }
}
