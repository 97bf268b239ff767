//! Throughput statistics for a search.

use serde::{Deserialize, Serialize};

/// Mining statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MiningStats {
    /// Total hashes computed.
    pub hashes: u64,
    /// Elapsed time in milliseconds.
    pub elapsed_ms: f64,
    /// Current hash rate (hashes per second).
    pub hash_rate: f64,
    /// Times the block nonce was exhausted and extra-nonce-2 advanced.
    pub extra_nonce2_rollovers: u64,
}

impl MiningStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update hash rate based on elapsed time.
    pub fn update_hash_rate(&mut self) {
        if self.elapsed_ms > 0.0 {
            self.hash_rate = (self.hashes as f64) / (self.elapsed_ms / 1000.0);
        }
    }

    /// Fold in the stats of a parallel worker.
    ///
    /// Hashes add up; workers run concurrently, so elapsed time is the longest.
    pub fn merge(&mut self, other: &MiningStats) {
        self.hashes += other.hashes;
        self.extra_nonce2_rollovers += other.extra_nonce2_rollovers;
        self.elapsed_ms = self.elapsed_ms.max(other.elapsed_ms);
        self.update_hash_rate();
    }

    /// Format hash rate for display.
    pub fn format_hash_rate(&self) -> String {
        if self.hash_rate >= 1_000_000_000.0 {
            format!("{:.2} GH/s", self.hash_rate / 1_000_000_000.0)
        } else if self.hash_rate >= 1_000_000.0 {
            format!("{:.2} MH/s", self.hash_rate / 1_000_000.0)
        } else if self.hash_rate >= 1_000.0 {
            format!("{:.2} KH/s", self.hash_rate / 1_000.0)
        } else {
            format!("{:.2} H/s", self.hash_rate)
        }
    }
}
