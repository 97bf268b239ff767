//! Values handed back to JavaScript.

use serde::{Deserialize, Serialize};
use solver_core::difficulty::{expected_hashes, format_difficulty};
use solver_core::Work;
use wasm_bindgen::prelude::*;

/// Convert any serializable value to a JS object.
pub fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {:?}", e)))
}

/// Summary of a loaded job for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInfo {
    pub job_id: String,
    /// Subscription id the share will be submitted under.
    pub worker_name: String,
    /// Whether the pool asked to abandon older jobs.
    pub clean_jobs: bool,
    pub merkle_branches: usize,
    pub extra_nonce2_size: usize,
    /// Difficulty of the share target.
    pub share_difficulty: f64,
    pub share_difficulty_display: String,
    /// Difficulty encoded by the job's bits.
    pub network_difficulty: f64,
    pub network_difficulty_display: String,
    /// Average hashes needed to meet the share target.
    pub expected_hashes: f64,
}

impl JobInfo {
    pub fn new(worker_name: &str, extra_nonce2_size: usize, work: &Work) -> Self {
        let share_difficulty = work.share_target.difficulty();
        let network_difficulty = work.job.network_difficulty();
        JobInfo {
            job_id: work.job.job_id.clone(),
            worker_name: worker_name.to_string(),
            clean_jobs: work.job.clean_jobs,
            merkle_branches: work.job.merkle_branches.len(),
            extra_nonce2_size,
            share_difficulty,
            share_difficulty_display: format_difficulty(share_difficulty),
            network_difficulty,
            network_difficulty_display: format_difficulty(network_difficulty),
            expected_hashes: expected_hashes(work.share_target.as_bytes()),
        }
    }

    /// Convert to JS value.
    pub fn to_js(&self) -> Result<JsValue, JsValue> {
        to_js(self)
    }
}

/// Result of one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResultInfo {
    /// Whether a share was found in this batch.
    pub share_found: bool,
    /// `[workerName, jobId, extraNonce2, ntime, nonce]`, once found.
    pub submission: Option<Vec<String>>,
    /// Solving header hash in display order.
    pub hash: Option<String>,
    pub leading_zero_bits: u32,
    /// Hashes computed in this batch.
    pub hashes_computed: u64,
}

impl BatchResultInfo {
    pub fn not_found(hashes_computed: u64) -> Self {
        BatchResultInfo {
            share_found: false,
            submission: None,
            hash: None,
            leading_zero_bits: 0,
            hashes_computed,
        }
    }

    /// Convert to JS value.
    pub fn to_js(&self) -> Result<JsValue, JsValue> {
        to_js(self)
    }
}
