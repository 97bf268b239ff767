//! Share search controller for the WASM solver.
//!
//! The browser has no worker threads to block, so the search runs in
//! caller-sized batches: JavaScript calls [`Miner::mine_batch`] from its own
//! loop. Loading a job starts mining; finding a share or
//! [`Miner::stop_mining`] stops it, after which batches do no work.

use serde_json::Value;
use solver_core::hash::{count_leading_zero_bits, hash_block_header, hash_to_hex};
use solver_core::{MiningStats, Solver, SolverConfig, SolverError, Subscription, Work};
use wasm_bindgen::prelude::*;

use crate::state::{to_js, BatchResultInfo, JobInfo};

/// The main mining controller.
#[wasm_bindgen]
pub struct Miner {
    config: SolverConfig,
    /// Identity from the last subscribe result.
    subscription: Option<Subscription>,
    /// Search state for the current job.
    solver: Option<Solver>,
    /// Mining statistics.
    stats: MiningStats,
    /// Start time of mining.
    start_time: f64,
    /// Whether batches search; cleared once a share is found.
    is_mining: bool,
}

impl Default for Miner {
    fn default() -> Self {
        Miner::new()
    }
}

#[wasm_bindgen]
impl Miner {
    /// Create a new miner instance.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Miner {
        Miner {
            config: SolverConfig::default(),
            subscription: None,
            solver: None,
            stats: MiningStats::new(),
            start_time: 0.0,
            is_mining: false,
        }
    }

    /// Apply a solver configuration object. Unset fields take their defaults.
    #[wasm_bindgen]
    pub fn configure(&mut self, config: JsValue) -> Result<(), JsValue> {
        let config: SolverConfig = serde_wasm_bindgen::from_value(config)
            .map_err(|e| JsValue::from_str(&format!("Invalid config: {:?}", e)))?;
        config.validate().map_err(to_js_error)?;
        self.config = config;
        Ok(())
    }

    /// Store the subscription from a subscribe result
    /// (`[[[method, id], ...], extraNonce, extraNonce2Size]`).
    #[wasm_bindgen]
    pub fn subscribe(&mut self, subscribe_result: JsValue) -> Result<(), JsValue> {
        let result: Value = from_js(subscribe_result)?;
        self.apply_subscription(&result).map_err(to_js_error)
    }

    /// Load a get-work result and prepare a fresh search.
    ///
    /// Returns a summary of the job. A rejected job leaves the current one in place.
    #[wasm_bindgen]
    pub fn load_job(&mut self, get_work_result: JsValue) -> Result<JsValue, JsValue> {
        let result: Value = from_js(get_work_result)?;
        let info = self.apply_work(&result).map_err(to_js_error)?;
        info.to_js()
    }

    /// Mine a batch of nonces.
    ///
    /// # Arguments
    /// * `batch_size` - Number of nonces to try in this batch; defaults to the
    ///   configured check interval
    ///
    /// # Returns
    /// Batch result with the submission once a share is found. While mining
    /// is stopped no hashes are computed.
    #[wasm_bindgen]
    pub fn mine_batch(&mut self, batch_size: Option<u32>) -> Result<JsValue, JsValue> {
        if self.start_time <= 0.0 {
            self.start_time = js_sys::Date::now();
        }
        let batch_size = batch_size.map_or(self.config.check_interval, u64::from);
        let info = self.run_batch(batch_size).map_err(to_js_error)?;

        self.stats.elapsed_ms = js_sys::Date::now() - self.start_time;
        self.stats.update_hash_rate();

        if info.share_found && self.config.log_throughput {
            log::info!(
                "{} hashes in {:.0} ms ({})",
                self.stats.hashes,
                self.stats.elapsed_ms,
                self.stats.format_hash_rate()
            );
        }

        info.to_js()
    }

    /// Resume mining the loaded job.
    #[wasm_bindgen]
    pub fn start_mining(&mut self) {
        self.is_mining = true;
        self.start_time = js_sys::Date::now();
    }

    /// Stop mining.
    #[wasm_bindgen]
    pub fn stop_mining(&mut self) {
        self.is_mining = false;
    }

    /// Check if mining is active.
    #[wasm_bindgen(getter)]
    pub fn is_mining(&self) -> bool {
        self.is_mining
    }

    /// Get current mining statistics.
    #[wasm_bindgen]
    pub fn get_stats(&self) -> Result<JsValue, JsValue> {
        to_js(&self.stats)
    }

    /// Get the formatted hash rate.
    #[wasm_bindgen]
    pub fn get_hash_rate_display(&self) -> String {
        self.stats.format_hash_rate()
    }

    /// Submission params `[workerName, jobId, extraNonce2, ntime, nonce]`,
    /// or `undefined` before a share is found.
    #[wasm_bindgen]
    pub fn submission(&self) -> Result<JsValue, JsValue> {
        match self.solver.as_ref().and_then(Solver::solution) {
            Some(submission) => to_js(submission),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    /// Drop the current job and stats. The subscription is kept.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.solver = None;
        self.stats = MiningStats::new();
        self.start_time = 0.0;
        self.is_mining = false;
    }

    /// Current job id, if a job is loaded.
    #[wasm_bindgen(getter)]
    pub fn job_id(&self) -> Option<String> {
        self.solver.as_ref().map(|solver| solver.job_id().to_string())
    }
}

impl Miner {
    fn apply_subscription(&mut self, subscribe_result: &Value) -> solver_core::Result<()> {
        let subscription = Subscription::from_subscribe_result(subscribe_result)?;
        log::debug!(
            "Subscribed as {} with {}-byte extra-nonce-2",
            subscription.id,
            subscription.extra_nonce2_size
        );
        self.subscription = Some(subscription);
        Ok(())
    }

    fn apply_work(&mut self, get_work_result: &Value) -> solver_core::Result<JobInfo> {
        let subscription = self
            .subscription
            .as_ref()
            .ok_or_else(|| SolverError::MalformedJob("no subscription loaded".into()))?;
        let work = Work::from_get_work_result(get_work_result)?;
        let solver = Solver::new(subscription, &work.job, &work.share_target)?;

        let info = JobInfo::new(&subscription.id, subscription.extra_nonce2_size, &work);
        log::info!(
            "Loaded job {} at share difficulty {}",
            info.job_id,
            info.share_difficulty_display
        );

        self.solver = Some(solver);
        self.stats = MiningStats::new();
        self.start_time = 0.0;
        self.is_mining = true;
        Ok(info)
    }

    fn run_batch(&mut self, batch_size: u64) -> solver_core::Result<BatchResultInfo> {
        let solver = self
            .solver
            .as_mut()
            .ok_or_else(|| SolverError::MalformedJob("no job loaded".into()))?;
        if !self.is_mining {
            return Ok(BatchResultInfo::not_found(0));
        }

        let before = solver.hashes();
        let found = solver.step(batch_size);
        let hashes_computed = solver.hashes() - before;

        self.stats.hashes = solver.hashes();
        self.stats.extra_nonce2_rollovers = solver.stats().extra_nonce2_rollovers;

        let submission = match found {
            Some(submission) => submission,
            None => return Ok(BatchResultInfo::not_found(hashes_computed)),
        };

        let hash = hash_block_header(solver.header_bytes());
        log::info!(
            "Share found for job {} after {} hashes: {}",
            submission.job_id,
            solver.hashes(),
            hash_to_hex(&hash)
        );
        self.is_mining = false;

        Ok(BatchResultInfo {
            share_found: true,
            submission: Some(submission.to_params().iter().map(|s| s.to_string()).collect()),
            hash: Some(hash_to_hex(&hash)),
            leading_zero_bits: count_leading_zero_bits(&hash),
            hashes_computed,
        })
    }
}

fn from_js(value: JsValue) -> Result<Value, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("Deserialization error: {:?}", e)))
}

fn to_js_error(error: SolverError) -> JsValue {
    JsValue::from_str(&error.to_string())
}
