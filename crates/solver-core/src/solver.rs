//! The share search.
//!
//! A [`Solver`] owns one attempt at one job: the block nonce, the
//! extra-nonce-2 counter and the merkle root derived from it. Each iteration
//! bumps the nonce; when the nonce wraps, extra-nonce-2 is advanced and the
//! merkle root recomputed, which is the only point the coinbase is rehashed.

use std::time::Instant;

use crate::block::{write_merkle_root, write_nonce, BlockHeader, HEADER_LEN};
use crate::bytes::{increment, reverse_array};
use crate::cancel::CancelToken;
use crate::coinbase::{CoinbaseParts, ExtraNonce2};
use crate::difficulty::is_satisfied;
use crate::error::{Result, SolverError};
use crate::hash::{PowHasher, Sha256Hasher};
use crate::job::{JobDescription, ShareTarget, SubmissionResult, Subscription};
use crate::merkle::compute_merkle_root;
use crate::stats::MiningStats;

/// Search state for one attempt at one job.
pub struct Solver<H: PowHasher = Sha256Hasher> {
    hasher: H,
    subscription_id: String,
    job_id: String,
    coinbase: CoinbaseParts,
    merkle_branches: Vec<[u8; 32]>,
    /// Header-order timestamp.
    timestamp: [u8; 4],
    target: [u8; 32],
    block_nonce: [u8; 4],
    extra_nonce2: ExtraNonce2,
    header: [u8; HEADER_LEN],
    merkle_recomputations: u64,
    stats: MiningStats,
    solution: Option<SubmissionResult>,
    log_throughput: bool,
}

impl Solver<Sha256Hasher> {
    /// Prepare a SHA256d search for `job` under `subscription`.
    pub fn new(subscription: &Subscription, job: &JobDescription, target: &ShareTarget) -> Result<Self> {
        Solver::with_hasher(Sha256Hasher, subscription, job, target)
    }
}

impl<H: PowHasher> Solver<H> {
    /// Prepare a search using a custom hash primitive.
    ///
    /// All job-derived bytes are decoded and laid out once here; any field of
    /// the wrong width is rejected before the search starts.
    pub fn with_hasher(
        hasher: H,
        subscription: &Subscription,
        job: &JobDescription,
        target: &ShareTarget,
    ) -> Result<Self> {
        let coinbase = CoinbaseParts::new(
            job.coinbase_head.clone(),
            subscription.extra_nonce.clone(),
            job.coinbase_tail.clone(),
        );
        let extra_nonce2 = ExtraNonce2::new(subscription.extra_nonce2_size);
        let block_nonce = [0u8; 4];
        let timestamp = job.header_timestamp();
        let merkle_root = compute_merkle_root(&hasher, &coinbase.build(&extra_nonce2), &job.merkle_branches);

        let header = BlockHeader::assemble(
            &job.header_version(),
            &job.header_previous_block_hash(),
            &merkle_root,
            &timestamp,
            &job.header_difficulty_bits(),
            &block_nonce,
        )?;

        log::debug!(
            "Prepared job {} for subscription {} ({} merkle branches, extra-nonce-2 width {})",
            job.job_id,
            subscription.id,
            job.merkle_branches.len(),
            subscription.extra_nonce2_size
        );

        Ok(Solver {
            hasher,
            subscription_id: subscription.id.clone(),
            job_id: job.job_id.clone(),
            coinbase,
            merkle_branches: job.merkle_branches.clone(),
            timestamp,
            target: *target.as_bytes(),
            block_nonce,
            extra_nonce2,
            header: header.serialize(),
            merkle_recomputations: 0,
            stats: MiningStats::new(),
            solution: None,
            log_throughput: true,
        })
    }

    /// Start the extra-nonce-2 counter at `start` instead of zero.
    ///
    /// Used to hand disjoint partitions to parallel workers. The width must
    /// match the subscription.
    pub fn with_extra_nonce2_start(mut self, start: ExtraNonce2) -> Result<Self> {
        SolverError::check_len("extra_nonce2", self.extra_nonce2.len(), start.len())?;
        self.extra_nonce2 = start;
        let merkle_root = self.merkle_root();
        write_merkle_root(&mut self.header, &merkle_root);
        Ok(self)
    }

    /// Start the block nonce at `start` instead of zero.
    ///
    /// The first hashed nonce is `start + 1`, since the nonce is bumped before
    /// each attempt.
    pub fn with_block_nonce_start(mut self, start: [u8; 4]) -> Self {
        self.block_nonce = start;
        write_nonce(&mut self.header, &start);
        self
    }

    /// Toggle the throughput log line emitted by [`Solver::solve`].
    pub fn with_throughput_logging(mut self, enabled: bool) -> Self {
        self.log_throughput = enabled;
        self
    }

    /// Try up to `max_attempts` nonces.
    ///
    /// State carries over between calls, so a caller without threads can
    /// interleave batches with other work and stop simply by not calling
    /// again. Returns the submission once a share is found; after that the
    /// solver is spent and further calls return `None`.
    pub fn step(&mut self, max_attempts: u64) -> Option<SubmissionResult> {
        if self.solution.is_some() {
            return None;
        }

        for _ in 0..max_attempts {
            if increment(&mut self.block_nonce) {
                self.roll_extra_nonce2();
            }
            write_nonce(&mut self.header, &self.block_nonce);

            let hash = self.hasher.hash_block_header(&self.header);
            self.stats.hashes += 1;

            if is_satisfied(&self.target, &hash) {
                let submission = self.submission();
                self.solution = Some(submission.clone());
                return Some(submission);
            }
        }

        None
    }

    /// Search until a share is found or `cancel` fires.
    ///
    /// The token is polled every `check_interval` hashes. Elapsed time and
    /// hash rate are tracked for the stats only.
    pub fn solve(&mut self, cancel: &CancelToken, check_interval: u64) -> Result<SubmissionResult> {
        if let Some(solution) = &self.solution {
            return Ok(solution.clone());
        }

        let start = Instant::now();
        let elapsed_before = self.stats.elapsed_ms;
        let batch = check_interval.max(1);

        loop {
            if let Err(e) = cancel.check() {
                self.record_elapsed(elapsed_before, start);
                log::debug!("Job {} stopped after {} hashes: {}", self.job_id, self.stats.hashes, e);
                return Err(e);
            }

            let found = self.step(batch);
            self.record_elapsed(elapsed_before, start);

            if let Some(submission) = found {
                if self.log_throughput {
                    log::info!(
                        "{} hashes in {:.0} ms ({})",
                        self.stats.hashes,
                        self.stats.elapsed_ms,
                        self.stats.format_hash_rate()
                    );
                }
                return Ok(submission);
            }
        }
    }

    /// The submission, once a share has been found.
    pub fn solution(&self) -> Option<&SubmissionResult> {
        self.solution.as_ref()
    }

    /// The current serialized header; after a successful search, the solving header.
    pub fn header_bytes(&self) -> &[u8; HEADER_LEN] {
        &self.header
    }

    pub fn block_nonce(&self) -> [u8; 4] {
        self.block_nonce
    }

    pub fn extra_nonce2(&self) -> &ExtraNonce2 {
        &self.extra_nonce2
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn target(&self) -> &[u8; 32] {
        &self.target
    }

    pub fn hashes(&self) -> u64 {
        self.stats.hashes
    }

    /// Merkle roots recomputed because the block nonce wrapped.
    pub fn merkle_recomputations(&self) -> u64 {
        self.merkle_recomputations
    }

    pub fn stats(&self) -> &MiningStats {
        &self.stats
    }

    fn merkle_root(&self) -> [u8; 32] {
        let coinbase = self.coinbase.build(&self.extra_nonce2);
        compute_merkle_root(&self.hasher, &coinbase, &self.merkle_branches)
    }

    fn roll_extra_nonce2(&mut self) {
        if self.extra_nonce2.increment() {
            match self.extra_nonce2.partition_index() {
                Some(index) => log::warn!(
                    "Extra-nonce-2 partition {} exhausted for job {}; search is repeating",
                    index,
                    self.job_id
                ),
                None => log::warn!(
                    "Extra-nonce-2 space exhausted for job {}; search is repeating",
                    self.job_id
                ),
            }
        }

        let merkle_root = self.merkle_root();
        write_merkle_root(&mut self.header, &merkle_root);
        self.merkle_recomputations += 1;
        self.stats.extra_nonce2_rollovers += 1;

        log::debug!(
            "Job {}: nonce space exhausted, extra-nonce-2 now {}",
            self.job_id,
            self.extra_nonce2.to_hex()
        );
    }

    fn submission(&self) -> SubmissionResult {
        SubmissionResult {
            subscription_id: self.subscription_id.clone(),
            job_id: self.job_id.clone(),
            extra_nonce2: self.extra_nonce2.to_hex(),
            block_timestamp: hex::encode(reverse_array(&self.timestamp)),
            block_nonce: hex::encode(reverse_array(&self.block_nonce)),
        }
    }

    fn record_elapsed(&mut self, elapsed_before: f64, start: Instant) {
        self.stats.elapsed_ms = elapsed_before + start.elapsed().as_secs_f64() * 1000.0;
        self.stats.update_hash_rate();
    }
}
