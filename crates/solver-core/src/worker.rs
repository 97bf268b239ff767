//! Dedicated worker threads for the share search.
//!
//! [`JobRunner`] owns the in-flight attempt. Starting a new job cancels and
//! joins the previous workers before fresh solvers are spawned, so an old
//! attempt never touches the counters of a new one. Workers report over a
//! channel; every report carries the attempt generation and reports from
//! superseded attempts are dropped.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

use crate::cancel::CancelToken;
use crate::coinbase::{ExtraNonce2, MIN_PARTITION_SIZE};
use crate::config::SolverConfig;
use crate::error::{Result, SolverError};
use crate::job::{SubmissionResult, Subscription, Work};
use crate::solver::Solver;
use crate::stats::MiningStats;

/// A share found by one of the workers.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Attempt the share belongs to.
    pub generation: u64,
    /// Index of the worker (and extra-nonce-2 partition) that found it.
    pub worker_id: usize,
    pub submission: SubmissionResult,
    /// Stats of the finding worker.
    pub stats: MiningStats,
}

/// Final message from a worker thread.
#[derive(Debug)]
struct WorkerReport {
    generation: u64,
    worker_id: usize,
    outcome: Result<SubmissionResult>,
    stats: MiningStats,
}

/// Run a prepared solver on its own thread until it finds a share or `cancel` fires.
fn spawn_worker(
    generation: u64,
    worker_id: usize,
    mut solver: Solver,
    cancel: CancelToken,
    check_interval: u64,
    sender: Sender<WorkerReport>,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("solver-{}-{}", generation, worker_id))
        .spawn(move || {
            log::debug!("Worker {} started on job {}", worker_id, solver.job_id());

            let outcome = solver.solve(&cancel, check_interval);
            let report = WorkerReport {
                generation,
                worker_id,
                outcome,
                stats: solver.stats().clone(),
            };

            if sender.send(report).is_err() {
                log::warn!("Worker {} failed to send its report", worker_id);
            }
            log::debug!("Worker {} completed.", worker_id);
        })
        .map_err(SolverError::Spawn)
}

/// Owner of the current search attempt.
pub struct JobRunner {
    config: SolverConfig,
    generation: u64,
    cancel: CancelToken,
    handles: Vec<JoinHandle<()>>,
    active_workers: usize,
    stopped_workers: usize,
    stats: MiningStats,
    sender: Sender<WorkerReport>,
    receiver: Receiver<WorkerReport>,
}

impl JobRunner {
    pub fn new(config: SolverConfig) -> Result<Self> {
        config.validate()?;
        let (sender, receiver) = unbounded();
        Ok(JobRunner {
            config,
            generation: 0,
            cancel: CancelToken::new(),
            handles: Vec::new(),
            active_workers: 0,
            stopped_workers: 0,
            stats: MiningStats::new(),
            sender,
            receiver,
        })
    }

    /// Start solving `work`, superseding any attempt in flight.
    ///
    /// Solvers are built (and validated) before anything is cancelled, so a
    /// rejected job leaves the current attempt running. Returns the new
    /// attempt's generation.
    pub fn start(&mut self, subscription: &Subscription, work: &Work) -> Result<u64> {
        let workers = self.worker_count(subscription);
        let solvers = (0..workers)
            .map(|index| {
                let solver = Solver::new(subscription, &work.job, &work.share_target)?
                    .with_throughput_logging(self.config.log_throughput);
                if workers == 1 {
                    return Ok(solver);
                }
                let start = ExtraNonce2::partition(subscription.extra_nonce2_size, index as u8)?;
                solver.with_extra_nonce2_start(start)
            })
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "Starting job {} on {} worker(s), share difficulty {:.4}",
            work.job.job_id,
            workers,
            work.share_target.difficulty()
        );
        self.launch(solvers, spawn_worker)
    }

    /// Replace the current attempt with `solvers`, one thread each.
    ///
    /// If any thread fails to start, the ones already started are stopped and
    /// the attempt counts as having no workers.
    fn launch<F>(&mut self, solvers: Vec<Solver>, mut spawn: F) -> Result<u64>
    where
        F: FnMut(u64, usize, Solver, CancelToken, u64, Sender<WorkerReport>) -> Result<JoinHandle<()>>,
    {
        self.cancel();

        self.generation += 1;
        self.cancel = match self.config.timeout() {
            Some(timeout) => CancelToken::with_timeout(timeout),
            None => CancelToken::new(),
        };
        self.active_workers = 0;
        self.stopped_workers = 0;
        self.stats = MiningStats::new();

        for (worker_id, solver) in solvers.into_iter().enumerate() {
            let handle = spawn(
                self.generation,
                worker_id,
                solver,
                self.cancel.clone(),
                self.config.check_interval,
                self.sender.clone(),
            );
            match handle {
                Ok(handle) => {
                    self.handles.push(handle);
                    self.active_workers += 1;
                }
                Err(e) => {
                    log::warn!(
                        "Worker {} of generation {} failed to start: {}",
                        worker_id,
                        self.generation,
                        e
                    );
                    self.cancel();
                    self.active_workers = 0;
                    return Err(e);
                }
            }
        }

        Ok(self.generation)
    }

    /// Stop the current attempt and wait for its workers to exit.
    pub fn cancel(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        log::debug!("Cancelling generation {}", self.generation);
        self.cancel.cancel();

        while let Some(handle) = self.handles.pop() {
            if handle.join().is_err() {
                log::warn!("A worker of generation {} panicked", self.generation);
            }
        }
    }

    /// Block until the current attempt finishes.
    ///
    /// Returns the first share found; the other workers of the attempt are
    /// then stopped. If every worker stops without a share, returns the
    /// reason (cancelled, timed out).
    pub fn recv(&mut self) -> Result<Solution> {
        loop {
            if self.active_workers == 0 {
                return Err(SolverError::Cancelled);
            }
            let report = self.receiver.recv().map_err(|_| SolverError::WorkerPanicked)?;
            if let Some(outcome) = self.handle_report(report) {
                return outcome;
            }
        }
    }

    /// Non-blocking variant of [`JobRunner::recv`]; `None` while still searching.
    pub fn try_recv(&mut self) -> Option<Result<Solution>> {
        loop {
            match self.receiver.try_recv() {
                Ok(report) => {
                    if let Some(outcome) = self.handle_report(report) {
                        return Some(outcome);
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => return Some(Err(SolverError::WorkerPanicked)),
            }
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Combined stats of the workers that have reported for the current attempt.
    pub fn stats(&self) -> &MiningStats {
        &self.stats
    }

    fn handle_report(&mut self, report: WorkerReport) -> Option<Result<Solution>> {
        if report.generation != self.generation {
            log::debug!(
                "Dropping report from worker {} of stale generation {}",
                report.worker_id,
                report.generation
            );
            return None;
        }

        self.stats.merge(&report.stats);

        match report.outcome {
            Ok(submission) => {
                // First share wins; the siblings are told to stop
                self.cancel.cancel();
                self.active_workers = 0;
                Some(Ok(Solution {
                    generation: report.generation,
                    worker_id: report.worker_id,
                    submission,
                    stats: report.stats,
                }))
            }
            Err(e) => {
                self.stopped_workers += 1;
                if self.stopped_workers >= self.active_workers {
                    self.active_workers = 0;
                    Some(Err(e))
                } else {
                    None
                }
            }
        }
    }

    fn worker_count(&self, subscription: &Subscription) -> usize {
        let requested = self.config.worker_threads;
        if requested > 1 && subscription.extra_nonce2_size < MIN_PARTITION_SIZE {
            log::warn!(
                "A {}-byte extra-nonce-2 is too narrow to partition; using a single worker",
                subscription.extra_nonce2_size
            );
            return 1;
        }
        requested
    }
}

impl Drop for JobRunner {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::ShareTarget;
    use crate::solver::tests::{sample_job, sample_subscription, target_with_zero_bytes};

    fn work(target: ShareTarget) -> Work {
        Work {
            job: sample_job(),
            share_target: target,
        }
    }

    fn config(worker_threads: usize) -> SolverConfig {
        SolverConfig {
            worker_threads,
            check_interval: 64,
            ..SolverConfig::default()
        }
    }

    #[test]
    fn test_runner_finds_share() {
        let mut runner = JobRunner::new(config(1)).unwrap();
        let generation = runner.start(&sample_subscription(), &work(target_with_zero_bytes(1))).unwrap();

        let solution = runner.recv().unwrap();
        assert_eq!(solution.generation, generation);
        assert_eq!(solution.worker_id, 0);
        assert_eq!(solution.submission.job_id, "4f");
        assert!(runner.stats().hashes >= 1);
    }

    #[test]
    fn test_partitioned_workers() {
        let mut runner = JobRunner::new(config(4)).unwrap();
        runner.start(&sample_subscription(), &work(target_with_zero_bytes(1))).unwrap();

        let solution = runner.recv().unwrap();
        let en2 = hex::decode(&solution.submission.extra_nonce2).unwrap();
        assert_eq!(en2.len(), 4);
        assert_eq!(en2[0] as usize, solution.worker_id);
        assert!(solution.worker_id < 4);
    }

    #[test]
    fn test_cancel_stops_search() {
        let mut runner = JobRunner::new(config(2)).unwrap();
        runner.start(&sample_subscription(), &work(ShareTarget::new([0u8; 32]))).unwrap();
        assert!(runner.try_recv().is_none());

        runner.cancel();
        assert!(matches!(runner.recv(), Err(SolverError::Cancelled)));
    }

    #[test]
    fn test_timeout() {
        let mut runner = JobRunner::new(SolverConfig {
            timeout_ms: Some(30),
            ..config(1)
        })
        .unwrap();
        runner.start(&sample_subscription(), &work(ShareTarget::new([0u8; 32]))).unwrap();

        assert!(matches!(runner.recv(), Err(SolverError::TimedOut)));
    }

    #[test]
    fn test_new_job_supersedes_old() {
        let mut runner = JobRunner::new(config(1)).unwrap();
        let first = runner.start(&sample_subscription(), &work(ShareTarget::new([0u8; 32]))).unwrap();

        let mut next = work(target_with_zero_bytes(0));
        next.job.job_id = "50".into();
        let second = runner.start(&sample_subscription(), &next).unwrap();
        assert!(second > first);

        // The cancelled first attempt's report is discarded
        let solution = runner.recv().unwrap();
        assert_eq!(solution.generation, second);
        assert_eq!(solution.submission.job_id, "50");
        assert_eq!(solution.submission.extra_nonce2, "00000000");
        assert_eq!(solution.submission.block_nonce, "01000000");
    }

    #[test]
    fn test_zero_width_extra_nonce2_uses_single_worker() {
        let mut runner = JobRunner::new(config(2)).unwrap();
        let generation = runner.start(&sample_subscription(), &work(target_with_zero_bytes(1))).unwrap();

        let narrow = Subscription::new("x", "00", 0).unwrap();
        let fallback = runner.start(&narrow, &work(target_with_zero_bytes(0))).unwrap();
        assert_eq!(fallback, generation + 1);
        let solution = runner.recv().unwrap();
        assert_eq!(solution.worker_id, 0);
        assert_eq!(solution.submission.extra_nonce2, "");
    }

    #[test]
    fn test_one_byte_extra_nonce2_uses_single_worker() {
        let mut runner = JobRunner::new(config(4)).unwrap();
        let narrow = Subscription::new("x", "00", 1).unwrap();
        runner.start(&narrow, &work(target_with_zero_bytes(0))).unwrap();

        let solution = runner.recv().unwrap();
        assert_eq!(solution.worker_id, 0);
        assert_eq!(solution.submission.extra_nonce2, "00");
    }

    #[test]
    fn test_failed_spawn_leaves_no_pending_workers() {
        let mut runner = JobRunner::new(config(2)).unwrap();
        let solvers = (0..2)
            .map(|_| Solver::new(&sample_subscription(), &sample_job(), &ShareTarget::new([0u8; 32])).unwrap())
            .collect();

        let result = runner.launch(solvers, |generation, worker_id, solver, cancel, interval, sender| {
            if worker_id == 0 {
                spawn_worker(generation, worker_id, solver, cancel, interval, sender)
            } else {
                Err(SolverError::Spawn(std::io::Error::new(
                    std::io::ErrorKind::WouldBlock,
                    "thread limit reached",
                )))
            }
        });
        assert!(matches!(result, Err(SolverError::Spawn(_))));

        // Returns instead of waiting on the worker that never started
        assert!(matches!(runner.recv(), Err(SolverError::Cancelled)));

        // The stopped worker's report is stale for the next attempt
        let generation = runner.start(&sample_subscription(), &work(target_with_zero_bytes(0))).unwrap();
        let solution = runner.recv().unwrap();
        assert_eq!(solution.generation, generation);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(JobRunner::new(config(0)), Err(SolverError::Config(_))));
    }
}
