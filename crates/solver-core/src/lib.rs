//! Share solver for stratum-style mining jobs.
//!
//! This crate provides pure Rust implementations of:
//! - Decoding subscription and notify payloads from the job source
//! - Coinbase assembly with a rolling extra-nonce-2
//! - Merkle root folding over the job's merkle branch
//! - Block header assembly with per-field length validation
//! - SHA256 double-hashing behind a pluggable hash trait
//! - Target comparison and difficulty conversion
//! - A resumable, cancellable nonce search and worker threads to run it

pub mod block;
pub mod bytes;
pub mod cancel;
pub mod coinbase;
pub mod config;
pub mod difficulty;
pub mod error;
pub mod hash;
pub mod job;
pub mod merkle;
pub mod solver;
pub mod stats;
#[cfg(feature = "threads")]
pub mod worker;

pub use block::BlockHeader;
pub use cancel::CancelToken;
pub use coinbase::{CoinbaseParts, ExtraNonce2};
pub use config::SolverConfig;
pub use difficulty::{bits_to_target, is_satisfied};
pub use error::{Result, SolverError};
pub use hash::{double_sha256, hash_block_header, hash_transaction, PowHasher, Sha256Hasher};
pub use job::{JobDescription, ShareTarget, SubmissionResult, Subscription, Work};
pub use merkle::compute_merkle_root;
pub use solver::Solver;
pub use stats::MiningStats;
#[cfg(feature = "threads")]
pub use worker::{JobRunner, Solution};
