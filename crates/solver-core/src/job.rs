//! Work as delivered by the job source, and the submission sent back.
//!
//! Every byte field arrives as lowercase hex. Decoding happens once, here;
//! so does every endianness decision. Field by field, relative to the wire:
//!
//! | field               | wire                         | header            |
//! |---------------------|------------------------------|-------------------|
//! | version             | big-endian u32 hex           | reversed          |
//! | previous block hash | already in header order      | as delivered      |
//! | merkle branches     | header (internal) order      | as delivered      |
//! | difficulty bits     | big-endian u32 hex           | reversed          |
//! | timestamp           | big-endian u32 hex           | reversed          |
//! | coinbase head/tail  | raw transaction bytes        | as delivered      |
//!
//! The previous block hash is word-unswapped by the job source before it is
//! handed out, so it needs no further flip.

use serde::ser::{Serialize, Serializer};
use serde::Deserialize;
use serde_json::Value;

use crate::bytes::reverse_array;
use crate::difficulty::{bits_to_difficulty, target_to_difficulty};
use crate::error::{decode_hex, decode_hex_array, Result, SolverError};

/// Stratum method name that identifies the notify subscription.
pub const NOTIFY_METHOD: &str = "mining.notify";

/// Widest extra-nonce-2 a subscription may ask for.
pub const MAX_EXTRA_NONCE2_SIZE: usize = 32;

/// Identity tying a miner to a job stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Subscription id reported back as the worker name.
    pub id: String,
    /// Pool-assigned extra-nonce.
    pub extra_nonce: Vec<u8>,
    /// Width of the miner-controlled extra-nonce-2.
    pub extra_nonce2_size: usize,
}

impl Subscription {
    pub fn new(id: impl Into<String>, extra_nonce_hex: &str, extra_nonce2_size: usize) -> Result<Self> {
        if extra_nonce2_size > MAX_EXTRA_NONCE2_SIZE {
            return Err(SolverError::FieldTooLong {
                field: "extra_nonce2_size",
                max: MAX_EXTRA_NONCE2_SIZE,
                actual: extra_nonce2_size,
            });
        }
        Ok(Subscription {
            id: id.into(),
            extra_nonce: decode_hex("extra_nonce", extra_nonce_hex)?,
            extra_nonce2_size,
        })
    }

    /// Decode a subscribe result:
    /// `[[[method, id], ...], extraNonceHex, extraNonce2Size]`.
    ///
    /// The subscription id is the one paired with `mining.notify`.
    pub fn from_subscribe_result(result: &Value) -> Result<Self> {
        let (subscriptions, extra_nonce, extra_nonce2_size): (Vec<Vec<Value>>, String, usize) =
            Deserialize::deserialize(result)?;

        let id = subscriptions
            .iter()
            .filter(|entry| entry.len() >= 2)
            .find(|entry| entry[0].as_str() == Some(NOTIFY_METHOD))
            .map(|entry| value_to_string(&entry[1]))
            .ok_or_else(|| SolverError::MalformedJob("no mining.notify subscription".into()))?;

        Subscription::new(id, &extra_nonce, extra_nonce2_size)
    }
}

/// One job from the pool. Fields are kept in wire order; the `header_*`
/// accessors return header order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescription {
    pub job_id: String,
    pub previous_block_hash: [u8; 32],
    pub coinbase_head: Vec<u8>,
    pub coinbase_tail: Vec<u8>,
    pub merkle_branches: Vec<[u8; 32]>,
    pub version: [u8; 4],
    pub difficulty_bits: [u8; 4],
    pub timestamp: [u8; 4],
    /// Whether older jobs should be abandoned for this one.
    pub clean_jobs: bool,
}

impl JobDescription {
    /// Decode notify params:
    /// `[jobId, prevHash, coinb1, coinb2, [branches], version, nbits, ntime, cleanJobs?]`.
    pub fn from_notify_params(params: &[Value]) -> Result<Self> {
        if params.len() < 8 {
            return Err(SolverError::MalformedJob(format!(
                "notify needs at least 8 params, got {}",
                params.len()
            )));
        }

        let branches = params[4]
            .as_array()
            .ok_or_else(|| SolverError::MalformedJob("merkle branches must be an array".into()))?
            .iter()
            .map(|branch| decode_hex_array("merkle_branch", hex_param(branch, "merkle_branch")?))
            .collect::<Result<Vec<[u8; 32]>>>()?;

        Ok(JobDescription {
            job_id: value_to_string(&params[0]),
            previous_block_hash: decode_hex_array(
                "previous_block_hash",
                hex_param(&params[1], "previous_block_hash")?,
            )?,
            coinbase_head: decode_hex("coinbase_head", hex_param(&params[2], "coinbase_head")?)?,
            coinbase_tail: decode_hex("coinbase_tail", hex_param(&params[3], "coinbase_tail")?)?,
            merkle_branches: branches,
            version: decode_hex_array("version", hex_param(&params[5], "version")?)?,
            difficulty_bits: decode_hex_array("difficulty_bits", hex_param(&params[6], "difficulty_bits")?)?,
            timestamp: decode_hex_array("timestamp", hex_param(&params[7], "timestamp")?)?,
            clean_jobs: params.get(8).and_then(Value::as_bool).unwrap_or(false),
        })
    }

    pub fn header_version(&self) -> [u8; 4] {
        reverse_array(&self.version)
    }

    pub fn header_previous_block_hash(&self) -> [u8; 32] {
        self.previous_block_hash
    }

    pub fn header_difficulty_bits(&self) -> [u8; 4] {
        reverse_array(&self.difficulty_bits)
    }

    pub fn header_timestamp(&self) -> [u8; 4] {
        reverse_array(&self.timestamp)
    }

    /// Network difficulty encoded by the job's bits.
    pub fn network_difficulty(&self) -> f64 {
        bits_to_difficulty(u32::from_be_bytes(self.difficulty_bits))
    }
}

/// Share target: a 256-bit big-endian bound on acceptable header hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareTarget([u8; 32]);

impl ShareTarget {
    pub fn new(bytes: [u8; 32]) -> Self {
        ShareTarget(bytes)
    }

    /// Decode a hex target; it must be exactly 32 bytes.
    pub fn from_hex(value: &str) -> Result<Self> {
        decode_hex_array("share_target", value).map(ShareTarget)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn difficulty(&self) -> f64 {
        target_to_difficulty(&self.0)
    }
}

/// A job together with the share target it is to be solved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Work {
    pub job: JobDescription,
    pub share_target: ShareTarget,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetWorkResult {
    method: String,
    params: Vec<Value>,
    share_difficulty: String,
}

impl Work {
    /// Decode a get-work result:
    /// `{ "method": "mining.notify", "params": [...], "shareDifficulty": hex }`.
    pub fn from_get_work_result(result: &Value) -> Result<Self> {
        let raw = GetWorkResult::deserialize(result)?;
        if raw.method != NOTIFY_METHOD {
            return Err(SolverError::MalformedJob(format!(
                "expected {}, got {}",
                NOTIFY_METHOD, raw.method
            )));
        }

        Ok(Work {
            job: JobDescription::from_notify_params(&raw.params)?,
            share_target: ShareTarget::from_hex(&raw.share_difficulty)?,
        })
    }
}

/// Parameters for submitting a solved share.
///
/// Serializes as the five-element array
/// `[workerName, jobId, extraNonce2, ntime, nonce]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub subscription_id: String,
    pub job_id: String,
    pub extra_nonce2: String,
    pub block_timestamp: String,
    pub block_nonce: String,
}

impl SubmissionResult {
    pub fn to_params(&self) -> [&str; 5] {
        [
            &self.subscription_id,
            &self.job_id,
            &self.extra_nonce2,
            &self.block_timestamp,
            &self.block_nonce,
        ]
    }
}

impl Serialize for SubmissionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.to_params())
    }
}

fn hex_param<'a>(value: &'a Value, field: &'static str) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| SolverError::MalformedJob(format!("{} must be a hex string", field)))
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
