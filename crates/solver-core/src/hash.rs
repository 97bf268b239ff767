//! SHA256 double-hashing behind a pluggable hash primitive.

use sha2::{Digest, Sha256};

use crate::bytes::reverse_array;

/// A 256-bit hash primitive.
///
/// Only `hash` is required; the double-hash and the byte-reversed transaction
/// and header hashes are derived from it.
pub trait PowHasher: Send + Sync {
    /// Single application of the primitive.
    fn hash(&self, data: &[u8]) -> [u8; 32];

    /// `hash(hash(data))`, in the primitive's natural output order.
    #[inline]
    fn double_hash(&self, data: &[u8]) -> [u8; 32] {
        let first = self.hash(data);
        self.hash(&first)
    }

    /// Transaction hash in big-endian (display) order.
    #[inline]
    fn hash_transaction(&self, tx: &[u8]) -> [u8; 32] {
        reverse_array(&self.double_hash(tx))
    }

    /// Block header hash in big-endian order, ready to compare against a target.
    #[inline]
    fn hash_block_header(&self, header: &[u8]) -> [u8; 32] {
        reverse_array(&self.double_hash(header))
    }
}

/// Bitcoin's SHA256 primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl PowHasher for Sha256Hasher {
    #[inline]
    fn hash(&self, data: &[u8]) -> [u8; 32] {
        sha256(data)
    }
}

/// Single SHA256 hash.
#[inline]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let hash = Sha256::digest(data);
    let mut result = [0u8; 32];
    result.copy_from_slice(&hash);
    result
}

/// Bitcoin's double SHA256: SHA256(SHA256(data)).
#[inline]
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    Sha256Hasher.double_hash(data)
}

/// SHA256d transaction hash, byte-reversed.
pub fn hash_transaction(tx: &[u8]) -> [u8; 32] {
    Sha256Hasher.hash_transaction(tx)
}

/// SHA256d block header hash, byte-reversed.
pub fn hash_block_header(header: &[u8]) -> [u8; 32] {
    Sha256Hasher.hash_block_header(header)
}

/// Hex of a big-endian hash.
pub fn hash_to_hex(hash: &[u8; 32]) -> String {
    hex::encode(hash)
}

/// Count leading zero bits of a big-endian hash.
pub fn count_leading_zero_bits(hash: &[u8; 32]) -> u32 {
    let mut zeros = 0u32;
    for byte in hash.iter() {
        if *byte == 0 {
            zeros += 8;
        } else {
            zeros += byte.leading_zeros();
            break;
        }
    }
    zeros
}
