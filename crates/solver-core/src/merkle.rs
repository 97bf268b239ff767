//! Merkle root from a coinbase transaction and a stratum merkle branch.

use crate::bytes::reverse_array;
use crate::hash::PowHasher;

/// Compute the merkle root for a block header.
///
/// The coinbase hash is folded left with each branch hash in job order:
/// `root = H2(root || branch)`. This is not a general tree rebuild; the job
/// supplies exactly the siblings on the coinbase's path.
///
/// The result is in header byte order (the natural output order of the hash
/// primitive), so with no branches it equals the byte-reversed
/// transaction hash of the coinbase.
pub fn compute_merkle_root<H: PowHasher + ?Sized>(
    hasher: &H,
    coinbase_tx: &[u8],
    branches: &[[u8; 32]],
) -> [u8; 32] {
    let mut root = reverse_array(&hasher.hash_transaction(coinbase_tx));

    let mut combined = [0u8; 64];
    for branch in branches {
        combined[..32].copy_from_slice(&root);
        combined[32..].copy_from_slice(branch);
        root = hasher.double_hash(&combined);
    }

    root
}
