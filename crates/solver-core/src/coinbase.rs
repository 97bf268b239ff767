//! Coinbase transaction assembly for pool work.
//!
//! The pool sends the coinbase split in two around an extra-nonce region. The
//! miner fills that region with the pool-assigned extra-nonce and its own
//! extra-nonce-2 counter; each new extra-nonce-2 value yields a new coinbase
//! hash and therefore a new merkle root.

use crate::bytes::{concatenate, increment};
use crate::error::{Result, SolverError};

/// Smallest extra-nonce-2 that can be split between workers: one byte for the
/// partition index and at least one to count with.
pub const MIN_PARTITION_SIZE: usize = 2;

/// Static coinbase pieces for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinbaseParts {
    /// Bytes before the extra-nonce region.
    pub head: Vec<u8>,
    /// Pool-assigned extra-nonce.
    pub extra_nonce: Vec<u8>,
    /// Bytes after the extra-nonce region.
    pub tail: Vec<u8>,
}

impl CoinbaseParts {
    pub fn new(head: Vec<u8>, extra_nonce: Vec<u8>, tail: Vec<u8>) -> Self {
        CoinbaseParts {
            head,
            extra_nonce,
            tail,
        }
    }

    /// Serialize `head || extra_nonce || extra_nonce2 || tail`.
    pub fn build(&self, extra_nonce2: &ExtraNonce2) -> Vec<u8> {
        concatenate(&[
            &self.head,
            &self.extra_nonce,
            extra_nonce2.as_bytes(),
            &self.tail,
        ])
    }
}

/// Miner-controlled extra-nonce counter.
///
/// Fixed width for its whole lifetime; the width comes from the subscription.
/// Counts big-endian over its own bytes, which is how the value is both
/// inserted into the coinbase and hex-encoded for submission.
///
/// A partitioned counter keeps its leading byte fixed and only counts over
/// the rest, so it never leaves its partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraNonce2 {
    bytes: Vec<u8>,
    /// Leading bytes that never change.
    fixed: usize,
}

impl ExtraNonce2 {
    /// A zeroed counter of `size` bytes.
    pub fn new(size: usize) -> Self {
        ExtraNonce2 {
            bytes: vec![0u8; size],
            fixed: 0,
        }
    }

    /// Counter seeded with `start`, which must be exactly `size` bytes.
    pub fn with_start(size: usize, start: &[u8]) -> Result<Self> {
        SolverError::check_len("extra_nonce2", size, start.len())?;
        Ok(ExtraNonce2 {
            bytes: start.to_vec(),
            fixed: 0,
        })
    }

    /// Counter for partition `index`.
    ///
    /// The index occupies the most significant byte and stays there; the
    /// remaining bytes count. Needs at least [`MIN_PARTITION_SIZE`] bytes so
    /// every partition has room to count.
    pub fn partition(size: usize, index: u8) -> Result<Self> {
        if size < MIN_PARTITION_SIZE {
            return Err(SolverError::Config(format!(
                "cannot partition a {}-byte extra-nonce-2",
                size
            )));
        }
        let mut counter = ExtraNonce2::new(size);
        counter.bytes[0] = index;
        counter.fixed = 1;
        Ok(counter)
    }

    /// Advance by one. Returns `true` if the counting bytes wrapped back to
    /// zero; a partitioned counter wraps to the start of its partition.
    pub fn increment(&mut self) -> bool {
        increment(&mut self.bytes[self.fixed..])
    }

    /// Partition index, if this counter was created by [`ExtraNonce2::partition`].
    pub fn partition_index(&self) -> Option<u8> {
        match self.fixed {
            0 => None,
            _ => Some(self.bytes[0]),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lowercase hex, as submitted to the pool.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_coinbase() {
        let parts = CoinbaseParts::new(vec![0x01, 0x02], vec![0xAA, 0xBB], vec![0xFE]);
        let mut en2 = ExtraNonce2::new(3);
        en2.increment();

        assert_eq!(
            parts.build(&en2),
            vec![0x01, 0x02, 0xAA, 0xBB, 0x00, 0x00, 0x01, 0xFE]
        );
    }

    #[test]
    fn test_extra_nonce2_counts_and_wraps() {
        let mut en2 = ExtraNonce2::new(1);
        for _ in 0..255 {
            assert!(!en2.increment());
        }
        assert_eq!(en2.as_bytes(), &[0xFF]);
        assert!(en2.increment());
        assert_eq!(en2.as_bytes(), &[0x00]);
    }

    #[test]
    fn test_extra_nonce2_hex() {
        let mut en2 = ExtraNonce2::new(4);
        assert_eq!(en2.to_hex(), "00000000");
        for _ in 0..0x1234 {
            en2.increment();
        }
        assert_eq!(en2.to_hex(), "00001234");
        assert_eq!(en2.len(), 4);
    }

    #[test]
    fn test_with_start_checks_width() {
        assert!(ExtraNonce2::with_start(2, &[0x00, 0x01]).is_ok());
        assert!(matches!(
            ExtraNonce2::with_start(2, &[0x01]),
            Err(SolverError::FieldLength { field: "extra_nonce2", expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_partitions_are_disjoint_prefixes() {
        let a = ExtraNonce2::partition(4, 0).unwrap();
        let b = ExtraNonce2::partition(4, 3).unwrap();

        assert_eq!(a.as_bytes(), &[0, 0, 0, 0]);
        assert_eq!(b.as_bytes(), &[3, 0, 0, 0]);
        assert_eq!(b.partition_index(), Some(3));
        assert_eq!(ExtraNonce2::new(4).partition_index(), None);
    }

    #[test]
    fn test_partition_needs_room_to_count() {
        assert!(matches!(ExtraNonce2::partition(0, 0), Err(SolverError::Config(_))));
        assert!(matches!(ExtraNonce2::partition(1, 0), Err(SolverError::Config(_))));
        assert!(ExtraNonce2::partition(2, 1).is_ok());
    }

    #[test]
    fn test_partition_wraps_within_itself() {
        let mut en2 = ExtraNonce2::partition(2, 0).unwrap();
        for _ in 0..255 {
            assert!(!en2.increment());
        }
        assert_eq!(en2.as_bytes(), &[0x00, 0xFF]);

        // Carrying into the index byte would land on partition 1
        assert!(en2.increment());
        assert_eq!(en2.as_bytes(), &[0x00, 0x00]);
        assert_eq!(en2.partition_index(), Some(0));
    }
}
