//! Block header assembly and serialization.

use crate::error::{Result, SolverError};
use crate::hash::{PowHasher, Sha256Hasher};

/// Serialized header length.
pub const HEADER_LEN: usize = 80;
/// Offset of the merkle root inside the serialized header.
pub const MERKLE_ROOT_OFFSET: usize = 36;
/// Offset of the nonce inside the serialized header.
pub const NONCE_OFFSET: usize = 76;

/// A block header (80 bytes).
///
/// Every field is held in header byte order; converting from the job's wire
/// order is done once when the job is decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block version.
    pub version: [u8; 4],
    /// Hash of the previous block (internal byte order).
    pub prev_block_hash: [u8; 32],
    /// Merkle root of all transactions.
    pub merkle_root: [u8; 32],
    /// Block timestamp.
    pub timestamp: [u8; 4],
    /// Difficulty target in compact "bits" format.
    pub bits: [u8; 4],
    /// Nonce for proof of work.
    pub nonce: [u8; 4],
}

impl BlockHeader {
    /// Assemble a header from loosely typed byte slices.
    ///
    /// Each field must have its exact width; a short or long field is rejected
    /// with [`SolverError::FieldLength`] rather than producing a header of the
    /// wrong size.
    pub fn assemble(
        version: &[u8],
        prev_block_hash: &[u8],
        merkle_root: &[u8],
        timestamp: &[u8],
        bits: &[u8],
        nonce: &[u8],
    ) -> Result<Self> {
        Ok(BlockHeader {
            version: field("version", version)?,
            prev_block_hash: field("previous_block_hash", prev_block_hash)?,
            merkle_root: field("merkle_root", merkle_root)?,
            timestamp: field("timestamp", timestamp)?,
            bits: field("difficulty_bits", bits)?,
            nonce: field("nonce", nonce)?,
        })
    }

    /// Serialize the block header to 80 bytes.
    pub fn serialize(&self) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];

        header[0..4].copy_from_slice(&self.version);
        header[4..MERKLE_ROOT_OFFSET].copy_from_slice(&self.prev_block_hash);
        header[MERKLE_ROOT_OFFSET..68].copy_from_slice(&self.merkle_root);
        header[68..72].copy_from_slice(&self.timestamp);
        header[72..NONCE_OFFSET].copy_from_slice(&self.bits);
        header[NONCE_OFFSET..HEADER_LEN].copy_from_slice(&self.nonce);

        header
    }

    /// Serialize the header without the nonce (76 bytes).
    pub fn serialize_without_nonce(&self) -> [u8; NONCE_OFFSET] {
        let mut header = [0u8; NONCE_OFFSET];
        header.copy_from_slice(&self.serialize()[..NONCE_OFFSET]);
        header
    }

    /// Big-endian header hash under `hasher`.
    pub fn hash_with<H: PowHasher + ?Sized>(&self, hasher: &H) -> [u8; 32] {
        hasher.hash_block_header(&self.serialize())
    }

    /// Big-endian SHA256d header hash.
    pub fn hash(&self) -> [u8; 32] {
        self.hash_with(&Sha256Hasher)
    }
}

/// Overwrite the nonce of a serialized header.
#[inline]
pub fn write_nonce(header: &mut [u8; HEADER_LEN], nonce: &[u8; 4]) {
    header[NONCE_OFFSET..].copy_from_slice(nonce);
}

/// Overwrite the merkle root of a serialized header.
#[inline]
pub fn write_merkle_root(header: &mut [u8; HEADER_LEN], merkle_root: &[u8; 32]) {
    header[MERKLE_ROOT_OFFSET..MERKLE_ROOT_OFFSET + 32].copy_from_slice(merkle_root);
}

fn field<const N: usize>(name: &'static str, bytes: &[u8]) -> Result<[u8; N]> {
    <[u8; N]>::try_from(bytes).map_err(|_| SolverError::FieldLength {
        field: name,
        expected: N,
        actual: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genesis() -> BlockHeader {
        let merkle_root =
            hex::decode("3ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a").unwrap();
        BlockHeader::assemble(
            &[0x01, 0x00, 0x00, 0x00],
            &[0u8; 32],
            &merkle_root,
            &[0x29, 0xab, 0x5f, 0x49],
            &[0xff, 0xff, 0x00, 0x1d],
            &[0x1d, 0xac, 0x2b, 0x7c],
        )
        .unwrap()
    }

    #[test]
    fn test_block_header_serialization() {
        let header = BlockHeader::assemble(
            &[0x00, 0x00, 0x00, 0x20],
            &[0x12u8; 32],
            &[0x34u8; 32],
            &[0x00, 0xf1, 0x53, 0x65],
            &[0x19, 0x42, 0x03, 0x17],
            &[0xEF, 0xBE, 0xAD, 0xDE],
        )
        .unwrap();

        let serialized = header.serialize();

        assert_eq!(serialized.len(), HEADER_LEN);
        assert_eq!(&serialized[0..4], &[0x00, 0x00, 0x00, 0x20]);
        assert_eq!(&serialized[4..36], &[0x12u8; 32][..]);
        assert_eq!(&serialized[36..68], &[0x34u8; 32][..]);
        assert_eq!(&serialized[68..72], &[0x00, 0xf1, 0x53, 0x65]);
        assert_eq!(&serialized[72..76], &[0x19, 0x42, 0x03, 0x17]);
        assert_eq!(&serialized[76..80], &[0xEF, 0xBE, 0xAD, 0xDE]);

        assert_eq!(&header.serialize_without_nonce()[..], &serialized[..76]);
    }

    #[test]
    fn test_short_version_is_rejected() {
        let err = BlockHeader::assemble(
            &[0x00, 0x00, 0x20],
            &[0u8; 32],
            &[0u8; 32],
            &[0u8; 4],
            &[0u8; 4],
            &[0u8; 4],
        )
        .unwrap_err();

        assert!(matches!(
            err,
            SolverError::FieldLength { field: "version", expected: 4, actual: 3 }
        ));
    }

    #[test]
    fn test_long_merkle_root_is_rejected() {
        let err = BlockHeader::assemble(
            &[0u8; 4],
            &[0u8; 32],
            &[0u8; 33],
            &[0u8; 4],
            &[0u8; 4],
            &[0u8; 4],
        )
        .unwrap_err();

        assert!(matches!(err, SolverError::FieldLength { field: "merkle_root", .. }));
    }

    #[test]
    fn test_genesis_hash() {
        assert_eq!(
            hex::encode(genesis().hash()),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
    }

    #[test]
    fn test_in_place_writers() {
        let header = genesis();
        let mut bytes = header.serialize();

        write_nonce(&mut bytes, &[1, 2, 3, 4]);
        write_merkle_root(&mut bytes, &[0xAA; 32]);

        let mut expected = header.clone();
        expected.nonce = [1, 2, 3, 4];
        expected.merkle_root = [0xAA; 32];
        assert_eq!(bytes, expected.serialize());
    }
}
