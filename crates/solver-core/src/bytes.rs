//! Orientation-agnostic byte helpers.
//!
//! Nothing here knows what a field means. `increment` always treats index 0 as
//! the most significant byte; any logical endianness is decided by the caller.

/// Concatenate byte sequences in order into a new buffer.
pub fn concatenate(parts: &[&[u8]]) -> Vec<u8> {
    let total = parts.iter().map(|p| p.len()).sum();
    let mut out = Vec::with_capacity(total);
    for part in parts {
        out.extend_from_slice(part);
    }
    out
}

/// Return a copy of `bytes` with the byte order reversed.
pub fn reverse_endian(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().rev().copied().collect()
}

/// Fixed-size variant of [`reverse_endian`].
#[inline]
pub fn reverse_array<const N: usize>(bytes: &[u8; N]) -> [u8; N] {
    let mut reversed = *bytes;
    reversed.reverse();
    reversed
}

/// Increment `bytes` in place as a big-endian counter.
///
/// Scans from the last byte toward the first: bytes at 0xFF roll over to 0x00
/// and carry, the first byte below 0xFF is bumped and the scan stops.
/// Returns `true` when every byte was 0xFF (the counter wrapped to zero).
pub fn increment(bytes: &mut [u8]) -> bool {
    for byte in bytes.iter_mut().rev() {
        if *byte < u8::MAX {
            *byte += 1;
            return false;
        }
        *byte = 0;
    }
    true
}
