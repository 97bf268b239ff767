//! Target comparison and difficulty conversions.

/// Compact bits of the difficulty-1 target.
pub const DIFFICULTY_1_BITS: u32 = 0x1d00ffff;

/// Check whether a candidate hash satisfies a target.
///
/// Both values are 256-bit big-endian magnitudes. The hash is accepted when
/// `candidate_hash <= target`; an exactly equal hash counts.
#[inline]
pub fn is_satisfied(target: &[u8; 32], candidate_hash: &[u8; 32]) -> bool {
    for i in 0..32 {
        if target[i] > candidate_hash[i] {
            return true;
        }
        if candidate_hash[i] > target[i] {
            return false;
        }
    }
    true
}

/// Convert compact "bits" representation to a 256-bit target.
///
/// The bits format is: [exponent (1 byte)][mantissa (3 bytes)]
/// Target = mantissa * 256^(exponent - 3)
///
/// The result is a 32-byte big-endian representation of the target.
pub fn bits_to_target(bits: u32) -> [u8; 32] {
    let exponent = ((bits >> 24) & 0xFF) as usize;
    let mantissa = bits & 0x007FFFFF;

    let mut target = [0u8; 32];

    // Negative flag set or zero exponent: no hash can meet it
    if bits & 0x00800000 != 0 || exponent == 0 {
        return target;
    }

    if exponent <= 3 {
        let value = mantissa >> (8 * (3 - exponent));
        target[31] = (value & 0xFF) as u8;
        target[30] = ((value >> 8) & 0xFF) as u8;
        target[29] = ((value >> 16) & 0xFF) as u8;
    } else if exponent <= 32 {
        let pos = 32 - exponent;
        target[pos] = ((mantissa >> 16) & 0xFF) as u8;
        if pos + 1 < 32 { target[pos + 1] = ((mantissa >> 8) & 0xFF) as u8; }
        if pos + 2 < 32 { target[pos + 2] = (mantissa & 0xFF) as u8; }
    }

    target
}

/// Difficulty of a target relative to the difficulty-1 target.
pub fn target_to_difficulty(target: &[u8; 32]) -> f64 {
    let current = target_to_f64(target);
    if current == 0.0 {
        return f64::INFINITY;
    }
    target_to_f64(&bits_to_target(DIFFICULTY_1_BITS)) / current
}

/// Difficulty encoded by compact bits.
pub fn bits_to_difficulty(bits: u32) -> f64 {
    target_to_difficulty(&bits_to_target(bits))
}

/// Expected number of hashes before one satisfies `target`.
pub fn expected_hashes(target: &[u8; 32]) -> f64 {
    let t = target_to_f64(target);
    if t == 0.0 {
        return f64::INFINITY;
    }
    2f64.powi(256) / (t + 1.0)
}

/// Convert a 256-bit target to an approximate f64 value.
fn target_to_f64(target: &[u8; 32]) -> f64 {
    let Some(first_nonzero) = target.iter().position(|b| *b != 0) else {
        return 0.0;
    };

    // Take up to 8 bytes for precision
    let mut value: u64 = 0;
    for i in 0..8 {
        let byte = target.get(first_nonzero + i).copied().unwrap_or(0);
        value = (value << 8) | byte as u64;
    }

    let exponent = ((31 - first_nonzero) * 8) as i32 - 56;
    (value as f64) * 2f64.powi(exponent)
}

/// Format difficulty for display (e.g., "1.23T" for trillion).
pub fn format_difficulty(difficulty: f64) -> String {
    if difficulty >= 1e15 {
        format!("{:.2}P", difficulty / 1e15)
    } else if difficulty >= 1e12 {
        format!("{:.2}T", difficulty / 1e12)
    } else if difficulty >= 1e9 {
        format!("{:.2}G", difficulty / 1e9)
    } else if difficulty >= 1e6 {
        format!("{:.2}M", difficulty / 1e6)
    } else if difficulty >= 1e3 {
        format!("{:.2}K", difficulty / 1e3)
    } else {
        format!("{:.2}", difficulty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_prefix(prefix: &[u8], fill: u8) -> [u8; 32] {
        let mut bytes = [fill; 32];
        bytes[..prefix.len()].copy_from_slice(prefix);
        bytes
    }

    #[test]
    fn test_is_satisfied_first_difference_decides() {
        let target = with_prefix(&[0x00, 0x00], 0xFF);

        assert!(is_satisfied(&target, &with_prefix(&[0x00, 0x00, 0x12], 0xFF)));
        assert!(!is_satisfied(&target, &with_prefix(&[0x00, 0x01], 0x00)));
    }

    #[test]
    fn test_is_satisfied_reflexive() {
        for target in [[0u8; 32], [0xFF; 32], with_prefix(&[0x00, 0x7F], 0x33)] {
            assert!(is_satisfied(&target, &target));
        }
    }

    #[test]
    fn test_is_satisfied_monotonic_in_target() {
        let hash = with_prefix(&[0x00, 0x00, 0x40], 0x00);
        let targets = [
            with_prefix(&[0x00, 0x00, 0x40], 0x00),
            with_prefix(&[0x00, 0x00, 0x40], 0x01),
            with_prefix(&[0x00, 0x00, 0x41], 0x00),
            with_prefix(&[0x00, 0x01], 0x00),
            [0xFF; 32],
        ];

        // Targets are ascending; once satisfied, every larger target is too
        for window in targets.windows(2) {
            assert!(window[0] <= window[1]);
            if is_satisfied(&window[0], &hash) {
                assert!(is_satisfied(&window[1], &hash));
            }
        }
        assert!(is_satisfied(&targets[0], &hash));
        assert!(!is_satisfied(&with_prefix(&[0x00, 0x00, 0x3F], 0xFF), &hash));
    }

    #[test]
    fn test_bits_to_target_genesis() {
        let target = bits_to_target(0x1d00ffff);

        // Expected target starts with 00000000ffff...
        assert_eq!(&target[..6], &[0x00, 0x00, 0x00, 0x00, 0xff, 0xff]);
        for (i, byte) in target.iter().enumerate().skip(6) {
            assert_eq!(*byte, 0x00, "byte {} should be 0", i);
        }
    }

    #[test]
    fn test_bits_to_target_high_difficulty() {
        let target = bits_to_target(0x17034219);

        // Exponent 0x17 = 23, so the mantissa starts at byte 9
        assert!(target[..9].iter().all(|b| *b == 0));
        assert_eq!(&target[9..12], &[0x03, 0x42, 0x19]);
    }

    #[test]
    fn test_difficulty_calculation() {
        assert!((bits_to_difficulty(DIFFICULTY_1_BITS) - 1.0).abs() < 0.01);
        assert!((bits_to_difficulty(0x1c00ffff) - 256.0).abs() < 0.1);
    }

    #[test]
    fn test_expected_hashes() {
        assert!((expected_hashes(&[0xFF; 32]) - 1.0).abs() < 1e-9);

        let two_zero_bytes = with_prefix(&[0x00, 0x00], 0xFF);
        assert!((expected_hashes(&two_zero_bytes) - 65536.0).abs() < 1.0);

        assert!(expected_hashes(&[0u8; 32]).is_infinite());
    }

    #[test]
    fn test_format_difficulty() {
        assert_eq!(format_difficulty(12.5), "12.50");
        assert_eq!(format_difficulty(262_144.0), "262.14K");
        assert_eq!(format_difficulty(1.5e12), "1.50T");
    }
}
