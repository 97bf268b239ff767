//! Error type shared by every solver module.

use thiserror::Error;

/// Errors raised while decoding work, assembling headers or running a search.
#[derive(Debug, Error)]
pub enum SolverError {
    /// A hex-encoded field could not be decoded.
    #[error("invalid hex in {field}: {source}")]
    InvalidHex {
        field: &'static str,
        #[source]
        source: hex::FromHexError,
    },

    /// A field decoded to the wrong number of bytes.
    #[error("{field} must be {expected} bytes, got {actual}")]
    FieldLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A field is wider than the solver accepts.
    #[error("{field} must be at most {max} bytes, got {actual}")]
    FieldTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    /// The job source returned a payload that does not have the expected shape.
    #[error("malformed job: {0}")]
    MalformedJob(String),

    /// The search was cancelled before a solution was found.
    #[error("search cancelled")]
    Cancelled,

    /// The search ran past its deadline.
    #[error("search timed out")]
    TimedOut,

    /// A worker thread panicked or hung up without reporting.
    #[error("worker thread terminated unexpectedly")]
    WorkerPanicked,

    /// The OS refused to start a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// Invalid solver configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// JSON payload could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, SolverError>;

impl SolverError {
    /// Check a decoded field against its fixed width.
    pub(crate) fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(SolverError::FieldLength {
                field,
                expected,
                actual,
            })
        }
    }
}

/// Decode a hex field, tagging failures with the field name.
pub(crate) fn decode_hex(field: &'static str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value).map_err(|source| SolverError::InvalidHex { field, source })
}

/// Decode a hex field that must be exactly `N` bytes.
pub(crate) fn decode_hex_array<const N: usize>(field: &'static str, value: &str) -> Result<[u8; N]> {
    let bytes = decode_hex(field, value)?;
    SolverError::check_len(field, N, bytes.len())?;
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex_array() {
        let bytes: [u8; 4] = decode_hex_array("version", "20000000").unwrap();
        assert_eq!(bytes, [0x20, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_decode_hex_array_wrong_length() {
        let err = decode_hex_array::<4>("version", "200000").unwrap_err();
        assert!(matches!(
            err,
            SolverError::FieldLength { field: "version", expected: 4, actual: 3 }
        ));
        assert_eq!(err.to_string(), "version must be 4 bytes, got 3");
    }

    #[test]
    fn test_decode_hex_invalid() {
        let err = decode_hex("coinbase_head", "zz").unwrap_err();
        assert!(matches!(err, SolverError::InvalidHex { field: "coinbase_head", .. }));
    }
}
