//! Malformed-input errors raised while decoding Escher records.

use thiserror::Error;

/// A record stream that cannot be decoded without guessing.
///
/// Both variants mean the input is malformed; callers abort the enclosing
/// load instead of trying to resynchronise.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscherError {
    /// The buffer ended before a header or payload was complete.
    #[error(
        "Truncated Escher record at offset {offset}: need {needed} bytes, {available} available"
    )]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A child record runs past the end of its container, so the declared child
    /// lengths cannot sum to the container length.
    #[error(
        "Escher container 0x{record_type:04X} at offset {offset} declares {declared} bytes, but child at offset {child_offset} overruns it"
    )]
    LengthMismatch {
        record_type: u16,
        offset: usize,
        declared: u32,
        child_offset: usize,
    },

    /// A fixed-layout atom payload is shorter than its structure.
    #[error("Escher record 0x{record_type:04X} payload is {found} bytes, expected at least {expected}")]
    ShortPayload {
        record_type: u16,
        expected: usize,
        found: usize,
    },
}

/// Result type for Escher decoding.
pub type Result<T> = std::result::Result<T, EscherError>;
