//! Error types for worksheet drawing records

use crate::common::binary::BinaryError;
use crate::ole::escher::EscherError;
use thiserror::Error;

/// Result type alias for XLS operations
pub type XlsResult<T> = Result<T, XlsError>;

/// Errors that can occur while reading or writing sheet drawing records
#[derive(Debug, Error)]
pub enum XlsError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed Escher data inside MSODRAWING records
    #[error("Malformed drawing data: {0}")]
    Escher(#[from] EscherError),

    /// Drawing data holds no shape container for a drawing number
    #[error("No shape container for drawing {index}")]
    MissingContainer { index: usize },

    /// Invalid BIFF record
    #[error("Invalid record 0x{record_type:04X}: {message}")]
    InvalidRecord { record_type: u16, message: String },

    /// Invalid data length
    #[error("Invalid length: expected {expected}, found {found}")]
    InvalidLength { expected: usize, found: usize },

    /// End of stream reached unexpectedly
    #[error("Unexpected end of stream: {0}")]
    UnexpectedEndOfStream(String),

    /// Fixed-layout read past the end of a payload
    #[error("Invalid data: {0}")]
    Binary(#[from] BinaryError),
}
