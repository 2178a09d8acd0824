//! Utilities shared across formats.

pub mod binary;

pub use binary::{BinaryError, BinaryResult};
