//! Escher record stream parser.
//!
//! # Architecture
//!
//! - Zero-copy iteration over top-level records via [`EscherParser::records`]
//! - Owned tree decoding via [`EscherParser::decode_all`]
//! - Strict: the first malformed record aborts decoding

use super::container::{EscherChildIterator, EscherContainer};
use super::record::{EscherRecord, Result};
use super::tree::EscherNode;

/// Escher parser over a buffer of drawing data.
pub struct EscherParser<'data> {
    /// The raw Escher/Drawing data
    data: &'data [u8],
}

impl<'data> EscherParser<'data> {
    /// Create a new Escher parser from drawing data.
    #[inline]
    pub fn new(data: &'data [u8]) -> Self {
        Self { data }
    }

    /// Get the first record as a container, if it is one.
    pub fn root_container(&self) -> Option<Result<EscherContainer<'data>>> {
        if self.data.is_empty() {
            return None;
        }

        match EscherRecord::parse(self.data, 0) {
            Ok((record, _)) if record.is_container() => Some(Ok(EscherContainer::new(record))),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        }
    }

    /// Iterate over all top-level records.
    #[inline]
    pub fn records(&self) -> EscherChildIterator<'data> {
        EscherChildIterator::new(self.data)
    }

    /// Decode every top-level record into an owned tree.
    ///
    /// Serializing the returned nodes in order reproduces the input exactly.
    pub fn decode_all(&self) -> Result<Vec<EscherNode>> {
        self.records()
            .map(|record| record.and_then(|record| EscherNode::from_record(&record)))
            .collect()
    }
}
