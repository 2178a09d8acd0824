//! Container record handling with iterator-based traversal.
//!
//! # Performance
//!
//! - Lazy evaluation: Children parsed on-demand
//! - Zero-copy: Borrows from parent data
//!
//! Iteration is strict: the first child that does not fit inside the parent
//! yields an error and ends the iteration.

use super::record::{EscherError, EscherRecord, HEADER_LEN, Result};
use super::types::EscherRecordType;

/// Iterator over child records in an Escher container.
pub struct EscherChildIterator<'data> {
    data: &'data [u8],
    offset: usize,
    /// Absolute offset of `data` inside the buffer the parent was parsed from
    base: usize,
    /// Parent header, used to describe overruns
    parent: Option<(u16, usize, u32)>,
    done: bool,
}

impl<'data> EscherChildIterator<'data> {
    /// Create an iterator over a run of sibling records.
    #[inline]
    pub fn new(data: &'data [u8]) -> Self {
        Self {
            data,
            offset: 0,
            base: 0,
            parent: None,
            done: false,
        }
    }

    /// Create an iterator over the children of `container`.
    #[inline]
    pub fn for_container(container: &EscherRecord<'data>) -> Self {
        Self {
            data: container.data,
            offset: 0,
            base: container.offset + HEADER_LEN,
            parent: Some((container.record_type_raw, container.offset, container.length)),
            done: false,
        }
    }
}

impl<'data> Iterator for EscherChildIterator<'data> {
    type Item = Result<EscherRecord<'data>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.data.len() {
            return None;
        }

        match EscherRecord::parse(self.data, self.offset) {
            Ok((mut record, consumed)) => {
                record.offset += self.base;
                self.offset += consumed;
                Some(Ok(record))
            },
            Err(err) => {
                self.done = true;
                let err = match (self.parent, err) {
                    (Some((record_type, offset, declared)), EscherError::Truncated { .. }) => {
                        EscherError::LengthMismatch {
                            record_type,
                            offset,
                            declared,
                            child_offset: self.base + self.offset,
                        }
                    },
                    (None, EscherError::Truncated { needed, available, .. }) => {
                        EscherError::Truncated {
                            offset: self.base + self.offset,
                            needed,
                            available,
                        }
                    },
                    (_, other) => other,
                };
                Some(Err(err))
            },
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.data.len().saturating_sub(self.offset);
        (0, Some(remaining / HEADER_LEN))
    }
}

/// Escher container wrapper for convenient child access.
#[derive(Debug, Clone)]
pub struct EscherContainer<'data> {
    record: EscherRecord<'data>,
}

impl<'data> EscherContainer<'data> {
    /// Wrap an Escher record as a container.
    ///
    /// # Panics
    ///
    /// Panics if the record is not a container.
    #[inline]
    pub fn new(record: EscherRecord<'data>) -> Self {
        assert!(
            record.is_container(),
            "record 0x{:04X} is not a container",
            record.record_type_raw
        );
        Self { record }
    }

    /// Get the wrapped record.
    #[inline]
    pub fn record(&self) -> &EscherRecord<'data> {
        &self.record
    }

    /// Iterate over child records.
    #[inline]
    pub fn children(&self) -> EscherChildIterator<'data> {
        EscherChildIterator::for_container(&self.record)
    }

    /// Find the first child of a specific type.
    ///
    /// Malformed children before the match are reported as errors.
    pub fn find_child(&self, record_type: EscherRecordType) -> Result<Option<EscherRecord<'data>>> {
        for child in self.children() {
            let child = child?;
            if child.record_type == record_type {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_iterator() {
        let data = vec![
            0x02, 0x00, 0x0A, 0xF0, 0x04, 0x00, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04, 0x03, 0x00,
            0x0B, 0xF0, 0x02, 0x00, 0x00, 0x00, 0x05, 0x06,
        ];

        let records: Vec<_> = EscherChildIterator::new(&data)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record_type, EscherRecordType::Sp);
        assert_eq!(records[1].record_type, EscherRecordType::Opt);
        assert_eq!(records[1].offset, 12);
    }

    #[test]
    fn test_child_overrunning_container() {
        // SpContainer of 12 bytes whose only child claims 8 bytes of payload.
        let data = vec![
            0x0F, 0x00, 0x04, 0xF0, 0x0C, 0x00, 0x00, 0x00, // container, len 12
            0x00, 0x00, 0x11, 0xF0, 0x08, 0x00, 0x00, 0x00, // ClientData, len 8
            0xAA, 0xBB, 0xCC, 0xDD,
        ];

        let (record, _) = EscherRecord::parse(&data, 0).unwrap();
        let container = EscherContainer::new(record);
        let err = container.children().next().unwrap().unwrap_err();

        assert_eq!(
            err,
            EscherError::LengthMismatch {
                record_type: 0xF004,
                offset: 0,
                declared: 12,
                child_offset: 8,
            }
        );
        assert!(container.find_child(EscherRecordType::ClientData).is_err());
    }
}
