//! Escher record structure with zero-copy parsing.
//!
//! # Format
//!
//! Escher records have an 8-byte header:
//! - Bytes 0-1: Version and Instance (packed)
//! - Bytes 2-3: Record Type
//! - Bytes 4-7: Record Length (32-bit)
//!
//! Unlike the lenient PowerPoint reader this parser never clamps a length to
//! the available data: a record that does not fit is malformed.

use super::types::EscherRecordType;
use zerocopy::{
    FromBytes,
    byteorder::{LittleEndian, U16, U32},
};

pub use super::error::{EscherError, Result};

/// Size of an Escher record header in bytes.
pub const HEADER_LEN: usize = 8;

/// An Escher record with zero-copy data access.
#[derive(Debug, Clone)]
pub struct EscherRecord<'data> {
    /// Record type
    pub record_type: EscherRecordType,
    /// Raw record type value
    pub record_type_raw: u16,
    /// Version (4 bits)
    pub version: u8,
    /// Instance (12 bits)
    pub instance: u16,
    /// Length of record data (excluding header)
    pub length: u32,
    /// Offset of the header within the buffer it was parsed from
    pub offset: usize,
    /// Record data (zero-copy borrow)
    pub data: &'data [u8],
}

impl<'data> EscherRecord<'data> {
    /// Parse an Escher record from binary data at the given offset.
    ///
    /// # Returns
    ///
    /// `(record, bytes_consumed)` tuple
    pub fn parse(data: &'data [u8], offset: usize) -> Result<(Self, usize)> {
        let available = data.len().saturating_sub(offset);
        if available < HEADER_LEN {
            return Err(EscherError::Truncated {
                offset,
                needed: HEADER_LEN,
                available,
            });
        }

        let header = &data[offset..offset + HEADER_LEN];

        // Bytes 0-1: Version (4 bits) | Instance (12 bits)
        let ver_inst = U16::<LittleEndian>::read_from_bytes(&header[0..2])
            .map(|v| v.get())
            .unwrap_or(0);
        let record_type_raw = U16::<LittleEndian>::read_from_bytes(&header[2..4])
            .map(|v| v.get())
            .unwrap_or(0);
        let length = U32::<LittleEndian>::read_from_bytes(&header[4..8])
            .map(|v| v.get())
            .unwrap_or(0);

        let version = (ver_inst & 0x000F) as u8;
        let instance = (ver_inst >> 4) & 0x0FFF;

        let data_start = offset + HEADER_LEN;
        let payload_available = data.len() - data_start;
        if length as usize > payload_available {
            return Err(EscherError::Truncated {
                offset,
                needed: HEADER_LEN + length as usize,
                available,
            });
        }

        let record_data = &data[data_start..data_start + length as usize];

        Ok((
            Self {
                record_type: EscherRecordType::from(record_type_raw),
                record_type_raw,
                version,
                instance,
                length,
                offset,
                data: record_data,
            },
            HEADER_LEN + length as usize,
        ))
    }

    /// Check if this is a container record (can have children).
    ///
    /// Container records have version 0xF (15).
    #[inline]
    pub fn is_container(&self) -> bool {
        self.version == 0x0F || self.record_type.is_container()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_container_record() {
        let data = vec![
            0x0F, 0x00, // version=0xF, instance=0
            0x04, 0xF0, // record type = 0xF004 (SpContainer)
            0x08, 0x00, 0x00, 0x00, // length = 8
            0x01, 0x02, 0x03, 0x04, // data
            0x05, 0x06, 0x07, 0x08,
        ];

        let (record, consumed) = EscherRecord::parse(&data, 0).unwrap();

        assert_eq!(record.version, 0x0F);
        assert_eq!(record.instance, 0);
        assert_eq!(record.record_type, EscherRecordType::SpContainer);
        assert_eq!(record.length, 8);
        assert_eq!(record.data.len(), 8);
        assert_eq!(consumed, 16);
        assert!(record.is_container());
    }

    #[test]
    fn test_parse_atom_record() {
        let data = vec![
            0x92, 0x0C, // version=2, instance=201
            0x0A, 0xF0, // record type = 0xF00A (Sp)
            0x04, 0x00, 0x00, 0x00, // length = 4
            0xAA, 0xBB, 0xCC, 0xDD, // data
        ];

        let (record, consumed) = EscherRecord::parse(&data, 0).unwrap();

        assert_eq!(record.version, 0x02);
        assert_eq!(record.instance, 201);
        assert_eq!(record.record_type, EscherRecordType::Sp);
        assert_eq!(record.data, &[0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(consumed, 12);
        assert!(!record.is_container());
    }

    #[test]
    fn test_truncated_container_is_rejected() {
        // Declares 16 bytes of children but carries 4.
        let data = vec![
            0x0F, 0x00, 0x04, 0xF0, 0x10, 0x00, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04,
        ];

        let err = EscherRecord::parse(&data, 0).unwrap_err();
        assert_eq!(
            err,
            EscherError::Truncated {
                offset: 0,
                needed: 24,
                available: 12
            }
        );
    }

    #[test]
    fn test_short_header() {
        let data = [0x0F, 0x00, 0x04];
        assert!(matches!(
            EscherRecord::parse(&data, 0),
            Err(EscherError::Truncated { needed: 8, .. })
        ));
    }
}
