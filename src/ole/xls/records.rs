//! BIFF record framing for worksheet substreams
//!
//! Every BIFF8 record is a 4-byte header (type + payload length) followed by at
//! most [`MAX_RECORD_DATA_LEN`] payload bytes. Drawing objects are spread over
//! several sibling records, so this module only frames records and leaves the
//! payloads to the `obj`, `txo` and `drawing` modules.

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::ole::xls::error::{XlsError, XlsResult};

/// Largest payload a single BIFF8 record may carry.
pub const MAX_RECORD_DATA_LEN: usize = 8224;

/// Record type identifiers used by sheet drawing objects
pub mod record_type {
    /// Escher drawing data
    pub const MSODRAWING: u16 = 0x00EC;
    /// Object description (sub-record list)
    pub const OBJ: u16 = 0x005D;
    /// Text object header
    pub const TXO: u16 = 0x01B6;
    /// Continuation of the preceding record
    pub const CONTINUE: u16 = 0x003C;
}

/// BIFF record header (4 bytes: type + length)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub record_type: u16,
    pub data_len: u16,
}

impl RecordHeader {
    /// Parse record header from stream
    pub fn read<R: Read>(reader: &mut R) -> XlsResult<Self> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => {
                XlsError::UnexpectedEndOfStream("truncated record header".to_string())
            },
            _ => XlsError::Io(e),
        })?;
        let record_type = u16::from_le_bytes([buf[0], buf[1]]);
        let data_len = u16::from_le_bytes([buf[2], buf[3]]);

        Ok(RecordHeader {
            record_type,
            data_len,
        })
    }
}

/// Write a BIFF record header
#[inline]
pub(crate) fn write_record_header<W: Write + ?Sized>(
    writer: &mut W,
    record_type: u16,
    data_len: u16,
) -> XlsResult<()> {
    writer.write_all(&record_type.to_le_bytes())?;
    writer.write_all(&data_len.to_le_bytes())?;
    Ok(())
}

/// Write a complete record, rejecting payloads that do not fit one record.
pub fn write_record<W: Write + ?Sized>(
    writer: &mut W,
    record_type: u16,
    data: &[u8],
) -> XlsResult<()> {
    if data.len() > MAX_RECORD_DATA_LEN {
        return Err(XlsError::InvalidLength {
            expected: MAX_RECORD_DATA_LEN,
            found: data.len(),
        });
    }
    write_record_header(writer, record_type, data.len() as u16)?;
    writer.write_all(data)?;
    Ok(())
}

/// Iterator over BIFF records in a stream
pub struct RecordIter<R> {
    reader: R,
    stream_len: u64,
    current_pos: u64,
}

impl<R: Read + Seek> RecordIter<R> {
    pub fn new(mut reader: R) -> XlsResult<Self> {
        let stream_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        Ok(RecordIter {
            reader,
            stream_len,
            current_pos: 0,
        })
    }
}

impl<R: Read + Seek> Iterator for RecordIter<R> {
    type Item = XlsResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_pos >= self.stream_len {
            return None;
        }

        match Record::read(&mut self.reader) {
            Ok(record) => {
                self.current_pos += 4 + record.header.data_len as u64;
                Some(Ok(record))
            },
            Err(e) => {
                // Nothing sensible follows a broken frame.
                self.current_pos = self.stream_len;
                Some(Err(e))
            },
        }
    }
}

/// A BIFF record with header and data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub header: RecordHeader,
    pub data: Vec<u8>,
}

impl Record {
    /// Build a record, checking the payload fits a single BIFF record.
    pub fn new(record_type: u16, data: Vec<u8>) -> XlsResult<Self> {
        let data_len = u16::try_from(data.len())
            .ok()
            .filter(|&len| len as usize <= MAX_RECORD_DATA_LEN)
            .ok_or(XlsError::InvalidLength {
                expected: MAX_RECORD_DATA_LEN,
                found: data.len(),
            })?;
        Ok(Record {
            header: RecordHeader {
                record_type,
                data_len,
            },
            data,
        })
    }

    /// Read a complete record from the stream
    pub fn read<R: Read>(reader: &mut R) -> XlsResult<Self> {
        let header = RecordHeader::read(reader)?;

        let mut data = vec![0u8; header.data_len as usize];
        reader.read_exact(&mut data).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => XlsError::UnexpectedEndOfStream(format!(
                "record 0x{:04X} declares {} bytes",
                header.record_type, header.data_len
            )),
            _ => XlsError::Io(e),
        })?;

        Ok(Record { header, data })
    }

    #[inline]
    pub fn record_type(&self) -> u16 {
        self.header.record_type
    }

    /// Write the record back out unchanged.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> XlsResult<()> {
        write_record(writer, self.header.record_type, &self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_iterate_records() {
        let mut stream = Vec::new();
        write_record(&mut stream, record_type::OBJ, &[1, 2, 3]).unwrap();
        write_record(&mut stream, record_type::CONTINUE, &[]).unwrap();

        let records: Vec<Record> = RecordIter::new(Cursor::new(stream))
            .unwrap()
            .collect::<XlsResult<_>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record_type(), record_type::OBJ);
        assert_eq!(records[0].data, vec![1, 2, 3]);
        assert_eq!(records[1].header.data_len, 0);
    }

    #[test]
    fn test_truncated_payload() {
        let stream = vec![0xEC, 0x00, 0x10, 0x00, 0x01, 0x02];
        let mut iter = RecordIter::new(Cursor::new(stream)).unwrap();
        assert!(matches!(
            iter.next(),
            Some(Err(XlsError::UnexpectedEndOfStream(_)))
        ));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_oversized_record_rejected() {
        let data = vec![0u8; MAX_RECORD_DATA_LEN + 1];
        assert!(matches!(
            Record::new(record_type::CONTINUE, data.clone()),
            Err(XlsError::InvalidLength { .. })
        ));
        assert!(write_record(&mut Vec::new(), record_type::CONTINUE, &data).is_err());
    }

    #[test]
    fn test_write_round_trip() {
        let record = Record::new(record_type::TXO, vec![0xAA; 18]).unwrap();
        let mut out = Vec::new();
        record.write_to(&mut out).unwrap();
        assert_eq!(&out[..4], &[0xB6, 0x01, 18, 0]);
        assert_eq!(Record::read(&mut Cursor::new(out)).unwrap(), record);
    }
}
