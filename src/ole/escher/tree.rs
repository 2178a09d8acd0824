//! Owned Escher record tree.
//!
//! [`EscherRecord`] borrows from the buffer it was parsed from, which is the
//! right shape for one-shot inspection but not for state that outlives the
//! buffer or gets edited. [`EscherNode`] owns its payload and children and
//! re-serializes length-first, so an unmodified tree reproduces its input
//! byte-for-byte.

use super::container::EscherChildIterator;
use super::record::{EscherRecord, Result};
use super::types::EscherRecordType;
use super::writer::write_record_header;
use std::io::{self, Write};

/// Payload of an [`EscherNode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscherBody {
    /// Opaque payload bytes
    Atom(Vec<u8>),
    /// Nested records
    Container(Vec<EscherNode>),
}

/// An owned Escher record with its decoded children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscherNode {
    /// Version (4 bits)
    pub version: u8,
    /// Instance (12 bits)
    pub instance: u16,
    /// Raw record type value, kept even for unknown tags
    pub record_type_raw: u16,
    /// Payload
    pub body: EscherBody,
}

impl EscherNode {
    /// Build an atom record.
    pub fn atom(version: u8, instance: u16, record_type: u16, payload: Vec<u8>) -> Self {
        Self {
            version,
            instance,
            record_type_raw: record_type,
            body: EscherBody::Atom(payload),
        }
    }

    /// Build a container record (version 0xF).
    pub fn container(instance: u16, record_type: u16, children: Vec<EscherNode>) -> Self {
        Self {
            version: 0x0F,
            instance,
            record_type_raw: record_type,
            body: EscherBody::Container(children),
        }
    }

    /// Decode a borrowed record and, recursively, all of its children.
    pub fn from_record(record: &EscherRecord<'_>) -> Result<Self> {
        let body = if record.is_container() {
            let children = EscherChildIterator::for_container(record)
                .map(|child| child.and_then(|child| Self::from_record(&child)))
                .collect::<Result<Vec<_>>>()?;
            EscherBody::Container(children)
        } else {
            EscherBody::Atom(record.data.to_vec())
        };

        Ok(Self {
            version: record.version,
            instance: record.instance,
            record_type_raw: record.record_type_raw,
            body,
        })
    }

    #[inline]
    pub fn record_type(&self) -> EscherRecordType {
        EscherRecordType::from(self.record_type_raw)
    }

    #[inline]
    pub fn is_container(&self) -> bool {
        matches!(self.body, EscherBody::Container(_))
    }

    /// Atom payload, `None` for containers.
    #[inline]
    pub fn payload(&self) -> Option<&[u8]> {
        match &self.body {
            EscherBody::Atom(data) => Some(data),
            EscherBody::Container(_) => None,
        }
    }

    #[inline]
    pub fn payload_mut(&mut self) -> Option<&mut Vec<u8>> {
        match &mut self.body {
            EscherBody::Atom(data) => Some(data),
            EscherBody::Container(_) => None,
        }
    }

    /// Children of a container; atoms have none.
    #[inline]
    pub fn children(&self) -> &[EscherNode] {
        match &self.body {
            EscherBody::Container(children) => children,
            EscherBody::Atom(_) => &[],
        }
    }

    #[inline]
    pub fn children_mut(&mut self) -> Option<&mut Vec<EscherNode>> {
        match &mut self.body {
            EscherBody::Container(children) => Some(children),
            EscherBody::Atom(_) => None,
        }
    }

    /// First direct child with the given type.
    pub fn find_child(&self, record_type: EscherRecordType) -> Option<&EscherNode> {
        self.children()
            .iter()
            .find(|child| child.record_type() == record_type)
    }

    pub fn find_child_mut(&mut self, record_type: EscherRecordType) -> Option<&mut EscherNode> {
        self.children_mut()?
            .iter_mut()
            .find(|child| child.record_type() == record_type)
    }

    /// Length of the payload as it will be declared in the header.
    pub fn payload_len(&self) -> usize {
        match &self.body {
            EscherBody::Atom(data) => data.len(),
            EscherBody::Container(children) => children.iter().map(Self::encoded_len).sum(),
        }
    }

    /// Total serialized size including the 8-byte header.
    #[inline]
    pub fn encoded_len(&self) -> usize {
        super::record::HEADER_LEN + self.payload_len()
    }

    /// Serialize this record and its children.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let length = u32::try_from(self.payload_len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Escher record 0x{:04X} exceeds the 32-bit length field",
                    self.record_type_raw
                ),
            )
        })?;
        write_record_header(
            writer,
            self.version,
            self.instance,
            self.record_type_raw,
            length,
        )?;

        match &self.body {
            EscherBody::Atom(data) => writer.write_all(data)?,
            EscherBody::Container(children) => {
                for child in children {
                    child.write_to(writer)?;
                }
            },
        }
        Ok(())
    }

    /// Serialize into a fresh buffer.
    ///
    /// Fails only when a payload exceeds the 32-bit length field.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut out)?;
        Ok(out)
    }
}
