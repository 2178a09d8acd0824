//! Escher record writing utilities.
//!
//! Provides helpers for writing Escher record headers and for building the
//! atoms a worksheet shape container is made of. Based on MS-ODRAW.

use super::tree::EscherNode;
use super::types::EscherRecordType;
use bitflags::bitflags;
use std::io::{self, Write};
use zerocopy::IntoBytes;
use zerocopy::byteorder::{LittleEndian, U16, U32};
use zerocopy_derive::*;

// =============================================================================
// Shape Flags (MS-ODRAW 2.2.40)
// =============================================================================

bitflags! {
    /// Shape flags for EscherSpRecord (MS-ODRAW 2.2.40)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ShapeFlags: u32 {
        /// Shape is a group
        const GROUP = 0x0001;
        /// Shape is a child of a group
        const CHILD = 0x0002;
        /// Shape is the topmost group (patriarch)
        const PATRIARCH = 0x0004;
        /// Shape has been deleted
        const DELETED = 0x0008;
        /// Shape is an OLE object
        const OLE_SHAPE = 0x0010;
        /// Shape has a valid master
        const HAVE_MASTER = 0x0020;
        /// Shape is flipped horizontally
        const FLIP_H = 0x0040;
        /// Shape is flipped vertically
        const FLIP_V = 0x0080;
        /// Shape is a connector
        const CONNECTOR = 0x0100;
        /// Shape has an anchor
        const HAVE_ANCHOR = 0x0200;
        /// Shape is a background shape
        const BACKGROUND = 0x0400;
        /// Shape has a shape type property
        const HAVE_SPT = 0x0800;
    }
}

// =============================================================================
// Property Value Constants
// =============================================================================

pub mod prop_value {
    pub const SCHEME_COLOR: u32 = 0x0800_0000;
    /// System colour index used by Excel for form control faces
    pub const BUTTON_FACE: u32 = SCHEME_COLOR | 0x50;
    pub const LOCK_AGAINST_GROUPING: u32 = 0x0104_0104;
    pub const FIT_TEXT_TO_SHAPE: u32 = 0x0008_0008;
}

// =============================================================================
// Zerocopy Data Structures
// =============================================================================

/// Escher record header (8 bytes) - zerocopy compatible
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct EscherRecordHeader {
    pub ver_inst: U16<LittleEndian>,
    pub rec_type: U16<LittleEndian>,
    pub length: U32<LittleEndian>,
}

impl EscherRecordHeader {
    pub fn new(version: u8, instance: u16, rec_type: u16, length: u32) -> Self {
        let ver_inst = (version as u16 & 0x0F) | ((instance & 0x0FFF) << 4);
        Self {
            ver_inst: ver_inst.into(),
            rec_type: rec_type.into(),
            length: length.into(),
        }
    }
}

/// Shape record data (8 bytes)
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct EscherSpData {
    pub spid: U32<LittleEndian>,
    pub flags: U32<LittleEndian>,
}

impl EscherSpData {
    pub fn with_flags(spid: u32, flags: ShapeFlags) -> Self {
        Self {
            spid: spid.into(),
            flags: flags.bits().into(),
        }
    }
}

// =============================================================================
// Writing Functions
// =============================================================================

/// Write an Escher record header (8 bytes).
///
/// # Format
///
/// - Bytes 0-1: Version (4 bits) | Instance (12 bits)
/// - Bytes 2-3: Record Type
/// - Bytes 4-7: Record Length (32-bit)
pub fn write_record_header<W: Write>(
    writer: &mut W,
    version: u8,
    instance: u16,
    record_type: u16,
    length: u32,
) -> io::Result<()> {
    let header = EscherRecordHeader::new(version, instance, record_type, length);
    writer.write_all(header.as_bytes())?;
    Ok(())
}

/// Helper to build property records (Opt records).
pub struct PropertyBuilder {
    properties: Vec<(u16, u32)>,
    complex_data: Vec<u8>,
}

impl PropertyBuilder {
    pub fn new() -> Self {
        Self {
            properties: Vec::new(),
            complex_data: Vec::new(),
        }
    }

    /// Add a simple property.
    pub fn add_simple(mut self, property_id: u16, value: u32) -> Self {
        self.properties.push((property_id & 0x3FFF, value));
        self
    }

    /// Add a complex property.
    pub fn add_complex(mut self, property_id: u16, data: &[u8]) -> Self {
        self.properties
            .push(((property_id & 0x3FFF) | 0x8000, data.len() as u32));
        self.complex_data.extend_from_slice(data);
        self
    }

    /// Build the Opt record (version 3, instance = property count).
    pub fn build(self) -> EscherNode {
        let mut payload = Vec::with_capacity(self.properties.len() * 6 + self.complex_data.len());
        for (prop_id, value) in &self.properties {
            payload.extend_from_slice(&prop_id.to_le_bytes());
            payload.extend_from_slice(&value.to_le_bytes());
        }
        payload.extend_from_slice(&self.complex_data);

        EscherNode::atom(
            0x03,
            self.properties.len() as u16,
            EscherRecordType::Opt.into(),
            payload,
        )
    }
}

impl Default for PropertyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build an Sp record (version 2, instance = shape type).
pub fn build_sp(shape_type: u16, shape_id: u32, flags: ShapeFlags) -> EscherNode {
    let data = EscherSpData::with_flags(shape_id, flags);
    EscherNode::atom(
        0x02,
        shape_type,
        EscherRecordType::Sp.into(),
        data.as_bytes().to_vec(),
    )
}

/// Build an empty atom such as ClientData or ClientTextbox.
#[inline]
pub fn build_empty(record_type: EscherRecordType) -> EscherNode {
    EscherNode::atom(0x00, 0, record_type.into(), Vec::new())
}
