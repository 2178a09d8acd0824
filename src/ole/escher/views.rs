//! Typed views over the Escher atoms a worksheet shape is built from.
//!
//! A view is only ever constructed for a record whose tag it understands.
//! Routing is done by the tree structure, so handing a view the wrong tag is a
//! bug in the caller and panics. Payloads that are too short for their fixed
//! layout are malformed input and come back as [`EscherError::ShortPayload`].

use super::record::{EscherError, Result};
use super::shape_type::ShapeType;
use super::tree::EscherNode;
use super::types::EscherRecordType;
use super::writer::ShapeFlags;
use crate::common::binary::{read_u16_le, read_u32_le, write_u32_le};
use zerocopy::byteorder::{LittleEndian, U16};
use zerocopy::{FromBytes, IntoBytes};
use zerocopy_derive::*;

#[track_caller]
fn expect_tag(node: &EscherNode, expected: EscherRecordType) {
    assert_eq!(
        node.record_type(),
        expected,
        "view for {:?} applied to record 0x{:04X}",
        expected,
        node.record_type_raw
    );
}

fn atom_payload(node: &EscherNode, expected: usize) -> Result<&[u8]> {
    let payload = node.payload().unwrap_or(&[]);
    if payload.len() < expected {
        return Err(EscherError::ShortPayload {
            record_type: node.record_type_raw,
            expected,
            found: payload.len(),
        });
    }
    Ok(payload)
}

// =============================================================================
// Sp
// =============================================================================

/// Shape atom (0xF00A): shape type in the instance, then `spid` and flags.
#[derive(Debug, Clone, Copy)]
pub struct SpRecord<'a> {
    node: &'a EscherNode,
}

impl<'a> SpRecord<'a> {
    pub const PAYLOAD_LEN: usize = 8;

    /// # Panics
    ///
    /// Panics if `node` is not an Sp record.
    #[track_caller]
    pub fn new(node: &'a EscherNode) -> Self {
        expect_tag(node, EscherRecordType::Sp);
        Self { node }
    }

    #[inline]
    pub fn shape_type_code(&self) -> u16 {
        self.node.instance
    }

    #[inline]
    pub fn shape_type(&self) -> ShapeType {
        ShapeType::from_code(self.node.instance)
    }

    pub fn shape_id(&self) -> Result<u32> {
        let payload = atom_payload(self.node, Self::PAYLOAD_LEN)?;
        Ok(read_u32_le(payload, 0).unwrap_or_default())
    }

    pub fn flags(&self) -> Result<ShapeFlags> {
        let payload = atom_payload(self.node, Self::PAYLOAD_LEN)?;
        Ok(ShapeFlags::from_bits_retain(
            read_u32_le(payload, 4).unwrap_or_default(),
        ))
    }

    /// Rewrite the shape id, leaving type and flags untouched.
    #[track_caller]
    pub fn set_shape_id(node: &mut EscherNode, shape_id: u32) -> Result<()> {
        expect_tag(node, EscherRecordType::Sp);
        atom_payload(node, Self::PAYLOAD_LEN)?;
        if let Some(payload) = node.payload_mut() {
            write_u32_le(payload, 0, shape_id).map_err(|_| EscherError::ShortPayload {
                record_type: EscherRecordType::Sp.into(),
                expected: Self::PAYLOAD_LEN,
                found: 0,
            })?;
        }
        Ok(())
    }
}

// =============================================================================
// ClientAnchor
// =============================================================================

/// Column offsets are stored in 1/1024ths of a cell.
const COLUMN_UNITS: f64 = 1024.0;
/// Row offsets are stored in 1/256ths of a cell.
const ROW_UNITS: f64 = 256.0;

/// Worksheet client anchor (0xF010), MS-XLS OfficeArtClientAnchorSheet.
///
/// Two corners, each a cell index plus a fractional offset into the cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct ClientAnchorRecord {
    flags: U16<LittleEndian>,
    col1: U16<LittleEndian>,
    dx1: U16<LittleEndian>,
    row1: U16<LittleEndian>,
    dy1: U16<LittleEndian>,
    col2: U16<LittleEndian>,
    dx2: U16<LittleEndian>,
    row2: U16<LittleEndian>,
    dy2: U16<LittleEndian>,
}

/// Split a cell coordinate into whole cells and a fractional offset.
fn split_coordinate(value: f64, units: f64) -> (u16, u16) {
    let value = value.clamp(0.0, u16::MAX as f64);
    let mut whole = value.trunc();
    let mut frac = ((value - whole) * units).round();
    if frac >= units {
        whole += 1.0;
        frac = 0.0;
    }
    (whole.min(u16::MAX as f64) as u16, frac as u16)
}

impl ClientAnchorRecord {
    pub const PAYLOAD_LEN: usize = 18;

    /// Build an anchor from fractional cell coordinates.
    pub fn from_coordinates(flags: u16, x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let (col1, dx1) = split_coordinate(x1, COLUMN_UNITS);
        let (row1, dy1) = split_coordinate(y1, ROW_UNITS);
        let (col2, dx2) = split_coordinate(x2, COLUMN_UNITS);
        let (row2, dy2) = split_coordinate(y2, ROW_UNITS);
        Self {
            flags: flags.into(),
            col1: col1.into(),
            dx1: dx1.into(),
            row1: row1.into(),
            dy1: dy1.into(),
            col2: col2.into(),
            dx2: dx2.into(),
            row2: row2.into(),
            dy2: dy2.into(),
        }
    }

    /// Read the anchor from a ClientAnchor record.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not a ClientAnchor record.
    #[track_caller]
    pub fn from_node(node: &EscherNode) -> Result<Self> {
        expect_tag(node, EscherRecordType::ClientAnchor);
        let payload = atom_payload(node, Self::PAYLOAD_LEN)?;
        Self::read_from_prefix(payload)
            .map(|(anchor, _)| anchor)
            .map_err(|_| EscherError::ShortPayload {
                record_type: node.record_type_raw,
                expected: Self::PAYLOAD_LEN,
                found: payload.len(),
            })
    }

    /// The 18-byte record payload.
    #[inline]
    pub fn to_payload(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    /// Encode as a ClientAnchor record.
    pub fn to_node(&self) -> EscherNode {
        EscherNode::atom(
            0x00,
            0,
            EscherRecordType::ClientAnchor.into(),
            self.to_payload(),
        )
    }

    #[inline]
    pub fn flags(&self) -> u16 {
        self.flags.get()
    }

    /// Left edge in columns.
    #[inline]
    pub fn x1(&self) -> f64 {
        self.col1.get() as f64 + self.dx1.get() as f64 / COLUMN_UNITS
    }

    /// Top edge in rows.
    #[inline]
    pub fn y1(&self) -> f64 {
        self.row1.get() as f64 + self.dy1.get() as f64 / ROW_UNITS
    }

    /// Right edge in columns.
    #[inline]
    pub fn x2(&self) -> f64 {
        self.col2.get() as f64 + self.dx2.get() as f64 / COLUMN_UNITS
    }

    /// Bottom edge in rows.
    #[inline]
    pub fn y2(&self) -> f64 {
        self.row2.get() as f64 + self.dy2.get() as f64 / ROW_UNITS
    }

    /// Move the top-left corner to a whole cell, keeping the in-cell offset.
    pub fn set_top_left_cell(&mut self, col: u16, row: u16) {
        self.col1 = col.into();
        self.row1 = row.into();
    }

    /// Place the bottom-right corner `width` columns and `height` rows away
    /// from the top-left corner.
    pub fn set_extent(&mut self, width: f64, height: f64) {
        let (col2, dx2) = split_coordinate(self.x1() + width, COLUMN_UNITS);
        let (row2, dy2) = split_coordinate(self.y1() + height, ROW_UNITS);
        self.col2 = col2.into();
        self.dx2 = dx2.into();
        self.row2 = row2.into();
        self.dy2 = dy2.into();
    }
}

// =============================================================================
// Opt
// =============================================================================

const IS_COMPLEX: u16 = 0x8000;
const IS_BLIP: u16 = 0x4000;
const PROPERTY_ID_MASK: u16 = 0x3FFF;

/// Value of a single Opt property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptValue<'a> {
    Simple(u32),
    Complex(&'a [u8]),
}

/// A property entry of an Opt record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptProperty<'a> {
    /// Property id with the flag bits stripped
    pub id: u16,
    /// Value is a blip id
    pub is_blip: bool,
    pub value: OptValue<'a>,
}

/// Shape options (0xF00B): a property table of `instance` entries followed by
/// the complex data blobs in entry order.
#[derive(Debug, Clone, Copy)]
pub struct OptRecord<'a> {
    node: &'a EscherNode,
}

impl<'a> OptRecord<'a> {
    /// # Panics
    ///
    /// Panics if `node` is not an Opt record.
    #[track_caller]
    pub fn new(node: &'a EscherNode) -> Self {
        expect_tag(node, EscherRecordType::Opt);
        Self { node }
    }

    #[inline]
    pub fn property_count(&self) -> usize {
        self.node.instance as usize
    }

    /// Decode every property entry.
    pub fn properties(&self) -> Result<Vec<OptProperty<'a>>> {
        let count = self.property_count();
        let payload = atom_payload(self.node, count * 6)?;
        let mut complex_offset = count * 6;
        let mut properties = Vec::with_capacity(count);

        for index in 0..count {
            let offset = index * 6;
            let raw_id = read_u16_le(payload, offset).unwrap_or_default();
            let value = read_u32_le(payload, offset + 2).unwrap_or_default();

            let value = if raw_id & IS_COMPLEX != 0 {
                let end = complex_offset + value as usize;
                let data = payload
                    .get(complex_offset..end)
                    .ok_or(EscherError::ShortPayload {
                        record_type: self.node.record_type_raw,
                        expected: end,
                        found: payload.len(),
                    })?;
                complex_offset = end;
                OptValue::Complex(data)
            } else {
                OptValue::Simple(value)
            };

            properties.push(OptProperty {
                id: raw_id & PROPERTY_ID_MASK,
                is_blip: raw_id & IS_BLIP != 0,
                value,
            });
        }

        Ok(properties)
    }

    /// Look up a property by id.
    pub fn get(&self, id: u16) -> Result<Option<OptProperty<'a>>> {
        Ok(self
            .properties()?
            .into_iter()
            .find(|property| property.id == id & PROPERTY_ID_MASK))
    }
}
