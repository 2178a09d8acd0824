//! OBJ record (0x005D) sub-record handling
//!
//! An OBJ payload is a list of `ft u16, cb u16, data` sub-records. The first one
//! is always `ftCmo` (common object data) and the list ends with `ftEnd`. Only
//! `ftCmo` is interpreted here; everything after it is carried through as-is.

use crate::common::binary::{read_u16_le, write_u16_le};
use crate::ole::xls::error::{XlsError, XlsResult};
use crate::ole::xls::records::record_type;

/// `ftCmo` sub-record id
const FT_CMO: u16 = 0x0015;
/// `ftEnd` sub-record id
const FT_END: u16 = 0x0000;
/// Size of the `ftCmo` body
const CMO_LEN: u16 = 0x0012;

/// Object type of a form push-button.
pub const OBJECT_TYPE_BUTTON: u16 = 0x0007;

/// Locked, printable, automatic fill and line.
const BUTTON_CMO_FLAGS: u16 = 0x6011;

/// Borrowed view over an OBJ payload.
#[derive(Debug, Clone, Copy)]
pub struct ObjRecord<'a> {
    data: &'a [u8],
}

impl<'a> ObjRecord<'a> {
    /// Wrap an OBJ payload, checking it starts with a complete `ftCmo`.
    pub fn parse(data: &'a [u8]) -> XlsResult<Self> {
        let ft = read_u16_le(data, 0)?;
        if ft != FT_CMO {
            return Err(XlsError::InvalidRecord {
                record_type: record_type::OBJ,
                message: format!("first sub-record is 0x{:04X}, expected ftCmo", ft),
            });
        }
        let cb = read_u16_le(data, 2)? as usize;
        if cb < 6 || data.len() < 4 + cb {
            return Err(XlsError::InvalidLength {
                expected: 4 + cb.max(6),
                found: data.len(),
            });
        }
        Ok(Self { data })
    }

    #[inline]
    pub fn object_type(&self) -> u16 {
        read_u16_le(self.data, 4).unwrap_or_default()
    }

    #[inline]
    pub fn object_id(&self) -> u16 {
        read_u16_le(self.data, 6).unwrap_or_default()
    }

    #[inline]
    pub fn is_button(&self) -> bool {
        self.object_type() == OBJECT_TYPE_BUTTON
    }

    /// Copy of the payload with the `ftCmo` object id replaced. Sub-records
    /// after `ftCmo` (macros, pictures) are kept.
    pub fn with_object_id(&self, object_id: u16) -> XlsResult<Vec<u8>> {
        let mut data = self.data.to_vec();
        write_u16_le(&mut data, 6, object_id)?;
        Ok(data)
    }
}

/// Build the OBJ payload of a new push-button: `ftCmo` followed by `ftEnd`.
pub fn build_button_obj(object_id: u16) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + CMO_LEN as usize + 4);
    data.extend_from_slice(&FT_CMO.to_le_bytes());
    data.extend_from_slice(&CMO_LEN.to_le_bytes());
    data.extend_from_slice(&OBJECT_TYPE_BUTTON.to_le_bytes());
    data.extend_from_slice(&object_id.to_le_bytes());
    data.extend_from_slice(&BUTTON_CMO_FLAGS.to_le_bytes());
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(&FT_END.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes());
    data
}
