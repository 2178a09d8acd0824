//! Binary data parsing utilities shared across record layers.
//!
//! All multi-byte values in BIFF and OfficeArt records are little-endian.

use thiserror::Error;
use zerocopy::{FromBytes, LE, U16, U32};

/// Binary parsing error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BinaryError {
    /// Not enough data to read the requested type
    #[error("Insufficient data: expected {expected}, got {available}")]
    InsufficientData { expected: usize, available: usize },
}

/// Result type for binary operations
pub type BinaryResult<T> = Result<T, BinaryError>;

#[inline]
fn slice_at(data: &[u8], offset: usize, len: usize) -> BinaryResult<&[u8]> {
    let end = offset.checked_add(len).unwrap_or(usize::MAX);
    data.get(offset..end).ok_or(BinaryError::InsufficientData {
        expected: end,
        available: data.len(),
    })
}

/// Read a little-endian u16 from a byte slice at the given offset.
///
/// # Examples
///
/// ```
/// use biff_drawing::common::binary::read_u16_le;
/// let data = [0x34, 0x12, 0x78, 0x56];
/// assert_eq!(read_u16_le(&data, 0).unwrap(), 0x1234);
/// assert_eq!(read_u16_le(&data, 2).unwrap(), 0x5678);
/// assert!(read_u16_le(&data, 3).is_err());
/// ```
#[inline]
pub fn read_u16_le(data: &[u8], offset: usize) -> BinaryResult<u16> {
    let bytes = slice_at(data, offset, 2)?;
    Ok(U16::<LE>::read_from_bytes(bytes)
        .map(|v| v.get())
        .unwrap_or_default())
}

/// Read a little-endian u32 from a byte slice at the given offset.
///
/// # Examples
///
/// ```
/// use biff_drawing::common::binary::read_u32_le;
/// let data = [0x78, 0x56, 0x34, 0x12];
/// assert_eq!(read_u32_le(&data, 0).unwrap(), 0x12345678);
/// ```
#[inline]
pub fn read_u32_le(data: &[u8], offset: usize) -> BinaryResult<u32> {
    let bytes = slice_at(data, offset, 4)?;
    Ok(U32::<LE>::read_from_bytes(bytes)
        .map(|v| v.get())
        .unwrap_or_default())
}

/// Overwrite a little-endian u16 in place.
#[inline]
pub fn write_u16_le(data: &mut [u8], offset: usize, value: u16) -> BinaryResult<()> {
    let available = data.len();
    let target = data
        .get_mut(offset..offset + 2)
        .ok_or(BinaryError::InsufficientData {
            expected: offset + 2,
            available,
        })?;
    target.copy_from_slice(&value.to_le_bytes());
    Ok(())
}

/// Overwrite a little-endian u32 in place.
#[inline]
pub fn write_u32_le(data: &mut [u8], offset: usize, value: u32) -> BinaryResult<()> {
    let available = data.len();
    let target = data
        .get_mut(offset..offset + 4)
        .ok_or(BinaryError::InsufficientData {
            expected: offset + 4,
            available,
        })?;
    target.copy_from_slice(&value.to_le_bytes());
    Ok(())
}
