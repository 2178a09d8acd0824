//! Text codecs for BIFF string payloads.
//!
//! BIFF8 stores text either "compressed" (one byte per character, interpreted
//! through the workbook code page) or as UTF-16LE. Both directions go through
//! `encoding_rs`; nothing here stops at embedded NULs because the record lengths
//! already bound the text.

use encoding_rs::Encoding;

/// Decode code-page text.
///
/// Returns `None` when the code page is not one `encoding_rs` can map.
///
/// # Examples
///
/// ```
/// use biff_drawing::ole::codepage::decode_bytes;
///
/// assert_eq!(decode_bytes(b"Caf\xE9", 1252).as_deref(), Some("Café"));
/// assert_eq!(decode_bytes(b"Hello", 99), None);
/// ```
#[inline]
pub fn decode_bytes(bytes: &[u8], codepage: u16) -> Option<String> {
    if bytes.is_empty() {
        return Some(String::new());
    }
    let encoding = codepage_to_encoding(codepage)?;
    Some(encoding.decode_without_bom_handling(bytes).0.into_owned())
}

/// Map a Windows code page identifier (as stored in the CODEPAGE record) to an
/// `encoding_rs` encoding.
#[inline]
pub fn codepage_to_encoding(codepage: u16) -> Option<&'static Encoding> {
    match codepage {
        // BIFF writes 1200 for "UTF-16", but compressed strings are Latin-1 then
        367 | 1200 | 1252 | 32769 => Some(encoding_rs::WINDOWS_1252),
        866 => Some(encoding_rs::IBM866),
        874 => Some(encoding_rs::WINDOWS_874),
        1250 => Some(encoding_rs::WINDOWS_1250),
        1251 => Some(encoding_rs::WINDOWS_1251),
        1253 => Some(encoding_rs::WINDOWS_1253),
        1254 => Some(encoding_rs::WINDOWS_1254),
        1255 => Some(encoding_rs::WINDOWS_1255),
        1256 => Some(encoding_rs::WINDOWS_1256),
        1257 => Some(encoding_rs::WINDOWS_1257),
        1258 => Some(encoding_rs::WINDOWS_1258),

        932 => Some(encoding_rs::SHIFT_JIS),
        936 => Some(encoding_rs::GBK),
        949 => Some(encoding_rs::EUC_KR),
        950 => Some(encoding_rs::BIG5),

        10000 | 32768 => Some(encoding_rs::MACINTOSH),
        65001 => Some(encoding_rs::UTF_8),

        _ => None,
    }
}

/// Decode UTF-16LE text. A trailing odd byte is ignored and unpaired
/// surrogates become U+FFFD.
///
/// ```
/// use biff_drawing::ole::codepage::decode_utf16le;
///
/// assert_eq!(decode_utf16le(b"O\x00K\x00"), "OK");
/// ```
#[inline]
pub fn decode_utf16le(bytes: &[u8]) -> String {
    let even = bytes.len() & !1;
    encoding_rs::UTF_16LE
        .decode_without_bom_handling(&bytes[..even])
        .0
        .into_owned()
}

/// Encode text as UTF-16LE.
pub fn encode_utf16le(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

/// Number of UTF-16 code units needed for `text`.
#[inline]
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}
