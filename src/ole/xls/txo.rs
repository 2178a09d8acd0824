//! TXO record (0x01B6) and the CONTINUE records that carry its text
//!
//! A text object is written as three parts: the 18-byte TXO header, one or more
//! CONTINUE records holding the characters (each starting with its own encoding
//! flag byte), and a CONTINUE record holding the formatting runs.

use crate::common::binary::{read_u16_le, write_u16_le};
use crate::ole::codepage;
use crate::ole::xls::error::{XlsError, XlsResult};
use crate::ole::xls::records::MAX_RECORD_DATA_LEN;

/// Size of the fixed TXO payload.
pub const TXO_LEN: usize = 18;
/// Size of one formatting run.
pub const RUN_LEN: usize = 8;
/// Smallest text CONTINUE payload: the flag byte and one surrogate pair.
pub const MIN_TEXT_CHUNK_LEN: usize = 5;

const OFFSET_CCH_TEXT: usize = 10;
const OFFSET_CB_RUNS: usize = 12;
const OFFSET_IFNT_EMPTY: usize = 14;

/// Centered both ways, text locked.
const BUTTON_TXO_OPTIONS: u16 = 0x0224;

/// Flag byte announcing single-byte code-page text.
const FLAG_COMPRESSED: u8 = 0x00;
/// Flag byte announcing UTF-16LE text.
const FLAG_UTF16: u8 = 0x01;

/// Borrowed view over a TXO payload.
#[derive(Debug, Clone, Copy)]
pub struct TxoRecord<'a> {
    data: &'a [u8],
}

impl<'a> TxoRecord<'a> {
    pub fn parse(data: &'a [u8]) -> XlsResult<Self> {
        if data.len() < TXO_LEN {
            return Err(XlsError::InvalidLength {
                expected: TXO_LEN,
                found: data.len(),
            });
        }
        Ok(Self { data })
    }

    #[inline]
    pub fn options(&self) -> u16 {
        read_u16_le(self.data, 0).unwrap_or_default()
    }

    #[inline]
    pub fn rotation(&self) -> u16 {
        read_u16_le(self.data, 2).unwrap_or_default()
    }

    /// Number of characters in the text continuation records.
    #[inline]
    pub fn text_len(&self) -> usize {
        read_u16_le(self.data, OFFSET_CCH_TEXT).unwrap_or_default() as usize
    }

    /// Number of bytes in the formatting-run continuation record.
    #[inline]
    pub fn runs_len(&self) -> usize {
        read_u16_le(self.data, OFFSET_CB_RUNS).unwrap_or_default() as usize
    }

    #[inline]
    pub fn empty_font_index(&self) -> u16 {
        read_u16_le(self.data, OFFSET_IFNT_EMPTY).unwrap_or_default()
    }

    /// Copy of the payload with new text and run lengths.
    pub fn with_lengths(&self, text_len: u16, runs_len: u16) -> XlsResult<Vec<u8>> {
        let mut data = self.data.to_vec();
        write_u16_le(&mut data, OFFSET_CCH_TEXT, text_len)?;
        write_u16_le(&mut data, OFFSET_CB_RUNS, runs_len)?;
        Ok(data)
    }
}

/// Build the TXO payload of a new push-button.
pub fn build_button_txo(text_len: u16, runs_len: u16) -> Vec<u8> {
    let mut data = vec![0u8; TXO_LEN];
    data[0..2].copy_from_slice(&BUTTON_TXO_OPTIONS.to_le_bytes());
    data[OFFSET_CCH_TEXT..OFFSET_CCH_TEXT + 2].copy_from_slice(&text_len.to_le_bytes());
    data[OFFSET_CB_RUNS..OFFSET_CB_RUNS + 2].copy_from_slice(&runs_len.to_le_bytes());
    data
}

// =============================================================================
// Text continuation records
// =============================================================================

/// Text decoded from continuation records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    /// Set when single-byte text used a code page `encoding_rs` cannot map and
    /// Windows-1252 was substituted.
    pub unsupported_codepage: Option<u16>,
}

/// Number of characters carried by one text chunk.
pub fn chunk_char_count(chunk: &[u8]) -> usize {
    match chunk.split_first() {
        None => 0,
        Some((&FLAG_COMPRESSED, chars)) => chars.len(),
        Some((_, chars)) => chars.len() / 2,
    }
}

/// Decode text spread over continuation chunks. Each chunk starts with its
/// own encoding flag.
pub fn decode_text<'c, I>(chunks: I, codepage: u16) -> DecodedText
where
    I: IntoIterator<Item = &'c [u8]>,
{
    let mut text = String::new();
    let mut unsupported_codepage = None;

    for chunk in chunks {
        let Some((&flag, chars)) = chunk.split_first() else {
            continue;
        };
        if flag == FLAG_COMPRESSED {
            match codepage::decode_bytes(chars, codepage) {
                Some(decoded) => text.push_str(&decoded),
                None => {
                    unsupported_codepage = Some(codepage);
                    text.push_str(&encoding_rs::WINDOWS_1252.decode_without_bom_handling(chars).0);
                },
            }
        } else {
            text.push_str(&codepage::decode_utf16le(chars));
        }
    }

    DecodedText {
        text,
        unsupported_codepage,
    }
}

/// Encode text as UTF-16 continuation payloads of at most `max_len` bytes.
///
/// `max_len` is clamped to `MIN_TEXT_CHUNK_LEN..=8224`. Surrogate pairs are
/// never split across chunks. Empty text yields no chunks.
pub fn encode_text_chunks(text: &str, max_len: usize) -> Vec<Vec<u8>> {
    let max_units = (max_len.clamp(MIN_TEXT_CHUNK_LEN, MAX_RECORD_DATA_LEN) - 1) / 2;
    let units: Vec<u16> = text.encode_utf16().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < units.len() {
        let mut end = (start + max_units).min(units.len());
        if end < units.len() && end - start > 1 && (0xD800..0xDC00).contains(&units[end - 1]) {
            end -= 1;
        }

        let mut chunk = Vec::with_capacity(1 + (end - start) * 2);
        chunk.push(FLAG_UTF16);
        for unit in &units[start..end] {
            chunk.extend_from_slice(&unit.to_le_bytes());
        }
        chunks.push(chunk);
        start = end;
    }

    chunks
}

// =============================================================================
// Formatting runs
// =============================================================================

/// One formatting run: characters from `first_char` on use `font_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormattingRun {
    pub first_char: u16,
    pub font_index: u16,
}

/// Parse the formatting-run continuation payload.
pub fn parse_runs(data: &[u8]) -> XlsResult<Vec<FormattingRun>> {
    if data.len() % RUN_LEN != 0 {
        return Err(XlsError::InvalidLength {
            expected: data.len() / RUN_LEN * RUN_LEN + RUN_LEN,
            found: data.len(),
        });
    }
    data.chunks_exact(RUN_LEN)
        .map(|run| -> XlsResult<FormattingRun> {
            Ok(FormattingRun {
                first_char: read_u16_le(run, 0)?,
                font_index: read_u16_le(run, 2)?,
            })
        })
        .collect()
}

/// Build the default runs for `text_len` characters: one run from the start,
/// plus the mandatory terminating run.
pub fn build_runs(text_len: u16) -> Vec<u8> {
    let mut data = vec![0u8; RUN_LEN * 2];
    data[RUN_LEN..RUN_LEN + 2].copy_from_slice(&text_len.to_le_bytes());
    data
}
