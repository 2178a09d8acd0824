/// Workbook-level settings that affect how drawing records are read and written.
///
/// # Examples
///
/// ```rust
/// use biff_drawing::ole::xls::WorkbookSettings;
///
/// // Create with defaults
/// let settings = WorkbookSettings::default();
/// assert_eq!(settings.codepage, 1252);
///
/// // Or customize
/// let settings = WorkbookSettings::new()
///     .with_codepage(1251)
///     .with_max_record_len(2048);
/// assert_eq!(settings.max_record_len, 2048);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WorkbookSettings {
    /// Windows code page used for single-byte ("compressed") text
    pub codepage: u16,
    /// Largest payload written into one CONTINUE record when splitting text
    pub max_record_len: usize,
}

impl Default for WorkbookSettings {
    fn default() -> Self {
        Self {
            codepage: 1252,
            max_record_len: crate::ole::xls::records::MAX_RECORD_DATA_LEN,
        }
    }
}

impl WorkbookSettings {
    /// Create a new `WorkbookSettings` with default values.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the code page for single-byte text, usually taken from the
    /// workbook's CODEPAGE record.
    #[inline]
    pub fn with_codepage(mut self, codepage: u16) -> Self {
        self.codepage = codepage;
        self
    }

    /// Set the largest CONTINUE payload. Values outside `5..=8224` are clamped
    /// so every chunk holds a whole UTF-16 character and fits a record.
    #[inline]
    pub fn with_max_record_len(mut self, len: usize) -> Self {
        self.max_record_len = len.clamp(
            crate::ole::xls::txo::MIN_TEXT_CHUNK_LEN,
            crate::ole::xls::records::MAX_RECORD_DATA_LEN,
        );
        self
    }
}
