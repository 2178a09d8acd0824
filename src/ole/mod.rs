/// Code page and UTF-16 text conversion
pub mod codepage;

/// Escher (Office Drawing) record parsing and writing
pub mod escher;

/// Legacy Excel (.xls) drawing records
pub mod xls;
