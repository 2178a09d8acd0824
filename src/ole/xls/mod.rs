//! Legacy Excel (.xls) sheet records for drawing objects
//!
//! BIFF8 stores a sheet's drawings as MSODRAWING records interleaved with the
//! OBJ, TXO and CONTINUE records describing each object. This module frames
//! those records, decodes the OBJ and TXO payloads, and builds form buttons on
//! top of them in [`drawing`].

/// Error types for XLS parsing
mod error;

/// BIFF record framing
pub mod records;

/// OBJ record sub-records
pub mod obj;

/// TXO record and its text continuations
pub mod txo;

/// Reader/writer settings
mod settings;

/// Sheet drawing objects
pub mod drawing;

pub use drawing::{
    Button, DrawingData, DrawingGroup, DrawingGroupObject, DrawingWarning, FormObjectReader,
    Origin, read_form_objects, write_form_objects,
};
pub use error::{XlsError, XlsResult};
pub use records::{Record, RecordHeader, RecordIter};
pub use settings::WorkbookSettings;
