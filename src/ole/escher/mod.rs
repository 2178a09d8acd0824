//! OfficeArt (Escher) drawing records as they appear in BIFF8 worksheets.
//!
//! Escher is the drawing layer shared by the binary Office formats. A worksheet
//! stores it inside MSODRAWING records; this module knows nothing about BIFF and
//! works on the concatenated Escher byte stream.
//!
//! # Architecture
//!
//! - **Zero-copy parsing**: [`EscherRecord`] and [`EscherContainer`] borrow from
//!   the source buffer
//! - **Owned tree**: [`EscherNode`] for state that outlives the buffer or gets
//!   edited, re-serialized length-first
//! - **Strict**: malformed lengths surface as [`EscherError`], never clamped
//!
//! # Modules
//!
//! - `types`: Escher record type definitions
//! - `record`: Zero-copy record structure
//! - `container`: Container record handling with iterators
//! - `parser`: High-level parsing interface
//! - `tree`: Owned, editable record tree
//! - `views`: Typed accessors for Sp, ClientAnchor and Opt atoms
//! - `shape_type`: Shape type codes
//! - `writer`: Escher record generation utilities

pub mod container;
pub mod error;
pub mod parser;
pub mod record;
pub mod shape_type;
pub mod tree;
pub mod types;
pub mod views;
pub mod writer;

pub use container::{EscherChildIterator, EscherContainer};
pub use error::EscherError;
pub use parser::EscherParser;
pub use record::{EscherRecord, HEADER_LEN};
pub use shape_type::ShapeType;
pub use tree::{EscherBody, EscherNode};
pub use types::EscherRecordType;
pub use views::{ClientAnchorRecord, OptProperty, OptRecord, OptValue, SpRecord};
pub use writer::{
    EscherRecordHeader, EscherSpData, PropertyBuilder, ShapeFlags, build_empty, build_sp,
    prop_value, write_record_header,
};
