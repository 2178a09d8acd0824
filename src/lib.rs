//! biff-drawing - Escher drawing records and form buttons for BIFF8 workbooks
//!
//! Legacy Excel files (.xls) store the shapes of a worksheet as Office Drawing
//! ("Escher") records inside MSODRAWING records, with OBJ, TXO and CONTINUE
//! records describing each object. This crate reads and writes those records
//! and models form push-buttons on top of them.
//!
//! # Features
//!
//! - **Escher records**: strict header/container parsing with an owned record
//!   tree that re-serializes byte-for-byte
//! - **Typed views**: Sp, Opt and ClientAnchor payloads decoded in place
//! - **Form buttons**: lazy decoding, position/size/text edits, and writers
//!   that keep unchanged records byte-identical
//!
//! # Example - Reading the buttons of a sheet
//!
//! ```no_run
//! use std::fs::File;
//! use biff_drawing::ole::xls::{DrawingGroup, WorkbookSettings, read_form_objects};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sheet = File::open("sheet.bin")?;
//! let mut group = DrawingGroup::read();
//! for button in read_form_objects(sheet, &mut group, WorkbookSettings::default())? {
//!     let (column, row) = button.position()?;
//!     println!("{:?} at ({}, {})", button.text(), column, row);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Creating a button
//!
//! ```
//! use biff_drawing::ole::xls::{Button, DrawingGroup, WorkbookSettings, write_form_objects};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut group = DrawingGroup::new();
//! let mut button = Button::new(1, 2, 2.0, 1.0, "Run", WorkbookSettings::default());
//! group.add(&mut button)?;
//!
//! let mut records = Vec::new();
//! write_form_objects(&[button], &mut records)?;
//! assert!(!records.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Walking Escher records
//!
//! ```
//! use biff_drawing::ole::escher::{EscherParser, EscherRecordType, ShapeFlags, build_sp};
//!
//! let bytes = build_sp(201, 1025, ShapeFlags::HAVE_SPT).to_bytes().unwrap();
//! let parser = EscherParser::new(&bytes);
//! let record = parser.records().next().unwrap().unwrap();
//! assert_eq!(record.record_type, EscherRecordType::Sp);
//! assert_eq!(record.instance, 201);
//! ```

/// Common utilities shared across formats
pub mod common;

/// OLE2 legacy format support
///
/// Holds the Escher drawing layer shared by the legacy Office formats and the
/// BIFF8 (.xls) records that carry it.
#[cfg(feature = "ole")]
pub mod ole;
