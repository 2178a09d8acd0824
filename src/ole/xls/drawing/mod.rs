//! Drawing objects of a worksheet.
//!
//! Drawing state is split between a workbook-wide [`DrawingGroup`] (id
//! allocation, picture blobs) and a per-sheet [`DrawingData`] pool holding the
//! Escher bytes of every drawing record. Objects such as [`Button`] keep an
//! index into the group and a drawing number into the pool, and decode their
//! shape on first use.

mod button;
mod data;
mod group;
mod object;
mod origin;
mod reader;

pub use button::{Button, DrawingWarning};
pub use data::{DrawingData, PooledShape};
pub use group::{DrawingGroup, GroupEntry};
pub use object::DrawingGroupObject;
pub use origin::Origin;
pub use reader::{FormObjectReader, read_form_objects, write_form_objects};
