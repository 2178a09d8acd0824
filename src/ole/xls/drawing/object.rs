//! Common interface of objects registered with a [`DrawingGroup`].

use std::io::Write;

use super::group::DrawingGroup;
use super::origin::Origin;
use crate::ole::escher::EscherNode;
use crate::ole::xls::error::XlsResult;

/// A drawn object on a worksheet (button, picture, comment, chart).
///
/// Accessors that need the object's parsed drawing state are fallible: the
/// first call decodes the shape container and may hit malformed input.
pub trait DrawingGroupObject {
    fn origin(&self) -> Origin;

    fn object_id(&self) -> XlsResult<u32>;
    fn shape_id(&self) -> XlsResult<u32>;
    fn blip_id(&self) -> XlsResult<u32>;

    /// Assign ids. Called by [`DrawingGroup::add`].
    fn set_object_id(&mut self, object_id: u32, blip_id: u32, shape_id: u32) -> XlsResult<()>;

    /// Index into the owning group's registry, if registered.
    fn group_index(&self) -> Option<usize>;
    fn set_group_index(&mut self, index: usize);

    /// Sequence number of the object's shape in the sheet's drawing data.
    fn drawing_number(&self) -> usize;

    /// Shape container as it would be written now.
    fn sp_container(&self) -> XlsResult<EscherNode>;

    fn image_data<'g>(&self, group: &'g DrawingGroup) -> XlsResult<Option<&'g [u8]>>;

    fn reference_count(&self) -> u32;
    fn set_reference_count(&mut self, count: u32);

    /// Whether this object's drawing record opens the sheet's drawing container.
    fn is_first(&self) -> bool;

    /// Form controls are written after the cell records of a sheet.
    fn is_form_object(&self) -> bool;

    fn write_drawing_record(&self, writer: &mut dyn Write) -> XlsResult<()>;
    fn write_additional_records(&self, writer: &mut dyn Write) -> XlsResult<()>;
    fn write_tail_records(&self, writer: &mut dyn Write) -> XlsResult<()>;
}
