//! Workbook-wide drawing registry.
//!
//! The group hands out object, shape and blip ids and keeps the picture blobs
//! referenced by blip id. It never owns drawing objects: registration returns an
//! index the object stores.

use super::object::DrawingGroupObject;
use super::origin::Origin;
use crate::ole::xls::error::XlsResult;

/// First shape id of a sheet's drawing cluster; ids above it are shapes.
const FIRST_SHAPE_ID: u32 = 1024;

/// Registry entry recorded for each drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupEntry {
    pub origin: Origin,
    pub drawing_number: usize,
}

/// Drawing group of a workbook.
#[derive(Debug)]
pub struct DrawingGroup {
    origin: Origin,
    entries: Vec<GroupEntry>,
    blips: Vec<Vec<u8>>,
    max_object_id: u32,
    max_shape_id: u32,
}

impl DrawingGroup {
    /// Group for a workbook created from scratch.
    pub fn new() -> Self {
        Self::with_origin(Origin::New)
    }

    /// Group for a workbook read from a file.
    pub fn read() -> Self {
        Self::with_origin(Origin::Read)
    }

    fn with_origin(origin: Origin) -> Self {
        Self {
            origin,
            entries: Vec::new(),
            blips: Vec::new(),
            max_object_id: 0,
            max_shape_id: FIRST_SHAPE_ID,
        }
    }

    #[inline]
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Register an object read from a file and return its registry index.
    /// Ids are left as read.
    pub fn add_drawing(&mut self, object: &dyn DrawingGroupObject) -> usize {
        self.entries.push(GroupEntry {
            origin: object.origin(),
            drawing_number: object.drawing_number(),
        });
        self.entries.len() - 1
    }

    /// Register an object and assign it fresh ids. Adding to a group that was
    /// read from a file marks the group as modified.
    pub fn add(&mut self, object: &mut dyn DrawingGroupObject) -> XlsResult<usize> {
        self.origin = self.origin.modified();

        self.max_object_id += 1;
        self.max_shape_id += 1;
        let blip_id = self.num_blips() as u32 + 1;
        object.set_object_id(self.max_object_id, blip_id, self.max_shape_id)?;

        let index = self.add_drawing(&*object);
        object.set_group_index(index);
        log::debug!(
            "registered drawing {} with object id {} and shape id {}",
            index,
            self.max_object_id,
            self.max_shape_id
        );
        Ok(index)
    }

    /// Keep later id assignments clear of ids already used in the file.
    pub fn reserve_ids(&mut self, object_id: u32, shape_id: u32) {
        self.max_object_id = self.max_object_id.max(object_id);
        self.max_shape_id = self.max_shape_id.max(shape_id);
    }

    /// Store a picture blob and return its blip id.
    pub fn add_image(&mut self, data: Vec<u8>) -> u32 {
        self.blips.push(data);
        self.blips.len() as u32
    }

    /// Picture blob for a 1-based blip id.
    pub fn image_data(&self, blip_id: u32) -> Option<&[u8]> {
        let index = (blip_id as usize).checked_sub(1)?;
        self.blips.get(index).map(Vec::as_slice)
    }

    pub fn entry(&self, index: usize) -> Option<&GroupEntry> {
        self.entries.get(index)
    }

    #[inline]
    pub fn num_drawings(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn num_blips(&self) -> usize {
        self.blips.len()
    }

    #[inline]
    pub fn max_object_id(&self) -> u32 {
        self.max_object_id
    }

    #[inline]
    pub fn max_shape_id(&self) -> u32 {
        self.max_shape_id
    }
}

impl Default for DrawingGroup {
    fn default() -> Self {
        Self::new()
    }
}
