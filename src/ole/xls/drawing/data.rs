//! Per-sheet pool of Escher drawing data.
//!
//! A worksheet spreads one Escher stream over many MSODRAWING records: the
//! first carries the DgContainer and group headers together with the first
//! shape, later ones carry one shape each, and text-box records carry the tail
//! of the preceding shape. The pool concatenates them in file order and hands
//! out shape containers by drawing number.

use std::ops::Range;

use once_cell::unsync::OnceCell;

use crate::ole::escher::{EscherChildIterator, EscherNode, EscherRecord, EscherRecordType};
use crate::ole::xls::error::{XlsError, XlsResult};

/// A shape container located in the pool.
#[derive(Debug, Clone)]
pub struct PooledShape {
    /// Absolute offset of the SpContainer header
    pub offset: usize,
    /// Absolute offsets of the enclosing container headers, outermost first
    pub ancestors: Vec<usize>,
    pub node: EscherNode,
}

impl PooledShape {
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.node.encoded_len()
    }
}

/// Drawing data shared by every drawing object of a sheet.
#[derive(Debug, Default)]
pub struct DrawingData {
    data: Vec<u8>,
    /// Pool range of each drawing record, by drawing number
    segments: Vec<Range<usize>>,
    shapes: OnceCell<Vec<PooledShape>>,
}

impl DrawingData {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the payload of a drawing's MSODRAWING record and return its
    /// drawing number.
    pub fn add_data(&mut self, bytes: &[u8]) -> usize {
        let start = self.data.len();
        self.add_raw_data(bytes);
        self.segments.push(start..self.data.len());
        self.segments.len() - 1
    }

    /// Append bytes that continue an earlier drawing, such as a text-box
    /// MSODRAWING record.
    pub fn add_raw_data(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
        self.shapes = OnceCell::new();
    }

    #[inline]
    pub fn num_drawings(&self) -> usize {
        self.segments.len()
    }

    /// The pooled bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Pool range of the drawing record that introduced `index`.
    pub fn segment(&self, index: usize) -> XlsResult<Range<usize>> {
        self.segments
            .get(index)
            .cloned()
            .ok_or(XlsError::MissingContainer { index })
    }

    /// Shape container of drawing `index`.
    pub fn sp_container(&self, index: usize) -> XlsResult<EscherNode> {
        Ok(self.shape(index)?.node.clone())
    }

    /// Shape container of drawing `index` with its pool location.
    pub fn shape(&self, index: usize) -> XlsResult<&PooledShape> {
        self.shapes()?
            .get(index)
            .ok_or(XlsError::MissingContainer { index })
    }

    fn shapes(&self) -> XlsResult<&Vec<PooledShape>> {
        self.shapes.get_or_try_init(|| {
            let shapes = locate_shapes(&self.data)?;
            if shapes.len() != self.segments.len() {
                log::warn!(
                    "drawing data holds {} shape containers for {} drawings",
                    shapes.len(),
                    self.segments.len()
                );
            }
            log::debug!("parsed {} bytes of drawing data", self.data.len());
            Ok(shapes)
        })
    }
}

fn locate_shapes(data: &[u8]) -> XlsResult<Vec<PooledShape>> {
    let mut shapes = Vec::new();

    for record in EscherChildIterator::new(data) {
        let record = record?;
        match record.record_type {
            EscherRecordType::DgContainer => {
                for child in EscherChildIterator::for_container(&record) {
                    let child = child?;
                    if child.record_type == EscherRecordType::SpgrContainer {
                        collect_group(&child, &[record.offset], &mut shapes)?;
                    }
                }
            },
            EscherRecordType::SpContainer => shapes.push(pooled(&record, Vec::new())?),
            _ => {},
        }
    }

    Ok(shapes)
}

/// Shapes of the top-level group, skipping the patriarch. A nested group
/// contributes its own group shape.
fn collect_group(
    group: &EscherRecord<'_>,
    ancestors: &[usize],
    shapes: &mut Vec<PooledShape>,
) -> XlsResult<()> {
    let mut ancestors = ancestors.to_vec();
    ancestors.push(group.offset);
    let mut seen_patriarch = false;

    for child in EscherChildIterator::for_container(group) {
        let child = child?;
        match child.record_type {
            EscherRecordType::SpContainer if !seen_patriarch => seen_patriarch = true,
            EscherRecordType::SpContainer => shapes.push(pooled(&child, ancestors.clone())?),
            EscherRecordType::SpgrContainer => {
                let mut nested = ancestors.clone();
                nested.push(child.offset);
                let first = EscherChildIterator::for_container(&child)
                    .find(|r| {
                        r.as_ref()
                            .map_or(true, |r| r.record_type == EscherRecordType::SpContainer)
                    })
                    .transpose()?;
                if let Some(first) = first {
                    shapes.push(pooled(&first, nested)?);
                }
            },
            _ => {},
        }
    }

    Ok(())
}

fn pooled(record: &EscherRecord<'_>, ancestors: Vec<usize>) -> XlsResult<PooledShape> {
    Ok(PooledShape {
        offset: record.offset,
        ancestors,
        node: EscherNode::from_record(record)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ole::escher::{EscherError, ShapeFlags, build_empty, build_sp};

    pub(crate) fn shape(shape_id: u32) -> EscherNode {
        EscherNode::container(
            0,
            EscherRecordType::SpContainer.into(),
            vec![
                build_sp(201, shape_id, ShapeFlags::HAVE_ANCHOR | ShapeFlags::HAVE_SPT),
                build_empty(EscherRecordType::ClientData),
            ],
        )
    }

    fn patriarch() -> EscherNode {
        EscherNode::container(
            0,
            EscherRecordType::SpContainer.into(),
            vec![build_sp(0, 1024, ShapeFlags::GROUP | ShapeFlags::PATRIARCH)],
        )
    }

    /// DgContainer bytes split into one segment per shape.
    fn sheet_segments(shapes: &[EscherNode]) -> Vec<Vec<u8>> {
        let mut group_children = vec![patriarch()];
        group_children.extend(shapes.iter().cloned());
        let dg = EscherNode::container(
            1,
            EscherRecordType::DgContainer.into(),
            vec![
                EscherNode::atom(0, 1, EscherRecordType::Dg.into(), vec![0; 8]),
                EscherNode::container(0, EscherRecordType::SpgrContainer.into(), group_children),
            ],
        );
        let bytes = dg.to_bytes().unwrap();
        let first_end = bytes.len() - shapes[1..].iter().map(EscherNode::encoded_len).sum::<usize>();

        let mut segments = vec![bytes[..first_end].to_vec()];
        let mut offset = first_end;
        for shape in &shapes[1..] {
            segments.push(bytes[offset..offset + shape.encoded_len()].to_vec());
            offset += shape.encoded_len();
        }
        segments
    }

    #[test]
    fn test_shapes_by_drawing_number() {
        let mut data = DrawingData::new();
        for segment in sheet_segments(&[shape(1025), shape(1026)]) {
            data.add_data(&segment);
        }

        assert_eq!(data.num_drawings(), 2);
        assert_eq!(data.sp_container(0).unwrap(), shape(1025));
        assert_eq!(data.sp_container(1).unwrap(), shape(1026));
        assert!(matches!(
            data.sp_container(2),
            Err(XlsError::MissingContainer { index: 2 })
        ));

        let first = data.shape(0).unwrap();
        assert_eq!(first.ancestors.len(), 2);
        assert_eq!(first.ancestors[0], 0);
        assert_eq!(data.segment(1).unwrap().start, first.end());
    }

    #[test]
    fn test_top_level_shapes_without_dg() {
        let mut data = DrawingData::new();
        data.add_data(&shape(7).to_bytes().unwrap());
        assert_eq!(data.sp_container(0).unwrap(), shape(7));
        assert!(data.shape(0).unwrap().ancestors.is_empty());
    }

    #[test]
    fn test_append_invalidates_parse() {
        let mut data = DrawingData::new();
        data.add_data(&shape(7).to_bytes().unwrap());
        assert!(data.sp_container(1).is_err());

        data.add_data(&shape(8).to_bytes().unwrap());
        assert_eq!(data.sp_container(1).unwrap(), shape(8));
    }

    #[test]
    fn test_truncated_pool_is_an_error() {
        let segments = sheet_segments(&[shape(1025), shape(1026)]);
        let mut data = DrawingData::new();
        data.add_data(&segments[0]);

        assert!(matches!(
            data.sp_container(0),
            Err(XlsError::Escher(EscherError::Truncated { .. }))
        ));
    }
}
