//! Form push-button drawing object.
//!
//! A button read from a sheet is spread over several records:
//!
//! ```text
//! MSODRAWING   SpContainer (without its trailing ClientTextbox)
//! OBJ          ftCmo (object type 7) + ftEnd
//! MSODRAWING   ClientTextbox            (optional)
//! TXO          text object header
//! CONTINUE     text, one or more
//! CONTINUE     formatting runs          (optional)
//! ```
//!
//! Nothing is decoded until a property is first asked for. An untouched button
//! writes its records back verbatim; a modified one writes patched copies so the
//! records it did not change stay byte-identical.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use once_cell::unsync::OnceCell;
use thiserror::Error;

use super::data::DrawingData;
use super::group::DrawingGroup;
use super::object::DrawingGroupObject;
use super::origin::Origin;
use crate::common::binary::{read_u16_le, read_u32_le, write_u32_le};
use crate::ole::codepage;
use crate::ole::escher::{
    ClientAnchorRecord, EscherNode, EscherRecordType, HEADER_LEN, PropertyBuilder, ShapeFlags,
    ShapeType, SpRecord, build_empty, build_sp, prop_value,
};
use crate::ole::xls::error::{XlsError, XlsResult};
use crate::ole::xls::obj::{ObjRecord, build_button_obj};
use crate::ole::xls::records::{Record, record_type, write_record};
use crate::ole::xls::settings::WorkbookSettings;
use crate::ole::xls::txo::{self, DecodedText, TxoRecord};

/// Opt property ids written for new buttons
mod prop_id {
    pub const PROTECTION_BOOLEANS: u16 = 0x007F;
    pub const TEXT_BOOLEANS: u16 = 0x00BF;
    pub const FILL_COLOR: u16 = 0x0181;
    pub const FILL_BACK_COLOR: u16 = 0x0183;
}

const NEW_ANCHOR_FLAGS: u16 = 0x0001;

/// Structure that was expected in a button's drawing records but is missing or
/// unrecognised. Defaults are substituted and loading continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawingWarning {
    #[error("shape container does not start with an Sp record")]
    MissingShapeRecord,
    #[error("unknown shape type {0}")]
    UnknownShapeType(u16),
    #[error("client anchor not found")]
    MissingAnchor,
    #[error("code page {0} is not supported; text decoded as Windows-1252")]
    UnsupportedCodepage(u16),
}

/// Position and size in cell units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Geometry {
    column: i32,
    row: i32,
    width: f64,
    height: f64,
}

impl Geometry {
    fn from_anchor(anchor: &ClientAnchorRecord) -> Self {
        Self {
            column: anchor.x1().trunc() as i32 - 1,
            row: anchor.y1().trunc() as i32 + 1,
            width: anchor.x2() - anchor.x1(),
            height: anchor.y2() - anchor.y1(),
        }
    }

    fn to_anchor(self) -> ClientAnchorRecord {
        let x1 = (self.column + 1).max(0) as f64;
        let y1 = (self.row - 1).max(0) as f64;
        ClientAnchorRecord::from_coordinates(
            NEW_ANCHOR_FLAGS,
            x1,
            y1,
            x1 + self.width,
            y1 + self.height,
        )
    }

    /// Move an existing anchor, keeping its in-cell offsets.
    fn apply_to(self, anchor: &mut ClientAnchorRecord) {
        anchor.set_top_left_cell(clamp_cell(self.column + 1), clamp_cell(self.row - 1));
        anchor.set_extent(self.width, self.height);
    }
}

#[inline]
fn clamp_cell(value: i32) -> u16 {
    value.clamp(0, u16::MAX as i32) as u16
}

#[derive(Debug, Clone)]
struct ButtonFields {
    object_id: u32,
    blip_id: u32,
    shape_id: u32,
    shape_type: ShapeType,
    geometry: Geometry,
    /// Geometry as read; zero when the container had no anchor
    read_geometry: Geometry,
    warnings: Vec<DrawingWarning>,
}

/// Records a button was read from. Shared between copies.
#[derive(Debug, Clone)]
struct SourceRecords {
    drawing: Record,
    obj: Record,
    mso: Option<Record>,
    txo: Option<Record>,
    text: Vec<Record>,
    formatting: Option<Record>,
}

/// A form push-button on a worksheet.
#[derive(Debug)]
pub struct Button {
    origin: Origin,
    settings: WorkbookSettings,
    source: Option<Rc<SourceRecords>>,
    drawing_data: Option<Rc<RefCell<DrawingData>>>,
    drawing_number: usize,
    group_index: Option<usize>,
    reference_count: u32,
    fields: OnceCell<ButtonFields>,
    text: OnceCell<DecodedText>,
    text_edited: bool,
}

impl Button {
    /// Button read from a sheet: its MSODRAWING record and the OBJ record that
    /// follows it. The drawing payload joins the sheet's drawing data and the
    /// button registers with `group`.
    pub fn from_read(
        drawing: Record,
        obj: Record,
        drawing_data: Rc<RefCell<DrawingData>>,
        group: &mut DrawingGroup,
        settings: WorkbookSettings,
    ) -> XlsResult<Self> {
        ObjRecord::parse(&obj.data)?;
        let drawing_number = drawing_data.borrow_mut().add_data(&drawing.data);

        let mut button = Self {
            origin: Origin::Read,
            settings,
            source: Some(Rc::new(SourceRecords {
                drawing,
                obj,
                mso: None,
                txo: None,
                text: Vec::new(),
                formatting: None,
            })),
            drawing_data: Some(drawing_data),
            drawing_number,
            group_index: None,
            reference_count: 1,
            fields: OnceCell::new(),
            text: OnceCell::new(),
            text_edited: false,
        };
        button.group_index = Some(group.add_drawing(&button));
        Ok(button)
    }

    /// New button covering `width` x `height` cells from (`column`, `row`).
    /// Ids are assigned when it is added to a [`DrawingGroup`].
    pub fn new(
        column: i32,
        row: i32,
        width: f64,
        height: f64,
        text: impl Into<String>,
        settings: WorkbookSettings,
    ) -> Self {
        let geometry = Geometry {
            column,
            row,
            width,
            height,
        };
        Self {
            origin: Origin::New,
            settings,
            source: None,
            drawing_data: None,
            drawing_number: 0,
            group_index: None,
            reference_count: 1,
            fields: OnceCell::from(ButtonFields {
                object_id: 0,
                blip_id: 0,
                shape_id: 0,
                shape_type: ShapeType::HostControl,
                geometry,
                read_geometry: geometry,
                warnings: Vec::new(),
            }),
            text: OnceCell::from(DecodedText {
                text: text.into(),
                unsupported_codepage: None,
            }),
            text_edited: true,
        }
    }

    /// Duplicate a button that has not been modified into `group`. The copy
    /// shares records and drawing data and decodes them afresh.
    ///
    /// # Panics
    ///
    /// Panics if the button is not in the `Read` state.
    pub fn copy_into(&self, group: &mut DrawingGroup, settings: WorkbookSettings) -> Button {
        assert_eq!(
            self.origin,
            Origin::Read,
            "only an unmodified button read from a file can be copied"
        );
        let mut copy = Button {
            origin: Origin::Read,
            settings,
            source: self.source.clone(),
            drawing_data: self.drawing_data.clone(),
            drawing_number: self.drawing_number,
            group_index: None,
            reference_count: self.reference_count,
            fields: OnceCell::new(),
            text: OnceCell::new(),
            text_edited: false,
        };
        copy.group_index = Some(group.add_drawing(&copy));
        copy
    }

    // -------------------------------------------------------------------------
    // Record assembly while reading
    // -------------------------------------------------------------------------

    fn assembling(&mut self) -> &mut SourceRecords {
        match self.source.as_mut() {
            Some(source) => Rc::make_mut(source),
            None => panic!("records can only be attached to a button read from a file"),
        }
    }

    /// Attach the MSODRAWING record carrying the button's ClientTextbox.
    pub fn add_mso(&mut self, record: Record) {
        if let Some(data) = &self.drawing_data {
            data.borrow_mut().add_raw_data(&record.data);
        }
        self.assembling().mso = Some(record);
    }

    pub fn set_text_object(&mut self, record: Record) {
        self.assembling().txo = Some(record);
    }

    /// Attach the next text CONTINUE record.
    pub fn add_text(&mut self, record: Record) {
        self.assembling().text.push(record);
    }

    pub fn set_formatting(&mut self, record: Record) {
        self.assembling().formatting = Some(record);
    }

    /// Characters announced by the attached TXO record.
    pub(crate) fn expected_text_len(&self) -> XlsResult<usize> {
        match self.source.as_deref().and_then(|s| s.txo.as_ref()) {
            Some(txo) => Ok(TxoRecord::parse(&txo.data)?.text_len()),
            None => Ok(0),
        }
    }

    /// Formatting-run bytes announced by the attached TXO record.
    pub(crate) fn expected_runs_len(&self) -> XlsResult<usize> {
        match self.source.as_deref().and_then(|s| s.txo.as_ref()) {
            Some(txo) => Ok(TxoRecord::parse(&txo.data)?.runs_len()),
            None => Ok(0),
        }
    }

    // -------------------------------------------------------------------------
    // Deferred decoding
    // -------------------------------------------------------------------------

    fn source(&self) -> XlsResult<&SourceRecords> {
        self.source.as_deref().ok_or_else(|| XlsError::InvalidRecord {
            record_type: record_type::OBJ,
            message: "button has no records read from a file".to_string(),
        })
    }

    fn drawing_data(&self) -> XlsResult<&Rc<RefCell<DrawingData>>> {
        self.drawing_data
            .as_ref()
            .ok_or(XlsError::MissingContainer {
                index: self.drawing_number,
            })
    }

    fn fields(&self) -> XlsResult<&ButtonFields> {
        self.fields.get_or_try_init(|| self.load_fields())
    }

    fn load_fields(&self) -> XlsResult<ButtonFields> {
        let container = self
            .drawing_data()?
            .borrow()
            .sp_container(self.drawing_number)?;
        let object_id = ObjRecord::parse(&self.source()?.obj.data)?.object_id() as u32;
        let mut warnings = Vec::new();

        let (shape_id, shape_type) = match container.children().first() {
            Some(node) if node.record_type() == EscherRecordType::Sp => {
                let sp = SpRecord::new(node);
                if sp.shape_type() == ShapeType::Unknown {
                    log::warn!("unknown shape type {}", sp.shape_type_code());
                    warnings.push(DrawingWarning::UnknownShapeType(sp.shape_type_code()));
                }
                (sp.shape_id()?, sp.shape_type())
            },
            _ => {
                log::warn!("drawing {} has no Sp record", self.drawing_number);
                warnings.push(DrawingWarning::MissingShapeRecord);
                (0, ShapeType::Unknown)
            },
        };

        let geometry = match container.find_child(EscherRecordType::ClientAnchor) {
            Some(node) => Geometry::from_anchor(&ClientAnchorRecord::from_node(node)?),
            None => {
                log::warn!("client anchor not found for drawing {}", self.drawing_number);
                warnings.push(DrawingWarning::MissingAnchor);
                Geometry::default()
            },
        };

        log::debug!(
            "button {} (shape {}) at column {}, row {}",
            object_id,
            shape_id,
            geometry.column,
            geometry.row
        );

        Ok(ButtonFields {
            object_id,
            blip_id: 0,
            shape_id,
            shape_type,
            geometry,
            read_geometry: geometry,
            warnings,
        })
    }

    /// Apply a mutation, initializing first. Marks a read button as modified.
    fn modify(&mut self, update: impl FnOnce(&mut ButtonFields)) -> XlsResult<()> {
        let mut fields = match self.fields.take() {
            Some(fields) => fields,
            None => self.load_fields()?,
        };
        update(&mut fields);
        self.fields = OnceCell::from(fields);
        self.origin = self.origin.modified();
        Ok(())
    }

    fn decode_text(&self) -> DecodedText {
        let chunks = self.source.as_deref().map_or(&[][..], |s| s.text.as_slice());
        let decoded = txo::decode_text(
            chunks.iter().map(|record| record.data.as_slice()),
            self.settings.codepage,
        );
        if let Some(codepage) = decoded.unsupported_codepage {
            log::warn!(
                "code page {} is not supported; button text decoded as Windows-1252",
                codepage
            );
        }
        decoded
    }

    // -------------------------------------------------------------------------
    // Properties
    // -------------------------------------------------------------------------

    #[inline]
    pub fn origin(&self) -> Origin {
        self.origin
    }

    #[inline]
    pub fn drawing_number(&self) -> usize {
        self.drawing_number
    }

    #[inline]
    pub fn group_index(&self) -> Option<usize> {
        self.group_index
    }

    pub fn object_id(&self) -> XlsResult<u32> {
        Ok(self.fields()?.object_id)
    }

    pub fn shape_id(&self) -> XlsResult<u32> {
        Ok(self.fields()?.shape_id)
    }

    pub fn blip_id(&self) -> XlsResult<u32> {
        Ok(self.fields()?.blip_id)
    }

    pub fn shape_type(&self) -> XlsResult<ShapeType> {
        Ok(self.fields()?.shape_type)
    }

    /// Problems found while decoding, in the order they were found.
    pub fn warnings(&self) -> XlsResult<Vec<DrawingWarning>> {
        let mut warnings = self.fields()?.warnings.clone();
        if let Some(codepage) = self.text.get().and_then(|t| t.unsupported_codepage) {
            warnings.push(DrawingWarning::UnsupportedCodepage(codepage));
        }
        Ok(warnings)
    }

    pub fn set_object_id(&mut self, object_id: u32, blip_id: u32, shape_id: u32) -> XlsResult<()> {
        self.modify(|fields| {
            fields.object_id = object_id;
            fields.blip_id = blip_id;
            fields.shape_id = shape_id;
        })
    }

    /// Column of the top-left corner.
    pub fn x(&self) -> XlsResult<f64> {
        Ok(self.fields()?.geometry.column as f64)
    }

    pub fn set_x(&mut self, x: f64) -> XlsResult<()> {
        self.modify(|fields| fields.geometry.column = x as i32)
    }

    /// Row of the top-left corner.
    pub fn y(&self) -> XlsResult<f64> {
        Ok(self.fields()?.geometry.row as f64)
    }

    pub fn set_y(&mut self, y: f64) -> XlsResult<()> {
        self.modify(|fields| fields.geometry.row = y as i32)
    }

    /// `(column, row)` of the top-left corner.
    pub fn position(&self) -> XlsResult<(i32, i32)> {
        let geometry = self.fields()?.geometry;
        Ok((geometry.column, geometry.row))
    }

    pub fn set_position(&mut self, column: i32, row: i32) -> XlsResult<()> {
        self.modify(|fields| {
            fields.geometry.column = column;
            fields.geometry.row = row;
        })
    }

    /// Width in columns.
    pub fn width(&self) -> XlsResult<f64> {
        Ok(self.fields()?.geometry.width)
    }

    pub fn set_width(&mut self, width: f64) -> XlsResult<()> {
        self.modify(|fields| fields.geometry.width = width)
    }

    /// Height in rows.
    pub fn height(&self) -> XlsResult<f64> {
        Ok(self.fields()?.geometry.height)
    }

    pub fn set_height(&mut self, height: f64) -> XlsResult<()> {
        self.modify(|fields| fields.geometry.height = height)
    }

    pub fn size(&self) -> XlsResult<(f64, f64)> {
        let geometry = self.fields()?.geometry;
        Ok((geometry.width, geometry.height))
    }

    pub fn set_size(&mut self, width: f64, height: f64) -> XlsResult<()> {
        self.modify(|fields| {
            fields.geometry.width = width;
            fields.geometry.height = height;
        })
    }

    /// Button caption. Empty when the button has no text records.
    pub fn text(&self) -> &str {
        &self.text.get_or_init(|| self.decode_text()).text
    }

    pub fn set_button_text(&mut self, text: impl Into<String>) -> XlsResult<()> {
        self.modify(|_| {})?;
        self.text = OnceCell::from(DecodedText {
            text: text.into(),
            unsupported_codepage: None,
        });
        self.text_edited = true;
        Ok(())
    }

    /// Picture referenced by the button's blip id.
    ///
    /// # Panics
    ///
    /// Panics for a new button, which has no picture.
    pub fn image_data<'g>(&self, group: &'g DrawingGroup) -> XlsResult<Option<&'g [u8]>> {
        assert!(
            self.origin.has_source_records(),
            "a new button has no image data"
        );
        Ok(group.image_data(self.fields()?.blip_id))
    }

    #[inline]
    pub fn reference_count(&self) -> u32 {
        self.reference_count
    }

    #[inline]
    pub fn set_reference_count(&mut self, count: u32) {
        self.reference_count = count;
    }

    /// Whether the button's drawing record opens the sheet's DgContainer.
    pub fn is_first(&self) -> bool {
        match self.origin {
            Origin::Read | Origin::ReadWrite => {
                self.source
                    .as_deref()
                    .and_then(|source| read_u16_le(&source.drawing.data, 2).ok())
                    == Some(EscherRecordType::DgContainer.into())
            },
            Origin::New => false,
        }
    }

    #[inline]
    pub fn is_form_object(&self) -> bool {
        true
    }

    /// Buttons float over the grid and are not bound to a cell.
    #[inline]
    pub fn cell_row(&self) -> u32 {
        0
    }

    #[inline]
    pub fn cell_column(&self) -> u32 {
        0
    }

    // -------------------------------------------------------------------------
    // Shape container
    // -------------------------------------------------------------------------

    /// The SpContainer as it will be written.
    pub fn sp_container(&self) -> XlsResult<EscherNode> {
        let fields = self.fields()?;
        match self.origin {
            Origin::Read => self.read_sp_container(),
            Origin::ReadWrite => patch_sp_container(self.read_sp_container()?, fields),
            Origin::New => Ok(new_sp_container(fields)),
        }
    }

    fn read_sp_container(&self) -> XlsResult<EscherNode> {
        self.drawing_data()?
            .borrow()
            .sp_container(self.drawing_number)
    }

    // -------------------------------------------------------------------------
    // Writing
    // -------------------------------------------------------------------------

    /// Write the MSODRAWING record that carries the button's shape.
    pub fn write_drawing_record<W: Write + ?Sized>(&self, writer: &mut W) -> XlsResult<()> {
        match self.origin {
            Origin::Read => self.source()?.drawing.write_to(writer),
            Origin::ReadWrite => {
                let payload = self.patched_drawing_payload()?;
                write_record(writer, record_type::MSODRAWING, &payload)
            },
            Origin::New => {
                let bytes = self.sp_container()?.to_bytes()?;
                // The closing ClientTextbox goes in its own record after the OBJ.
                let inline = bytes.len().saturating_sub(HEADER_LEN);
                write_record(writer, record_type::MSODRAWING, &bytes[..inline])
            },
        }
    }

    /// Drawing record of a modified button: the bytes that preceded the shape
    /// in the original record (with enclosing container lengths adjusted), the
    /// patched shape up to the part carried by later records, and any bytes
    /// that followed it.
    ///
    /// A shape may only change size when every enclosing container header is
    /// in its own drawing record; otherwise this fails with
    /// [`XlsError::InvalidRecord`].
    fn patched_drawing_payload(&self) -> XlsResult<Vec<u8>> {
        let fields = self.fields()?;
        let data = self.drawing_data()?.borrow();
        let segment = data.segment(self.drawing_number)?;
        let shape = data.shape(self.drawing_number)?;
        if !segment.contains(&shape.offset) {
            return Err(XlsError::InvalidRecord {
                record_type: record_type::MSODRAWING,
                message: format!(
                    "shape container at {} lies outside drawing record {:?}",
                    shape.offset, segment
                ),
            });
        }

        let patched = patch_sp_container(shape.node.clone(), fields)?.to_bytes()?;
        let delta = patched.len() as i64 - shape.node.encoded_len() as i64;
        let pool = data.data();

        let mut payload = pool[segment.start..shape.offset].to_vec();
        for &ancestor in &shape.ancestors {
            if ancestor < segment.start {
                if delta != 0 {
                    // That header was written with an earlier drawing record.
                    return Err(XlsError::InvalidRecord {
                        record_type: record_type::MSODRAWING,
                        message: format!(
                            "drawing {} would change size by {} bytes inside the container at {}, \
                             which an earlier drawing record opens",
                            self.drawing_number, delta, ancestor
                        ),
                    });
                }
                continue;
            }
            let at = ancestor - segment.start + 4;
            let length = u32::try_from(read_u32_le(&payload, at)? as i64 + delta).map_err(|_| {
                XlsError::InvalidRecord {
                    record_type: record_type::MSODRAWING,
                    message: format!("container at {} cannot hold the patched shape", ancestor),
                }
            })?;
            write_u32_le(&mut payload, at, length)?;
        }

        let tail = shape.end().saturating_sub(segment.end);
        payload.extend_from_slice(&patched[..patched.len().saturating_sub(tail)]);
        if shape.end() < segment.end {
            payload.extend_from_slice(&pool[shape.end()..segment.end]);
        }
        Ok(payload)
    }

    /// Write OBJ, the text-box MSODRAWING, TXO and its continuation records.
    pub fn write_additional_records<W: Write + ?Sized>(&self, writer: &mut W) -> XlsResult<()> {
        match self.origin {
            Origin::Read => {
                let source = self.source()?;
                source.obj.write_to(writer)?;
                if let Some(mso) = &source.mso {
                    mso.write_to(writer)?;
                }
                if let Some(txo) = &source.txo {
                    txo.write_to(writer)?;
                }
                for chunk in &source.text {
                    chunk.write_to(writer)?;
                }
                if let Some(formatting) = &source.formatting {
                    formatting.write_to(writer)?;
                }
                Ok(())
            },
            Origin::ReadWrite => {
                let source = self.source()?;
                let obj = ObjRecord::parse(&source.obj.data)?.with_object_id(self.obj_id()?)?;
                write_record(writer, record_type::OBJ, &obj)?;
                if let Some(mso) = &source.mso {
                    mso.write_to(writer)?;
                }

                match (&source.txo, self.text_edited) {
                    (Some(txo), false) => {
                        txo.write_to(writer)?;
                        for chunk in &source.text {
                            chunk.write_to(writer)?;
                        }
                        if let Some(formatting) = &source.formatting {
                            formatting.write_to(writer)?;
                        }
                        Ok(())
                    },
                    (None, false) => Ok(()),
                    (txo, true) => self.write_text_records(writer, txo.as_ref()),
                }
            },
            Origin::New => {
                write_record(writer, record_type::OBJ, &build_button_obj(self.obj_id()?))?;
                let textbox = build_empty(EscherRecordType::ClientTextbox).to_bytes()?;
                write_record(writer, record_type::MSODRAWING, &textbox)?;
                self.write_text_records(writer, None)
            },
        }
    }

    /// Buttons have nothing to write after the sheet's drawing objects.
    pub fn write_tail_records<W: Write + ?Sized>(&self, _writer: &mut W) -> XlsResult<()> {
        Ok(())
    }

    fn obj_id(&self) -> XlsResult<u16> {
        let object_id = self.fields()?.object_id;
        u16::try_from(object_id).map_err(|_| XlsError::InvalidRecord {
            record_type: record_type::OBJ,
            message: format!("object id {} does not fit the OBJ record", object_id),
        })
    }

    /// TXO with lengths for the current text, UTF-16 text chunks and the
    /// formatting runs.
    fn write_text_records<W: Write + ?Sized>(
        &self,
        writer: &mut W,
        original_txo: Option<&Record>,
    ) -> XlsResult<()> {
        let text = self.text();
        let units = codepage::utf16_len(text);
        let text_len = u16::try_from(units).map_err(|_| XlsError::InvalidLength {
            expected: u16::MAX as usize,
            found: units,
        })?;
        let runs = if text_len == 0 {
            Vec::new()
        } else {
            txo::build_runs(text_len)
        };
        let runs_len = runs.len() as u16;

        let txo_data = match original_txo {
            Some(record) => TxoRecord::parse(&record.data)?.with_lengths(text_len, runs_len)?,
            None => txo::build_button_txo(text_len, runs_len),
        };
        write_record(writer, record_type::TXO, &txo_data)?;

        for chunk in txo::encode_text_chunks(text, self.settings.max_record_len) {
            write_record(writer, record_type::CONTINUE, &chunk)?;
        }
        if !runs.is_empty() {
            write_record(writer, record_type::CONTINUE, &runs)?;
        }
        Ok(())
    }
}

/// Read container with the current shape id and, if the geometry changed, a
/// moved or inserted anchor.
fn patch_sp_container(mut container: EscherNode, fields: &ButtonFields) -> XlsResult<EscherNode> {
    let Some(children) = container.children_mut() else {
        return Ok(container);
    };

    if let Some(sp) = children
        .first_mut()
        .filter(|node| node.record_type() == EscherRecordType::Sp)
    {
        SpRecord::set_shape_id(sp, fields.shape_id)?;
    }

    if fields.geometry != fields.read_geometry {
        match children
            .iter_mut()
            .find(|node| node.record_type() == EscherRecordType::ClientAnchor)
        {
            Some(node) => {
                let mut anchor = ClientAnchorRecord::from_node(node)?;
                fields.geometry.apply_to(&mut anchor);
                if let Some(payload) = node.payload_mut() {
                    payload[..ClientAnchorRecord::PAYLOAD_LEN]
                        .copy_from_slice(&anchor.to_payload());
                }
            },
            None => {
                let position = children
                    .iter()
                    .position(|node| node.record_type() == EscherRecordType::Opt)
                    .or_else(|| {
                        children
                            .iter()
                            .position(|node| node.record_type() == EscherRecordType::Sp)
                    })
                    .map_or(0, |index| index + 1);
                children.insert(position, fields.geometry.to_anchor().to_node());
            },
        }
    }

    Ok(container)
}

fn new_sp_container(fields: &ButtonFields) -> EscherNode {
    EscherNode::container(
        0,
        EscherRecordType::SpContainer.into(),
        vec![
            build_sp(
                fields.shape_type.code().unwrap_or_default(),
                fields.shape_id,
                ShapeFlags::HAVE_ANCHOR | ShapeFlags::HAVE_SPT,
            ),
            PropertyBuilder::new()
                .add_simple(prop_id::PROTECTION_BOOLEANS, prop_value::LOCK_AGAINST_GROUPING)
                .add_simple(prop_id::TEXT_BOOLEANS, prop_value::FIT_TEXT_TO_SHAPE)
                .add_simple(prop_id::FILL_COLOR, prop_value::BUTTON_FACE)
                .add_simple(prop_id::FILL_BACK_COLOR, prop_value::BUTTON_FACE)
                .build(),
            fields.geometry.to_anchor().to_node(),
            build_empty(EscherRecordType::ClientData),
            build_empty(EscherRecordType::ClientTextbox),
        ],
    )
}

impl DrawingGroupObject for Button {
    fn origin(&self) -> Origin {
        self.origin
    }

    fn object_id(&self) -> XlsResult<u32> {
        Button::object_id(self)
    }

    fn shape_id(&self) -> XlsResult<u32> {
        Button::shape_id(self)
    }

    fn blip_id(&self) -> XlsResult<u32> {
        Button::blip_id(self)
    }

    fn set_object_id(&mut self, object_id: u32, blip_id: u32, shape_id: u32) -> XlsResult<()> {
        Button::set_object_id(self, object_id, blip_id, shape_id)
    }

    fn group_index(&self) -> Option<usize> {
        self.group_index
    }

    fn set_group_index(&mut self, index: usize) {
        self.group_index = Some(index);
    }

    fn drawing_number(&self) -> usize {
        self.drawing_number
    }

    fn sp_container(&self) -> XlsResult<EscherNode> {
        Button::sp_container(self)
    }

    fn image_data<'g>(&self, group: &'g DrawingGroup) -> XlsResult<Option<&'g [u8]>> {
        Button::image_data(self, group)
    }

    fn reference_count(&self) -> u32 {
        self.reference_count
    }

    fn set_reference_count(&mut self, count: u32) {
        self.reference_count = count;
    }

    fn is_first(&self) -> bool {
        Button::is_first(self)
    }

    fn is_form_object(&self) -> bool {
        true
    }

    fn write_drawing_record(&self, writer: &mut dyn Write) -> XlsResult<()> {
        Button::write_drawing_record(self, writer)
    }

    fn write_additional_records(&self, writer: &mut dyn Write) -> XlsResult<()> {
        Button::write_additional_records(self, writer)
    }

    fn write_tail_records(&self, writer: &mut dyn Write) -> XlsResult<()> {
        Button::write_tail_records(self, writer)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ole::escher::EscherParser;
    use crate::ole::xls::records::RecordIter;
    use crate::ole::xls::txo::{build_button_txo, build_runs, decode_text, parse_runs};
    use std::io::Cursor;

    pub(crate) fn anchor(corners: [u16; 8]) -> EscherNode {
        let mut payload = 0u16.to_le_bytes().to_vec();
        for value in corners {
            payload.extend_from_slice(&value.to_le_bytes());
        }
        EscherNode::atom(0, 0, EscherRecordType::ClientAnchor.into(), payload)
    }

    fn opt() -> EscherNode {
        PropertyBuilder::new()
            .add_simple(prop_id::PROTECTION_BOOLEANS, prop_value::LOCK_AGAINST_GROUPING)
            .add_simple(prop_id::FILL_COLOR, 0x0800_0050)
            .build()
    }

    pub(crate) fn button_shape(shape_type: u16, anchor: Option<EscherNode>) -> EscherNode {
        let mut children = vec![
            build_sp(shape_type, 1025, ShapeFlags::HAVE_ANCHOR | ShapeFlags::HAVE_SPT),
            opt(),
        ];
        children.extend(anchor);
        children.push(build_empty(EscherRecordType::ClientData));
        children.push(build_empty(EscherRecordType::ClientTextbox));
        EscherNode::container(0, EscherRecordType::SpContainer.into(), children)
    }

    fn sheet_stream(shape: EscherNode) -> Vec<u8> {
        let patriarch = EscherNode::container(
            0,
            EscherRecordType::SpContainer.into(),
            vec![build_sp(0, 1024, ShapeFlags::GROUP | ShapeFlags::PATRIARCH)],
        );
        EscherNode::container(
            1,
            EscherRecordType::DgContainer.into(),
            vec![
                EscherNode::atom(0, 1, EscherRecordType::Dg.into(), vec![2, 0, 0, 0, 1, 4, 0, 0]),
                EscherNode::container(
                    0,
                    EscherRecordType::SpgrContainer.into(),
                    vec![patriarch, shape],
                ),
            ],
        )
        .to_bytes()
        .unwrap()
    }

    /// The records a sheet holds for one button, in file order.
    pub(crate) struct Fixture {
        pub drawing: Record,
        pub obj: Record,
        pub mso: Option<Record>,
        pub txo: Record,
        pub text: Vec<Record>,
        pub formatting: Option<Record>,
    }

    impl Fixture {
        pub(crate) fn new(shape: EscherNode, chunks: &[&[u8]], text_len: u16) -> Self {
            let stream = sheet_stream(shape);
            let split = stream.len() - HEADER_LEN;
            Self {
                drawing: Record::new(record_type::MSODRAWING, stream[..split].to_vec()).unwrap(),
                obj: Record::new(record_type::OBJ, build_button_obj(3)).unwrap(),
                mso: Some(Record::new(record_type::MSODRAWING, stream[split..].to_vec()).unwrap()),
                txo: Record::new(record_type::TXO, build_button_txo(text_len, 16)).unwrap(),
                text: chunks
                    .iter()
                    .map(|chunk| Record::new(record_type::CONTINUE, chunk.to_vec()).unwrap())
                    .collect(),
                formatting: Some(Record::new(record_type::CONTINUE, build_runs(text_len)).unwrap()),
            }
        }

        pub(crate) fn standard() -> Self {
            let shape = button_shape(201, Some(anchor([5, 0, 3, 0, 7, 512, 5, 128])));
            Self::new(shape, &[&[0, b'H', b'i']], 2)
        }

        /// Records in the order [drawing, obj, mso, txo, text.., formatting].
        fn from_records(mut records: Vec<Record>) -> Self {
            let formatting = records.pop();
            let mut records = records.into_iter();
            Self {
                drawing: records.next().unwrap(),
                obj: records.next().unwrap(),
                mso: records.next(),
                txo: records.next().unwrap(),
                text: records.collect(),
                formatting,
            }
        }

        pub(crate) fn records(&self) -> Vec<&Record> {
            let mut records = vec![&self.drawing, &self.obj];
            records.extend(&self.mso);
            records.push(&self.txo);
            records.extend(&self.text);
            records.extend(&self.formatting);
            records
        }

        pub(crate) fn bytes(&self) -> Vec<u8> {
            let mut out = Vec::new();
            for record in self.records() {
                record.write_to(&mut out).unwrap();
            }
            out
        }

        fn read_into(
            &self,
            data: Rc<RefCell<DrawingData>>,
            group: &mut DrawingGroup,
            settings: WorkbookSettings,
        ) -> Button {
            let mut button =
                Button::from_read(self.drawing.clone(), self.obj.clone(), data, group, settings)
                    .unwrap();
            if let Some(mso) = &self.mso {
                button.add_mso(mso.clone());
            }
            button.set_text_object(self.txo.clone());
            for chunk in &self.text {
                button.add_text(chunk.clone());
            }
            if let Some(formatting) = &self.formatting {
                button.set_formatting(formatting.clone());
            }
            button
        }

        fn read(&self, group: &mut DrawingGroup) -> Button {
            let data = Rc::new(RefCell::new(DrawingData::new()));
            self.read_into(data, group, WorkbookSettings::default())
        }
    }

    fn written(button: &Button) -> Vec<u8> {
        let mut out = Vec::new();
        button.write_drawing_record(&mut out).unwrap();
        button.write_additional_records(&mut out).unwrap();
        button.write_tail_records(&mut out).unwrap();
        out
    }

    fn records_of(bytes: Vec<u8>) -> Vec<Record> {
        RecordIter::new(Cursor::new(bytes))
            .unwrap()
            .collect::<XlsResult<_>>()
            .unwrap()
    }

    fn reread(button: &Button) -> Button {
        Fixture::from_records(records_of(written(button))).read(&mut DrawingGroup::read())
    }

    #[test]
    fn test_text_decoding() {
        let compressed = Fixture::standard().read(&mut DrawingGroup::read());
        assert_eq!(compressed.text(), "Hi");

        let shape = button_shape(201, Some(anchor([5, 0, 3, 0, 7, 512, 5, 128])));
        let unicode = Fixture::new(shape, &[&[1, b'H', 0, b'i', 0]], 2);
        assert_eq!(unicode.read(&mut DrawingGroup::read()).text(), "Hi");
    }

    #[test]
    fn test_text_without_continuations_is_empty() {
        let shape = button_shape(201, Some(anchor([1, 0, 1, 0, 2, 0, 2, 0])));
        let fixture = Fixture::new(shape, &[], 0);
        assert_eq!(fixture.read(&mut DrawingGroup::read()).text(), "");
    }

    #[test]
    fn test_unsupported_codepage_warns() {
        let fixture = Fixture::new(
            button_shape(201, Some(anchor([5, 0, 3, 0, 7, 0, 5, 0]))),
            &[&[0, b'O', b'K']],
            2,
        );
        let data = Rc::new(RefCell::new(DrawingData::new()));
        let settings = WorkbookSettings::new().with_codepage(4242);
        let button = fixture.read_into(data, &mut DrawingGroup::read(), settings);

        assert_eq!(button.text(), "OK");
        assert_eq!(
            button.warnings().unwrap(),
            vec![DrawingWarning::UnsupportedCodepage(4242)]
        );
    }

    #[test]
    fn test_anchor_transform() {
        let button = Fixture::standard().read(&mut DrawingGroup::read());

        assert_eq!(button.x().unwrap(), 4.0);
        assert_eq!(button.y().unwrap(), 4.0);
        assert_eq!(button.position().unwrap(), (4, 4));
        assert_eq!(button.size().unwrap(), (2.5, 2.5));
        assert_eq!(button.object_id().unwrap(), 3);
        assert_eq!(button.shape_id().unwrap(), 1025);
        assert_eq!(button.shape_type().unwrap(), ShapeType::HostControl);
        assert!(button.warnings().unwrap().is_empty());
        assert_eq!(button.origin(), Origin::Read);
    }

    #[test]
    fn test_missing_anchor() {
        let fixture = Fixture::new(button_shape(201, None), &[&[0, b'H', b'i']], 2);
        let button = fixture.read(&mut DrawingGroup::read());

        assert_eq!(button.position().unwrap(), (0, 0));
        assert_eq!(
            button.warnings().unwrap(),
            vec![DrawingWarning::MissingAnchor]
        );
    }

    #[test]
    fn test_unknown_shape_type_and_missing_sp() {
        let anchor_node = anchor([5, 0, 3, 0, 7, 0, 5, 0]);
        let fixture = Fixture::new(button_shape(4000, Some(anchor_node.clone())), &[], 0);
        let button = fixture.read(&mut DrawingGroup::read());
        assert_eq!(button.shape_type().unwrap(), ShapeType::Unknown);
        assert_eq!(
            button.warnings().unwrap(),
            vec![DrawingWarning::UnknownShapeType(4000)]
        );

        let shape = EscherNode::container(
            0,
            EscherRecordType::SpContainer.into(),
            vec![opt(), anchor_node, build_empty(EscherRecordType::ClientTextbox)],
        );
        let button = Fixture::new(shape, &[], 0).read(&mut DrawingGroup::read());
        assert_eq!(button.shape_id().unwrap(), 0);
        assert_eq!(button.position().unwrap(), (4, 4));
        assert_eq!(
            button.warnings().unwrap(),
            vec![DrawingWarning::MissingShapeRecord]
        );
    }

    #[test]
    fn test_short_anchor_is_malformed() {
        let short = EscherNode::atom(0, 0, EscherRecordType::ClientAnchor.into(), vec![0; 6]);
        let fixture = Fixture::new(button_shape(201, Some(short)), &[], 0);
        let button = fixture.read(&mut DrawingGroup::read());
        assert!(matches!(
            button.object_id(),
            Err(XlsError::Escher(
                crate::ole::escher::EscherError::ShortPayload { .. }
            ))
        ));
    }

    #[test]
    fn test_initialization_runs_once() {
        let fixture = Fixture::standard();
        let data = Rc::new(RefCell::new(DrawingData::new()));
        let mut group = DrawingGroup::read();
        let button = fixture.read_into(data.clone(), &mut group, WorkbookSettings::default());

        assert_eq!(button.object_id().unwrap(), 3);
        data.borrow_mut().add_raw_data(&[0xFF; 4]);

        assert_eq!(button.object_id().unwrap(), 3);
        assert_eq!(button.position().unwrap(), (4, 4));

        let copy = button.copy_into(&mut group, WorkbookSettings::default());
        assert!(matches!(copy.object_id(), Err(XlsError::Escher(_))));
    }

    #[test]
    fn test_transition_is_one_way() {
        let mut button = Fixture::standard().read(&mut DrawingGroup::read());
        assert_eq!(button.origin(), Origin::Read);

        button.set_width(3.0).unwrap();
        assert_eq!(button.origin(), Origin::ReadWrite);
        button.set_width(2.5).unwrap();
        assert_eq!(button.origin(), Origin::ReadWrite);

        let mut fresh = Button::new(1, 1, 1.0, 1.0, "", WorkbookSettings::default());
        fresh.set_x(4.0).unwrap();
        assert_eq!(fresh.origin(), Origin::New);
    }

    #[test]
    fn test_read_writes_verbatim() {
        let fixture = Fixture::standard();
        let button = fixture.read(&mut DrawingGroup::read());
        assert_eq!(written(&button), fixture.bytes());
        assert!(button.is_first());
    }

    #[test]
    fn test_position_edit_keeps_other_records() {
        let fixture = Fixture::standard();
        let mut button = fixture.read(&mut DrawingGroup::read());
        button.set_position(9, 2).unwrap();

        let records = records_of(written(&button));
        assert_eq!(records.len(), 6);
        assert_eq!(records[0].data.len(), fixture.drawing.data.len());
        assert_ne!(records[0], fixture.drawing);
        let unchanged: Vec<&Record> = fixture.records()[1..].to_vec();
        assert_eq!(records[1..].iter().collect::<Vec<_>>(), unchanged);

        let reread = Fixture::from_records(records).read(&mut DrawingGroup::read());
        assert_eq!(reread.position().unwrap(), (9, 2));
        assert_eq!(reread.size().unwrap(), (2.5, 2.5));
        assert_eq!(
            reread.sp_container().unwrap().find_child(EscherRecordType::Opt),
            Some(&opt())
        );
    }

    #[test]
    fn test_anchor_inserted_when_missing() {
        let fixture = Fixture::new(button_shape(201, None), &[&[0, b'H', b'i']], 2);
        let mut button = fixture.read(&mut DrawingGroup::read());
        button.set_position(2, 5).unwrap();
        button.set_size(1.0, 2.0).unwrap();

        let container = button.sp_container().unwrap();
        assert_eq!(
            container.children()[2].record_type(),
            EscherRecordType::ClientAnchor
        );

        let records = records_of(written(&button));
        assert_eq!(
            records[0].data.len(),
            fixture.drawing.data.len() + HEADER_LEN + ClientAnchorRecord::PAYLOAD_LEN
        );

        let reread = Fixture::from_records(records).read(&mut DrawingGroup::read());
        assert_eq!(reread.position().unwrap(), (2, 5));
        assert_eq!(reread.size().unwrap(), (1.0, 2.0));
        assert!(reread.warnings().unwrap().is_empty());
        assert_eq!(reread.text(), "Hi");
    }

    #[test]
    fn test_edited_text_is_reencoded() {
        let fixture = Fixture::standard();
        let mut button = fixture.read(&mut DrawingGroup::read());
        button.set_button_text("Hello ✓").unwrap();
        assert_eq!(button.origin(), Origin::ReadWrite);

        let records = records_of(written(&button));
        assert_eq!(records[0], fixture.drawing);

        let txo = TxoRecord::parse(&records[3].data).unwrap();
        assert_eq!(txo.text_len(), 7);
        assert_eq!(txo.runs_len(), 16);
        assert_eq!(decode_text([records[4].data.as_slice()], 1252).text, "Hello ✓");

        let runs = parse_runs(&records[5].data).unwrap();
        assert_eq!(runs.last().unwrap().first_char, 7);

        let reread = Fixture::from_records(records).read(&mut DrawingGroup::read());
        assert_eq!(reread.text(), "Hello ✓");
    }

    #[test]
    fn test_long_text_spans_records() {
        let fixture = Fixture::standard();
        let data = Rc::new(RefCell::new(DrawingData::new()));
        let settings = WorkbookSettings::new().with_max_record_len(9);
        let mut button = fixture.read_into(data, &mut DrawingGroup::read(), settings);
        button.set_button_text("abcdefghij").unwrap();

        let records = records_of(written(&button));
        // drawing, obj, mso, txo, three text chunks, runs
        assert_eq!(records.len(), 8);
        assert!(records[4..7].iter().all(|r| r.data.len() <= 9));

        let reread = Fixture::from_records(records).read(&mut DrawingGroup::read());
        assert_eq!(reread.text(), "abcdefghij");
    }

    #[test]
    fn test_copy_shares_records() {
        let fixture = Fixture::standard();
        let mut group = DrawingGroup::read();
        let button = fixture.read(&mut group);
        let copy = button.copy_into(&mut group, WorkbookSettings::default());

        assert_eq!(button.group_index(), Some(0));
        assert_eq!(copy.group_index(), Some(1));
        assert_eq!(copy.origin(), Origin::Read);
        assert_eq!(copy.drawing_number(), button.drawing_number());
        assert_eq!(copy.position().unwrap(), button.position().unwrap());
        assert_eq!(copy.text(), "Hi");
        assert_eq!(written(&copy), fixture.bytes());
    }

    #[test]
    #[should_panic(expected = "only an unmodified button")]
    fn test_copy_of_modified_button_panics() {
        let mut group = DrawingGroup::read();
        let mut button = Fixture::standard().read(&mut group);
        button.set_x(1.0).unwrap();
        let _ = button.copy_into(&mut group, WorkbookSettings::default());
    }

    #[test]
    fn test_new_button_container() {
        let button = Button::new(2, 3, 1.5, 1.0, "OK", WorkbookSettings::default());
        let container = button.sp_container().unwrap();

        let types: Vec<EscherRecordType> =
            container.children().iter().map(EscherNode::record_type).collect();
        assert_eq!(
            types,
            vec![
                EscherRecordType::Sp,
                EscherRecordType::Opt,
                EscherRecordType::ClientAnchor,
                EscherRecordType::ClientData,
                EscherRecordType::ClientTextbox,
            ]
        );
        let sp = SpRecord::new(&container.children()[0]);
        assert_eq!(sp.shape_type(), ShapeType::HostControl);
        assert_eq!(
            sp.flags().unwrap(),
            ShapeFlags::HAVE_ANCHOR | ShapeFlags::HAVE_SPT
        );

        let anchor = ClientAnchorRecord::from_node(&container.children()[2]).unwrap();
        assert_eq!((anchor.x1(), anchor.y1()), (3.0, 2.0));
        assert_eq!((anchor.x2(), anchor.y2()), (4.5, 3.0));

        let bytes = container.to_bytes().unwrap();
        assert_eq!(EscherParser::new(&bytes).decode_all().unwrap(), vec![container]);
        assert!(!button.is_first());
        assert_eq!(button.text(), "OK");
    }

    #[test]
    fn test_group_assigns_ids() {
        let mut group = DrawingGroup::read();
        group.reserve_ids(3, 1025);

        let mut button = Button::new(0, 0, 2.0, 1.0, "Go", WorkbookSettings::default());
        let index = group.add(&mut button).unwrap();

        assert_eq!(index, 0);
        assert_eq!(button.group_index(), Some(0));
        assert_eq!(button.object_id().unwrap(), 4);
        assert_eq!(button.shape_id().unwrap(), 1026);
        assert_eq!(button.blip_id().unwrap(), 1);
        assert_eq!(group.origin(), Origin::ReadWrite);

        let mut read = Fixture::standard().read(&mut group);
        group.add(&mut read).unwrap();
        assert_eq!(read.origin(), Origin::ReadWrite);
        assert_eq!(read.object_id().unwrap(), 5);
        assert_eq!(
            SpRecord::new(&read.sp_container().unwrap().children()[0])
                .shape_id()
                .unwrap(),
            1027
        );
    }

    #[test]
    fn test_image_data_by_blip() {
        let mut group = DrawingGroup::read();
        let blip = group.add_image(vec![0x89, 0x50]);
        let mut button = Fixture::standard().read(&mut group);
        assert_eq!(button.image_data(&group).unwrap(), None);

        button.set_object_id(3, blip, 1025).unwrap();
        assert_eq!(button.image_data(&group).unwrap(), Some(&[0x89u8, 0x50][..]));
    }

    #[test]
    #[should_panic(expected = "no image data")]
    fn test_image_data_of_new_button_panics() {
        let group = DrawingGroup::new();
        let button = Button::new(0, 0, 1.0, 1.0, "", WorkbookSettings::default());
        let _ = button.image_data(&group);
    }

    #[test]
    fn test_cell_binding_and_tail() {
        let button = Fixture::standard().read(&mut DrawingGroup::read());
        assert!(button.is_form_object());
        assert_eq!((button.cell_row(), button.cell_column()), (0, 0));

        let mut out = Vec::new();
        button.write_tail_records(&mut out).unwrap();
        assert!(out.is_empty());

        let reread = reread(&button);
        assert_eq!(reread.text(), button.text());
    }
}
