//! Assembling form buttons from a sheet's record stream, and writing them back.
//!
//! Every MSODRAWING record enters the sheet's [`DrawingData`]. An OBJ record of
//! object type 7 turns the drawing record before it into a [`Button`]; the
//! ClientTextbox MSODRAWING, TXO and CONTINUE records that follow are attached
//! to that button. CONTINUE records after a TXO carry `cch` characters of text
//! and then `cbRuns` bytes of formatting runs.

use std::cell::RefCell;
use std::io::{Read, Seek, Write};
use std::rc::Rc;

use super::button::Button;
use super::data::DrawingData;
use super::group::DrawingGroup;
use super::object::DrawingGroupObject;
use crate::common::binary::read_u16_le;
use crate::ole::escher::EscherRecordType;
use crate::ole::xls::error::XlsResult;
use crate::ole::xls::obj::ObjRecord;
use crate::ole::xls::records::{Record, RecordIter, record_type};
use crate::ole::xls::settings::WorkbookSettings;
use crate::ole::xls::txo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    /// Last OBJ was a button; its text-box and TXO records may follow
    AfterButton,
    /// Other object; its records are skipped
    AfterOther,
    /// Text continuation records are pending
    Text {
        owned: bool,
        chars: usize,
        runs: usize,
    },
    /// Formatting runs record is pending
    Runs { owned: bool },
}

/// Incremental reader of the form buttons in one worksheet.
#[derive(Debug)]
pub struct FormObjectReader {
    settings: WorkbookSettings,
    drawing_data: Rc<RefCell<DrawingData>>,
    pending_drawing: Option<Record>,
    buttons: Vec<Button>,
    state: State,
}

impl FormObjectReader {
    pub fn new(settings: WorkbookSettings) -> Self {
        Self {
            settings,
            drawing_data: Rc::new(RefCell::new(DrawingData::new())),
            pending_drawing: None,
            buttons: Vec::new(),
            state: State::Idle,
        }
    }

    /// Drawing data shared by the buttons read so far.
    pub fn drawing_data(&self) -> &Rc<RefCell<DrawingData>> {
        &self.drawing_data
    }

    /// Feed the next record of the sheet substream. Records other than
    /// MSODRAWING, OBJ, TXO and CONTINUE end any pending text sequence.
    pub fn push(&mut self, record: Record, group: &mut DrawingGroup) -> XlsResult<()> {
        match record.record_type() {
            record_type::MSODRAWING => self.push_drawing(record),
            record_type::OBJ => self.push_obj(record, group),
            record_type::TXO => self.push_txo(record),
            record_type::CONTINUE => {
                self.push_continue(record);
                Ok(())
            },
            _ => {
                self.state = State::Idle;
                Ok(())
            },
        }
    }

    fn push_drawing(&mut self, record: Record) -> XlsResult<()> {
        if is_text_box(&record.data) {
            match (self.state, self.buttons.last_mut()) {
                (State::AfterButton, Some(button)) => button.add_mso(record),
                _ => self.drawing_data.borrow_mut().add_raw_data(&record.data),
            }
            return Ok(());
        }

        if let Some(orphan) = self.pending_drawing.replace(record) {
            log::debug!(
                "drawing record of {} bytes has no object record",
                orphan.data.len()
            );
            self.drawing_data.borrow_mut().add_raw_data(&orphan.data);
        }
        self.state = State::Idle;
        Ok(())
    }

    fn push_obj(&mut self, record: Record, group: &mut DrawingGroup) -> XlsResult<()> {
        let is_button = ObjRecord::parse(&record.data)?.is_button();
        let Some(drawing) = self.pending_drawing.take() else {
            log::warn!("object record without a preceding drawing record");
            self.state = State::AfterOther;
            return Ok(());
        };

        if is_button {
            let button = Button::from_read(
                drawing,
                record,
                self.drawing_data.clone(),
                group,
                self.settings.clone(),
            )?;
            self.buttons.push(button);
            self.state = State::AfterButton;
        } else {
            // Keeps drawing numbers aligned with shape order.
            self.drawing_data.borrow_mut().add_data(&drawing.data);
            self.state = State::AfterOther;
        }
        Ok(())
    }

    fn push_txo(&mut self, record: Record) -> XlsResult<()> {
        let (owned, chars, runs) = match (self.state, self.buttons.last_mut()) {
            (State::AfterButton, Some(button)) => {
                button.set_text_object(record);
                (true, button.expected_text_len()?, button.expected_runs_len()?)
            },
            _ => {
                let header = txo::TxoRecord::parse(&record.data)?;
                (false, header.text_len(), header.runs_len())
            },
        };
        self.state = next_text_state(owned, chars, runs);
        Ok(())
    }

    fn push_continue(&mut self, record: Record) {
        match self.state {
            State::Text { owned, chars, runs } => {
                let remaining = chars.saturating_sub(txo::chunk_char_count(&record.data));
                if owned {
                    if let Some(button) = self.buttons.last_mut() {
                        button.add_text(record);
                    }
                }
                self.state = next_text_state(owned, remaining, runs);
            },
            State::Runs { owned } => {
                if owned {
                    if let Some(button) = self.buttons.last_mut() {
                        button.set_formatting(record);
                    }
                }
                self.state = State::Idle;
            },
            _ => log::debug!("ignoring CONTINUE record of {} bytes", record.data.len()),
        }
    }

    /// Decode every button and reserve the ids it uses in `group`.
    pub fn finish(mut self, group: &mut DrawingGroup) -> XlsResult<Vec<Button>> {
        if let Some(orphan) = self.pending_drawing.take() {
            self.drawing_data.borrow_mut().add_raw_data(&orphan.data);
        }

        for button in &self.buttons {
            group.reserve_ids(button.object_id()?, button.shape_id()?);
        }

        log::debug!("read {} form buttons", self.buttons.len());
        Ok(self.buttons)
    }
}

fn next_text_state(owned: bool, chars: usize, runs: usize) -> State {
    if chars > 0 {
        State::Text { owned, chars, runs }
    } else if runs > 0 {
        State::Runs { owned }
    } else {
        State::Idle
    }
}

/// A lone ClientTextbox atom completing the preceding shape.
fn is_text_box(data: &[u8]) -> bool {
    read_u16_le(data, 2).ok() == Some(EscherRecordType::ClientTextbox.into())
}

/// Read the form buttons of a sheet substream.
pub fn read_form_objects<R: Read + Seek>(
    reader: R,
    group: &mut DrawingGroup,
    settings: WorkbookSettings,
) -> XlsResult<Vec<Button>> {
    let mut objects = FormObjectReader::new(settings);
    for record in RecordIter::new(reader)? {
        objects.push(record?, group)?;
    }
    objects.finish(group)
}

/// Write the form objects of a sheet: each object's drawing record and the
/// records that follow it, then every object's tail records.
pub fn write_form_objects<O: DrawingGroupObject, W: Write>(
    objects: &[O],
    writer: &mut W,
) -> XlsResult<()> {
    let forms = objects.iter().filter(|object| object.is_form_object());
    for object in forms.clone() {
        object.write_drawing_record(writer)?;
        object.write_additional_records(writer)?;
    }
    for object in forms {
        object.write_tail_records(writer)?;
    }
    Ok(())
}
