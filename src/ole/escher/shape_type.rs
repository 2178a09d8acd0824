//! Shape type codes (MS-ODRAW 2.4.6 MSOSPT) relevant to worksheet drawings.

/// Shape type carried in the instance field of an Sp record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeType {
    /// `msosptMin` / not a primitive (used by group shapes)
    Min,
    Rectangle,
    RoundRectangle,
    Ellipse,
    Line,
    /// Pictures and charts
    PictureFrame,
    /// Form controls such as buttons
    HostControl,
    /// Comments and text boxes
    TextBox,
    /// Any code this crate has no name for
    Unknown,
}

impl ShapeType {
    /// Map a raw shape type code to a variant. Total: unknown codes map to
    /// [`ShapeType::Unknown`].
    pub const fn from_code(code: u16) -> Self {
        match code {
            0 => Self::Min,
            1 => Self::Rectangle,
            2 => Self::RoundRectangle,
            3 => Self::Ellipse,
            20 => Self::Line,
            75 => Self::PictureFrame,
            201 => Self::HostControl,
            202 => Self::TextBox,
            _ => Self::Unknown,
        }
    }

    /// Raw code, `None` for [`ShapeType::Unknown`].
    pub const fn code(self) -> Option<u16> {
        match self {
            Self::Min => Some(0),
            Self::Rectangle => Some(1),
            Self::RoundRectangle => Some(2),
            Self::Ellipse => Some(3),
            Self::Line => Some(20),
            Self::PictureFrame => Some(75),
            Self::HostControl => Some(201),
            Self::TextBox => Some(202),
            Self::Unknown => None,
        }
    }
}
