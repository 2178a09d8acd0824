/// Where a drawing object's state came from, and therefore how it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Read from a file and untouched; written back verbatim
    Read,
    /// Read from a file and since modified; written from patched records
    ReadWrite,
    /// Created programmatically; every record is generated
    New,
}

impl Origin {
    /// State after a mutation. `Read` becomes `ReadWrite`; the other states
    /// are unchanged.
    #[inline]
    pub const fn modified(self) -> Self {
        match self {
            Self::Read | Self::ReadWrite => Self::ReadWrite,
            Self::New => Self::New,
        }
    }

    #[inline]
    pub const fn has_source_records(self) -> bool {
        match self {
            Self::Read | Self::ReadWrite => true,
            Self::New => false,
        }
    }
}
