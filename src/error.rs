//! Library-wide error, result and diagnostic types.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::formats::pkg::{MIN_HEADER_SIZE, PKG_MAGIC};

/// Result alias used throughout pkgscan.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the decoder can produce.
///
/// Only [`Error::TooSmall`], [`Error::BadMagic`] and [`Error::Io`] ever make
/// a container invalid. The rest describe a degraded stage and end up as
/// [`Diagnostic`] records on the result.
#[derive(Debug, Error)]
pub enum Error {
    /// The buffer is shorter than the fixed PKG header.
    #[error("file too small to be a valid PKG ({0} bytes, need at least {min})", min = MIN_HEADER_SIZE)]
    TooSmall(usize),
    /// The first four bytes are not `\x7FCNT`.
    #[error("invalid PKG magic: 0x{0:08X} (expected 0x{expected:08X})", expected = PKG_MAGIC)]
    BadMagic(u32),
    /// The entry table described by the header does not fit in the buffer.
    #[error("entry table extends past the end of the file")]
    TruncatedEntryTable,
    /// The property list header points outside its own blob.
    #[error("param.sfo tables lie outside the property list")]
    TruncatedPropertyList,
    /// The property list does not start with `\0PSF`.
    #[error("param.sfo has an invalid magic")]
    BadPropertyListMagic,
    /// One entry-table descriptor could not be used.
    #[error("malformed entry table descriptor #{0}")]
    MalformedEntry(u32),
    /// One property list entry could not be decoded.
    #[error("malformed param.sfo entry #{0}")]
    MalformedPropertyListEntry(u32),
    /// A read would fall outside the valid region.
    #[error("read of {len} bytes at offset 0x{offset:X} is out of bounds")]
    OutOfBounds { offset: usize, len: usize },
    /// An underlying I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Field-less classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ErrorKind {
    TooSmall,
    BadMagic,
    TruncatedEntryTable,
    TruncatedPropertyList,
    BadPropertyListMagic,
    MalformedEntry,
    MalformedPropertyListEntry,
    OutOfBounds,
    Io,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TooSmall(_) => ErrorKind::TooSmall,
            Error::BadMagic(_) => ErrorKind::BadMagic,
            Error::TruncatedEntryTable => ErrorKind::TruncatedEntryTable,
            Error::TruncatedPropertyList => ErrorKind::TruncatedPropertyList,
            Error::BadPropertyListMagic => ErrorKind::BadPropertyListMagic,
            Error::MalformedEntry(_) => ErrorKind::MalformedEntry,
            Error::MalformedPropertyListEntry(_) => ErrorKind::MalformedPropertyListEntry,
            Error::OutOfBounds { .. } => ErrorKind::OutOfBounds,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether this error marks the whole container as invalid.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::TooSmall | ErrorKind::BadMagic | ErrorKind::Io
        )
    }
}

/// A recorded failure or anomaly.
///
/// Unlike [`Error`] this is `Clone + PartialEq`, so validation results can be
/// compared and stored.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&Error> for Diagnostic {
    fn from(e: &Error) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl From<Error> for Diagnostic {
    fn from(e: Error) -> Self {
        Self::from(&e)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
