// Error taxonomy shared by every codec layer.
//
// Short-buffer outcomes are not errors: they are reported through
// `transform::Status`. Everything here is terminal for the call that
// returned it.

use std::io;

use thiserror::Error;

/// Why an encoded section was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatError {
    /// A character outside the printable range `0x20..=0x60`.
    #[error("character {byte:#04x} outside the encoded range")]
    BadChar { byte: u8 },
    /// The characters after the length byte do not form whole quanta.
    #[error("{len} encoded characters is not a multiple of four")]
    Misaligned { len: usize },
    /// The length byte claims more bytes than the line carries.
    #[error("line declares {declared} bytes but encodes at most {capacity}")]
    LengthOverflow { declared: usize, capacity: usize },
    /// More than two padding bytes would be dropped from the last quantum.
    #[error("line declares {declared} bytes in {capacity}: padding of {padding} is outside 0..=2")]
    BadPadding {
        declared: usize,
        capacity: usize,
        padding: usize,
    },
    /// A zero-length line was not followed by `end`.
    #[error("trailer is missing the `end` line")]
    MissingEnd,
    /// The input ended without a `begin` line.
    #[error("no `begin` header found")]
    MissingHeader,
    /// The input ended inside a section body.
    #[error("input ended inside a section body")]
    Truncated,
}

/// Error type for every encode/decode operation.
#[derive(Debug, Error)]
pub enum UuError {
    /// Malformed encoded content at absolute source offset `offset`.
    #[error("bad uuencode format at byte {offset}: {kind}")]
    BadFormat { offset: u64, kind: FormatError },

    /// No line terminator within `limit` bytes starting at `offset`.
    #[error("line at byte {offset} exceeds {limit} bytes without a terminator")]
    LineTooLong { offset: u64, limit: usize },

    /// The multi-section session was cancelled.
    #[error("decoding cancelled")]
    Cancelled,

    /// I/O error from an adapter or file helper.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl UuError {
    pub(crate) fn bad_format(offset: u64, kind: FormatError) -> Self {
        Self::BadFormat { offset, kind }
    }

    /// The format kind, if this is a `BadFormat` error.
    pub fn format_kind(&self) -> Option<FormatError> {
        match self {
            Self::BadFormat { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Recover a `UuError` that was wrapped into an `io::Error` by one of the
    /// adapters; any other I/O error becomes `UuError::Io`.
    pub fn from_io(err: io::Error) -> Self {
        if err.get_ref().is_some_and(|inner| inner.is::<UuError>()) {
            if let Some(inner) = err.into_inner() {
                if let Ok(uu) = inner.downcast::<UuError>() {
                    return *uu;
                }
            }
            return Self::Io(io::Error::other("wrapped uuencode error lost"));
        }
        Self::Io(err)
    }
}

impl From<UuError> for io::Error {
    fn from(err: UuError) -> Self {
        match err {
            UuError::Io(e) => e,
            UuError::BadFormat { .. } | UuError::LineTooLong { .. } => {
                io::Error::new(io::ErrorKind::InvalidData, err)
            }
            UuError::Cancelled => io::Error::other(err),
        }
    }
}
