//! Internal failure channel for attach-time parsing.
//!
//! The public query API never surfaces these; attach swallows them into
//! the invalid state after logging the reason.

use alloc::borrow::Cow;
use core::fmt::Display;

#[derive(Debug)]
pub(crate) enum Error {
    /// The ELF header failed validation.
    ///
    /// * Image shorter than a header
    /// * Invalid magic bytes
    /// * Unknown file class
    ParseEhdr {
        /// A descriptive message about the header validation failure.
        msg: Cow<'static, str>,
    },

    /// The `.gnu_debugdata` payload could not be decompressed.
    Decompress {
        /// A descriptive message forwarded from the XZ decoder.
        msg: Cow<'static, str>,
    },
}

impl Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::ParseEhdr { msg } => write!(f, "ELF header parsing error: {msg}"),
            Error::Decompress { msg } => write!(f, "XZ decompression error: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

#[cold]
#[inline(never)]
pub(crate) fn parse_ehdr_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::ParseEhdr { msg: msg.into() }
}

#[cold]
#[inline(never)]
pub(crate) fn decompress_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::Decompress { msg: msg.into() }
}

pub(crate) type Result<T> = core::result::Result<T, Error>;
