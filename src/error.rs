//! Error type

use std::io;

#[derive(Debug, thiserror::Error)]
///Errors reported by [Deflater](crate::Deflater) and [DeflaterWriter](crate::DeflaterWriter)
pub enum Error {
    ///Offset, length or enumerated value is out of range.
    ///
    ///Always detected before engine is touched.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    ///Engine handle has been released.
    #[error("deflater has been closed")]
    ClosedState,
    ///Attempt to write after end of compressed stream.
    #[error("write beyond end of stream")]
    StreamFinished,
    ///Engine reported unexpected status.
    ///
    ///This is fatal and never retried.
    #[error("compression engine fault: {0}")]
    EngineFault(String),
    ///Engine cannot perform requested operation.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl From<Error> for io::Error {
    fn from(error: Error) -> Self {
        let kind = match error {
            Error::InvalidArgument(_) => io::ErrorKind::InvalidInput,
            Error::EngineFault(_) => io::ErrorKind::InvalidData,
            Error::Unsupported(_) => io::ErrorKind::Unsupported,
            Error::ClosedState | Error::StreamFinished => io::ErrorKind::Other,
        };
        io::Error::new(kind, error)
    }
}

#[inline]
///Validates that `offset..offset + length` lies within buffer of `len` bytes.
pub(crate) fn check_bounds(len: usize, offset: usize, length: usize) -> Result<(), Error> {
    match offset.checked_add(length) {
        Some(end) if end <= len => Ok(()),
        _ => Err(Error::InvalidArgument("offset and length out of bounds")),
    }
}
