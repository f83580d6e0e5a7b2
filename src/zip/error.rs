use std::io;
use thiserror::Error;

/// Errors raised while reading an archive's central directory.
#[derive(Debug, Error)]
pub enum ZipError {
    #[error("failed to read archive: {0}")]
    Io(#[source] io::Error),

    #[error("unable to locate the end of central directory record")]
    MissingEocd,

    #[error("invalid {0} signature")]
    BadSignature(&'static str),

    #[error("central directory (offset {offset}, size {size}) lies outside the archive")]
    OutOfBounds { offset: u64, size: u64 },

    #[error("archives spanning multiple disks are not supported")]
    MultiDisk,

    #[error("truncated {0}")]
    Truncated(&'static str),
}

/// Maps a read failure on an in-memory buffer to a truncation of `what`.
pub(crate) fn truncated(what: &'static str) -> impl Fn(io::Error) -> ZipError {
    move |_| ZipError::Truncated(what)
}
