//! Errors reported by [`PbixInspector`](crate::PbixInspector).

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::zip::ZipError;

/// A Result type alias over InspectError.
pub type Result<V> = std::result::Result<V, InspectError>;

/// Why a `.pbix` file could not be inspected.
#[derive(Debug, Error)]
pub enum InspectError {
    #[error("PBIX file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Holds the actual suffix including its dot, or an empty string.
    #[error("File must have .pbix extension, got: {0}")]
    InvalidExtension(String),

    #[error("Failed to open {} as a ZIP file. File may be corrupted.", .path.display())]
    CorruptArchive {
        path: PathBuf,
        #[source]
        source: ZipError,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
