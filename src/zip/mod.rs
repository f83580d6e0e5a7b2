//! ZIP central directory reading.
//!
//! A `.pbix` file is an ordinary ZIP container, so listing it only needs
//! the archive's index, never the (compressed) entry data.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Parsing of those structures from any [`ReadAt`](crate::io::ReadAt) source
//! - [`error`]: Why an archive could not be read
//! - [`cp437`]: Decoding of entry names written without the UTF-8 flag
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! The EOCD is read first (from the end of the file), then the Central
//! Directory, so the local headers are never visited.
//!
//! ## Limitations
//!
//! - No multi-disk archive support

mod cp437;
mod error;
mod parser;
mod structures;

pub use error::ZipError;
pub use parser::ZipParser;
pub use structures::*;
