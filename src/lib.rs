//! # pbix-inspect
//!
//! List the entries of Power BI (`.pbix`) files.
//!
//! A `.pbix` file is a ZIP archive under another name. This crate checks the
//! path, reads the archive's central directory and reports each entry's name
//! and uncompressed size. The Power BI data model inside the archive is not
//! interpreted.
//!
//! ## Example
//!
//! ```no_run
//! use pbix_inspect::PbixInspector;
//!
//! fn main() -> anyhow::Result<()> {
//!     let inspector = PbixInspector::new("sales.pbix")?;
//!
//!     for entry in inspector.list_contents()? {
//!         println!("{} ({})", entry.name, entry.size);
//!     }
//!
//!     // Or the formatted report
//!     inspector.print_contents()?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod inspector;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use error::{InspectError, Result};
pub use inspector::{EntryRecord, PbixInspector, format_size};
pub use io::{LocalFileReader, ReadAt};
