//! The `.pbix` archive inspector.
//!
//! A [`PbixInspector`] is bound to one path at construction, after checking
//! that the file exists and carries the `.pbix` extension. The archive itself
//! is only opened when its contents are listed.

use std::ffi::OsStr;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{InspectError, Result};
use crate::io::LocalFileReader;
use crate::zip::{ZipError, ZipParser};

/// Extension a target file must carry, compared case-insensitively.
pub const PBIX_EXTENSION: &str = "pbix";

const NAME_WIDTH: usize = 60;
const SIZE_WIDTH: usize = 15;
const RULE_WIDTH: usize = 80;

/// One archive entry as shown to users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub name: String,
    /// Uncompressed size, e.g. `"1,024 bytes"`.
    pub size: String,
}

impl EntryRecord {
    pub fn new(name: impl Into<String>, bytes: u64) -> Self {
        Self {
            name: name.into(),
            size: format_size(bytes),
        }
    }
}

/// Lists the entries of a Power BI file.
#[derive(Debug, Clone)]
pub struct PbixInspector {
    path: PathBuf,
}

impl PbixInspector {
    /// Bind an inspector to `path`.
    ///
    /// # Errors
    ///
    /// [`InspectError::NotFound`] if the path does not exist, otherwise
    /// [`InspectError::InvalidExtension`] if it does not end in `.pbix`.
    /// Nothing is read from the file.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(InspectError::NotFound(path.to_path_buf()));
        }

        let extension = path.extension();
        if !extension.is_some_and(|ext| ext.eq_ignore_ascii_case(PBIX_EXTENSION)) {
            return Err(InspectError::InvalidExtension(suffix(extension)));
        }

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// List every entry of the archive in central directory order.
    ///
    /// The file is opened for the duration of the call only.
    ///
    /// # Errors
    ///
    /// [`InspectError::CorruptArchive`] if the bytes are not a readable ZIP
    /// container, [`InspectError::Io`] if the file cannot be read at all.
    pub fn list_contents(&self) -> Result<Vec<EntryRecord>> {
        let reader = LocalFileReader::new(&self.path).map_err(|source| self.io_error(source))?;

        let entries = ZipParser::new(reader)
            .list_files()
            .map_err(|e| match e {
                ZipError::Io(source) => self.io_error(source),
                source => InspectError::CorruptArchive {
                    path: self.path.clone(),
                    source,
                },
            })?;

        tracing::debug!(path = %self.path.display(), entries = entries.len(), "listed archive");
        Ok(entries
            .into_iter()
            .map(|entry| EntryRecord::new(entry.file_name, entry.uncompressed_size))
            .collect())
    }

    /// Write the contents report to `out`.
    pub fn write_contents<W: Write>(&self, mut out: W) -> Result<()> {
        let contents = self.list_contents()?;
        self.write_report(&mut out, &contents)
            .map_err(|source| self.io_error(source))
    }

    /// Print the contents report to standard output.
    pub fn print_contents(&self) -> Result<()> {
        self.write_contents(io::stdout().lock())
    }

    fn write_report(&self, out: &mut impl Write, contents: &[EntryRecord]) -> io::Result<()> {
        let file_name = self
            .path
            .file_name()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();

        writeln!(out)?;
        writeln!(out, "Contents of {file_name}:")?;
        writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
        for item in contents {
            writeln!(
                out,
                "{:<NAME_WIDTH$} {:>SIZE_WIDTH$}",
                item.name, item.size
            )?;
        }
        writeln!(out)?;
        writeln!(out, "Total files: {}", contents.len())?;
        out.flush()
    }

    fn io_error(&self, source: io::Error) -> InspectError {
        InspectError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Format a byte count with thousands separators.
///
/// # Examples
///
/// ```
/// use pbix_inspect::format_size;
///
/// assert_eq!(format_size(512), "512 bytes");
/// assert_eq!(format_size(1_234_567), "1,234,567 bytes");
/// ```
pub fn format_size(size: u64) -> String {
    let digits = size.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 6);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped.push_str(" bytes");
    grouped
}

/// The path suffix as users write it: `.txt`, or empty if there is none.
fn suffix(extension: Option<&OsStr>) -> String {
    extension
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}
