//! Low-level central directory parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the last End of Central Directory (EOCD) signature near the end
//! 2. If a ZIP64 locator precedes it, take sizes from the ZIP64 EOCD
//! 3. Read the Central Directory, which ends where those records begin
//!
//! Positions are derived from where the records actually are rather than
//! from the offsets stored in them. Archives with data prepended
//! (self-extracting stubs) or appended (signature blocks) still list.

use byteorder::{ByteOrder, LittleEndian};
use std::io::{Cursor, Read};

use crate::io::ReadAt;

use super::cp437;
use super::error::{ZipError, truncated};
use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// Extra field tag carrying 64-bit sizes and offsets.
const ZIP64_EXTRA_FIELD_ID: u16 = 0x0001;

/// Low-level ZIP file parser.
///
/// Generic over the reader type so the same code serves local files
/// and in-memory buffers.
///
/// ## Example
///
/// ```ignore
/// let parser = ZipParser::new(reader);
/// for entry in parser.list_files()? {
///     println!("{} {}", entry.file_name, entry.uncompressed_size);
/// }
/// ```
pub struct ZipParser<R: ReadAt> {
    /// The underlying data source
    reader: R,
    /// Total size of the archive in bytes
    size: u64,
}

impl<R: ReadAt> ZipParser<R> {
    /// Create a new parser for the given reader.
    pub fn new(reader: R) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    fn read_vec(&self, offset: u64, len: usize) -> Result<Vec<u8>, ZipError> {
        let mut buf = vec![0u8; len];
        self.reader
            .read_exact_at(offset, &mut buf)
            .map_err(ZipError::Io)?;
        Ok(buf)
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Tries the last 22 bytes first (no archive comment). Otherwise the
    /// last EOCD signature in the trailing 64 KiB wins, whatever its
    /// comment length says, so bytes after the record are tolerated.
    ///
    /// # Returns
    ///
    /// A tuple of (EOCD record, offset of EOCD in file).
    ///
    /// # Errors
    ///
    /// [`ZipError::MissingEocd`] if no complete record is found.
    #[tracing::instrument(skip(self), fields(size = self.size))]
    pub fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64), ZipError> {
        let eocd_size = EndOfCentralDirectory::SIZE as u64;

        if self.size >= eocd_size {
            let offset = self.size - eocd_size;
            let buf = self.read_vec(offset, EndOfCentralDirectory::SIZE)?;

            if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && &buf[20..22] == b"\x00\x00" {
                let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
                tracing::debug!(offset, "found end of central directory");
                return Ok((eocd, offset));
            }
        }

        let search_size = (MAX_COMMENT_SIZE + eocd_size).min(self.size);
        let search_start = self.size - search_size;
        let buf = self.read_vec(search_start, search_size as usize)?;

        let last = buf
            .len()
            .checked_sub(EndOfCentralDirectory::SIZE)
            .ok_or(ZipError::MissingEocd)?;
        let i = (0..=last)
            .rev()
            .find(|&i| &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE)
            .ok_or(ZipError::MissingEocd)?;

        let eocd = EndOfCentralDirectory::from_bytes(&buf[i..i + EndOfCentralDirectory::SIZE])?;
        let offset = search_start + i as u64;
        let trailing = self.size - offset - eocd_size;
        if trailing != eocd.comment_len as u64 {
            tracing::debug!(
                comment_len = eocd.comment_len,
                trailing,
                "comment length does not reach end of file"
            );
        }
        tracing::debug!(offset, "found end of central directory");
        Ok((eocd, offset))
    }

    /// Read the ZIP64 End of Central Directory record, if there is one.
    ///
    /// The locator must sit immediately before the regular EOCD and the
    /// ZIP64 EOCD immediately before the locator. When either signature is
    /// missing the archive is treated as a classic one.
    ///
    /// # Returns
    ///
    /// The parsed ZIP64 EOCD and its offset in the file.
    ///
    /// # Errors
    ///
    /// [`ZipError::MultiDisk`] if the locator describes a split archive.
    #[tracing::instrument(skip(self))]
    pub fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Option<(Zip64EOCD, u64)>, ZipError> {
        let Some(locator_offset) = eocd_offset.checked_sub(Zip64EOCDLocator::SIZE as u64) else {
            return Ok(None);
        };
        let locator_buf = self.read_vec(locator_offset, Zip64EOCDLocator::SIZE)?;
        if &locator_buf[0..4] != Zip64EOCDLocator::SIGNATURE {
            return Ok(None);
        }

        if Zip64EOCDLocator::from_bytes(&locator_buf)?.spans_disks() {
            return Err(ZipError::MultiDisk);
        }

        let Some(eocd64_offset) = locator_offset.checked_sub(Zip64EOCD::MIN_SIZE as u64) else {
            return Ok(None);
        };
        let eocd64_buf = self.read_vec(eocd64_offset, Zip64EOCD::MIN_SIZE)?;
        if &eocd64_buf[0..4] != Zip64EOCD::SIGNATURE {
            return Ok(None);
        }

        tracing::debug!(eocd64_offset, "archive uses zip64 records");
        Ok(Some((Zip64EOCD::from_bytes(&eocd64_buf)?, eocd64_offset)))
    }

    /// List all entries in the archive, in central directory order.
    ///
    /// Headers are read until the directory's byte size is used up; the
    /// entry count in the EOCD is advisory.
    #[tracing::instrument(skip(self))]
    pub fn list_files(&self) -> Result<Vec<ZipFileEntry>, ZipError> {
        let (eocd, eocd_offset) = self.find_eocd()?;

        // The directory ends where the first end record begins
        let (cd_offset, cd_size, total_entries, cd_end) = match self.read_zip64_eocd(eocd_offset)? {
            Some((eocd64, eocd64_offset)) => (
                eocd64.cd_offset,
                eocd64.cd_size,
                eocd64.total_entries,
                eocd64_offset,
            ),
            None => {
                if eocd.is_saturated() {
                    tracing::debug!("saturated end record without zip64 records");
                }
                (
                    eocd.cd_offset as u64,
                    eocd.cd_size as u64,
                    eocd.total_entries as u64,
                    eocd_offset,
                )
            }
        };

        let cd_start = cd_end.checked_sub(cd_size).ok_or(ZipError::OutOfBounds {
            offset: cd_offset,
            size: cd_size,
        })?;
        if cd_start != cd_offset {
            tracing::debug!(cd_start, cd_offset, "archive is shifted within the file");
        }

        let cd_data = self.read_vec(cd_start, cd_size as usize)?;

        // A corrupt entry count must not drive the allocation
        let capacity = total_entries.min(cd_size / CDFH_MIN_SIZE as u64) as usize;
        let mut entries = Vec::with_capacity(capacity);
        let mut cursor = Cursor::new(cd_data.as_slice());

        while cursor.position() < cd_size {
            let entry = parse_cdfh(&mut cursor)?;
            tracing::trace!(name = %entry.file_name, size = entry.uncompressed_size, "entry");
            entries.push(entry);
        }

        if entries.len() as u64 != total_entries {
            tracing::debug!(
                expected = total_entries,
                found = entries.len(),
                "entry count differs from end record"
            );
        }
        tracing::debug!(entries = entries.len(), cd_start, cd_size, "read central directory");
        Ok(entries)
    }
}

/// Parse one Central Directory File Header from a cursor.
///
/// The cursor is left at the start of the next header.
fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<ZipFileEntry, ZipError> {
    let t = truncated("central directory file header");

    let mut header = [0u8; CDFH_MIN_SIZE];
    cursor.read_exact(&mut header).map_err(&t)?;
    if &header[0..4] != CDFH_SIGNATURE {
        return Err(ZipError::BadSignature("central directory file header"));
    }

    let flags = LittleEndian::read_u16(&header[8..10]);
    let mut uncompressed_size = LittleEndian::read_u32(&header[24..28]) as u64;
    let file_name_length = LittleEndian::read_u16(&header[28..30]) as usize;
    let extra_field_length = LittleEndian::read_u16(&header[30..32]) as usize;
    let file_comment_length = LittleEndian::read_u16(&header[32..34]) as usize;

    let mut file_name_bytes = vec![0u8; file_name_length];
    cursor.read_exact(&mut file_name_bytes).map_err(&t)?;
    let file_name = if flags & FLAG_UTF8 != 0 {
        String::from_utf8_lossy(&file_name_bytes).into_owned()
    } else {
        cp437::decode(&file_name_bytes).into_owned()
    };

    let mut extra = vec![0u8; extra_field_length];
    cursor.read_exact(&mut extra).map_err(&t)?;
    if uncompressed_size == 0xFFFFFFFF
        && let Some(size) = zip64_uncompressed_size(&extra)
    {
        uncompressed_size = size;
    }

    let header_end = cursor.position() + file_comment_length as u64;
    if header_end > cursor.get_ref().len() as u64 {
        return Err(ZipError::Truncated("central directory file header"));
    }
    cursor.set_position(header_end);

    Ok(ZipFileEntry {
        file_name,
        uncompressed_size,
    })
}

/// The uncompressed size from a ZIP64 extended information field.
///
/// It is the first value of the field whenever the header's 32-bit
/// size is saturated.
fn zip64_uncompressed_size(mut extra: &[u8]) -> Option<u64> {
    while extra.len() >= 4 {
        let header_id = LittleEndian::read_u16(&extra[0..2]);
        let field_size = LittleEndian::read_u16(&extra[2..4]) as usize;
        let field = &extra[4..(4 + field_size).min(extra.len())];

        if header_id == ZIP64_EXTRA_FIELD_ID && field.len() >= 8 {
            return Some(LittleEndian::read_u64(&field[0..8]));
        }
        extra = &extra[4 + field.len()..];
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Central directory header for a stored entry, optionally with extra data.
    fn cdfh_with(name: &[u8], flags: u16, size: u32, extra: &[u8]) -> Vec<u8> {
        let mut h = CDFH_SIGNATURE.to_vec();
        h.extend_from_slice(&20u16.to_le_bytes()); // version made by
        h.extend_from_slice(&20u16.to_le_bytes()); // version needed
        h.extend_from_slice(&flags.to_le_bytes());
        h.extend_from_slice(&0u16.to_le_bytes()); // method
        h.extend_from_slice(&0u16.to_le_bytes()); // time
        h.extend_from_slice(&0u16.to_le_bytes()); // date
        h.extend_from_slice(&0u32.to_le_bytes()); // crc
        h.extend_from_slice(&size.to_le_bytes());
        h.extend_from_slice(&size.to_le_bytes());
        h.extend_from_slice(&(name.len() as u16).to_le_bytes());
        h.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        h.extend_from_slice(&0u16.to_le_bytes()); // comment
        h.extend_from_slice(&0u16.to_le_bytes()); // disk
        h.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
        h.extend_from_slice(&0u32.to_le_bytes()); // external attrs
        h.extend_from_slice(&0u32.to_le_bytes()); // lfh offset
        h.extend_from_slice(name);
        h.extend_from_slice(extra);
        h
    }

    fn cdfh(name: &str, size: u32, extra: &[u8]) -> Vec<u8> {
        cdfh_with(name.as_bytes(), FLAG_UTF8, size, extra)
    }

    fn eocd(entries: u16, cd_size: u32, cd_offset: u32, comment: &[u8]) -> Vec<u8> {
        let mut data = EndOfCentralDirectory::SIGNATURE.to_vec();
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&entries.to_le_bytes());
        data.extend_from_slice(&entries.to_le_bytes());
        data.extend_from_slice(&cd_size.to_le_bytes());
        data.extend_from_slice(&cd_offset.to_le_bytes());
        data.extend_from_slice(&(comment.len() as u16).to_le_bytes());
        data.extend_from_slice(comment);
        data
    }

    /// Archive made of a central directory and EOCD only; no entry data.
    fn archive(headers: &[Vec<u8>], comment: &[u8]) -> Vec<u8> {
        let mut data: Vec<u8> = headers.concat();
        let cd_size = data.len() as u32;
        data.extend(eocd(headers.len() as u16, cd_size, 0, comment));
        data
    }

    fn names(data: Vec<u8>) -> Vec<String> {
        ZipParser::new(data)
            .list_files()
            .unwrap()
            .into_iter()
            .map(|e| e.file_name)
            .collect()
    }

    #[test]
    fn lists_entries_in_directory_order() {
        let data = archive(
            &[cdfh("Version", 8, &[]), cdfh("Report/", 0, &[]), cdfh("DataModel", 2048, &[])],
            &[],
        );
        let entries = ZipParser::new(data).list_files().unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, ["Version", "Report/", "DataModel"]);
        assert_eq!(entries[2].uncompressed_size, 2048);
    }

    #[test]
    fn finds_eocd_behind_comment() {
        let data = archive(&[cdfh("a", 1, &[])], b"exported by Power BI Desktop");
        let parser = ZipParser::new(data);
        let (eocd, offset) = parser.find_eocd().unwrap();
        assert_eq!(eocd.comment_len, 28);
        assert_eq!(offset, cdfh("a", 1, &[]).len() as u64);
        assert_eq!(parser.list_files().unwrap().len(), 1);
    }

    #[test]
    fn bytes_after_eocd_are_ignored() {
        let mut data = archive(&[cdfh("DataModel", 5, &[])], &[]);
        data.extend_from_slice(b"appended signature block");
        assert_eq!(names(data), ["DataModel"]);
    }

    #[test]
    fn prepended_data_shifts_the_directory() {
        let mut data = b"#!/bin/sh\nexec self-extractor\n".to_vec();
        data.extend(archive(&[cdfh("DataModel", 5, &[])], &[]));

        let entries = ZipParser::new(data).list_files().unwrap();
        assert_eq!(entries[0].file_name, "DataModel");
        assert_eq!(entries[0].uncompressed_size, 5);
    }

    #[test]
    fn names_without_utf8_flag_are_cp437() {
        let data = archive(
            &[
                cdfh_with(b"r\x82sum\x82.txt", 0, 1, &[]),
                cdfh_with("résumé.txt".as_bytes(), FLAG_UTF8, 1, &[]),
            ],
            &[],
        );
        assert_eq!(names(data), ["résumé.txt", "résumé.txt"]);
    }

    #[test]
    fn zip64_extra_field_overrides_size() {
        let mut extra = ZIP64_EXTRA_FIELD_ID.to_le_bytes().to_vec();
        extra.extend_from_slice(&16u16.to_le_bytes());
        extra.extend_from_slice(&5_000_000_000u64.to_le_bytes());
        extra.extend_from_slice(&4_900_000_000u64.to_le_bytes());
        let data = archive(&[cdfh("DataModel", 0xFFFFFFFF, &extra)], &[]);

        let entries = ZipParser::new(data).list_files().unwrap();
        assert_eq!(entries[0].uncompressed_size, 5_000_000_000);
    }

    #[test]
    fn unknown_extra_fields_are_skipped() {
        let mut extra = 0x5455u16.to_le_bytes().to_vec();
        extra.extend_from_slice(&5u16.to_le_bytes());
        extra.extend_from_slice(&[1, 0, 0, 0, 0]);
        extra.extend_from_slice(&ZIP64_EXTRA_FIELD_ID.to_le_bytes());
        extra.extend_from_slice(&8u16.to_le_bytes());
        extra.extend_from_slice(&6_000_000_000u64.to_le_bytes());
        let data = archive(&[cdfh("a", 0xFFFFFFFF, &extra), cdfh("b", 4, &[])], &[]);

        let entries = ZipParser::new(data).list_files().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].uncompressed_size, 6_000_000_000);
        assert_eq!(entries[1].file_name, "b");
        assert_eq!(entries[1].uncompressed_size, 4);
    }

    #[test]
    fn zip64_records_are_followed() {
        let headers = [cdfh("DataModel", 7, &[]), cdfh("Version", 8, &[])];
        let cd: Vec<u8> = headers.concat();

        let mut data = b"stub".to_vec();
        data.extend_from_slice(&cd);

        let mut eocd64 = Zip64EOCD::SIGNATURE.to_vec();
        eocd64.extend_from_slice(&44u64.to_le_bytes());
        eocd64.extend_from_slice(&45u16.to_le_bytes());
        eocd64.extend_from_slice(&45u16.to_le_bytes());
        eocd64.extend_from_slice(&0u32.to_le_bytes());
        eocd64.extend_from_slice(&0u32.to_le_bytes());
        eocd64.extend_from_slice(&2u64.to_le_bytes());
        eocd64.extend_from_slice(&2u64.to_le_bytes());
        eocd64.extend_from_slice(&(cd.len() as u64).to_le_bytes());
        eocd64.extend_from_slice(&0u64.to_le_bytes());
        data.extend_from_slice(&eocd64);

        let mut locator = Zip64EOCDLocator::SIGNATURE.to_vec();
        locator.extend_from_slice(&0u32.to_le_bytes());
        locator.extend_from_slice(&(cd.len() as u64).to_le_bytes());
        locator.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&locator);

        data.extend(eocd(0xFFFF, 0xFFFFFFFF, 0xFFFFFFFF, &[]));

        assert_eq!(names(data), ["DataModel", "Version"]);
    }

    #[test]
    fn split_archives_are_rejected() {
        let mut data = Zip64EOCDLocator::SIGNATURE.to_vec();
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&0u64.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend(archive(&[], &[]));

        assert!(matches!(
            ZipParser::new(data).list_files(),
            Err(ZipError::MultiDisk)
        ));
    }

    #[test]
    fn saturated_count_without_zip64_records() {
        let headers: Vec<Vec<u8>> = (0..0xFFFF).map(|_| cdfh("a", 1, &[])).collect();
        let mut data = headers.concat();
        let cd_size = data.len() as u32;
        data.extend(eocd(0xFFFF, cd_size, 0, &[]));

        let entries = ZipParser::new(data).list_files().unwrap();
        assert_eq!(entries.len(), 65535);
    }

    #[test]
    fn entry_count_is_advisory() {
        let mut data = archive(&[cdfh("a", 1, &[])], &[]);
        let eocd = data.len() - EndOfCentralDirectory::SIZE;
        data[eocd + 8..eocd + 10].copy_from_slice(&2u16.to_le_bytes());
        data[eocd + 10..eocd + 12].copy_from_slice(&2u16.to_le_bytes());
        assert_eq!(names(data), ["a"]);
    }

    #[test]
    fn empty_archive_has_no_entries() {
        let data = archive(&[], &[]);
        assert!(ZipParser::new(data).list_files().unwrap().is_empty());
    }

    #[test]
    fn garbage_has_no_eocd() {
        let parser = ZipParser::new(b"definitely not a zip archive".to_vec());
        assert!(matches!(parser.list_files(), Err(ZipError::MissingEocd)));

        let parser = ZipParser::new(Vec::new());
        assert!(matches!(parser.list_files(), Err(ZipError::MissingEocd)));
    }

    #[test]
    fn directory_larger_than_file_is_out_of_bounds() {
        let mut data = archive(&[cdfh("a", 1, &[])], &[]);
        let eocd = data.len() - EndOfCentralDirectory::SIZE;
        // cd_size
        data[eocd + 12..eocd + 16].copy_from_slice(&1000u32.to_le_bytes());
        assert!(matches!(
            ZipParser::new(data).list_files(),
            Err(ZipError::OutOfBounds { size: 1000, .. })
        ));
    }

    #[test]
    fn name_past_directory_is_truncated() {
        let mut header = cdfh("a", 1, &[]);
        // file name length
        header[28..30].copy_from_slice(&200u16.to_le_bytes());
        let data = archive(&[header], &[]);
        assert!(matches!(
            ZipParser::new(data).list_files(),
            Err(ZipError::Truncated(_))
        ));
    }

    #[test]
    fn bad_header_signature() {
        let mut header = cdfh("a", 1, &[]);
        header[3] = 0x09;
        let data = archive(&[header], &[]);
        assert!(matches!(
            ZipParser::new(data).list_files(),
            Err(ZipError::BadSignature(_))
        ));
    }
}
