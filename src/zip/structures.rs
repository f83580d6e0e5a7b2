use byteorder::{ByteOrder, LittleEndian};

use super::error::ZipError;

/// End of Central Directory (EOCD) - 22 bytes minimum
#[derive(Debug)]
pub struct EndOfCentralDirectory {
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self, ZipError> {
        if data.len() < Self::SIZE {
            return Err(ZipError::Truncated("end of central directory record"));
        }
        if &data[0..4] != Self::SIGNATURE {
            return Err(ZipError::BadSignature("end of central directory"));
        }

        // Disk numbers at 4..8 are not used
        Ok(Self {
            disk_entries: LittleEndian::read_u16(&data[8..10]),
            total_entries: LittleEndian::read_u16(&data[10..12]),
            cd_size: LittleEndian::read_u32(&data[12..16]),
            cd_offset: LittleEndian::read_u32(&data[16..20]),
            comment_len: LittleEndian::read_u16(&data[20..22]),
        })
    }

    /// Whether any field is saturated, meaning the real value may live in
    /// a ZIP64 record.
    pub fn is_saturated(&self) -> bool {
        self.disk_entries == 0xFFFF
            || self.total_entries == 0xFFFF
            || self.cd_size == 0xFFFFFFFF
            || self.cd_offset == 0xFFFFFFFF
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
#[derive(Debug)]
pub struct Zip64EOCDLocator {
    pub disk_with_eocd64: u32,
    pub total_disks: u32,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self, ZipError> {
        if data.len() < Self::SIZE {
            return Err(ZipError::Truncated("zip64 end of central directory locator"));
        }
        if &data[0..4] != Self::SIGNATURE {
            return Err(ZipError::BadSignature("zip64 end of central directory locator"));
        }

        // The absolute record offset at 8..16 is ignored: the record is
        // found relative to the locator so prepended data does not matter
        Ok(Self {
            disk_with_eocd64: LittleEndian::read_u32(&data[4..8]),
            total_disks: LittleEndian::read_u32(&data[16..20]),
        })
    }

    pub fn spans_disks(&self) -> bool {
        self.disk_with_eocd64 != 0 || self.total_disks > 1
    }
}

/// ZIP64 End of Central Directory - 56 bytes minimum
#[derive(Debug)]
pub struct Zip64EOCD {
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> Result<Self, ZipError> {
        if data.len() < Self::MIN_SIZE {
            return Err(ZipError::Truncated("zip64 end of central directory record"));
        }
        if &data[0..4] != Self::SIGNATURE {
            return Err(ZipError::BadSignature("zip64 end of central directory"));
        }

        Ok(Self {
            total_entries: LittleEndian::read_u64(&data[32..40]),
            cd_size: LittleEndian::read_u64(&data[40..48]),
            cd_offset: LittleEndian::read_u64(&data[48..56]),
        })
    }
}

/// Central Directory File Header (CDFH) - 46 bytes before the variable fields
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// General purpose flag: name and comment are UTF-8 rather than CP437.
pub const FLAG_UTF8: u16 = 1 << 11;

/// What a listing needs from one central directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipFileEntry {
    pub file_name: String,
    pub uncompressed_size: u64,
}
