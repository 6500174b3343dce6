//! Directory record layouts for the three supported dialects.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use chrono::{DateTime, Utc};

use super::consts::DIRECTORY_RECORD_SIZE;
use super::date::{decode_record_date, decode_short_record_date};

/// On-disc dialect. Chosen from the first primary descriptor and fixed for
/// the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryFormat {
    Iso9660,
    HighSierra,
    Cdi,
}

impl DirectoryFormat {
    pub fn name(&self) -> &'static str {
        match self {
            DirectoryFormat::Iso9660 => "ISO9660",
            DirectoryFormat::HighSierra => "High Sierra Format",
            DirectoryFormat::Cdi => "CD-i",
        }
    }

    /// Parse the directory record at the start of `data`.
    ///
    /// Returns `None` for a zero length byte or a record that does not fit
    /// its own length or the buffer.
    pub(crate) fn parse_record<'a>(&self, data: &'a [u8]) -> Option<RawDirectoryRecord<'a>> {
        if data.len() < DIRECTORY_RECORD_SIZE {
            return None;
        }
        let length = data[0] as usize;
        let name_len = data[32] as usize;
        if length < DIRECTORY_RECORD_SIZE + name_len || length > data.len() {
            return None;
        }

        let (extent, size, timestamp, flags, volume_sequence_number) = match self {
            DirectoryFormat::Iso9660 => (
                LittleEndian::read_u32(&data[2..6]),
                LittleEndian::read_u32(&data[10..14]),
                decode_record_date(&data[18..25]),
                data[25],
                LittleEndian::read_u16(&data[28..30]),
            ),
            DirectoryFormat::HighSierra => (
                LittleEndian::read_u32(&data[2..6]),
                LittleEndian::read_u32(&data[10..14]),
                decode_short_record_date(&data[18..24]),
                data[24],
                LittleEndian::read_u16(&data[28..30]),
            ),
            DirectoryFormat::Cdi => (
                BigEndian::read_u32(&data[6..10]),
                BigEndian::read_u32(&data[14..18]),
                decode_short_record_date(&data[18..24]),
                data[25],
                BigEndian::read_u16(&data[30..32]),
            ),
        };

        let name_end = DIRECTORY_RECORD_SIZE + name_len;
        // The system use area starts on an even offset.
        let system_use_start = name_end + (name_end % 2);
        let system_use = if system_use_start < length {
            &data[system_use_start..length]
        } else {
            &[]
        };

        Some(RawDirectoryRecord {
            length,
            xattr_length: data[1],
            extent,
            size,
            timestamp,
            flags,
            file_unit_size: data[26],
            interleave: data[27],
            volume_sequence_number,
            name: &data[DIRECTORY_RECORD_SIZE..name_end],
            system_use,
        })
    }
}

/// One directory record, borrowed from the directory buffer.
#[derive(Debug, Clone)]
pub(crate) struct RawDirectoryRecord<'a> {
    pub length: usize,
    pub xattr_length: u8,
    pub extent: u32,
    pub size: u32,
    pub timestamp: Option<DateTime<Utc>>,
    pub flags: u8,
    pub file_unit_size: u8,
    pub interleave: u8,
    pub volume_sequence_number: u16,
    pub name: &'a [u8],
    pub system_use: &'a [u8],
}

impl RawDirectoryRecord<'_> {
    /// `.` (0x00) and `..` (0x01) self/parent records.
    pub fn is_self_or_parent(&self) -> bool {
        self.name.len() == 1 && self.name[0] <= 1
    }
}
