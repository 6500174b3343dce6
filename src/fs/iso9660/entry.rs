//! Decoded directory entries and the metadata attached to them.

use bitflags::bitflags;
use byteorder::{BigEndian, ByteOrder};
use chrono::{DateTime, Utc};

use super::consts::CDI_SYSTEM_AREA_SIZE;
use super::date::{decode_descriptor_date, decode_record_date};
use super::record::RawDirectoryRecord;
use crate::fs::apple::FinderInfo;

bitflags! {
    /// Directory record file flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FileFlags: u8 {
        const HIDDEN = 0x01;
        const DIRECTORY = 0x02;
        const ASSOCIATED = 0x04;
        const RECORD = 0x08;
        const PROTECTED = 0x10;
        const MULTI_EXTENT = 0x80;
    }
}

bitflags! {
    /// CD-ROM XA attribute word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct XaAttributes: u16 {
        const SYSTEM_READ = 0x0001;
        const SYSTEM_EXECUTE = 0x0004;
        const OWNER_READ = 0x0010;
        const OWNER_EXECUTE = 0x0040;
        const GROUP_READ = 0x0100;
        const GROUP_EXECUTE = 0x0400;
        const MODE2_FORM1 = 0x0800;
        const MODE2_FORM2 = 0x1000;
        const INTERLEAVED = 0x2000;
        const CDDA = 0x4000;
        const DIRECTORY = 0x8000;
    }
}

bitflags! {
    /// CD-i attribute word from the directory record system area.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CdiAttributes: u16 {
        const OWNER_READ = 0x0001;
        const OWNER_EXECUTE = 0x0004;
        const GROUP_READ = 0x0010;
        const GROUP_EXECUTE = 0x0040;
        const OTHER_READ = 0x0100;
        const OTHER_EXECUTE = 0x0400;
        const DIGITAL_AUDIO = 0x4000;
        const DIRECTORY = 0x8000;
    }
}

/// CD-ROM XA system use record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CdromXa {
    pub group: u16,
    pub user: u16,
    pub attributes: XaAttributes,
    pub file_number: u8,
}

impl CdromXa {
    /// `data` is the 14-byte record; the `XA` signature sits at bytes 6..8.
    pub(crate) fn parse(data: &[u8]) -> Self {
        CdromXa {
            group: BigEndian::read_u16(&data[0..2]),
            user: BigEndian::read_u16(&data[2..4]),
            attributes: XaAttributes::from_bits_retain(BigEndian::read_u16(&data[4..6])),
            file_number: data[8],
        }
    }
}

/// CD-i system area following the name in a CD-i directory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CdiSystemArea {
    pub group: u16,
    pub owner: u16,
    pub attributes: CdiAttributes,
    pub file_number: u8,
}

impl CdiSystemArea {
    pub(crate) fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < CDI_SYSTEM_AREA_SIZE {
            return None;
        }
        Some(CdiSystemArea {
            group: BigEndian::read_u16(&data[0..2]),
            owner: BigEndian::read_u16(&data[2..4]),
            attributes: CdiAttributes::from_bits_retain(BigEndian::read_u16(&data[4..6])),
            file_number: data[8],
        })
    }
}

/// Rock Ridge POSIX attributes (PX). `serial` is only present in the
/// 1.12 form of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PosixAttributes {
    pub mode: u32,
    pub links: u32,
    pub uid: u32,
    pub gid: u32,
    pub serial: Option<u32>,
}

/// Rock Ridge device number (PN).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PosixDeviceNumber {
    pub high: u32,
    pub low: u32,
}

impl PosixDeviceNumber {
    pub fn device(&self) -> u64 {
        (u64::from(self.high) << 32) + u64::from(self.low)
    }
}

/// Amiga protection bytes (AS).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AmigaProtection {
    pub user: u8,
    pub reserved: u8,
    pub multi_user: u8,
    pub protection: u8,
}

/// Raw Rock Ridge timestamps (TF), 7-byte or 17-byte encoded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RripTimestamps {
    pub creation: Option<Vec<u8>>,
    pub modification: Option<Vec<u8>>,
    pub access: Option<Vec<u8>>,
    pub attribute_change: Option<Vec<u8>>,
    pub backup: Option<Vec<u8>>,
    pub expiration: Option<Vec<u8>>,
    pub effective: Option<Vec<u8>>,
}

/// Decode a TF stamp in either the short (7-byte) or long (17-byte) form.
pub fn decode_rrip_time(raw: &Option<Vec<u8>>) -> Option<DateTime<Utc>> {
    let raw = raw.as_deref()?;
    if raw.len() >= 17 {
        decode_descriptor_date(raw)
    } else {
        decode_record_date(raw)
    }
}

/// A fully decoded directory entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedDirectoryEntry {
    pub filename: String,
    /// Total data size; for multi-extent files the sum of all extents.
    pub size: u64,
    pub flags: FileFlags,
    /// (first logical block, byte length) in file order.
    pub extents: Vec<(u32, u32)>,
    /// Extended attribute record length in logical blocks.
    pub xattr_length: u8,
    pub file_unit_size: u8,
    pub interleave: u8,
    pub volume_sequence_number: u16,
    pub timestamp: Option<DateTime<Utc>>,

    pub resource_fork: Option<Box<DecodedDirectoryEntry>>,
    pub associated_file: Option<Box<DecodedDirectoryEntry>>,

    pub finder_info: Option<FinderInfo>,
    pub apple_dos_type: Option<u8>,
    pub apple_prodos_type: Option<u16>,
    pub apple_icon: Option<Vec<u8>>,

    pub amiga_protection: Option<AmigaProtection>,
    pub amiga_comment: Option<Vec<u8>>,

    pub posix_attributes: Option<PosixAttributes>,
    pub posix_device: Option<PosixDeviceNumber>,
    pub symbolic_link: Option<String>,
    pub relocated: bool,
    pub rrip_times: RripTimestamps,

    pub cdi: Option<CdiSystemArea>,
    pub xa: Option<CdromXa>,
}

impl DecodedDirectoryEntry {
    pub(crate) fn from_record(record: &RawDirectoryRecord<'_>, filename: String) -> Self {
        DecodedDirectoryEntry {
            filename,
            size: u64::from(record.size),
            flags: FileFlags::from_bits_truncate(record.flags),
            extents: if record.size > 0 {
                vec![(record.extent, record.size)]
            } else {
                Vec::new()
            },
            xattr_length: record.xattr_length,
            file_unit_size: record.file_unit_size,
            interleave: record.interleave,
            volume_sequence_number: record.volume_sequence_number,
            timestamp: record.timestamp,
            ..Default::default()
        }
    }

    /// Primary entry created when an associated file shows up before (or
    /// without) the file it belongs to.
    pub(crate) fn placeholder_for(associated: &DecodedDirectoryEntry) -> Self {
        DecodedDirectoryEntry {
            filename: associated.filename.clone(),
            file_unit_size: associated.file_unit_size,
            interleave: associated.interleave,
            volume_sequence_number: associated.volume_sequence_number,
            timestamp: associated.timestamp,
            xattr_length: associated.xattr_length,
            ..Default::default()
        }
    }

    pub fn is_directory(&self) -> bool {
        self.flags.contains(FileFlags::DIRECTORY)
    }

    pub fn is_digital_audio(&self) -> bool {
        self.cdi
            .is_some_and(|cdi| cdi.attributes.contains(CdiAttributes::DIGITAL_AUDIO))
    }

    pub fn is_interleaved(&self) -> bool {
        self.xa
            .is_some_and(|xa| xa.attributes.contains(XaAttributes::INTERLEAVED))
    }

    /// File number used to pick this file's sectors out of an interleave.
    pub fn file_number(&self) -> u8 {
        match (self.xa, self.cdi) {
            (Some(xa), _) => xa.file_number,
            (None, Some(cdi)) => cdi.file_number,
            _ => 0,
        }
    }

    /// Bytes a reader sees. CD-i audio is read as raw 2352-byte sectors
    /// while its recorded size counts 2048-byte blocks.
    pub fn data_length(&self) -> u64 {
        if self.is_digital_audio() {
            self.size.div_ceil(2048) * 2352
        } else {
            self.size
        }
    }

    /// Extents of the file data proper. The extended attribute record, if
    /// any, occupies the first `xattr_length` blocks of the first extent.
    pub(crate) fn data_extents(&self) -> Vec<(u32, u32)> {
        let mut extents = self.extents.clone();
        if let Some(first) = extents.first_mut() {
            first.0 += u32::from(self.xattr_length);
        }
        extents
    }

    /// Add the next extent of a multi-extent file.
    pub(crate) fn append_extents(&mut self, next: DecodedDirectoryEntry) {
        self.extents.extend(next.extents);
        self.size += next.size;
    }

    /// Fold a later record with the same name into this one. A placeholder
    /// (no data yet) adopts the record but keeps its forks.
    pub(crate) fn absorb(&mut self, next: DecodedDirectoryEntry) {
        if self.extents.is_empty() && self.size == 0 {
            let resource_fork = self.resource_fork.take();
            let associated_file = self.associated_file.take();
            *self = next;
            if self.resource_fork.is_none() {
                self.resource_fork = resource_fork;
            }
            if self.associated_file.is_none() {
                self.associated_file = associated_file;
            }
        } else {
            self.append_extents(next);
        }
    }
}
