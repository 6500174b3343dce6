//! File and filesystem status.

use bitflags::bitflags;
use chrono::{DateTime, Utc};

use super::entry::{decode_rrip_time, CdiAttributes, DecodedDirectoryEntry, FileFlags, XaAttributes};
use crate::fs::apple::FinderFlags;
use crate::fs::unix_common::inode::{unix_file_type, UnixFileType, S_IPERM};

/// Block size reported by `stat`, independent of the volume's logical block size.
pub const STAT_BLOCK_SIZE: u32 = 2048;

bitflags! {
    /// Attributes reported for an entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FileAttributes: u32 {
        const FILE = 1 << 0;
        const DIRECTORY = 1 << 1;
        const HIDDEN = 1 << 2;
        const SYMLINK = 1 << 3;
        const BLOCK_DEVICE = 1 << 4;
        const CHAR_DEVICE = 1 << 5;
        const PIPE = 1 << 6;
        const SOCKET = 1 << 7;
        const ALIAS = 1 << 8;
        const BUNDLE = 1 << 9;
        const HAS_BEEN_INITED = 1 << 10;
        const HAS_CUSTOM_ICON = 1 << 11;
        const HAS_NO_INITS = 1 << 12;
        const SHARED = 1 << 13;
        const STATIONERY = 1 << 14;
        const INTERLEAVED = 1 << 15;
        const ASSOCIATED = 1 << 16;
    }
}

/// Status of one entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileEntryInfo {
    pub attributes: FileAttributes,
    pub length: u64,
    pub blocks: u64,
    pub block_size: u32,
    pub links: u32,
    pub inode: u64,
    /// Permission bits (no file type bits).
    pub mode: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub device_number: Option<u64>,
    pub creation_time: Option<DateTime<Utc>>,
    pub last_write_time: Option<DateTime<Utc>>,
    pub access_time: Option<DateTime<Utc>>,
    pub status_change_time: Option<DateTime<Utc>>,
    pub backup_time: Option<DateTime<Utc>>,
}

/// Status of the mounted filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemInfo {
    /// Longest file name the name space allows.
    pub filename_length: u32,
    pub files: u64,
    pub free_blocks: u64,
    pub blocks: u64,
    pub block_size: u32,
    /// Dialect tag: "ISO9660", "High Sierra Format" or "CD-i".
    pub fs_type: String,
    pub id: String,
}

pub(crate) fn attributes_of(entry: &DecodedDirectoryEntry) -> FileAttributes {
    let mut attributes = FileAttributes::empty();
    if entry.is_directory() {
        attributes |= FileAttributes::DIRECTORY;
    } else {
        attributes |= FileAttributes::FILE;
    }
    if entry.flags.contains(FileFlags::HIDDEN) {
        attributes |= FileAttributes::HIDDEN;
    }
    if entry.flags.contains(FileFlags::ASSOCIATED) {
        attributes |= FileAttributes::ASSOCIATED;
    }
    if entry.is_interleaved() || (entry.file_unit_size > 0 && entry.interleave > 0) {
        attributes |= FileAttributes::INTERLEAVED;
    }

    if let Some(finder) = entry.finder_info {
        let mapping = [
            (FinderFlags::IS_ALIAS, FileAttributes::ALIAS),
            (FinderFlags::HAS_BUNDLE, FileAttributes::BUNDLE),
            (FinderFlags::HAS_BEEN_INITED, FileAttributes::HAS_BEEN_INITED),
            (FinderFlags::HAS_CUSTOM_ICON, FileAttributes::HAS_CUSTOM_ICON),
            (FinderFlags::HAS_NO_INITS, FileAttributes::HAS_NO_INITS),
            (FinderFlags::IS_INVISIBLE, FileAttributes::HIDDEN),
            (FinderFlags::IS_SHARED, FileAttributes::SHARED),
            (FinderFlags::IS_STATIONERY, FileAttributes::STATIONERY),
        ];
        for (flag, attribute) in mapping {
            if finder.flags.contains(flag) {
                attributes |= attribute;
            }
        }
    }

    if let Some(posix) = entry.posix_attributes {
        attributes |= match unix_file_type(posix.mode) {
            UnixFileType::BlockDevice => FileAttributes::BLOCK_DEVICE,
            UnixFileType::CharDevice => FileAttributes::CHAR_DEVICE,
            UnixFileType::Fifo => FileAttributes::PIPE,
            UnixFileType::Socket => FileAttributes::SOCKET,
            UnixFileType::Symlink => FileAttributes::SYMLINK,
            _ => FileAttributes::empty(),
        };
    }
    if entry.symbolic_link.is_some() {
        attributes |= FileAttributes::SYMLINK;
    }
    attributes
}

fn xa_mode(attributes: XaAttributes) -> u32 {
    [
        (XaAttributes::OWNER_READ, 0o400),
        (XaAttributes::OWNER_EXECUTE, 0o100),
        (XaAttributes::GROUP_READ, 0o040),
        (XaAttributes::GROUP_EXECUTE, 0o010),
        (XaAttributes::SYSTEM_READ, 0o004),
        (XaAttributes::SYSTEM_EXECUTE, 0o001),
    ]
    .into_iter()
    .filter(|(flag, _)| attributes.contains(*flag))
    .fold(0, |mode, (_, bits)| mode | bits)
}

fn cdi_mode(attributes: CdiAttributes) -> u32 {
    [
        (CdiAttributes::OWNER_READ, 0o400),
        (CdiAttributes::OWNER_EXECUTE, 0o100),
        (CdiAttributes::GROUP_READ, 0o040),
        (CdiAttributes::GROUP_EXECUTE, 0o010),
        (CdiAttributes::OTHER_READ, 0o004),
        (CdiAttributes::OTHER_EXECUTE, 0o001),
    ]
    .into_iter()
    .filter(|(flag, _)| attributes.contains(*flag))
    .fold(0, |mode, (_, bits)| mode | bits)
}

pub(crate) fn stat_entry(entry: &DecodedDirectoryEntry) -> FileEntryInfo {
    let length = entry.data_length();
    let mut info = FileEntryInfo {
        attributes: attributes_of(entry),
        length,
        blocks: length.div_ceil(u64::from(STAT_BLOCK_SIZE)),
        block_size: STAT_BLOCK_SIZE,
        links: 1,
        inode: entry.extents.first().map_or(0, |&(extent, _)| u64::from(extent)),
        last_write_time: entry.timestamp,
        ..Default::default()
    };

    if let Some(xa) = entry.xa {
        info.uid = Some(u32::from(xa.user));
        info.gid = Some(u32::from(xa.group));
        info.mode = Some(xa_mode(xa.attributes));
    }
    if let Some(cdi) = entry.cdi {
        info.uid = Some(u32::from(cdi.owner));
        info.gid = Some(u32::from(cdi.group));
        info.mode = Some(cdi_mode(cdi.attributes));
    }
    if let Some(posix) = entry.posix_attributes {
        info.mode = Some(posix.mode & S_IPERM);
        info.links = posix.links.max(1);
        info.uid = Some(posix.uid);
        info.gid = Some(posix.gid);
        if let Some(serial) = posix.serial {
            info.inode = u64::from(serial);
        }
    }
    if let Some(device) = entry.posix_device {
        info.device_number = Some(device.device());
    }

    let times = &entry.rrip_times;
    if let Some(t) = decode_rrip_time(&times.modification) {
        info.last_write_time = Some(t);
    }
    info.creation_time = decode_rrip_time(&times.creation);
    info.access_time = decode_rrip_time(&times.access);
    info.status_change_time = decode_rrip_time(&times.attribute_change);
    info.backup_time = decode_rrip_time(&times.backup);
    info
}
