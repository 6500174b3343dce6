//! Unix mode bit helpers for filesystems that record POSIX attributes
//! (ext2/3/4, Rock Ridge extensions on optical media, ...).

use crate::fs::entry::EntryType;

// ---- Unix mode bit masks ----

pub const S_IFMT: u32 = 0o170000;
pub const S_IFSOCK: u32 = 0o140000;
pub const S_IFLNK: u32 = 0o120000;
pub const S_IFREG: u32 = 0o100000;
pub const S_IFBLK: u32 = 0o060000;
pub const S_IFDIR: u32 = 0o040000;
pub const S_IFCHR: u32 = 0o020000;
pub const S_IFIFO: u32 = 0o010000;

/// Permission, setuid/setgid and sticky bits.
pub const S_IPERM: u32 = 0o7777;

/// Unix file type extracted from mode bits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnixFileType {
    Regular,
    Directory,
    Symlink,
    BlockDevice,
    CharDevice,
    Fifo,
    Socket,
    Unknown,
}

/// Extract the file type from raw Unix mode bits.
pub fn unix_file_type(mode: u32) -> UnixFileType {
    match mode & S_IFMT {
        S_IFREG => UnixFileType::Regular,
        S_IFDIR => UnixFileType::Directory,
        S_IFLNK => UnixFileType::Symlink,
        S_IFBLK => UnixFileType::BlockDevice,
        S_IFCHR => UnixFileType::CharDevice,
        S_IFIFO => UnixFileType::Fifo,
        S_IFSOCK => UnixFileType::Socket,
        _ => UnixFileType::Unknown,
    }
}

/// Map raw mode bits to the browsing entry type, plus a label for special files.
pub fn unix_entry_type(mode: u32) -> (EntryType, Option<String>) {
    match unix_file_type(mode) {
        UnixFileType::Regular | UnixFileType::Unknown => (EntryType::File, None),
        UnixFileType::Directory => (EntryType::Directory, None),
        UnixFileType::Symlink => (EntryType::Symlink, None),
        UnixFileType::BlockDevice => (EntryType::Special, Some("block device".to_string())),
        UnixFileType::CharDevice => (EntryType::Special, Some("char device".to_string())),
        UnixFileType::Fifo => (EntryType::Special, Some("fifo".to_string())),
        UnixFileType::Socket => (EntryType::Special, Some("socket".to_string())),
    }
}
