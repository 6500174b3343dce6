//! Read-only ISO9660 filesystem, including High Sierra and CD-i volumes and
//! the Joliet, Rock Ridge, Apple, Amiga and CD-ROM XA extensions.

pub mod consts;
pub mod date;
pub(crate) mod directory;
pub mod entry;
pub(crate) mod extent;
pub mod options;
pub mod path_table;
pub mod record;
pub(crate) mod session;
pub mod stat;
pub mod susp;
pub mod volume;
pub(crate) mod xattr;

use std::io::Write;

use log::debug;

use crate::fs::apple::decode_fourcc;
use crate::fs::entry::{EntryType, FileEntry};
use crate::fs::filesystem::{Filesystem, FilesystemError};
use crate::fs::unix_common::inode::unix_entry_type;
use crate::optical::SectorReader;

pub use consts::{
    XATTR_AMIGA_COMMENT, XATTR_ASSOCIATED_FILE, XATTR_DOS_TYPE, XATTR_FINDER_INFO, XATTR_ISO_EA,
    XATTR_MAC_ICON, XATTR_MODE2_SUBHEADER, XATTR_MODE2_SUBHEADER_COPY, XATTR_PRODOS_TYPE,
    XATTR_RESOURCE_FORK,
};
pub use entry::DecodedDirectoryEntry;
pub use options::{MountOptions, Namespace, TextEncoding};
pub use record::DirectoryFormat;
pub use session::VolumeInfo;
pub use stat::{FileAttributes, FileEntryInfo, FileSystemInfo};

use session::MountSession;

/// Longest name a Joliet hierarchy can record (UCS-2 characters).
const JOLIET_NAME_LIMIT: u32 = 110;
const NAME_LIMIT: u32 = 255;

/// An open directory listing. Names are captured when the directory is
/// opened.
#[derive(Debug, Clone)]
pub struct DirHandle {
    path: String,
    names: Vec<String>,
    position: usize,
}

impl DirHandle {
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// An ISO9660 volume, mounted or not.
#[derive(Default)]
pub struct Iso9660Filesystem {
    session: Option<MountSession>,
}

impl Iso9660Filesystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `media` with default settings: Latin-1 names, no options, the
    /// Joliet name space when the volume has one.
    pub fn open<S: SectorReader + 'static>(media: S) -> Result<Self, FilesystemError> {
        let mut fs = Self::new();
        fs.mount(
            Box::new(media),
            0,
            TextEncoding::default(),
            &MountOptions::default(),
            Namespace::default(),
        )?;
        Ok(fs)
    }

    /// Mount the volume starting at sector `partition` of `media`.
    ///
    /// Nothing changes on failure: a failed mount leaves the filesystem
    /// unmounted.
    pub fn mount(
        &mut self,
        media: Box<dyn SectorReader>,
        partition: u64,
        encoding: TextEncoding,
        options: &MountOptions,
        namespace: Namespace,
    ) -> Result<(), FilesystemError> {
        if self.session.is_some() {
            return Err(FilesystemError::InvalidArgument(
                "volume already mounted".into(),
            ));
        }
        let session = MountSession::mount(media, partition, encoding, options, namespace)?;
        self.session = Some(session);
        Ok(())
    }

    pub fn unmount(&mut self) -> Result<(), FilesystemError> {
        self.session
            .take()
            .map(|_| ())
            .ok_or(FilesystemError::AccessDenied)
    }

    pub fn is_mounted(&self) -> bool {
        self.session.is_some()
    }

    fn session(&self) -> Result<&MountSession, FilesystemError> {
        self.session.as_ref().ok_or(FilesystemError::AccessDenied)
    }

    fn session_mut(&mut self) -> Result<&mut MountSession, FilesystemError> {
        self.session.as_mut().ok_or(FilesystemError::AccessDenied)
    }

    pub fn volume_info(&self) -> Result<&VolumeInfo, FilesystemError> {
        Ok(&self.session()?.info)
    }

    pub fn stat_fs(&self) -> Result<FileSystemInfo, FilesystemError> {
        let session = self.session()?;
        let info = &session.info;
        Ok(FileSystemInfo {
            filename_length: if info.namespace == Namespace::Joliet {
                JOLIET_NAME_LIMIT
            } else {
                NAME_LIMIT
            },
            files: 0,
            free_blocks: 0,
            blocks: info.descriptor.blocks,
            block_size: session.volume.block_size(),
            fs_type: info.format.name().to_string(),
            id: info.descriptor.volume_identifier.clone(),
        })
    }

    /// The decoded entry at `path`.
    pub fn entry(&mut self, path: &str) -> Result<DecodedDirectoryEntry, FilesystemError> {
        self.session_mut()?.file_entry(path)
    }

    /// Names and decoded entries of the directory at `path`, in name order.
    pub fn directory(
        &mut self,
        path: &str,
    ) -> Result<Vec<(String, DecodedDirectoryEntry)>, FilesystemError> {
        let map = self.session_mut()?.directory(path)?;
        Ok(map
            .iter()
            .map(|(name, entry)| (name.clone(), entry.clone()))
            .collect())
    }

    pub fn open_dir(&mut self, path: &str) -> Result<DirHandle, FilesystemError> {
        let names = self.session_mut()?.directory(path)?.keys().cloned().collect();
        Ok(DirHandle {
            path: path.to_string(),
            names,
            position: 0,
        })
    }

    /// The next name in `handle`, or `None` at the end of the directory.
    pub fn read_dir(&mut self, handle: &mut DirHandle) -> Result<Option<String>, FilesystemError> {
        self.session()?;
        let name = handle.names.get(handle.position).cloned();
        if name.is_some() {
            handle.position += 1;
        }
        Ok(name)
    }

    pub fn close_dir(&mut self, handle: DirHandle) -> Result<(), FilesystemError> {
        self.session()?;
        drop(handle);
        Ok(())
    }

    pub fn stat(&mut self, path: &str) -> Result<FileEntryInfo, FilesystemError> {
        let entry = self.entry(path)?;
        Ok(stat::stat_entry(&entry))
    }

    pub fn get_attributes(&mut self, path: &str) -> Result<FileAttributes, FilesystemError> {
        let entry = self.entry(path)?;
        Ok(stat::attributes_of(&entry))
    }

    pub fn read_link(&mut self, path: &str) -> Result<String, FilesystemError> {
        self.entry(path)?.symbolic_link.ok_or_else(|| {
            FilesystemError::InvalidArgument(format!("{path} is not a symbolic link"))
        })
    }

    /// Read up to `size` bytes of the file at `path`, starting at `offset`.
    ///
    /// Reading at the end of a file returns no data; past it is an error.
    pub fn read(&mut self, path: &str, offset: u64, size: u64) -> Result<Vec<u8>, FilesystemError> {
        let session = self.session_mut()?;
        let entry = session.file_entry(path)?;
        if entry.is_directory() && !session.settings.debug {
            return Err(FilesystemError::IsADirectory(path.to_string()));
        }
        let length = entry.data_length();
        if offset > length {
            return Err(FilesystemError::InvalidArgument(format!(
                "offset {offset} is past the end of {path} ({length} bytes)"
            )));
        }
        let size = size.min(length - offset);
        if size == 0 {
            return Ok(Vec::new());
        }
        if entry.file_unit_size > 0 && entry.interleave > 0 {
            return Err(FilesystemError::NotImplemented(format!(
                "{path} is recorded in interleaved file units"
            )));
        }
        if entry.is_digital_audio() && entry.extents.len() == 1 {
            let (extent, _) = entry.extents[0];
            return session.volume.read_digital_audio(extent, offset, size);
        }
        session.volume.read_with_extents(
            offset,
            size,
            &entry.data_extents(),
            entry.is_interleaved(),
            entry.file_number(),
        )
    }

    pub fn list_xattr(&mut self, path: &str) -> Result<Vec<String>, FilesystemError> {
        let session = self.session_mut()?;
        let entry = session.file_entry(path)?;
        Ok(xattr::list(&mut session.volume, &entry))
    }

    pub fn get_xattr(&mut self, path: &str, name: &str) -> Result<Vec<u8>, FilesystemError> {
        let session = self.session_mut()?;
        let entry = session.file_entry(path)?;
        xattr::get(&mut session.volume, &entry, name)
    }

    fn file_entry_for(name: &str, path: String, entry: &DecodedDirectoryEntry) -> FileEntry {
        let location = entry.extents.first().map_or(0, |&(e, _)| u64::from(e));
        let mut fe = if entry.is_directory() {
            FileEntry::new_directory(name.to_string(), path, location)
        } else {
            FileEntry::new_file(name.to_string(), path, entry.data_length(), location)
        };
        fe.modified = entry
            .timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string());
        if let Some(posix) = entry.posix_attributes {
            let (entry_type, special) = unix_entry_type(posix.mode);
            if !entry.is_directory() {
                fe.entry_type = entry_type;
                fe.special_type = special;
            }
            fe.mode = Some(posix.mode);
            fe.uid = Some(posix.uid);
            fe.gid = Some(posix.gid);
        }
        if let Some(target) = &entry.symbolic_link {
            fe.entry_type = EntryType::Symlink;
            fe.symlink_target = Some(target.clone());
        }
        if let Some(finder) = entry.finder_info {
            fe.type_code = Some(decode_fourcc(&finder.file_type));
            fe.creator_code = Some(decode_fourcc(&finder.creator));
        }
        fe.resource_fork_size = entry
            .resource_fork
            .as_ref()
            .filter(|fork| fork.size > 0)
            .map(|fork| fork.size);
        fe
    }
}

impl Filesystem for Iso9660Filesystem {
    fn root(&mut self) -> Result<FileEntry, FilesystemError> {
        let session = self.session()?;
        let mut root = Self::file_entry_for("/", "/".into(), &session.root);
        root.name = session.info.descriptor.volume_identifier.clone();
        Ok(root)
    }

    fn list_directory(&mut self, entry: &FileEntry) -> Result<Vec<FileEntry>, FilesystemError> {
        if !entry.is_directory() {
            return Err(FilesystemError::NotADirectory(entry.path.clone()));
        }
        let parent = entry.path.trim_end_matches('/');
        Ok(self
            .directory(&entry.path)?
            .iter()
            .map(|(name, decoded)| Self::file_entry_for(name, format!("{parent}/{name}"), decoded))
            .collect())
    }

    fn read_file(
        &mut self,
        entry: &FileEntry,
        max_bytes: usize,
    ) -> Result<Vec<u8>, FilesystemError> {
        self.read(&entry.path, 0, max_bytes as u64)
    }

    fn volume_label(&self) -> Option<&str> {
        self.session
            .as_ref()
            .map(|s| s.info.descriptor.volume_identifier.as_str())
    }

    fn fs_type(&self) -> &str {
        self.session
            .as_ref()
            .map_or(DirectoryFormat::Iso9660.name(), |s| s.info.format.name())
    }

    fn total_size(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| {
            s.info.descriptor.blocks * u64::from(s.info.descriptor.block_size)
        })
    }

    /// Read-only media has no free space.
    fn used_size(&self) -> u64 {
        self.total_size()
    }

    fn write_resource_fork_to(
        &mut self,
        entry: &FileEntry,
        writer: &mut dyn Write,
    ) -> Result<u64, FilesystemError> {
        let session = self.session_mut()?;
        let decoded = session.file_entry(&entry.path)?;
        let Some(fork) = decoded.resource_fork.filter(|fork| fork.size > 0) else {
            return Ok(0);
        };
        let data = xattr::read_whole(&mut session.volume, &fork)?;
        writer.write_all(&data)?;
        debug!("wrote {} byte resource fork of {}", data.len(), entry.path);
        Ok(data.len() as u64)
    }

    fn resource_fork_size(&mut self, entry: &FileEntry) -> u64 {
        match self.entry(&entry.path) {
            Ok(decoded) => decoded.resource_fork.map_or(0, |fork| fork.size),
            Err(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmounted_operations_are_denied() {
        let mut fs = Iso9660Filesystem::new();
        assert!(!fs.is_mounted());
        assert!(matches!(fs.stat_fs(), Err(FilesystemError::AccessDenied)));
        assert!(matches!(fs.stat("/A"), Err(FilesystemError::AccessDenied)));
        assert!(matches!(fs.read("/A", 0, 1), Err(FilesystemError::AccessDenied)));
        assert!(matches!(fs.open_dir("/"), Err(FilesystemError::AccessDenied)));
        assert!(matches!(fs.list_xattr("/"), Err(FilesystemError::AccessDenied)));
        assert!(matches!(fs.unmount(), Err(FilesystemError::AccessDenied)));
        assert!(fs.volume_label().is_none());
        assert_eq!(fs.total_size(), 0);
    }

    #[test]
    fn test_file_entry_conversion() {
        let mut decoded = DecodedDirectoryEntry {
            filename: "README".into(),
            size: 12,
            extents: vec![(30, 12)],
            ..Default::default()
        };
        decoded.symbolic_link = Some("../target".into());
        let fe = Iso9660Filesystem::file_entry_for("README", "/README".into(), &decoded);
        assert!(fe.is_symlink());
        assert_eq!(fe.symlink_target.as_deref(), Some("../target"));
        assert_eq!(fe.location, 30);
        assert_eq!(fe.size, 12);
    }
}
