/// A file or directory entry within a mounted filesystem.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub entry_type: EntryType,
    pub size: u64,
    /// First extent (logical block) of the entry's data.
    pub location: u64,
    /// Human-readable modification date string.
    pub modified: Option<String>,
    /// Macintosh type code (e.g. "TEXT"), when the entry carries Finder info.
    pub type_code: Option<String>,
    /// Macintosh creator code (e.g. "ttxt").
    pub creator_code: Option<String>,
    pub symlink_target: Option<String>,
    /// Kind of special file ("block device", "fifo", ...) for `EntryType::Special`.
    pub special_type: Option<String>,
    /// Unix permission and type bits, when the volume records them.
    pub mode: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    /// Size of the attached resource fork, if any.
    pub resource_fork_size: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryType {
    File,
    Directory,
    Symlink,
    /// Device node, FIFO or socket.
    Special,
}

impl FileEntry {
    pub fn root() -> Self {
        Self::new_directory("/".into(), "/".into(), 0)
    }

    pub fn new_directory(name: String, path: String, location: u64) -> Self {
        Self {
            name,
            path,
            entry_type: EntryType::Directory,
            size: 0,
            location,
            modified: None,
            type_code: None,
            creator_code: None,
            symlink_target: None,
            special_type: None,
            mode: None,
            uid: None,
            gid: None,
            resource_fork_size: None,
        }
    }

    pub fn new_file(name: String, path: String, size: u64, location: u64) -> Self {
        Self {
            entry_type: EntryType::File,
            size,
            ..Self::new_directory(name, path, location)
        }
    }

    pub fn is_directory(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_symlink(&self) -> bool {
        self.entry_type == EntryType::Symlink
    }

    pub fn size_string(&self) -> String {
        if self.is_directory() {
            return String::new();
        }
        format_size(self.size)
    }
}

/// Format a byte count using binary units.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
