pub mod apple;
pub mod entry;
pub mod filesystem;
pub mod iso9660;
pub mod unix_common;

use std::path::Path;

use filesystem::{Filesystem, FilesystemError};
use iso9660::{Iso9660Filesystem, MountOptions, Namespace, TextEncoding};

use crate::optical::{RawImage, SectorReader};

/// Open a filesystem for browsing, starting at sector `partition_start` of
/// `media`.
///
/// The volume is mounted with default options and the Joliet name space
/// when available.
pub fn open_filesystem<S: SectorReader + 'static>(
    media: S,
    partition_start: u64,
) -> Result<Box<dyn Filesystem>, FilesystemError> {
    let mut fs = Iso9660Filesystem::new();
    fs.mount(
        Box::new(media),
        partition_start,
        TextEncoding::default(),
        &MountOptions::default(),
        Namespace::default(),
    )?;
    Ok(Box::new(fs))
}

/// Open a disc image file (`.iso`, or a raw `.bin` with 2352-byte sectors).
pub fn open_image(path: &Path) -> Result<Box<dyn Filesystem>, FilesystemError> {
    let image = RawImage::open_path(path)?;
    open_filesystem(image, 0)
}
