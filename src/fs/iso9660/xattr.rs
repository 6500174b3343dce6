//! Extended attributes exposed for entries.

use super::consts::*;
use super::entry::DecodedDirectoryEntry;
use super::extent::Volume;
use crate::fs::filesystem::FilesystemError;
use crate::optical::sector;

/// Read the data of a fork or associated file.
pub(crate) fn read_whole(
    volume: &mut Volume,
    entry: &DecodedDirectoryEntry,
) -> Result<Vec<u8>, FilesystemError> {
    volume.read_with_extents(
        0,
        entry.size,
        &entry.data_extents(),
        entry.is_interleaved(),
        entry.file_number(),
    )
}

fn first_subheaders(volume: &mut Volume, entry: &DecodedDirectoryEntry) -> bool {
    entry
        .extents
        .first()
        .and_then(|&(extent, _)| volume.read_raw_block(extent))
        .is_some_and(|raw| sector::subheaders(&raw).is_some())
}

pub(crate) fn list(volume: &mut Volume, entry: &DecodedDirectoryEntry) -> Vec<String> {
    let mut names = Vec::new();
    let present = |fork: &Option<Box<DecodedDirectoryEntry>>| fork.as_ref().is_some_and(|f| f.size > 0);

    if entry.xattr_length > 0 {
        names.push(XATTR_ISO_EA);
    }
    if present(&entry.associated_file) {
        names.push(XATTR_ASSOCIATED_FILE);
    }
    if entry.apple_dos_type.is_some() {
        names.push(XATTR_DOS_TYPE);
    }
    if entry.apple_prodos_type.is_some() {
        names.push(XATTR_PRODOS_TYPE);
    }
    if present(&entry.resource_fork) {
        names.push(XATTR_RESOURCE_FORK);
    }
    if entry.finder_info.is_some() {
        names.push(XATTR_FINDER_INFO);
    }
    if entry.apple_icon.is_some() {
        names.push(XATTR_MAC_ICON);
    }
    if entry.amiga_comment.is_some() {
        names.push(XATTR_AMIGA_COMMENT);
    }
    if !entry.is_directory() && first_subheaders(volume, entry) {
        names.push(XATTR_MODE2_SUBHEADER);
        names.push(XATTR_MODE2_SUBHEADER_COPY);
    }
    names.into_iter().map(String::from).collect()
}

/// Concatenated Mode 2 subheaders of every block of the entry.
fn subheaders(
    volume: &mut Volume,
    entry: &DecodedDirectoryEntry,
    copy: bool,
) -> Option<Vec<u8>> {
    let block = u64::from(volume.block_size());
    let mut out = Vec::new();
    for &(extent, length) in &entry.extents {
        let blocks = u64::from(length).div_ceil(block) as u32;
        for lba in extent..extent + blocks {
            let raw = volume.read_raw_block(lba)?;
            let (first, second) = sector::subheaders(&raw)?;
            out.extend_from_slice(if copy { &second } else { &first });
        }
    }
    (!out.is_empty()).then_some(out)
}

pub(crate) fn get(
    volume: &mut Volume,
    entry: &DecodedDirectoryEntry,
    name: &str,
) -> Result<Vec<u8>, FilesystemError> {
    let missing = || FilesystemError::NoSuchExtendedAttribute(name.to_string());
    match name {
        XATTR_ISO_EA => {
            let &(extent, _) = entry.extents.first().ok_or_else(missing)?;
            if entry.xattr_length == 0 {
                return Err(missing());
            }
            let len = u32::from(entry.xattr_length) * volume.block_size();
            volume.read_with_extents(0, u64::from(len), &[(extent, len)], false, 0)
        }
        XATTR_ASSOCIATED_FILE => match &entry.associated_file {
            Some(file) if file.size > 0 => read_whole(volume, file),
            _ => Err(missing()),
        },
        XATTR_RESOURCE_FORK => match &entry.resource_fork {
            Some(fork) if fork.size > 0 => read_whole(volume, fork),
            _ => Err(missing()),
        },
        XATTR_DOS_TYPE => entry.apple_dos_type.map(|t| vec![t]).ok_or_else(missing),
        XATTR_PRODOS_TYPE => entry
            .apple_prodos_type
            .map(|t| t.to_le_bytes().to_vec())
            .ok_or_else(missing),
        XATTR_FINDER_INFO => entry
            .finder_info
            .map(|f| f.to_bytes().to_vec())
            .ok_or_else(missing),
        XATTR_MAC_ICON => entry.apple_icon.clone().ok_or_else(missing),
        XATTR_AMIGA_COMMENT => entry.amiga_comment.clone().ok_or_else(missing),
        XATTR_MODE2_SUBHEADER | XATTR_MODE2_SUBHEADER_COPY if !entry.is_directory() => {
            subheaders(volume, entry, name == XATTR_MODE2_SUBHEADER_COPY).ok_or_else(missing)
        }
        _ => Err(missing()),
    }
}
