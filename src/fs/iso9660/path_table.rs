//! Path table decoding. The path table lists every directory with its
//! extent and parent index; it doubles as a cross-check for the root and as
//! a directory source when directory records are not trusted.

use byteorder::{BigEndian, ByteOrder};

use super::consts::PATH_TABLE_ENTRY_SIZE;
use super::record::DirectoryFormat;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTableEntry {
    pub extent: u32,
    pub name: String,
    /// 1-based index of the parent entry. The root is its own parent.
    pub parent: u16,
    pub xattr_length: u8,
}

/// Decode a big-endian (M-type) path table.
///
/// Returns `None` unless the first entry is a well-formed root: one-byte
/// NUL name, parent 1. Decoding stops at a zero name length or truncation.
pub fn decode_path_table(
    data: &[u8],
    format: DirectoryFormat,
    decode_name: impl Fn(&[u8]) -> String,
) -> Option<Vec<PathTableEntry>> {
    let mut entries = Vec::new();
    let mut off = 0;

    while off + PATH_TABLE_ENTRY_SIZE <= data.len() {
        let header = &data[off..off + PATH_TABLE_ENTRY_SIZE];
        let (name_len, xattr_length, extent) = match format {
            DirectoryFormat::HighSierra => (
                header[5] as usize,
                header[4],
                BigEndian::read_u32(&header[0..4]),
            ),
            DirectoryFormat::Iso9660 | DirectoryFormat::Cdi => (
                header[0] as usize,
                header[1],
                BigEndian::read_u32(&header[2..6]),
            ),
        };
        let parent = BigEndian::read_u16(&header[6..8]);
        if name_len == 0 {
            break;
        }
        off += PATH_TABLE_ENTRY_SIZE;
        if off + name_len > data.len() {
            break;
        }
        let raw_name = &data[off..off + name_len];

        if entries.is_empty() && (name_len != 1 || parent != 1 || raw_name[0] != 0) {
            return None;
        }

        entries.push(PathTableEntry {
            extent,
            name: if entries.is_empty() {
                String::new()
            } else {
                decode_name(raw_name)
            },
            parent,
            xattr_length,
        });

        off += name_len + (name_len % 2);
    }

    if entries.is_empty() {
        None
    } else {
        Some(entries)
    }
}

/// Direct children of the 1-based entry `parent`, excluding the root's
/// self-reference.
pub fn children(
    table: &[PathTableEntry],
    parent: usize,
) -> impl Iterator<Item = (usize, &PathTableEntry)> {
    table
        .iter()
        .enumerate()
        .map(|(i, entry)| (i + 1, entry))
        .filter(move |(index, entry)| *index != 1 && usize::from(entry.parent) == parent)
}

/// Walk `components` from the root and return the 1-based index of the
/// directory they name. An exact name match wins over a case-insensitive one.
pub fn find_directory(
    table: &[PathTableEntry],
    components: &[&str],
    normalize: impl Fn(&str) -> String,
) -> Option<usize> {
    let mut current = 1;
    for component in components {
        let wanted = component.to_lowercase();
        let mut folded = None;
        let mut exact = None;
        for (index, entry) in children(table, current) {
            let name = normalize(&entry.name);
            if name == *component {
                exact = Some(index);
                break;
            }
            if folded.is_none() && name.to_lowercase() == wanted {
                folded = Some(index);
            }
        }
        current = exact.or(folded)?;
    }
    Some(current)
}
