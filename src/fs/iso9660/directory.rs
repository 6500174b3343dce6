//! Directory decoding: directory records to a name-keyed entry map.

use std::collections::BTreeMap;

use log::{debug, trace, warn};

use super::consts::{CDI_SYSTEM_AREA_SIZE, DIRECTORY_RECORD_SIZE, TRANS_TABLE_NAME};
use super::entry::{CdiAttributes, CdiSystemArea, DecodedDirectoryEntry, FileFlags};
use super::extent::Volume;
use super::options::{DecodeSettings, Namespace};
use super::path_table::{self, PathTableEntry};
use super::record::{DirectoryFormat, RawDirectoryRecord};
use super::susp;
use crate::fs::filesystem::FilesystemError;

pub(crate) type DirectoryMap = BTreeMap<String, DecodedDirectoryEntry>;

/// Decode the directory stored at `extent` (`size` bytes).
pub(crate) fn decode_directory(
    volume: &mut Volume,
    settings: &DecodeSettings,
    extent: u32,
    size: u32,
) -> Result<DirectoryMap, FilesystemError> {
    let mut entries = DirectoryMap::new();
    if size == 0 {
        return Ok(entries);
    }
    let data = volume.read_with_extents(0, u64::from(size), &[(extent, size)], false, 0)?;
    let block = volume.block_size() as usize;

    let mut off = 0;
    while off + DIRECTORY_RECORD_SIZE <= data.len() {
        // Records never span blocks; a zero length byte pads to the next one.
        if data[off] == 0 {
            off = (off / block + 1) * block;
            continue;
        }
        let Some(record) = settings.format.parse_record(&data[off..]) else {
            debug!("malformed directory record at offset {off} of block {extent}");
            off = (off / block + 1) * block;
            continue;
        };
        off += record.length;
        if record.is_self_or_parent() {
            continue;
        }

        let decoded = match settings.format {
            DirectoryFormat::Cdi => decode_cdi_record(settings, &record),
            DirectoryFormat::Iso9660 | DirectoryFormat::HighSierra => {
                decode_susp_record(volume, settings, &record)?
            }
        };
        if let Some((entry, has_resource_fork)) = decoded {
            trace!("decoded {:?} ({} bytes)", entry.filename, entry.size);
            merge_entry(&mut entries, entry, has_resource_fork);
        }
    }

    if settings.use_trans_tbl {
        apply_trans_table(volume, &mut entries)?;
    }
    if settings.namespace == Namespace::Rrip && !settings.debug {
        entries.retain(|_, entry| !entry.relocated);
    }
    Ok(entries)
}

fn decode_susp_record(
    volume: &mut Volume,
    settings: &DecodeSettings,
    record: &RawDirectoryRecord<'_>,
) -> Result<Option<(DecodedDirectoryEntry, bool)>, FilesystemError> {
    let name = settings.normalize_name(&settings.decode_name(record.name));
    let mut entry = DecodedDirectoryEntry::from_record(record, name);
    if entry.is_directory() && settings.use_path_table {
        return Ok(None);
    }
    let system_use = record.system_use.get(settings.susp_skip..).unwrap_or(&[]);
    let outcome = susp::decode_system_use(volume, settings, system_use, &mut entry)?;
    Ok(Some((entry, outcome.has_resource_fork)))
}

fn decode_cdi_record(
    settings: &DecodeSettings,
    record: &RawDirectoryRecord<'_>,
) -> Option<(DecodedDirectoryEntry, bool)> {
    let name = settings.normalize_name(&settings.decode_name(record.name));
    let mut entry = DecodedDirectoryEntry::from_record(record, name);
    // Only the hidden bit of the CD-i flags byte maps onto file flags.
    entry.flags &= FileFlags::HIDDEN;
    if record.system_use.len() >= CDI_SYSTEM_AREA_SIZE {
        entry.cdi = CdiSystemArea::parse(record.system_use);
    }
    if entry
        .cdi
        .is_some_and(|cdi| cdi.attributes.contains(CdiAttributes::DIRECTORY))
    {
        entry.flags |= FileFlags::DIRECTORY;
    }
    if entry.is_directory() && settings.use_path_table {
        return None;
    }
    Some((entry, false))
}

/// Insert `entry`, folding associated files into their primary and
/// multi-extent continuations into the first record of the same name.
pub(crate) fn merge_entry(
    entries: &mut DirectoryMap,
    entry: DecodedDirectoryEntry,
    has_resource_fork: bool,
) {
    if entry.flags.contains(FileFlags::ASSOCIATED) {
        let primary = entries
            .entry(entry.filename.clone())
            .or_insert_with(|| DecodedDirectoryEntry::placeholder_for(&entry));
        let slot = if has_resource_fork {
            &mut primary.resource_fork
        } else {
            &mut primary.associated_file
        };
        match slot {
            Some(existing) => existing.append_extents(entry),
            None => *slot = Some(Box::new(entry)),
        }
        return;
    }
    match entries.get_mut(&entry.filename) {
        Some(existing) => existing.absorb(entry),
        None => {
            entries.insert(entry.filename.clone(), entry);
        }
    }
}

/// Key used to match TRANS.TBL names against decoded names.
fn comparable(name: &str) -> String {
    let mut name = name.to_lowercase();
    if name.ends_with(";1") {
        name.truncate(name.len() - 2);
    }
    if name.ends_with('.') {
        name.pop();
    }
    name
}

fn is_trans_table(name: &str) -> bool {
    comparable(name) == TRANS_TABLE_NAME
}

/// Parse one TRANS.TBL line into (original identifier, long name).
fn parse_trans_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_end_matches('\r');
    let mut chars = line.chars();
    let kind = chars.next()?;
    let rest = chars.as_str().trim_start();
    let (original, long_name) = rest.split_once(char::is_whitespace)?;
    let mut long_name = long_name.trim_start();
    if kind == 'L' {
        // Link lines carry "name<TAB>target".
        long_name = long_name.split('\t').next().unwrap_or(long_name);
    }
    let long_name = long_name.trim_end();
    if original.is_empty() || long_name.is_empty() {
        return None;
    }
    Some((original, long_name))
}

/// Rename entries per a `TRANS.TBL` file in the directory, then hide the table.
fn apply_trans_table(
    volume: &mut Volume,
    entries: &mut DirectoryMap,
) -> Result<(), FilesystemError> {
    let Some(key) = entries
        .iter()
        .find(|(name, entry)| is_trans_table(name) && !entry.is_directory())
        .map(|(name, _)| name.clone())
    else {
        return Ok(());
    };
    let Some(table) = entries.remove(&key) else {
        return Ok(());
    };

    let data = volume.read_with_extents(
        0,
        table.size,
        &table.extents,
        table.is_interleaved(),
        table.file_number(),
    )?;
    let text = String::from_utf8_lossy(&data);

    for line in text.lines() {
        let Some((original, long_name)) = parse_trans_line(line) else {
            continue;
        };
        let wanted = comparable(original);
        let Some(current) = entries
            .keys()
            .find(|name| comparable(name) == wanted)
            .cloned()
        else {
            trace!("TRANS.TBL names missing entry {original}");
            continue;
        };
        if let Some(mut entry) = entries.remove(&current) {
            entry.filename = long_name.to_string();
            entries.insert(entry.filename.clone(), entry);
        }
    }
    Ok(())
}

/// Subdirectories of `components` (lower-cased path components) taken from
/// the path table. Each child's `.` record supplies size, dates and system
/// use data.
pub(crate) fn path_table_subdirectories(
    volume: &mut Volume,
    settings: &DecodeSettings,
    table: &[PathTableEntry],
    components: &[&str],
) -> Result<Vec<DecodedDirectoryEntry>, FilesystemError> {
    let Some(parent) =
        path_table::find_directory(table, components, |name| settings.normalize_name(name))
    else {
        warn!("directory /{} not found in path table", components.join("/"));
        return Ok(Vec::new());
    };

    let children: Vec<PathTableEntry> = path_table::children(table, parent)
        .map(|(_, entry)| entry.clone())
        .collect();

    let mut subdirectories = Vec::with_capacity(children.len());
    for child in children {
        let block = volume.read_block(child.extent, false, 0)?;
        let Some(record) = settings.format.parse_record(&block) else {
            warn!("path table entry {} has no directory record", child.name);
            continue;
        };
        let name = settings.normalize_name(&child.name);
        let mut entry = DecodedDirectoryEntry::from_record(&record, name);
        entry.flags |= FileFlags::DIRECTORY;
        entry.xattr_length = child.xattr_length;
        if !entry.extents.is_empty() {
            entry.extents = vec![(child.extent, record.size)];
        }

        match settings.format {
            DirectoryFormat::Cdi => entry.cdi = CdiSystemArea::parse(record.system_use),
            DirectoryFormat::Iso9660 | DirectoryFormat::HighSierra => {
                let system_use = record.system_use.get(settings.susp_skip..).unwrap_or(&[]);
                let keep = entry.filename.clone();
                susp::decode_system_use(volume, settings, system_use, &mut entry)?;
                // A `.` record's NM names the directory itself, not the child.
                entry.filename = keep;
            }
        }
        subdirectories.push(entry);
    }
    Ok(subdirectories)
}
