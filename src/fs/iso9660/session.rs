//! A mounted volume: the settings fixed at mount, the root, the path table
//! and the cache of decoded directories.

use std::collections::HashMap;

use log::{debug, info, warn};

use super::directory::{self, DirectoryMap};
use super::entry::{CdiSystemArea, DecodedDirectoryEntry, FileFlags};
use super::extent::Volume;
use super::options::{DecodeSettings, MountOptions, Namespace, TextEncoding};
use super::path_table::{self, PathTableEntry};
use super::record::DirectoryFormat;
use super::susp::{self, ExtensionReference};
use super::volume::{self, BootRecord, DecodedVolumeDescriptor, VolumePartition};
use crate::fs::filesystem::FilesystemError;
use crate::optical::SectorReader;

/// What was found and decided while mounting.
#[derive(Debug, Clone)]
pub struct VolumeInfo {
    pub format: DirectoryFormat,
    /// Name space in effect after fallbacks.
    pub namespace: Namespace,
    /// The descriptor whose hierarchy is mounted.
    pub descriptor: DecodedVolumeDescriptor,
    pub has_joliet: bool,
    pub has_enhanced: bool,
    /// Rock Ridge was detected in the root directory.
    pub rock_ridge: bool,
    pub susp_references: Vec<ExtensionReference>,
    pub boot: Option<BootRecord>,
    pub partitions: Vec<VolumePartition>,
    /// Subdirectories come from the path table (requested, forced by a
    /// root mismatch, or CD-i).
    pub uses_path_table: bool,
    /// The root directory record disagreed with the path table and the
    /// path table root was used.
    pub root_from_path_table: bool,
}

struct RootLocation {
    extent: u32,
    size: u32,
    xattr_length: u8,
    from_path_table: bool,
}

pub(crate) struct MountSession {
    pub volume: Volume,
    pub settings: DecodeSettings,
    pub info: VolumeInfo,
    pub root: DecodedDirectoryEntry,
    path_table: Option<Vec<PathTableEntry>>,
    root_directory: DirectoryMap,
    cache: HashMap<String, DirectoryMap>,
}

impl MountSession {
    pub fn mount(
        media: Box<dyn SectorReader>,
        partition_start: u64,
        encoding: TextEncoding,
        options: &MountOptions,
        namespace: Namespace,
    ) -> Result<Self, FilesystemError> {
        let mut volume = Volume::new(media, partition_start);
        let set = volume::scan_descriptors(&mut volume, encoding)?;
        let format = set.format;

        let use_evd = options.use_evd && set.enhanced.is_some();
        if options.use_evd && !use_evd {
            debug!("no enhanced volume descriptor, using the primary one");
        }
        let mut namespace = namespace;
        if namespace == Namespace::Joliet && (set.joliet.is_none() || use_evd) {
            debug!("Joliet hierarchy not used, falling back to normal names");
            namespace = Namespace::Normal;
        }
        let joliet = namespace == Namespace::Joliet;
        let alternate = if joliet {
            set.joliet.clone()
        } else if use_evd {
            set.enhanced.clone()
        } else {
            None
        };
        let descriptor = alternate.unwrap_or_else(|| set.primary.clone());
        volume.set_block_size(descriptor.block_size);

        if options.use_path_table && options.use_trans_tbl {
            debug!("TRANS.TBL renaming requested, not listing directories from the path table");
        }
        let mut settings = DecodeSettings {
            format,
            namespace,
            encoding,
            joliet,
            use_path_table: options.use_path_table && !options.use_trans_tbl,
            use_trans_tbl: options.use_trans_tbl,
            susp_skip: 0,
            debug: options.debug,
        };

        let mut path_table = read_path_table(&mut volume, &descriptor, &settings);
        let root = reconcile_root(&mut volume, format, &descriptor, &mut path_table)?;
        if root.from_path_table {
            settings.use_path_table = true;
        }

        let root_block = volume.read_block(root.extent + u32::from(root.xattr_length), false, 0)?;
        let dot = format.parse_record(&root_block).ok_or_else(|| {
            FilesystemError::InvalidArgument("root directory has no self record".into())
        })?;
        let mut root_entry = DecodedDirectoryEntry::from_record(&dot, String::new());
        root_entry.flags |= FileFlags::DIRECTORY;
        root_entry.size = u64::from(root.size);
        root_entry.extents = vec![(root.extent, root.size)];
        root_entry.xattr_length = root.xattr_length;

        let mut rock_ridge = false;
        let mut references = Vec::new();
        match format {
            DirectoryFormat::Cdi => root_entry.cdi = CdiSystemArea::parse(dot.system_use),
            DirectoryFormat::Iso9660 | DirectoryFormat::HighSierra => {
                let outcome =
                    susp::decode_system_use(&mut volume, &settings, dot.system_use, &mut root_entry)?;
                if outcome.susp {
                    settings.susp_skip = usize::from(outcome.skip.unwrap_or(0));
                }
                rock_ridge = outcome.susp && outcome.rock_ridge;
                references = outcome.references;
                root_entry.filename.clear();
            }
        }
        if settings.namespace == Namespace::Rrip && !rock_ridge {
            warn!("no Rock Ridge extensions on this volume, falling back to normal names");
            settings.namespace = Namespace::Normal;
        }

        let root_directory =
            load_directory(&mut volume, &settings, path_table.as_deref(), &root_entry, &[])?;

        info!(
            "mounted {} volume '{}' ({} names, {} root entries)",
            format.name(),
            descriptor.volume_identifier,
            settings.namespace,
            root_directory.len()
        );

        let info = VolumeInfo {
            format,
            namespace: settings.namespace,
            descriptor,
            has_joliet: set.joliet.is_some(),
            has_enhanced: set.enhanced.is_some(),
            rock_ridge,
            susp_references: references,
            boot: set.boot,
            partitions: set.partitions,
            uses_path_table: settings.use_path_table,
            root_from_path_table: root.from_path_table && format != DirectoryFormat::Cdi,
        };
        Ok(MountSession {
            volume,
            settings,
            info,
            root: root_entry,
            path_table,
            root_directory,
            cache: HashMap::new(),
        })
    }

    /// The decoded contents of the directory at `path`, decoding and caching
    /// every directory along the way.
    pub fn directory(&mut self, path: &str) -> Result<&DirectoryMap, FilesystemError> {
        let components = split_path(path)?;
        let key = self.resolve(&components)?;
        if key.is_empty() {
            return Ok(&self.root_directory);
        }
        self.cache
            .get(&key)
            .ok_or_else(|| FilesystemError::NotFound(path.to_string()))
    }

    /// Walk `components` from the root, decoding and caching each directory.
    /// Returns the cache key, built from the names the components matched.
    fn resolve(&mut self, components: &[&str]) -> Result<String, FilesystemError> {
        let mut resolved: Vec<String> = Vec::with_capacity(components.len());
        for component in components {
            let parent_key = resolved.join("/");
            let parent = if parent_key.is_empty() {
                Some(&self.root_directory)
            } else {
                self.cache.get(&parent_key)
            };
            let (name, entry) = parent
                .and_then(|map| find_keyed_entry(map, component))
                .map(|(name, entry)| (name.clone(), entry.clone()))
                .ok_or_else(|| {
                    FilesystemError::NotFound(format!(
                        "/{}",
                        components[..=resolved.len()].join("/")
                    ))
                })?;
            resolved.push(name);
            let current = resolved.join("/");
            if self.cache.contains_key(&current) {
                continue;
            }
            if !entry.is_directory() {
                return Err(FilesystemError::NotADirectory(format!("/{current}")));
            }
            let names: Vec<&str> = resolved.iter().map(String::as_str).collect();
            let map = load_directory(
                &mut self.volume,
                &self.settings,
                self.path_table.as_deref(),
                &entry,
                &names,
            )?;
            debug!("cached /{current} ({} entries)", map.len());
            self.cache.insert(current, map);
        }
        Ok(resolved.join("/"))
    }

    /// The entry at `path`; the root for `/`.
    pub fn file_entry(&mut self, path: &str) -> Result<DecodedDirectoryEntry, FilesystemError> {
        let components = split_path(path)?;
        let Some((name, parent)) = components.split_last() else {
            return Ok(self.root.clone());
        };
        let parent = parent.join("/");
        let directory = self.directory(&parent)?;
        find_entry(directory, name)
            .cloned()
            .ok_or_else(|| FilesystemError::NotFound(path.to_string()))
    }
}

/// Slash-separated path components, without empty or `.` components.
pub(crate) fn split_path(path: &str) -> Result<Vec<&str>, FilesystemError> {
    if path.contains('\0') {
        return Err(FilesystemError::InvalidArgument(
            "path contains a NUL character".into(),
        ));
    }
    Ok(path
        .split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .collect())
}

/// Look up `name`, preferring an exact match over a case-insensitive one.
/// Both passes also match with or without a `;1` version suffix.
pub(crate) fn find_entry<'a>(
    map: &'a DirectoryMap,
    name: &str,
) -> Option<&'a DecodedDirectoryEntry> {
    find_keyed_entry(map, name).map(|(_, entry)| entry)
}

fn find_keyed_entry<'a>(
    map: &'a DirectoryMap,
    name: &str,
) -> Option<(&'a String, &'a DecodedDirectoryEntry)> {
    let exact = move |wanted: &str| map.get_key_value(wanted);
    let folded = move |wanted: &str| {
        let wanted = wanted.to_lowercase();
        map.iter().find(|(key, _)| key.to_lowercase() == wanted)
    };
    with_version_variants(name, exact).or_else(|| with_version_variants(name, folded))
}

fn with_version_variants<T>(name: &str, lookup: impl Fn(&str) -> Option<T>) -> Option<T> {
    lookup(name)
        .or_else(|| name.strip_suffix(";1").and_then(&lookup))
        .or_else(|| lookup(&format!("{name};1")))
}

fn load_directory(
    volume: &mut Volume,
    settings: &DecodeSettings,
    path_table: Option<&[PathTableEntry]>,
    entry: &DecodedDirectoryEntry,
    components: &[&str],
) -> Result<DirectoryMap, FilesystemError> {
    let Some(&(extent, size)) = entry.extents.first() else {
        return Ok(DirectoryMap::new());
    };
    let mut map = directory::decode_directory(
        volume,
        settings,
        extent + u32::from(entry.xattr_length),
        size,
    )?;
    if settings.use_path_table {
        if let Some(table) = path_table {
            for sub in directory::path_table_subdirectories(volume, settings, table, components)? {
                map.insert(sub.filename.clone(), sub);
            }
        }
    }
    Ok(map)
}

fn read_path_table(
    volume: &mut Volume,
    descriptor: &DecodedVolumeDescriptor,
    settings: &DecodeSettings,
) -> Option<Vec<PathTableEntry>> {
    let size = descriptor.path_table_size;
    let location = descriptor.path_table_location;
    if size == 0 || location == 0 {
        return None;
    }
    let data = match volume.read_with_extents(0, u64::from(size), &[(location, size)], false, 0) {
        Ok(data) => data,
        Err(e) => {
            warn!("cannot read path table at block {location}: {e}");
            return None;
        }
    };
    let table = path_table::decode_path_table(&data, settings.format, |b| settings.decode_name(b));
    if table.is_none() {
        warn!("path table at block {location} is malformed, ignoring it");
    }
    table
}

/// Extent and size from the `.` record stored at `extent`, when that record
/// points back at `extent`.
fn verified_directory(volume: &mut Volume, format: DirectoryFormat, extent: u32) -> Option<u32> {
    let block = match volume.read_block(extent, false, 0) {
        Ok(block) => block,
        Err(e) => {
            debug!("cannot read directory at block {extent}: {e}");
            return None;
        }
    };
    format
        .parse_record(&block)
        .filter(|record| record.is_self_or_parent() && record.extent == extent)
        .map(|record| record.size)
}

/// Pick the root directory, cross-checking the descriptor's root record
/// against the path table's first entry.
fn reconcile_root(
    volume: &mut Volume,
    format: DirectoryFormat,
    descriptor: &DecodedVolumeDescriptor,
    path_table: &mut Option<Vec<PathTableEntry>>,
) -> Result<RootLocation, FilesystemError> {
    let table_root = path_table
        .as_ref()
        .and_then(|table| table.first())
        .map(|entry| (entry.extent, entry.xattr_length));

    let Some((extent, size)) = descriptor.root else {
        // CD-i: the path table is the only way to the root.
        let (table_extent, xattr_length) = table_root.ok_or_else(|| {
            FilesystemError::InvalidArgument("volume has no root record and no path table".into())
        })?;
        let size = verified_directory(volume, format, table_extent + u32::from(xattr_length))
            .or_else(|| verified_directory(volume, format, table_extent))
            .ok_or_else(|| {
                FilesystemError::InvalidArgument(format!(
                    "no root directory at path table block {table_extent}"
                ))
            })?;
        return Ok(RootLocation {
            extent: table_extent,
            size,
            xattr_length: 0,
            from_path_table: true,
        });
    };

    let xattr_length = descriptor.root_xattr_length;
    let consistent = verified_directory(volume, format, extent + u32::from(xattr_length)).is_some();
    let descriptor_root = RootLocation {
        extent,
        size,
        xattr_length,
        from_path_table: false,
    };
    match table_root {
        Some((table_extent, _)) if table_extent == extent && consistent => {
            return Ok(descriptor_root)
        }
        None if consistent => return Ok(descriptor_root),
        _ => {}
    }

    if let Some((table_extent, _)) = table_root {
        if let Some(table_size) = verified_directory(volume, format, table_extent) {
            warn!(
                "root directory record (block {extent}) disagrees with the path table \
                 (block {table_extent}), using the path table"
            );
            return Ok(RootLocation {
                extent: table_extent,
                size: table_size,
                xattr_length: 0,
                from_path_table: true,
            });
        }
    }
    if consistent {
        warn!("path table does not lead to a valid root, ignoring it");
        *path_table = None;
        return Ok(descriptor_root);
    }
    Err(FilesystemError::InvalidArgument(
        "root directory could not be located".into(),
    ))
}
