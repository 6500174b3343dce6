//! System Use area decoding: SUSP framing plus the Rock Ridge, Apple,
//! Amiga and CD-ROM XA records that travel inside it.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::{debug, trace, warn};

use super::consts::*;
use super::entry::{
    AmigaProtection, CdromXa, DecodedDirectoryEntry, FileFlags, PosixAttributes,
    PosixDeviceNumber,
};
use super::extent::Volume;
use super::options::{DecodeSettings, Namespace};
use crate::fs::apple::FinderInfo;
use crate::fs::filesystem::FilesystemError;

/// An extension announced by an ER record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionReference {
    pub identifier: String,
    pub descriptor: String,
    pub source: String,
    pub version: u8,
}

impl ExtensionReference {
    pub fn is_rock_ridge(&self) -> bool {
        RRIP_IDENTIFIERS.contains(&self.identifier.as_str())
    }
}

/// One record from a system use area.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SystemUseField<'a> {
    Xa(CdromXa),
    Continuation { block: u32, offset: u32, length: u32 },
    Indicator { skip: u8 },
    Terminator,
    Reference(ExtensionReference),
    Selector,
    Padding,
    RockRidge,
    Posix(PosixAttributes),
    DeviceNumber(PosixDeviceNumber),
    SymbolicLink { continues: bool, components: &'a [u8] },
    AlternateName { flags: u8, name: &'a [u8] },
    ChildLink { location: u32 },
    ParentLink,
    Relocated,
    Timestamps { flags: u8, data: &'a [u8] },
    Sparse,
    Zisofs,
    Aaip,
    Amiga {
        protection: Option<AmigaProtection>,
        comment: Option<&'a [u8]>,
        comment_continues: bool,
    },
    AppleProDos { file_type: u8, aux_type: u16 },
    AppleHfs(FinderInfo),
    AppleIcon { finder: FinderInfo, icon: &'a [u8] },
}

/// Iterator over the records of one system use area.
///
/// Stops at the first record whose length cannot be trusted, including
/// any unrecognized signature. A CD-ROM XA record is only recognized at the
/// very start of a directory record's own area.
pub(crate) struct SystemUseFields<'a> {
    data: &'a [u8],
    offset: usize,
    done: bool,
    xa_allowed: bool,
}

impl<'a> SystemUseFields<'a> {
    /// Records of the area stored in a directory record.
    pub fn new(data: &'a [u8]) -> Self {
        SystemUseFields {
            data,
            offset: 0,
            done: false,
            xa_allowed: true,
        }
    }

    /// Records of an area reached through a CE record.
    pub fn continued(data: &'a [u8]) -> Self {
        SystemUseFields {
            xa_allowed: false,
            ..Self::new(data)
        }
    }

    fn at_xa_record(&self, rest: &[u8]) -> bool {
        self.xa_allowed
            && self.offset == 0
            && rest.len() >= XA_RECORD_SIZE
            && &rest[6..8] == XA_MAGIC
            && !is_known_signature(BigEndian::read_u16(&rest[0..2]))
    }

    fn halt(&mut self) -> Option<SystemUseField<'a>> {
        self.done = true;
        None
    }

    fn next_old_apple(&mut self, rest: &'a [u8]) -> Option<SystemUseField<'a>> {
        let size = match rest[2] {
            APPLE_OLD_PRODOS => 6,
            APPLE_OLD_TYPE_CREATOR | APPLE_OLD_TYPE_CREATOR_BUNDLE => 11,
            APPLE_OLD_TYPE_CREATOR_ICON | APPLE_OLD_TYPE_CREATOR_ICON_BUNDLE => {
                11 + APPLE_ICON_SIZE
            }
            APPLE_OLD_HFS => 13,
            other => {
                debug!("unknown old-style Apple extension id {other}");
                return self.halt();
            }
        };
        if rest.len() < size {
            return self.halt();
        }
        self.offset += size;
        let record = &rest[..size];
        let type_creator = || {
            let mut file_type = [0u8; 4];
            let mut creator = [0u8; 4];
            file_type.copy_from_slice(&record[3..7]);
            creator.copy_from_slice(&record[7..11]);
            (file_type, creator)
        };
        Some(match record[2] {
            APPLE_OLD_PRODOS => SystemUseField::AppleProDos {
                file_type: record[3],
                aux_type: LittleEndian::read_u16(&record[4..6]),
            },
            APPLE_OLD_TYPE_CREATOR_ICON | APPLE_OLD_TYPE_CREATOR_ICON_BUNDLE => {
                let (file_type, creator) = type_creator();
                SystemUseField::AppleIcon {
                    finder: FinderInfo::new(file_type, creator, 0),
                    icon: &record[11..11 + APPLE_ICON_SIZE],
                }
            }
            APPLE_OLD_HFS => {
                let (file_type, creator) = type_creator();
                SystemUseField::AppleHfs(FinderInfo::new(
                    file_type,
                    creator,
                    BigEndian::read_u16(&record[11..13]),
                ))
            }
            _ => {
                let (file_type, creator) = type_creator();
                SystemUseField::AppleHfs(FinderInfo::new(file_type, creator, 0))
            }
        })
    }
}

impl<'a> Iterator for SystemUseFields<'a> {
    type Item = SystemUseField<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.data.len() {
            return None;
        }
        let rest = &self.data[self.offset..];

        if self.at_xa_record(rest) {
            self.offset += XA_RECORD_SIZE;
            return Some(SystemUseField::Xa(CdromXa::parse(rest)));
        }
        if rest.len() < 4 {
            return self.halt();
        }

        let signature = BigEndian::read_u16(&rest[0..2]);
        if signature == APPLE_MAGIC_OLD {
            return self.next_old_apple(rest);
        }

        let len = rest[2] as usize;
        if len < 4 || len > rest.len() {
            if signature != 0 {
                debug!("system use record {signature:#06x} has bad length {len}");
            }
            return self.halt();
        }
        let record = &rest[..len];
        self.offset += len;

        let field = match decode_field(signature, record) {
            Some(field) => field,
            None => {
                if signature != 0 {
                    trace!("stopping at system use signature {signature:#06x}");
                }
                return self.halt();
            }
        };
        if field == SystemUseField::Terminator {
            self.done = true;
        }
        Some(field)
    }
}

fn is_known_signature(signature: u16) -> bool {
    matches!(
        signature,
        SUSP_CONTINUATION
            | SUSP_PADDING
            | SUSP_INDICATOR
            | SUSP_TERMINATOR
            | SUSP_REFERENCE
            | SUSP_SELECTOR
            | RRIP_MAGIC
            | RRIP_POSIX_ATTRIBUTES
            | RRIP_POSIX_DEV_NO
            | RRIP_SYMLINK
            | RRIP_NAME
            | RRIP_CHILD_LINK
            | RRIP_PARENT_LINK
            | RRIP_RELOCATED
            | RRIP_TIMESTAMPS
            | RRIP_SPARSE
            | ZISOFS
            | AAIP
            | AMIGA_MAGIC
            | APPLE_MAGIC
            | APPLE_MAGIC_OLD
    )
}

fn decode_field(signature: u16, r: &[u8]) -> Option<SystemUseField<'_>> {
    let len = r.len();
    let field = match signature {
        APPLE_MAGIC => match r[3] {
            APPLE_ID_PRODOS if len == 7 => SystemUseField::AppleProDos {
                file_type: r[4],
                aux_type: LittleEndian::read_u16(&r[5..7]),
            },
            APPLE_ID_HFS if len >= 14 => {
                let mut file_type = [0u8; 4];
                let mut creator = [0u8; 4];
                file_type.copy_from_slice(&r[4..8]);
                creator.copy_from_slice(&r[8..12]);
                SystemUseField::AppleHfs(FinderInfo::new(
                    file_type,
                    creator,
                    BigEndian::read_u16(&r[12..14]),
                ))
            }
            // AAIP shares the signature.
            _ => SystemUseField::Aaip,
        },
        AAIP => SystemUseField::Aaip,
        SUSP_CONTINUATION if len >= 28 => SystemUseField::Continuation {
            block: LittleEndian::read_u32(&r[4..8]),
            offset: LittleEndian::read_u32(&r[12..16]),
            length: LittleEndian::read_u32(&r[20..24]),
        },
        SUSP_INDICATOR if len >= 7 && r[4..6] == SUSP_CHECK_BYTES => {
            SystemUseField::Indicator { skip: r[6] }
        }
        SUSP_TERMINATOR => SystemUseField::Terminator,
        SUSP_REFERENCE if len >= 8 => {
            let id_len = r[4] as usize;
            let des_len = r[5] as usize;
            let src_len = r[6] as usize;
            let text = |start: usize, n: usize| {
                let end = (start + n).min(len);
                String::from_utf8_lossy(&r[start.min(end)..end]).into_owned()
            };
            SystemUseField::Reference(ExtensionReference {
                identifier: text(8, id_len),
                descriptor: text(8 + id_len, des_len),
                source: text(8 + id_len + des_len, src_len),
                version: r[7],
            })
        }
        SUSP_SELECTOR => SystemUseField::Selector,
        SUSP_PADDING => SystemUseField::Padding,
        RRIP_MAGIC => SystemUseField::RockRidge,
        RRIP_POSIX_ATTRIBUTES if len >= 36 => SystemUseField::Posix(PosixAttributes {
            mode: LittleEndian::read_u32(&r[4..8]),
            links: LittleEndian::read_u32(&r[12..16]),
            uid: LittleEndian::read_u32(&r[20..24]),
            gid: LittleEndian::read_u32(&r[28..32]),
            serial: (len >= 44).then(|| LittleEndian::read_u32(&r[36..40])),
        }),
        RRIP_POSIX_DEV_NO if len >= 20 => SystemUseField::DeviceNumber(PosixDeviceNumber {
            high: LittleEndian::read_u32(&r[4..8]),
            low: LittleEndian::read_u32(&r[12..16]),
        }),
        RRIP_SYMLINK if len >= 5 => SystemUseField::SymbolicLink {
            continues: r[4] & SL_CONTINUE != 0,
            components: &r[5..],
        },
        RRIP_NAME if len >= 5 => SystemUseField::AlternateName {
            flags: r[4],
            name: &r[5..],
        },
        RRIP_CHILD_LINK if len >= 12 => SystemUseField::ChildLink {
            location: LittleEndian::read_u32(&r[4..8]),
        },
        RRIP_PARENT_LINK => SystemUseField::ParentLink,
        RRIP_RELOCATED => SystemUseField::Relocated,
        RRIP_TIMESTAMPS if len >= 5 => SystemUseField::Timestamps {
            flags: r[4],
            data: &r[5..],
        },
        RRIP_SPARSE => SystemUseField::Sparse,
        ZISOFS => SystemUseField::Zisofs,
        AMIGA_MAGIC if len >= 5 => {
            let flags = r[4];
            let mut off = 5;
            let mut protection = None;
            if flags & AMIGA_PROTECTION != 0 && off + 4 <= len {
                protection = Some(AmigaProtection {
                    user: r[off],
                    reserved: r[off + 1],
                    multi_user: r[off + 2],
                    protection: r[off + 3],
                });
                off += 4;
            }
            let mut comment = None;
            if flags & AMIGA_COMMENT != 0 && off < len {
                // The length byte counts itself.
                let end = (off + r[off] as usize).min(len);
                comment = Some(&r[(off + 1).min(end)..end]);
            }
            SystemUseField::Amiga {
                protection,
                comment,
                comment_continues: flags & AMIGA_COMMENT_CONTINUES != 0,
            }
        }
        _ => return None,
    };
    Some(field)
}

/// Collects NM fragments until a record without the continue flag.
#[derive(Debug, Default)]
struct AlternateNameAccumulator {
    bytes: Vec<u8>,
}

impl AlternateNameAccumulator {
    /// Returns the finished name when `flags` ends the sequence.
    fn push(&mut self, flags: u8, name: &[u8], hostname: &str) -> Option<Vec<u8>> {
        if flags & (NM_CURRENT | NM_PARENT) != 0 {
            return None;
        }
        if flags & NM_NETWORK != 0 {
            self.bytes.extend_from_slice(hostname.as_bytes());
        } else {
            self.bytes.extend_from_slice(name);
        }
        if flags & NM_CONTINUE == 0 {
            Some(std::mem::take(&mut self.bytes))
        } else {
            None
        }
    }

    fn into_pending(self) -> Option<Vec<u8>> {
        (!self.bytes.is_empty()).then_some(self.bytes)
    }
}

/// Builds a symbolic link target from SL components across records.
#[derive(Debug, Default)]
struct SymlinkAccumulator {
    target: Option<String>,
    record_continues: bool,
    component_continues: bool,
}

impl SymlinkAccumulator {
    fn push_record(
        &mut self,
        continues: bool,
        components: &[u8],
        hostname: &str,
        decode: impl Fn(&[u8]) -> String,
    ) {
        if !self.record_continues {
            self.target = Some(String::new());
            self.component_continues = false;
        }
        let target = self.target.get_or_insert_with(String::new);

        let mut off = 0;
        while off + 2 <= components.len() {
            let flags = components[off];
            let len = components[off + 1] as usize;
            let end = (off + 2 + len).min(components.len());
            let content = &components[off + 2..end];
            off = end;

            if flags & SL_ROOT != 0 {
                target.clear();
                target.push('/');
                self.component_continues = false;
                continue;
            }
            if flags & SL_MOUNTPOINT != 0 {
                continue;
            }
            if !self.component_continues && !target.is_empty() && !target.ends_with('/') {
                target.push('/');
            }
            if flags & SL_CURRENT != 0 {
                target.push('.');
            } else if flags & SL_PARENT != 0 {
                target.push_str("..");
            } else if flags & SL_NETWORK != 0 {
                target.push_str(hostname);
            } else {
                target.push_str(&decode(content));
            }
            self.component_continues = flags & SL_CONTINUE != 0;
        }
        self.record_continues = continues;
    }

    fn finish(self) -> Option<String> {
        self.target
    }
}

/// Host name substituted for network-flagged name components.
pub(crate) fn local_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// What a system use scan learned besides the entry fields it filled in.
#[derive(Debug, Default)]
pub(crate) struct SystemUseOutcome {
    /// An Apple HFS record marked this entry as a resource fork.
    pub has_resource_fork: bool,
    pub references: Vec<ExtensionReference>,
    /// SUSP skip length from an SP record.
    pub skip: Option<u8>,
    /// SP seen: the area follows SUSP.
    pub susp: bool,
    /// RR, a Rock Ridge ER or PX seen.
    pub rock_ridge: bool,
}

struct ScanState {
    names: AlternateNameAccumulator,
    symlink: SymlinkAccumulator,
    saw_symlink: bool,
    comment_continues: bool,
    hostname: String,
    outcome: SystemUseOutcome,
}

/// Decode one system use area into `entry`, following continuation areas.
pub(crate) fn decode_system_use(
    volume: &mut Volume,
    settings: &DecodeSettings,
    data: &[u8],
    entry: &mut DecodedDirectoryEntry,
) -> Result<SystemUseOutcome, FilesystemError> {
    let mut state = ScanState {
        names: AlternateNameAccumulator::default(),
        symlink: SymlinkAccumulator::default(),
        saw_symlink: false,
        comment_continues: false,
        hostname: local_hostname(),
        outcome: SystemUseOutcome::default(),
    };
    scan(volume, settings, data, entry, &mut state, 0)?;

    if state.saw_symlink {
        entry.symbolic_link = state.symlink.finish();
    }
    // NM fragments whose last record still carries the continue flag.
    if let Some(pending) = state.names.into_pending() {
        debug!("alternate name for {} never finished, using it as is", entry.filename);
        entry.filename = alternate_name(settings, &pending);
    }
    Ok(state.outcome)
}

fn alternate_name(settings: &DecodeSettings, bytes: &[u8]) -> String {
    settings
        .encoding
        .decode(bytes)
        .replace('/', &NAME_SLASH_SUBSTITUTE.to_string())
}

/// Apply the records of one area; true once an ST record ended the whole
/// system use field.
fn scan(
    volume: &mut Volume,
    settings: &DecodeSettings,
    data: &[u8],
    entry: &mut DecodedDirectoryEntry,
    state: &mut ScanState,
    depth: usize,
) -> Result<bool, FilesystemError> {
    let fields = if depth == 0 {
        SystemUseFields::new(data)
    } else {
        SystemUseFields::continued(data)
    };
    for field in fields {
        match field {
            SystemUseField::Xa(xa) => entry.xa = Some(xa),
            SystemUseField::Continuation {
                block,
                offset,
                length,
            } => {
                if depth >= MAX_CONTINUATION_DEPTH {
                    warn!("continuation area chain deeper than {MAX_CONTINUATION_DEPTH}, ignoring");
                    continue;
                }
                let area = volume.read_with_extents(
                    u64::from(offset),
                    u64::from(length),
                    &[(block, offset.saturating_add(length))],
                    false,
                    0,
                )?;
                if scan(volume, settings, &area, entry, state, depth + 1)? {
                    return Ok(true);
                }
            }
            SystemUseField::Indicator { skip } => {
                state.outcome.susp = true;
                state.outcome.skip = Some(skip);
            }
            SystemUseField::Terminator => return Ok(true),
            SystemUseField::Reference(reference) => {
                if reference.is_rock_ridge() {
                    state.outcome.rock_ridge = true;
                }
                state.outcome.references.push(reference);
            }
            SystemUseField::RockRidge => state.outcome.rock_ridge = true,
            SystemUseField::Posix(attributes) => {
                state.outcome.rock_ridge = true;
                entry.posix_attributes = Some(attributes);
            }
            SystemUseField::DeviceNumber(device) => entry.posix_device = Some(device),
            SystemUseField::SymbolicLink {
                continues,
                components,
            } => {
                state.saw_symlink = true;
                state.symlink.push_record(continues, components, &state.hostname, |b| {
                    settings.encoding.decode(b)
                });
            }
            SystemUseField::AlternateName { flags, name } => {
                if settings.namespace != Namespace::Rrip {
                    continue;
                }
                if let Some(full) = state.names.push(flags, name, &state.hostname) {
                    entry.filename = alternate_name(settings, &full);
                }
            }
            SystemUseField::ChildLink { location } => {
                if settings.namespace != Namespace::Rrip || settings.use_path_table {
                    continue;
                }
                splice_child_link(volume, settings, location, entry)?;
            }
            SystemUseField::Relocated => entry.relocated = true,
            SystemUseField::Timestamps { flags, data } => apply_timestamps(flags, data, entry),
            SystemUseField::Amiga {
                protection,
                comment,
                comment_continues,
            } => {
                if protection.is_some() {
                    entry.amiga_protection = protection;
                }
                if let Some(comment) = comment {
                    let buf = entry.amiga_comment.get_or_insert_with(Vec::new);
                    if !state.comment_continues {
                        buf.clear();
                    }
                    buf.extend_from_slice(comment);
                }
                state.comment_continues = comment_continues;
            }
            SystemUseField::AppleProDos {
                file_type,
                aux_type,
            } => {
                entry.apple_dos_type = Some(file_type);
                entry.apple_prodos_type = Some(aux_type);
            }
            SystemUseField::AppleHfs(finder) => {
                state.outcome.has_resource_fork = true;
                entry.finder_info = Some(finder);
            }
            SystemUseField::AppleIcon { finder, icon } => {
                state.outcome.has_resource_fork = true;
                entry.finder_info = Some(finder);
                entry.apple_icon = Some(icon.to_vec());
            }
            SystemUseField::Selector
            | SystemUseField::Padding
            | SystemUseField::ParentLink
            | SystemUseField::Sparse
            | SystemUseField::Zisofs
            | SystemUseField::Aaip => {}
        }
    }
    Ok(false)
}

/// A CL record points at the relocated directory; take its `.` record's
/// metadata while keeping the name found here.
fn splice_child_link(
    volume: &mut Volume,
    settings: &DecodeSettings,
    location: u32,
    entry: &mut DecodedDirectoryEntry,
) -> Result<(), FilesystemError> {
    let block = volume.read_block(location, false, 0)?;
    let Some(record) = settings.format.parse_record(&block) else {
        warn!("child link to block {location} has no directory record");
        return Ok(());
    };
    entry.size = u64::from(record.size);
    entry.flags = FileFlags::from_bits_truncate(record.flags) | FileFlags::DIRECTORY;
    entry.file_unit_size = record.file_unit_size;
    entry.interleave = record.interleave;
    entry.volume_sequence_number = record.volume_sequence_number;
    entry.timestamp = record.timestamp;
    entry.xattr_length = record.xattr_length;
    entry.extents = vec![(location, record.size)];
    Ok(())
}

fn apply_timestamps(flags: u8, data: &[u8], entry: &mut DecodedDirectoryEntry) {
    let stamp_len = if flags & TF_LONG_FORM != 0 { 17 } else { 7 };
    let times = &mut entry.rrip_times;
    let slots = [
        (TF_CREATION, &mut times.creation),
        (TF_MODIFY, &mut times.modification),
        (TF_ACCESS, &mut times.access),
        (TF_ATTRIBUTES, &mut times.attribute_change),
        (TF_BACKUP, &mut times.backup),
        (TF_EXPIRATION, &mut times.expiration),
        (TF_EFFECTIVE, &mut times.effective),
    ];
    let mut off = 0;
    for (bit, slot) in slots {
        if flags & bit == 0 {
            continue;
        }
        if off + stamp_len > data.len() {
            break;
        }
        *slot = Some(data[off..off + stamp_len].to_vec());
        off += stamp_len;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fs::iso9660::entry::XaAttributes;
    use crate::fs::iso9660::options::TextEncoding;
    use crate::fs::iso9660::record::DirectoryFormat;
    use crate::optical::RawImage;
    use std::io::Cursor;

    /// Generic SUSP record: signature, length, version 1, payload.
    pub(crate) fn su(signature: &[u8; 2], payload: &[u8]) -> Vec<u8> {
        let mut out = signature.to_vec();
        out.push((4 + payload.len()) as u8);
        out.push(1);
        out.extend_from_slice(payload);
        out
    }

    pub(crate) fn both32(value: u32) -> Vec<u8> {
        let mut out = value.to_le_bytes().to_vec();
        out.extend_from_slice(&value.to_be_bytes());
        out
    }

    pub(crate) fn px(mode: u32, uid: u32, gid: u32) -> Vec<u8> {
        let mut payload = both32(mode);
        payload.extend(both32(1));
        payload.extend(both32(uid));
        payload.extend(both32(gid));
        su(b"PX", &payload)
    }

    pub(crate) fn nm(flags: u8, name: &[u8]) -> Vec<u8> {
        let mut payload = vec![flags];
        payload.extend_from_slice(name);
        su(b"NM", &payload)
    }

    fn settings(namespace: Namespace) -> DecodeSettings {
        DecodeSettings {
            format: DirectoryFormat::Iso9660,
            namespace,
            encoding: TextEncoding::Latin1,
            joliet: false,
            use_path_table: false,
            use_trans_tbl: false,
            susp_skip: 0,
            debug: false,
        }
    }

    fn volume(blocks: Vec<Vec<u8>>) -> Volume {
        let mut data = Vec::new();
        for mut block in blocks {
            block.resize(2048, 0);
            data.extend(block);
        }
        Volume::new(Box::new(RawImage::open(Cursor::new(data), 2048).unwrap()), 0)
    }

    fn decode(namespace: Namespace, area: &[u8]) -> (DecodedDirectoryEntry, SystemUseOutcome) {
        let mut vol = volume(vec![vec![0u8; 2048]]);
        let mut entry = DecodedDirectoryEntry {
            filename: "ORIGINAL".into(),
            ..Default::default()
        };
        let outcome = decode_system_use(&mut vol, &settings(namespace), area, &mut entry).unwrap();
        (entry, outcome)
    }

    #[test]
    fn test_indicator_and_rock_ridge() {
        let mut area = su(b"SP", &[0xBE, 0xEF, 0]);
        area.extend(su(b"RR", &[0x81]));
        let (_, outcome) = decode(Namespace::Rrip, &area);
        assert!(outcome.susp);
        assert_eq!(outcome.skip, Some(0));
        assert!(outcome.rock_ridge);
    }

    #[test]
    fn test_extension_reference() {
        let mut payload = vec![10, 4, 3, 1];
        payload.extend_from_slice(b"RRIP_1991ADESCSRC");
        let (_, outcome) = decode(Namespace::Normal, &su(b"ER", &payload));
        assert_eq!(outcome.references.len(), 1);
        assert_eq!(outcome.references[0].identifier, "RRIP_1991A");
        assert_eq!(outcome.references[0].source, "SRC");
        assert!(outcome.rock_ridge);
    }

    #[test]
    fn test_posix_attributes_old_and_new() {
        let (entry, _) = decode(Namespace::Rrip, &px(0o100644, 1000, 100));
        let attrs = entry.posix_attributes.unwrap();
        assert_eq!(attrs.mode, 0o100644);
        assert_eq!(attrs.uid, 1000);
        assert_eq!(attrs.gid, 100);
        assert_eq!(attrs.serial, None);

        let mut payload = both32(0o040755);
        for v in [2, 0, 0, 77] {
            payload.extend(both32(v));
        }
        let (entry, _) = decode(Namespace::Rrip, &su(b"PX", &payload));
        assert_eq!(entry.posix_attributes.unwrap().serial, Some(77));
    }

    #[test]
    fn test_alternate_name_continuation() {
        let mut area = nm(0x01, b"long_");
        area.extend(nm(0x00, b"name.txt"));
        let (entry, _) = decode(Namespace::Rrip, &area);
        assert_eq!(entry.filename, "long_name.txt");
    }

    #[test]
    fn test_alternate_name_ignored_outside_rrip() {
        let (entry, _) = decode(Namespace::Normal, &nm(0, b"other"));
        assert_eq!(entry.filename, "ORIGINAL");
    }

    #[test]
    fn test_unfinished_alternate_name_still_used() {
        let mut area = nm(0x01, b"part_");
        area.extend(nm(0x01, b"two"));
        let (entry, _) = decode(Namespace::Rrip, &area);
        assert_eq!(entry.filename, "part_two");

        let (entry, _) = decode(Namespace::Normal, &nm(0x01, b"part"));
        assert_eq!(entry.filename, "ORIGINAL");
    }

    #[test]
    fn test_symlink_components() {
        // "/usr/../lib" split over two records, with "li" + "b" continued
        let mut first = vec![0x01];
        first.extend_from_slice(&[SL_ROOT, 0, 0, 3]);
        first.extend_from_slice(b"usr");
        let mut second = vec![0x00];
        second.extend_from_slice(&[SL_PARENT, 0, SL_CONTINUE, 2]);
        second.extend_from_slice(b"li");
        second.extend_from_slice(&[0, 1, b'b']);
        let mut area = su(b"SL", &first);
        area.extend(su(b"SL", &second));
        let (entry, _) = decode(Namespace::Rrip, &area);
        assert_eq!(entry.symbolic_link.as_deref(), Some("/usr/../lib"));
    }

    #[test]
    fn test_relative_symlink() {
        let mut payload = vec![0x00];
        payload.extend_from_slice(&[SL_CURRENT, 0, 0, 4]);
        payload.extend_from_slice(b"file");
        let (entry, _) = decode(Namespace::Normal, &su(b"SL", &payload));
        assert_eq!(entry.symbolic_link.as_deref(), Some("./file"));
    }

    #[test]
    fn test_timestamps() {
        let mut payload = vec![TF_MODIFY | TF_ACCESS];
        payload.extend_from_slice(&[99, 1, 2, 3, 4, 5, 0]);
        payload.extend_from_slice(&[100, 6, 7, 8, 9, 10, 0]);
        let (entry, _) = decode(Namespace::Rrip, &su(b"TF", &payload));
        assert_eq!(entry.rrip_times.modification.as_ref().unwrap()[0], 99);
        assert_eq!(entry.rrip_times.access.as_ref().unwrap()[0], 100);
        assert!(entry.rrip_times.creation.is_none());
    }

    #[test]
    fn test_unknown_signature_halts_scan() {
        let mut area = su(b"ZZ", &[1, 2, 3]);
        area.extend(px(0o100644, 0, 0));
        let (entry, _) = decode(Namespace::Rrip, &area);
        assert!(entry.posix_attributes.is_none());
    }

    #[test]
    fn test_unknown_signature_after_known_records() {
        let mut area = px(0o100644, 1000, 100);
        area.extend(nm(0, b"kept.txt"));
        area.extend(su(b"ZZ", &[1, 2, 3]));
        area.extend(su(b"RR", &[0x81]));
        let mut vol = volume(vec![vec![0u8; 2048]]);
        let mut entry = DecodedDirectoryEntry::default();
        let outcome = decode_system_use(&mut vol, &settings(Namespace::Rrip), &area, &mut entry)
            .unwrap();
        assert_eq!(entry.posix_attributes.unwrap().uid, 1000);
        assert_eq!(entry.filename, "kept.txt");
        // PX alone marks Rock Ridge; RR after the unknown record is never read.
        assert!(outcome.rock_ridge);
        assert!(outcome.references.is_empty());
    }

    #[test]
    fn test_bad_length_halts_scan() {
        let mut area = su(b"RR", &[0x81]);
        area[2] = 2;
        area.extend(px(0o100644, 0, 0));
        let (entry, outcome) = decode(Namespace::Rrip, &area);
        assert!(entry.posix_attributes.is_none());
        assert!(!outcome.rock_ridge);
    }

    #[test]
    fn test_xa_record() {
        let mut area = vec![0, 5, 0, 7, 0x0D, 0x55, b'X', b'A', 2, 0, 0, 0, 0, 0];
        area.extend(su(b"RR", &[0]));
        let (entry, outcome) = decode(Namespace::Normal, &area);
        let xa = entry.xa.unwrap();
        assert_eq!(xa.group, 5);
        assert_eq!(xa.user, 7);
        assert_eq!(xa.file_number, 2);
        assert!(xa.attributes.contains(XaAttributes::MODE2_FORM1));
        assert!(outcome.rock_ridge);
    }

    #[test]
    fn test_name_containing_xa_is_not_an_xa_record() {
        let mut area = nm(0, b"EXAMPLE_long_name.txt");
        area.extend(px(0o100644, 1000, 100));
        let (entry, _) = decode(Namespace::Rrip, &area);
        assert_eq!(entry.filename, "EXAMPLE_long_name.txt");
        assert_eq!(entry.posix_attributes.unwrap().uid, 1000);
        assert!(entry.xa.is_none());

        let mut area = px(0o100644, 1000, 100);
        area.extend(nm(0, b"EXAMPLE_long_name.txt"));
        let (entry, _) = decode(Namespace::Rrip, &area);
        assert_eq!(entry.filename, "EXAMPLE_long_name.txt");
        assert!(entry.xa.is_none());
    }

    #[test]
    fn test_xa_record_not_read_from_continuation_area() {
        let xa = [0, 5, 0, 7, 0x0D, 0x55, b'X', b'A', 2, 0, 0, 0, 0, 0];
        let mut block1 = xa.to_vec();
        block1.extend(px(0o100600, 5, 6));
        let mut vol = volume(vec![vec![0u8; 2048], block1]);
        let mut payload = both32(1);
        payload.extend(both32(0));
        payload.extend(both32(50));
        let mut entry = DecodedDirectoryEntry::default();
        decode_system_use(&mut vol, &settings(Namespace::Rrip), &su(b"CE", &payload), &mut entry)
            .unwrap();
        assert!(entry.xa.is_none());
        assert!(entry.posix_attributes.is_none());
    }

    #[test]
    fn test_apple_new_style() {
        let mut payload = vec![APPLE_ID_HFS];
        payload.extend_from_slice(b"TEXTttxt");
        payload.extend_from_slice(&0x0100u16.to_be_bytes());
        let mut area = b"AA".to_vec();
        area.push((3 + payload.len()) as u8);
        area.extend(payload);
        let (entry, outcome) = decode(Namespace::Normal, &area);
        assert!(outcome.has_resource_fork);
        let finder = entry.finder_info.unwrap();
        assert_eq!(&finder.file_type, b"TEXT");
        assert_eq!(finder.flags.bits(), 0x0100);

        let prodos = [b'A', b'A', 7, APPLE_ID_PRODOS, 0x06, 0x00, 0x20];
        let (entry, outcome) = decode(Namespace::Normal, &prodos);
        assert!(!outcome.has_resource_fork);
        assert_eq!(entry.apple_dos_type, Some(6));
        assert_eq!(entry.apple_prodos_type, Some(0x2000));
    }

    #[test]
    fn test_apple_old_style_icon() {
        let mut area = vec![b'B', b'A', APPLE_OLD_TYPE_CREATOR_ICON];
        area.extend_from_slice(b"APPLMYAP");
        area.extend(std::iter::repeat(0xAA).take(APPLE_ICON_SIZE));
        area.extend(su(b"RR", &[0]));
        let (entry, outcome) = decode(Namespace::Normal, &area);
        assert!(outcome.has_resource_fork);
        assert_eq!(entry.apple_icon.as_ref().unwrap().len(), APPLE_ICON_SIZE);
        assert_eq!(entry.finder_info.unwrap().creator_code(), "MYAP");
        assert!(outcome.rock_ridge);
    }

    #[test]
    fn test_amiga_comment_accumulates() {
        let mut first = vec![AMIGA_PROTECTION | AMIGA_COMMENT | AMIGA_COMMENT_CONTINUES];
        first.extend_from_slice(&[1, 0, 2, 0x0F]);
        first.push(6);
        first.extend_from_slice(b"hello");
        let mut second = vec![AMIGA_COMMENT];
        second.push(7);
        second.extend_from_slice(b" world");
        let mut area = su(b"AS", &first);
        area.extend(su(b"AS", &second));
        let (entry, _) = decode(Namespace::Normal, &area);
        assert_eq!(entry.amiga_comment.as_deref(), Some(&b"hello world"[..]));
        assert_eq!(entry.amiga_protection.unwrap().protection, 0x0F);
    }

    #[test]
    fn test_continuation_area() {
        let mut block1 = vec![0u8; 100];
        block1.extend(px(0o100600, 5, 6));
        let mut vol = volume(vec![vec![0u8; 2048], block1]);
        let mut payload = both32(1);
        payload.extend(both32(100));
        payload.extend(both32(36));
        let area = su(b"CE", &payload);
        let mut entry = DecodedDirectoryEntry::default();
        decode_system_use(&mut vol, &settings(Namespace::Rrip), &area, &mut entry).unwrap();
        assert_eq!(entry.posix_attributes.unwrap().uid, 5);
    }

    #[test]
    fn test_terminator_in_continuation_ends_field() {
        let mut block1 = vec![0u8; 100];
        block1.extend(su(b"ST", &[]));
        let mut vol = volume(vec![vec![0u8; 2048], block1]);
        let mut payload = both32(1);
        payload.extend(both32(100));
        payload.extend(both32(4));
        let mut area = su(b"CE", &payload);
        area.extend(px(0o100600, 5, 6));
        let mut entry = DecodedDirectoryEntry::default();
        decode_system_use(&mut vol, &settings(Namespace::Rrip), &area, &mut entry).unwrap();
        assert!(entry.posix_attributes.is_none());
    }

    #[test]
    fn test_continuation_depth_bounded() {
        // A CE pointing at itself must terminate.
        let mut payload = both32(1);
        payload.extend(both32(0));
        payload.extend(both32(28));
        let ce = su(b"CE", &payload);
        let mut vol = volume(vec![vec![0u8; 2048], ce.clone()]);
        let mut entry = DecodedDirectoryEntry::default();
        decode_system_use(&mut vol, &settings(Namespace::Rrip), &ce, &mut entry).unwrap();
    }

    #[test]
    fn test_child_link_splices_relocated_directory() {
        use crate::fs::iso9660::record::tests::iso_record;
        let dot = iso_record(1, 2048, 0x02, &[0], &[]);
        let mut vol = volume(vec![vec![0u8; 2048], dot]);
        let payload = both32(1);
        let mut entry = DecodedDirectoryEntry {
            filename: "DEEP".into(),
            ..Default::default()
        };
        decode_system_use(&mut vol, &settings(Namespace::Rrip), &su(b"CL", &payload), &mut entry)
            .unwrap();
        assert_eq!(entry.filename, "DEEP");
        assert!(entry.is_directory());
        assert_eq!(entry.extents, vec![(1, 2048)]);
    }
}
