//! Volume descriptor set scanning.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use chrono::{DateTime, Utc};
use log::{debug, info};

use super::consts::*;
use super::date::decode_descriptor_date;
use super::extent::Volume;
use super::options::{decode_ucs2be, TextEncoding};
use super::record::DirectoryFormat;
use crate::fs::filesystem::FilesystemError;

/// Identification and geometry from one primary, supplementary or enhanced
/// volume descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedVolumeDescriptor {
    pub system_identifier: String,
    pub volume_identifier: String,
    pub volume_set_identifier: String,
    pub publisher_identifier: String,
    pub data_preparer_identifier: String,
    pub application_identifier: String,
    pub creation_time: Option<DateTime<Utc>>,
    pub modification_time: Option<DateTime<Utc>>,
    pub expiration_time: Option<DateTime<Utc>>,
    pub effective_time: Option<DateTime<Utc>>,
    /// Volume space size in logical blocks.
    pub blocks: u64,
    pub block_size: u32,
    pub path_table_size: u32,
    /// Location of the big-endian path table.
    pub path_table_location: u32,
    /// Root directory extent and size; CD-i descriptors have no root record.
    pub root: Option<(u32, u32)>,
    pub root_xattr_length: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootRecord {
    pub system_identifier: String,
    pub boot_identifier: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumePartition {
    pub system_identifier: String,
    pub partition_identifier: String,
    pub location: u32,
    pub size: u32,
}

/// Everything the descriptor scan found.
#[derive(Debug, Clone)]
pub(crate) struct DescriptorSet {
    pub format: DirectoryFormat,
    pub primary: DecodedVolumeDescriptor,
    pub joliet: Option<DecodedVolumeDescriptor>,
    pub enhanced: Option<DecodedVolumeDescriptor>,
    pub boot: Option<BootRecord>,
    pub partitions: Vec<VolumePartition>,
}

/// Identifier text with trailing padding removed.
fn identifier(data: &[u8], joliet: bool, encoding: TextEncoding) -> String {
    let text = if joliet {
        decode_ucs2be(data)
    } else {
        encoding.decode(data)
    };
    text.trim_end_matches([' ', '\0']).to_string()
}

fn classify(block: &[u8]) -> Option<(u8, DirectoryFormat)> {
    if &block[1..6] == ISO_MAGIC {
        Some((block[0], DirectoryFormat::Iso9660))
    } else if &block[9..14] == HIGH_SIERRA_MAGIC {
        Some((block[8], DirectoryFormat::HighSierra))
    } else if &block[1..6] == CDI_MAGIC {
        Some((block[0], DirectoryFormat::Cdi))
    } else {
        None
    }
}

fn is_joliet(block: &[u8]) -> bool {
    JOLIET_ESCAPES
        .iter()
        .any(|escape| &block[88..91] == escape.as_slice())
}

fn root_record(data: &[u8], format: DirectoryFormat) -> Option<(u32, u32, u8)> {
    format
        .parse_record(data)
        .map(|record| (record.extent, record.size, record.xattr_length))
}

fn non_zero_block_size(size: u32) -> u32 {
    if size == 0 {
        DEFAULT_BLOCK_SIZE
    } else {
        size
    }
}

/// ISO9660 primary, supplementary and enhanced descriptors share one layout.
fn decode_iso_descriptor(
    block: &[u8],
    joliet: bool,
    encoding: TextEncoding,
) -> DecodedVolumeDescriptor {
    let id = |range: std::ops::Range<usize>| identifier(&block[range], joliet, encoding);
    let root = root_record(&block[156..190], DirectoryFormat::Iso9660);
    DecodedVolumeDescriptor {
        system_identifier: id(8..40),
        volume_identifier: id(40..72),
        volume_set_identifier: id(190..318),
        publisher_identifier: id(318..446),
        data_preparer_identifier: id(446..574),
        application_identifier: id(574..702),
        creation_time: decode_descriptor_date(&block[813..830]),
        modification_time: decode_descriptor_date(&block[830..847]),
        expiration_time: decode_descriptor_date(&block[847..864]),
        effective_time: decode_descriptor_date(&block[864..881]),
        blocks: u64::from(LittleEndian::read_u32(&block[80..84])),
        block_size: non_zero_block_size(u32::from(LittleEndian::read_u16(&block[128..130]))),
        path_table_size: LittleEndian::read_u32(&block[132..136]),
        path_table_location: BigEndian::read_u32(&block[148..152]),
        root: root.map(|(extent, size, _)| (extent, size)),
        root_xattr_length: root.map_or(0, |(_, _, xattr)| xattr),
    }
}

fn decode_high_sierra_descriptor(block: &[u8], encoding: TextEncoding) -> DecodedVolumeDescriptor {
    let id = |range: std::ops::Range<usize>| identifier(&block[range], false, encoding);
    let root = root_record(&block[180..214], DirectoryFormat::HighSierra);
    DecodedVolumeDescriptor {
        system_identifier: id(16..48),
        volume_identifier: id(48..80),
        volume_set_identifier: id(214..342),
        publisher_identifier: id(342..470),
        data_preparer_identifier: id(470..598),
        application_identifier: id(598..726),
        creation_time: decode_descriptor_date(&block[790..806]),
        modification_time: decode_descriptor_date(&block[806..822]),
        expiration_time: decode_descriptor_date(&block[822..838]),
        effective_time: decode_descriptor_date(&block[838..854]),
        blocks: u64::from(LittleEndian::read_u32(&block[88..92])),
        block_size: non_zero_block_size(u32::from(LittleEndian::read_u16(&block[136..138]))),
        path_table_size: LittleEndian::read_u32(&block[140..144]),
        path_table_location: BigEndian::read_u32(&block[164..168]),
        root: root.map(|(extent, size, _)| (extent, size)),
        root_xattr_length: root.map_or(0, |(_, _, xattr)| xattr),
    }
}

/// CD-i file structure volume descriptor. Big-endian only, no root record.
fn decode_cdi_descriptor(block: &[u8], encoding: TextEncoding) -> DecodedVolumeDescriptor {
    let id = |range: std::ops::Range<usize>| identifier(&block[range], false, encoding);
    DecodedVolumeDescriptor {
        system_identifier: id(8..40),
        volume_identifier: id(40..72),
        volume_set_identifier: id(190..318),
        publisher_identifier: id(318..446),
        data_preparer_identifier: id(446..574),
        application_identifier: id(574..702),
        creation_time: decode_descriptor_date(&block[808..824]),
        modification_time: decode_descriptor_date(&block[825..841]),
        expiration_time: decode_descriptor_date(&block[842..858]),
        effective_time: decode_descriptor_date(&block[859..875]),
        blocks: u64::from(BigEndian::read_u32(&block[84..88])),
        block_size: non_zero_block_size(u32::from(BigEndian::read_u16(&block[130..132]))),
        path_table_size: BigEndian::read_u32(&block[136..140]),
        path_table_location: BigEndian::read_u32(&block[148..152]),
        root: None,
        root_xattr_length: 0,
    }
}

/// Read descriptors from sector 16 until a terminator, an unrecognized
/// block or the scan limit.
pub(crate) fn scan_descriptors(
    volume: &mut Volume,
    encoding: TextEncoding,
) -> Result<DescriptorSet, FilesystemError> {
    let mut format = None;
    let mut primary = None;
    let mut joliet = None;
    let mut enhanced = None;
    let mut boot = None;
    let mut partitions = Vec::new();

    for n in 0..MAX_VOLUME_DESCRIPTORS {
        let lba = VOLUME_DESCRIPTOR_START + n;
        let block = volume.read_block(lba, false, 0)?;
        if block.len() < DEFAULT_BLOCK_SIZE as usize {
            debug!("short volume descriptor block at {lba}");
            break;
        }
        let Some((kind, dialect)) = classify(&block) else {
            debug!("no volume descriptor signature at block {lba}");
            break;
        };
        if format.is_some_and(|f| f != dialect) {
            debug!("ignoring {} descriptor at block {lba}", dialect.name());
            continue;
        }

        match kind {
            VD_TERMINATOR => break,
            VD_BOOT_RECORD if dialect == DirectoryFormat::Iso9660 => {
                boot = Some(BootRecord {
                    system_identifier: identifier(&block[7..39], false, encoding),
                    boot_identifier: identifier(&block[39..71], false, encoding),
                });
            }
            VD_PRIMARY if primary.is_none() => {
                primary = Some(match dialect {
                    DirectoryFormat::Iso9660 => decode_iso_descriptor(&block, false, encoding),
                    DirectoryFormat::HighSierra => decode_high_sierra_descriptor(&block, encoding),
                    DirectoryFormat::Cdi => decode_cdi_descriptor(&block, encoding),
                });
                format = Some(dialect);
            }
            VD_SUPPLEMENTARY if dialect == DirectoryFormat::Iso9660 => {
                let version = block[6];
                if version == 1 && is_joliet(&block) {
                    if joliet.is_none() {
                        joliet = Some(decode_iso_descriptor(&block, true, encoding));
                    }
                } else if version == 2 {
                    if enhanced.is_none() {
                        enhanced = Some(decode_iso_descriptor(&block, false, encoding));
                    }
                } else {
                    debug!("unrecognized supplementary descriptor at block {lba}");
                }
            }
            VD_PARTITION if dialect == DirectoryFormat::Iso9660 => {
                partitions.push(VolumePartition {
                    system_identifier: identifier(&block[8..40], false, encoding),
                    partition_identifier: identifier(&block[40..72], false, encoding),
                    location: LittleEndian::read_u32(&block[72..76]),
                    size: LittleEndian::read_u32(&block[80..84]),
                });
            }
            other => debug!("skipping volume descriptor type {other} at block {lba}"),
        }
    }

    let (Some(format), Some(primary)) = (format, primary) else {
        return Err(FilesystemError::InvalidArgument(
            "no primary volume descriptor found".into(),
        ));
    };
    info!(
        "{} volume '{}': {} blocks of {} bytes{}{}",
        format.name(),
        primary.volume_identifier,
        primary.blocks,
        primary.block_size,
        if joliet.is_some() { ", Joliet" } else { "" },
        if enhanced.is_some() { ", enhanced" } else { "" },
    );
    Ok(DescriptorSet {
        format,
        primary,
        joliet,
        enhanced,
        boot,
        partitions,
    })
}
