//! On-disc constants for ISO9660, High Sierra and CD-i volumes.

// ---- Volume descriptors ----

pub(crate) const ISO_MAGIC: &[u8; 5] = b"CD001";
pub(crate) const HIGH_SIERRA_MAGIC: &[u8; 5] = b"CDROM";
pub(crate) const CDI_MAGIC: &[u8; 5] = b"CD-I ";

/// First sector of the volume descriptor set.
pub(crate) const VOLUME_DESCRIPTOR_START: u32 = 16;
/// Upper bound on descriptors scanned before giving up on a terminator.
pub(crate) const MAX_VOLUME_DESCRIPTORS: u32 = 64;

pub(crate) const VD_BOOT_RECORD: u8 = 0;
pub(crate) const VD_PRIMARY: u8 = 1;
pub(crate) const VD_SUPPLEMENTARY: u8 = 2;
pub(crate) const VD_PARTITION: u8 = 3;
pub(crate) const VD_TERMINATOR: u8 = 255;

/// UCS-2 level 1, 2 and 3 escape sequences marking a Joliet SVD.
pub(crate) const JOLIET_ESCAPES: [&[u8; 3]; 3] = [b"%/@", b"%/C", b"%/E"];

pub(crate) const DEFAULT_BLOCK_SIZE: u32 = 2048;

// ---- Directory records ----

/// Fixed part of a directory record before the file identifier.
pub(crate) const DIRECTORY_RECORD_SIZE: usize = 33;
/// Size of the CD-i system use area following the file name.
pub(crate) const CDI_SYSTEM_AREA_SIZE: usize = 10;
/// Path table entry header (ISO, High Sierra and CD-i share the size).
pub(crate) const PATH_TABLE_ENTRY_SIZE: usize = 8;

pub(crate) const TRANS_TABLE_NAME: &str = "trans.tbl";

/// Division slash, substituted for '/' in file names.
pub(crate) const NAME_SLASH_SUBSTITUTE: char = '\u{2215}';

// ---- System Use Sharing Protocol signatures ----

pub(crate) const SUSP_CONTINUATION: u16 = u16::from_be_bytes(*b"CE");
pub(crate) const SUSP_PADDING: u16 = u16::from_be_bytes(*b"PD");
pub(crate) const SUSP_INDICATOR: u16 = u16::from_be_bytes(*b"SP");
pub(crate) const SUSP_TERMINATOR: u16 = u16::from_be_bytes(*b"ST");
pub(crate) const SUSP_REFERENCE: u16 = u16::from_be_bytes(*b"ER");
pub(crate) const SUSP_SELECTOR: u16 = u16::from_be_bytes(*b"ES");

pub(crate) const SUSP_CHECK_BYTES: [u8; 2] = [0xBE, 0xEF];
pub(crate) const MAX_CONTINUATION_DEPTH: usize = 8;

pub(crate) const RRIP_MAGIC: u16 = u16::from_be_bytes(*b"RR");
pub(crate) const RRIP_POSIX_ATTRIBUTES: u16 = u16::from_be_bytes(*b"PX");
pub(crate) const RRIP_POSIX_DEV_NO: u16 = u16::from_be_bytes(*b"PN");
pub(crate) const RRIP_SYMLINK: u16 = u16::from_be_bytes(*b"SL");
pub(crate) const RRIP_NAME: u16 = u16::from_be_bytes(*b"NM");
pub(crate) const RRIP_CHILD_LINK: u16 = u16::from_be_bytes(*b"CL");
pub(crate) const RRIP_PARENT_LINK: u16 = u16::from_be_bytes(*b"PL");
pub(crate) const RRIP_RELOCATED: u16 = u16::from_be_bytes(*b"RE");
pub(crate) const RRIP_TIMESTAMPS: u16 = u16::from_be_bytes(*b"TF");
pub(crate) const RRIP_SPARSE: u16 = u16::from_be_bytes(*b"SF");
pub(crate) const ZISOFS: u16 = u16::from_be_bytes(*b"ZF");
pub(crate) const AAIP: u16 = u16::from_be_bytes(*b"AL");
pub(crate) const AMIGA_MAGIC: u16 = u16::from_be_bytes(*b"AS");
pub(crate) const APPLE_MAGIC: u16 = u16::from_be_bytes(*b"AA");
pub(crate) const APPLE_MAGIC_OLD: u16 = u16::from_be_bytes(*b"BA");
pub(crate) const XA_MAGIC: &[u8; 2] = b"XA";

/// Extension identifiers announcing Rock Ridge in an ER record.
pub(crate) const RRIP_IDENTIFIERS: [&str; 3] = ["RRIP_1991A", "IEEE_P1282", "IEEE_1282"];

/// Fixed size of a CD-ROM XA system use record.
pub(crate) const XA_RECORD_SIZE: usize = 14;

// NM flags
pub(crate) const NM_CONTINUE: u8 = 0x01;
pub(crate) const NM_CURRENT: u8 = 0x02;
pub(crate) const NM_PARENT: u8 = 0x04;
pub(crate) const NM_NETWORK: u8 = 0x20;

// SL component flags
pub(crate) const SL_CONTINUE: u8 = 0x01;
pub(crate) const SL_CURRENT: u8 = 0x02;
pub(crate) const SL_PARENT: u8 = 0x04;
pub(crate) const SL_ROOT: u8 = 0x08;
pub(crate) const SL_MOUNTPOINT: u8 = 0x10;
pub(crate) const SL_NETWORK: u8 = 0x20;

// TF flags, in on-disc order of the stamps they announce
pub(crate) const TF_CREATION: u8 = 0x01;
pub(crate) const TF_MODIFY: u8 = 0x02;
pub(crate) const TF_ACCESS: u8 = 0x04;
pub(crate) const TF_ATTRIBUTES: u8 = 0x08;
pub(crate) const TF_BACKUP: u8 = 0x10;
pub(crate) const TF_EXPIRATION: u8 = 0x20;
pub(crate) const TF_EFFECTIVE: u8 = 0x40;
pub(crate) const TF_LONG_FORM: u8 = 0x80;

// Amiga AS flags
pub(crate) const AMIGA_PROTECTION: u8 = 0x01;
pub(crate) const AMIGA_COMMENT: u8 = 0x02;
pub(crate) const AMIGA_COMMENT_CONTINUES: u8 = 0x04;

// Apple extension ids
pub(crate) const APPLE_ID_PRODOS: u8 = 1;
pub(crate) const APPLE_ID_HFS: u8 = 2;
pub(crate) const APPLE_OLD_PRODOS: u8 = 0;
pub(crate) const APPLE_OLD_TYPE_CREATOR: u8 = 1;
pub(crate) const APPLE_OLD_TYPE_CREATOR_BUNDLE: u8 = 2;
pub(crate) const APPLE_OLD_TYPE_CREATOR_ICON: u8 = 3;
pub(crate) const APPLE_OLD_TYPE_CREATOR_ICON_BUNDLE: u8 = 4;
pub(crate) const APPLE_OLD_HFS: u8 = 5;
pub(crate) const APPLE_ICON_SIZE: usize = 128;

// ---- Extended attribute names ----

pub const XATTR_ISO_EA: &str = "org.iso.9660.ea";
pub const XATTR_ASSOCIATED_FILE: &str = "org.iso.9660.AssociatedFile";
pub const XATTR_DOS_TYPE: &str = "com.apple.dos.type";
pub const XATTR_PRODOS_TYPE: &str = "com.apple.prodos.type";
pub const XATTR_RESOURCE_FORK: &str = "com.apple.ResourceFork";
pub const XATTR_FINDER_INFO: &str = "com.apple.FinderInfo";
pub const XATTR_MAC_ICON: &str = "com.apple.Macintosh.Icon";
pub const XATTR_AMIGA_COMMENT: &str = "com.amiga.comments";
pub const XATTR_MODE2_SUBHEADER: &str = "org.iso.mode2.subheader";
pub const XATTR_MODE2_SUBHEADER_COPY: &str = "org.iso.mode2.subheader.copy";
