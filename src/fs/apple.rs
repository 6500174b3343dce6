//! Macintosh file metadata as carried by the Apple extensions on optical
//! media (Finder info and type/creator codes), plus Mac Roman text decoding.

use bitflags::bitflags;
use byteorder::{BigEndian, ByteOrder};

/// Mac Roman to Unicode lookup table for bytes 0x80-0xFF.
static MAC_ROMAN_TABLE: [char; 128] = [
    '\u{00C4}', '\u{00C5}', '\u{00C7}', '\u{00C9}', '\u{00D1}', '\u{00D6}', '\u{00DC}', '\u{00E1}',
    '\u{00E0}', '\u{00E2}', '\u{00E4}', '\u{00E3}', '\u{00E5}', '\u{00E7}', '\u{00E9}', '\u{00E8}',
    '\u{00EA}', '\u{00EB}', '\u{00ED}', '\u{00EC}', '\u{00EE}', '\u{00EF}', '\u{00F1}', '\u{00F3}',
    '\u{00F2}', '\u{00F4}', '\u{00F6}', '\u{00F5}', '\u{00FA}', '\u{00F9}', '\u{00FB}', '\u{00FC}',
    '\u{2020}', '\u{00B0}', '\u{00A2}', '\u{00A3}', '\u{00A7}', '\u{2022}', '\u{00B6}', '\u{00DF}',
    '\u{00AE}', '\u{00A9}', '\u{2122}', '\u{00B4}', '\u{00A8}', '\u{2260}', '\u{00C6}', '\u{00D8}',
    '\u{221E}', '\u{00B1}', '\u{2264}', '\u{2265}', '\u{00A5}', '\u{00B5}', '\u{2202}', '\u{2211}',
    '\u{220F}', '\u{03C0}', '\u{222B}', '\u{00AA}', '\u{00BA}', '\u{03A9}', '\u{00E6}', '\u{00F8}',
    '\u{00BF}', '\u{00A1}', '\u{00AC}', '\u{221A}', '\u{0192}', '\u{2248}', '\u{2206}', '\u{00AB}',
    '\u{00BB}', '\u{2026}', '\u{00A0}', '\u{00C0}', '\u{00C3}', '\u{00D5}', '\u{0152}', '\u{0153}',
    '\u{2013}', '\u{2014}', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}', '\u{00F7}', '\u{25CA}',
    '\u{00FF}', '\u{0178}', '\u{2044}', '\u{20AC}', '\u{2039}', '\u{203A}', '\u{FB01}', '\u{FB02}',
    '\u{2021}', '\u{00B7}', '\u{201A}', '\u{201E}', '\u{2030}', '\u{00C2}', '\u{00CA}', '\u{00C1}',
    '\u{00CB}', '\u{00C8}', '\u{00CD}', '\u{00CE}', '\u{00CF}', '\u{00CC}', '\u{00D3}', '\u{00D4}',
    '\u{F8FF}', '\u{00D2}', '\u{00DA}', '\u{00DB}', '\u{00D9}', '\u{0131}', '\u{02C6}', '\u{02DC}',
    '\u{00AF}', '\u{02D8}', '\u{02D9}', '\u{02DA}', '\u{00B8}', '\u{02DD}', '\u{02DB}', '\u{02C7}',
];

/// Decode a Mac Roman byte string to UTF-8.
pub fn mac_roman_to_utf8(data: &[u8]) -> String {
    data.iter()
        .map(|&b| {
            if b < 0x80 {
                b as char
            } else {
                MAC_ROMAN_TABLE[(b - 0x80) as usize]
            }
        })
        .collect()
}

/// Decode a 4-byte Mac OS type/creator code to a string.
/// Non-printable bytes are replaced with '.'.
pub fn decode_fourcc(data: &[u8]) -> String {
    data.iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}

bitflags! {
    /// Finder flags (`fdFlags`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FinderFlags: u16 {
        const IS_ON_DESK = 0x0001;
        const IS_SHARED = 0x0040;
        const HAS_NO_INITS = 0x0080;
        const HAS_BEEN_INITED = 0x0100;
        const HAS_CUSTOM_ICON = 0x0400;
        const IS_STATIONERY = 0x0800;
        const NAME_LOCKED = 0x1000;
        const HAS_BUNDLE = 0x2000;
        const IS_INVISIBLE = 0x4000;
        const IS_ALIAS = 0x8000;
    }
}

/// Classic Finder info (`FInfo`), 16 bytes big-endian on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FinderInfo {
    pub file_type: [u8; 4],
    pub creator: [u8; 4],
    pub flags: FinderFlags,
    /// Icon position in the window, vertical then horizontal.
    pub location: (i16, i16),
    pub folder: i16,
}

pub const FINDER_INFO_SIZE: usize = 16;

impl FinderInfo {
    pub fn new(file_type: [u8; 4], creator: [u8; 4], flags: u16) -> Self {
        FinderInfo {
            file_type,
            creator,
            flags: FinderFlags::from_bits_retain(flags),
            ..Default::default()
        }
    }

    pub fn parse(data: &[u8]) -> Self {
        let mut file_type = [0u8; 4];
        let mut creator = [0u8; 4];
        file_type.copy_from_slice(&data[0..4]);
        creator.copy_from_slice(&data[4..8]);
        FinderInfo {
            file_type,
            creator,
            flags: FinderFlags::from_bits_retain(BigEndian::read_u16(&data[8..10])),
            location: (
                BigEndian::read_i16(&data[10..12]),
                BigEndian::read_i16(&data[12..14]),
            ),
            folder: BigEndian::read_i16(&data[14..16]),
        }
    }

    pub fn to_bytes(&self) -> [u8; FINDER_INFO_SIZE] {
        let mut out = [0u8; FINDER_INFO_SIZE];
        out[0..4].copy_from_slice(&self.file_type);
        out[4..8].copy_from_slice(&self.creator);
        BigEndian::write_u16(&mut out[8..10], self.flags.bits());
        BigEndian::write_i16(&mut out[10..12], self.location.0);
        BigEndian::write_i16(&mut out[12..14], self.location.1);
        BigEndian::write_i16(&mut out[14..16], self.folder);
        out
    }

    pub fn type_code(&self) -> String {
        decode_fourcc(&self.file_type)
    }

    pub fn creator_code(&self) -> String {
        decode_fourcc(&self.creator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_roman_to_utf8_ascii() {
        let data = b"Hello World";
        assert_eq!(mac_roman_to_utf8(data), "Hello World");
    }

    #[test]
    fn test_mac_roman_to_utf8_special() {
        // 0x80 = Ä, 0x81 = Å, 0x87 = á
        let data = [0x80, 0x81, 0x87];
        assert_eq!(mac_roman_to_utf8(&data), "ÄÅá");
    }

    #[test]
    fn test_decode_fourcc() {
        assert_eq!(decode_fourcc(b"TEXT"), "TEXT");
        assert_eq!(decode_fourcc(&[b'A', 0, b'P', 0x7F]), "A.P.");
    }

    #[test]
    fn test_finder_info_layout() {
        let info = FinderInfo::new(*b"APPL", *b"ttxt", 0x2000);
        let bytes = info.to_bytes();
        assert_eq!(&bytes[0..4], b"APPL");
        assert_eq!(&bytes[4..8], b"ttxt");
        assert_eq!(BigEndian::read_u16(&bytes[8..10]), 0x2000);
        assert_eq!(&bytes[10..16], &[0u8; 6]);

        let parsed = FinderInfo::parse(&bytes);
        assert!(parsed.flags.contains(FinderFlags::HAS_BUNDLE));
        assert_eq!(parsed.type_code(), "APPL");
        assert_eq!(parsed.creator_code(), "ttxt");
    }
}
