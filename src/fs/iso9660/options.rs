//! Mount options, name spaces and text encodings.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::consts::NAME_SLASH_SUBSTITUTE;
use super::record::DirectoryFormat;
use crate::fs::apple::mac_roman_to_utf8;
use crate::fs::filesystem::FilesystemError;

/// Which naming layer file names are taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Plain ISO9660 identifiers with the `;1` version suffix stripped.
    Normal,
    /// Plain identifiers with version suffixes kept.
    Vms,
    /// UCS-2 names from the Joliet supplementary descriptor.
    #[default]
    Joliet,
    /// Rock Ridge alternate names (NM).
    Rrip,
    /// Long ISO9660 identifiers, kept verbatim.
    Romeo,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Normal => "normal",
            Namespace::Vms => "vms",
            Namespace::Joliet => "joliet",
            Namespace::Rrip => "rrip",
            Namespace::Romeo => "romeo",
        }
    }

    /// Whether the `;1` version suffix is stripped from identifiers.
    fn strips_version(&self) -> bool {
        matches!(self, Namespace::Normal | Namespace::Joliet | Namespace::Rrip)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = FilesystemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" | "iso9660" => Ok(Namespace::Normal),
            "vms" => Ok(Namespace::Vms),
            "joliet" => Ok(Namespace::Joliet),
            "rrip" | "rockridge" | "rock-ridge" => Ok(Namespace::Rrip),
            "romeo" => Ok(Namespace::Romeo),
            other => Err(FilesystemError::InvalidArgument(format!(
                "unknown namespace '{other}'"
            ))),
        }
    }
}

/// Character set for non-Joliet identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    #[default]
    Latin1,
    MacRoman,
    Utf8,
}

impl TextEncoding {
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            TextEncoding::MacRoman => mac_roman_to_utf8(bytes),
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

impl FromStr for TextEncoding {
    type Err = FilesystemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "latin1" | "latin-1" | "iso-8859-1" | "ascii" => Ok(TextEncoding::Latin1),
            "macroman" | "mac-roman" | "macintosh" => Ok(TextEncoding::MacRoman),
            "utf8" | "utf-8" => Ok(TextEncoding::Utf8),
            other => Err(FilesystemError::InvalidArgument(format!(
                "unknown text encoding '{other}'"
            ))),
        }
    }
}

/// Decode big-endian UCS-2 (Joliet) text. Unpaired surrogates become U+FFFD.
pub fn decode_ucs2be(bytes: &[u8]) -> String {
    char::decode_utf16(
        bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]])),
    )
    .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
    .collect()
}

/// Mount-time switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountOptions {
    /// Take subdirectories from the path table instead of directory records.
    pub use_path_table: bool,
    /// Rename entries according to `TRANS.TBL` files.
    pub use_trans_tbl: bool,
    /// Read the Enhanced Volume Descriptor instead of the primary one.
    pub use_evd: bool,
    /// Expose relocated directories and allow reading directories as files.
    pub debug: bool,
}

impl MountOptions {
    /// Build options from string key/value pairs as passed on a mount command line.
    /// Unknown keys are ignored.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, FilesystemError> {
        let flag = |key: &str| -> Result<bool, FilesystemError> {
            match map.get(key) {
                None => Ok(false),
                Some(value) => parse_bool(key, value),
            }
        };
        Ok(MountOptions {
            use_path_table: flag("use_path_table")?,
            use_trans_tbl: flag("use_trans_tbl")?,
            use_evd: flag("use_evd")?,
            debug: flag("debug")?,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, FilesystemError> {
        serde_json::from_str(json)
            .map_err(|e| FilesystemError::InvalidArgument(format!("mount options: {e}")))
    }

    pub fn load_from_path(path: &Path) -> Result<Self, FilesystemError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, FilesystemError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" | "" => Ok(false),
        _ => Err(FilesystemError::InvalidArgument(format!(
            "option {key}: expected a boolean, got '{value}'"
        ))),
    }
}

/// Per-session decoding parameters, fixed at mount.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DecodeSettings {
    pub format: DirectoryFormat,
    pub namespace: Namespace,
    pub encoding: TextEncoding,
    /// Names are UCS-2 (Joliet hierarchy).
    pub joliet: bool,
    pub use_path_table: bool,
    pub use_trans_tbl: bool,
    /// Bytes to skip at the start of every system use area (from SP).
    pub susp_skip: usize,
    pub debug: bool,
}

impl DecodeSettings {
    pub fn decode_name(&self, bytes: &[u8]) -> String {
        if self.joliet {
            decode_ucs2be(bytes)
        } else {
            self.encoding.decode(bytes)
        }
    }

    /// Turn a raw identifier into the name exposed for this namespace.
    pub fn normalize_name(&self, name: &str) -> String {
        let mut name = name.replace('/', &NAME_SLASH_SUBSTITUTE.to_string());
        if name.ends_with('.') {
            name.pop();
        }
        if name.ends_with(".;1") {
            let cut = name.len() - 3;
            name.replace_range(cut.., ";1");
        }
        if self.namespace.strips_version() && name.ends_with(";1") {
            name.truncate(name.len() - 2);
            if name.ends_with('.') {
                name.pop();
            }
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(namespace: Namespace) -> DecodeSettings {
        DecodeSettings {
            format: DirectoryFormat::Iso9660,
            namespace,
            encoding: TextEncoding::Latin1,
            joliet: namespace == Namespace::Joliet,
            use_path_table: false,
            use_trans_tbl: false,
            susp_skip: 0,
            debug: false,
        }
    }

    #[test]
    fn test_normalize_strips_version() {
        let normal = settings(Namespace::Normal);
        assert_eq!(normal.normalize_name("README.TXT;1"), "README.TXT");
        assert_eq!(normal.normalize_name("NOEXT.;1"), "NOEXT");
        assert_eq!(normal.normalize_name("NOEXT."), "NOEXT");
        assert_eq!(normal.normalize_name("A/B"), "A\u{2215}B");
    }

    #[test]
    fn test_normalize_keeps_version_for_vms_and_romeo() {
        assert_eq!(settings(Namespace::Vms).normalize_name("README.TXT;1"), "README.TXT;1");
        assert_eq!(settings(Namespace::Vms).normalize_name("NOEXT.;1"), "NOEXT;1");
        assert_eq!(settings(Namespace::Romeo).normalize_name("long name;1"), "long name;1");
    }

    #[test]
    fn test_decode_ucs2be() {
        assert_eq!(decode_ucs2be(&[0x00, b'A', 0x00, b'b', 0x04, 0x10]), "Ab\u{0410}");
        assert_eq!(decode_ucs2be(&[0xD8, 0x00]), "\u{FFFD}");
    }

    #[test]
    fn test_text_encodings() {
        assert_eq!(TextEncoding::Latin1.decode(&[0x41, 0xE9]), "Aé");
        assert_eq!(TextEncoding::MacRoman.decode(&[0x8E]), "é");
        assert_eq!(TextEncoding::Utf8.decode("né".as_bytes()), "né");
        assert_eq!("mac-roman".parse::<TextEncoding>().unwrap(), TextEncoding::MacRoman);
        assert!("ebcdic".parse::<TextEncoding>().is_err());
    }

    #[test]
    fn test_namespace_from_str() {
        assert_eq!("RRIP".parse::<Namespace>().unwrap(), Namespace::Rrip);
        assert_eq!("joliet".parse::<Namespace>().unwrap(), Namespace::Joliet);
        assert!(matches!(
            "hpfs".parse::<Namespace>(),
            Err(FilesystemError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_options_from_map() {
        let mut map = HashMap::new();
        map.insert("use_path_table".to_string(), "true".to_string());
        map.insert("debug".to_string(), "False".to_string());
        let options = MountOptions::from_map(&map).unwrap();
        assert!(options.use_path_table);
        assert!(!options.debug);
        assert!(!options.use_evd);

        map.insert("use_evd".to_string(), "maybe".to_string());
        assert!(MountOptions::from_map(&map).is_err());
    }

    #[test]
    fn test_options_json() {
        let options = MountOptions::from_json(r#"{ "use_trans_tbl": true }"#).unwrap();
        assert!(options.use_trans_tbl);
        assert!(!options.use_path_table);
        let back = MountOptions::from_json(&options.to_json()).unwrap();
        assert_eq!(back, options);
    }
}
