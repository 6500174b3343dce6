//! Physical sector normalization.
//!
//! Optical images store sectors in several physical shapes. Everything above
//! this module works on cooked user data, so each shape is reduced here:
//!
//! | bytes | layout                                                        |
//! | ----- | ------------------------------------------------------------- |
//! | 2048  | cooked Mode 1 or Mode 2 Form 1 user data                      |
//! | 2324  | cooked Mode 2 Form 2 user data                                |
//! | 2336  | Mode 2 subheader (8 bytes) followed by Form 1 or Form 2 data  |
//! | 2352  | sync (12) + header (4) + mode-dependent payload               |

pub const COOKED_SECTOR_SIZE: usize = 2048;
pub const MODE2_FORM2_DATA_SIZE: usize = 2324;
pub const MODE2_SECTOR_SIZE: usize = 2336;
pub const RAW_SECTOR_SIZE: usize = 2352;

/// Sync pattern at the start of every raw data sector (12 bytes).
pub const SYNC_PATTERN: [u8; 12] = [
    0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00,
];

/// Submode bit selecting Form 2 (2324 user bytes, no ECC).
const SUBMODE_FORM2: u8 = 0x20;

static MODE0_USER_DATA: [u8; COOKED_SECTOR_SIZE] = [0u8; COOKED_SECTOR_SIZE];

/// The first copy of a CD-ROM XA Mode 2 subheader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode2Subheader {
    pub file_number: u8,
    pub channel: u8,
    pub submode: u8,
    pub coding: u8,
}

impl Mode2Subheader {
    fn parse(data: &[u8]) -> Self {
        Mode2Subheader {
            file_number: data[0],
            channel: data[1],
            submode: data[2],
            coding: data[3],
        }
    }

    pub fn is_form2(&self) -> bool {
        self.submode & SUBMODE_FORM2 != 0
    }
}

/// True if `sector` is a raw 2352-byte frame starting with the sync pattern.
pub fn has_sync(sector: &[u8]) -> bool {
    sector.len() == RAW_SECTOR_SIZE && sector[..12] == SYNC_PATTERN
}

/// Extract the cooked user data from one physical sector.
///
/// Returns `None` when `interleaved` is set and the sector's subheader names a
/// different file number, i.e. the sector belongs to another interleaved file.
/// Sectors of unknown shape (including raw audio) are returned unchanged.
pub fn user_data(sector: &[u8], interleaved: bool, file_number: u8) -> Option<&[u8]> {
    match sector.len() {
        RAW_SECTOR_SIZE if has_sync(sector) => match sector[15] {
            0 => Some(&MODE0_USER_DATA[..]),
            1 => Some(&sector[16..16 + COOKED_SECTOR_SIZE]),
            2 => mode2_user_data(&sector[16..], interleaved, file_number),
            _ => Some(&sector[16..16 + COOKED_SECTOR_SIZE]),
        },
        MODE2_SECTOR_SIZE => mode2_user_data(sector, interleaved, file_number),
        _ => Some(sector),
    }
}

/// `data` starts at the subheader (8 bytes: two copies of 4).
fn mode2_user_data(data: &[u8], interleaved: bool, file_number: u8) -> Option<&[u8]> {
    let subheader = Mode2Subheader::parse(&data[0..4]);
    if interleaved && subheader.file_number != file_number {
        return None;
    }
    let len = if subheader.is_form2() {
        MODE2_FORM2_DATA_SIZE
    } else {
        COOKED_SECTOR_SIZE
    };
    Some(&data[8..8 + len])
}

/// Both copies of the Mode 2 subheader, if `sector` carries one.
pub fn subheaders(sector: &[u8]) -> Option<([u8; 4], [u8; 4])> {
    let base = match sector.len() {
        RAW_SECTOR_SIZE if has_sync(sector) && sector[15] == 2 => 16,
        MODE2_SECTOR_SIZE => 0,
        _ => return None,
    };
    let mut first = [0u8; 4];
    let mut copy = [0u8; 4];
    first.copy_from_slice(&sector[base..base + 4]);
    copy.copy_from_slice(&sector[base + 4..base + 8]);
    Some((first, copy))
}
