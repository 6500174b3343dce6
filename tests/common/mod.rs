//! Builds small ISO9660 images in memory.
//!
//! Records, descriptors and path tables are laid out byte for byte so the
//! tests exercise the same decoding paths a pressed disc would.

#![allow(dead_code)]

use rusty_iso9660::fs::iso9660::{Iso9660Filesystem, MountOptions, Namespace, TextEncoding};
use rusty_iso9660::optical::RawImage;
use std::io::Cursor;

pub const BLOCK: usize = 2048;

pub const FLAG_DIRECTORY: u8 = 0x02;
pub const FLAG_ASSOCIATED: u8 = 0x04;
pub const FLAG_MULTI_EXTENT: u8 = 0x80;

/// An image under construction, made of 2048-byte blocks.
pub struct ImageBuilder {
    data: Vec<u8>,
}

impl ImageBuilder {
    pub fn new(blocks: usize) -> Self {
        ImageBuilder {
            data: vec![0u8; blocks * BLOCK],
        }
    }

    /// Copy `bytes` to the start of block `lba`.
    pub fn write(&mut self, lba: u32, bytes: &[u8]) -> &mut Self {
        let start = lba as usize * BLOCK;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        self
    }

    /// Fill block `lba` with `byte`.
    pub fn fill(&mut self, lba: u32, byte: u8) -> &mut Self {
        self.write(lba, &[byte; BLOCK])
    }

    /// Write a directory at `extent`: `.` (carrying `self_system_use`), `..`
    /// and `records`, one block per 2048 bytes of records. Returns the
    /// directory size in bytes.
    pub fn directory(
        &mut self,
        extent: u32,
        parent: u32,
        self_system_use: &[u8],
        records: &[Vec<u8>],
    ) -> u32 {
        let mut blocks: Vec<Vec<u8>> = vec![Vec::new()];
        let mut all = vec![
            record(extent, 0, FLAG_DIRECTORY, &[0], self_system_use),
            record(parent, BLOCK as u32, FLAG_DIRECTORY, &[1], &[]),
        ];
        all.extend(records.iter().cloned());
        for rec in all {
            let fits = blocks.last().is_some_and(|b| b.len() + rec.len() <= BLOCK);
            if !fits {
                blocks.push(Vec::new());
            }
            if let Some(last) = blocks.last_mut() {
                last.extend(rec);
            }
        }
        let size = (blocks.len() * BLOCK) as u32;
        // The `.` record carries the directory's own size.
        set_both32(&mut blocks[0][10..18], size);
        for (i, block) in blocks.iter().enumerate() {
            self.write(extent + i as u32, block);
        }
        size
    }

    pub fn build(&self) -> Vec<u8> {
        self.data.clone()
    }
}

fn set_both32(field: &mut [u8], value: u32) {
    field[0..4].copy_from_slice(&value.to_le_bytes());
    field[4..8].copy_from_slice(&value.to_be_bytes());
}

fn set_both16(field: &mut [u8], value: u16) {
    field[0..2].copy_from_slice(&value.to_le_bytes());
    field[2..4].copy_from_slice(&value.to_be_bytes());
}

/// An ISO9660 directory record.
pub fn record(extent: u32, size: u32, flags: u8, name: &[u8], system_use: &[u8]) -> Vec<u8> {
    let name_end = 33 + name.len();
    let su_start = name_end + name_end % 2;
    let mut len = su_start + system_use.len();
    len += len % 2;
    let mut rec = vec![0u8; len];
    rec[0] = len as u8;
    set_both32(&mut rec[2..10], extent);
    set_both32(&mut rec[10..18], size);
    // 1995-08-24 12:00:00 GMT
    rec[18..25].copy_from_slice(&[95, 8, 24, 12, 0, 0, 0]);
    rec[25] = flags;
    set_both16(&mut rec[28..32], 1);
    rec[32] = name.len() as u8;
    rec[33..name_end].copy_from_slice(name);
    rec[su_start..su_start + system_use.len()].copy_from_slice(system_use);
    rec
}

/// Which volume descriptor to build.
pub enum Descriptor<'a> {
    Primary,
    Joliet,
    Enhanced,
    Boot(&'a str),
}

/// A volume descriptor whose root directory is `root` (extent, size) and
/// whose M path table is `path_table` (location, size).
pub fn descriptor(
    kind: Descriptor<'_>,
    volume_id: &str,
    blocks: u32,
    root: (u32, u32),
    path_table: (u32, u32),
) -> Vec<u8> {
    let mut vd = vec![0u8; BLOCK];
    vd[1..6].copy_from_slice(b"CD001");
    vd[6] = 1;
    let joliet = matches!(kind, Descriptor::Joliet);
    match kind {
        Descriptor::Primary => vd[0] = 1,
        Descriptor::Joliet => {
            vd[0] = 2;
            vd[88..91].copy_from_slice(b"%/E");
        }
        Descriptor::Enhanced => {
            vd[0] = 2;
            vd[6] = 2;
        }
        Descriptor::Boot(system) => {
            vd[0] = 0;
            let id = pad(system.as_bytes(), 32, false);
            vd[7..39].copy_from_slice(&id);
            return vd;
        }
    }
    let id = if joliet {
        pad(&ucs2(volume_id), 32, true)
    } else {
        pad(volume_id.as_bytes(), 32, false)
    };
    vd[8..40].copy_from_slice(&pad(b"TEST SYSTEM", 32, false));
    vd[40..72].copy_from_slice(&id);
    set_both32(&mut vd[80..88], blocks);
    set_both16(&mut vd[120..124], 1);
    set_both16(&mut vd[124..128], 1);
    set_both16(&mut vd[128..132], BLOCK as u16);
    set_both32(&mut vd[132..140], path_table.1);
    vd[148..152].copy_from_slice(&path_table.0.to_be_bytes());
    let root_record = record(root.0, root.1, FLAG_DIRECTORY, &[0], &[]);
    vd[156..156 + root_record.len()].copy_from_slice(&root_record);
    vd[190..318].fill(b' ');
    vd[813..830].copy_from_slice(b"2024010112000000\0");
    vd[830..847].copy_from_slice(b"2024020112000000\0");
    vd
}

pub fn terminator() -> Vec<u8> {
    let mut vd = vec![0u8; BLOCK];
    vd[0] = 255;
    vd[1..6].copy_from_slice(b"CD001");
    vd[6] = 1;
    vd
}

fn pad(bytes: &[u8], len: usize, ucs2: bool) -> Vec<u8> {
    let mut out = bytes.to_vec();
    while out.len() < len {
        if ucs2 {
            out.extend_from_slice(&[0, b' ']);
        } else {
            out.push(b' ');
        }
    }
    out.truncate(len);
    out
}

pub fn ucs2(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(|c| c.to_be_bytes()).collect()
}

/// A big-endian path table from (name, extent, parent) triples.
pub fn path_table(entries: &[(&[u8], u32, u16)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (name, extent, parent) in entries {
        out.push(name.len() as u8);
        out.push(0);
        out.extend_from_slice(&extent.to_be_bytes());
        out.extend_from_slice(&parent.to_be_bytes());
        out.extend_from_slice(name);
        if name.len() % 2 == 1 {
            out.push(0);
        }
    }
    out
}

/// A system use record: signature, length, version 1, payload.
pub fn su(signature: &[u8; 2], payload: &[u8]) -> Vec<u8> {
    let mut out = signature.to_vec();
    out.push((4 + payload.len()) as u8);
    out.push(1);
    out.extend_from_slice(payload);
    out
}

fn both32(value: u32) -> Vec<u8> {
    let mut out = value.to_le_bytes().to_vec();
    out.extend_from_slice(&value.to_be_bytes());
    out
}

/// SP, ER and PX records for the root `.` of a Rock Ridge volume.
pub fn rock_ridge_root() -> Vec<u8> {
    let mut area = su(b"SP", &[0xBE, 0xEF, 0]);
    let mut er = vec![10, 0, 0, 1];
    er.extend_from_slice(b"RRIP_1991A");
    area.extend(su(b"ER", &er));
    area.extend(px(0o040755, 0, 0));
    area
}

pub fn px(mode: u32, uid: u32, gid: u32) -> Vec<u8> {
    let mut payload = both32(mode);
    payload.extend(both32(1));
    payload.extend(both32(uid));
    payload.extend(both32(gid));
    su(b"PX", &payload)
}

pub fn nm(name: &str) -> Vec<u8> {
    let mut payload = vec![0];
    payload.extend_from_slice(name.as_bytes());
    su(b"NM", &payload)
}

/// SL record with one plain path component per element.
pub fn sl(components: &[&str]) -> Vec<u8> {
    let mut payload = vec![0];
    for component in components {
        payload.push(0);
        payload.push(component.len() as u8);
        payload.extend_from_slice(component.as_bytes());
    }
    su(b"SL", &payload)
}

/// Apple extension record with HFS type, creator and Finder flags.
pub fn apple_hfs(file_type: &[u8; 4], creator: &[u8; 4], flags: u16) -> Vec<u8> {
    let mut out = b"AA".to_vec();
    out.push(14);
    out.push(2);
    out.extend_from_slice(file_type);
    out.extend_from_slice(creator);
    out.extend_from_slice(&flags.to_be_bytes());
    out
}

/// Wrap each 2048-byte block in a Mode 1 raw frame.
pub fn to_mode1_raw(cooked: &[u8]) -> Vec<u8> {
    let sync = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];
    let mut out = Vec::with_capacity(cooked.len() / BLOCK * 2352);
    for block in cooked.chunks(BLOCK) {
        let mut frame = vec![0u8; 2352];
        frame[..12].copy_from_slice(&sync);
        frame[15] = 1;
        frame[16..16 + block.len()].copy_from_slice(block);
        out.extend(frame);
    }
    out
}

/// Deterministic file content.
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

pub fn mount_with(image: Vec<u8>, options: &MountOptions, namespace: Namespace) -> Iso9660Filesystem {
    let media = RawImage::open(Cursor::new(image), BLOCK).expect("image");
    let mut fs = Iso9660Filesystem::new();
    fs.mount(Box::new(media), 0, TextEncoding::Latin1, options, namespace)
        .expect("mount");
    fs
}

pub fn mount(image: Vec<u8>, namespace: Namespace) -> Iso9660Filesystem {
    mount_with(image, &MountOptions::default(), namespace)
}

// Layout of the sample disc.
pub const PRIMARY_PATH_TABLE: u32 = 19;
pub const ROOT: u32 = 20;
pub const DOCS: u32 = 21;
pub const JOLIET_PATH_TABLE: u32 = 22;
pub const JOLIET_ROOT: u32 = 30;
pub const JOLIET_DOCS: u32 = 31;
pub const README: u32 = 40;
pub const BIG_FIRST: u32 = 42;
pub const BIG_SECOND: u32 = 44;
pub const NOTE: u32 = 46;
pub const MAC_RSRC: u32 = 47;
pub const MAC_DATA: u32 = 48;
pub const TRANS_TBL: u32 = 49;
pub const SAMPLE_BLOCKS: u32 = 52;

pub const README_LEN: usize = 3000;
pub const BIG_SECOND_LEN: usize = 1000;
pub const NOTE_TEXT: &[u8] = b"hello notes";
pub const MAC_DATA_TEXT: &[u8] = b"data fork";
pub const MAC_RSRC_LEN: usize = 100;
pub const TRANS_TEXT: &[u8] = b"F NOTE.TXT;1    Long Note Name.txt\n";

/// Options for the sample disc.
pub struct Sample {
    pub joliet: bool,
    pub rock_ridge: bool,
    /// Root extent recorded in the primary descriptor.
    pub descriptor_root: u32,
}

impl Default for Sample {
    fn default() -> Self {
        Sample {
            joliet: true,
            rock_ridge: true,
            descriptor_root: ROOT,
        }
    }
}

/// A disc with a primary tree, an optional Joliet tree and optional Rock
/// Ridge records:
///
/// ```text
/// /README.TXT     3000 bytes   (Rock Ridge: readme.txt, mode 0644)
/// /BIG.DAT        2 extents, 2048 + 1000 bytes
/// /LINK           symlink to readme.txt (Rock Ridge only)
/// /MACFILE        data fork + associated resource fork, Finder info
/// /DOCS/NOTE.TXT  "hello notes"
/// /DOCS/TRANS.TBL
/// ```
pub fn sample_image(sample: &Sample) -> Vec<u8> {
    let mut img = ImageBuilder::new(SAMPLE_BLOCKS as usize);

    let rr = |records: &[Vec<u8>]| -> Vec<u8> {
        if sample.rock_ridge {
            records.concat()
        } else {
            Vec::new()
        }
    };

    let docs_size = img.directory(
        DOCS,
        ROOT,
        &[],
        &[
            record(NOTE, NOTE_TEXT.len() as u32, 0, b"NOTE.TXT;1", &rr(&[nm("note.txt")])),
            record(TRANS_TBL, TRANS_TEXT.len() as u32, 0, b"TRANS.TBL;1", &[]),
        ],
    );

    let mut root_records = vec![
        record(
            BIG_FIRST,
            BLOCK as u32,
            FLAG_MULTI_EXTENT,
            b"BIG.DAT;1",
            &rr(&[nm("big.dat")]),
        ),
        record(
            BIG_SECOND,
            BIG_SECOND_LEN as u32,
            0,
            b"BIG.DAT;1",
            &rr(&[nm("big.dat")]),
        ),
        record(DOCS, docs_size, FLAG_DIRECTORY, b"DOCS", &rr(&[nm("docs")])),
    ];
    if sample.rock_ridge {
        root_records.push(record(
            0,
            0,
            0,
            b"LINK.;1",
            &[px(0o120777, 0, 0), nm("link"), sl(&["readme.txt"])].concat(),
        ));
    }
    root_records.extend([
        record(
            MAC_RSRC,
            MAC_RSRC_LEN as u32,
            FLAG_ASSOCIATED,
            b"MACFILE.;1",
            &apple_hfs(b"TEXT", b"ttxt", 0),
        ),
        record(
            MAC_DATA,
            MAC_DATA_TEXT.len() as u32,
            0,
            b"MACFILE.;1",
            &apple_hfs(b"TEXT", b"ttxt", 0),
        ),
        record(
            README,
            README_LEN as u32,
            0,
            b"README.TXT;1",
            &rr(&[px(0o100644, 1000, 100), nm("readme.txt")]),
        ),
    ]);
    let root_su = if sample.rock_ridge {
        rock_ridge_root()
    } else {
        Vec::new()
    };
    let root_size = img.directory(ROOT, ROOT, &root_su, &root_records);

    let table = path_table(&[(&[0], ROOT, 1), (b"DOCS", DOCS, 1)]);
    img.write(PRIMARY_PATH_TABLE, &table);

    let mut lba = 16;
    img.write(
        lba,
        &descriptor(
            Descriptor::Primary,
            "PRIMARY_LABEL",
            SAMPLE_BLOCKS,
            (sample.descriptor_root, root_size),
            (PRIMARY_PATH_TABLE, table.len() as u32),
        ),
    );
    lba += 1;

    if sample.joliet {
        let jdocs_size = img.directory(
            JOLIET_DOCS,
            JOLIET_ROOT,
            &[],
            &[record(
                NOTE,
                NOTE_TEXT.len() as u32,
                0,
                &ucs2("A Note.txt;1"),
                &[],
            )],
        );
        let jroot_size = img.directory(
            JOLIET_ROOT,
            JOLIET_ROOT,
            &[],
            &[
                record(JOLIET_DOCS, jdocs_size, FLAG_DIRECTORY, &ucs2("Documents"), &[]),
                record(
                    README,
                    README_LEN as u32,
                    0,
                    &ucs2("Read Me First.txt;1"),
                    &[],
                ),
            ],
        );
        let docs_name = ucs2("Documents");
        let jtable = path_table(&[(&[0], JOLIET_ROOT, 1), (&docs_name, JOLIET_DOCS, 1)]);
        img.write(JOLIET_PATH_TABLE, &jtable);
        img.write(
            lba,
            &descriptor(
                Descriptor::Joliet,
                "Joliet Label",
                SAMPLE_BLOCKS,
                (JOLIET_ROOT, jroot_size),
                (JOLIET_PATH_TABLE, jtable.len() as u32),
            ),
        );
        lba += 1;
    }
    img.write(lba, &terminator());

    img.write(README, &pattern(README_LEN, 1));
    img.write(BIG_FIRST, &pattern(BLOCK, 2));
    img.fill(BIG_FIRST + 1, 0xEE);
    img.write(BIG_SECOND, &pattern(BIG_SECOND_LEN, 3));
    img.write(NOTE, NOTE_TEXT);
    img.write(MAC_RSRC, &pattern(MAC_RSRC_LEN, 4));
    img.write(MAC_DATA, MAC_DATA_TEXT);
    img.write(TRANS_TBL, TRANS_TEXT);
    img.build()
}

/// Contents of BIG.DAT.
pub fn big_dat() -> Vec<u8> {
    let mut data = pattern(BLOCK, 2);
    data.extend(pattern(BIG_SECOND_LEN, 3));
    data
}
