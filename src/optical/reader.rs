//! Sector-addressable access to optical disc images.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use log::debug;

use super::sector::{
    self, COOKED_SECTOR_SIZE, MODE2_FORM2_DATA_SIZE, MODE2_SECTOR_SIZE, RAW_SECTOR_SIZE,
    SYNC_PATTERN,
};

/// A medium the filesystem driver reads from.
///
/// Addresses are sector numbers on the medium. `read_sector` returns cooked
/// user data; `read_sector_raw` returns the sector as physically stored
/// (sync, header and subheader included) and is optional.
pub trait SectorReader: Send {
    /// Number of sectors on the medium.
    fn sector_count(&self) -> u64;

    /// Size in bytes of one cooked sector.
    fn sector_size(&self) -> u32 {
        COOKED_SECTOR_SIZE as u32
    }

    fn read_sector(&mut self, lba: u64) -> io::Result<Vec<u8>>;

    fn read_sector_raw(&mut self, _lba: u64) -> io::Result<Vec<u8>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "raw sector reads not supported by this medium",
        ))
    }

    /// Read `count` consecutive cooked sectors into one buffer.
    fn read_sectors(&mut self, lba: u64, count: u64) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(count as usize * self.sector_size() as usize);
        for i in 0..count {
            out.extend_from_slice(&self.read_sector(lba + i)?);
        }
        Ok(out)
    }
}

impl<T: SectorReader + ?Sized> SectorReader for Box<T> {
    fn sector_count(&self) -> u64 {
        (**self).sector_count()
    }

    fn sector_size(&self) -> u32 {
        (**self).sector_size()
    }

    fn read_sector(&mut self, lba: u64) -> io::Result<Vec<u8>> {
        (**self).read_sector(lba)
    }

    fn read_sector_raw(&mut self, lba: u64) -> io::Result<Vec<u8>> {
        (**self).read_sector_raw(lba)
    }

    fn read_sectors(&mut self, lba: u64, count: u64) -> io::Result<Vec<u8>> {
        (**self).read_sectors(lba, count)
    }
}

/// A flat image file made of fixed-size physical sectors (ISO, BIN, raw CD-i dumps).
pub struct RawImage<R: Read + Seek> {
    reader: R,
    physical_sector_size: usize,
    sector_count: u64,
}

impl<R: Read + Seek> RawImage<R> {
    /// Wrap `reader`, whose sectors are `physical_sector_size` bytes each.
    pub fn open(mut reader: R, physical_sector_size: usize) -> io::Result<Self> {
        if ![
            COOKED_SECTOR_SIZE,
            MODE2_FORM2_DATA_SIZE,
            MODE2_SECTOR_SIZE,
            RAW_SECTOR_SIZE,
        ]
        .contains(&physical_sector_size)
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported physical sector size {physical_sector_size}"),
            ));
        }
        let len = reader.seek(SeekFrom::End(0))?;
        Ok(RawImage {
            reader,
            physical_sector_size,
            sector_count: len / physical_sector_size as u64,
        })
    }

    /// Wrap `reader`, guessing the sector size from the sync pattern of
    /// sector 0 and the image length.
    pub fn detect(mut reader: R) -> io::Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        let mut head = [0u8; 12];
        let sector_size = match reader.read_exact(&mut head) {
            Ok(()) if head == SYNC_PATTERN && len % RAW_SECTOR_SIZE as u64 == 0 => RAW_SECTOR_SIZE,
            Ok(()) if len % COOKED_SECTOR_SIZE as u64 != 0 && len % MODE2_SECTOR_SIZE as u64 == 0 => {
                MODE2_SECTOR_SIZE
            }
            _ => COOKED_SECTOR_SIZE,
        };
        debug!("detected {sector_size}-byte sectors in {len}-byte image");
        Self::open(reader, sector_size)
    }

    pub fn physical_sector_size(&self) -> usize {
        self.physical_sector_size
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl RawImage<BufReader<File>> {
    pub fn open_path(path: &Path) -> io::Result<Self> {
        Self::detect(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek + Send> SectorReader for RawImage<R> {
    fn sector_count(&self) -> u64 {
        self.sector_count
    }

    fn read_sector(&mut self, lba: u64) -> io::Result<Vec<u8>> {
        let raw = self.read_sector_raw(lba)?;
        match sector::user_data(&raw, false, 0) {
            Some(user) => Ok(user.to_vec()),
            None => Ok(raw),
        }
    }

    fn read_sector_raw(&mut self, lba: u64) -> io::Result<Vec<u8>> {
        if lba >= self.sector_count {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("sector {lba} beyond end of image ({} sectors)", self.sector_count),
            ));
        }
        self.reader
            .seek(SeekFrom::Start(lba * self.physical_sector_size as u64))?;
        let mut buf = vec![0u8; self.physical_sector_size];
        self.reader.read_exact(&mut buf)?;
        Ok(buf)
    }
}
