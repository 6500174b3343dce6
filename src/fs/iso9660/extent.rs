//! Block-level access to the mounted volume and extent-list reads.

use log::{debug, trace};

use super::consts::DEFAULT_BLOCK_SIZE;
use crate::fs::filesystem::FilesystemError;
use crate::optical::sector::{self, RAW_SECTOR_SIZE};
use crate::optical::SectorReader;

/// The medium plus the geometry needed to turn logical blocks into sectors.
pub(crate) struct Volume {
    media: Box<dyn SectorReader>,
    partition_start: u64,
    block_size: u32,
}

impl Volume {
    pub fn new(media: Box<dyn SectorReader>, partition_start: u64) -> Self {
        Volume {
            media,
            partition_start,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn set_block_size(&mut self, block_size: u32) {
        if block_size == 0 {
            return;
        }
        self.block_size = block_size;
    }

    fn sector_size(&self) -> u64 {
        u64::from(self.media.sector_size()).max(1)
    }

    /// Logical blocks addressable after the partition start.
    pub fn block_count(&self) -> u64 {
        let sectors = self
            .media
            .sector_count()
            .saturating_sub(self.partition_start);
        let block = u64::from(self.block_size);
        let sector_size = self.sector_size();
        if block >= sector_size {
            sectors / block.div_ceil(sector_size)
        } else {
            sectors * (sector_size / block)
        }
    }

    /// Read one sector and reduce it to user data. `None` means the sector
    /// belongs to another file of an interleave.
    fn read_user_data(
        &mut self,
        sector: u64,
        interleaved: bool,
        file_number: u8,
    ) -> Result<Option<Vec<u8>>, FilesystemError> {
        // Interleave filtering needs the subheader, so prefer raw reads there.
        if interleaved {
            if let Ok(raw) = self.media.read_sector_raw(sector) {
                return Ok(sector::user_data(&raw, true, file_number).map(<[u8]>::to_vec));
            }
        }
        let data = match self.media.read_sector(sector) {
            Ok(data) => data,
            Err(err) => {
                debug!("cooked read of sector {sector} failed ({err}), trying raw");
                self.media.read_sector_raw(sector).map_err(|_| err)?
            }
        };
        Ok(sector::user_data(&data, interleaved, file_number).map(<[u8]>::to_vec))
    }

    /// Read logical block `lba`. The result is empty when every sector of the
    /// block was filtered out of an interleave.
    pub fn read_block(
        &mut self,
        lba: u32,
        interleaved: bool,
        file_number: u8,
    ) -> Result<Vec<u8>, FilesystemError> {
        let block = u64::from(self.block_size);
        let sector_size = self.sector_size();
        let lba = u64::from(lba);

        if block >= sector_size {
            let per_block = block.div_ceil(sector_size);
            let first = self.partition_start + lba * per_block;
            let mut out = Vec::with_capacity(block as usize);
            for sector in first..first + per_block {
                if let Some(data) = self.read_user_data(sector, interleaved, file_number)? {
                    out.extend_from_slice(&data);
                }
            }
            Ok(out)
        } else {
            let per_sector = sector_size / block;
            let sector = self.partition_start + lba / per_sector;
            let start = ((lba % per_sector) * block) as usize;
            match self.read_user_data(sector, interleaved, file_number)? {
                Some(data) if data.len() >= start => {
                    let end = (start + block as usize).min(data.len());
                    Ok(data[start..end].to_vec())
                }
                _ => Ok(Vec::new()),
            }
        }
    }

    /// The raw first sector of logical block `lba`, if the medium can
    /// return raw sectors.
    pub fn read_raw_block(&mut self, lba: u32) -> Option<Vec<u8>> {
        let block = u64::from(self.block_size);
        let sector_size = self.sector_size();
        let lba = u64::from(lba);
        let sector = if block >= sector_size {
            self.partition_start + lba * block.div_ceil(sector_size)
        } else {
            self.partition_start + lba / (sector_size / block)
        };
        self.media.read_sector_raw(sector).ok()
    }

    /// Read `size` bytes starting `offset` bytes into the byte stream formed by
    /// `extents` (each `(first block, byte length)`, in file order).
    ///
    /// Returns fewer bytes if the extents end first.
    pub fn read_with_extents(
        &mut self,
        offset: u64,
        size: u64,
        extents: &[(u32, u32)],
        interleaved: bool,
        file_number: u8,
    ) -> Result<Vec<u8>, FilesystemError> {
        let block = u64::from(self.block_size);
        let end_block = self.block_count();
        let mut out = Vec::with_capacity(size.min(1 << 24) as usize);
        let mut file_pos = 0u64;

        for &(extent, length) in extents {
            if out.len() as u64 >= size {
                break;
            }
            let length = u64::from(length);
            if file_pos + length <= offset {
                file_pos += length;
                continue;
            }
            let skip = offset.saturating_sub(file_pos);

            // Interleaved extents hold other files' sectors too, so block
            // arithmetic cannot locate `skip`; walk from the start instead.
            let (mut lba, mut consumed) = if interleaved {
                (u64::from(extent), 0)
            } else {
                let whole = skip / block;
                (u64::from(extent) + whole, whole * block)
            };
            let mut drop = skip - consumed;

            while consumed < length && (out.len() as u64) < size {
                if lba >= end_block {
                    debug!("extent at block {extent} runs past the end of the volume");
                    break;
                }
                let data = self.read_block(lba as u32, interleaved, file_number)?;
                lba += 1;
                if data.is_empty() {
                    continue;
                }
                let take = (data.len() as u64).min(length - consumed);
                consumed += take;
                if drop >= take {
                    drop -= take;
                    continue;
                }
                out.extend_from_slice(&data[drop as usize..take as usize]);
                drop = 0;
            }
            file_pos += length;
        }

        out.truncate(size as usize);
        trace!(
            "read {} of {size} bytes at offset {offset} from {} extent(s)",
            out.len(),
            extents.len()
        );
        Ok(out)
    }

    /// Read CD-i digital audio, which is stored as raw 2352-byte sectors
    /// starting at `extent`.
    pub fn read_digital_audio(
        &mut self,
        extent: u32,
        offset: u64,
        size: u64,
    ) -> Result<Vec<u8>, FilesystemError> {
        if size == 0 {
            return Ok(Vec::new());
        }
        let raw_size = RAW_SECTOR_SIZE as u64;
        let first_sector = offset / raw_size;
        let offset_in_sector = offset % raw_size;
        let sectors = (size + offset_in_sector).div_ceil(raw_size);

        let mut buf = Vec::with_capacity((sectors * raw_size) as usize);
        let start = self.partition_start + u64::from(extent) + first_sector;
        for sector in start..start + sectors {
            let raw = self.media.read_sector_raw(sector).map_err(|e| {
                FilesystemError::Unexpected(format!("reading audio sector {sector}: {e}"))
            })?;
            buf.extend_from_slice(&raw);
        }

        let begin = offset_in_sector as usize;
        let end = (begin + size as usize).min(buf.len());
        Ok(buf[begin.min(end)..end].to_vec())
    }
}
