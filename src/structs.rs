use alloc::string::String;

use bitflags::bitflags;

use crate::config::*;
use crate::error::{FsError, Result};

/// Volume geometry, fixed at mount except for the table region which grows on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub sector_size: u64,
    pub disk_size: u64,
    pub table_sectors: u64,
}

impl Geometry {
    pub fn new(sector_size: u64, disk_size: u64, table_sectors: u64) -> Result<Self> {
        if !sector_size.is_power_of_two() || sector_size < MIN_SECTOR_SIZE {
            return Err(FsError::InvalidSectorSize(sector_size));
        }
        if table_sectors == 0 || table_sectors >= disk_size / sector_size {
            return Err(FsError::InvalidRegion);
        }
        Ok(Self { sector_size, disk_size, table_sectors })
    }

    pub fn total_sectors(&self) -> u64 {
        self.disk_size / self.sector_size
    }

    /// Number of blocks available to files: [0, data_blocks).
    pub fn data_blocks(&self) -> u64 {
        self.total_sectors() - self.table_sectors
    }

    /// Physical byte offset of a block. Block 0 is the last sector of the device.
    pub fn block_offset(&self, block: u64) -> u64 {
        self.disk_size - (block + 1) * self.sector_size
    }

    pub fn sector_shift(&self) -> u8 {
        (self.sector_size.trailing_zeros() - MIN_SECTOR_SHIFT) as u8
    }
}

/// First five bytes of sector 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableHeader {
    pub sector_shift: u8,
    pub table_sectors: u64,
}

impl TableHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(FsError::InvalidRegion);
        }
        if bytes[0] > 23 {
            return Err(FsError::InvalidSectorSize(bytes[0] as u64));
        }
        // The stored count excludes sector 0.
        let stored = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
        Ok(Self {
            sector_shift: bytes[0],
            table_sectors: stored as u64 + 1,
        })
    }

    pub fn to_bytes(&self) -> Result<[u8; HEADER_SIZE]> {
        let stored = u32::try_from(self.table_sectors - 1).map_err(|_| FsError::InvalidRegion)?;
        let size = stored.to_be_bytes();
        Ok([self.sector_shift, size[0], size[1], size[2], size[3]])
    }

    pub fn sector_size(&self) -> u64 {
        1 << (self.sector_shift as u32 + MIN_SECTOR_SHIFT)
    }
}

bitflags! {
    /// On-disk attribute bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Attributes: u32 {
        const HIDDEN = 0x8000;
        const DIRECTORY = 0x2000;
        const READONLY = 0x1000;
        const ARCHIVE = 0x0800;
        const REPARSE_POINT = 0x0400;
        const SYSTEM = 0x0080;
    }
}

/// Per-file metadata record. Times are seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileInfo {
    pub accessed: f64,
    pub written: f64,
    pub created: f64,
    pub gid: u32,
    pub uid: u32,
    pub mode: u16,
    pub attributes: Attributes,
}

impl FileInfo {
    pub fn new(now: f64, attributes: Attributes) -> Self {
        let mode = if attributes.contains(Attributes::DIRECTORY) {
            DIRECTORY_MODE
        } else {
            FILE_MODE
        };
        Self {
            accessed: now,
            written: now,
            created: now,
            gid: DEFAULT_GID,
            uid: DEFAULT_UID,
            mode,
            attributes,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.attributes.contains(Attributes::DIRECTORY)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    pub total_size: u64,
    pub free_size: u64,
    pub label: String,
}
