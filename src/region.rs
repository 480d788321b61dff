//! Table region persistence.
//!
//! Layout from byte 0 of the device:
//! - header: sector-size shift, big-endian region size in sectors (minus one)
//! - packed table text, then `TABLE_END`
//! - filename list, then `NAMES_END`
//! - FileInfo array
//! - zero padding to a whole number of sectors

use alloc::vec;
use alloc::vec::Vec;

use crate::bitmap::FreeSpaceIndex;
use crate::codec::{decode, encode};
use crate::config::*;
use crate::error::{FsError, Result};
use crate::fileinfo;
use crate::names::FilenameList;
use crate::structs::{FileInfo, Geometry, TableHeader};
use crate::table::Table;
use crate::BlockDevice;

/// Everything the table region holds, decoded.
#[derive(Debug, Clone)]
pub struct Region {
    pub geometry: Geometry,
    pub table: Table,
    pub names: FilenameList,
    pub infos: Vec<FileInfo>,
}

fn check_sector_size(device: &impl BlockDevice, sector_size: u64) -> Result<()> {
    if !sector_size.is_power_of_two() || sector_size < MIN_SECTOR_SIZE {
        return Err(FsError::InvalidSectorSize(sector_size));
    }
    if sector_size % device.block_size() as u64 != 0 {
        return Err(FsError::Unaligned);
    }
    Ok(())
}

/// Writes an empty one-sector table region.
pub fn format_region(device: &impl BlockDevice, sector_size: u64) -> Result<Geometry> {
    check_sector_size(device, sector_size)?;
    let geometry = Geometry::new(sector_size, device.size(), 1)?;
    let header = TableHeader {
        sector_shift: geometry.sector_shift(),
        table_sectors: 1,
    };
    let mut buf = vec![0u8; sector_size as usize];
    buf[..HEADER_SIZE].copy_from_slice(&header.to_bytes()?);
    buf[HEADER_SIZE] = TABLE_END;
    buf[HEADER_SIZE + 1] = NAMES_END;
    device.write_blocks(0, &buf)?;
    device.flush()?;
    log::debug!(
        "formatted: sector size {}, {} data blocks",
        sector_size,
        geometry.data_blocks()
    );
    Ok(geometry)
}

fn find(bytes: &[u8], from: usize, sentinel: u8) -> Result<usize> {
    bytes[from..]
        .iter()
        .position(|&c| c == sentinel)
        .map(|p| p + from)
        .ok_or(FsError::InvalidRegion)
}

pub fn read_region(device: &impl BlockDevice) -> Result<Region> {
    let mut first = vec![0u8; device.block_size()];
    device.read_blocks(0, &mut first)?;
    let header = TableHeader::parse(&first)?;
    let sector_size = header.sector_size();
    check_sector_size(device, sector_size)?;
    let geometry = Geometry::new(sector_size, device.size(), header.table_sectors)?;

    let mut region = vec![0u8; (geometry.table_sectors * sector_size) as usize];
    device.read_blocks(0, &mut region)?;

    let table_end = find(&region, HEADER_SIZE, TABLE_END)?;
    let mut text = decode(&region[HEADER_SIZE..table_end])?;
    // Drop codec padding after the final entry.
    text.truncate(text.rfind(ENTRY_END as char).map_or(0, |pos| pos + 1));
    let table = Table::new(text)?;

    let names_end = find(&region, table_end + 1, NAMES_END)?;
    let names = FilenameList::parse(&region[table_end + 1..names_end])?;
    let infos = fileinfo::unpack(&region[names_end + 1..], names.len())?;
    if table.entry_count() != names.len() {
        return Err(FsError::InvalidRegion);
    }

    log::debug!(
        "read table region: {} sectors, {} files",
        geometry.table_sectors,
        names.len()
    );
    Ok(Region { geometry, table, names, infos })
}

/// Serialises the table, names and FileInfo array from sector 0, growing or shrinking the
/// region to fit. Fails without writing if growth would cover a block in use.
pub fn write_region(
    device: &impl BlockDevice,
    geometry: &mut Geometry,
    table: &Table,
    names: &FilenameList,
    infos: &[FileInfo],
    free_index: &mut FreeSpaceIndex,
) -> Result<()> {
    let packed = encode(table.as_str())?;
    let raw_names = names.to_bytes();
    let raw_infos = fileinfo::pack(infos);
    let len = HEADER_SIZE + packed.len() + 1 + raw_names.len() + 1 + raw_infos.len();
    let sector_size = geometry.sector_size;
    let table_sectors = (len as u64).div_ceil(sector_size).max(1);

    if table_sectors > geometry.table_sectors {
        if table_sectors >= geometry.total_sectors() {
            return Err(FsError::InsufficientSpace);
        }
        free_index.refresh(table.as_str(), geometry)?;
        let data_blocks = geometry.total_sectors() - table_sectors;
        if free_index.highest_used().is_some_and(|b| b >= data_blocks) {
            log::warn!("table region cannot grow to {} sectors", table_sectors);
            return Err(FsError::InsufficientSpace);
        }
    }

    let header = TableHeader {
        sector_shift: geometry.sector_shift(),
        table_sectors,
    };
    let mut buf = Vec::with_capacity((table_sectors * sector_size) as usize);
    buf.extend_from_slice(&header.to_bytes()?);
    buf.extend_from_slice(&packed);
    buf.push(TABLE_END);
    buf.extend_from_slice(&raw_names);
    buf.push(NAMES_END);
    buf.extend_from_slice(&raw_infos);
    buf.resize((table_sectors * sector_size) as usize, 0);

    device.write_blocks(0, &buf)?;
    device.flush()?;

    if table_sectors != geometry.table_sectors {
        log::debug!(
            "table region resized: {} -> {} sectors",
            geometry.table_sectors,
            table_sectors
        );
        geometry.table_sectors = table_sectors;
        free_index.invalidate();
    }
    Ok(())
}
