//! Sector allocation and release on one file's entry.
//! Both edit only the tail of the entry. Merging neighbouring blocks into ranges is left
//! to the compactor.

use alloc::vec::Vec;

use crate::bitmap::FreeSpaceIndex;
use crate::compact;
use crate::error::{FsError, Result};
use crate::parser::Extent;
use crate::structs::Geometry;
use crate::table::Table;

/// Appends `size` bytes of fresh extents to entry `index`: one block per whole sector,
/// then one partial extent for any remainder.
/// Nothing is appended unless every piece is found.
pub fn allocate(
    table: &mut Table,
    free_index: &mut FreeSpaceIndex,
    geometry: &Geometry,
    index: usize,
    size: u64,
) -> Result<()> {
    table.entry_span(index)?;
    if size == 0 {
        return Ok(());
    }
    free_index.refresh(table.as_str(), geometry)?;
    if size > free_index.free_space() {
        log::warn!("allocate {} bytes for entry {}: only {} free", size, index, free_index.free_space());
        return Err(FsError::InsufficientSpace);
    }

    let sector_size = geometry.sector_size;
    let mut claimed = Vec::with_capacity((size / sector_size + 1) as usize);
    let mut result = Ok(());
    for _ in 0..size / sector_size {
        match free_index.find_block(index, sector_size) {
            Ok(extent) => claimed.push(extent),
            Err(e) => {
                result = Err(e);
                break;
            }
        }
    }
    if result.is_ok() && size % sector_size != 0 {
        match free_index.find_block(index, size % sector_size) {
            Ok(extent) => claimed.push(extent),
            Err(e) => result = Err(e),
        }
    }
    // The index now holds claims for whatever was found; drop them either way.
    free_index.invalidate();
    if let Err(e) = result {
        log::warn!("allocate {} bytes for entry {}: {}", size, index, e);
        return Err(e);
    }

    log::trace!("entry {}: appending {} extents", index, claimed.len());
    table.append_extents(index, &claimed)
}

/// Removes `size` bytes from the tail of entry `index`.
/// A whole trailing block that is only partly released becomes `BLOCK;0;kept`; a
/// trailing partial extent shrinks its upper bound.
pub fn deallocate(
    table: &mut Table,
    free_index: &mut FreeSpaceIndex,
    geometry: &Geometry,
    index: usize,
    size: u64,
) -> Result<()> {
    let sector_size = geometry.sector_size;
    let mut extents = compact::expand(&table.extents(index)?);
    let file_size: u64 = extents.iter().map(|e| e.len(sector_size)).sum();
    if size > file_size {
        return Err(FsError::OutOfBounds);
    }

    let mut remaining = size;
    while remaining > 0 {
        let Some(last) = extents.last_mut() else {
            break;
        };
        let len = last.len(sector_size);
        if remaining >= len {
            extents.pop();
            remaining -= len;
            continue;
        }
        *last = match *last {
            Extent::Block(block) => Extent::Partial { block, start: 0, end: sector_size - remaining },
            Extent::Partial { block, start, end } => Extent::Partial { block, start, end: end - remaining },
            // expand() leaves no ranges behind.
            Extent::Range(..) => return Err(FsError::MalformedTable(0)),
        };
        remaining = 0;
    }

    table.set_extents(index, &extents)?;
    free_index.invalidate();
    Ok(())
}
