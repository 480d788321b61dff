//! Byte-range I/O on a file.
//! Maps a logical window of the file onto its extents, and each overlapping extent onto a
//! physical, device-block aligned transfer.

use alloc::vec::Vec;

use crate::error::Result;
use crate::parser::Extent;
use crate::structs::Geometry;
use crate::table::Table;
use crate::BlockDevice;

pub enum Transfer<'a> {
    Read(&'a mut [u8]),
    Write(&'a [u8]),
}

impl Transfer<'_> {
    pub fn len(&self) -> usize {
        match self {
            Transfer::Read(buf) => buf.len(),
            Transfer::Write(buf) => buf.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Moves `n` bytes between `dir[at..at + n]` and physical offset `phys`.
/// Unaligned pieces go through a read-modify-write of the covering device blocks.
fn device_io(
    device: &impl BlockDevice,
    phys: u64,
    n: u64,
    dir: &mut Transfer<'_>,
    at: usize,
    scratch: &mut Vec<u8>,
) -> Result<()> {
    let block_size = device.block_size() as u64;
    let aligned_start = phys / block_size * block_size;
    let aligned_end = (phys + n).div_ceil(block_size) * block_size;
    let block_id = aligned_start / block_size;
    let head = (phys - aligned_start) as usize;
    let n = n as usize;
    let aligned = head == 0 && n as u64 % block_size == 0;
    if !aligned {
        scratch.resize((aligned_end - aligned_start) as usize, 0);
    }

    match dir {
        Transfer::Read(buf) => {
            let out = &mut buf[at..at + n];
            if aligned {
                device.read_blocks(block_id, out)?;
            } else {
                device.read_blocks(block_id, scratch)?;
                out.copy_from_slice(&scratch[head..head + n]);
            }
        }
        Transfer::Write(buf) => {
            let src = &buf[at..at + n];
            if aligned {
                device.write_blocks(block_id, src)?;
            } else {
                device.read_blocks(block_id, scratch)?;
                scratch[head..head + n].copy_from_slice(src);
                device.write_blocks(block_id, scratch)?;
            }
        }
    }
    Ok(())
}

/// Moves bytes `[from, to)` of one extent, offsets relative to the extent's first byte,
/// between the device and `dir[at..]`.
/// A run of whole blocks is one contiguous span on the device, in reverse block order, so it
/// costs one read and, for writes, one write.
fn extent_io(
    device: &impl BlockDevice,
    geometry: &Geometry,
    extent: &Extent,
    (from, to): (u64, u64),
    dir: &mut Transfer<'_>,
    at: usize,
    scratch: &mut Vec<u8>,
) -> Result<()> {
    let sector_size = geometry.sector_size;
    let lo = match *extent {
        Extent::Partial { block, start, .. } => {
            let phys = geometry.block_offset(block) + start + from;
            return device_io(device, phys, to - from, dir, at, scratch);
        }
        Extent::Block(lo) | Extent::Range(lo, _) => lo,
    };
    let first = lo + from / sector_size;
    let last = lo + (to - 1) / sector_size;
    // `last` has the lowest device address.
    let block_id = geometry.block_offset(last) / device.block_size() as u64;
    scratch.resize(((last - first + 1) * sector_size) as usize, 0);
    let covers_sectors = from % sector_size == 0 && to % sector_size == 0;
    if matches!(dir, Transfer::Read(_)) || !covers_sectors {
        device.read_blocks(block_id, scratch)?;
    }

    let mut pos = from;
    while pos < to {
        let block = lo + pos / sector_size;
        let inner = pos % sector_size;
        let n = (sector_size - inner).min(to - pos) as usize;
        let s = ((last - block) * sector_size + inner) as usize;
        let u = at + (pos - from) as usize;
        match dir {
            Transfer::Read(buf) => buf[u..u + n].copy_from_slice(&scratch[s..s + n]),
            Transfer::Write(buf) => scratch[s..s + n].copy_from_slice(&buf[u..u + n]),
        }
        pos += n as u64;
    }

    if let Transfer::Write(_) = dir {
        device.write_blocks(block_id, scratch)?;
    }
    Ok(())
}

/// Reads or writes the file window starting at `start`.
/// The window is clamped to the file size; returns the number of bytes moved, which is
/// zero at or past end of file.
pub fn transfer(
    device: &impl BlockDevice,
    geometry: &Geometry,
    table: &Table,
    index: usize,
    start: u64,
    mut dir: Transfer<'_>,
) -> Result<usize> {
    let sector_size = geometry.sector_size;
    let extents = table.extents(index)?;
    let file_size: u64 = extents.iter().map(|e| e.len(sector_size)).sum();
    if start >= file_size || dir.is_empty() {
        return Ok(0);
    }
    let end = start + (dir.len() as u64).min(file_size - start);

    let mut scratch = Vec::new();
    let mut logical = 0;
    let mut moved = 0;
    for extent in &extents {
        let extent_start = logical;
        logical += extent.len(sector_size);
        if logical <= start {
            continue;
        }
        if extent_start >= end {
            break;
        }
        let (from, to) = (start.max(extent_start), end.min(logical));
        extent_io(
            device,
            geometry,
            extent,
            (from - extent_start, to - extent_start),
            &mut dir,
            (from - start) as usize,
            &mut scratch,
        )?;
        moved += to - from;
    }
    log::trace!("entry {}: moved {} bytes at {}", index, moved, start);
    Ok(moved as usize)
}
