//! Free-space index: which entry owns each claimed data block, its remaining free bytes, and
//! a byte-occupancy bitmap for blocks claimed through partial extents.
//! The index is a cache of the table text. It is rebuilt by a full scan whenever it is
//! marked dirty and is never patched incrementally after a table edit.
//! Wholly free blocks are not stored, so memory grows with the number of claimed blocks,
//! not with the volume size.

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;
use core::ops::ControlFlow;

use crate::error::{FsError, Result};
use crate::parser::{self, Event, Extent};
use crate::structs::Geometry;

#[derive(Debug, Clone, PartialEq, Eq)]
struct BlockUse {
    entry: usize,
    free: u64,
    // Only blocks claimed through partial extents carry a bitmap.
    occupancy: Option<Vec<u64>>,
}

#[derive(Debug, Clone)]
pub struct FreeSpaceIndex {
    sector_size: u64,
    data_blocks: u64,
    used: BTreeMap<u64, BlockUse>,
    dirty: bool,
    // No block below this one is wholly free.
    full_hint: u64,
}

impl PartialEq for FreeSpaceIndex {
    fn eq(&self, other: &Self) -> bool {
        self.sector_size == other.sector_size
            && self.data_blocks == other.data_blocks
            && self.used == other.used
    }
}

/// Mask of bits `[start, end)` that fall inside word `w`.
fn word_mask(w: u64, start: u64, end: u64) -> u64 {
    let lo = start.max(w * 64) - w * 64;
    let hi = end.min((w + 1) * 64) - w * 64;
    if hi - lo == 64 {
        u64::MAX
    } else {
        ((1u64 << (hi - lo)) - 1) << lo
    }
}

/// First-fit search for `size` clear bits, skipping whole words where it can.
fn first_zero_run(words: &[u64], size: u64) -> Option<u64> {
    let total = words.len() as u64 * 64;
    let mut run_start = 0;
    let mut run_len = 0;
    let mut bit = 0;
    while bit < total {
        let word = words[(bit / 64) as usize];
        if bit % 64 == 0 && (word == 0 || word == u64::MAX) {
            if word == u64::MAX {
                run_len = 0;
            } else {
                if run_len == 0 {
                    run_start = bit;
                }
                run_len += 64;
                if run_len >= size {
                    return Some(run_start);
                }
            }
            bit += 64;
            continue;
        }
        if word & (1 << (bit % 64)) == 0 {
            if run_len == 0 {
                run_start = bit;
            }
            run_len += 1;
            if run_len >= size {
                return Some(run_start);
            }
        } else {
            run_len = 0;
        }
        bit += 1;
    }
    None
}

impl FreeSpaceIndex {
    /// An index with every block free, marked dirty so the first use rescans.
    pub fn new(sector_size: u64, data_blocks: u64) -> Self {
        Self {
            sector_size,
            data_blocks,
            used: BTreeMap::new(),
            dirty: true,
            full_hint: 0,
        }
    }

    /// Builds the index from the table text. A block named by two entries, or named twice as
    /// a whole block, is `CrossLinked`.
    pub fn scan(table: &str, geometry: &Geometry) -> Result<Self> {
        let mut index = Self::new(geometry.sector_size, geometry.data_blocks());
        let mut failure = None;
        parser::parse(table, |event| {
            let Event::Extent { entry, extent } = event else {
                return ControlFlow::Continue(());
            };
            match index.claim(entry, extent) {
                Ok(()) => ControlFlow::Continue(()),
                Err(e) => {
                    failure = Some(e);
                    ControlFlow::Break(())
                }
            }
        })?;
        if let Some(e) = failure {
            return Err(e);
        }
        index.dirty = false;
        Ok(index)
    }

    /// Rescans if the index was invalidated since the last scan.
    pub fn refresh(&mut self, table: &str, geometry: &Geometry) -> Result<()> {
        if self.dirty || self.data_blocks != geometry.data_blocks() {
            *self = Self::scan(table, geometry)?;
            log::trace!("free-space index rebuilt: {} bytes free", self.free_space());
        }
        Ok(())
    }

    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn data_blocks(&self) -> u64 {
        self.data_blocks
    }

    pub fn free_bytes(&self, block: u64) -> Option<u64> {
        if block >= self.data_blocks {
            return None;
        }
        Some(self.used.get(&block).map_or(self.sector_size, |u| u.free))
    }

    /// Entry whose extents name `block`, if any.
    pub fn owner(&self, block: u64) -> Option<usize> {
        self.used.get(&block).map(|u| u.entry)
    }

    pub fn occupancy(&self, block: u64) -> Option<&[u64]> {
        self.used.get(&block)?.occupancy.as_deref()
    }

    pub fn used_space(&self) -> u64 {
        self.used.values().map(|u| self.sector_size - u.free).sum()
    }

    pub fn free_space(&self) -> u64 {
        self.data_blocks * self.sector_size - self.used_space()
    }

    /// Highest block index holding any claimed byte.
    pub fn highest_used(&self) -> Option<u64> {
        self.used.keys().next_back().copied()
    }

    /// First wholly free block at or above `from`.
    fn next_free(&self, from: u64) -> Option<u64> {
        let mut candidate = from;
        for (&block, _) in self.used.range(from..) {
            if block != candidate {
                break;
            }
            candidate += 1;
        }
        (candidate < self.data_blocks).then_some(candidate)
    }

    fn claim(&mut self, entry: usize, extent: Extent) -> Result<()> {
        match extent {
            Extent::Block(_) | Extent::Range(..) => {
                for block in extent.blocks() {
                    self.claim_whole(entry, block)?;
                }
                Ok(())
            }
            Extent::Partial { block, start, end } => self.claim_bytes(entry, block, start, end),
        }
    }

    fn claim_whole(&mut self, entry: usize, block: u64) -> Result<()> {
        if block >= self.data_blocks {
            return Err(FsError::OutOfBounds);
        }
        if self.used.contains_key(&block) {
            return Err(FsError::CrossLinked(block));
        }
        self.used.insert(block, BlockUse { entry, free: 0, occupancy: None });
        Ok(())
    }

    fn claim_bytes(&mut self, entry: usize, block: u64, start: u64, end: u64) -> Result<()> {
        if block >= self.data_blocks || end > self.sector_size || start >= end {
            return Err(FsError::OutOfBounds);
        }
        let sector_size = self.sector_size;
        let slot = self.used.entry(block).or_insert_with(|| BlockUse {
            entry,
            free: sector_size,
            occupancy: Some(vec![0; (sector_size / 64) as usize]),
        });
        if slot.entry != entry {
            return Err(FsError::CrossLinked(block));
        }
        // Whole block already claimed by a plain extent.
        let Some(words) = slot.occupancy.as_mut() else {
            return Err(FsError::CrossLinked(block));
        };
        for w in start / 64..end.div_ceil(64) {
            let mask = word_mask(w, start, end);
            let word = &mut words[w as usize];
            if *word & mask != 0 {
                return Err(FsError::CrossLinked(block));
            }
            *word |= mask;
        }
        slot.free -= end - start;
        Ok(())
    }

    /// First-fit search for `size` bytes on behalf of `entry`, claiming what it returns.
    /// A whole-sector request yields a `Block`, anything smaller a `Partial` placed in a
    /// free block or in one of the entry's own partly used blocks, whichever comes first.
    pub fn find_block(&mut self, entry: usize, size: u64) -> Result<Extent> {
        if size == 0 || size > self.sector_size {
            return Err(FsError::OutOfBounds);
        }
        let fresh = self.next_free(self.full_hint);
        if size == self.sector_size {
            let Some(block) = fresh else {
                self.full_hint = self.data_blocks;
                return Err(FsError::InsufficientSpace);
            };
            self.full_hint = block + 1;
            self.used.insert(block, BlockUse { entry, free: 0, occupancy: None });
            return Ok(Extent::Block(block));
        }

        let own = self.used.iter().find_map(|(&block, u)| {
            if u.entry != entry || u.free < size {
                return None;
            }
            let start = first_zero_run(u.occupancy.as_deref()?, size)?;
            Some((block, start))
        });
        let (block, start) = match (own, fresh) {
            (Some((block, _)), Some(free)) if free < block => (free, 0),
            (Some(found), _) => found,
            (None, Some(free)) => (free, 0),
            (None, None) => return Err(FsError::InsufficientSpace),
        };
        self.claim_bytes(entry, block, start, start + size)?;
        Ok(Extent::Partial { block, start, end: start + size })
    }
}
