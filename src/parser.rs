//! Streaming parser for the allocation table text.
//!
//! ```text
//! table   := entry ('.' entry)* '.'
//! entry   := extent (',' extent)*      (may be empty for a file with no data)
//! extent  := BLOCK | BLOCK '-' BLOCK | BLOCK ';' OFFSET ';' OFFSET
//! ```
//!
//! Nothing is kept between calls: the text is the source of truth and every reader
//! re-parses the part it needs.

use alloc::vec::Vec;
use core::fmt;
use core::ops::{ControlFlow, RangeInclusive};

use crate::config::*;
use crate::error::{FsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    /// One whole sector.
    Block(u64),
    /// Inclusive run of whole sectors.
    Range(u64, u64),
    /// Bytes `[start, end)` of a single sector.
    Partial { block: u64, start: u64, end: u64 },
}

impl Extent {
    /// Number of file bytes this extent holds.
    pub fn len(&self, sector_size: u64) -> u64 {
        match *self {
            Extent::Block(_) => sector_size,
            Extent::Range(lo, hi) => (hi - lo + 1) * sector_size,
            Extent::Partial { start, end, .. } => end - start,
        }
    }

    pub fn blocks(&self) -> RangeInclusive<u64> {
        match *self {
            Extent::Block(b) | Extent::Partial { block: b, .. } => b..=b,
            Extent::Range(lo, hi) => lo..=hi,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Extent::Partial { .. })
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Extent::Block(b) => write!(f, "{}", b),
            Extent::Range(lo, hi) => write!(f, "{}-{}", lo, hi),
            Extent::Partial { block, start, end } => write!(f, "{};{};{}", block, start, end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Extent { entry: usize, extent: Extent },
    EntryEnd(usize),
}

#[derive(Default)]
struct Parser {
    slots: [u64; 2],
    step: usize,
    range_lo: Option<u64>,
    token: Option<u64>,
    after_comma: bool,
    entry: usize,
}

impl Parser {
    fn digit(&mut self, pos: usize, c: u8) -> Result<()> {
        let acc = self.token.unwrap_or(0);
        let acc = acc
            .checked_mul(10)
            .and_then(|acc| acc.checked_add((c - b'0') as u64))
            .ok_or(FsError::MalformedTable(pos))?;
        self.token = Some(acc);
        Ok(())
    }

    /// Closes the pending token into an extent, if there is one.
    fn close(&mut self, pos: usize) -> Result<Option<Extent>> {
        let step = core::mem::take(&mut self.step);
        let range_lo = self.range_lo.take();
        let Some(token) = self.token.take() else {
            if step != 0 || range_lo.is_some() {
                return Err(FsError::MalformedTable(pos));
            }
            return Ok(None);
        };
        let extent = match (step, range_lo) {
            (0, None) => Extent::Block(token),
            (0, Some(lo)) if lo <= token => Extent::Range(lo, token),
            (2, None) if self.slots[1] < token => Extent::Partial {
                block: self.slots[0],
                start: self.slots[1],
                end: token,
            },
            _ => return Err(FsError::MalformedTable(pos)),
        };
        Ok(Some(extent))
    }
}

fn run<I, F>(bytes: I, mut on_event: F) -> Result<()>
where
    I: Iterator<Item = u8>,
    F: FnMut(Event) -> ControlFlow<()>,
{
    let mut p = Parser::default();
    let mut len = 0;
    for (pos, c) in bytes.enumerate() {
        len = pos + 1;
        match c {
            b'0'..=b'9' => p.digit(pos, c)?,
            PARTIAL_SEP => {
                let token = p.token.take().ok_or(FsError::MalformedTable(pos))?;
                if p.step >= 2 || p.range_lo.is_some() {
                    return Err(FsError::MalformedTable(pos));
                }
                p.slots[p.step] = token;
                p.step += 1;
            }
            RANGE_SEP => {
                let token = p.token.take().ok_or(FsError::MalformedTable(pos))?;
                if p.step != 0 || p.range_lo.is_some() {
                    return Err(FsError::MalformedTable(pos));
                }
                p.range_lo = Some(token);
            }
            EXTENT_SEP => {
                let extent = p.close(pos)?.ok_or(FsError::MalformedTable(pos))?;
                p.after_comma = true;
                let entry = p.entry;
                if on_event(Event::Extent { entry, extent }).is_break() {
                    return Ok(());
                }
            }
            ENTRY_END => {
                let entry = p.entry;
                match p.close(pos)? {
                    Some(extent) => {
                        if on_event(Event::Extent { entry, extent }).is_break() {
                            return Ok(());
                        }
                    }
                    None if p.after_comma => return Err(FsError::MalformedTable(pos)),
                    None => {}
                }
                p.after_comma = false;
                p.entry += 1;
                if on_event(Event::EntryEnd(entry)).is_break() {
                    return Ok(());
                }
            }
            _ => return Err(FsError::MalformedTable(pos)),
        }
    }
    if p.token.is_some() || p.step != 0 || p.range_lo.is_some() || p.after_comma {
        return Err(FsError::MalformedTable(len));
    }
    Ok(())
}

/// Walks the whole table, calling `on_event` per extent and per finished entry.
/// Returning `ControlFlow::Break` stops the walk early.
pub fn parse<F>(table: &str, on_event: F) -> Result<()>
where
    F: FnMut(Event) -> ControlFlow<()>,
{
    run(table.bytes(), on_event)
}

/// Parses one entry's text (without its terminating '.').
pub fn entry_extents(entry: &str) -> Result<Vec<Extent>> {
    let mut extents = Vec::new();
    run(entry.bytes().chain(core::iter::once(ENTRY_END)), |event| {
        match event {
            Event::Extent { extent, .. } => extents.push(extent),
            Event::EntryEnd(_) => {}
        }
        ControlFlow::Continue(())
    })?;
    Ok(extents)
}

/// Checks that `table` is a sequence of well-formed, '.'-terminated entries.
pub fn validate(table: &str) -> Result<usize> {
    let mut entries = 0;
    parse(table, |event| {
        if let Event::EntryEnd(_) = event {
            entries += 1;
        }
        ControlFlow::Continue(())
    })?;
    Ok(entries)
}
