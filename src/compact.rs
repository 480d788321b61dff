//! Range compaction of the table text.
//! `desimp` spells every `lo-hi` run out block by block so tail edits can address single
//! sectors; `simp` folds ascending consecutive whole blocks back into runs.

use alloc::string::String;
use alloc::vec::Vec;
use core::ops::ControlFlow;

use crate::config::*;
use crate::error::Result;
use crate::parser::{self, Event, Extent};
use crate::table::join;

/// Expands ranges into single blocks.
pub fn expand(extents: &[Extent]) -> Vec<Extent> {
    let mut out = Vec::with_capacity(extents.len());
    for extent in extents {
        match *extent {
            Extent::Range(lo, hi) => out.extend((lo..=hi).map(Extent::Block)),
            other => out.push(other),
        }
    }
    out
}

/// Merges runs of ascending consecutive whole blocks into ranges.
pub fn merge(extents: &[Extent]) -> Vec<Extent> {
    let mut out: Vec<Extent> = Vec::with_capacity(extents.len());
    let mut run: Option<(u64, u64)> = None;
    let flush = |run: &mut Option<(u64, u64)>, out: &mut Vec<Extent>| {
        if let Some((lo, hi)) = run.take() {
            out.push(if lo == hi { Extent::Block(lo) } else { Extent::Range(lo, hi) });
        }
    };
    for extent in extents {
        match *extent {
            Extent::Block(_) | Extent::Range(..) => {
                let blocks = extent.blocks();
                let (lo, hi) = (*blocks.start(), *blocks.end());
                match run {
                    Some((start, end)) if end.checked_add(1) == Some(lo) => run = Some((start, hi)),
                    _ => {
                        flush(&mut run, &mut out);
                        run = Some((lo, hi));
                    }
                }
            }
            partial => {
                flush(&mut run, &mut out);
                out.push(partial);
            }
        }
    }
    flush(&mut run, &mut out);
    out
}

fn rewrite(table: &str, f: fn(&[Extent]) -> Vec<Extent>) -> Result<String> {
    let mut out = String::with_capacity(table.len());
    let mut entry = Vec::new();
    parser::parse(table, |event| {
        match event {
            Event::Extent { extent, .. } => entry.push(extent),
            Event::EntryEnd(_) => {
                out.push_str(&join(&f(&entry)));
                out.push(ENTRY_END as char);
                entry.clear();
            }
        }
        ControlFlow::Continue(())
    })?;
    Ok(out)
}

pub fn desimp(table: &str) -> Result<String> {
    rewrite(table, expand)
}

pub fn simp(table: &str) -> Result<String> {
    rewrite(table, merge)
}
