//! In-memory allocation table text and positional edits on it.
//! Entry `i` belongs to filename `i`; entries are located by counting '.' terminators.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::Write;
use core::ops::Range;

use crate::config::*;
use crate::error::{FsError, Result};
use crate::parser::{self, Extent};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    text: String,
}

impl Table {
    pub fn new(text: String) -> Result<Self> {
        parser::validate(&text)?;
        Ok(Self { text })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn entry_count(&self) -> usize {
        self.text.bytes().filter(|&c| c == ENTRY_END).count()
    }

    /// Byte span of entry `index`, excluding its terminator.
    pub fn entry_span(&self, index: usize) -> Result<Range<usize>> {
        let mut start = 0;
        let mut seen = 0;
        for (pos, c) in self.text.bytes().enumerate() {
            if c != ENTRY_END {
                continue;
            }
            if seen == index {
                return Ok(start..pos);
            }
            seen += 1;
            start = pos + 1;
        }
        Err(FsError::NotFound)
    }

    pub fn entry(&self, index: usize) -> Result<&str> {
        let span = self.entry_span(index)?;
        Ok(&self.text[span])
    }

    pub fn extents(&self, index: usize) -> Result<Vec<Extent>> {
        parser::entry_extents(self.entry(index)?)
    }

    /// Appends an empty entry for a new file.
    pub fn push_entry(&mut self) {
        self.text.push(ENTRY_END as char);
    }

    pub fn remove_entry(&mut self, index: usize) -> Result<()> {
        let span = self.entry_span(index)?;
        self.text.replace_range(span.start..span.end + 1, "");
        Ok(())
    }

    /// Appends extents to the tail of an entry, comma-joined.
    pub fn append_extents(&mut self, index: usize, extents: &[Extent]) -> Result<()> {
        let span = self.entry_span(index)?;
        let mut tail = String::new();
        for (i, extent) in extents.iter().enumerate() {
            if i > 0 || !span.is_empty() {
                tail.push(EXTENT_SEP as char);
            }
            // Writing into a String cannot fail.
            let _ = write!(tail, "{}", extent);
        }
        self.text.insert_str(span.end, &tail);
        Ok(())
    }

    /// Replaces an entry's extents wholesale.
    pub fn set_extents(&mut self, index: usize, extents: &[Extent]) -> Result<()> {
        let span = self.entry_span(index)?;
        self.text.replace_range(span, &join(extents));
        Ok(())
    }

    pub(crate) fn replace_text(&mut self, text: String) {
        self.text = text;
    }
}

/// Comma-joins extents into entry text.
pub fn join(extents: &[Extent]) -> String {
    extents
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
