//! Filename list: one record per file, in table-entry order.
//! On disk each name is followed by `NAME_END` and the list by `NAMES_END`; a ':' inside a
//! name is stored as `STREAM_SEP`.

use alloc::string::String;
use alloc::vec::Vec;

use crate::config::*;
use crate::error::{FsError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilenameList {
    names: Vec<Vec<u8>>,
}

/// Stored bytes for a name.
fn to_stored(name: &str) -> Result<Vec<u8>> {
    if name.is_empty() {
        return Err(FsError::InvalidFileName);
    }
    name.bytes()
        .map(|c| match c {
            b':' => Ok(STREAM_SEP),
            STREAM_SEP | 0 => Err(FsError::InvalidFileName),
            c => Ok(c),
        })
        .collect()
}

fn from_stored(stored: &[u8]) -> String {
    let bytes: Vec<u8> = stored
        .iter()
        .map(|&c| if c == STREAM_SEP { b':' } else { c })
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

impl FilenameList {
    /// Parses the raw list, without its `NAMES_END` sentinel.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.last().is_some_and(|&c| c != NAME_END) {
            return Err(FsError::InvalidRegion);
        }
        let names = raw
            .split(|&c| c == NAME_END)
            .take(raw.iter().filter(|&&c| c == NAME_END).count())
            .map(<[u8]>::to_vec)
            .collect();
        Ok(Self { names })
    }

    /// Raw list, without its `NAMES_END` sentinel.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(self.names.iter().map(|n| n.len() + 1).sum());
        for name in &self.names {
            raw.extend_from_slice(name);
            raw.push(NAME_END);
        }
        raw
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Case-insensitive linear search.
    pub fn find(&self, name: &str) -> Option<usize> {
        let stored = to_stored(name).ok()?;
        self.names.iter().position(|n| n.eq_ignore_ascii_case(&stored))
    }

    pub fn get(&self, index: usize) -> Option<String> {
        self.names.get(index).map(|n| from_stored(n))
    }

    pub fn iter(&self) -> impl Iterator<Item = String> + '_ {
        self.names.iter().map(|n| from_stored(n))
    }

    pub fn push(&mut self, name: &str) -> Result<usize> {
        self.names.push(to_stored(name)?);
        Ok(self.names.len() - 1)
    }

    pub fn remove(&mut self, index: usize) -> Result<()> {
        if index >= self.names.len() {
            return Err(FsError::NotFound);
        }
        self.names.remove(index);
        Ok(())
    }

    pub fn set(&mut self, index: usize, name: &str) -> Result<()> {
        let stored = to_stored(name)?;
        let slot = self.names.get_mut(index).ok_or(FsError::NotFound)?;
        *slot = stored;
        Ok(())
    }
}
