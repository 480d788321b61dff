//! FileInfo array codec.
//! Laid out as two fixed-stride arrays indexed by filename index: all timestamp records
//! first, then all owner/mode/attribute records.

use alloc::vec::Vec;

use crate::config::*;
use crate::error::{FsError, Result};
use crate::structs::{Attributes, FileInfo};

fn read_time(bytes: &[u8]) -> f64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    // Stored byte-reversed relative to the little-endian image.
    f64::from_be_bytes(raw)
}

fn be(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0, |acc, &b| acc << 8 | b as u32)
}

/// Decodes `count` records from the start of `bytes`.
pub fn unpack(bytes: &[u8], count: usize) -> Result<Vec<FileInfo>> {
    if bytes.len() < count * FILE_INFO_SIZE {
        return Err(FsError::InvalidRegion);
    }
    let (times, gums) = bytes.split_at(count * TIMES_SIZE);
    let infos = times
        .chunks_exact(TIMES_SIZE)
        .zip(gums.chunks_exact(GUM_SIZE))
        .take(count)
        .map(|(t, g)| FileInfo {
            accessed: read_time(&t[0..]),
            written: read_time(&t[8..]),
            created: read_time(&t[16..]),
            gid: be(&g[0..3]),
            uid: be(&g[3..5]),
            mode: be(&g[5..7]) as u16,
            attributes: Attributes::from_bits_retain(be(&g[7..11])),
        })
        .collect();
    Ok(infos)
}

pub fn pack(infos: &[FileInfo]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(infos.len() * FILE_INFO_SIZE);
    for info in infos {
        bytes.extend_from_slice(&info.accessed.to_be_bytes());
        bytes.extend_from_slice(&info.written.to_be_bytes());
        bytes.extend_from_slice(&info.created.to_be_bytes());
    }
    for info in infos {
        bytes.extend_from_slice(&info.gid.to_be_bytes()[1..]);
        bytes.extend_from_slice(&(info.uid as u16).to_be_bytes());
        bytes.extend_from_slice(&info.mode.to_be_bytes());
        bytes.extend_from_slice(&info.attributes.bits().to_be_bytes());
    }
    bytes
}
