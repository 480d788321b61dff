//! Packing of the table text, two alphabet symbols per byte.
//! The pair (a, b) becomes `index(a) * 15 + index(b)`, so packed bytes range over 0..=224
//! and never collide with the sentinels that follow the table on disk.

use alloc::string::String;
use alloc::vec::Vec;

use crate::config::*;
use crate::error::{FsError, Result};

const NO_SYMBOL: u8 = u8::MAX;

const fn symbol_lookup() -> [u8; 256] {
    let mut table = [NO_SYMBOL; 256];
    let mut i = 0;
    while i < NUM_SYMBOLS {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
}

static SYMBOL_INDEX: [u8; 256] = symbol_lookup();

fn index_of(c: u8, pos: usize) -> Result<u8> {
    match SYMBOL_INDEX[c as usize] {
        NO_SYMBOL => Err(FsError::MalformedTable(pos)),
        i => Ok(i),
    }
}

/// Packs table text. Odd-length text gets one trailing `PAD` first.
pub fn encode(text: &str) -> Result<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut packed = Vec::with_capacity(bytes.len() / 2 + 1);
    for (n, pair) in bytes.chunks(2).enumerate() {
        let hi = index_of(pair[0], n * 2)?;
        let lo = match pair.get(1) {
            Some(&c) => index_of(c, n * 2 + 1)?,
            None => SYMBOL_INDEX[PAD as usize],
        };
        packed.push(hi * NUM_SYMBOLS as u8 + lo);
    }
    Ok(packed)
}

/// Expands packed bytes back into table text.
pub fn decode(packed: &[u8]) -> Result<String> {
    let mut text = String::with_capacity(packed.len() * 2);
    for (pos, &b) in packed.iter().enumerate() {
        let b = b as usize;
        if b >= NUM_SYMBOLS * NUM_SYMBOLS {
            return Err(FsError::MalformedTable(pos));
        }
        text.push(ALPHABET[b / NUM_SYMBOLS] as char);
        text.push(ALPHABET[b % NUM_SYMBOLS] as char);
    }
    Ok(text)
}
