//! Common utilities for tests
#![allow(unused)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use spacefs::{BlockDevice, Error, Result, DEVICE_BLOCK_SIZE};

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

/// Routes the crate's `log` output to the test harness.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug)]
pub struct RamDisk {
    inner: Arc<Mutex<Vec<u8>>>,
    num_blocks: u64,
    io_calls: AtomicUsize,
}

impl RamDisk {
    /// Creates a new RamDisk with the specified number of 512-byte blocks.
    pub fn new(num_blocks: u64) -> Self {
        let size = num_blocks as usize * DEVICE_BLOCK_SIZE;
        RamDisk {
            inner: Arc::new(Mutex::new(vec![0u8; size])),
            num_blocks,
            io_calls: AtomicUsize::new(0),
        }
    }

    /// Number of read_blocks and write_blocks calls so far.
    pub fn io_calls(&self) -> usize {
        self.io_calls.load(Ordering::Relaxed)
    }

    /// Copy of the raw device bytes.
    pub fn snapshot(&self) -> Vec<u8> {
        self.inner.lock().unwrap().clone()
    }

    fn span(&self, block_id: u64, len: usize) -> Result<std::ops::Range<usize>> {
        if len % DEVICE_BLOCK_SIZE != 0 {
            return Err(Error::Unaligned);
        }
        let start = block_id as usize * DEVICE_BLOCK_SIZE;
        let end = start + len;
        if end > self.num_blocks as usize * DEVICE_BLOCK_SIZE {
            return Err(Error::OutOfBounds);
        }
        Ok(start..end)
    }
}

impl BlockDevice for RamDisk {
    fn num_blocks(&self) -> u64 {
        self.num_blocks
    }

    fn read_blocks(&self, block_id: u64, buf: &mut [u8]) -> Result<()> {
        let span = self.span(block_id, buf.len())?;
        self.io_calls.fetch_add(1, Ordering::Relaxed);
        let data = self.inner.lock().unwrap();
        buf.copy_from_slice(&data[span]);
        Ok(())
    }

    fn write_blocks(&self, block_id: u64, buf: &[u8]) -> Result<()> {
        let span = self.span(block_id, buf.len())?;
        self.io_calls.fetch_add(1, Ordering::Relaxed);
        let mut data = self.inner.lock().unwrap();
        data[span].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        // In a RAM disk, flushing is a no-op since data is already in memory.
        Ok(())
    }
}

/// Deterministic test pattern.
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}
