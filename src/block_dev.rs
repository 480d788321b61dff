use crate::error::Result;

pub trait BlockDevice: Send + Sync {
    /// Returns the number of blocks in the block device.
    fn num_blocks(&self) -> u64;

    /// Reads consecutive blocks starting at `block_id`.
    /// buf.len() must be a multiple of block_size().
    fn read_blocks(&self, block_id: u64, buf: &mut [u8]) -> Result<()>;

    /// Writes consecutive blocks starting at `block_id`.
    /// buf.len() must be a multiple of block_size().
    fn write_blocks(&self, block_id: u64, buf: &[u8]) -> Result<()>;

    /// Flushes any cached data to the block device.
    fn flush(&self) -> Result<()>;

    /// Returns the size of each block in bytes.
    fn block_size(&self) -> usize {
        crate::config::DEVICE_BLOCK_SIZE
    }

    /// Total device size in bytes.
    fn size(&self) -> u64 {
        self.num_blocks() * self.block_size() as u64
    }
}
