//! SpaceFS is a single-volume file system whose allocation state is a line of text.
//!
//! Every file owns one entry in the allocation table, e.g. `4-9,12,3;0;100.` for six whole
//! sectors, one more sector, then the first 100 bytes of sector 3. Free space is whatever no
//! entry mentions.
//!
//! Device layout:
//! - Table region (from byte 0): header, packed table, filename list, FileInfo array
//! - Data blocks, numbered backwards: block 0 is the last sector of the device
//!
//! Layers (from bottom to top):
//! 1. Block Device: whole-block synchronous I/O.                      | User implemented
//! 2. Codec / Parser / Table: the table text and positional edits.    | Fs implemented
//! 3. Free-space index / Allocator / Compactor: sector bookkeeping.   | Fs implemented
//! 4. Region: loading and committing the table region.                | Fs implemented
//! 5. File: byte-range reads and writes through a file's extents.     | Fs implemented
//! 6. FileSystem: the volume state an OS adapter drives.              | User wraps a lock around it
//!
//! Nothing reaches the disk until `FileSystem::commit`. There is no journal.

extern crate alloc;

mod config;
mod error;
mod block_dev;
mod structs;
mod codec;
mod parser;
mod table;
mod compact;
mod bitmap;
mod allocator;
mod names;
mod fileinfo;
mod path;
mod region;
mod file;
mod fs;

pub use block_dev::BlockDevice;
pub use config::*;
pub use structs::*;
pub use codec::{decode, encode};
pub use parser::{entry_extents, parse, validate, Event, Extent};
pub use table::Table;
pub use compact::{desimp, simp};
pub use bitmap::FreeSpaceIndex;
pub use names::FilenameList;
pub use fileinfo::{pack as pack_file_info, unpack as unpack_file_info};
pub use region::{format_region, read_region, Region};
pub use fs::*;
pub use error::FsError as Error;
pub use error::Result;
