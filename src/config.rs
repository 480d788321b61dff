/// Symbols the allocation table is written in, in codec order.
pub const ALPHABET: &[u8; 15] = b"0123456789-,.; ";
pub const NUM_SYMBOLS: usize = ALPHABET.len();

pub const ENTRY_END: u8 = b'.'; // Terminates one file's entry
pub const EXTENT_SEP: u8 = b','; // Separates extents inside an entry
pub const RANGE_SEP: u8 = b'-'; // BLOCK-BLOCK
pub const PARTIAL_SEP: u8 = b';'; // BLOCK;OFFSET;OFFSET
pub const PAD: u8 = b' '; // Codec padding for odd-length tables

pub const TABLE_END: u8 = 255; // Ends the packed table, and each name in the filename list
pub const NAME_END: u8 = 255;
pub const NAMES_END: u8 = 254; // Ends the filename list
pub const STREAM_SEP: u8 = 42; // Stored form of ':' inside a name

pub const HEADER_SIZE: usize = 5; // Shift byte + big-endian region size
pub const DEVICE_BLOCK_SIZE: usize = 512; // Alignment of every device I/O
pub const MIN_SECTOR_SIZE: u64 = 512;
pub const MIN_SECTOR_SHIFT: u32 = 9;

pub const TIMES_SIZE: usize = 24; // Three f64 timestamps
pub const GUM_SIZE: usize = 11; // gid, uid, mode, attributes
pub const FILE_INFO_SIZE: usize = TIMES_SIZE + GUM_SIZE;

pub const DEFAULT_GID: u32 = 545;
pub const DEFAULT_UID: u32 = 545;
pub const FILE_MODE: u16 = 0o700;
pub const DIRECTORY_MODE: u16 = 0o040700;

pub const ROOT_NAME: &str = "/";
pub const VOLUME_LABEL_NAME: &str = ":";
