use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    #[error("device I/O error")]
    IoError,
    #[error("insufficient space")]
    InsufficientSpace,
    #[error("name already exists")]
    NameCollision,
    #[error("not found")]
    NotFound,
    #[error("malformed allocation table at byte {0}")]
    MalformedTable(usize),
    #[error("block {0} is claimed more than once")]
    CrossLinked(u64),
    #[error("invalid sector size {0}")]
    InvalidSectorSize(u64),
    #[error("invalid table region")]
    InvalidRegion,
    #[error("invalid file name")]
    InvalidFileName,
    #[error("out of bounds")]
    OutOfBounds,
    #[error("unaligned device access")]
    Unaligned,
}

pub type Result<T> = core::result::Result<T, FsError>;
