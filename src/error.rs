use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("segment file {path} does not exist")]
    MissingSegment { path: PathBuf },
    #[error("segment file {path} is truncated: {missing} bytes missing")]
    ShortRead { path: PathBuf, missing: u64 },
    #[error("corrupted structure: {0}")]
    Corruption(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("is a directory: {0}")]
    IsADirectory(String),
    #[error("invalid name: {0:?}")]
    InvalidName(String),
    #[error("out of space: could not create a new segment")]
    OutOfSpace,
    #[error("file too large: logical block {0} exceeds triple-indirect capacity")]
    FileTooLarge(u64),
}

pub type Result<T> = core::result::Result<T, FsError>;
