use thiserror::Error;

/// Error taxonomy for the whole crate.
///
/// Validation errors (`DimensionMismatch`, `InvalidArgument`) always leave the
/// collection unchanged. Decode errors during `open` leave the in-memory
/// state empty without touching the file on disk.
#[derive(Error, Debug)]
pub enum Error {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("container truncated while reading {0}")]
    Truncated(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("unknown container version")]
    VersionUnknown,
}

pub type Result<T> = std::result::Result<T, Error>;
