use std::io;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SqfsError>;

/// Errors reported by the SquashFS reader.
///
/// Every operation releases the buffers it allocated before returning one of
/// these; there are no retries and no partial results other than the byte
/// counts documented on [`SquashFS::read`].
///
/// [`SquashFS::read`]: super::SquashFS::read
#[derive(Debug, Error)]
pub enum SqfsError {
    /// A malformed on-disk structure or an out-of-range request.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A path component does not exist in its directory.
    #[error("not found: {0}")]
    NotFound(String),

    /// A non-terminal path component resolved to something other than a
    /// directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// The image uses a compression codec this build does not carry, or the
    /// requested inode is of a type that cannot be read (device, fifo,
    /// socket).
    #[error("not supported: {0}")]
    NotSupported(&'static str),

    /// Symbolic link resolution exceeded its fixed depth bound.
    #[error("too many levels of symbolic links")]
    LoopDetected,

    /// The backing store failed or short-returned a sector read.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
