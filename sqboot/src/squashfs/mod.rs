mod compressor;
mod dir;
mod error;
mod file;
mod fragment;
mod path;
mod squashfs;
mod superblock;

pub mod device;
pub mod metadata;

pub use compressor::Decompressor;
pub use device::{BlockDevice, Partition, StreamDevice};
pub use dir::{DirRecord, DirStream, EntryKind};
pub use error::{Result, SqfsError};
pub use metadata::{Inode, InodeInfo, InodeType};
pub use squashfs::SquashFS;
pub use superblock::{CompressionId, Superblock, SuperblockFlags};
