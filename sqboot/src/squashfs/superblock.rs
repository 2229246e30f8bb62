use std::io::{self, Read};

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt};
use num_enum::{FromPrimitive, IntoPrimitive};

use super::error::{Result, SqfsError};
use super::metadata::EntryReference;

pub const MAGIC: u32 = 0x73717368;

/// Size of the fixed on-disk superblock header.
pub const SUPERBLOCK_SIZE: usize = 96;

/// The SquashFS superblock. Little-endian on disk, at byte 0 of the
/// partition. The table anchors delimit the metadata regions that the rest
/// of the reader decodes.
#[derive(Debug, Clone)]
pub struct Superblock {
    pub magic: u32,
    pub inode_count: u32,
    pub mod_time: u32,
    pub block_size: u32,
    pub frag_count: u32,
    pub compression: CompressionId,
    pub block_log: u16,
    pub flags: SuperblockFlags,
    pub id_count: u16,
    pub version_major: u16,
    pub version_minor: u16,
    pub root_inode: EntryReference,
    pub bytes_used: u64,
    pub id_table: u64,
    pub xattr_table: u64,
    pub inode_table: u64,
    pub dir_table: u64,
    pub frag_table: u64,
    pub export_table: u64,
}

bitflags! {
    #[derive(Debug, Clone, Copy)]
    pub struct SuperblockFlags: u16 {
        const INODES_UNCOMPRESSED = 0x0001;
        const DATABLOCKS_UNCOMPRESSED = 0x0002;
        const FRAGMENTS_UNCOMPRESSED = 0x0008;
        const FRAGMENTS_NOT_USED = 0x0010;
        const FRAGMENTS_ALWAYS_GENERATED = 0x0020;
        const DATA_DEDUPLICATED = 0x0040;
        const NFS_EXPORT_EXISTS = 0x0080;
        const XATTRS_UNCOMPRESSED = 0x0100;
        const NO_XATTRS = 0x0200;
        const COMPRESSOR_OPTIONS_PRESENT = 0x0400;
        const ID_TABLE_UNCOMPRESSED = 0x0800;
    }
}

/// Compression codec id from the superblock. The decoder for it is selected
/// once at probe time.
#[derive(Debug, IntoPrimitive, FromPrimitive, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum CompressionId {
    Gzip = 1,
    Lzo = 2,
    Lzma = 3,
    Xz = 4,
    Lz4 = 5,
    Zstd = 6,
    #[num_enum(default)]
    Unknown = 0xFFFF,
}

impl Superblock {
    fn read<R>(r: &mut R) -> io::Result<Superblock>
    where
        R: Read,
    {
        Ok(Superblock {
            magic: r.read_u32::<LittleEndian>()?,
            inode_count: r.read_u32::<LittleEndian>()?,
            mod_time: r.read_u32::<LittleEndian>()?,
            block_size: r.read_u32::<LittleEndian>()?,
            frag_count: r.read_u32::<LittleEndian>()?,
            compression: CompressionId::from(r.read_u16::<LittleEndian>()?),
            block_log: r.read_u16::<LittleEndian>()?,
            flags: SuperblockFlags::from_bits_truncate(r.read_u16::<LittleEndian>()?),
            id_count: r.read_u16::<LittleEndian>()?,
            version_major: r.read_u16::<LittleEndian>()?,
            version_minor: r.read_u16::<LittleEndian>()?,
            root_inode: EntryReference::read(r)?,
            bytes_used: r.read_u64::<LittleEndian>()?,
            id_table: r.read_u64::<LittleEndian>()?,
            xattr_table: r.read_u64::<LittleEndian>()?,
            inode_table: r.read_u64::<LittleEndian>()?,
            dir_table: r.read_u64::<LittleEndian>()?,
            frag_table: r.read_u64::<LittleEndian>()?,
            export_table: r.read_u64::<LittleEndian>()?,
        })
    }

    /// Parse and sanity-check a superblock from the first bytes of the
    /// partition.
    pub fn parse(buf: &[u8]) -> Result<Superblock> {
        if buf.len() < SUPERBLOCK_SIZE {
            return Err(SqfsError::InvalidArgument("superblock truncated"));
        }
        let sb = Superblock::read(&mut &buf[..])
            .map_err(|_| SqfsError::InvalidArgument("superblock truncated"))?;
        sb.validate()?;
        Ok(sb)
    }

    fn validate(&self) -> Result<()> {
        if self.magic != MAGIC {
            return Err(SqfsError::InvalidArgument("bad magic number"));
        }
        if self.version_major != 4 || self.version_minor != 0 {
            return Err(SqfsError::InvalidArgument("unsupported format version"));
        }
        if !self.block_size.is_power_of_two()
            || !(4096..=1_048_576).contains(&self.block_size)
            || 1u32.checked_shl(self.block_log.into()) != Some(self.block_size)
        {
            return Err(SqfsError::InvalidArgument("bad data block size"));
        }
        if self.inode_table >= self.dir_table {
            return Err(SqfsError::InvalidArgument("table anchors out of order"));
        }
        if self.frag_table != u64::MAX {
            if self.dir_table >= self.frag_table {
                return Err(SqfsError::InvalidArgument("table anchors out of order"));
            }
            if self.export_table != u64::MAX && self.frag_table > self.export_table {
                return Err(SqfsError::InvalidArgument("table anchors out of order"));
            }
        }
        Ok(())
    }

    /// End of the directory table region: the next present anchor after it.
    pub(crate) fn dir_table_end(&self) -> u64 {
        if self.frag_table != u64::MAX {
            self.frag_table
        } else if self.export_table != u64::MAX {
            self.export_table
        } else {
            self.id_table
        }
    }
}
