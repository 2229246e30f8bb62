use std::io::{self, Read};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use num_enum::{FromPrimitive, IntoPrimitive};
use tracing::debug;

use super::compressor::Decompressor;
use super::device::{read_range, BlockDevice, Partition};
use super::error::{Result, SqfsError};

/// Decoded size bound of a metadata chunk, fixed by the format.
pub(crate) const METADATA_BLOCK_SIZE: usize = 8192;

/// Every metadata chunk starts with a 16-bit header.
pub(crate) const METADATA_HEADER_SIZE: usize = 2;

/// Parse a metadata chunk header at `pos` in `buf`: bit 15 set means the
/// payload is stored verbatim, the low 15 bits give the stored length.
pub(crate) fn chunk_header(buf: &[u8], pos: usize) -> Result<(bool, usize)> {
    if pos + METADATA_HEADER_SIZE > buf.len() {
        return Err(SqfsError::InvalidArgument("metadata chunk header out of range"));
    }
    let header = LittleEndian::read_u16(&buf[pos..]);
    let stored = usize::from(header & 0x7FFF);
    let compressed = header & 0x8000 == 0;
    if stored > METADATA_BLOCK_SIZE {
        return Err(SqfsError::InvalidArgument("metadata chunk too large"));
    }
    Ok((compressed, stored))
}

/// Decode the metadata chunk at `pos` in `buf` into `out`, returning the
/// decoded length. Never reads past `buf`.
pub(crate) fn decode_chunk(
    buf: &[u8],
    pos: usize,
    decomp: &dyn Decompressor,
    out: &mut [u8],
) -> Result<usize> {
    let (compressed, stored) = chunk_header(buf, pos)?;
    let data = pos + METADATA_HEADER_SIZE;
    if data + stored > buf.len() {
        return Err(SqfsError::InvalidArgument("metadata chunk payload out of range"));
    }
    let src = &buf[data..data + stored];
    if compressed {
        decomp.decompress(src, out)
    } else {
        out[..stored].copy_from_slice(src);
        Ok(stored)
    }
}

/// A 48-bit reference to a metadata record: the high 32 bits are the byte
/// offset of the chunk's header relative to the table anchor, the low 16
/// bits the record's offset inside the decoded chunk.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EntryReference {
    val: u64,
}

impl EntryReference {
    pub(crate) fn new(location: u64, offset: u16) -> Self {
        Self {
            val: (location << 16) | u64::from(offset),
        }
    }

    pub(crate) fn location(&self) -> u64 {
        self.val >> 16
    }

    pub(crate) fn offset(&self) -> u16 {
        (self.val & 0xFFFF) as u16
    }

    pub(crate) fn read<R>(r: &mut R) -> io::Result<Self>
    where
        R: Read,
    {
        Ok(Self {
            val: r.read_u64::<LittleEndian>()?,
        })
    }
}

impl std::fmt::Debug for EntryReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.location(), self.offset())
    }
}

/// A fully decoded metadata table (inode or directory table) plus the
/// position list that maps chunk start offsets back to decoded chunk
/// indices. Chunk `i` is decoded at byte `i * 8192` of `bytes`.
#[derive(Debug)]
pub(crate) struct Table {
    bytes: Vec<u8>,
    /// Cumulative source bytes (header plus stored payload) consumed after
    /// decoding each chunk; chunk `i > 0` starts at `pos_list[i - 1]`.
    pos_list: Vec<u32>,
}

impl Table {
    /// Materialise the table stored in `[start, end)` on disk: one device
    /// read for the whole span, a probe pass to count chunks, then one
    /// decode pass into a single buffer.
    pub fn load<D: BlockDevice>(
        dev: &mut D,
        part: &Partition,
        decomp: &dyn Decompressor,
        start: u64,
        end: u64,
    ) -> Result<Table> {
        if end <= start {
            return Err(SqfsError::InvalidArgument("empty metadata table range"));
        }
        let table_size = usize::try_from(end - start)
            .map_err(|_| SqfsError::InvalidArgument("metadata table too large"))?;
        let (raw, base) = read_range(dev, part, start, end - start)?;
        let raw = &raw[base..base + table_size];

        // Probe pass: chunk boundaries and the position list.
        let mut pos_list = Vec::new();
        let mut src = 0usize;
        while src < table_size {
            let (_, stored) = chunk_header(raw, src)?;
            src += METADATA_HEADER_SIZE + stored;
            if src > table_size {
                return Err(SqfsError::InvalidArgument("metadata chunk crosses table end"));
            }
            pos_list.push(src as u32);
        }

        let count = pos_list.len();
        let mut bytes = vec![0u8; count * METADATA_BLOCK_SIZE];
        let mut decoded_total = 0;
        let mut src = 0usize;
        for i in 0..count {
            let out = &mut bytes[i * METADATA_BLOCK_SIZE..(i + 1) * METADATA_BLOCK_SIZE];
            let n = decode_chunk(raw, src, decomp, out)?;
            decoded_total = i * METADATA_BLOCK_SIZE + n;
            src = pos_list[i] as usize;
            // Interior chunks always decode to the full 8 KiB, so a short
            // chunk is this table's last. The span up to the next anchor can
            // hold further chunks belonging to the next table (the fragment
            // entry chunks precede the fragment index); stop before them.
            if n < METADATA_BLOCK_SIZE {
                pos_list.truncate(i + 1);
                break;
            }
        }
        bytes.truncate(decoded_total);

        debug!(chunks = pos_list.len(), decoded = decoded_total, "metadata table loaded");
        Ok(Table { bytes, pos_list })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decoded chunk index for a chunk start offset (relative to the table
    /// anchor), via the position list.
    fn chunk_index(&self, chunk_start: u64) -> Result<usize> {
        if chunk_start == 0 {
            if self.pos_list.is_empty() {
                return Err(SqfsError::InvalidArgument("reference into empty table"));
            }
            return Ok(0);
        }
        let chunk_start =
            u32::try_from(chunk_start).map_err(|_| SqfsError::InvalidArgument("reference out of range"))?;
        match self.pos_list.binary_search(&chunk_start) {
            Ok(i) if i + 1 < self.pos_list.len() => Ok(i + 1),
            _ => Err(SqfsError::InvalidArgument("reference does not address a chunk")),
        }
    }

    /// Byte cursor into the decoded table for a metadata reference.
    pub fn cursor(&self, entry_ref: EntryReference) -> Result<usize> {
        let pos = self.chunk_index(entry_ref.location())? * METADATA_BLOCK_SIZE
            + usize::from(entry_ref.offset());
        if pos >= self.bytes.len() {
            return Err(SqfsError::InvalidArgument("reference past decoded table"));
        }
        Ok(pos)
    }
}

/// The decoded inode and directory tables a directory stream operates on.
/// Both tables live for as long as the stream that owns them.
#[derive(Debug)]
pub(crate) struct Tables {
    pub inode: Table,
    pub dir: Table,
    pub block_size: u32,
}

impl Tables {
    pub fn inode_at(&self, entry_ref: EntryReference) -> Result<Inode> {
        let pos = self.inode.cursor(entry_ref)?;
        Inode::parse(&self.inode.bytes()[pos..], self.block_size)
    }

    /// Cursor into the decoded directory table for a directory inode,
    /// together with the directory's stored listing size.
    pub fn dir_cursor(&self, inode: &Inode) -> Result<(usize, u32)> {
        let InodeInfo::Dir(ref d) = inode.info else {
            return Err(SqfsError::InvalidArgument("inode is not a directory"));
        };
        let pos = self.dir.chunk_index(u64::from(d.block_index))? * METADATA_BLOCK_SIZE
            + usize::from(d.block_offset);
        if pos > self.dir.bytes().len() {
            return Err(SqfsError::InvalidArgument("directory start past decoded table"));
        }
        Ok((pos, d.file_size))
    }
}

/// On-disk inode type discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum InodeType {
    BasicDir = 1,
    BasicFile = 2,
    BasicSymlink = 3,
    BasicBlockDev = 4,
    BasicCharDev = 5,
    BasicFifo = 6,
    BasicSocket = 7,
    ExtDir = 8,
    ExtFile = 9,
    ExtSymlink = 10,
    ExtBlockDev = 11,
    ExtCharDev = 12,
    ExtFifo = 13,
    ExtSocket = 14,
    #[num_enum(default)]
    Unknown = 0xFFFF,
}

/// An inode record from the decoded inode table. All variants share the
/// common base; the per-type payload is in [`InodeInfo`].
#[derive(Debug, Clone)]
pub struct Inode {
    pub inode_type: InodeType,
    pub mode: u16,
    pub uid_index: u16,
    pub gid_index: u16,
    pub mtime: u32,
    pub inode_number: u32,
    pub info: InodeInfo,
}

/// Type-specific inode payload. Basic and extended layouts of the same
/// family decode into one variant.
#[derive(Debug, Clone)]
pub enum InodeInfo {
    Dir(DirInodeInfo),
    Reg(RegInodeInfo),
    Symlink(SymlinkInodeInfo),
    Dev(DevInodeInfo),
    Ipc,
    None,
}

#[derive(Debug, Clone)]
pub struct DirInodeInfo {
    /// Start offset of the metadata chunk holding this directory's listing,
    /// relative to the directory table anchor.
    pub block_index: u32,
    /// Offset of the listing inside that decoded chunk.
    pub block_offset: u16,
    /// Stored listing size. Three bytes larger than the real listing.
    pub file_size: u32,
    pub link_count: u32,
    pub parent_inode: u32,
}

/// The file-info projection of a regular inode: everything the file reader
/// needs to reassemble content from data blocks and the fragment store.
#[derive(Debug, Clone)]
pub struct RegInodeInfo {
    pub blocks_start: u64,
    pub frag_index: u32,
    pub frag_offset: u32,
    pub file_size: u64,
    /// One stored size per data block; bit 24 set means the block is stored
    /// verbatim.
    pub block_sizes: Vec<u32>,
}

impl RegInodeInfo {
    pub fn has_fragment(&self) -> bool {
        self.frag_index != u32::MAX
    }
}

#[derive(Debug, Clone)]
pub struct SymlinkInodeInfo {
    pub link_count: u32,
    pub target: String,
}

#[derive(Debug, Clone)]
pub struct DevInodeInfo {
    pub link_count: u32,
    pub dev_number: u32,
}

impl Inode {
    /// Decode one inode record from the head of `buf`.
    pub(crate) fn parse(buf: &[u8], block_size: u32) -> Result<Inode> {
        Self::read(&mut &buf[..], block_size)
            .map_err(|_| SqfsError::InvalidArgument("truncated inode record"))
    }

    fn read<R>(r: &mut R, block_size: u32) -> io::Result<Inode>
    where
        R: Read,
    {
        let inode_type = InodeType::from(r.read_u16::<LittleEndian>()?);
        let mode = r.read_u16::<LittleEndian>()?;
        let uid_index = r.read_u16::<LittleEndian>()?;
        let gid_index = r.read_u16::<LittleEndian>()?;
        let mtime = r.read_u32::<LittleEndian>()?;
        let inode_number = r.read_u32::<LittleEndian>()?;

        let info = match inode_type {
            InodeType::BasicDir => {
                let block_index = r.read_u32::<LittleEndian>()?;
                let link_count = r.read_u32::<LittleEndian>()?;
                let file_size = u32::from(r.read_u16::<LittleEndian>()?);
                let block_offset = r.read_u16::<LittleEndian>()?;
                let parent_inode = r.read_u32::<LittleEndian>()?;
                InodeInfo::Dir(DirInodeInfo {
                    block_index,
                    block_offset,
                    file_size,
                    link_count,
                    parent_inode,
                })
            }
            InodeType::ExtDir => {
                let link_count = r.read_u32::<LittleEndian>()?;
                let file_size = r.read_u32::<LittleEndian>()?;
                let block_index = r.read_u32::<LittleEndian>()?;
                let parent_inode = r.read_u32::<LittleEndian>()?;
                let _index_count = r.read_u16::<LittleEndian>()?;
                let block_offset = r.read_u16::<LittleEndian>()?;
                let _xattr_index = r.read_u32::<LittleEndian>()?;
                InodeInfo::Dir(DirInodeInfo {
                    block_index,
                    block_offset,
                    file_size,
                    link_count,
                    parent_inode,
                })
            }
            InodeType::BasicFile => {
                let blocks_start = u64::from(r.read_u32::<LittleEndian>()?);
                let frag_index = r.read_u32::<LittleEndian>()?;
                let frag_offset = r.read_u32::<LittleEndian>()?;
                let file_size = u64::from(r.read_u32::<LittleEndian>()?);
                let block_sizes =
                    Self::read_block_sizes(r, file_size, frag_index, block_size)?;
                InodeInfo::Reg(RegInodeInfo {
                    blocks_start,
                    frag_index,
                    frag_offset,
                    file_size,
                    block_sizes,
                })
            }
            InodeType::ExtFile => {
                let blocks_start = r.read_u64::<LittleEndian>()?;
                let file_size = r.read_u64::<LittleEndian>()?;
                let _sparse = r.read_u64::<LittleEndian>()?;
                let _link_count = r.read_u32::<LittleEndian>()?;
                let frag_index = r.read_u32::<LittleEndian>()?;
                let frag_offset = r.read_u32::<LittleEndian>()?;
                let _xattr_index = r.read_u32::<LittleEndian>()?;
                let block_sizes =
                    Self::read_block_sizes(r, file_size, frag_index, block_size)?;
                InodeInfo::Reg(RegInodeInfo {
                    blocks_start,
                    frag_index,
                    frag_offset,
                    file_size,
                    block_sizes,
                })
            }
            InodeType::BasicSymlink | InodeType::ExtSymlink => {
                let link_count = r.read_u32::<LittleEndian>()?;
                let target_size = r.read_u32::<LittleEndian>()?;
                let mut target = vec![0u8; target_size as usize];
                r.read_exact(&mut target)?;
                let target = String::from_utf8(target)
                    .map_err(|_| io::Error::from(io::ErrorKind::InvalidData))?;
                InodeInfo::Symlink(SymlinkInodeInfo { link_count, target })
            }
            InodeType::BasicBlockDev | InodeType::BasicCharDev => {
                let link_count = r.read_u32::<LittleEndian>()?;
                let dev_number = r.read_u32::<LittleEndian>()?;
                InodeInfo::Dev(DevInodeInfo {
                    link_count,
                    dev_number,
                })
            }
            InodeType::BasicFifo | InodeType::BasicSocket => {
                let _link_count = r.read_u32::<LittleEndian>()?;
                InodeInfo::Ipc
            }
            _ => InodeInfo::None,
        };

        Ok(Inode {
            inode_type,
            mode,
            uid_index,
            gid_index,
            mtime,
            inode_number,
            info,
        })
    }

    /// The per-block stored-size array follows the fixed part of a regular
    /// inode. A file with a fragment tail stores `size / block_size`
    /// entries, one without stores `ceil(size / block_size)`.
    fn read_block_sizes<R>(
        r: &mut R,
        file_size: u64,
        frag_index: u32,
        block_size: u32,
    ) -> io::Result<Vec<u32>>
    where
        R: Read,
    {
        let block_size = u64::from(block_size);
        let count = if frag_index == u32::MAX {
            file_size.div_ceil(block_size)
        } else {
            file_size / block_size
        };
        let mut sizes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            sizes.push(r.read_u32::<LittleEndian>()?);
        }
        Ok(sizes)
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.inode_type, InodeType::BasicDir | InodeType::ExtDir)
    }

    pub fn is_file(&self) -> bool {
        matches!(self.inode_type, InodeType::BasicFile | InodeType::ExtFile)
    }

    pub fn is_symlink(&self) -> bool {
        matches!(
            self.inode_type,
            InodeType::BasicSymlink | InodeType::ExtSymlink
        )
    }

    pub fn file_size(&self) -> Option<u64> {
        match &self.info {
            InodeInfo::Reg(i) => Some(i.file_size),
            InodeInfo::Dir(i) => Some(u64::from(i.file_size)),
            _ => None,
        }
    }
}
