use byteorder::{ByteOrder, LittleEndian};
use tracing::trace;

use super::compressor::Decompressor;
use super::device::{read_range, BlockDevice, Partition};
use super::error::{Result, SqfsError};
use super::metadata::{self, METADATA_BLOCK_SIZE, METADATA_HEADER_SIZE};
use super::superblock::Superblock;

/// On-disk size of one fragment entry.
const FRAGMENT_ENTRY_SIZE: usize = 16;

/// Fragment entries per decoded metadata chunk.
const FRAGMENTS_PER_CHUNK: u64 = (METADATA_BLOCK_SIZE / FRAGMENT_ENTRY_SIZE) as u64;

/// Descriptor of one shared fragment block: where it starts on disk and how
/// many bytes are stored there.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FragmentEntry {
    pub start: u64,
    size: u32,
}

impl FragmentEntry {
    pub fn stored_size(&self) -> u32 {
        self.size & 0x00FF_FFFF
    }

    pub fn is_compressed(&self) -> bool {
        self.size & 0x0100_0000 == 0
    }
}

/// Look up one fragment entry. The fragment table is two-level: an array of
/// u64 pointers at the fragment-table anchor, each addressing a metadata
/// chunk of packed entries. Both levels are read and released per call.
pub(crate) fn lookup<D: BlockDevice>(
    dev: &mut D,
    part: &Partition,
    sb: &Superblock,
    decomp: &dyn Decompressor,
    index: u32,
) -> Result<FragmentEntry> {
    if index >= sb.frag_count {
        return Err(SqfsError::InvalidArgument("fragment index out of range"));
    }

    let chunk = u64::from(index) / FRAGMENTS_PER_CHUNK;
    let slot = (u64::from(index) % FRAGMENTS_PER_CHUNK) as usize;

    // First level: the pointer to the metadata chunk holding this entry.
    let (buf, off) = read_range(dev, part, sb.frag_table + chunk * 8, 8)?;
    let chunk_start = LittleEndian::read_u64(&buf[off..]);

    // Second level: the chunk itself. Its header gives the stored length.
    let (buf, off) = read_range(dev, part, chunk_start, METADATA_HEADER_SIZE as u64)?;
    let (_, stored) = metadata::chunk_header(&buf, off)?;
    let (buf, off) = read_range(
        dev,
        part,
        chunk_start,
        (METADATA_HEADER_SIZE + stored) as u64,
    )?;

    let mut entries = vec![0u8; METADATA_BLOCK_SIZE];
    let decoded = metadata::decode_chunk(&buf, off, decomp, &mut entries)?;
    let entry_off = slot * FRAGMENT_ENTRY_SIZE;
    if entry_off + FRAGMENT_ENTRY_SIZE > decoded {
        return Err(SqfsError::InvalidArgument("fragment entry past chunk end"));
    }

    let entry = FragmentEntry {
        start: LittleEndian::read_u64(&entries[entry_off..]),
        size: LittleEndian::read_u32(&entries[entry_off + 8..]),
    };
    trace!(
        index,
        start = entry.start,
        stored = entry.stored_size(),
        compressed = entry.is_compressed(),
        "fragment entry"
    );
    Ok(entry)
}
