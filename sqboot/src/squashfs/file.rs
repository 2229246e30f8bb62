use tracing::debug;

use super::compressor::Decompressor;
use super::device::{read_range, BlockDevice, Partition};
use super::error::{Result, SqfsError};
use super::fragment;
use super::metadata::RegInodeInfo;
use super::superblock::Superblock;

/// Stored length of a data block; bit 24 set means the block is stored
/// verbatim rather than compressed.
fn block_stored_size(raw: u32) -> u32 {
    raw & 0x00FF_FFFF
}

fn block_is_compressed(raw: u32) -> bool {
    raw & 0x0100_0000 == 0
}

/// Read the content of a regular file into `dst[offset..]`.
///
/// `len == 0` requests the whole file; a nonzero `len` must not exceed the
/// file size and truncates the read. Returns the number of bytes copied.
///
/// Content is reassembled in file order: each data block is fetched with
/// one sector-aligned device read and decompressed into a reusable
/// block-sized scratch buffer, then the fragment tail (if the file has one)
/// is sliced out of its shared fragment block.
pub(crate) fn read_regular<D: BlockDevice>(
    dev: &mut D,
    part: &Partition,
    sb: &Superblock,
    decomp: &dyn Decompressor,
    info: &RegInodeInfo,
    dst: &mut [u8],
    offset: u64,
    len: u64,
) -> Result<u64> {
    let want = if len == 0 {
        info.file_size
    } else {
        if len > info.file_size {
            return Err(SqfsError::InvalidArgument("length larger than file"));
        }
        len
    };

    let offset = usize::try_from(offset)
        .map_err(|_| SqfsError::InvalidArgument("destination offset too large"))?;
    let want_usize = usize::try_from(want)
        .map_err(|_| SqfsError::InvalidArgument("read length too large"))?;
    let dst = dst
        .get_mut(offset..)
        .and_then(|d| d.get_mut(..want_usize))
        .ok_or(SqfsError::InvalidArgument("destination buffer too small"))?;

    let block_size = sb.block_size as usize;
    let mut scratch = vec![0u8; block_size];
    let mut copied = 0usize;
    let mut data_offset = info.blocks_start;

    for &raw in &info.block_sizes {
        if copied == want_usize {
            break;
        }
        let stored = block_stored_size(raw);

        // A zero stored size marks a block of zeros; nothing is on disk.
        if stored == 0 {
            let n = block_size.min(want_usize - copied);
            dst[copied..copied + n].fill(0);
            copied += n;
            continue;
        }

        let (buf, off) = read_range(dev, part, data_offset, u64::from(stored))?;
        let data = &buf[off..off + stored as usize];

        let decoded: &[u8] = if block_is_compressed(raw) {
            let n = decomp.decompress(data, &mut scratch)?;
            &scratch[..n]
        } else {
            data
        };

        let n = decoded.len().min(want_usize - copied);
        dst[copied..copied + n].copy_from_slice(&decoded[..n]);
        copied += n;
        data_offset += u64::from(stored);
    }

    if info.has_fragment() && copied < want_usize {
        let entry = fragment::lookup(dev, part, sb, decomp, info.frag_index)?;
        let stored = entry.stored_size();
        let (buf, off) = read_range(dev, part, entry.start, u64::from(stored))?;
        let data = &buf[off..off + stored as usize];

        let decoded: &[u8] = if entry.is_compressed() {
            let n = decomp.decompress(data, &mut scratch)?;
            &scratch[..n]
        } else {
            data
        };

        let tail = want_usize - copied;
        let frag_offset = info.frag_offset as usize;
        if frag_offset + tail > decoded.len() {
            return Err(SqfsError::InvalidArgument("fragment shorter than file tail"));
        }
        dst[copied..].copy_from_slice(&decoded[frag_offset..frag_offset + tail]);
        copied += tail;
    }

    if copied < want_usize {
        return Err(SqfsError::InvalidArgument("file data ends early"));
    }

    debug!(size = info.file_size, copied, "file read");
    Ok(copied as u64)
}
