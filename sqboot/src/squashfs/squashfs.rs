//! See <https://dr-emann.github.io/squashfs/squashfs.html>
//! for details on the SquashFS binary format

use std::collections::VecDeque;

use tracing::debug;

use super::compressor::{self, Decompressor};
use super::device::{read_range, BlockDevice, Partition};
use super::dir::{DirState, DirStream, RawDirEntry};
use super::error::{Result, SqfsError};
use super::file;
use super::metadata::{EntryReference, Inode, InodeInfo, Table, Tables};
use super::path::{self, MAX_SYMLINK_DEPTH};
use super::superblock::Superblock;

/// A mounted SquashFS. Holds the device, the partition it was probed on,
/// the superblock, and the decompressor selected from it; dropping the
/// value unmounts.
///
/// All operations take `&mut self`: the reader is synchronous and
/// single-threaded, and every call owns the buffers it allocates.
pub struct SquashFS<D: BlockDevice> {
    dev: D,
    part: Partition,
    sb: Superblock,
    decomp: Box<dyn Decompressor>,
}

impl<D: BlockDevice> std::fmt::Debug for SquashFS<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SquashFS")
            .field("part", &self.part)
            .field("sb", &self.sb)
            .finish_non_exhaustive()
    }
}

impl<D: BlockDevice> SquashFS<D> {
    /// Mount: read the superblock from the start of the partition, validate
    /// it, and select the decompressor it names. On failure no mount
    /// exists and the error tells why.
    pub fn probe(mut dev: D, part: Partition) -> Result<Self> {
        let (buf, off) = read_range(
            &mut dev,
            &part,
            0,
            super::superblock::SUPERBLOCK_SIZE as u64,
        )?;
        let sb = Superblock::parse(&buf[off..])?;
        let decomp = compressor::for_id(sb.compression)?;
        debug!(
            inodes = sb.inode_count,
            block_size = sb.block_size,
            compression = ?sb.compression,
            "mounted SquashFS"
        );
        Ok(SquashFS {
            dev,
            part,
            sb,
            decomp,
        })
    }

    /// Unmount, returning the device.
    pub fn close(self) -> D {
        self.dev
    }

    pub fn superblock(&self) -> &Superblock {
        &self.sb
    }

    /// Open a directory for enumeration. Both metadata tables are loaded
    /// and decompressed eagerly and travel with the returned stream; the
    /// stream is positioned at the directory the path resolves to.
    pub fn open_dir(&mut self, path: &str) -> Result<DirStream> {
        let mut depth = 0;
        self.open_dir_at_depth(path, &mut depth)
    }

    /// Read a file's content into `buf[offset..]`, resolving symlinks.
    /// `len == 0` reads the whole file. Returns the byte count copied.
    pub fn read(&mut self, path: &str, buf: &mut [u8], offset: u64, len: u64) -> Result<u64> {
        let mut depth = 0;
        self.read_at_depth(path, buf, offset, len, &mut depth)
    }

    /// Size of the file at `path`, resolving symlinks.
    pub fn size(&mut self, path: &str) -> Result<u64> {
        let mut depth = 0;
        self.size_at_depth(path, &mut depth)
    }

    /// One resolution shares `depth` across every layer: intermediate
    /// symlinks met by the walker and terminal symlinks re-dispatched by
    /// `read`/`size` all count against the same bound.
    fn open_dir_at_depth(&mut self, path: &str, depth: &mut u32) -> Result<DirStream> {
        let tables = self.load_tables()?;
        let inode = self.walk(&tables, path, depth)?;
        if !inode.is_dir() {
            return Err(SqfsError::NotADirectory(path.to_owned()));
        }
        let (cursor, file_size) = tables.dir_cursor(&inode)?;
        Ok(DirStream::new(tables, cursor, file_size))
    }

    fn read_at_depth(
        &mut self,
        path: &str,
        buf: &mut [u8],
        offset: u64,
        len: u64,
        depth: &mut u32,
    ) -> Result<u64> {
        let (inode, dir_tokens) = self.lookup_file(path, depth)?;
        match inode.info {
            InodeInfo::Reg(ref info) => file::read_regular(
                &mut self.dev,
                &self.part,
                &self.sb,
                self.decomp.as_ref(),
                info,
                buf,
                offset,
                len,
            ),
            InodeInfo::Symlink(ref link) => {
                *depth += 1;
                if *depth > MAX_SYMLINK_DEPTH {
                    return Err(SqfsError::LoopDetected);
                }
                let resolved = path::resolve_link(&dir_tokens, &link.target)?;
                self.read_at_depth(&path::join_absolute(&resolved), buf, offset, len, depth)
            }
            _ => Err(SqfsError::NotSupported("inode type is not readable")),
        }
    }

    fn size_at_depth(&mut self, path: &str, depth: &mut u32) -> Result<u64> {
        let (inode, dir_tokens) = self.lookup_file(path, depth)?;
        match inode.info {
            InodeInfo::Reg(ref info) => Ok(info.file_size),
            InodeInfo::Symlink(ref link) => {
                *depth += 1;
                if *depth > MAX_SYMLINK_DEPTH {
                    return Err(SqfsError::LoopDetected);
                }
                let resolved = path::resolve_link(&dir_tokens, &link.target)?;
                self.size_at_depth(&path::join_absolute(&resolved), depth)
            }
            _ => Err(SqfsError::NotSupported("inode type has no size")),
        }
    }

    /// Resolve `path` to its terminal inode by searching the containing
    /// directory, without following a terminal symlink. Also returns the
    /// directory's tokens for the caller's own symlink resolution.
    fn lookup_file(&mut self, path: &str, depth: &mut u32) -> Result<(Inode, Vec<String>)> {
        let (dir, base) = path::split(path);
        if base.is_empty() {
            return Err(SqfsError::InvalidArgument("path names no file"));
        }
        let mut stream = self.open_dir_at_depth(&dir, depth)?;
        let record = stream
            .by_ref()
            .find(|r| r.name == base)
            .ok_or_else(|| SqfsError::NotFound(path.to_owned()))?;
        let inode = stream.tables.inode_at(record.inode_ref)?;
        Ok((inode, path::tokenize(&dir)))
    }

    fn load_tables(&mut self) -> Result<Tables> {
        let inode = Table::load(
            &mut self.dev,
            &self.part,
            self.decomp.as_ref(),
            self.sb.inode_table,
            self.sb.dir_table,
        )?;
        let dir = Table::load(
            &mut self.dev,
            &self.part,
            self.decomp.as_ref(),
            self.sb.dir_table,
            self.sb.dir_table_end(),
        )?;
        Ok(Tables {
            inode,
            dir,
            block_size: self.sb.block_size,
        })
    }

    /// Walk `path` from the root inode, component by component. `.` and
    /// `..` apply positionally; symlinks splice their resolved target in
    /// front of the remaining components and restart from the root, with
    /// traversal count bounded by `depth`.
    fn walk(&self, tables: &Tables, path: &str, depth: &mut u32) -> Result<Inode> {
        let root = tables.inode_at(self.sb.root_inode)?;
        let mut queue: VecDeque<String> = path::tokenize(path).into();
        let mut stack: Vec<(String, Inode)> = Vec::new();
        let mut cur = root.clone();

        while let Some(token) = queue.pop_front() {
            match token.as_str() {
                "." => continue,
                ".." => {
                    // At the root, dot-dot refers to the root itself.
                    stack.pop();
                    cur = stack.last().map(|(_, i)| i.clone()).unwrap_or_else(|| root.clone());
                    continue;
                }
                _ => {}
            }

            if !cur.is_dir() {
                return Err(SqfsError::NotADirectory(token));
            }
            let entry = find_entry(tables, &cur, &token)?
                .ok_or_else(|| SqfsError::NotFound(token.clone()))?;
            let inode = tables.inode_at(entry)?;

            if let InodeInfo::Symlink(ref link) = inode.info {
                *depth += 1;
                if *depth > MAX_SYMLINK_DEPTH {
                    return Err(SqfsError::LoopDetected);
                }
                let parent: Vec<String> = stack.iter().map(|(n, _)| n.clone()).collect();
                let mut spliced: VecDeque<String> =
                    path::resolve_link(&parent, &link.target)?.into();
                spliced.extend(queue.drain(..));
                queue = spliced;
                stack.clear();
                cur = root.clone();
            } else {
                cur = inode.clone();
                stack.push((token, inode));
            }
        }
        Ok(cur)
    }
}

/// Scan one directory for an entry named `name`, returning the reference
/// to its inode.
fn find_entry(tables: &Tables, dir_inode: &Inode, name: &str) -> Result<Option<EntryReference>> {
    let (cursor, file_size) = tables.dir_cursor(dir_inode)?;
    let mut state = DirState::new(cursor, file_size);
    while let Some((header, entry)) = state.next_entry(tables.dir.bytes()) {
        let RawDirEntry { offset, name: entry_name, .. } = entry;
        if entry_name == name.as_bytes() {
            return Ok(Some(EntryReference::new(u64::from(header.start), offset)));
        }
    }
    Ok(None)
}
