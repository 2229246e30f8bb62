use byteorder::{ByteOrder, LittleEndian};
use tracing::warn;

use super::error::Result;
use super::metadata::{EntryReference, InodeInfo, InodeType, Tables};

/// Directory header: 12 bytes introducing a run of entries that all live in
/// the same inode-table chunk and share a base inode number.
pub(crate) const DIR_HEADER_SIZE: u32 = 12;

/// Fixed part of a directory entry, before the name bytes.
const DIR_ENTRY_BASE_SIZE: u32 = 8;

/// A directory's stored size counts three virtual bytes for "." and "..",
/// which are never present in the listing itself.
const DIR_VIRTUAL_SIZE: u32 = 3;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DirHeader {
    /// Number of entries in this run. Stored on disk as `count - 1`.
    pub count: u32,
    /// Start offset of the inode-table chunk holding this run's inodes.
    pub start: u32,
    /// Base inode number; entries store a signed delta from it.
    pub inode_number: u32,
}

/// One raw directory entry, name bytes still undecoded.
#[derive(Debug)]
pub(crate) struct RawDirEntry {
    /// Offset of the inode inside its decoded inode-table chunk.
    pub offset: u16,
    /// Signed distance from the run header's base inode number.
    pub inode_delta: i16,
    pub type_tag: u16,
    pub name: Vec<u8>,
}

/// The walker state machine over a decoded directory table. Tracks the
/// cursor, the bytes remaining in the directory's span, and the entries
/// remaining in the current header run.
#[derive(Debug)]
pub(crate) struct DirState {
    cursor: usize,
    remaining: u32,
    entry_count: u32,
    header: DirHeader,
}

impl DirState {
    /// Position at the start of a directory listing. `file_size` is the
    /// inode's stored size; an empty directory stores exactly the virtual
    /// three bytes and yields nothing.
    pub fn new(cursor: usize, file_size: u32) -> Self {
        DirState {
            cursor,
            remaining: file_size.saturating_sub(DIR_VIRTUAL_SIZE),
            entry_count: 0,
            header: DirHeader::default(),
        }
    }

    /// Stop the stream; subsequent calls return end-of-iteration.
    pub fn halt(&mut self) {
        self.remaining = 0;
    }

    /// Advance to the next entry, consuming a follow-up header first when
    /// the current run is exhausted. Malformed residue (a span shorter than
    /// the structure it should hold) terminates the stream.
    pub fn next_entry(&mut self, table: &[u8]) -> Option<(DirHeader, RawDirEntry)> {
        loop {
            if self.remaining == 0 {
                return None;
            }

            if self.entry_count == 0 {
                if self.remaining < DIR_HEADER_SIZE
                    || self.cursor + DIR_HEADER_SIZE as usize > table.len()
                {
                    self.remaining = 0;
                    return None;
                }
                let h = &table[self.cursor..];
                self.header = DirHeader {
                    count: LittleEndian::read_u32(h) + 1,
                    start: LittleEndian::read_u32(&h[4..]),
                    inode_number: LittleEndian::read_u32(&h[8..]),
                };
                self.cursor += DIR_HEADER_SIZE as usize;
                self.remaining -= DIR_HEADER_SIZE;
                self.entry_count = self.header.count;
                continue;
            }

            if self.remaining < DIR_ENTRY_BASE_SIZE
                || self.cursor + DIR_ENTRY_BASE_SIZE as usize > table.len()
            {
                self.remaining = 0;
                return None;
            }
            let e = &table[self.cursor..];
            let offset = LittleEndian::read_u16(e);
            let inode_delta = LittleEndian::read_i16(&e[2..]);
            let type_tag = LittleEndian::read_u16(&e[4..]);
            // name_size stores the length minus one
            let name_len = usize::from(LittleEndian::read_u16(&e[6..])) + 1;

            let entry_size = DIR_ENTRY_BASE_SIZE + name_len as u32;
            if self.remaining < entry_size
                || self.cursor + entry_size as usize > table.len()
            {
                warn!("directory entry crosses table end, stopping iteration");
                self.remaining = 0;
                return None;
            }
            let name_start = self.cursor + DIR_ENTRY_BASE_SIZE as usize;
            let name = table[name_start..name_start + name_len].to_vec();

            self.cursor += entry_size as usize;
            self.remaining -= entry_size;
            self.entry_count -= 1;

            return Some((
                self.header,
                RawDirEntry {
                    offset,
                    inode_delta,
                    type_tag,
                    name,
                },
            ));
        }
    }
}

/// Entry classification reported by [`DirStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    Reg,
    Lnk,
    /// Device nodes, fifos, and sockets: listed but not readable.
    Other,
}

fn kind_of(type_tag: u16) -> EntryKind {
    match InodeType::from(type_tag) {
        InodeType::BasicDir | InodeType::ExtDir => EntryKind::Dir,
        InodeType::BasicFile | InodeType::ExtFile => EntryKind::Reg,
        InodeType::BasicSymlink | InodeType::ExtSymlink => EntryKind::Lnk,
        _ => EntryKind::Other,
    }
}

/// One directory entry as yielded by [`DirStream`]. `size` is the file size
/// for regular entries and zero otherwise.
#[derive(Debug)]
pub struct DirRecord {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    pub(crate) inode_ref: EntryReference,
    inode_number: u32,
}

impl DirRecord {
    /// The entry's inode number, reconstructed from the run header's base
    /// and the entry's signed delta.
    pub fn inode_number(&self) -> u32 {
        self.inode_number
    }
}

/// An open directory stream: owns the decoded inode and directory tables
/// and yields entries until the directory's span is exhausted. Dropping the
/// stream frees both tables.
#[derive(Debug)]
pub struct DirStream {
    pub(crate) tables: Tables,
    state: DirState,
}

impl DirStream {
    pub(crate) fn new(tables: Tables, cursor: usize, file_size: u32) -> Self {
        DirStream {
            tables,
            state: DirState::new(cursor, file_size),
        }
    }

    fn record(&self, header: DirHeader, raw: RawDirEntry) -> Result<DirRecord> {
        let inode_ref = EntryReference::new(u64::from(header.start), raw.offset);
        let inode_number = header.inode_number.wrapping_add_signed(i32::from(raw.inode_delta));
        let kind = kind_of(raw.type_tag);
        // Entries do not distinguish extended from basic regular files, so
        // the size always comes from the inode itself.
        let size = match kind {
            EntryKind::Reg => match self.tables.inode_at(inode_ref)?.info {
                InodeInfo::Reg(info) => info.file_size,
                _ => 0,
            },
            _ => 0,
        };
        Ok(DirRecord {
            name: String::from_utf8_lossy(&raw.name).into_owned(),
            kind,
            size,
            inode_ref,
            inode_number,
        })
    }
}

impl Iterator for DirStream {
    type Item = DirRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let (header, raw) = self.state.next_entry(self.tables.dir.bytes())?;
        match self.record(header, raw) {
            Ok(r) => Some(r),
            Err(e) => {
                warn!(error = %e, "unresolvable directory entry, stopping iteration");
                self.state.halt();
                None
            }
        }
    }
}
