//! End-to-end reads against synthetic SquashFS images built in memory.
//! The builder below lays out bit-exact superblock, inode table, directory
//! table, fragment table, and data blocks, so every test runs without any
//! external image or tool.
#![cfg(feature = "gzip")]

use std::io::{Cursor, Write};

use anyhow::Result;
use byteorder::{LittleEndian, WriteBytesExt};
use flate2::write::ZlibEncoder;
use flate2::Compression;

use sqboot::squashfs::{EntryKind, Partition, SqfsError, SquashFS, StreamDevice};

const BLOCK_SIZE: u32 = 4096;
const SECTOR: usize = 512;

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// Verbatim metadata chunk: header bit 15 set, low bits the stored length.
fn verbatim_chunk(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u16::<LittleEndian>(0x8000 | payload.len() as u16).unwrap();
    out.extend_from_slice(payload);
    out
}

/// Compressed metadata chunk: header bit 15 clear.
fn compressed_chunk(payload: &[u8]) -> Vec<u8> {
    let packed = zlib(payload);
    assert!(packed.len() < 0x8000);
    let mut out = Vec::new();
    out.write_u16::<LittleEndian>(packed.len() as u16).unwrap();
    out.extend_from_slice(&packed);
    out
}

fn inode_base(out: &mut Vec<u8>, inode_type: u16, number: u32) {
    out.write_u16::<LittleEndian>(inode_type).unwrap();
    out.write_u16::<LittleEndian>(0o755).unwrap(); // mode
    out.write_u16::<LittleEndian>(0).unwrap(); // uid index
    out.write_u16::<LittleEndian>(0).unwrap(); // gid index
    out.write_u32::<LittleEndian>(0).unwrap(); // mtime
    out.write_u32::<LittleEndian>(number).unwrap();
}

fn reg_inode(
    number: u32,
    blocks_start: u32,
    frag_index: u32,
    frag_offset: u32,
    file_size: u32,
    block_sizes: &[u32],
) -> Vec<u8> {
    let mut out = Vec::new();
    inode_base(&mut out, 2, number);
    out.write_u32::<LittleEndian>(blocks_start).unwrap();
    out.write_u32::<LittleEndian>(frag_index).unwrap();
    out.write_u32::<LittleEndian>(frag_offset).unwrap();
    out.write_u32::<LittleEndian>(file_size).unwrap();
    for &s in block_sizes {
        out.write_u32::<LittleEndian>(s).unwrap();
    }
    out
}

fn dir_inode(
    number: u32,
    block_index: u32,
    block_offset: u16,
    listing_len: u32,
    parent: u32,
) -> Vec<u8> {
    let mut out = Vec::new();
    inode_base(&mut out, 1, number);
    out.write_u32::<LittleEndian>(block_index).unwrap();
    out.write_u32::<LittleEndian>(2).unwrap(); // link count
    out.write_u16::<LittleEndian>((listing_len + 3) as u16).unwrap();
    out.write_u16::<LittleEndian>(block_offset).unwrap();
    out.write_u32::<LittleEndian>(parent).unwrap();
    out
}

fn symlink_inode(number: u32, target: &str) -> Vec<u8> {
    let mut out = Vec::new();
    inode_base(&mut out, 3, number);
    out.write_u32::<LittleEndian>(1).unwrap(); // link count
    out.write_u32::<LittleEndian>(target.len() as u32).unwrap();
    out.extend_from_slice(target.as_bytes());
    out
}

fn chardev_inode(number: u32) -> Vec<u8> {
    let mut out = Vec::new();
    inode_base(&mut out, 5, number);
    out.write_u32::<LittleEndian>(1).unwrap(); // link count
    out.write_u32::<LittleEndian>(0x0103).unwrap(); // dev number
    out
}

fn dir_header(out: &mut Vec<u8>, count: u32, start: u32, base_inode: u32) {
    out.write_u32::<LittleEndian>(count - 1).unwrap();
    out.write_u32::<LittleEndian>(start).unwrap();
    out.write_u32::<LittleEndian>(base_inode).unwrap();
}

fn dir_entry(out: &mut Vec<u8>, offset: u16, delta: i16, type_tag: u16, name: &str) {
    out.write_u16::<LittleEndian>(offset).unwrap();
    out.write_i16::<LittleEndian>(delta).unwrap();
    out.write_u16::<LittleEndian>(type_tag).unwrap();
    out.write_u16::<LittleEndian>(name.len() as u16 - 1).unwrap();
    out.extend_from_slice(name.as_bytes());
}

fn write_superblock(
    img: &mut [u8],
    inode_count: u32,
    frag_count: u32,
    root_ref: u64,
    bytes_used: u64,
    id_table: u64,
    inode_table: u64,
    dir_table: u64,
    frag_table: u64,
) {
    let mut sb = Vec::new();
    sb.write_u32::<LittleEndian>(0x73717368).unwrap();
    sb.write_u32::<LittleEndian>(inode_count).unwrap();
    sb.write_u32::<LittleEndian>(0).unwrap(); // mod time
    sb.write_u32::<LittleEndian>(BLOCK_SIZE).unwrap();
    sb.write_u32::<LittleEndian>(frag_count).unwrap();
    sb.write_u16::<LittleEndian>(1).unwrap(); // gzip
    sb.write_u16::<LittleEndian>(12).unwrap(); // block log
    sb.write_u16::<LittleEndian>(0).unwrap(); // flags
    sb.write_u16::<LittleEndian>(1).unwrap(); // id count
    sb.write_u16::<LittleEndian>(4).unwrap();
    sb.write_u16::<LittleEndian>(0).unwrap();
    sb.write_u64::<LittleEndian>(root_ref).unwrap();
    sb.write_u64::<LittleEndian>(bytes_used).unwrap();
    sb.write_u64::<LittleEndian>(id_table).unwrap();
    sb.write_u64::<LittleEndian>(u64::MAX).unwrap(); // xattr table
    sb.write_u64::<LittleEndian>(inode_table).unwrap();
    sb.write_u64::<LittleEndian>(dir_table).unwrap();
    sb.write_u64::<LittleEndian>(frag_table).unwrap();
    sb.write_u64::<LittleEndian>(u64::MAX).unwrap(); // export table
    img[..96].copy_from_slice(&sb);
}

struct Fixture {
    img: Vec<u8>,
    b_txt: Vec<u8>,
    hello: Vec<u8>,
    big: Vec<u8>,
    exact: Vec<u8>,
}

/// The payload from the reference scenario: exactly 42 bytes.
const PAYLOAD: &[u8] = b"Hello, SquashFS. This is a test payload.\n\n";

/// Build an image with this tree (names in stored order):
///
/// ```text
/// /a/            b.txt (42 B, one verbatim data block)
///                up -> ../hello.txt
/// /big.bin       9000 B: two compressed data blocks + 808 B fragment tail
/// /dev0          character device
/// /dirlink -> a
/// /empty/
/// /exact.bin     4096 B: one verbatim data block, no fragment
/// /hello.txt     42 B, fragment only
/// /link -> a/b.txt
/// /loop -> loop2, /loop2 -> loop
/// /zero.txt      0 B
/// ```
///
/// All metadata chunks are verbatim; data blocks and the fragment block mix
/// compressed and verbatim storage.
fn build_main_image() -> Fixture {
    let b_txt = PAYLOAD.to_vec();
    let hello: Vec<u8> = (0..42u32).map(|i| (i * 5 + 1) as u8).collect();
    let big: Vec<u8> = (0..9000u32).map(|i| (i % 251) as u8).collect();
    let exact: Vec<u8> = (0..4096u32).map(|i| (i * 3) as u8).collect();

    let mut img = vec![0u8; 96];

    // Data region: big.bin's two full blocks (compressed), exact.bin's and
    // b.txt's verbatim blocks, then the shared fragment block.
    let big_start = img.len() as u32;
    let big_blk0 = zlib(&big[..4096]);
    let big_blk1 = zlib(&big[4096..8192]);
    let big_sizes = [big_blk0.len() as u32, big_blk1.len() as u32];
    img.extend_from_slice(&big_blk0);
    img.extend_from_slice(&big_blk1);

    let exact_start = img.len() as u32;
    img.extend_from_slice(&exact);

    let b_start = img.len() as u32;
    img.extend_from_slice(&b_txt);

    let frag_block_start = img.len() as u64;
    let mut frag_data = hello.clone();
    frag_data.extend_from_slice(&big[8192..]);
    let frag_packed = zlib(&frag_data);
    let frag_stored = frag_packed.len() as u32; // bit 24 clear: compressed
    img.extend_from_slice(&frag_packed);

    // Inode record sizes fix every record's offset before the records
    // themselves are emitted; directory listings need those offsets.
    // Order: b.txt, up, a, big.bin, dev0, dirlink, empty, exact.bin,
    // hello.txt, link, loop, loop2, zero.txt, root.
    let isizes = [36, 36, 32, 40, 24, 25, 32, 36, 32, 31, 29, 28, 32, 32];
    let mut ioff = [0u16; 14];
    let mut acc = 0u16;
    for (i, s) in isizes.iter().enumerate() {
        ioff[i] = acc;
        acc += s;
    }

    // Directory listings. Header `start` is the source offset of the inode
    // chunk (single chunk, so 0); entry offsets index into it.
    let mut a_listing = Vec::new();
    dir_header(&mut a_listing, 2, 0, 1);
    dir_entry(&mut a_listing, ioff[0], 0, 2, "b.txt");
    dir_entry(&mut a_listing, ioff[1], 1, 3, "up");

    let mut root_listing = Vec::new();
    dir_header(&mut root_listing, 11, 0, 3);
    let root_entries: [(usize, u16, &str); 11] = [
        (2, 1, "a"),
        (3, 2, "big.bin"),
        (4, 5, "dev0"),
        (5, 3, "dirlink"),
        (6, 1, "empty"),
        (7, 2, "exact.bin"),
        (8, 2, "hello.txt"),
        (9, 3, "link"),
        (10, 3, "loop"),
        (11, 3, "loop2"),
        (12, 2, "zero.txt"),
    ];
    for (i, (idx, tag, name)) in root_entries.iter().enumerate() {
        dir_entry(&mut root_listing, ioff[*idx], i as i16, *tag, name);
    }

    let a_len = a_listing.len() as u32;
    let root_len = root_listing.len() as u32;
    let mut dir_stream = a_listing;
    dir_stream.extend_from_slice(&root_listing);

    // Inode records, in the fixed order above.
    let records = [
        reg_inode(1, b_start, u32::MAX, 0, 42, &[0x0100_0000 | 42]),
        symlink_inode(2, "../hello.txt"),
        dir_inode(3, 0, 0, a_len, 14),
        reg_inode(4, big_start, 0, 42, 9000, &big_sizes),
        chardev_inode(5),
        symlink_inode(6, "a"),
        dir_inode(7, 0, 0, 0, 14),
        reg_inode(8, exact_start, u32::MAX, 0, 4096, &[0x0100_0000 | 4096]),
        reg_inode(9, 0, 0, 0, 42, &[]),
        symlink_inode(10, "a/b.txt"),
        symlink_inode(11, "loop2"),
        symlink_inode(12, "loop"),
        reg_inode(13, 0, u32::MAX, 0, 0, &[]),
        dir_inode(14, 0, a_len as u16, root_len, 15),
    ];
    let mut inode_stream = Vec::new();
    for (i, r) in records.iter().enumerate() {
        assert_eq!(r.len(), isizes[i] as usize, "inode record {i} size");
        inode_stream.extend_from_slice(r);
    }

    let inode_table = img.len() as u64;
    img.extend(verbatim_chunk(&inode_stream));

    let dir_table = img.len() as u64;
    img.extend(verbatim_chunk(&dir_stream));

    // Fragment entry chunk precedes the fragment index, exactly as
    // mksquashfs lays it out; the anchor points at the index.
    let frag_chunk_start = img.len() as u64;
    let mut frag_entry = Vec::new();
    frag_entry.write_u64::<LittleEndian>(frag_block_start).unwrap();
    frag_entry.write_u32::<LittleEndian>(frag_stored).unwrap();
    frag_entry.write_u32::<LittleEndian>(0).unwrap();
    img.extend(verbatim_chunk(&frag_entry));

    let frag_table = img.len() as u64;
    img.write_u64::<LittleEndian>(frag_chunk_start).unwrap();

    let id_table = img.len() as u64;
    let bytes_used = img.len() as u64;
    img.resize(img.len().next_multiple_of(SECTOR), 0);

    let root_ref = u64::from(ioff[13]);
    write_superblock(
        &mut img, 14, 1, root_ref, bytes_used, id_table, inode_table, dir_table, frag_table,
    );

    Fixture {
        img,
        b_txt,
        hello,
        big,
        exact,
    }
}

fn mount(img: Vec<u8>) -> Result<SquashFS<StreamDevice<Cursor<Vec<u8>>>>> {
    let dev = StreamDevice::new(Cursor::new(img));
    Ok(SquashFS::probe(dev, Partition::whole())?)
}

fn read_all(sqfs: &mut SquashFS<StreamDevice<Cursor<Vec<u8>>>>, path: &str) -> Result<Vec<u8>> {
    let size = sqfs.size(path)?;
    let mut buf = vec![0u8; size as usize];
    let n = sqfs.read(path, &mut buf, 0, 0)?;
    assert_eq!(n, size);
    Ok(buf)
}

#[test]
fn enumerates_root_in_stored_order() -> Result<()> {
    let fx = build_main_image();
    let mut sqfs = mount(fx.img)?;

    let entries: Vec<_> = sqfs.open_dir("/")?.collect();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "a", "big.bin", "dev0", "dirlink", "empty", "exact.bin", "hello.txt", "link",
            "loop", "loop2", "zero.txt"
        ]
    );

    let kinds: Vec<EntryKind> = entries.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        [
            EntryKind::Dir,
            EntryKind::Reg,
            EntryKind::Other,
            EntryKind::Lnk,
            EntryKind::Dir,
            EntryKind::Reg,
            EntryKind::Reg,
            EntryKind::Lnk,
            EntryKind::Lnk,
            EntryKind::Lnk,
            EntryKind::Reg,
        ]
    );

    // Regular entries report their file size, others report zero.
    assert_eq!(entries[1].size, 9000);
    assert_eq!(entries[5].size, 4096);
    assert_eq!(entries[6].size, 42);
    assert_eq!(entries[10].size, 0);
    assert_eq!(entries[0].size, 0);
    Ok(())
}

#[test]
fn empty_directory_yields_no_entries() -> Result<()> {
    let fx = build_main_image();
    let mut sqfs = mount(fx.img)?;
    assert_eq!(sqfs.open_dir("/empty")?.count(), 0);
    Ok(())
}

#[test]
fn subdirectory_enumeration() -> Result<()> {
    let fx = build_main_image();
    let mut sqfs = mount(fx.img)?;
    let names: Vec<String> = sqfs.open_dir("/a")?.map(|e| e.name).collect();
    assert_eq!(names, ["b.txt", "up"]);
    Ok(())
}

#[test]
fn reads_single_block_file() -> Result<()> {
    let fx = build_main_image();
    let mut sqfs = mount(fx.img)?;
    assert_eq!(sqfs.size("/a/b.txt")?, 42);
    assert_eq!(read_all(&mut sqfs, "/a/b.txt")?, fx.b_txt);
    Ok(())
}

#[test]
fn reads_fragment_only_file() -> Result<()> {
    let fx = build_main_image();
    let mut sqfs = mount(fx.img)?;
    assert_eq!(read_all(&mut sqfs, "/hello.txt")?, fx.hello);
    Ok(())
}

#[test]
fn reads_blocks_plus_fragment_tail() -> Result<()> {
    let fx = build_main_image();
    let mut sqfs = mount(fx.img)?;
    assert_eq!(sqfs.size("/big.bin")?, 9000);
    assert_eq!(read_all(&mut sqfs, "/big.bin")?, fx.big);
    Ok(())
}

#[test]
fn reads_exact_block_file_without_fragment() -> Result<()> {
    let fx = build_main_image();
    let mut sqfs = mount(fx.img)?;
    assert_eq!(read_all(&mut sqfs, "/exact.bin")?, fx.exact);
    Ok(())
}

#[test]
fn zero_length_file_reads_empty() -> Result<()> {
    let fx = build_main_image();
    let mut sqfs = mount(fx.img)?;
    assert_eq!(sqfs.size("/zero.txt")?, 0);
    let mut buf = [0u8; 8];
    assert_eq!(sqfs.read("/zero.txt", &mut buf, 0, 0)?, 0);
    Ok(())
}

#[test]
fn truncated_read_returns_prefix() -> Result<()> {
    let fx = build_main_image();
    let mut sqfs = mount(fx.img)?;

    let mut buf = vec![0u8; 100];
    assert_eq!(sqfs.read("/big.bin", &mut buf, 0, 100)?, 100);
    assert_eq!(&buf, &fx.big[..100]);

    // A length reaching into the fragment tail.
    let mut buf = vec![0u8; 8500];
    assert_eq!(sqfs.read("/big.bin", &mut buf, 0, 8500)?, 8500);
    assert_eq!(&buf, &fx.big[..8500]);
    Ok(())
}

#[test]
fn oversized_length_is_rejected() -> Result<()> {
    let fx = build_main_image();
    let mut sqfs = mount(fx.img)?;
    let mut buf = vec![0u8; 10000];
    assert!(matches!(
        sqfs.read("/big.bin", &mut buf, 0, 9001),
        Err(SqfsError::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn read_honours_destination_offset() -> Result<()> {
    let fx = build_main_image();
    let mut sqfs = mount(fx.img)?;
    let mut buf = vec![0xEEu8; 60];
    assert_eq!(sqfs.read("/a/b.txt", &mut buf, 10, 0)?, 42);
    assert_eq!(&buf[..10], &[0xEE; 10]);
    assert_eq!(&buf[10..52], &fx.b_txt[..]);
    assert_eq!(&buf[52..], &[0xEE; 8]);
    Ok(())
}

#[test]
fn symlink_matches_target() -> Result<()> {
    let fx = build_main_image();
    let mut sqfs = mount(fx.img)?;
    assert_eq!(sqfs.size("/link")?, sqfs.size("/a/b.txt")?);
    assert_eq!(read_all(&mut sqfs, "/link")?, fx.b_txt);
    Ok(())
}

#[test]
fn updir_crosses_symlink_directory() -> Result<()> {
    let fx = build_main_image();
    let mut sqfs = mount(fx.img)?;
    // /a/up -> ../hello.txt
    assert_eq!(read_all(&mut sqfs, "/a/up")?, fx.hello);
    Ok(())
}

#[test]
fn directory_symlink_opens_target() -> Result<()> {
    let fx = build_main_image();
    let mut sqfs = mount(fx.img)?;
    let names: Vec<String> = sqfs.open_dir("/dirlink")?.map(|e| e.name).collect();
    assert_eq!(names, ["b.txt", "up"]);
    assert_eq!(read_all(&mut sqfs, "/dirlink/b.txt")?, fx.b_txt);
    Ok(())
}

#[test]
fn symlink_cycle_is_detected() -> Result<()> {
    let fx = build_main_image();
    let mut sqfs = mount(fx.img)?;
    let mut buf = [0u8; 16];
    assert!(matches!(
        sqfs.read("/loop", &mut buf, 0, 0),
        Err(SqfsError::LoopDetected)
    ));
    assert!(matches!(sqfs.size("/loop"), Err(SqfsError::LoopDetected)));
    Ok(())
}

#[test]
fn device_node_is_not_readable() -> Result<()> {
    let fx = build_main_image();
    let mut sqfs = mount(fx.img)?;
    let mut buf = [0u8; 16];
    assert!(matches!(
        sqfs.read("/dev0", &mut buf, 0, 0),
        Err(SqfsError::NotSupported(_))
    ));
    Ok(())
}

#[test]
fn missing_path_reports_not_found() -> Result<()> {
    let fx = build_main_image();
    let mut sqfs = mount(fx.img)?;
    let mut buf = [0u8; 16];
    assert!(matches!(
        sqfs.read("/missing", &mut buf, 0, 0),
        Err(SqfsError::NotFound(_))
    ));
    assert!(matches!(
        sqfs.open_dir("/a/nope"),
        Err(SqfsError::NotFound(_))
    ));
    Ok(())
}

#[test]
fn file_as_directory_reports_not_a_directory() -> Result<()> {
    let fx = build_main_image();
    let mut sqfs = mount(fx.img)?;
    assert!(matches!(
        sqfs.open_dir("/a/b.txt"),
        Err(SqfsError::NotADirectory(_))
    ));
    assert!(matches!(
        sqfs.size("/a/b.txt/deeper"),
        Err(SqfsError::NotADirectory(_))
    ));
    Ok(())
}

#[test]
fn dot_and_updir_components_resolve() -> Result<()> {
    let fx = build_main_image();
    let mut sqfs = mount(fx.img)?;
    assert_eq!(read_all(&mut sqfs, "/a/./b.txt")?, fx.b_txt);
    assert_eq!(read_all(&mut sqfs, "/a/../hello.txt")?, fx.hello);
    // dot-dot at the root stays at the root
    assert_eq!(read_all(&mut sqfs, "/../hello.txt")?, fx.hello);
    Ok(())
}

#[test]
fn probe_rejects_corrupt_superblock() {
    let fx = build_main_image();
    let mut img = fx.img;
    img[0] ^= 0xFF;
    let dev = StreamDevice::new(Cursor::new(img));
    assert!(matches!(
        SquashFS::probe(dev, Partition::whole()),
        Err(SqfsError::InvalidArgument(_))
    ));
}

#[test]
fn probes_at_partition_offset() -> Result<()> {
    let fx = build_main_image();
    // Embed the filesystem four sectors into a larger blob.
    let mut blob = vec![0xA5u8; 4 * SECTOR];
    blob.extend_from_slice(&fx.img);
    let sectors = (blob.len() / SECTOR) as u64;

    let dev = StreamDevice::new(Cursor::new(blob));
    let mut sqfs = SquashFS::probe(dev, Partition::new(4, sectors - 4))?;
    assert_eq!(read_all(&mut sqfs, "/big.bin")?, fx.big);
    Ok(())
}

/// Build an image holding 300 zero-length files `f000`..`f299`. The inode
/// table mixes a compressed chunk with a verbatim one: the first 256
/// records fill the first chunk to exactly 8 KiB (compressed), the rest
/// plus the root directory inode follow verbatim. The root listing spans
/// two header runs, one per inode chunk.
fn build_mixed_chunk_image() -> Vec<u8> {
    let mut img = vec![0u8; 96];

    let mut chunk0 = Vec::new();
    for i in 0..256u32 {
        chunk0.extend(reg_inode(i + 1, 0, u32::MAX, 0, 0, &[]));
    }
    assert_eq!(chunk0.len(), 8192);

    let mut chunk1 = Vec::new();
    for i in 256..300u32 {
        chunk1.extend(reg_inode(i + 1, 0, u32::MAX, 0, 0, &[]));
    }
    let root_offset = chunk1.len() as u16;

    let inode_table = img.len() as u64;
    let packed0 = compressed_chunk(&chunk0);
    let chunk1_start = packed0.len() as u64;

    let mut root_listing = Vec::new();
    dir_header(&mut root_listing, 256, 0, 1);
    for i in 0..256u16 {
        dir_entry(&mut root_listing, i * 32, i as i16, 2, &format!("f{i:03}"));
    }
    dir_header(&mut root_listing, 44, chunk1_start as u32, 257);
    for i in 0..44u16 {
        dir_entry(&mut root_listing, i * 32, i as i16, 2, &format!("f{:03}", 256 + i));
    }
    chunk1.extend(dir_inode(301, 0, 0, root_listing.len() as u32, 302));

    img.extend(packed0);
    img.extend(verbatim_chunk(&chunk1));

    let dir_table = img.len() as u64;
    img.extend(verbatim_chunk(&root_listing));

    let id_table = img.len() as u64;
    let bytes_used = img.len() as u64;
    img.resize(img.len().next_multiple_of(SECTOR), 0);

    let root_ref = (chunk1_start << 16) | u64::from(root_offset);
    write_superblock(
        &mut img, 301, 0, root_ref, bytes_used, id_table, inode_table, dir_table, u64::MAX,
    );
    img
}

#[test]
fn mixed_metadata_chunks_and_multiple_header_runs() -> Result<()> {
    let mut sqfs = mount(build_mixed_chunk_image())?;

    let entries: Vec<_> = sqfs.open_dir("/")?.collect();
    assert_eq!(entries.len(), 300);
    for (i, e) in entries.iter().enumerate() {
        assert_eq!(e.name, format!("f{i:03}"));
        assert_eq!(e.kind, EntryKind::Reg);
        assert_eq!(e.size, 0);
        assert_eq!(e.inode_number(), i as u32 + 1);
    }

    // Inodes on both sides of the chunk boundary resolve.
    assert_eq!(sqfs.size("/f042")?, 0);
    assert_eq!(sqfs.size("/f299")?, 0);
    let mut buf = [0u8; 4];
    assert_eq!(sqfs.read("/f042", &mut buf, 0, 0)?, 0);
    // Any nonzero length exceeds a zero-length file.
    assert!(matches!(
        sqfs.read("/f042", &mut buf, 0, 1),
        Err(SqfsError::InvalidArgument(_))
    ));
    Ok(())
}
