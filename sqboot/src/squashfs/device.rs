use std::io::{Read, Seek, SeekFrom};

use super::error::{Result, SqfsError};

/// A sector-granular backing store. This is the only interface the reader
/// uses to touch the underlying medium; boot environments implement it over
/// their raw block driver, hosts over a seekable image file.
pub trait BlockDevice {
    /// Sector size in bytes, typically 512 or 4096. Must be a power of two.
    fn sector_size(&self) -> u32;

    /// Read `count` whole sectors starting at `sector` into `buf`. `buf` is
    /// at least `count * sector_size()` bytes. A short read is an error.
    fn read_sectors(&mut self, sector: u64, count: u32, buf: &mut [u8]) -> Result<()>;
}

/// A partition on a [`BlockDevice`], in sectors. `sectors == 0` means the
/// extent is unknown and reads are not bounds-checked against it.
#[derive(Debug, Clone, Copy)]
pub struct Partition {
    pub start: u64,
    pub sectors: u64,
}

impl Partition {
    pub fn new(start: u64, sectors: u64) -> Self {
        Self { start, sectors }
    }

    /// The whole device, starting at sector 0.
    pub fn whole() -> Self {
        Self { start: 0, sectors: 0 }
    }
}

/// Read an arbitrary byte range through sector-aligned device reads.
///
/// Returns the sector-aligned buffer covering the range plus the offset of
/// `byte_start` within it.
pub(crate) fn read_range<D: BlockDevice>(
    dev: &mut D,
    part: &Partition,
    byte_start: u64,
    byte_len: u64,
) -> Result<(Vec<u8>, usize)> {
    let sector_size = u64::from(dev.sector_size());
    let sector = byte_start / sector_size;
    let offset = (byte_start % sector_size) as usize;
    let count = (byte_len + offset as u64).div_ceil(sector_size);

    if part.sectors != 0 && sector + count > part.sectors {
        return Err(SqfsError::InvalidArgument("read beyond partition end"));
    }

    let mut buf = vec![0u8; (count * sector_size) as usize];
    dev.read_sectors(part.start + sector, count as u32, &mut buf)?;
    Ok((buf, offset))
}

/// Adapter that presents any seekable byte source (an image file, an
/// in-memory buffer) as a 512-byte-sector block device.
///
/// A read that the source cannot fully satisfy is an I/O error, as the
/// [`BlockDevice`] contract requires. SquashFS images are padded to a
/// device-block multiple by `mksquashfs`, but an image extracted from a
/// larger firmware blob may end short of a sector boundary; call
/// [`pad_short_tail`] to opt into zero-filling the unread tail of the
/// final sector instead of failing.
///
/// [`pad_short_tail`]: StreamDevice::pad_short_tail
#[derive(Debug)]
pub struct StreamDevice<R> {
    inner: R,
    sector_size: u32,
    pad_short_tail: bool,
}

impl<R: Read + Seek> StreamDevice<R> {
    pub fn new(inner: R) -> Self {
        Self::with_sector_size(inner, 512)
    }

    pub fn with_sector_size(inner: R, sector_size: u32) -> Self {
        assert!(sector_size.is_power_of_two());
        Self {
            inner,
            sector_size,
            pad_short_tail: false,
        }
    }

    /// Zero-fill a partially read final sector instead of failing. Only a
    /// read that returns some data is padded; a read past the end of the
    /// source still fails.
    pub fn pad_short_tail(mut self) -> Self {
        self.pad_short_tail = true;
        self
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> BlockDevice for StreamDevice<R> {
    fn sector_size(&self) -> u32 {
        self.sector_size
    }

    fn read_sectors(&mut self, sector: u64, count: u32, buf: &mut [u8]) -> Result<()> {
        let len = count as usize * self.sector_size as usize;
        let want = &mut buf[..len];
        self.inner
            .seek(SeekFrom::Start(sector * u64::from(self.sector_size)))?;

        let mut filled = 0;
        while filled < want.len() {
            let n = self.inner.read(&mut want[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled < want.len() {
            if !self.pad_short_tail || filled == 0 {
                return Err(SqfsError::Io(std::io::Error::from(
                    std::io::ErrorKind::UnexpectedEof,
                )));
            }
            want[filled..].fill(0);
        }
        Ok(())
    }
}
