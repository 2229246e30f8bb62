use super::error::{Result, SqfsError};
use super::superblock::CompressionId;

#[cfg(feature = "gzip")]
use std::io::Read;

#[cfg(feature = "gzip")]
use flate2::read::ZlibDecoder;

#[cfg(feature = "xz")]
use lzma_rs::xz_decompress;

#[cfg(feature = "zstd")]
use ruzstd::decoding::{BlockDecodingStrategy, FrameDecoder};

/// One-shot block decompression. Implementations are selected at probe time
/// from the superblock's compression id; the rest of the reader only ever
/// sees this trait.
pub trait Decompressor {
    /// Decompress all of `src` into `dst`, returning the decoded length.
    /// Output larger than `dst` is an error, not a truncation.
    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize>;
}

/// Select the decoder for a superblock compression id.
pub(crate) fn for_id(id: CompressionId) -> Result<Box<dyn Decompressor>> {
    match id {
        #[cfg(feature = "gzip")]
        CompressionId::Gzip => Ok(Box::new(Zlib)),
        #[cfg(feature = "xz")]
        CompressionId::Xz => Ok(Box::new(Xz)),
        #[cfg(feature = "zstd")]
        CompressionId::Zstd => Ok(Box::new(Zstd)),
        _ => Err(SqfsError::NotSupported("compression codec")),
    }
}

#[cfg(feature = "gzip")]
struct Zlib;

#[cfg(feature = "gzip")]
impl Decompressor for Zlib {
    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        let mut dec = ZlibDecoder::new(src);
        let mut n = 0;
        while n < dst.len() {
            let k = dec
                .read(&mut dst[n..])
                .map_err(|_| SqfsError::InvalidArgument("corrupt zlib block"))?;
            if k == 0 {
                return Ok(n);
            }
            n += k;
        }
        // dst is full; any residue means the block overruns its bound.
        let mut probe = [0u8; 1];
        match dec.read(&mut probe) {
            Ok(0) => Ok(n),
            _ => Err(SqfsError::InvalidArgument("decompressed block too large")),
        }
    }
}

#[cfg(feature = "xz")]
struct Xz;

#[cfg(feature = "xz")]
impl Decompressor for Xz {
    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        let mut out = std::io::Cursor::new(dst);
        xz_decompress(&mut &src[..], &mut out)
            .map_err(|_| SqfsError::InvalidArgument("corrupt xz block"))?;
        Ok(out.position() as usize)
    }
}

#[cfg(feature = "zstd")]
struct Zstd;

#[cfg(feature = "zstd")]
impl Decompressor for Zstd {
    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        use std::io::Read;

        let mut src = src;
        let mut dec = FrameDecoder::new();
        dec.init(&mut src)
            .map_err(|_| SqfsError::InvalidArgument("corrupt zstd block"))?;

        let mut n = 0;
        loop {
            if dec.can_collect() < dst.len() - n && !dec.is_finished() {
                let needed = dst.len() - n - dec.can_collect();
                dec.decode_blocks(&mut src, BlockDecodingStrategy::UptoBytes(needed))
                    .map_err(|_| SqfsError::InvalidArgument("corrupt zstd block"))?;
            }
            let k = dec
                .read(&mut dst[n..])
                .map_err(|_| SqfsError::InvalidArgument("corrupt zstd block"))?;
            n += k;
            if dec.is_finished() && dec.can_collect() == 0 {
                return Ok(n);
            }
            if n == dst.len() {
                return Err(SqfsError::InvalidArgument("decompressed block too large"));
            }
        }
    }
}
