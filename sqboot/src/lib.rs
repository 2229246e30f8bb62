//! Sqboot is a read-only SquashFS reader for sector-granular block
//! devices. It is built for firmware-stage boot loaders and embedded
//! runtimes that fetch kernels, device trees, and payloads from compressed
//! read-only images, so the API is a small set of synchronous calls and
//! every operation owns exactly the buffers it allocates.
//!
//! # Usage Example
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use sqboot::squashfs::{Partition, SquashFS, StreamDevice};
//!
//! fn print_payload() -> sqboot::squashfs::Result<()> {
//!     // Probe the image through the stream adapter
//!     let dev = StreamDevice::new(BufReader::new(File::open("rootfs.squashfs").unwrap()));
//!     let mut sqfs = SquashFS::probe(dev, Partition::whole())?;
//!
//!     // List the contents of a directory
//!     for entry in sqfs.open_dir("/boot")? {
//!         println!("{}", entry.name);
//!     }
//!
//!     // Read a file into a caller-owned buffer
//!     let size = sqfs.size("/boot/kernel")?;
//!     let mut buf = vec![0u8; size as usize];
//!     let n = sqfs.read("/boot/kernel", &mut buf, 0, 0)?;
//!     assert_eq!(n, size);
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//! Sqboot uses feature flags to select compression codecs for inclusion:
//! - **gzip** - zlib-compressed images via flate2 (default)
//! - **xz** - XZ-compressed images via lzma-rs (default)
//! - **zstd** - ZSTD-compressed images via ruzstd (default)
//!
//! Images using a codec that was not compiled in fail to probe with
//! [`SqfsError::NotSupported`].
//!
//! [`SqfsError::NotSupported`]: squashfs::SqfsError::NotSupported

pub mod squashfs;
