//! # zipstore
//!
//! Inspect entries of ZIP/APK archives and rewrite an archive so that one
//! chosen entry is stored without compression.
//!
//! Some consumers need a particular entry (an embedded APK, a resource
//! table) to be STORED so it can be read in place. This crate rewrites the
//! archive with that entry uncompressed, written first, with a freshly
//! computed CRC-32, while every other entry keeps its compression method,
//! CRC-32, timestamp, comment and extra field.
//!
//! ## Features
//!
//! - Report size, compressed size and method of a named entry
//! - Re-pack an archive with one entry STORED
//! - Build a one-entry archive from a file, STORED
//! - Support for STORED and DEFLATE compression methods
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use zipstore::{inspect_entry, repack_entry};
//!
//! fn main() -> anyhow::Result<()> {
//!     let report = repack_entry(
//!         Path::new("app.apk"),
//!         "assets/origin.apk",
//!         Path::new("app-stored.apk"),
//!         Path::new("temp_apk"),
//!     )?;
//!     println!("{} stored, crc32 {:08x}", report.entry, report.crc32);
//!
//!     if let Some(entry) = inspect_entry(Path::new("app-stored.apk"), "assets/origin.apk")? {
//!         println!("{entry}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod inspect;
pub mod io;
pub mod repack;
pub mod zip;

pub use cli::{InspectCli, RepackCli, StoreCli};
pub use inspect::{EntryReport, inspect_entry};
pub use io::{LocalFileReader, ReadAt};
pub use repack::{RepackReport, StoredEntry, repack_entry, store_file};
pub use self::zip::{CompressionMethod, ZipExtractor, ZipFileEntry, ZipWriter};
