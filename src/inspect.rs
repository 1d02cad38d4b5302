//! Entry inspection: report size and compression method of one entry.

use anyhow::Result;
use std::fmt;
use std::path::Path;

use crate::io::LocalFileReader;
use crate::zip::{CompressionMethod, ZipExtractor, ZipFileEntry};

/// Archive inspected when no path is given on the command line.
pub const DEFAULT_ARCHIVE: &str = "app-debug-2.apk";

/// Entry inspected when no entry name is given on the command line.
pub const DEFAULT_ENTRY: &str = "assets/origin817.apk";

/// Metadata of a single archive entry, formatted for the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
    pub name: String,
    pub size: u64,
    pub compressed_size: u64,
    pub method: CompressionMethod,
    /// DOS modification stamp as `(year, month, day)` and `(hour, minute, second)`.
    pub modified: ((u16, u8, u8), (u8, u8, u8)),
}

impl EntryReport {
    pub fn is_stored(&self) -> bool {
        self.method == CompressionMethod::Stored
    }

    pub fn is_deflated(&self) -> bool {
        self.method == CompressionMethod::Deflate
    }
}

impl From<&ZipFileEntry> for EntryReport {
    fn from(entry: &ZipFileEntry) -> Self {
        Self {
            name: entry.file_name.clone(),
            size: entry.uncompressed_size,
            compressed_size: entry.compressed_size,
            method: entry.compression_method,
            modified: (entry.mod_date(), entry.mod_time()),
        }
    }
}

impl fmt::Display for EntryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Entry: {}", self.name)?;
        writeln!(f, "Size: {} bytes", self.size)?;
        writeln!(f, "Compressed Size: {} bytes", self.compressed_size)?;
        writeln!(f, "Method: {}", self.method)?;
        writeln!(f, "Is STORED: {}", self.is_stored())?;
        writeln!(f, "Is DEFLATED: {}", self.is_deflated())?;
        let ((year, month, day), (hour, minute, second)) = self.modified;
        write!(
            f,
            "Modified: {:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            year, month, day, hour, minute, second
        )
    }
}

/// Look up `entry_name` in the archive at `archive_path`.
///
/// Returns `Ok(None)` when the archive has no entry with exactly that name.
/// The archive is only read.
pub fn inspect_entry(archive_path: &Path, entry_name: &str) -> Result<Option<EntryReport>> {
    let reader = LocalFileReader::new(archive_path)?;
    let extractor = ZipExtractor::new(reader)?;
    Ok(extractor.find(entry_name).map(EntryReport::from))
}
