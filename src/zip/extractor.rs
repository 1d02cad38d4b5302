use flate2::read::DeflateDecoder;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use crate::io::{RangeReader, ReadAt};
use anyhow::{Context, Result, bail};

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// Reads entries out of a ZIP archive.
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
    entries: Vec<ZipFileEntry>,
}

impl<R: ReadAt> ZipExtractor<R> {
    /// Parse the central directory of `reader` up front.
    pub fn new(reader: R) -> Result<Self> {
        let parser = ZipParser::new(reader);
        let entries = parser.list_files()?;
        Ok(Self { parser, entries })
    }

    /// All entries in central-directory order.
    pub fn list_files(&self) -> &[ZipFileEntry] {
        &self.entries
    }

    /// Look up an entry by exact, case-sensitive name.
    pub fn find(&self, name: &str) -> Option<&ZipFileEntry> {
        self.entries.iter().find(|e| e.file_name == name)
    }

    /// Open a reader yielding the entry's decompressed bytes.
    pub fn open(&self, entry: &ZipFileEntry) -> Result<Box<dyn Read + '_>> {
        if entry.is_encrypted() {
            bail!("Encrypted entry {} is not supported", entry.file_name);
        }

        let data_offset = self.parser.get_data_offset(entry)?;
        let raw = RangeReader::new(self.parser.reader(), data_offset, entry.compressed_size);

        match entry.compression_method {
            CompressionMethod::Stored => Ok(Box::new(raw)),
            CompressionMethod::Deflate => Ok(Box::new(DeflateDecoder::new(raw))),
            CompressionMethod::Unknown(method) => bail!(
                "Unsupported compression method {} for {} (only STORED and DEFLATE are supported)",
                method,
                entry.file_name
            ),
        }
    }

    /// Extract file to disk, creating parent directories as needed.
    ///
    /// Returns the number of bytes written.
    pub fn extract_to_file(&self, entry: &ZipFileEntry, output_path: &Path) -> Result<u64> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }

        let mut input = self.open(entry)?;
        let file = File::create(output_path)
            .with_context(|| format!("failed to create {}", output_path.display()))?;
        let mut output = BufWriter::new(file);

        let written = io::copy(&mut input, &mut output)
            .with_context(|| format!("failed to extract {}", entry.file_name))?;
        output.flush()?;

        Ok(written)
    }
}
