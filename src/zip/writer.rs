//! ZIP archive writer.
//!
//! Entries are written one at a time: a local file header with placeholder
//! checksum and sizes, then the (optionally deflated) data, then the header
//! is patched in place once CRC-32 and sizes are known. The central
//! directory and EOCD are emitted by [`ZipWriter::finish`].
//!
//! The writer never trusts caller-supplied checksums or sizes. Values
//! declared in [`EntryOptions`] are checked against what was actually
//! written and a mismatch fails the entry.

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::collections::HashSet;
use std::io::{self, Read, Seek, SeekFrom, Write};

use anyhow::{Context, Result, bail};

use super::structures::*;

/// "Version made by": MS-DOS attribute compatibility, APPNOTE 2.0.
const VERSION_MADE_BY: u16 = 20;

/// Describes one entry to be written.
#[derive(Debug, Clone)]
pub struct EntryOptions {
    pub name: String,
    pub method: CompressionMethod,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    /// Expected CRC-32 of the uncompressed data, if known.
    pub crc32: Option<u32>,
    /// Expected uncompressed size, if known.
    pub uncompressed_size: Option<u64>,
    /// Expected compressed size, if known. Only meaningful for stored
    /// entries, where it must equal the uncompressed size.
    pub compressed_size: Option<u64>,
    pub extra_field: Vec<u8>,
    pub comment: Vec<u8>,
}

impl EntryOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: CompressionMethod::Deflate,
            last_mod_time: 0,
            last_mod_date: DOS_EPOCH_DATE,
            crc32: None,
            uncompressed_size: None,
            compressed_size: None,
            extra_field: Vec::new(),
            comment: Vec::new(),
        }
    }

    /// A stored entry with its checksum and size declared up front.
    pub fn stored(name: impl Into<String>, crc32: u32, size: u64) -> Self {
        Self::new(name).into_stored(crc32, size)
    }

    /// Switch to STORED, declaring checksum and size. Name, timestamp,
    /// comment and extra field are kept.
    pub fn into_stored(self, crc32: u32, size: u64) -> Self {
        Self {
            method: CompressionMethod::Stored,
            crc32: Some(crc32),
            uncompressed_size: Some(size),
            compressed_size: Some(size),
            ..self
        }
    }

    /// Descriptor for re-encoding an existing entry.
    ///
    /// Method, uncompressed size, CRC, timestamp, comment and extra field
    /// carry over. The compressed size does not: it is re-derived from the
    /// newly written data.
    pub fn copy_of(entry: &ZipFileEntry) -> Self {
        Self {
            name: entry.file_name.clone(),
            method: entry.compression_method,
            last_mod_time: entry.last_mod_time,
            last_mod_date: entry.last_mod_date,
            crc32: Some(entry.crc32),
            uncompressed_size: Some(entry.uncompressed_size),
            compressed_size: None,
            extra_field: entry.extra_field.clone(),
            comment: entry.comment.clone(),
        }
    }

    pub fn with_mod_time(mut self, (time, date): (u16, u16)) -> Self {
        self.last_mod_time = time;
        self.last_mod_date = date;
        self
    }

    fn flags(&self) -> u16 {
        if self.name.is_ascii() { 0 } else { FLAG_UTF8 }
    }
}

/// What ended up in the archive for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrittenEntry {
    pub method: CompressionMethod,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
}

struct CentralRecord {
    options: EntryOptions,
    written: WrittenEntry,
    lfh_offset: u32,
}

/// Writes a ZIP archive to a seekable sink.
pub struct ZipWriter<W: Write + Seek> {
    inner: W,
    records: Vec<CentralRecord>,
    names: HashSet<String>,
}

impl<W: Write + Seek> ZipWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            records: Vec::new(),
            names: HashSet::new(),
        }
    }

    /// Write one entry whose uncompressed content is read from `data`.
    ///
    /// # Errors
    ///
    /// Fails on duplicate names, unsupported methods, sizes that need
    /// ZIP64, I/O errors, and any mismatch between declared and actual
    /// CRC-32 or sizes.
    pub fn write_entry<R: Read + ?Sized>(
        &mut self,
        options: EntryOptions,
        data: &mut R,
    ) -> Result<WrittenEntry> {
        if let CompressionMethod::Unknown(method) = options.method {
            bail!(
                "Cannot write {} with unsupported compression method {}",
                options.name,
                method
            );
        }
        if self.names.contains(&options.name) {
            bail!("Duplicate entry: {}", options.name);
        }
        if options.name.len() > u16::MAX as usize
            || options.extra_field.len() > u16::MAX as usize
            || options.comment.len() > u16::MAX as usize
        {
            bail!("Name, extra field or comment of {} is too long", options.name);
        }

        let lfh_offset = self.inner.stream_position()?;
        let lfh_offset = u32::try_from(lfh_offset)
            .with_context(|| format!("{} would need a ZIP64 offset", options.name))?;

        self.write_local_header(&options)?;

        let data_start = self.inner.stream_position()?;
        let (crc32, uncompressed_size) = match options.method {
            CompressionMethod::Stored => {
                let mut sink = Checksummed::new(&mut self.inner);
                io::copy(data, &mut sink)
                    .with_context(|| format!("failed to write {}", options.name))?;
                sink.finish()
            }
            _ => {
                let mut encoder = DeflateEncoder::new(&mut self.inner, Compression::default());
                let mut sink = Checksummed::new(&mut encoder);
                io::copy(data, &mut sink)
                    .with_context(|| format!("failed to write {}", options.name))?;
                let result = sink.finish();
                encoder.finish()?;
                result
            }
        };
        let data_end = self.inner.stream_position()?;
        let compressed_size = data_end - data_start;

        if uncompressed_size > u32::MAX as u64 || compressed_size > u32::MAX as u64 {
            bail!("{} is too large without ZIP64", options.name);
        }

        let written = WrittenEntry {
            method: options.method,
            crc32,
            compressed_size,
            uncompressed_size,
        };
        verify_declared(&options, &written)?;

        // Patch CRC-32 and sizes into the local header.
        self.inner
            .seek(SeekFrom::Start(lfh_offset as u64 + LFH_CRC_OFFSET))?;
        self.inner.write_u32::<LittleEndian>(crc32)?;
        self.inner.write_u32::<LittleEndian>(compressed_size as u32)?;
        self.inner.write_u32::<LittleEndian>(uncompressed_size as u32)?;
        self.inner.seek(SeekFrom::Start(data_end))?;

        self.names.insert(options.name.clone());
        self.records.push(CentralRecord {
            options,
            written,
            lfh_offset,
        });

        Ok(written)
    }

    fn write_local_header(&mut self, options: &EntryOptions) -> Result<()> {
        let w = &mut self.inner;
        w.write_all(LFH_SIGNATURE)?;
        w.write_u16::<LittleEndian>(options.method.version_needed())?;
        w.write_u16::<LittleEndian>(options.flags())?;
        w.write_u16::<LittleEndian>(options.method.as_u16())?;
        w.write_u16::<LittleEndian>(options.last_mod_time)?;
        w.write_u16::<LittleEndian>(options.last_mod_date)?;
        // CRC-32, compressed and uncompressed size are patched afterwards.
        w.write_u32::<LittleEndian>(0)?;
        w.write_u32::<LittleEndian>(0)?;
        w.write_u32::<LittleEndian>(0)?;
        w.write_u16::<LittleEndian>(options.name.len() as u16)?;
        w.write_u16::<LittleEndian>(options.extra_field.len() as u16)?;
        w.write_all(options.name.as_bytes())?;
        w.write_all(&options.extra_field)?;
        Ok(())
    }

    /// Write the central directory and EOCD, flush, and hand back the sink.
    pub fn finish(mut self) -> Result<W> {
        let cd_start = self.inner.stream_position()?;

        for record in &self.records {
            let w = &mut self.inner;
            let options = &record.options;
            w.write_all(CDFH_SIGNATURE)?;
            w.write_u16::<LittleEndian>(VERSION_MADE_BY)?;
            w.write_u16::<LittleEndian>(options.method.version_needed())?;
            w.write_u16::<LittleEndian>(options.flags())?;
            w.write_u16::<LittleEndian>(options.method.as_u16())?;
            w.write_u16::<LittleEndian>(options.last_mod_time)?;
            w.write_u16::<LittleEndian>(options.last_mod_date)?;
            w.write_u32::<LittleEndian>(record.written.crc32)?;
            w.write_u32::<LittleEndian>(record.written.compressed_size as u32)?;
            w.write_u32::<LittleEndian>(record.written.uncompressed_size as u32)?;
            w.write_u16::<LittleEndian>(options.name.len() as u16)?;
            w.write_u16::<LittleEndian>(options.extra_field.len() as u16)?;
            w.write_u16::<LittleEndian>(options.comment.len() as u16)?;
            w.write_u16::<LittleEndian>(0)?; // disk number start
            w.write_u16::<LittleEndian>(0)?; // internal attributes
            w.write_u32::<LittleEndian>(0)?; // external attributes
            w.write_u32::<LittleEndian>(record.lfh_offset)?;
            w.write_all(options.name.as_bytes())?;
            w.write_all(&options.extra_field)?;
            w.write_all(&options.comment)?;
        }

        let cd_end = self.inner.stream_position()?;
        let total_entries = u16::try_from(self.records.len())
            .ok()
            .filter(|&n| n != u16::MAX)
            .context("too many entries without ZIP64")?;
        let cd_offset = u32::try_from(cd_start)
            .ok()
            .filter(|&n| n != u32::MAX)
            .context("central directory offset needs ZIP64")?;
        let cd_size = (cd_end - cd_start) as u32;

        let w = &mut self.inner;
        w.write_all(EndOfCentralDirectory::SIGNATURE)?;
        w.write_u16::<LittleEndian>(0)?; // this disk
        w.write_u16::<LittleEndian>(0)?; // disk with central directory
        w.write_u16::<LittleEndian>(total_entries)?;
        w.write_u16::<LittleEndian>(total_entries)?;
        w.write_u32::<LittleEndian>(cd_size)?;
        w.write_u32::<LittleEndian>(cd_offset)?;
        w.write_u16::<LittleEndian>(0)?; // comment length
        w.flush()?;

        Ok(self.inner)
    }
}

fn verify_declared(options: &EntryOptions, written: &WrittenEntry) -> Result<()> {
    if let Some(expected) = options.crc32 {
        if expected != written.crc32 {
            bail!(
                "Invalid entry CRC-32 for {} (expected 0x{:08x} but got 0x{:08x})",
                options.name,
                expected,
                written.crc32
            );
        }
    }
    if let Some(expected) = options.uncompressed_size {
        if expected != written.uncompressed_size {
            bail!(
                "Invalid entry size for {} (expected {} but got {} bytes)",
                options.name,
                expected,
                written.uncompressed_size
            );
        }
    }
    if options.method == CompressionMethod::Stored {
        if let Some(expected) = options.compressed_size {
            if expected != written.compressed_size {
                bail!(
                    "Invalid entry compressed size for {} (expected {} but got {} bytes)",
                    options.name,
                    expected,
                    written.compressed_size
                );
            }
        }
    }
    Ok(())
}

/// Pass-through writer that tracks CRC-32 and length of what goes through it.
struct Checksummed<W: Write> {
    inner: W,
    hasher: crc32fast::Hasher,
    len: u64,
}

impl<W: Write> Checksummed<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: crc32fast::Hasher::new(),
            len: 0,
        }
    }

    fn finish(self) -> (u32, u64) {
        (self.hasher.finalize(), self.len)
    }
}

impl<W: Write> Write for Checksummed<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.len += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
