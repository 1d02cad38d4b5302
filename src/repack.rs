//! Rewriting archives so that one entry is STORED.
//!
//! [`repack_entry`] extracts the target entry into a scratch work
//! directory, measures it, writes it first into a new archive without
//! compression, then copies every other entry through with its original
//! method, CRC-32, timestamp, comment and extra field. The work directory
//! is removed on every exit path.
//!
//! [`store_file`] builds a one-entry archive from a file on disk using the
//! same stored-entry path.

use anyhow::{Context, Result, bail};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};

use crate::io::LocalFileReader;
use crate::zip::{EntryOptions, WrittenEntry, ZipExtractor, ZipWriter, dos_datetime};

/// Work directory used by the command-line tool, relative to the current
/// directory.
pub const DEFAULT_WORK_DIR: &str = "temp_apk";

/// Outcome of a successful [`repack_entry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepackReport {
    pub entry: String,
    pub size: u64,
    pub crc32: u32,
    /// Entries copied through besides the target.
    pub copied: usize,
}

/// Outcome of writing a single stored entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub entry: String,
    pub size: u64,
    pub crc32: u32,
}

/// Scratch directory removed recursively when dropped.
///
/// Creation refuses to reuse an existing directory, so removal never
/// touches data this process did not create.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        fs::create_dir(&path)
            .with_context(|| format!("failed to create work directory {}", path.display()))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            eprintln!(
                "warning: failed to remove work directory {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

/// Map an entry name to a path below `root`, keeping only normal
/// components so names like `../x` cannot escape it.
fn entry_path(root: &Path, entry_name: &str) -> Result<PathBuf> {
    let mut path = root.to_path_buf();
    let mut pushed = false;
    for component in Path::new(entry_name).components() {
        if let Component::Normal(part) = component {
            path.push(part);
            pushed = true;
        }
    }
    if !pushed {
        bail!("Entry name {:?} has no usable path component", entry_name);
    }
    Ok(path)
}

/// CRC-32 and length of a file on disk.
fn checksum_file(path: &Path) -> Result<(u32, u64)> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = [0u8; 64 * 1024];
    let mut len = 0u64;
    loop {
        let n = reader
            .read(&mut buf)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        len += n as u64;
    }
    Ok((hasher.finalize(), len))
}

/// Measure `source` and write it to `zip` as a STORED entry described by
/// `options`, whose method, sizes and CRC are replaced by measured values.
fn write_stored<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: EntryOptions,
    source: &Path,
) -> Result<WrittenEntry> {
    let (crc32, size) = checksum_file(source)?;
    let file =
        File::open(source).with_context(|| format!("failed to open {}", source.display()))?;
    zip.write_entry(options.into_stored(crc32, size), &mut BufReader::new(file))
}

fn finish_archive(zip: ZipWriter<BufWriter<File>>, output: &Path) -> Result<()> {
    zip.finish()?
        .into_inner()
        .map_err(|e| e.into_error())
        .with_context(|| format!("failed to write {}", output.display()))?;
    Ok(())
}

/// Rewrite `archive` into `output` with `entry_name` stored uncompressed.
///
/// `work_dir` is created fresh (it must not exist yet) and removed before
/// returning, whether the rewrite succeeded or not. A missing entry fails
/// before `output` is created, and so does a directory entry.
///
/// The stored target keeps the source entry's modification time, comment
/// and extra field; only its method, sizes and CRC-32 change. Every other
/// entry keeps its method, CRC-32, time, comment and extra field, with the
/// compressed size recomputed.
pub fn repack_entry(
    archive: &Path,
    entry_name: &str,
    output: &Path,
    work_dir: &Path,
) -> Result<RepackReport> {
    let work_dir = WorkDir::create(work_dir)?;

    let extractor = ZipExtractor::new(LocalFileReader::new(archive)?)?;
    let Some(target) = extractor.find(entry_name) else {
        bail!("Entry not found: {}", entry_name);
    };
    if target.is_directory {
        bail!("Entry {} is a directory and cannot be stored", entry_name);
    }

    let extracted = entry_path(work_dir.path(), entry_name)?;
    extractor.extract_to_file(target, &extracted)?;

    let file =
        File::create(output).with_context(|| format!("failed to create {}", output.display()))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    // The target keeps its name, timestamp, comment and extra field.
    let written = write_stored(&mut zip, EntryOptions::copy_of(target), &extracted)?;

    let mut copied = 0;
    for entry in extractor.list_files() {
        if entry.file_name == entry_name {
            continue;
        }
        let mut data = extractor.open(entry)?;
        zip.write_entry(EntryOptions::copy_of(entry), &mut data)?;
        copied += 1;
    }

    finish_archive(zip, output)?;

    Ok(RepackReport {
        entry: entry_name.to_string(),
        size: written.uncompressed_size,
        crc32: written.crc32,
        copied,
    })
}

/// Create `output` holding `source` as a single STORED entry named
/// `entry_name`, stamped with the source file's modification time.
pub fn store_file(source: &Path, output: &Path, entry_name: &str) -> Result<StoredEntry> {
    let modified = fs::metadata(source)
        .and_then(|m| m.modified())
        .with_context(|| format!("failed to stat {}", source.display()))?;

    let file =
        File::create(output).with_context(|| format!("failed to create {}", output.display()))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = EntryOptions::new(entry_name).with_mod_time(dos_datetime(modified));
    let written = write_stored(&mut zip, options, source)?;
    finish_archive(zip, output)?;

    Ok(StoredEntry {
        entry: entry_name.to_string(),
        size: written.uncompressed_size,
        crc32: written.crc32,
    })
}
