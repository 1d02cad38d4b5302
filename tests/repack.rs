//! End-to-end tests for re-packing and inspecting archives, verified with
//! the independent `zip` crate.

mod common;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use tempfile::TempDir;
use zip::CompressionMethod;

use common::{HELLO, origin_apk, read_entry, write_archive, write_sample};
use zipstore::zip::{CompressionMethod as Method, EntryOptions, ZipExtractor, ZipWriter};
use zipstore::{LocalFileReader, inspect_entry, repack_entry, store_file};

/// 2010-05-06 07:08:10 as DOS `(time, date)`.
const STAMP: (u16, u16) = ((7 << 11) | (8 << 5) | 5, (30 << 9) | (5 << 5) | 6);

/// Write an archive with `zipstore`'s own writer so entries can carry a
/// timestamp, comment and extra field.
fn write_annotated(path: &Path, entries: Vec<(EntryOptions, &[u8])>) {
    let mut zip = ZipWriter::new(BufWriter::new(File::create(path).unwrap()));
    for (options, data) in entries {
        zip.write_entry(options, &mut &data[..]).unwrap();
    }
    zip.finish().unwrap();
}

fn annotated(name: &str, comment: &[u8], extra: &[u8]) -> EntryOptions {
    let mut options = EntryOptions::new(name).with_mod_time(STAMP);
    options.comment = comment.to_vec();
    options.extra_field = extra.to_vec();
    options
}

#[test]
fn repack_stores_target_and_keeps_others() {
    let temp = TempDir::new().unwrap();
    let sample = temp.path().join("sample.zip");
    let out = temp.path().join("out.zip");
    let work = temp.path().join("temp_apk");
    write_sample(&sample);

    let report = repack_entry(&sample, "assets/origin.apk", &out, &work).unwrap();
    let origin = origin_apk();
    assert_eq!(report.size, 10_000);
    assert_eq!(report.crc32, crc32fast::hash(&origin));
    assert_eq!(report.copied, 1);

    let mut archive = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
    {
        let target = archive.by_name("assets/origin.apk").unwrap();
        assert_eq!(target.compression(), CompressionMethod::Stored);
        assert_eq!(target.size(), 10_000);
        assert_eq!(target.compressed_size(), 10_000);
        assert_eq!(target.crc32(), crc32fast::hash(&origin));
    }
    {
        let other = archive.by_name("a.txt").unwrap();
        assert_eq!(other.compression(), CompressionMethod::Deflated);
        assert_eq!(other.crc32(), crc32fast::hash(HELLO));
    }
    assert_eq!(read_entry(&out, "assets/origin.apk"), origin);
    assert_eq!(read_entry(&out, "a.txt"), HELLO);

    assert!(!work.exists());
}

#[test]
fn repack_writes_target_first_then_source_order() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("in.zip");
    let out = temp.path().join("out.zip");
    write_archive(
        &source,
        &[
            ("z.txt", CompressionMethod::Deflated, b"zzz".as_slice()),
            ("lib/raw.bin", CompressionMethod::Stored, b"raw bytes".as_slice()),
            ("m/target.dat", CompressionMethod::Deflated, b"target target target".as_slice()),
            ("a.txt", CompressionMethod::Deflated, b"aaa".as_slice()),
        ],
    );

    repack_entry(&source, "m/target.dat", &out, &temp.path().join("work")).unwrap();

    let mut archive = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
    let names: Vec<_> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_owned())
        .collect();
    assert_eq!(names, ["m/target.dat", "z.txt", "lib/raw.bin", "a.txt"]);

    assert_eq!(
        archive.by_name("lib/raw.bin").unwrap().compression(),
        CompressionMethod::Stored
    );
    assert_eq!(
        archive.by_name("z.txt").unwrap().compression(),
        CompressionMethod::Deflated
    );
}

#[test]
fn repack_of_already_stored_entry_is_unchanged_in_content() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("in.zip");
    let out = temp.path().join("out.zip");
    write_archive(&source, &[("x.bin", CompressionMethod::Stored, b"payload".as_slice())]);

    let report = repack_entry(&source, "x.bin", &out, &temp.path().join("work")).unwrap();
    assert_eq!(report.copied, 0);
    assert_eq!(read_entry(&out, "x.bin"), b"payload");
}

#[test]
fn repack_keeps_time_comment_and_extra_field() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("in.zip");
    let out = temp.path().join("out.zip");
    let origin = origin_apk();
    write_annotated(
        &source,
        vec![
            (annotated("a.txt", b"kept note", &[0xfe, 0xca, 0x02, 0x00, 0xab, 0xcd]), HELLO),
            (
                annotated("assets/origin.apk", b"target note", &[0x0d, 0xd0, 0x00, 0x00]),
                origin.as_slice(),
            ),
        ],
    );

    repack_entry(&source, "assets/origin.apk", &out, &temp.path().join("work")).unwrap();

    let extractor = ZipExtractor::new(LocalFileReader::new(&out).unwrap()).unwrap();
    let other = extractor.find("a.txt").unwrap();
    assert_eq!(other.compression_method, Method::Deflate);
    assert_eq!((other.last_mod_time, other.last_mod_date), STAMP);
    assert_eq!(other.mod_date(), (2010, 5, 6));
    assert_eq!(other.mod_time(), (7, 8, 10));
    assert_eq!(other.comment, b"kept note");
    assert_eq!(other.extra_field, vec![0xfe, 0xca, 0x02, 0x00, 0xab, 0xcd]);

    let target = extractor.find("assets/origin.apk").unwrap();
    assert_eq!(target.compression_method, Method::Stored);
    assert_eq!((target.last_mod_time, target.last_mod_date), STAMP);
    assert_eq!(target.comment, b"target note");
    assert_eq!(target.extra_field, vec![0x0d, 0xd0, 0x00, 0x00]);

    let mut archive = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
    assert_eq!(archive.by_name("a.txt").unwrap().comment(), "kept note");
    assert_eq!(read_entry(&out, "a.txt"), HELLO);
    assert_eq!(read_entry(&out, "assets/origin.apk"), origin);
}

#[test]
fn directory_entry_cannot_be_stored() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("in.zip");
    let out = temp.path().join("out.zip");
    let work = temp.path().join("temp_apk");
    write_annotated(
        &source,
        vec![
            (EntryOptions::stored("assets/", 0, 0), b"".as_slice()),
            (EntryOptions::new("assets/a.txt"), HELLO),
        ],
    );

    let err = repack_entry(&source, "assets/", &out, &work).unwrap_err();
    assert!(err.to_string().contains("is a directory"));
    assert!(!out.exists());
    assert!(!work.exists());
}

#[test]
fn name_that_is_not_utf8_fails_and_cleans_up() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("in.zip");
    let out = temp.path().join("out.zip");
    let work = temp.path().join("temp_apk");
    write_archive(&source, &[("QQ.txt", CompressionMethod::Stored, HELLO)]);

    // Rewrite the name as CP437 bytes in both headers.
    let mut data = fs::read(&source).unwrap();
    for i in 0..data.len() - 6 {
        if &data[i..i + 6] == b"QQ.txt" {
            data[i..i + 2].copy_from_slice(&[0x82, 0x82]);
        }
    }
    fs::write(&source, &data).unwrap();

    let err = repack_entry(&source, "QQ.txt", &out, &work).unwrap_err();
    assert!(err.to_string().contains("is not valid UTF-8"));
    assert!(!out.exists());
    assert!(!work.exists());
}

#[test]
fn missing_entry_fails_without_output_and_cleans_up() {
    let temp = TempDir::new().unwrap();
    let sample = temp.path().join("sample.zip");
    let out = temp.path().join("out.zip");
    let work = temp.path().join("temp_apk");
    write_sample(&sample);

    let err = repack_entry(&sample, "missing.txt", &out, &work).unwrap_err();
    assert!(err.to_string().contains("Entry not found: missing.txt"));
    assert!(!out.exists());
    assert!(!work.exists());
}

#[test]
fn entry_lookup_is_exact_and_case_sensitive() {
    let temp = TempDir::new().unwrap();
    let sample = temp.path().join("sample.zip");
    write_sample(&sample);

    for name in ["origin.apk", "ASSETS/origin.apk", "assets/", "/assets/origin.apk"] {
        let out = temp.path().join("out.zip");
        assert!(repack_entry(&sample, name, &out, &temp.path().join("work")).is_err());
        assert!(!out.exists());
        assert!(inspect_entry(&sample, name).unwrap().is_none());
    }
}

#[test]
fn unreadable_source_fails_and_cleans_up() {
    let temp = TempDir::new().unwrap();
    let work = temp.path().join("temp_apk");
    let out = temp.path().join("out.zip");

    let not_zip = temp.path().join("not.zip");
    fs::write(&not_zip, b"this is not an archive").unwrap();
    assert!(repack_entry(&not_zip, "a.txt", &out, &work).is_err());
    assert!(!work.exists());

    let absent = temp.path().join("absent.zip");
    assert!(repack_entry(&absent, "a.txt", &out, &work).is_err());
    assert!(!work.exists());
}

#[test]
fn existing_work_dir_is_left_alone() {
    let temp = TempDir::new().unwrap();
    let sample = temp.path().join("sample.zip");
    let out = temp.path().join("out.zip");
    let work = temp.path().join("temp_apk");
    write_sample(&sample);
    fs::create_dir(&work).unwrap();
    fs::write(work.join("precious.txt"), b"keep me").unwrap();

    assert!(repack_entry(&sample, "a.txt", &out, &work).is_err());
    assert_eq!(fs::read(work.join("precious.txt")).unwrap(), b"keep me");
    assert!(!out.exists());
}

#[test]
fn unwritable_output_fails_and_cleans_up() {
    let temp = TempDir::new().unwrap();
    let sample = temp.path().join("sample.zip");
    let work = temp.path().join("temp_apk");
    write_sample(&sample);

    let out = temp.path().join("no-such-dir").join("out.zip");
    assert!(repack_entry(&sample, "a.txt", &out, &work).is_err());
    assert!(!work.exists());
}

#[test]
fn inspect_reports_sizes_and_method() {
    let temp = TempDir::new().unwrap();
    let sample = temp.path().join("sample.zip");
    let out = temp.path().join("out.zip");
    write_sample(&sample);

    let before = inspect_entry(&sample, "assets/origin.apk").unwrap().unwrap();
    assert_eq!(before.size, 10_000);
    assert!(before.is_deflated());
    assert!(before.compressed_size < before.size);

    repack_entry(&sample, "assets/origin.apk", &out, &temp.path().join("work")).unwrap();

    let after = inspect_entry(&out, "assets/origin.apk").unwrap().unwrap();
    assert!(after.is_stored());
    assert_eq!(after.size, 10_000);
    assert_eq!(after.compressed_size, 10_000);

    let hello = inspect_entry(&out, "a.txt").unwrap().unwrap();
    assert_eq!(hello.size, HELLO.len() as u64);
    assert!(hello.is_deflated());
}

#[test]
fn inspect_missing_entry_is_none() {
    let temp = TempDir::new().unwrap();
    let sample = temp.path().join("sample.zip");
    write_sample(&sample);
    assert!(inspect_entry(&sample, "missing.txt").unwrap().is_none());
}

#[test]
fn inspect_unreadable_archive_is_an_error() {
    assert!(inspect_entry(Path::new("/definitely/not/here.apk"), "a").is_err());
}

#[test]
fn store_file_creates_single_stored_entry() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("origin.apk");
    let out = temp.path().join("stored.zip");
    let data = origin_apk();
    fs::write(&source, &data).unwrap();

    let stored = store_file(&source, &out, "assets/origin.apk").unwrap();
    assert_eq!(stored.size, data.len() as u64);
    assert_eq!(stored.crc32, crc32fast::hash(&data));

    let mut archive = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
    assert_eq!(archive.len(), 1);
    let entry = archive.by_name("assets/origin.apk").unwrap();
    assert_eq!(entry.compression(), CompressionMethod::Stored);
    assert_eq!(entry.compressed_size(), data.len() as u64);
    drop(entry);
    assert_eq!(read_entry(&out, "assets/origin.apk"), data);
}
