//! Fixture archives built with the `zip` crate, independent of the code
//! under test.

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::Path;

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

pub const HELLO: &[u8] = b"hello";

/// 10000 bytes of a repeating, compressible pattern.
pub fn origin_apk() -> Vec<u8> {
    (0..10_000u32).map(|i| (i % 251) as u8).collect()
}

/// Write an archive with the given `(name, method, data)` entries.
pub fn write_archive(path: &Path, entries: &[(&str, CompressionMethod, &[u8])]) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for (name, method, data) in entries {
        let options = SimpleFileOptions::default().compression_method(*method);
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

/// `sample.zip`: `a.txt` ("hello", deflated) and `assets/origin.apk`
/// (10000 bytes, deflated).
pub fn write_sample(path: &Path) {
    let origin = origin_apk();
    write_archive(
        path,
        &[
            ("a.txt", CompressionMethod::Deflated, HELLO),
            ("assets/origin.apk", CompressionMethod::Deflated, origin.as_slice()),
        ],
    );
}

pub fn read_entry(path: &Path, name: &str) -> Vec<u8> {
    use std::io::Read;
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut data = Vec::new();
    entry.read_to_end(&mut data).unwrap();
    data
}
