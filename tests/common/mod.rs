//! Archive fixtures for the integration tests

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

/// Build an in-memory zip holding `files`
pub fn build_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in files {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Build a zip with uncompressed entries and flip the first byte of `payload`
/// so its checksum no longer matches
pub fn build_corrupted_zip(files: &[(&str, &[u8])], payload: &[u8]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in files {
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    let mut bytes = writer.finish().unwrap().into_inner();
    let at = bytes
        .windows(payload.len())
        .position(|window| window == payload)
        .unwrap();
    bytes[at] ^= 0xFF;
    bytes
}

/// Write a plain zip archive into `dir`
pub fn write_archive(dir: &Path, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, build_zip(files)).unwrap();
    path
}

/// Write `prefix` followed by a zip archive, the layout of a packed executable
pub fn write_packed(dir: &Path, name: &str, prefix: &[u8], files: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    let mut bytes = prefix.to_vec();
    bytes.extend_from_slice(&build_zip(files));
    std::fs::write(&path, bytes).unwrap();
    path
}

pub fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
