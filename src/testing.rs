//! Archive fixtures shared by the unit tests

use crate::archive::VirtualArchive;
use std::io::{Cursor, Write};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;

/// Build an in-memory zip holding `files`
pub(crate) fn build_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in files {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Build an in-memory zip whose entries are stored uncompressed
pub(crate) fn build_stored_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in files {
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Write `files` to a temporary zip and mount it
///
/// The temp file must outlive the mount.
pub(crate) fn mount_files(files: &[(&str, &[u8])]) -> (NamedTempFile, VirtualArchive) {
    let mut temp = NamedTempFile::new().unwrap();
    temp.write_all(&build_zip(files)).unwrap();
    temp.flush().unwrap();
    let archive = VirtualArchive::mount(temp.path()).unwrap();
    (temp, archive)
}
