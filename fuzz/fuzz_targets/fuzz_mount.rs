#![no_main]

use libfuzzer_sys::fuzz_target;
use satchel::{FileHandle, ReadRequest, VirtualArchive};
use std::io::Write;
use tempfile::NamedTempFile;

fuzz_target!(|data: &[u8]| {
    // Smallest zip is a bare end-of-central-directory record
    if data.len() < 22 {
        return;
    }

    let mut temp_file = match NamedTempFile::new() {
        Ok(f) => f,
        Err(_) => return,
    };
    if temp_file.write_all(data).is_err() || temp_file.flush().is_err() {
        return;
    }

    // Invalid archives must be rejected, never panic
    let archive = match VirtualArchive::mount(temp_file.path()) {
        Ok(archive) => archive,
        Err(_) => return,
    };

    for path in archive.list_files() {
        let _ = archive.exists(&path);
        let mut handle = match FileHandle::open(&archive, &path, "rb") {
            Ok(handle) => handle.with_chunk_size(64),
            Err(_) => continue,
        };
        let _ = handle.read(ReadRequest::Bytes(16));
        let _ = handle.read(ReadRequest::All);
        let _ = handle.read(ReadRequest::Bytes(1));
        let _ = handle.close();
    }

    let _ = archive.exists("/");
    let _ = archive.exists("../../../etc/passwd");
    let _ = archive.open_read("");
});
