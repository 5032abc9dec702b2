//! Read-only virtual namespace backed by a zip archive
//!
//! The archive may be a plain `.zip` or a zip appended to an executable.
//! The trailing end record gives the archive's first byte, and the zip
//! reader only ever sees the bytes from there on. Every entry is addressed
//! by a virtual path rooted at `/`.

use crate::archive::{ArchiveSlice, Descriptor, EndRecord};
use crate::error::{Result, SatchelError};
use std::cell::RefCell;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Mount point of every archive
pub const MOUNT_ROOT: &str = "/";

/// Upper bound on the buffer reserved up front when extracting an entry
pub const MAX_PREALLOCATION: u64 = 1024 * 1024;

type ArchiveReader = ZipArchive<ArchiveSlice<BufReader<File>>>;

/// Map a virtual path to the name stored in the zip central directory
///
/// Backslashes are normalized to forward slashes and the mount root is
/// stripped. Paths that climb out of the root yield `None`.
fn entry_name(path: &str) -> Option<String> {
    let normalized = path.replace('\\', "/");
    let relative = normalized.trim_start_matches('/');
    if relative.split('/').any(|component| component == "..") {
        return None;
    }
    Some(relative.to_string())
}

/// Buffer to reserve for an entry that declares `declared` bytes
///
/// The declared size comes from the archive and is not trusted.
fn initial_capacity(declared: u64) -> usize {
    declared.min(MAX_PREALLOCATION) as usize
}

/// The mounted archive
pub struct VirtualArchive {
    source: PathBuf,
    archive: RefCell<ArchiveReader>,
}

impl VirtualArchive {
    /// Mount the archive at `path` as the root namespace
    pub fn mount<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mount_failed = |reason: String| SatchelError::MountFailed {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| mount_failed(e.to_string()))?;
        let mut reader = BufReader::new(file);
        let start = EndRecord::locate(&mut reader)
            .and_then(|record| record.archive_start())
            .map_err(|e| mount_failed(e.to_string()))?;
        let slice = ArchiveSlice::new(reader, start).map_err(|e| mount_failed(e.to_string()))?;
        let archive = ZipArchive::new(slice).map_err(|e| mount_failed(e.to_string()))?;

        tracing::debug!(
            source = %path.display(),
            offset = start,
            entries = archive.len(),
            root = MOUNT_ROOT,
            "mounted archive"
        );

        Ok(Self {
            source: path.to_path_buf(),
            archive: RefCell::new(archive),
        })
    }

    /// Path of the file the archive was mounted from
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Get number of entries in the archive
    pub fn entry_count(&self) -> usize {
        self.archive.borrow().len()
    }

    /// List all file paths in the archive as virtual paths
    pub fn list_files(&self) -> Vec<String> {
        let archive = self.archive.borrow();
        let mut files: Vec<String> = archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(|name| format!("{}{}", MOUNT_ROOT, name))
            .collect();
        files.sort();
        files
    }

    /// Check if a file or directory exists in the namespace
    pub fn exists(&self, path: &str) -> bool {
        let Some(name) = entry_name(path) else {
            return false;
        };
        if name.is_empty() {
            return true;
        }

        let archive = self.archive.borrow();
        if archive.index_for_name(&name).is_some() {
            return true;
        }

        // Directories may be implicit: only their children are stored
        let dir = format!("{}/", name.trim_end_matches('/'));
        let found = archive.file_names().any(|entry| entry.starts_with(&dir));
        found
    }

    /// Open a file for reading
    ///
    /// The entry is extracted here, so decompression and checksum failures
    /// surface as [`SatchelError::ReadFailed`] from this call.
    pub fn open_read(&self, path: &str) -> Result<Descriptor> {
        let not_found = || SatchelError::FileNotFound(path.to_string());
        let name = entry_name(path).ok_or_else(not_found)?;

        let mut archive = self.archive.borrow_mut();
        let index = archive.index_for_name(&name).ok_or_else(not_found)?;
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            return Err(not_found());
        }

        let mut data = Vec::with_capacity(initial_capacity(entry.size()));
        entry
            .read_to_end(&mut data)
            .map_err(SatchelError::ReadFailed)?;

        tracing::debug!(path, size = data.len(), "opened descriptor");
        Ok(Descriptor::new(path.to_string(), data))
    }

    /// Read a whole file from the archive
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let mut descriptor = self.open_read(path)?;
        let mut data = Vec::with_capacity(descriptor.len() as usize);
        descriptor
            .read_to_end(&mut data)
            .map_err(SatchelError::ReadFailed)?;
        descriptor.close()?;
        Ok(data)
    }
}

impl Drop for VirtualArchive {
    fn drop(&mut self) {
        tracing::debug!(source = %self.source.display(), "unmounted archive");
    }
}

impl std::fmt::Debug for VirtualArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualArchive")
            .field("source", &self.source)
            .field("entries", &self.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{build_stored_zip, build_zip, mount_files};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_entry_name() {
        assert_eq!(entry_name("/init.lua").as_deref(), Some("init.lua"));
        assert_eq!(entry_name("init.lua").as_deref(), Some("init.lua"));
        assert_eq!(entry_name("/a\\b.lua").as_deref(), Some("a/b.lua"));
        assert_eq!(entry_name("/").as_deref(), Some(""));
        assert_eq!(entry_name("/../etc/passwd"), None);
    }

    #[test]
    fn test_mount_and_read() -> Result<()> {
        let (temp, vfs) = mount_files(&[
            ("init.lua", b"return 1"),
            ("data/config.txt", b"key=value"),
        ]);

        assert_eq!(vfs.entry_count(), 2);
        assert_eq!(vfs.source(), temp.path());
        assert_eq!(vfs.list_files(), vec!["/data/config.txt", "/init.lua"]);

        assert!(vfs.exists("/init.lua"));
        assert!(vfs.exists("/data"));
        assert!(vfs.exists("/"));
        assert!(!vfs.exists("/missing.lua"));
        assert!(!vfs.exists("/data/../init.lua"));

        assert_eq!(vfs.read_file("/data/config.txt")?, b"key=value");
        Ok(())
    }

    #[test]
    fn test_mount_with_prepended_bytes() -> Result<()> {
        let mut temp = NamedTempFile::new()?;
        temp.write_all(&[0x7f, b'E', b'L', b'F'])?;
        temp.write_all(&vec![0xAB; 4096])?;
        temp.write_all(&build_zip(&[("init.lua", b"return ...")]))?;
        temp.flush()?;

        let vfs = VirtualArchive::mount(temp.path())?;
        assert_eq!(vfs.read_file("/init.lua")?, b"return ...");
        Ok(())
    }

    #[test]
    fn test_mount_skips_archive_embedded_in_prefix() -> Result<()> {
        let mut temp = NamedTempFile::new()?;
        temp.write_all(b"\x7fELF")?;
        temp.write_all(b"PK\x05\x06PK\x01\x02PK\x06\x06")?;
        temp.write_all(&build_zip(&[("decoy.lua", b"return 'decoy'")]))?;
        temp.write_all(&[0u8; 128])?;
        temp.write_all(&build_zip(&[("init.lua", b"return 'app'")]))?;
        temp.flush()?;

        let vfs = VirtualArchive::mount(temp.path())?;
        assert_eq!(vfs.list_files(), vec!["/init.lua"]);
        assert!(!vfs.exists("/decoy.lua"));
        assert_eq!(vfs.read_file("/init.lua")?, b"return 'app'");
        Ok(())
    }

    #[test]
    fn test_declared_size_is_not_trusted() {
        assert_eq!(initial_capacity(0), 0);
        assert_eq!(initial_capacity(4096), 4096);
        assert_eq!(initial_capacity(1 << 62), MAX_PREALLOCATION as usize);
        assert_eq!(initial_capacity(u64::MAX), MAX_PREALLOCATION as usize);
    }

    #[test]
    fn test_corrupted_entry_fails_to_read() {
        let payload: &[u8] = b"payload protected by its checksum";
        let mut bytes = build_stored_zip(&[("init.lua", b""), ("corrupt.bin", payload)]);
        let at = bytes
            .windows(payload.len())
            .position(|window| window == payload)
            .unwrap();
        bytes[at] ^= 0xFF;

        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(&bytes).unwrap();
        temp.flush().unwrap();
        let vfs = VirtualArchive::mount(temp.path()).unwrap();

        assert!(vfs.exists("/corrupt.bin"));
        let result = vfs.open_read("/corrupt.bin");
        assert!(matches!(result, Err(SatchelError::ReadFailed(_))));
        assert!(vfs.open_read("/init.lua").is_ok());
    }

    #[test]
    fn test_mount_rejects_non_archive() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"definitely not a zip file").unwrap();

        let result = VirtualArchive::mount(temp.path());
        assert!(matches!(result, Err(SatchelError::MountFailed { .. })));
    }

    #[test]
    fn test_open_missing_file() {
        let (_temp, vfs) = mount_files(&[("init.lua", b"")]);

        let result = vfs.open_read("/nope.lua");
        assert!(matches!(result, Err(SatchelError::FileNotFound(ref p)) if p == "/nope.lua"));
    }
}
