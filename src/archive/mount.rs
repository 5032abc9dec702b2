//! Locating and mounting the embedded archive
//!
//! The archive normally lives inside the running executable. When the
//! executable carries no archive, the first invocation argument names a
//! fallback archive instead and is consumed by the mount step.

use crate::archive::VirtualArchive;
use crate::error::{Result, SatchelError};
use std::ffi::OsStr;
use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};

/// Return the part of `path` after the last `separator`
///
/// Scans forward one separator at a time so multi-character separators
/// are handled the same way as single characters.
pub fn basename_with<'a>(path: &'a str, separator: &str) -> &'a str {
    if separator.is_empty() {
        return path;
    }
    let mut last_found = path;
    while let Some(index) = last_found.find(separator) {
        last_found = &last_found[index + separator.len()..];
    }
    last_found
}

/// Basename using the platform directory separator
pub fn basename(path: &str) -> &str {
    basename_with(path, MAIN_SEPARATOR_STR)
}

/// Result of a successful mount
#[derive(Debug)]
pub struct Mounted {
    /// The mounted namespace
    pub archive: VirtualArchive,
    /// Leading invocation arguments consumed before the script's own
    pub skip_args: usize,
}

impl Mounted {
    /// True when the fallback archive argument was used
    pub fn used_fallback(&self) -> bool {
        self.skip_args > 1
    }
}

/// Mount strategy: the executable itself, then the first argument
#[derive(Debug, Clone)]
pub struct ArchiveMount {
    base_dir: PathBuf,
}

impl ArchiveMount {
    /// Create a mount rooted at an explicit base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Query the directory holding the running executable
    pub fn detect() -> Result<Self> {
        let exe = std::env::current_exe()
            .map_err(|e| SatchelError::Init(format!("cannot locate executable: {}", e)))?;
        let base_dir = exe
            .parent()
            .ok_or_else(|| {
                SatchelError::Init(format!("executable has no parent: {}", exe.display()))
            })?
            .to_path_buf();
        Ok(Self::new(base_dir))
    }

    /// Directory the executable is looked up in
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the executable as invoked through `argv0`
    pub fn self_path<S: AsRef<OsStr>>(&self, argv0: S) -> PathBuf {
        let argv0 = argv0.as_ref();
        match argv0.to_str() {
            Some(argv0) => self.base_dir.join(basename(argv0)),
            None => self
                .base_dir
                .join(Path::new(argv0).file_name().unwrap_or_default()),
        }
    }

    /// Mount the archive for the given invocation arguments
    ///
    /// Tries the executable first; on failure mounts `args[1]` and reports
    /// one extra consumed argument. Fails with [`SatchelError::NoArchive`]
    /// when neither location holds an archive.
    pub fn mount<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<Mounted> {
        let argv0: &OsStr = args.first().map(|arg| arg.as_ref()).unwrap_or_default();
        let self_path = self.self_path(argv0);

        match VirtualArchive::mount(&self_path) {
            Ok(archive) => {
                return Ok(Mounted {
                    archive,
                    skip_args: 1,
                })
            }
            Err(err) => {
                tracing::info!(error = %err, "executable carries no archive, trying first argument");
            }
        }

        let fallback = Path::new(args.get(1).ok_or(SatchelError::NoArchive)?);
        match VirtualArchive::mount(fallback) {
            Ok(archive) => Ok(Mounted {
                archive,
                skip_args: 2,
            }),
            Err(err) => {
                tracing::warn!(error = %err, "fallback archive could not be mounted");
                Err(SatchelError::NoArchive)
            }
        }
    }
}
