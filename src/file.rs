//! Read-only file handles over the mounted archive
//!
//! A [`FileHandle`] owns exactly one [`Descriptor`] until it is closed.
//! Closing is explicit; dropping an open handle closes it as a fallback,
//! which is also what happens when Lua collects an abandoned handle.

use crate::archive::{Descriptor, VirtualArchive};
use crate::chunk::{ChunkReader, DEFAULT_CHUNK_SIZE};
use crate::error::{Result, SatchelError};

/// Accepted open modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// `"rb"`
    Read,
}

impl OpenMode {
    /// Parse a mode string; only `"rb"` is supported
    pub fn parse(mode: &str) -> Result<Self> {
        match mode {
            "rb" => Ok(OpenMode::Read),
            other => Err(SatchelError::InvalidMode(other.to_string())),
        }
    }
}

/// What a single `read` call asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadRequest {
    /// Up to this many bytes; `None` when already at end of file
    Bytes(u64),
    /// Everything that remains; empty (never `None`) at end of file
    All,
}

/// An open file inside the archive
#[derive(Debug)]
pub struct FileHandle {
    descriptor: Option<Descriptor>,
    chunk_size: usize,
}

impl FileHandle {
    /// Open `path` with the given mode string
    pub fn open(archive: &VirtualArchive, path: &str, mode: &str) -> Result<Self> {
        match OpenMode::parse(mode)? {
            OpenMode::Read => {
                let descriptor = archive.open_read(path)?;
                Ok(Self {
                    descriptor: Some(descriptor),
                    chunk_size: DEFAULT_CHUNK_SIZE,
                })
            }
        }
    }

    /// Open `path`, run `f` on the handle, and close it before returning
    pub fn with<T, F>(archive: &VirtualArchive, path: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut FileHandle) -> Result<T>,
    {
        let mut handle = Self::open(archive, path, "rb")?;
        let result = f(&mut handle);
        if !handle.is_closed() {
            handle.close()?;
        }
        result
    }

    /// Use a specific buffer capacity for reads
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Virtual path of the open file, `None` once closed
    pub fn path(&self) -> Option<&str> {
        self.descriptor.as_ref().map(Descriptor::path)
    }

    pub fn is_closed(&self) -> bool {
        self.descriptor.is_none()
    }

    fn descriptor_mut(&mut self) -> Result<&mut Descriptor> {
        self.descriptor.as_mut().ok_or(SatchelError::ClosedHandle)
    }

    /// Read from the current position
    ///
    /// A bounded read at end of file yields `None`; reading everything at
    /// end of file yields an empty buffer.
    pub fn read(&mut self, request: ReadRequest) -> Result<Option<Vec<u8>>> {
        let chunk_size = self.chunk_size;
        let descriptor = self.descriptor_mut()?;

        let limit = match request {
            ReadRequest::Bytes(_) if descriptor.is_eof() => return Ok(None),
            ReadRequest::Bytes(count) => Some(count),
            ReadRequest::All => None,
        };

        let mut reader = ChunkReader::with_capacity(descriptor, chunk_size);
        reader.read_up_to(limit).map(Some)
    }

    /// Close the handle; closing twice is an error
    pub fn close(&mut self) -> Result<()> {
        let descriptor = self.descriptor.take().ok_or(SatchelError::ClosedHandle)?;
        descriptor.close()
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        if let Some(descriptor) = self.descriptor.take() {
            tracing::debug!(path = descriptor.path(), "closing abandoned file handle");
            if let Err(err) = descriptor.close() {
                tracing::debug!(error = %err, "ignoring close failure during drop");
            }
        }
    }
}
