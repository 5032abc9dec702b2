use crate::error::Result;
use std::io::{self, Cursor, Read};

/// A single open file inside the mounted archive
///
/// The entry is extracted by the archive library when the descriptor is
/// opened; reads then advance a private cursor over the extracted bytes.
/// Extraction is where decompression and checksum errors happen, so a
/// descriptor that exists always reads without I/O failure. The
/// fixed-capacity buffer belongs to the [`ChunkReader`](crate::chunk::ChunkReader)
/// pulling from it. A descriptor is owned by exactly one reader and is
/// never cloned.
#[derive(Debug)]
pub struct Descriptor {
    path: String,
    data: Cursor<Vec<u8>>,
}

impl Descriptor {
    pub(crate) fn new(path: String, data: Vec<u8>) -> Self {
        Self {
            path,
            data: Cursor::new(data),
        }
    }

    /// Virtual path this descriptor was opened from
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Total size of the file in bytes
    pub fn len(&self) -> u64 {
        self.data.get_ref().len() as u64
    }

    /// Check if the file has no content
    pub fn is_empty(&self) -> bool {
        self.data.get_ref().is_empty()
    }

    /// Current read position
    pub fn position(&self) -> u64 {
        self.data.position()
    }

    /// True once every byte has been consumed
    pub fn is_eof(&self) -> bool {
        self.position() >= self.len()
    }

    /// Release the descriptor
    ///
    /// Releasing extracted bytes cannot fail; the `Result` keeps the
    /// close contract of the file API.
    pub fn close(self) -> Result<()> {
        tracing::debug!(path = %self.path, "closing descriptor");
        Ok(())
    }
}

impl Read for Descriptor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.data.read(buf)
    }
}
