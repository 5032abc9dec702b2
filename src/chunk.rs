//! Chunked reading of virtual files
//!
//! [`ChunkReader`] pulls fixed-capacity buffers out of an open file until a
//! zero-length chunk marks the end of the stream. The same loop feeds the
//! Lua compiler ([`load_chunk`]) and the bounded reads of
//! [`FileHandle`](crate::file::FileHandle).

use crate::archive::VirtualArchive;
use crate::error::{Result, SatchelError};
use mlua::{Function, Lua};
use std::io::Read;

/// Default buffer capacity for a chunk reader
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Pull-based producer of byte chunks over a readable source
///
/// The stream is finite and cannot be restarted: once a zero-length chunk
/// or an error has been returned every further pull yields an empty chunk.
pub struct ChunkReader<R> {
    source: R,
    buffer: Vec<u8>,
    finished: bool,
}

impl<R: Read> ChunkReader<R> {
    /// Create a reader with the default buffer capacity
    pub fn new(source: R) -> Self {
        Self::with_capacity(source, DEFAULT_CHUNK_SIZE)
    }

    /// Create a reader with a specific buffer capacity (at least one byte)
    pub fn with_capacity(source: R, capacity: usize) -> Self {
        Self {
            source,
            buffer: vec![0u8; capacity.max(1)],
            finished: false,
        }
    }

    /// Buffer capacity, the upper bound of every chunk
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// True once the end of the stream was reached or a read failed
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Pull the next chunk; an empty slice signals end of stream
    pub fn next_chunk(&mut self) -> Result<&[u8]> {
        self.next_chunk_limited(usize::MAX)
    }

    /// Pull the next chunk of at most `limit` bytes
    ///
    /// A `limit` of zero returns an empty slice without ending the stream.
    pub fn next_chunk_limited(&mut self, limit: usize) -> Result<&[u8]> {
        if self.finished || limit == 0 {
            return Ok(&[]);
        }

        let want = limit.min(self.buffer.len());
        let read = match self.source.read(&mut self.buffer[..want]) {
            Ok(read) => read,
            Err(err) => {
                self.finished = true;
                return Err(SatchelError::ReadFailed(err));
            }
        };

        if read == 0 {
            self.finished = true;
        }
        Ok(&self.buffer[..read])
    }

    /// Accumulate chunks until `limit` bytes were read or the stream ends
    ///
    /// `None` reads everything that remains.
    pub fn read_up_to(&mut self, limit: Option<u64>) -> Result<Vec<u8>> {
        let mut remaining = limit.unwrap_or(u64::MAX);
        let mut result = Vec::new();

        while remaining > 0 {
            let want = usize::try_from(remaining).unwrap_or(usize::MAX);
            let chunk = self.next_chunk_limited(want)?;
            if chunk.is_empty() {
                break;
            }
            result.extend_from_slice(chunk);
            remaining -= chunk.len() as u64;
        }

        Ok(result)
    }

    /// Get a reference to the underlying source
    pub fn get_ref(&self) -> &R {
        &self.source
    }

    /// Unwrap the reader, returning the underlying source
    pub fn into_inner(self) -> R {
        self.source
    }
}

/// Compile everything a chunk reader produces into a Lua function
///
/// `name` becomes the chunk name shown in error messages and tracebacks.
pub fn load_chunk<R: Read>(lua: &Lua, reader: &mut ChunkReader<R>, name: &str) -> Result<Function> {
    let mut source = Vec::new();
    loop {
        let chunk = reader.next_chunk()?;
        if chunk.is_empty() {
            break;
        }
        source.extend_from_slice(chunk);
    }

    let function = lua
        .load(source)
        .set_name(format!("@{}", name))
        .into_function()?;
    Ok(function)
}

/// Open `path` in the archive and compile it
pub fn load_file(
    lua: &Lua,
    archive: &VirtualArchive,
    path: &str,
    chunk_size: usize,
) -> Result<Function> {
    let descriptor = archive.open_read(path)?;
    let mut reader = ChunkReader::with_capacity(descriptor, chunk_size);
    let function = load_chunk(lua, &mut reader, path)?;
    reader.into_inner().close()?;

    tracing::debug!(path, "loaded chunk");
    Ok(function)
}
