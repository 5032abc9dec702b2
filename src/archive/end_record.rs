//! Locating a zip archive inside a larger file
//!
//! An archive appended to an executable is found from the end of the file:
//! the end-of-central-directory record is the last one whose comment runs
//! exactly to the end of the file. The central directory's size and
//! recorded offset then tell where the archive's first byte sits, so the
//! executable's own bytes (which may contain zip signatures of their own)
//! are never parsed.

use crate::error::{Result, SatchelError};
use std::io::{self, Read, Seek, SeekFrom};

/// End of central directory signature ("PK\x05\x06")
pub const END_RECORD_SIGNATURE: [u8; 4] = *b"PK\x05\x06";

/// End of central directory record size without its comment
pub const END_RECORD_SIZE: u64 = 22;

const MAX_COMMENT_LEN: u64 = u16::MAX as u64;

const ZIP64_LOCATOR_SIGNATURE: [u8; 4] = *b"PK\x06\x07";
const ZIP64_LOCATOR_SIZE: u64 = 20;
const ZIP64_END_RECORD_SIGNATURE: [u8; 4] = *b"PK\x06\x06";
const ZIP64_END_RECORD_SIZE: u64 = 56;

/// The record closing the central directory of the trailing archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndRecord {
    /// Absolute file position right after the central directory
    pub position: u64,
    pub central_directory_offset: u64,
    pub central_directory_size: u64,
}

impl EndRecord {
    /// Find the end record of the archive at the end of `reader`
    pub fn locate<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        if len < END_RECORD_SIZE {
            return Err(invalid("file too small to hold a zip archive"));
        }

        let tail_len = len.min(END_RECORD_SIZE + MAX_COMMENT_LEN);
        let tail_start = len - tail_len;
        reader.seek(SeekFrom::Start(tail_start))?;
        let mut tail = vec![0u8; tail_len as usize];
        reader.read_exact(&mut tail)?;

        let record_size = END_RECORD_SIZE as usize;
        let index = (0..=tail.len() - record_size)
            .rev()
            .find(|&i| {
                tail[i..i + 4] == END_RECORD_SIGNATURE
                    && i + record_size + read_u16(&tail[i + 20..]) as usize == tail.len()
            })
            .ok_or_else(|| invalid("no end of central directory record"))?;

        let record = &tail[index..index + record_size];
        let central_directory_size = read_u32(&record[12..]);
        let central_directory_offset = read_u32(&record[16..]);
        let position = tail_start + index as u64;

        if central_directory_size == u32::MAX || central_directory_offset == u32::MAX {
            return Self::locate_zip64(reader, position);
        }

        Ok(Self {
            position,
            central_directory_offset: central_directory_offset as u64,
            central_directory_size: central_directory_size as u64,
        })
    }

    fn locate_zip64<R: Read + Seek>(reader: &mut R, end_record: u64) -> Result<Self> {
        let locator_position = end_record
            .checked_sub(ZIP64_LOCATOR_SIZE)
            .ok_or_else(|| invalid("missing zip64 locator"))?;
        let mut locator = [0u8; ZIP64_LOCATOR_SIZE as usize];
        reader.seek(SeekFrom::Start(locator_position))?;
        reader.read_exact(&mut locator)?;
        if locator[..4] != ZIP64_LOCATOR_SIGNATURE {
            return Err(invalid("missing zip64 locator"));
        }

        let position = locator_position
            .checked_sub(ZIP64_END_RECORD_SIZE)
            .ok_or_else(|| invalid("missing zip64 end record"))?;
        let mut record = [0u8; ZIP64_END_RECORD_SIZE as usize];
        reader.seek(SeekFrom::Start(position))?;
        reader.read_exact(&mut record)?;
        if record[..4] != ZIP64_END_RECORD_SIGNATURE {
            return Err(invalid("missing zip64 end record"));
        }

        Ok(Self {
            position,
            central_directory_size: read_u64(&record[40..]),
            central_directory_offset: read_u64(&record[48..]),
        })
    }

    /// Absolute position of the archive's first byte
    pub fn archive_start(&self) -> Result<u64> {
        self.position
            .checked_sub(self.central_directory_size)
            .and_then(|end| end.checked_sub(self.central_directory_offset))
            .ok_or_else(|| invalid("central directory starts before the file"))
    }
}

/// A reader over `inner` from `start` onwards, seen as a standalone file
#[derive(Debug)]
pub struct ArchiveSlice<R> {
    inner: R,
    start: u64,
}

impl<R: Seek> ArchiveSlice<R> {
    pub fn new(mut inner: R, start: u64) -> io::Result<Self> {
        inner.seek(SeekFrom::Start(start))?;
        Ok(Self { inner, start })
    }

    /// Offset of the slice within the underlying file
    pub fn start(&self) -> u64 {
        self.start
    }
}

impl<R: Read> Read for ArchiveSlice<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Seek> Seek for ArchiveSlice<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => SeekFrom::Start(
                self.start
                    .checked_add(offset)
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "seek overflow"))?,
            ),
            relative => relative,
        };

        let absolute = self.inner.seek(target)?;
        match absolute.checked_sub(self.start) {
            Some(position) => Ok(position),
            None => {
                self.inner.seek(SeekFrom::Start(self.start))?;
                Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "seek before the start of the archive",
                ))
            }
        }
    }
}

fn invalid(reason: &str) -> SatchelError {
    SatchelError::InvalidArchive(reason.to_string())
}

fn read_u16(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}
