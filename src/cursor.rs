//! Sequential little-endian reader over an already-opened output file.
//!
//! Every record in the file is a 4-byte integer, a 4-byte float or a
//! fixed-width text field whose width is a multiple of 4.  [`Cursor`] knows
//! the total length up front, so a short read is reported as
//! [`DecodeError::TruncatedRead`] with the exact byte offset instead of a bare
//! `UnexpectedEof`.
//!
//! Reads are single deterministic attempts.  The cursor only moves backwards
//! through an explicit [`Cursor::seek_absolute`].

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read, Seek, SeekFrom};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Truncated read at byte offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedRead { offset: u64, needed: u64, available: u64 },

    #[error("Magic number in prolog ({head:#010x}) does not match magic number in epilog ({tail:#010x}): probably not an EPANET output file")]
    FormatMismatch { head: i32, tail: i32 },

    #[error("Inconsistent {what}: first read {expected}, second read {found}")]
    ConsistencyMismatch { what: &'static str, expected: i64, found: i64 },

    #[error("Text field of {width} bytes at offset {offset} is not valid UTF-8")]
    InvalidEncoding { offset: u64, width: usize },

    #[error("Invalid {what} {value} at byte offset {offset}")]
    InvalidCount { what: &'static str, value: i32, offset: u64 },

    #[error("{what} index {index} out of range (0..{len})")]
    IndexOutOfRange { what: &'static str, index: i64, len: usize },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Byte-offset-aware reader.  Owns the underlying handle; dropping the cursor
/// closes the file.
#[derive(Debug)]
pub struct Cursor<R> {
    inner: R,
    pos:   u64,
    len:   u64,
}

impl<R: Read + Seek> Cursor<R> {
    /// Wrap `inner`, measuring its length and rewinding to offset 0.
    pub fn new(mut inner: R) -> Result<Self, DecodeError> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self { inner, pos: 0, len })
    }

    pub fn position(&self) -> u64 { self.pos }

    pub fn len(&self) -> u64 { self.len }

    pub fn is_empty(&self) -> bool { self.len == 0 }

    pub fn remaining(&self) -> u64 { self.len.saturating_sub(self.pos) }

    /// Fail with `TruncatedRead` unless at least `needed` bytes remain.
    pub fn ensure(&self, needed: u64) -> Result<(), DecodeError> {
        let available = self.remaining();
        if available < needed {
            return Err(DecodeError::TruncatedRead { offset: self.pos, needed, available });
        }
        Ok(())
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        self.ensure(4)?;
        let offset = self.pos;
        let v = self.inner.read_i32::<LittleEndian>()
            .map_err(|e| self.short_read(e, offset, 4))?;
        self.pos += 4;
        Ok(v)
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        self.ensure(4)?;
        let offset = self.pos;
        let v = self.inner.read_f32::<LittleEndian>()
            .map_err(|e| self.short_read(e, offset, 4))?;
        self.pos += 4;
        Ok(v)
    }

    /// Read a stored count, rejecting negative values.
    pub fn read_count(&mut self, what: &'static str) -> Result<usize, DecodeError> {
        let offset = self.pos;
        let value = self.read_i32()?;
        usize::try_from(value).map_err(|_| DecodeError::InvalidCount { what, value, offset })
    }

    /// Read exactly `width` bytes and decode them as text.  The field ends at
    /// the first NUL; padding after it is discarded.
    pub fn read_fixed_text(&mut self, width: usize) -> Result<String, DecodeError> {
        self.ensure(width as u64)?;
        let offset = self.pos;
        let mut buf = vec![0u8; width];
        self.inner.read_exact(&mut buf)
            .map_err(|e| self.short_read(e, offset, width as u64))?;
        self.pos += width as u64;

        let end = buf.iter().position(|&b| b == 0).unwrap_or(width);
        std::str::from_utf8(&buf[..end])
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidEncoding { offset, width })
    }

    pub fn seek_absolute(&mut self, offset: u64) -> Result<(), DecodeError> {
        self.pos = self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Position the cursor `back` bytes before the end of the file.
    pub fn seek_from_end(&mut self, back: u64) -> Result<(), DecodeError> {
        if back > self.len {
            return Err(DecodeError::TruncatedRead { offset: 0, needed: back, available: self.len });
        }
        self.seek_absolute(self.len - back)
    }

    pub fn into_inner(self) -> R { self.inner }

    fn short_read(&self, err: io::Error, offset: u64, needed: u64) -> DecodeError {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            DecodeError::TruncatedRead { offset, needed, available: self.len.saturating_sub(offset) }
        } else {
            DecodeError::Io(err)
        }
    }
}
