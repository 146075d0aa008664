//! Primitive encoding/decoding for the BSON wire format.
//!
//! Implements little-endian fixed-width integers and floats, element names
//! (NUL-terminated "cstrings") and length-prefix back-filling.

use crate::error::{DecodeError, EncodeError};
use crate::limits::TERMINATOR;

// =============================================================================
// DECODING
// =============================================================================

/// Reader for decoding binary data.
///
/// Wraps a byte slice and provides methods for reading primitives
/// with bounds checking and error handling.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader from a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current position in the data.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the remaining bytes.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Returns the number of remaining bytes.
    pub fn remaining_len(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns true if all data has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_byte(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        if self.pos >= self.data.len() {
            return Err(DecodeError::Truncated { context });
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    /// Reads exactly n bytes.
    #[inline]
    pub fn read_bytes(&mut self, n: usize, context: &'static str) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining_len() {
            return Err(DecodeError::Truncated { context });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Reads exactly N bytes into an array.
    #[inline]
    pub fn read_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N, context)?);
        Ok(out)
    }

    /// Reads a little-endian i32.
    #[inline]
    pub fn read_i32(&mut self, context: &'static str) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.read_array(context)?))
    }

    /// Reads a little-endian i64.
    #[inline]
    pub fn read_i64(&mut self, context: &'static str) -> Result<i64, DecodeError> {
        Ok(i64::from_le_bytes(self.read_array(context)?))
    }

    /// Reads a little-endian f64. NaN is a legal BSON double.
    #[inline]
    pub fn read_f64(&mut self, context: &'static str) -> Result<f64, DecodeError> {
        Ok(f64::from_le_bytes(self.read_array(context)?))
    }

    /// Reads a length as a little-endian i32, rejecting negative values.
    pub fn read_len(&mut self, context: &'static str) -> Result<usize, DecodeError> {
        let len = self.read_i32(context)?;
        usize::try_from(len).map_err(|_| DecodeError::InvalidLength {
            context,
            len: i64::from(len),
        })
    }

    /// Reads a NUL-terminated UTF-8 string.
    pub fn read_cstring(&mut self, field: &'static str) -> Result<&'a str, DecodeError> {
        let rest = self.remaining();
        let end = rest
            .iter()
            .position(|&b| b == TERMINATOR)
            .ok_or(DecodeError::Truncated { context: field })?;
        let bytes = &rest[..end];
        self.pos += end + 1;
        std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8 { field })
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Writer for encoding binary data.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Creates a new writer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Creates a new writer with capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Returns the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Returns a reference to the written bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Returns the number of bytes written.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if no bytes have been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Writes raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a little-endian i32.
    #[inline]
    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a little-endian i64.
    #[inline]
    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a little-endian f64.
    #[inline]
    pub fn write_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a length as a little-endian i32.
    pub fn write_len(&mut self, len: usize, field: &'static str) -> Result<(), EncodeError> {
        let len = i32::try_from(len).map_err(|_| EncodeError::DocumentTooLarge {
            field,
            len,
            max: i32::MAX as usize,
        })?;
        self.write_i32(len);
        Ok(())
    }

    /// Writes a NUL-terminated element name.
    pub fn write_cstring(&mut self, s: &str) -> Result<(), EncodeError> {
        if s.as_bytes().contains(&TERMINATOR) {
            return Err(EncodeError::KeyContainsNul { key: s.to_string() });
        }
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(TERMINATOR);
        Ok(())
    }

    /// Reserves a 4-byte slot for a length prefix, returning its offset.
    pub fn reserve_i32(&mut self) -> usize {
        let offset = self.buf.len();
        self.buf.extend_from_slice(&[0u8; 4]);
        offset
    }

    /// Overwrites a slot previously returned by [`Writer::reserve_i32`].
    pub fn patch_i32(&mut self, offset: usize, value: i32) {
        self.buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Reserves a 1-byte slot for an element tag, returning its offset.
    pub fn reserve_byte(&mut self) -> usize {
        self.buf.push(0);
        self.buf.len() - 1
    }

    /// Overwrites a slot previously returned by [`Writer::reserve_byte`].
    pub fn patch_byte(&mut self, offset: usize, byte: u8) {
        self.buf[offset] = byte;
    }
}
