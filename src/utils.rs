//! Low-level read primitives shared by all parsers.
//!
//! [`ByteReader`] is a bounds-checked view over an immutable byte slice.
//! Each read either returns exactly the bytes it promises or
//! [`Error::OutOfBounds`]; there is no partial-read ambiguity and no read
//! ever panics, whatever offsets the input contains.

use crate::{Error, Result};

/// Random-access reader over a borrowed byte slice.
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
}

impl<'a> ByteReader<'a> {
    /// Wrap `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Total number of readable bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the underlying slice is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The whole underlying slice.
    #[inline]
    pub fn as_slice(&self) -> &'a [u8] {
        self.buf
    }

    /// Whether `len` bytes starting at `offset` lie inside the buffer.
    #[inline]
    pub fn contains(&self, offset: usize, len: usize) -> bool {
        offset
            .checked_add(len)
            .is_some_and(|end| end <= self.buf.len())
    }

    /// Borrow `len` bytes at `offset`.
    #[inline]
    pub fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.buf.get(offset..end))
            .ok_or(Error::OutOfBounds { offset, len })
    }

    /// Narrow the reader to a `len`-byte window at `offset`.
    ///
    /// Offsets passed to the returned reader are relative to the window.
    #[inline]
    pub fn sub(&self, offset: usize, len: usize) -> Result<ByteReader<'a>> {
        self.bytes(offset, len).map(ByteReader::new)
    }

    /// Read exactly `N` bytes into a fixed-size array.
    #[inline]
    pub fn array<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        let mut b = [0u8; N];
        b.copy_from_slice(self.bytes(offset, N)?);
        Ok(b)
    }

    /// Read one byte.
    #[inline]
    pub fn u8(&self, offset: usize) -> Result<u8> {
        self.array::<1>(offset).map(|b| b[0])
    }

    /// Read a little-endian `u16`.
    #[inline]
    pub fn le_u16(&self, offset: usize) -> Result<u16> {
        self.array(offset).map(u16::from_le_bytes)
    }

    /// Read a little-endian `u32`.
    #[inline]
    pub fn le_u32(&self, offset: usize) -> Result<u32> {
        self.array(offset).map(u32::from_le_bytes)
    }

    /// Read a little-endian `u64`.
    #[inline]
    pub fn le_u64(&self, offset: usize) -> Result<u64> {
        self.array(offset).map(u64::from_le_bytes)
    }

    /// Read a big-endian `u16`.
    #[inline]
    pub fn be_u16(&self, offset: usize) -> Result<u16> {
        self.array(offset).map(u16::from_be_bytes)
    }

    /// Read a big-endian `u32`.
    #[inline]
    pub fn be_u32(&self, offset: usize) -> Result<u32> {
        self.array(offset).map(u32::from_be_bytes)
    }

    /// Read a big-endian `u64`.
    #[inline]
    pub fn be_u64(&self, offset: usize) -> Result<u64> {
        self.array(offset).map(u64::from_be_bytes)
    }

    /// Read a little-endian unsigned integer of 1 to 8 bytes.
    pub fn le_uint(&self, offset: usize, len: usize) -> Result<u64> {
        if !(1..=8).contains(&len) {
            return Err(Error::OutOfBounds { offset, len });
        }
        let mut b = [0u8; 8];
        b[..len].copy_from_slice(self.bytes(offset, len)?);
        Ok(u64::from_le_bytes(b))
    }

    /// Extract a null-terminated string at `offset`.
    ///
    /// Returns [`Error::OutOfBounds`] if `offset` is outside the buffer or no
    /// null byte follows it.
    pub fn null_string(&self, offset: usize) -> Result<String> {
        let slice = self
            .buf
            .get(offset..)
            .ok_or(Error::OutOfBounds { offset, len: 1 })?;
        let end = slice
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::OutOfBounds {
                offset,
                len: slice.len() + 1,
            })?;
        Ok(String::from_utf8_lossy(&slice[..end]).into_owned())
    }
}

/// Decode a fixed-width, null-padded text field.
///
/// Stops at the first null byte and trims trailing whitespace.
pub fn null_padded_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end])
        .trim_end()
        .to_owned()
}
