// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Bounds-checked read cursor over a borrowed byte buffer.
//!
//! Every read either consumes exactly the requested number of bytes or fails
//! with [`CodecError::TruncatedInput`] and leaves the position untouched. The
//! cursor never panics and never reads outside the buffer.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::core::{CodecError, Result};

/// Read cursor over an immutable byte slice.
///
/// Invariant: `0 <= offset <= data.len()`.
///
/// # Example
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use wirecodec::encoding::cursor::ByteCursor;
///
/// let data = [0x01, 0x00, 0x2A];
/// let mut cursor = ByteCursor::new(&data);
/// assert_eq!(cursor.read_u8()?, 0x01);
/// assert_eq!(cursor.read_u16_be()?, 0x002A);
/// assert!(cursor.read_u8().is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    /// The data buffer
    data: &'a [u8],
    /// Current read position
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Create a cursor positioned at `offset`.
    pub fn with_offset(data: &'a [u8], offset: usize) -> Result<Self> {
        let mut cursor = Self::new(data);
        cursor.seek_to(offset)?;
        Ok(cursor)
    }

    /// The underlying buffer.
    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Current read position.
    #[inline]
    pub fn tell(&self) -> usize {
        self.offset
    }

    /// Bytes remaining after the read position.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Whether the whole buffer has been consumed.
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// Move the read position to `offset`.
    pub fn seek_to(&mut self, offset: usize) -> Result<()> {
        if offset > self.data.len() {
            return Err(CodecError::invalid_offset(offset, self.data.len()));
        }
        self.offset = offset;
        Ok(())
    }

    /// Consume `count` bytes and return them.
    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.remaining() {
            return Err(CodecError::truncated(count, self.remaining(), self.offset));
        }
        let start = self.offset;
        self.offset += count;
        Ok(&self.data[start..self.offset])
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Peek at the next byte without advancing.
    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.offset).copied()
    }

    /// Peek at the next `count` bytes without advancing.
    pub fn peek_bytes(&self, count: usize) -> Result<&'a [u8]> {
        if count > self.remaining() {
            return Err(CodecError::truncated(count, self.remaining(), self.offset));
        }
        Ok(&self.data[self.offset..self.offset + count])
    }

    /// Read a big-endian u16.
    pub fn read_u16_be(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    /// Read a little-endian u16.
    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    /// Read a big-endian u32.
    pub fn read_u32_be(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    /// Read a little-endian u32.
    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    /// Read a big-endian u64.
    pub fn read_u64_be(&mut self) -> Result<u64> {
        Ok(BigEndian::read_u64(self.take(8)?))
    }

    /// Read a little-endian u64.
    pub fn read_u64_le(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    /// Read `count` raw bytes.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        self.take(count)
    }

    /// Skip `count` bytes.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count).map(|_| ())
    }

    /// Read a byte string prefixed by a one-byte length.
    pub fn read_prefixed_u8(&mut self) -> Result<&'a [u8]> {
        let start = self.offset;
        let len = self.read_u8()? as usize;
        self.take(len).inspect_err(|_| self.offset = start)
    }

    /// Read a byte string prefixed by a big-endian two-byte length.
    pub fn read_prefixed_u16_be(&mut self) -> Result<&'a [u8]> {
        let start = self.offset;
        let len = self.read_u16_be()? as usize;
        self.take(len).inspect_err(|_| self.offset = start)
    }

    /// Read a byte string prefixed by a little-endian two-byte length.
    pub fn read_prefixed_u16_le(&mut self) -> Result<&'a [u8]> {
        let start = self.offset;
        let len = self.read_u16_le()? as usize;
        self.take(len).inspect_err(|_| self.offset = start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u8() {
        let data = [0x42, 0xFF];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_u8().unwrap(), 0x42);
        assert_eq!(cursor.read_u8().unwrap(), 0xFF);
        assert!(cursor.is_at_end());
    }

    #[test]
    fn test_read_u8_empty() {
        let mut cursor = ByteCursor::new(&[]);
        let err = cursor.read_u8().unwrap_err();
        assert_eq!(err, CodecError::truncated(1, 0, 0));
    }

    #[test]
    fn test_read_endianness() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_u16_be().unwrap(), 0x1234);
        assert_eq!(cursor.read_u16_le().unwrap(), 0x7856);
        cursor.seek_to(0).unwrap();
        assert_eq!(cursor.read_u32_be().unwrap(), 0x12345678);
        assert_eq!(cursor.read_u32_le().unwrap(), 0xF0DEBC9A);
        cursor.seek_to(0).unwrap();
        assert_eq!(cursor.read_u64_be().unwrap(), 0x123456789ABCDEF0);
        cursor.seek_to(0).unwrap();
        assert_eq!(cursor.read_u64_le().unwrap(), 0xF0DEBC9A78563412);
    }

    #[test]
    fn test_failed_read_does_not_advance() {
        let data = [0x01, 0x02, 0x03];
        let mut cursor = ByteCursor::new(&data);
        cursor.read_u8().unwrap();
        assert!(cursor.read_u32_be().is_err());
        assert_eq!(cursor.tell(), 1);
        assert!(cursor.read_bytes(3).is_err());
        assert_eq!(cursor.tell(), 1);
        assert_eq!(cursor.read_bytes(2).unwrap(), &[0x02, 0x03]);
    }

    #[test]
    fn test_truncated_reports_offset() {
        let data = [0u8; 12];
        let mut cursor = ByteCursor::new(&data);
        cursor.skip(2).unwrap();
        match cursor.read_bytes(50) {
            Err(CodecError::TruncatedInput {
                requested,
                available,
                offset,
            }) => {
                assert_eq!(requested, 50);
                assert_eq!(available, 10);
                assert_eq!(offset, 2);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_seek() {
        let data = [0u8; 4];
        let mut cursor = ByteCursor::new(&data);
        cursor.seek_to(4).unwrap();
        assert!(cursor.is_at_end());
        assert_eq!(cursor.remaining(), 0);
        let err = cursor.seek_to(5).unwrap_err();
        assert_eq!(err, CodecError::invalid_offset(5, 4));
        assert_eq!(cursor.tell(), 4);
        assert!(ByteCursor::with_offset(&data, 9).is_err());
    }

    #[test]
    fn test_peek() {
        let data = [0xAA, 0xBB];
        let cursor = ByteCursor::with_offset(&data, 1).unwrap();
        assert_eq!(cursor.peek_u8(), Some(0xBB));
        assert_eq!(cursor.peek_bytes(1).unwrap(), &[0xBB]);
        assert!(cursor.peek_bytes(2).is_err());
        assert_eq!(cursor.tell(), 1);
    }

    #[test]
    fn test_prefixed_reads() {
        let data = [0x02, b'h', b'i', 0x00, 0x01, b'x', 0x01, 0x00, b'y'];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_prefixed_u8().unwrap(), b"hi");
        assert_eq!(cursor.read_prefixed_u16_be().unwrap(), b"x");
        assert_eq!(cursor.read_prefixed_u16_le().unwrap(), b"y");
    }

    #[test]
    fn test_prefixed_read_restores_on_failure() {
        let data = [0x05, b'a'];
        let mut cursor = ByteCursor::new(&data);
        assert!(cursor.read_prefixed_u8().is_err());
        assert_eq!(cursor.tell(), 0);
    }
}
