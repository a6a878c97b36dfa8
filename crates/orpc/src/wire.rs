// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Little-endian reader/writer used by every codec in the crate.
//!
//! Reads never go past the end of the slice: a short read reports
//! [`CodecError::TruncatedBuffer`] with the offset where it stopped.

use crate::error::{CodecError, CodecResult};

/// Generate read methods for primitive types.
///
/// Each generated method checks bounds, copies N bytes, converts them with
/// `from_le_bytes()` and advances the offset.
macro_rules! impl_read_le {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> CodecResult<$type> {
            let mut bytes = [0u8; $size];
            bytes.copy_from_slice(self.take($size)?);
            Ok(<$type>::from_le_bytes(bytes))
        }
    };
}

/// Generate write methods for primitive types.
macro_rules! impl_write_le {
    ($name:ident, $type:ty) => {
        pub fn $name(&mut self, value: $type) {
            self.buffer.extend_from_slice(&value.to_le_bytes());
        }
    };
}

/// Bounds-checked reader over a borrowed buffer.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    /// Start reading at `offset` (clamped reads still fail with `TruncatedBuffer`).
    pub fn at(buffer: &'a [u8], offset: usize) -> Self {
        Self { buffer, offset }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.buffer.len()
    }

    /// Borrow the next `len` bytes and advance past them.
    pub fn take(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let end = match self.offset.checked_add(len) {
            Some(end) if end <= self.buffer.len() => end,
            _ => {
                return Err(CodecError::TruncatedBuffer {
                    offset: self.offset,
                    needed: len,
                    available: self.remaining(),
                })
            }
        };
        let slice = &self.buffer[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    /// Fail with `TruncatedBuffer` unless `len` more bytes are available.
    pub fn require(&self, len: usize) -> CodecResult<()> {
        if len > self.remaining() {
            return Err(CodecError::TruncatedBuffer {
                offset: self.offset,
                needed: len,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    impl_read_le!(read_u8, u8, 1);
    impl_read_le!(read_u16, u16, 2);
    impl_read_le!(read_u32, u32, 4);
    impl_read_le!(read_u64, u64, 8);
    impl_read_le!(read_u128, u128, 16);
    impl_read_le!(read_i8, i8, 1);
    impl_read_le!(read_i16, i16, 2);
    impl_read_le!(read_i32, i32, 4);
    impl_read_le!(read_i64, i64, 8);

    pub fn read_f32(&mut self) -> CodecResult<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> CodecResult<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Read a `u32` byte length followed by that many UTF-8 bytes.
    pub fn read_str(&mut self) -> CodecResult<String> {
        let at = self.offset;
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| CodecError::invalid(at, e.to_string()))
    }
}

/// Append-only writer over a caller-owned `Vec<u8>`.
#[derive(Debug)]
pub struct WireWriter<'a> {
    buffer: &'a mut Vec<u8>,
}

impl<'a> WireWriter<'a> {
    pub fn new(buffer: &'a mut Vec<u8>) -> Self {
        Self { buffer }
    }

    /// Bytes written so far (including anything already in the buffer).
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    impl_write_le!(write_u8, u8);
    impl_write_le!(write_u16, u16);
    impl_write_le!(write_u32, u32);
    impl_write_le!(write_u64, u64);
    impl_write_le!(write_u128, u128);
    impl_write_le!(write_i8, i8);
    impl_write_le!(write_i16, i16);
    impl_write_le!(write_i32, i32);
    impl_write_le!(write_i64, i64);

    pub fn write_f32(&mut self, value: f32) {
        self.write_u32(value.to_bits());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.write_u64(value.to_bits());
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Write a `u32` length prefix, failing if `len` does not fit.
    pub fn write_len(&mut self, len: usize) -> CodecResult<()> {
        let len = u32::try_from(len).map_err(|_| CodecError::SizeOverflow {
            offset: self.buffer.len(),
        })?;
        self.write_u32(len);
        Ok(())
    }

    /// Write a length-prefixed UTF-8 string (embedded NUL allowed).
    pub fn write_str(&mut self, value: &str) -> CodecResult<()> {
        self.write_len(value.len())?;
        self.write_bytes(value.as_bytes());
        Ok(())
    }
}

/// Encoded size of a length-prefixed string.
pub(crate) fn str_size(value: &str) -> usize {
    4 + value.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_U16: u16 = 0xCDEF;
    const TEST_U32: u32 = 0x1234_5678;
    const TEST_U64: u64 = 0x1122_3344_5566_7788;

    #[test]
    fn test_write_then_read_primitives() {
        let mut buffer = Vec::new();
        let mut writer = WireWriter::new(&mut buffer);
        writer.write_u8(0xAB);
        writer.write_u16(TEST_U16);
        writer.write_u32(TEST_U32);
        writer.write_u64(TEST_U64);
        writer.write_f64(std::f64::consts::PI);
        assert_eq!(writer.len(), 1 + 2 + 4 + 8 + 8);

        let mut reader = WireReader::new(&buffer);
        assert_eq!(reader.read_u8().expect("u8"), 0xAB);
        assert_eq!(reader.read_u16().expect("u16"), TEST_U16);
        assert_eq!(reader.read_u32().expect("u32"), TEST_U32);
        assert_eq!(reader.read_u64().expect("u64"), TEST_U64);
        assert_eq!(
            reader.read_f64().expect("f64").to_bits(),
            std::f64::consts::PI.to_bits()
        );
        assert!(reader.is_eof());
    }

    #[test]
    fn test_little_endian_layout() {
        let mut buffer = Vec::new();
        WireWriter::new(&mut buffer).write_u32(TEST_U32);
        assert_eq!(buffer, [0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn test_read_overflow_reports_offset() {
        let buffer = [0u8; 3];
        let mut reader = WireReader::new(&buffer);
        assert_eq!(reader.read_u16().expect("u16"), 0);

        let err = reader.read_u32().unwrap_err();
        assert_eq!(
            err,
            CodecError::TruncatedBuffer {
                offset: 2,
                needed: 4,
                available: 1,
            }
        );
        // Failed reads do not move the cursor.
        assert_eq!(reader.offset(), 2);
    }

    #[test]
    fn test_take_with_huge_length_does_not_wrap() {
        let buffer = [0u8; 4];
        let mut reader = WireReader::at(&buffer, 2);
        assert!(matches!(
            reader.take(usize::MAX),
            Err(CodecError::TruncatedBuffer { .. })
        ));
    }

    #[test]
    fn test_string_with_embedded_nul() {
        let mut buffer = Vec::new();
        WireWriter::new(&mut buffer)
            .write_str("a\0b")
            .expect("write str");
        assert_eq!(buffer.len(), str_size("a\0b"));

        let mut reader = WireReader::new(&buffer);
        assert_eq!(reader.read_str().expect("read str"), "a\0b");
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let buffer = [2, 0, 0, 0, 0xff, 0xfe];
        let err = WireReader::new(&buffer).read_str().unwrap_err();
        assert!(matches!(err, CodecError::InvalidPayload { offset: 0, .. }));
    }
}
