//! Position/limit-tracked byte cursor used by all packet code.
use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Result, SrcQueryError};

/// A growable byte buffer with a read/write cursor and a logical end of
/// valid data, in the style of `java.nio.ByteBuffer`.
///
/// Invariant: `0 <= position <= limit <= capacity`. All multi-byte reads
/// are little-endian, matching the GoldSrc/Source wire protocols. Not
/// shared across tasks; every socket session owns exactly one.
#[derive(Debug)]
pub struct ByteBuffer {
    data: Vec<u8>,
    position: usize,
    limit: usize,
}

impl ByteBuffer {
    /// Creates a zero-filled buffer of capacity `n` with `limit = n`.
    pub fn allocate(n: usize) -> Self {
        ByteBuffer {
            data: vec![0; n],
            position: 0,
            limit: n,
        }
    }

    /// Wraps existing data, with `limit` at its length.
    pub fn wrap(bytes: Vec<u8>) -> Self {
        let limit = bytes.len();
        ByteBuffer {
            data: bytes,
            position: 0,
            limit,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes left between `position` and `limit`.
    pub fn remaining(&self) -> usize {
        self.limit - self.position
    }

    /// Resets `position` to the start without touching `limit`.
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// Resets `position` to 0 and `limit` to the full capacity.
    pub fn clear(&mut self) {
        self.position = 0;
        self.limit = self.data.len();
    }

    /// Caps the logical end of valid data. `position` is pulled back if it
    /// would end up past the new limit.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.min(self.data.len());
        self.position = self.position.min(self.limit);
    }

    /// The valid data, from the start of the buffer up to `limit`.
    pub fn array(&self) -> &[u8] {
        &self.data[..self.limit]
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        if self.remaining() < n {
            return Err(SrcQueryError::BufferUnderflow);
        }
        let start = self.position;
        self.position += n;
        Ok(&self.data[start..self.position])
    }

    /// Consumes and returns everything between `position` and `limit`.
    pub fn get(&mut self) -> Vec<u8> {
        let rest = self.data[self.position..self.limit].to_vec();
        self.position = self.limit;
        rest
    }

    pub fn get_byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn get_short(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn get_long(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn get_unsigned_long(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn get_float(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    /// Reads a NUL-terminated string, excluding the terminator. Running
    /// into `limit` before a NUL byte is an underflow.
    pub fn get_string(&mut self) -> Result<String> {
        let rest = &self.data[self.position..self.limit];
        let nul = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or(SrcQueryError::BufferUnderflow)?;
        let s = std::str::from_utf8(&rest[..nul])?.to_string();
        self.position += nul + 1;
        Ok(s)
    }

    /// Writes `bytes` at `position`, growing the backing storage if
    /// needed, and advances `position` past them. `limit` is raised to
    /// cover the written data.
    pub fn put(&mut self, bytes: &[u8]) {
        let end = self.position + bytes.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[self.position..end].copy_from_slice(bytes);
        self.position = end;
        if self.position > self.limit {
            self.limit = self.position;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_reads() {
        let mut buf = ByteBuffer::wrap(vec![
            0x78, 0x56, 0x34, 0x12, // i32
            0x39, 0x30, // u16
            0x00, 0x00, 0x80, 0x3f, // f32 1.0
        ]);
        assert_eq!(buf.get_long().unwrap(), 0x12345678);
        assert_eq!(buf.get_short().unwrap(), 12345);
        assert_eq!(buf.get_float().unwrap(), 1.0);
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn negative_long() {
        let mut buf = ByteBuffer::wrap(vec![0xfe, 0xff, 0xff, 0xff]);
        assert_eq!(buf.get_long().unwrap(), -2);
    }

    #[test]
    fn string_stops_at_nul() {
        let mut buf = ByteBuffer::wrap(b"de_dust2\0tail".to_vec());
        assert_eq!(buf.get_string().unwrap(), "de_dust2");
        assert_eq!(buf.get(), b"tail");
    }

    #[test]
    fn string_without_nul_underflows() {
        let mut buf = ByteBuffer::wrap(b"unterminated".to_vec());
        assert!(matches!(
            buf.get_string(),
            Err(SrcQueryError::BufferUnderflow)
        ));
    }

    #[test]
    fn read_past_limit_underflows() {
        let mut buf = ByteBuffer::wrap(vec![1, 2]);
        assert!(matches!(
            buf.get_long(),
            Err(SrcQueryError::BufferUnderflow)
        ));
    }

    #[test]
    fn put_then_rewind_reads_back() {
        let mut buf = ByteBuffer::allocate(4);
        buf.clear();
        buf.put(&[0xff, 0xff, 0xff, 0xff, 0x41]);
        assert_eq!(buf.position(), 5);
        buf.rewind();
        buf.set_limit(5);
        assert_eq!(buf.get_long().unwrap(), -1);
        assert_eq!(buf.get_byte().unwrap(), 0x41);
    }

    #[test]
    fn clear_restores_full_capacity() {
        let mut buf = ByteBuffer::allocate(8);
        buf.set_limit(3);
        assert_eq!(buf.remaining(), 3);
        buf.clear();
        assert_eq!(buf.remaining(), 8);
        assert_eq!(buf.position(), 0);
    }
}
