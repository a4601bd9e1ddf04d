use bytes::{BufMut, Bytes, BytesMut};

use crate::varint;

/// Growable little-endian output buffer for the primitive encodings.
#[derive(Debug, Default)]
pub struct ByteBuffer {
    pub buffer: BytesMut,
}

impl ByteBuffer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        ByteBuffer {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn put_u8(&mut self, byte: u8) {
        self.buffer.put_u8(byte);
    }

    pub fn put_u16(&mut self, value: u16) {
        self.buffer.put_u16_le(value);
    }

    pub fn put_i16(&mut self, value: i16) {
        self.buffer.put_i16_le(value);
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buffer.put_u32_le(value);
    }

    pub fn put_i32(&mut self, value: i32) {
        self.buffer.put_i32_le(value);
    }

    pub fn put_f64(&mut self, value: f64) {
        self.buffer.put_f64_le(value);
    }

    /// Writes an `i16` byte length followed by the bytes, cut at `i16::MAX`.
    pub fn put_string(&mut self, value: &str) {
        let bytes = value.as_bytes();
        let len = bytes.len().min(i16::MAX as usize);
        self.put_i16(len as i16);
        self.buffer.put_slice(&bytes[..len]);
    }

    pub fn put_count(&mut self, value: u64) {
        varint::put_count(&mut self.buffer, value);
    }

    pub fn put_scount(&mut self, value: i64) {
        varint::put_scount(&mut self.buffer, value);
    }

    /// Overwrites four bytes at `pos`, used to back-patch item lengths.
    pub fn patch_u32(&mut self, pos: usize, value: u32) {
        self.buffer[pos..pos + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[must_use]
    pub fn freeze(self) -> Bytes {
        self.buffer.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width_little_endian() {
        let mut buf = ByteBuffer::new(16);
        buf.put_u16(0x0102);
        buf.put_i32(-2);
        buf.put_u8(7);
        assert_eq!(&buf.buffer[..], &[0x02, 0x01, 0xFE, 0xFF, 0xFF, 0xFF, 7]);
    }

    #[test]
    fn test_patch_u32() {
        let mut buf = ByteBuffer::new(8);
        buf.put_u32(0);
        buf.put_u32(0xAABBCCDD);
        buf.patch_u32(0, 0x11223344);
        assert_eq!(&buf.buffer[..4], &[0x44, 0x33, 0x22, 0x11]);
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn test_string_prefix() {
        let mut buf = ByteBuffer::default();
        buf.put_string("Hello World");
        assert_eq!(&buf.buffer[..2], &11i16.to_le_bytes());
        assert_eq!(&buf.buffer[2..], b"Hello World");
    }
}
