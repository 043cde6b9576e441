//! Binary primitives of the native protocol.
//!
//! Wire format:
//! - unsigned integers used as lengths, counts and enum tags: LEB128 varint
//! - strings: varint byte length, then raw UTF-8 (no terminator)
//! - fixed-width numbers: little-endian
//!
//! `Encoder` writes into any `BufMut` (the connection write buffer or a
//! standalone `BytesMut`), so encoding itself never touches I/O.

use bytes::{Buf, BufMut, BytesMut};

use super::error::DecodeError;

/// Maximum encoded size of a u64 varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Writes protocol primitives into a buffer.
#[derive(Debug, Default)]
pub struct Encoder<B = BytesMut> {
    buf: B,
}

impl<B: BufMut> Encoder<B> {
    pub fn new(buf: B) -> Self {
        Self { buf }
    }

    pub fn get_ref(&self) -> &B {
        &self.buf
    }

    pub fn get_mut(&mut self) -> &mut B {
        &mut self.buf
    }

    pub fn into_inner(self) -> B {
        self.buf
    }

    /// Unsigned LEB128 varint.
    #[inline]
    pub fn uvarint(&mut self, mut v: u64) {
        while v >= 0x80 {
            self.buf.put_u8((v as u8) | 0x80);
            v >>= 7;
        }
        self.buf.put_u8(v as u8);
    }

    /// Varint length prefix followed by the UTF-8 bytes.
    #[inline]
    pub fn string(&mut self, s: &str) {
        self.uvarint(s.len() as u64);
        self.buf.put_slice(s.as_bytes());
    }

    /// Raw bytes, no prefix.
    #[inline]
    pub fn raw(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// `n` zero bytes.
    #[inline]
    pub fn zeros(&mut self, n: usize) {
        self.buf.put_bytes(0, n);
    }

    #[inline]
    pub fn bool(&mut self, v: bool) {
        self.buf.put_u8(v as u8);
    }

    #[inline]
    pub fn i8(&mut self, v: i8) {
        self.buf.put_i8(v);
    }

    #[inline]
    pub fn i16(&mut self, v: i16) {
        self.buf.put_i16_le(v);
    }

    #[inline]
    pub fn i32(&mut self, v: i32) {
        self.buf.put_i32_le(v);
    }

    #[inline]
    pub fn i64(&mut self, v: i64) {
        self.buf.put_i64_le(v);
    }

    #[inline]
    pub fn u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    #[inline]
    pub fn u16(&mut self, v: u16) {
        self.buf.put_u16_le(v);
    }

    #[inline]
    pub fn u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    #[inline]
    pub fn u64(&mut self, v: u64) {
        self.buf.put_u64_le(v);
    }

    #[inline]
    pub fn f32(&mut self, v: f32) {
        self.buf.put_f32_le(v);
    }

    #[inline]
    pub fn f64(&mut self, v: f64) {
        self.buf.put_f64_le(v);
    }
}

/// Reads protocol primitives from a byte slice.
#[derive(Debug)]
pub struct Decoder<'a> {
    buf: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn need(&self, needed: usize) -> Result<(), DecodeError> {
        if self.buf.remaining() < needed {
            return Err(DecodeError::UnexpectedEof {
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn uvarint(&mut self) -> Result<u64, DecodeError> {
        let mut result = 0u64;
        let mut shift = 0;
        loop {
            self.need(1)?;
            let byte = self.buf.get_u8();
            if shift == 63 && byte > 1 {
                return Err(DecodeError::VarintOverflow);
            }
            result |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift > 63 {
                return Err(DecodeError::VarintOverflow);
            }
        }
    }

    pub fn raw(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        self.need(len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    pub fn string(&mut self) -> Result<String, DecodeError> {
        let len = self.uvarint()?;
        let len = usize::try_from(len).map_err(|_| DecodeError::UnexpectedEof {
            needed: usize::MAX,
            remaining: self.buf.remaining(),
        })?;
        let bytes = self.raw(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8)
    }

    pub fn i8(&mut self) -> Result<i8, DecodeError> {
        self.need(1)?;
        Ok(self.buf.get_i8())
    }

    pub fn i16(&mut self) -> Result<i16, DecodeError> {
        self.need(2)?;
        Ok(self.buf.get_i16_le())
    }

    pub fn i32(&mut self) -> Result<i32, DecodeError> {
        self.need(4)?;
        Ok(self.buf.get_i32_le())
    }

    pub fn i64(&mut self) -> Result<i64, DecodeError> {
        self.need(8)?;
        Ok(self.buf.get_i64_le())
    }

    pub fn u8(&mut self) -> Result<u8, DecodeError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn u16(&mut self) -> Result<u16, DecodeError> {
        self.need(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn u32(&mut self) -> Result<u32, DecodeError> {
        self.need(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn u64(&mut self) -> Result<u64, DecodeError> {
        self.need(8)?;
        Ok(self.buf.get_u64_le())
    }

    pub fn f32(&mut self) -> Result<f32, DecodeError> {
        self.need(4)?;
        Ok(self.buf.get_f32_le())
    }

    pub fn f64(&mut self) -> Result<f64, DecodeError> {
        self.need(8)?;
        Ok(self.buf.get_f64_le())
    }

    /// Fails if anything is left unread.
    pub fn finish(self) -> Result<(), DecodeError> {
        match self.buf.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(f: impl FnOnce(&mut Encoder)) -> Vec<u8> {
        let mut enc: Encoder = Encoder::default();
        f(&mut enc);
        enc.into_inner().to_vec()
    }

    #[test]
    fn test_uvarint_encoding() {
        assert_eq!(encoded(|e| e.uvarint(0)), [0x00]);
        assert_eq!(encoded(|e| e.uvarint(1)), [0x01]);
        assert_eq!(encoded(|e| e.uvarint(127)), [0x7F]);
        assert_eq!(encoded(|e| e.uvarint(128)), [0x80, 0x01]);
        assert_eq!(encoded(|e| e.uvarint(300)), [0xAC, 0x02]);
        assert_eq!(encoded(|e| e.uvarint(u64::MAX)).len(), MAX_VARINT_LEN);
    }

    #[test]
    fn test_uvarint_decoding() {
        let mut dec = Decoder::new(&[0xAC, 0x02, 0x05]);
        assert_eq!(dec.uvarint().unwrap(), 300);
        assert_eq!(dec.uvarint().unwrap(), 5);
        assert_eq!(dec.remaining(), 0);

        let max = encoded(|e| e.uvarint(u64::MAX));
        assert_eq!(Decoder::new(&max).uvarint().unwrap(), u64::MAX);
    }

    #[test]
    fn test_uvarint_overflow() {
        let bytes = [0xFF; 11];
        assert_eq!(
            Decoder::new(&bytes).uvarint(),
            Err(DecodeError::VarintOverflow)
        );
    }

    #[test]
    fn test_string_is_length_prefixed() {
        let bytes = encoded(|e| e.string("SELECT 1"));
        assert_eq!(bytes[0], 8);
        assert_eq!(&bytes[1..], b"SELECT 1");

        assert_eq!(encoded(|e| e.string("")), [0x00]);
    }

    #[test]
    fn test_fixed_width_is_little_endian() {
        assert_eq!(encoded(|e| e.i32(-1)), [0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(encoded(|e| e.u16(0x0102)), [0x02, 0x01]);
        assert_eq!(encoded(|e| e.f64(1.0)), 1.0f64.to_le_bytes());
    }

    #[test]
    fn test_decoder_eof() {
        let mut dec = Decoder::new(&[0x01, 0x02]);
        assert_eq!(
            dec.u32(),
            Err(DecodeError::UnexpectedEof {
                needed: 4,
                remaining: 2
            })
        );
    }

    #[test]
    fn test_decoder_string_and_finish() {
        let bytes = encoded(|e| {
            e.string("héllo");
            e.u8(7);
        });
        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.string().unwrap(), "héllo");
        assert_eq!(dec.u8().unwrap(), 7);
        assert!(dec.finish().is_ok());

        let mut dec = Decoder::new(&[0x02, 0xFF, 0xFE]);
        assert_eq!(dec.string(), Err(DecodeError::InvalidUtf8));

        let dec = Decoder::new(&[0x00]);
        assert_eq!(dec.finish(), Err(DecodeError::TrailingBytes(1)));
    }
}
