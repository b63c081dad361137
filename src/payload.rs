//! Payload buffer with typed accessors.
//!
//! This is the runtime half of the type resolver: every scalar type maps to a
//! `put_<acc>` / `get_<acc>` pair here (see [`ScalarType::accessor`](crate::types::ScalarType::accessor)).
//! The plan-driven [`Codec`](crate::codec::Codec) and the generated message modules both go
//! through these accessors, so they agree byte for byte.

use crate::codec::{CodecError, Endianness};
use crate::frame::FrameVersion;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Growable payload buffer with a read cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    buf: Vec<u8>,
    index: usize,
    endianness: Endianness,
    /// Reads past the end yield zero bytes (extended frames may arrive truncated).
    zero_fill: bool,
}

macro_rules! multi_byte_accessors {
    ($($put:ident, $get:ident, $ty:ty, $n:expr, $write:ident, $read:ident;)*) => {
        $(
            pub fn $put(&mut self, v: $ty) {
                let mut b = [0u8; $n];
                match self.endianness {
                    Endianness::Little => LittleEndian::$write(&mut b, v),
                    Endianness::Big => BigEndian::$write(&mut b, v),
                }
                self.buf.extend_from_slice(&b);
            }

            pub fn $get(&mut self) -> Result<$ty, CodecError> {
                let mut b = [0u8; $n];
                self.take(&mut b)?;
                Ok(match self.endianness {
                    Endianness::Little => LittleEndian::$read(&b),
                    Endianness::Big => BigEndian::$read(&b),
                })
            }
        )*
    };
}

impl Payload {
    pub fn new(endianness: Endianness) -> Self {
        Self::with_capacity(0, endianness)
    }

    pub fn with_capacity(capacity: usize, endianness: Endianness) -> Self {
        Payload {
            buf: Vec::with_capacity(capacity),
            index: 0,
            endianness,
            zero_fill: false,
        }
    }

    /// Reader over received payload bytes. Extended frames read missing trailing bytes as zero;
    /// legacy frames must carry every byte they are decoded for.
    pub fn reader(bytes: &[u8], endianness: Endianness, version: FrameVersion) -> Self {
        Payload {
            buf: bytes.to_vec(),
            index: 0,
            endianness,
            zero_fill: version == FrameVersion::Extended,
        }
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn position(&self) -> usize {
        self.index
    }

    pub fn reset_index(&mut self) {
        self.index = 0;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn take(&mut self, out: &mut [u8]) -> Result<(), CodecError> {
        let end = self.index + out.len();
        if end <= self.buf.len() {
            out.copy_from_slice(&self.buf[self.index..end]);
        } else if self.zero_fill {
            let avail = self.buf.len().saturating_sub(self.index).min(out.len());
            if avail > 0 {
                out[..avail].copy_from_slice(&self.buf[self.index..self.index + avail]);
            }
            out[avail..].fill(0);
        } else {
            return Err(CodecError::Truncated {
                needed: end,
                available: self.buf.len(),
            });
        }
        self.index = end;
        Ok(())
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn get_u8(&mut self) -> Result<u8, CodecError> {
        let mut b = [0u8; 1];
        self.take(&mut b)?;
        Ok(b[0])
    }

    pub fn put_i8(&mut self, v: i8) {
        self.buf.push(v as u8);
    }

    pub fn get_i8(&mut self) -> Result<i8, CodecError> {
        Ok(self.get_u8()? as i8)
    }

    multi_byte_accessors! {
        put_u16, get_u16, u16, 2, write_u16, read_u16;
        put_i16, get_i16, i16, 2, write_i16, read_i16;
        put_u32, get_u32, u32, 4, write_u32, read_u32;
        put_i32, get_i32, i32, 4, write_i32, read_i32;
        put_u64, get_u64, u64, 8, write_u64, read_u64;
        put_i64, get_i64, i64, 8, write_i64, read_i64;
        put_f32, get_f32, f32, 4, write_f32, read_f32;
        put_f64, get_f64, f64, 8, write_f64, read_f64;
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn get_bytes(&mut self, out: &mut [u8]) -> Result<(), CodecError> {
        self.take(out)
    }

    /// Write `text` into a `capacity`-byte slot: at most `capacity` bytes are copied, the rest is zero.
    pub fn put_text(&mut self, text: &str, capacity: usize) {
        let start = self.buf.len();
        self.buf.resize(start + capacity, 0);
        fill_text(&mut self.buf[start..], text);
    }

    /// Read a `capacity`-byte slot and keep the bytes before the first zero.
    pub fn get_text(&mut self, capacity: usize) -> Result<String, CodecError> {
        let mut slot = vec![0u8; capacity];
        self.take(&mut slot)?;
        Ok(text_of(&slot))
    }
}

/// Copy up to `slot.len()` bytes of `text` into `slot` and zero the remainder.
pub fn fill_text(slot: &mut [u8], text: &str) {
    let bytes = text.as_bytes();
    let n = bytes.len().min(slot.len());
    slot[..n].copy_from_slice(&bytes[..n]);
    slot[n..].fill(0);
}

/// Logical text of a fixed-capacity slot: everything before the first zero byte.
pub fn text_of(slot: &[u8]) -> String {
    let end = slot.iter().position(|&b| b == 0).unwrap_or(slot.len());
    String::from_utf8_lossy(&slot[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_layout() {
        let mut p = Payload::new(Endianness::Little);
        p.put_u32(5);
        p.put_i16(-2);
        assert_eq!(p.as_bytes(), &[5, 0, 0, 0, 0xfe, 0xff]);
        p.reset_index();
        assert_eq!(p.get_u32().unwrap(), 5);
        assert_eq!(p.get_i16().unwrap(), -2);
    }

    #[test]
    fn big_endian_layout() {
        let mut p = Payload::new(Endianness::Big);
        p.put_u16(0x1234);
        p.put_f32(1.5);
        assert_eq!(&p.as_bytes()[..2], &[0x12, 0x34]);
        assert_eq!(&p.as_bytes()[2..], &1.5f32.to_be_bytes());
    }

    #[test]
    fn text_is_zero_padded_and_truncated_at_first_zero() {
        let mut p = Payload::new(Endianness::Little);
        p.put_text("AB", 5);
        assert_eq!(p.as_bytes(), b"AB\0\0\0");
        p.reset_index();
        assert_eq!(p.get_text(5).unwrap(), "AB");

        assert_eq!(text_of(b"A\0B\0"), "A");
        let mut slot = [0xffu8; 3];
        fill_text(&mut slot, "TOOLONG");
        assert_eq!(&slot, b"TOO");
    }

    #[test]
    fn legacy_reader_rejects_short_payload() {
        let mut p = Payload::reader(&[1, 2], Endianness::Little, FrameVersion::Legacy);
        assert!(matches!(
            p.get_u32(),
            Err(CodecError::Truncated { needed: 4, available: 2 })
        ));
    }

    #[test]
    fn extended_reader_zero_fills() {
        let mut p = Payload::reader(&[1], Endianness::Little, FrameVersion::Extended);
        assert_eq!(p.get_u16().unwrap(), 1);
        assert_eq!(p.get_u32().unwrap(), 0);
        assert_eq!(p.position(), 6);
    }
}
