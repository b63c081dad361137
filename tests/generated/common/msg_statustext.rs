//! STATUSTEXT (id 253) from dialect `common`.

#![allow(unused_mut, unused_variables, unused_imports)]

use mavgen::codec::CodecError;
use mavgen::frame::{FrameVersion, Packet};
use mavgen::payload::{self, Payload};
use super::ENDIANNESS;

#[derive(Debug, Clone, PartialEq)]
pub struct Statustext {
    pub severity: u8,
    pub text: [u8; 50],
    pub id: u16,
    pub chunk_seq: u8,
}

impl Default for Statustext {
    fn default() -> Self {
        Statustext {
            severity: 0,
            text: [0; 50],
            id: 0,
            chunk_seq: 0,
        }
    }
}

impl Statustext {
    pub const ID: u32 = 253;
    pub const NAME: &'static str = "STATUSTEXT";
    pub const CRC_EXTRA: u8 = 83;
    /// Payload length of a legacy frame.
    pub const MIN_LEN: usize = 51;
    /// Payload length of an extended frame.
    pub const LEN: usize = 54;

    /// Encode into an unrouted packet. Legacy frames carry base fields only.
    pub fn pack(&self, version: FrameVersion) -> Packet {
        let mut p = Payload::with_capacity(Self::LEN, ENDIANNESS);
        p.put_u8(self.severity);
        p.put_bytes(&self.text);
        if version == FrameVersion::Extended {
            p.put_u16(self.id);
            p.put_u8(self.chunk_seq);
        }
        Packet::new(version, Self::ID, p.into_bytes())
    }

    /// Decode a payload. Missing trailing bytes of an extended payload read as zero.
    pub fn unpack(bytes: &[u8], version: FrameVersion) -> Result<Self, CodecError> {
        let mut p = Payload::reader(bytes, ENDIANNESS, version);
        let mut msg = Self::default();
        msg.severity = p.get_u8()?;
        p.get_bytes(&mut msg.text)?;
        if version == FrameVersion::Extended {
            msg.id = p.get_u16()?;
            msg.chunk_seq = p.get_u8()?;
        }
        Ok(msg)
    }

    /// `text` up to its first zero byte.
    pub fn text_str(&self) -> String {
        payload::text_of(&self.text)
    }

    /// Store `text` in `text`, truncated to 50 bytes and zero-padded.
    pub fn set_text(&mut self, text: &str) {
        payload::fill_text(&mut self.text, text);
    }
}
