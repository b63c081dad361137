//! PING (id 4) from dialect `common`.

#![allow(unused_mut, unused_variables, unused_imports)]

use mavgen::codec::CodecError;
use mavgen::frame::{FrameVersion, Packet};
use mavgen::payload::{self, Payload};
use super::ENDIANNESS;

#[derive(Debug, Clone, PartialEq)]
pub struct Ping {
    pub time_usec: u64,
    pub seq: u32,
    pub target: [u8; 2],
}

impl Default for Ping {
    fn default() -> Self {
        Ping {
            time_usec: 0,
            seq: 0,
            target: [0; 2],
        }
    }
}

impl Ping {
    pub const ID: u32 = 4;
    pub const NAME: &'static str = "PING";
    pub const CRC_EXTRA: u8 = 85;
    /// Payload length of a legacy frame.
    pub const MIN_LEN: usize = 14;
    /// Payload length of an extended frame.
    pub const LEN: usize = 14;

    /// Encode into an unrouted packet. Legacy frames carry base fields only.
    pub fn pack(&self, version: FrameVersion) -> Packet {
        let mut p = Payload::with_capacity(Self::LEN, ENDIANNESS);
        p.put_u64(self.time_usec);
        p.put_u32(self.seq);
        for v in self.target.iter() { p.put_u8(*v); }
        Packet::new(version, Self::ID, p.into_bytes())
    }

    /// Decode a payload. Missing trailing bytes of an extended payload read as zero.
    pub fn unpack(bytes: &[u8], version: FrameVersion) -> Result<Self, CodecError> {
        let mut p = Payload::reader(bytes, ENDIANNESS, version);
        let mut msg = Self::default();
        msg.time_usec = p.get_u64()?;
        msg.seq = p.get_u32()?;
        for v in msg.target.iter_mut() { *v = p.get_u8()?; }
        Ok(msg)
    }
}
