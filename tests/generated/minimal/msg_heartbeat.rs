//! HEARTBEAT (id 0) from dialect `minimal`.
//!
//! Presence beacon

#![allow(unused_mut, unused_variables, unused_imports)]

use mavgen::codec::CodecError;
use mavgen::frame::{FrameVersion, Packet};
use mavgen::payload::{self, Payload};
use super::ENDIANNESS;

#[derive(Debug, Clone, PartialEq)]
pub struct Heartbeat {
    /// Vehicle type
    pub r#type: u8,
    pub autopilot: u8,
    pub base_mode: u8,
    pub custom_mode: u32,
    pub system_status: u8,
    pub mavlink_version: u8,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Heartbeat {
            r#type: 0,
            autopilot: 0,
            base_mode: 0,
            custom_mode: 0,
            system_status: 0,
            mavlink_version: 0,
        }
    }
}

impl Heartbeat {
    pub const ID: u32 = 0;
    pub const NAME: &'static str = "HEARTBEAT";
    pub const CRC_EXTRA: u8 = 50;
    /// Payload length of a legacy frame.
    pub const MIN_LEN: usize = 9;
    /// Payload length of an extended frame.
    pub const LEN: usize = 9;

    /// Encode into an unrouted packet. Legacy frames carry base fields only.
    pub fn pack(&self, version: FrameVersion) -> Packet {
        let mut p = Payload::with_capacity(Self::LEN, ENDIANNESS);
        p.put_u32(self.custom_mode);
        p.put_u8(self.r#type);
        p.put_u8(self.autopilot);
        p.put_u8(self.base_mode);
        p.put_u8(self.system_status);
        p.put_u8(self.mavlink_version);
        Packet::new(version, Self::ID, p.into_bytes())
    }

    /// Decode a payload. Missing trailing bytes of an extended payload read as zero.
    pub fn unpack(bytes: &[u8], version: FrameVersion) -> Result<Self, CodecError> {
        let mut p = Payload::reader(bytes, ENDIANNESS, version);
        let mut msg = Self::default();
        msg.custom_mode = p.get_u32()?;
        msg.r#type = p.get_u8()?;
        msg.autopilot = p.get_u8()?;
        msg.base_mode = p.get_u8()?;
        msg.system_status = p.get_u8()?;
        msg.mavlink_version = p.get_u8()?;
        Ok(msg)
    }
}
