//! Dialect `minimal`.

#![allow(unused_imports)]

use mavgen::codec::{CodecError, Endianness};
use mavgen::crc::FingerprintTable;
use mavgen::frame::{FrameVersion, Packet};

pub mod msg_heartbeat;
pub mod enum_mav_state;

pub const NAME: &str = "minimal";
pub const VERSION: Option<u8> = Some(3);
pub const ENDIANNESS: Endianness = Endianness::Little;
pub const CRC_EXTRA_ENABLED: bool = true;

/// (message id, fingerprint), ascending by id, includes merged.
pub const MESSAGE_CRCS: &[(u32, u8)] = &[
    (0, 50),
];

/// (message id, legacy payload length, extended payload length), ascending by id.
pub const MESSAGE_LENGTHS: &[(u32, usize, usize)] = &[
    (0, 9, 9),
];

pub fn fingerprints() -> FingerprintTable {
    MESSAGE_CRCS.iter().copied().collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Heartbeat(msg_heartbeat::Heartbeat),
}

impl Message {
    pub fn id(&self) -> u32 {
        match self {
            Message::Heartbeat(_) => 0,
        }
    }

    pub fn pack(&self, version: FrameVersion) -> Packet {
        match self {
            Message::Heartbeat(m) => m.pack(version),
        }
    }

    /// Decode a packet; an id outside this dialect yields `Ok(None)`.
    pub fn unpack(packet: &Packet) -> Result<Option<Self>, CodecError> {
        Ok(Some(match packet.message_id {
            0 => Message::Heartbeat(msg_heartbeat::Heartbeat::unpack(&packet.payload, packet.version)?),
            _ => return Ok(None),
        }))
    }
}
