//! Dialect `common`.

#![allow(unused_imports)]

use mavgen::codec::{CodecError, Endianness};
use mavgen::crc::FingerprintTable;
use mavgen::frame::{FrameVersion, Packet};

pub mod msg_statustext;
pub mod msg_ping;

pub const NAME: &str = "common";
pub const VERSION: Option<u8> = None;
pub const ENDIANNESS: Endianness = Endianness::Little;
pub const CRC_EXTRA_ENABLED: bool = true;

/// (message id, fingerprint), ascending by id, includes merged.
pub const MESSAGE_CRCS: &[(u32, u8)] = &[
    (0, 50),
    (4, 85),
    (253, 83),
];

/// (message id, legacy payload length, extended payload length), ascending by id.
pub const MESSAGE_LENGTHS: &[(u32, usize, usize)] = &[
    (0, 9, 9),
    (4, 14, 14),
    (253, 51, 54),
];

pub fn fingerprints() -> FingerprintTable {
    MESSAGE_CRCS.iter().copied().collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Heartbeat(super::minimal::msg_heartbeat::Heartbeat),
    Ping(msg_ping::Ping),
    Statustext(msg_statustext::Statustext),
}

impl Message {
    pub fn id(&self) -> u32 {
        match self {
            Message::Heartbeat(_) => 0,
            Message::Ping(_) => 4,
            Message::Statustext(_) => 253,
        }
    }

    pub fn pack(&self, version: FrameVersion) -> Packet {
        match self {
            Message::Heartbeat(m) => m.pack(version),
            Message::Ping(m) => m.pack(version),
            Message::Statustext(m) => m.pack(version),
        }
    }

    /// Decode a packet; an id outside this dialect yields `Ok(None)`.
    pub fn unpack(packet: &Packet) -> Result<Option<Self>, CodecError> {
        Ok(Some(match packet.message_id {
            0 => Message::Heartbeat(super::minimal::msg_heartbeat::Heartbeat::unpack(&packet.payload, packet.version)?),
            4 => Message::Ping(msg_ping::Ping::unpack(&packet.payload, packet.version)?),
            253 => Message::Statustext(msg_statustext::Statustext::unpack(&packet.payload, packet.version)?),
            _ => return Ok(None),
        }))
    }
}
