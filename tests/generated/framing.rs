//! Framing constants and the fingerprint table shared by every generated dialect.

#![allow(unused_imports, dead_code)]

use mavgen::crc::FingerprintTable;

pub use mavgen::frame::{FrameError, FrameVersion, Packet};
pub use mavgen::payload::Payload;

pub const LEGACY_STX: u8 = 0xFE;
pub const EXTENDED_STX: u8 = 0xFD;
pub const LEGACY_HEADER_LEN: usize = 6;
pub const EXTENDED_HEADER_LEN: usize = 10;
pub const CHECKSUM_LEN: usize = 2;
pub const SIGNATURE_LEN: usize = 13;
pub const INCOMPAT_FLAG_SIGNED: u8 = 0x01;

/// (message id, dialect, message name, fingerprint) for every message of the run, ascending by id.
pub const MESSAGES: &[(u32, &str, &str, u8)] = &[
    (0, "minimal", "HEARTBEAT", 50),
    (4, "common", "PING", 85),
    (253, "common", "STATUSTEXT", 83),
];

pub fn fingerprints() -> FingerprintTable {
    MESSAGES.iter().map(|&(id, _, _, fp)| (id, fp)).collect()
}
