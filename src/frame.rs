//! Packet framing for both protocol generations, and the id → decoder dispatch table.
//!
//! Legacy frame:   `FE len seq sys comp id | payload | crc_lo crc_hi`
//! Extended frame: `FD len incompat compat seq sys comp id0 id1 id2 | payload | crc_lo crc_hi [signature]`
//!
//! The checksum covers every header byte after the start byte, then the payload, then the
//! message's fingerprint byte.

use crate::codec::{Codec, CodecError, Endianness};
use crate::crc::{Crc16, FingerprintTable, UnknownFingerprint};
use crate::error::GenError;
use crate::layout::LayoutPlan;
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};

pub const LEGACY_STX: u8 = 0xFE;
pub const EXTENDED_STX: u8 = 0xFD;
/// Header bytes including the start byte.
pub const LEGACY_HEADER_LEN: usize = 6;
pub const EXTENDED_HEADER_LEN: usize = 10;
pub const CHECKSUM_LEN: usize = 2;
/// Link id (1) + timestamp (6) + truncated hash (6).
pub const SIGNATURE_LEN: usize = 13;
pub const MAX_PAYLOAD_LEN: usize = 255;
pub const MAX_LEGACY_ID: u32 = 0xFF;
pub const MAX_EXTENDED_ID: u32 = 0xFF_FFFF;
/// Incompat flag: a signature block follows the checksum.
pub const INCOMPAT_FLAG_SIGNED: u8 = 0x01;
/// Every incompat flag this implementation understands.
pub const KNOWN_INCOMPAT_FLAGS: u8 = INCOMPAT_FLAG_SIGNED;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameVersion {
    Legacy,
    Extended,
}

impl FrameVersion {
    pub fn from_start_byte(b: u8) -> Option<Self> {
        match b {
            LEGACY_STX => Some(FrameVersion::Legacy),
            EXTENDED_STX => Some(FrameVersion::Extended),
            _ => None,
        }
    }

    pub fn start_byte(self) -> u8 {
        match self {
            FrameVersion::Legacy => LEGACY_STX,
            FrameVersion::Extended => EXTENDED_STX,
        }
    }

    pub fn header_len(self) -> usize {
        match self {
            FrameVersion::Legacy => LEGACY_HEADER_LEN,
            FrameVersion::Extended => EXTENDED_HEADER_LEN,
        }
    }

    pub fn max_id(self) -> u32 {
        match self {
            FrameVersion::Legacy => MAX_LEGACY_ID,
            FrameVersion::Extended => MAX_EXTENDED_ID,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    #[error("bad start byte 0x{0:02x}")]
    BadStart(u8),
    #[error("unsupported incompat flags 0x{0:02x}")]
    UnsupportedIncompatFlags(u8),
    #[error("frame truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },
    #[error("message {message_id}: checksum 0x{found:04x}, expected 0x{expected:04x}")]
    BadChecksum { message_id: u32, expected: u16, found: u16 },
    #[error(transparent)]
    UnknownFingerprint(#[from] UnknownFingerprint),
    #[error("message id {id} does not fit a {version:?} frame")]
    IdOutOfRange { id: u32, version: FrameVersion },
    #[error("payload of {0} bytes exceeds 255")]
    PayloadTooLarge(usize),
    #[error("packet signing is not implemented")]
    SigningUnimplemented,
    #[error(transparent)]
    Codec(#[from] CodecError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub version: FrameVersion,
    /// Extended frames only.
    pub incompat_flags: u8,
    /// Extended frames only.
    pub compat_flags: u8,
    pub sequence: u8,
    pub system_id: u8,
    pub component_id: u8,
    pub message_id: u32,
    pub payload: Vec<u8>,
    /// Signature block as received; never generated locally.
    pub signature: Option<[u8; SIGNATURE_LEN]>,
}

impl Packet {
    pub fn new(version: FrameVersion, message_id: u32, payload: Vec<u8>) -> Self {
        Packet {
            version,
            incompat_flags: 0,
            compat_flags: 0,
            sequence: 0,
            system_id: 0,
            component_id: 0,
            message_id,
            payload,
            signature: None,
        }
    }

    pub fn with_route(mut self, sequence: u8, system_id: u8, component_id: u8) -> Self {
        self.sequence = sequence;
        self.system_id = system_id;
        self.component_id = component_id;
        self
    }

    pub fn is_signed(&self) -> bool {
        self.version == FrameVersion::Extended && self.incompat_flags & INCOMPAT_FLAG_SIGNED != 0
    }

    /// Header bytes after the start byte, in checksum feed order.
    fn header(&self) -> Result<Vec<u8>, FrameError> {
        if self.message_id > self.version.max_id() {
            return Err(FrameError::IdOutOfRange {
                id: self.message_id,
                version: self.version,
            });
        }
        if self.payload.len() > MAX_PAYLOAD_LEN {
            return Err(FrameError::PayloadTooLarge(self.payload.len()));
        }
        let len = self.payload.len() as u8;
        Ok(match self.version {
            FrameVersion::Legacy => vec![
                len,
                self.sequence,
                self.system_id,
                self.component_id,
                self.message_id as u8,
            ],
            FrameVersion::Extended => {
                let id = self.message_id.to_le_bytes();
                vec![
                    len,
                    self.incompat_flags,
                    self.compat_flags,
                    self.sequence,
                    self.system_id,
                    self.component_id,
                    id[0],
                    id[1],
                    id[2],
                ]
            }
        })
    }

    /// Checksum over header, payload and the message's fingerprint.
    pub fn checksum(&self, table: &FingerprintTable) -> Result<u16, FrameError> {
        let mut crc = Crc16::new();
        crc.update_bytes(&self.header()?);
        crc.update_bytes(&self.payload);
        Ok(crc.finish(self.message_id, table)?)
    }

    /// Serialise the frame. A signed frame without a received signature cannot be encoded
    /// because signatures are never generated.
    pub fn encode(&self, table: &FingerprintTable) -> Result<Vec<u8>, FrameError> {
        let header = self.header()?;
        let signature = match (self.is_signed(), &self.signature) {
            (true, Some(sig)) => Some(sig),
            (true, None) => return Err(FrameError::SigningUnimplemented),
            (false, _) => None,
        };
        let mut crc = Crc16::new();
        crc.update_bytes(&header);
        crc.update_bytes(&self.payload);
        let sum = crc.finish(self.message_id, table)?;

        let mut out = Vec::with_capacity(self.wire_len());
        out.push(self.version.start_byte());
        out.extend_from_slice(&header);
        out.extend_from_slice(&self.payload);
        out.extend_from_slice(&sum.to_le_bytes());
        if let Some(sig) = signature {
            out.extend_from_slice(sig);
        }
        Ok(out)
    }

    /// Request a signature. Always fails: signing is not implemented.
    pub fn sign(&mut self, _secret_key: &[u8; 32], _link_id: u8, _timestamp: u64) -> Result<(), FrameError> {
        Err(FrameError::SigningUnimplemented)
    }

    pub fn wire_len(&self) -> usize {
        let sig = if self.is_signed() { SIGNATURE_LEN } else { 0 };
        self.version.header_len() + self.payload.len() + CHECKSUM_LEN + sig
    }

    /// Parse one frame starting at `bytes[0]`. Returns the frame and the number of bytes it
    /// occupies. A frame whose id has no fingerprint is returned [`ChecksumStatus::Unverified`].
    pub fn parse(bytes: &[u8], table: &FingerprintTable) -> Result<(ParsedFrame, usize), FrameError> {
        let first = *bytes.first().ok_or(FrameError::Truncated {
            needed: 1,
            available: 0,
        })?;
        let version = FrameVersion::from_start_byte(first).ok_or(FrameError::BadStart(first))?;
        let header_len = version.header_len();
        if bytes.len() < header_len {
            return Err(FrameError::Truncated {
                needed: header_len,
                available: bytes.len(),
            });
        }
        let len = bytes[1] as usize;
        let mut packet = match version {
            FrameVersion::Legacy => Packet {
                sequence: bytes[2],
                system_id: bytes[3],
                component_id: bytes[4],
                ..Packet::new(version, bytes[5] as u32, Vec::new())
            },
            FrameVersion::Extended => Packet {
                incompat_flags: bytes[2],
                compat_flags: bytes[3],
                sequence: bytes[4],
                system_id: bytes[5],
                component_id: bytes[6],
                ..Packet::new(
                    version,
                    u32::from_le_bytes([bytes[7], bytes[8], bytes[9], 0]),
                    Vec::new(),
                )
            },
        };
        let unknown_flags = packet.incompat_flags & !KNOWN_INCOMPAT_FLAGS;
        if unknown_flags != 0 {
            return Err(FrameError::UnsupportedIncompatFlags(unknown_flags));
        }
        let sig_len = if packet.is_signed() { SIGNATURE_LEN } else { 0 };
        let crc_at = header_len + len;
        let total = crc_at + CHECKSUM_LEN + sig_len;
        if bytes.len() < total {
            return Err(FrameError::Truncated {
                needed: total,
                available: bytes.len(),
            });
        }
        packet.payload = bytes[header_len..crc_at].to_vec();
        if sig_len > 0 {
            let mut sig = [0u8; SIGNATURE_LEN];
            sig.copy_from_slice(&bytes[crc_at + CHECKSUM_LEN..total]);
            packet.signature = Some(sig);
        }

        let found = u16::from_le_bytes([bytes[crc_at], bytes[crc_at + 1]]);
        let status = match table.get(packet.message_id) {
            Some(extra) => {
                let mut crc = Crc16::new();
                crc.update_bytes(&bytes[1..crc_at]);
                crc.update(extra);
                if crc.value() != found {
                    return Err(FrameError::BadChecksum {
                        message_id: packet.message_id,
                        expected: crc.value(),
                        found,
                    });
                }
                ChecksumStatus::Valid
            }
            None => ChecksumStatus::Unverified,
        };
        Ok((ParsedFrame { packet, status }, total))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumStatus {
    Valid,
    /// No fingerprint for the id: the checksum was consumed but not checked.
    Unverified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFrame {
    pub packet: Packet,
    pub status: ChecksumStatus,
}

/// A message decoded through the dispatch table.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    pub id: u32,
    pub name: String,
    pub dialect: String,
    pub values: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchEntry {
    pub dialect: String,
    pub name: String,
    pub fingerprint: u8,
    pub endianness: Endianness,
    pub plan: LayoutPlan,
}

/// Message id → decoder, across every dialect of a run.
#[derive(Debug, Clone, Default)]
pub struct DispatchTable {
    entries: BTreeMap<u32, DispatchEntry>,
    by_name: HashMap<String, u32>,
    fingerprints: FingerprintTable,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a message; an id or name already present is a configuration error.
    pub fn insert(&mut self, entry: DispatchEntry) -> Result<(), GenError> {
        let id = entry.plan.message_id;
        if let Some(existing) = self.entries.get(&id) {
            return Err(GenError::DuplicateMessageId {
                id,
                first: existing.name.clone(),
                second: entry.name,
            });
        }
        if let Some(&first) = self.by_name.get(&entry.name) {
            return Err(GenError::DuplicateMessageName {
                name: entry.name,
                first,
                second: id,
            });
        }
        self.fingerprints.insert(id, entry.fingerprint);
        self.by_name.insert(entry.name.clone(), id);
        self.entries.insert(id, entry);
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<&DispatchEntry> {
        self.entries.get(&id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&DispatchEntry> {
        self.by_name.get(name).and_then(|id| self.entries.get(id))
    }

    /// Entries in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &DispatchEntry)> + '_ {
        self.entries.iter().map(|(&id, e)| (id, e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn fingerprints(&self) -> &FingerprintTable {
        &self.fingerprints
    }

    /// Decode a packet's payload. An id with no registered message yields `Ok(None)`.
    pub fn decode(&self, packet: &Packet) -> Result<Option<DecodedMessage>, CodecError> {
        let entry = match self.entries.get(&packet.message_id) {
            Some(e) => e,
            None => return Ok(None),
        };
        let values = Codec::new(entry.endianness).decode(&entry.plan, &packet.payload, packet.version)?;
        Ok(Some(DecodedMessage {
            id: packet.message_id,
            name: entry.name.clone(),
            dialect: entry.dialect.clone(),
            values,
        }))
    }

    /// Encode `values` as the payload of message `name` and wrap it in an unrouted packet.
    pub fn pack(
        &self,
        name: &str,
        values: &HashMap<String, Value>,
        version: FrameVersion,
    ) -> Result<Packet, FrameError> {
        let entry = self
            .get_by_name(name)
            .ok_or_else(|| CodecError::UnknownMessage(name.to_string()))?;
        let id = entry.plan.message_id;
        if id > version.max_id() {
            return Err(FrameError::IdOutOfRange { id, version });
        }
        let payload = Codec::new(entry.endianness).encode(&entry.plan, values, version)?;
        Ok(Packet::new(version, id, payload))
    }
}
