//! CRC-16/MCRF4XX checksum, per-message fingerprints (`crc_extra`) and the fingerprint table.
//!
//! The checksum of a packet covers every byte after the start byte and is finished
//! with one extra update using the message's fingerprint.

use std::collections::BTreeMap;

pub const CRC_INIT: u16 = 0xFFFF;

/// Finalising a checksum needs a fingerprint for the message id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no fingerprint for message id {0}")]
pub struct UnknownFingerprint(pub u32);

/// Incremental CRC-16/MCRF4XX accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc16 {
    value: u16,
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc16 {
    pub fn new() -> Self {
        Crc16 { value: CRC_INIT }
    }

    pub fn start(&mut self) {
        self.value = CRC_INIT;
    }

    pub fn update(&mut self, byte: u8) {
        let mut tmp = byte ^ (self.value & 0xff) as u8;
        tmp ^= tmp << 4;
        let tmp = tmp as u16;
        self.value = (self.value >> 8) ^ (tmp << 8) ^ (tmp << 3) ^ (tmp >> 4);
    }

    pub fn update_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.update(b);
        }
    }

    /// Fold in the fingerprint of `message_id` and return the checksum.
    pub fn finish(&mut self, message_id: u32, table: &FingerprintTable) -> Result<u16, UnknownFingerprint> {
        let extra = table.lookup(message_id)?;
        self.update(extra);
        Ok(self.value)
    }

    pub fn value(&self) -> u16 {
        self.value
    }

    pub fn lsb(&self) -> u8 {
        (self.value & 0xff) as u8
    }

    pub fn msb(&self) -> u8 {
        (self.value >> 8) as u8
    }
}

/// One-shot checksum of `bytes` from the initial value.
pub fn checksum(bytes: &[u8]) -> u16 {
    let mut crc = Crc16::new();
    crc.update_bytes(bytes);
    crc.value()
}

/// Fingerprint of a message layout: name, then type name, field name and array length
/// of every base field in wire order. Extension fields are not covered.
pub fn fingerprint<'a, I>(message_name: &str, base_fields: I) -> u8
where
    I: IntoIterator<Item = (&'a str, &'a str, usize)>,
{
    let mut crc = Crc16::new();
    crc.update_bytes(message_name.as_bytes());
    crc.update(b' ');
    for (type_name, field_name, array_length) in base_fields {
        crc.update_bytes(type_name.as_bytes());
        crc.update(b' ');
        crc.update_bytes(field_name.as_bytes());
        crc.update(b' ');
        if array_length > 0 {
            crc.update(array_length as u8);
        }
    }
    crc.lsb() ^ crc.msb()
}

/// Message id to fingerprint byte, iterated in ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FingerprintTable {
    entries: BTreeMap<u32, u8>,
}

impl FingerprintTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry; returns the previous fingerprint if the id was already present.
    pub fn insert(&mut self, message_id: u32, fingerprint: u8) -> Option<u8> {
        self.entries.insert(message_id, fingerprint)
    }

    pub fn get(&self, message_id: u32) -> Option<u8> {
        self.entries.get(&message_id).copied()
    }

    pub fn lookup(&self, message_id: u32) -> Result<u8, UnknownFingerprint> {
        self.get(message_id).ok_or(UnknownFingerprint(message_id))
    }

    pub fn contains(&self, message_id: u32) -> bool {
        self.entries.contains_key(&message_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u8)> + '_ {
        self.entries.iter().map(|(&id, &fp)| (id, fp))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(u32, u8)> for FingerprintTable {
    fn from_iter<T: IntoIterator<Item = (u32, u8)>>(iter: T) -> Self {
        FingerprintTable {
            entries: iter.into_iter().collect(),
        }
    }
}
