//! Byte-stream frame reader: finds frames in arbitrary input, drops corrupt ones and keeps
//! receive statistics.

use crate::crc::FingerprintTable;
use crate::frame::{ChecksumStatus, DecodedMessage, DispatchTable, FrameError, FrameVersion, Packet, ParsedFrame};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Receive counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiveStats {
    /// Frames returned to the caller (valid and unverified).
    pub frames: u64,
    pub bad_checksum: u64,
    /// Bytes discarded while looking for a start byte.
    pub skipped_bytes: u64,
    /// Frames whose id had no fingerprint.
    pub unverified: u64,
    /// Sequence numbers missed, summed over every (system, component) pair.
    pub lost: u64,
}

/// A frame and its absolute position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadFrame {
    pub frame: ParsedFrame,
    pub byte_range: (usize, usize),
}

#[derive(Debug)]
pub struct FrameReader {
    buf: Vec<u8>,
    /// Absolute input offset of `buf[0]`.
    offset: usize,
    table: FingerprintTable,
    stats: ReceiveStats,
    last_sequence: HashMap<(u8, u8), u8>,
    closed: bool,
}

impl FrameReader {
    pub fn new(table: FingerprintTable) -> Self {
        FrameReader {
            buf: Vec::new(),
            offset: 0,
            table,
            stats: ReceiveStats::default(),
            last_sequence: HashMap::new(),
            closed: false,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// No more input will arrive: an incomplete frame at the front is treated as a false
    /// start so the frames behind it can still be found.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn stats(&self) -> &ReceiveStats {
        &self.stats
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    fn discard(&mut self, n: usize) {
        self.buf.drain(..n);
        self.offset += n;
    }

    fn skip(&mut self, n: usize) {
        self.stats.skipped_bytes += n as u64;
        self.discard(n);
    }

    /// Next complete frame, or `None` when more input is needed.
    pub fn next_frame(&mut self) -> Option<ReadFrame> {
        loop {
            match self.buf.iter().position(|&b| FrameVersion::from_start_byte(b).is_some()) {
                Some(0) => {}
                Some(i) => self.skip(i),
                None => {
                    let n = self.buf.len();
                    self.skip(n);
                    return None;
                }
            }
            match Packet::parse(&self.buf, &self.table) {
                Ok((frame, used)) => {
                    // An unverified frame must end where another frame or the input ends.
                    if frame.status == ChecksumStatus::Unverified {
                        match self.buf.get(used) {
                            Some(&b) if FrameVersion::from_start_byte(b).is_none() => {
                                debug!(
                                    offset = self.offset,
                                    id = frame.packet.message_id,
                                    "unverified frame not followed by a start byte"
                                );
                                self.skip(1);
                                continue;
                            }
                            None if !self.closed => return None,
                            _ => {}
                        }
                    }
                    let start = self.offset;
                    self.discard(used);
                    self.account(&frame);
                    return Some(ReadFrame {
                        frame,
                        byte_range: (start, start + used),
                    });
                }
                Err(FrameError::Truncated { .. }) if !self.closed => return None,
                Err(e) => {
                    if let FrameError::BadChecksum { .. } = e {
                        self.stats.bad_checksum += 1;
                    }
                    warn!(offset = self.offset, error = %e, "dropping frame");
                    self.skip(1);
                }
            }
        }
    }

    fn account(&mut self, frame: &ParsedFrame) {
        self.stats.frames += 1;
        if frame.status == ChecksumStatus::Unverified {
            self.stats.unverified += 1;
        }
        let p = &frame.packet;
        let key = (p.system_id, p.component_id);
        if let Some(last) = self.last_sequence.insert(key, p.sequence) {
            let expected = last.wrapping_add(1);
            let gap = p.sequence.wrapping_sub(expected) as u64;
            if gap > 0 {
                debug!(system = p.system_id, component = p.component_id, gap, "sequence gap");
                self.stats.lost += gap;
            }
        }
    }
}

impl Iterator for FrameReader {
    type Item = ReadFrame;

    fn next(&mut self) -> Option<ReadFrame> {
        self.next_frame()
    }
}

#[derive(Debug)]
pub struct StreamMessage {
    pub packet: Packet,
    pub status: ChecksumStatus,
    /// `None` when the id is not in the dispatch table.
    pub message: Option<DecodedMessage>,
    pub byte_range: (usize, usize),
}

/// A frame that passed the checksum but whose payload could not be decoded.
#[derive(Debug)]
pub struct RemovedFrame {
    pub message_id: u32,
    pub byte_range: (usize, usize),
    pub reason: String,
}

#[derive(Debug)]
pub struct StreamDecodeResult {
    pub messages: Vec<StreamMessage>,
    pub removed: Vec<RemovedFrame>,
    pub stats: ReceiveStats,
}

/// Decode every frame in a complete buffer.
pub fn decode_stream(table: &DispatchTable, bytes: &[u8]) -> StreamDecodeResult {
    let mut reader = FrameReader::new(table.fingerprints().clone());
    reader.push(bytes);
    reader.close();

    let mut messages = Vec::new();
    let mut removed = Vec::new();
    while let Some(ReadFrame { frame, byte_range }) = reader.next_frame() {
        match table.decode(&frame.packet) {
            Ok(message) => messages.push(StreamMessage {
                packet: frame.packet,
                status: frame.status,
                message,
                byte_range,
            }),
            Err(e) => removed.push(RemovedFrame {
                message_id: frame.packet.message_id,
                byte_range,
                reason: e.to_string(),
            }),
        }
    }
    StreamDecodeResult {
        messages,
        removed,
        stats: reader.stats().clone(),
    }
}
