//! # mavgen — message-schema compiler for a MAVLink-style telemetry protocol
//!
//! Compiles dialect definitions (typed, ordered fields per message, grouped into versioned
//! dialects) into per-message serialization code, plus the checksum and framing constants of
//! a binary point-to-point telemetry protocol.
//!
//! ## Pipeline
//!
//! - [`parser`] loads dialect text into the read-only [`ast`] model and seals each message's
//!   fingerprint and wire lengths.
//! - [`types`] resolves scalar type tags; [`layout`] plans each message's wire order,
//!   base/extension split and byte offsets.
//! - [`crc`] holds the CRC-16/MCRF4XX engine and the fingerprint table; [`frame`] lays out
//!   legacy (`0xFE`) and extended (`0xFD`) frames; [`stream`] finds frames in a byte stream.
//! - [`emit`] and [`dialect`] render plans and tables through a [`render::Render`]
//!   implementation into [`emit::Emission`]s.
//! - [`codec`] interprets a plan at run time over the same [`payload::Payload`] accessors the
//!   generated code uses.
//!
//! ## Example dialect
//!
//! ```text
//! dialect minimal;
//! version 3;
//!
//! message HEARTBEAT = 0 "Presence beacon" {
//!     type: uint8_t;
//!     autopilot: uint8_t;
//!     base_mode: uint8_t;
//!     custom_mode: uint32_t;
//!     system_status: uint8_t;
//!     mavlink_version: uint8_t_mavlink_version;
//! }
//! ```
//!
//! See `tests/integration.rs` for encode/decode and framing examples.

pub mod ast;
pub mod codec;
pub mod config;
pub mod crc;
pub mod dialect;
pub mod dump;
pub mod emit;
pub mod error;
pub mod frame;
pub mod layout;
pub mod parser;
pub mod payload;
pub mod render;
pub mod stream;
pub mod types;
pub mod value;

pub use ast::{Dialect, DialectFlags, Field, Message};
pub use codec::{Codec, CodecError, Endianness};
pub use config::GeneratorConfig;
pub use crc::{Crc16, FingerprintTable};
pub use dialect::{DialectSet, Generation, Generator};
pub use emit::Emission;
pub use error::GenError;
pub use frame::{DispatchTable, FrameError, FrameVersion, Packet};
pub use layout::{plan_message, LayoutPlan};
pub use parser::{load, parse};
pub use render::{Context, Render, TemplateRenderer};
pub use stream::{decode_stream, FrameReader};
pub use value::Value;
