//! Generation tests: emitted modules, table contents, writing output and determinism.

use mavgen::frame::{FrameVersion, Packet};
use mavgen::render::RenderError;
use mavgen::{parse, Context, DialectSet, GenError, Generation, Generator, GeneratorConfig, Render, TemplateRenderer, Value};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

// Output of `run(1)` below, checked in and compiled as part of this test.
#[allow(dead_code)]
#[path = "generated/mod.rs"]
mod generated;

use generated::common::msg_ping::Ping;
use generated::common::msg_statustext::Statustext;
use generated::minimal::msg_heartbeat::Heartbeat;

const MINIMAL: &str = r#"
dialect minimal;
version 3;
enum MAV_STATE "System state" { UNINIT = 0; ACTIVE = 4 "Active"; }
message HEARTBEAT = 0 "Presence beacon" {
    type: uint8_t "Vehicle type";
    autopilot: uint8_t;
    base_mode: uint8_t;
    custom_mode: uint32_t;
    system_status: uint8_t;
    mavlink_version: uint8_t_mavlink_version;
}
"#;

const COMMON: &str = r#"
dialect common;
include "minimal";
message STATUSTEXT = 253 {
    severity: uint8_t;
    text: char[50];
    extensions;
    id: uint16_t;
    chunk_seq: uint8_t;
}
message PING = 4 { time_usec: uint64_t; seq: uint32_t; target: uint8_t[2]; }
"#;

fn set() -> DialectSet {
    let mut set = DialectSet::new();
    set.insert(parse(MINIMAL).expect("minimal")).expect("insert");
    set.insert(parse(COMMON).expect("common")).expect("insert");
    set
}

fn run(jobs: usize) -> Generation {
    let config = GeneratorConfig {
        jobs,
        ..GeneratorConfig::default()
    };
    Generator::new(config, TemplateRenderer::new()).run(&set()).expect("run")
}

fn content<'a>(g: &'a Generation, path: &str) -> &'a str {
    g.emissions()
        .find(|e| e.path == path)
        .map(|e| e.content.as_str())
        .unwrap_or_else(|| panic!("no emission {}", path))
}

#[test]
fn emission_paths() {
    let g = run(1);
    let paths: BTreeSet<&str> = g.emissions().map(|e| e.path.as_str()).collect();
    let expected: BTreeSet<&str> = [
        "minimal/msg_heartbeat.rs",
        "minimal/enum_mav_state.rs",
        "minimal/mod.rs",
        "common/msg_statustext.rs",
        "common/msg_ping.rs",
        "common/mod.rs",
        "framing.rs",
        "mod.rs",
    ]
    .into_iter()
    .collect();
    assert_eq!(paths, expected);
}

#[test]
fn heartbeat_module() {
    let g = run(1);
    let c = content(&g, "minimal/msg_heartbeat.rs");
    assert!(c.starts_with("//! HEARTBEAT (id 0) from dialect `minimal`."));
    assert!(c.contains("//! Presence beacon"));
    assert!(c.contains("pub struct Heartbeat {"));
    assert!(c.contains("    /// Vehicle type\n    pub r#type: u8,"));
    assert!(c.contains("pub const CRC_EXTRA: u8 = 50;"));
    assert!(c.contains("pub const MIN_LEN: usize = 9;"));
    assert!(c.contains("pub const LEN: usize = 9;"));
    assert!(c.contains("use mavgen::payload::{self, Payload};"));
    // Wire order: the u32 goes first.
    let mode = c.find("p.put_u32(self.custom_mode);").expect("custom_mode encode");
    let ty = c.find("p.put_u8(self.r#type);").expect("type encode");
    assert!(mode < ty);
    assert!(!c.contains("if version == FrameVersion::Extended"));
}

#[test]
fn extension_fields_are_gated_on_frame_version() {
    let g = run(1);
    let c = content(&g, "common/msg_statustext.rs");
    assert!(c.contains("pub const MIN_LEN: usize = 51;"));
    assert!(c.contains("pub const LEN: usize = 54;"));
    assert!(c.contains("if version == FrameVersion::Extended {\n            p.put_u16(self.id);"));
    assert!(c.contains("pub text: [u8; 50],"));
    assert!(c.contains("pub fn text_str(&self) -> String"));
    assert!(c.contains("pub fn set_text(&mut self, text: &str)"));
    assert!(c.contains("p.get_bytes(&mut msg.text)?;"));
}

#[test]
fn arrays_use_element_accessors() {
    let g = run(1);
    let c = content(&g, "common/msg_ping.rs");
    assert!(c.contains("pub target: [u8; 2],"));
    assert!(c.contains("target: [0; 2],"));
    assert!(c.contains("for v in self.target.iter() { p.put_u8(*v); }"));
    assert!(c.contains("for v in msg.target.iter_mut() { *v = p.get_u8()?; }"));
}

#[test]
fn dialect_module_tables_include_closure() {
    let g = run(1);
    let c = content(&g, "common/mod.rs");
    assert!(c.contains("pub mod msg_statustext;\npub mod msg_ping;\n"));
    assert!(!c.contains("pub mod msg_heartbeat;"));
    let heartbeat = c.find("    (0, 50),").expect("heartbeat row");
    let ping = c.find("    (4, ").expect("ping row");
    let text = c.find("    (253, ").expect("statustext row");
    assert!(heartbeat < ping && ping < text);
    assert!(c.contains("    (253, 51, 54),"));
    assert!(c.contains("Heartbeat(super::minimal::msg_heartbeat::Heartbeat),"));
    assert!(c.contains("Ping(msg_ping::Ping),"));
    assert!(c.contains("pub const VERSION: Option<u8> = None;"));

    let m = content(&g, "minimal/mod.rs");
    assert!(m.contains("pub const VERSION: Option<u8> = Some(3);"));
    assert!(m.contains("pub const ENDIANNESS: Endianness = Endianness::Little;"));
    assert!(m.contains("pub mod enum_mav_state;"));
}

#[test]
fn enum_module() {
    let g = run(1);
    let c = content(&g, "minimal/enum_mav_state.rs");
    assert!(c.starts_with("//! MAV_STATE: System state"));
    assert!(c.contains("/// Active\npub const ACTIVE: u64 = 4;"));
    assert!(c.contains("    (\"UNINIT\", 0),"));
}

#[test]
fn framing_and_root() {
    let g = run(1);
    let f = content(&g, "framing.rs");
    assert!(f.contains("pub const LEGACY_STX: u8 = 0xFE;"));
    assert!(f.contains("pub const EXTENDED_STX: u8 = 0xFD;"));
    assert!(f.contains("pub const SIGNATURE_LEN: usize = 13;"));
    assert!(f.contains("    (0, \"minimal\", \"HEARTBEAT\", 50),"));
    let r = content(&g, "mod.rs");
    assert_eq!(r, "//! Generated message definitions.\n\npub mod framing;\npub mod minimal;\npub mod common;\n");
    assert_eq!(g.dispatch.len(), 3);
}

#[test]
fn generation_is_deterministic() {
    let a = run(1);
    let b = run(1);
    let c = run(3);
    let a: Vec<_> = a.emissions().cloned().collect();
    assert_eq!(a, b.emissions().cloned().collect::<Vec<_>>());
    assert_eq!(a, c.emissions().cloned().collect::<Vec<_>>());
}

#[test]
fn write_to_creates_tree() {
    let dir = tempfile::tempdir().expect("tempdir");
    let g = run(1);
    let n = g.write_to(dir.path()).expect("write");
    assert_eq!(n, 8);
    let heartbeat = fs::read_to_string(dir.path().join("minimal/msg_heartbeat.rs")).expect("read");
    assert_eq!(heartbeat, content(&g, "minimal/msg_heartbeat.rs"));
    assert!(dir.path().join("framing.rs").is_file());
}

#[test]
fn failed_run_writes_nothing() {
    let mut set = DialectSet::new();
    set.insert(parse(COMMON).expect("common")).expect("insert");
    let g = Generator::new(GeneratorConfig::default(), TemplateRenderer::new());
    assert!(matches!(g.run(&set), Err(GenError::UnknownInclude { .. })));
}

#[test]
fn runtime_crate_is_configurable() {
    let config = GeneratorConfig {
        runtime_crate: "crate::runtime".to_string(),
        ..GeneratorConfig::default()
    };
    let g = Generator::new(config, TemplateRenderer::new()).run(&set()).expect("run");
    assert!(content(&g, "framing.rs").contains("use crate::runtime::crc::FingerprintTable;"));
}

/// Renders through the template engine and stamps a banner on every file.
struct Banner;

impl Render for Banner {
    fn render(&self, template: &str, ctx: &Context) -> Result<String, RenderError> {
        let body = TemplateRenderer::new().render(template, ctx)?;
        Ok(format!("// @generated\n{}", body))
    }
}

#[test]
fn custom_renderer() {
    let g = Generator::new(GeneratorConfig::default(), Banner).run(&set()).expect("run");
    assert!(g.emissions().all(|e| e.content.starts_with("// @generated\n")));
}

// ==================== Generated code ====================

#[test]
fn generation_matches_checked_in_sources() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/generated");
    let g = run(1);
    let mut n = 0;
    for e in g.emissions() {
        let on_disk = fs::read_to_string(dir.join(&e.path)).unwrap_or_else(|err| panic!("{}: {}", e.path, err));
        assert_eq!(on_disk, e.content, "{} is stale", e.path);
        n += 1;
    }
    assert_eq!(n, 8);
}

#[test]
fn generated_statustext_round_trip() {
    let mut msg = Statustext {
        severity: 6,
        id: 7,
        chunk_seq: 1,
        ..Statustext::default()
    };
    msg.set_text("AB");
    assert_eq!(msg.text_str(), "AB");

    let legacy = msg.pack(FrameVersion::Legacy);
    assert_eq!(legacy.message_id, Statustext::ID);
    assert_eq!(legacy.payload.len(), 51);
    assert_eq!(&legacy.payload[..4], &[6, b'A', b'B', 0]);
    let back = Statustext::unpack(&legacy.payload, FrameVersion::Legacy).expect("unpack legacy");
    assert_eq!(back.severity, 6);
    assert_eq!(back.text_str(), "AB");
    assert_eq!((back.id, back.chunk_seq), (0, 0));

    let extended = msg.pack(FrameVersion::Extended);
    assert_eq!(extended.payload.len(), Statustext::LEN);
    assert_eq!(Statustext::unpack(&extended.payload, FrameVersion::Extended).expect("unpack"), msg);

    // Short extended payload: the missing extension bytes read as zero.
    let short = Statustext::unpack(&legacy.payload, FrameVersion::Extended).expect("unpack short");
    assert_eq!((short.id, short.text_str().as_str()), (0, "AB"));
    assert!(Statustext::unpack(&legacy.payload[..50], FrameVersion::Legacy).is_err());
}

#[test]
fn generated_text_helpers_truncate_and_pad() {
    let mut msg = Statustext::default();
    let long = "x".repeat(60);
    msg.set_text(&long);
    assert_eq!(msg.text_str(), "x".repeat(50));
    msg.set_text("short");
    assert_eq!(msg.text_str(), "short");
    assert!(msg.text[5..].iter().all(|&b| b == 0));
}

#[test]
fn generated_heartbeat_frame_matches_runtime_codec() {
    let hb = Heartbeat {
        r#type: 1,
        autopilot: 3,
        base_mode: 1,
        custom_mode: 5,
        system_status: 4,
        mavlink_version: 3,
    };
    let table = generated::common::fingerprints();
    let bytes = hb
        .pack(FrameVersion::Legacy)
        .with_route(0, 1, 1)
        .encode(&table)
        .expect("encode");
    assert_eq!(
        bytes,
        vec![0xFE, 0x09, 0x00, 0x01, 0x01, 0x00, 0x05, 0x00, 0x00, 0x00, 0x01, 0x03, 0x01, 0x04, 0x03, 0xAD, 0x98]
    );

    let (parsed, _) = Packet::parse(&bytes, &table).expect("parse");
    match generated::common::Message::unpack(&parsed.packet).expect("unpack") {
        Some(generated::common::Message::Heartbeat(back)) => assert_eq!(back, hb),
        other => panic!("expected heartbeat, got {:?}", other),
    }
}

#[test]
fn generated_ping_matches_runtime_codec() {
    let ping = Ping {
        time_usec: 0x0102_0304_0506_0708,
        seq: 9,
        target: [1, 2],
    };
    let mut values = HashMap::new();
    values.insert("time_usec".to_string(), Value::U64(0x0102_0304_0506_0708));
    values.insert("seq".to_string(), Value::U32(9));
    values.insert("target".to_string(), Value::List(vec![Value::U8(1), Value::U8(2)]));
    let table = set().dispatch_table(&["common"]).expect("dispatch");
    let runtime = table.pack("PING", &values, FrameVersion::Extended).expect("pack");
    assert_eq!(ping.pack(FrameVersion::Extended), runtime);

    let message = generated::common::Message::Ping(ping.clone());
    assert_eq!(message.id(), 4);
    assert_eq!(
        generated::common::Message::unpack(&message.pack(FrameVersion::Legacy)).expect("unpack"),
        Some(message)
    );
}

#[test]
fn generated_dispatch_ignores_unknown_ids() {
    let packet = Packet::new(FrameVersion::Extended, 0xFF_FFFF, vec![1, 2, 3]);
    assert_eq!(generated::common::Message::unpack(&packet), Ok(None));
    let heartbeat_only = Packet::new(FrameVersion::Legacy, 4, vec![0; 14]);
    assert_eq!(generated::minimal::Message::unpack(&heartbeat_only), Ok(None));
}

#[test]
fn generated_tables() {
    assert_eq!(generated::framing::MESSAGES.len(), 3);
    assert_eq!(generated::minimal::VERSION, Some(3));
    assert_eq!(generated::common::MESSAGE_LENGTHS[2], (253, 51, 54));
    assert_eq!(generated::minimal::enum_mav_state::name_of(4), Some("ACTIVE"));
    assert_eq!(generated::framing::fingerprints(), generated::common::fingerprints());
}
