//! Format decoded packets and values for display (`decode_pcap --dump`).

use crate::frame::{ChecksumStatus, DecodedMessage, DispatchTable, FrameVersion, Packet};
use crate::value::Value;

/// Raw scalar string.
pub fn format_scalar_raw(v: &Value) -> String {
    match v {
        Value::U8(x) => format!("{}", x),
        Value::U16(x) => format!("{}", x),
        Value::U32(x) => format!("{}", x),
        Value::U64(x) => format!("{}", x),
        Value::I8(x) => format!("{}", x),
        Value::I16(x) => format!("{}", x),
        Value::I32(x) => format!("{}", x),
        Value::I64(x) => format!("{}", x),
        Value::Float(x) => format!("{}", x),
        Value::Double(x) => format!("{}", x),
        Value::Char(c) if c.is_ascii_graphic() || *c == b' ' => format!("'{}'", *c as char),
        Value::Char(c) => format!("'\\x{:02x}'", c),
        Value::Text(s) => format!("{:?}", s),
        Value::List(_) => format!("{:?}", v),
    }
}

pub fn hex_string(b: &[u8]) -> String {
    b.iter().map(|x| format!("{:02x}", x)).collect::<Vec<_>>().join(" ")
}

/// Format a value for display; arrays longer than one element go multi-line.
pub fn value_to_dump(v: &Value, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    match v {
        Value::List(lst) if lst.is_empty() => format!("{}[]", pad),
        Value::List(lst) if lst.len() == 1 => value_to_dump(&lst[0], indent),
        Value::List(lst) => {
            let mut lines: Vec<String> = vec![format!("{}[", pad)];
            for (i, item) in lst.iter().enumerate() {
                let sub = value_to_dump(item, indent + 1);
                lines.push(format!("{}  [{}] {}", pad, i, sub.trim_start()));
            }
            lines.push(format!("{}]", pad));
            lines.join("\n")
        }
        scalar => format!("{}{}", pad, format_scalar_raw(scalar)),
    }
}

/// One-line frame header summary.
pub fn packet_summary(packet: &Packet, status: ChecksumStatus) -> String {
    let version = match packet.version {
        FrameVersion::Legacy => "v1",
        FrameVersion::Extended => "v2",
    };
    let mut line = format!(
        "{} seq={} sys={} comp={} id={} len={}",
        version,
        packet.sequence,
        packet.system_id,
        packet.component_id,
        packet.message_id,
        packet.payload.len()
    );
    if packet.is_signed() {
        line.push_str(" signed");
    }
    if status == ChecksumStatus::Unverified {
        line.push_str(" unverified");
    }
    line
}

/// Multi-line dump of a decoded message, fields in wire order.
pub fn dump_message(table: &DispatchTable, msg: &DecodedMessage) -> String {
    let mut lines = vec![format!("{}::{} ({}) {{", msg.dialect, msg.name, msg.id)];
    let order: Vec<&str> = match table.get(msg.id) {
        Some(entry) => entry.plan.steps.iter().map(|s| s.field.as_str()).collect(),
        None => {
            let mut keys: Vec<&str> = msg.values.keys().map(String::as_str).collect();
            keys.sort_unstable();
            keys
        }
    };
    for name in order {
        if let Some(v) = msg.values.get(name) {
            lines.push(format!("  {}: {}", name, value_to_dump(v, 1).trim_start()));
        }
    }
    lines.push("}".to_string());
    lines.join("\n")
}
