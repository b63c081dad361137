//! Message and dialect emission: layout plans and tables rendered into Rust source.
//!
//! Generated modules import the runtime crate's `payload`, `frame` and `codec` modules instead of
//! carrying copies of them, so emitted code and [`Codec`](crate::codec::Codec) share one
//! set of accessors.

use crate::ast::{Dialect, EnumDef, Message};
use crate::error::GenError;
use crate::frame;
use crate::layout::{LayoutPlan, Step, StepKind};
use crate::render::{Context, Render};
use tracing::debug;

/// One generated output unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    /// Path relative to the output directory, `/`-separated.
    pub path: String,
    pub content: String,
}

/// One row of a fingerprint/dispatch table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub id: u32,
    pub dialect: String,
    pub name: String,
    pub fingerprint: u8,
    pub min_len: usize,
    pub len: usize,
}

pub const MESSAGE_TEMPLATE: &str = r#"//! ${name} (id ${id}) from dialect `${dialect}`.
${{doc://!
//! ${line}
}}
#![allow(unused_mut, unused_variables, unused_imports)]

use ${runtime}::codec::CodecError;
use ${runtime}::frame::{FrameVersion, Packet};
use ${runtime}::payload::{self, Payload};
use super::ENDIANNESS;

#[derive(Debug, Clone, PartialEq)]
pub struct ${struct_name} {
${{fields:${doc}    pub ${ident}: ${rust_type},
}}}

impl Default for ${struct_name} {
    fn default() -> Self {
        ${struct_name} {
${{fields:            ${ident}: ${zero},
}}        }
    }
}

impl ${struct_name} {
    pub const ID: u32 = ${id};
    pub const NAME: &'static str = "${name}";
    pub const CRC_EXTRA: u8 = ${crc_extra};
    /// Payload length of a legacy frame.
    pub const MIN_LEN: usize = ${min_len};
    /// Payload length of an extended frame.
    pub const LEN: usize = ${len};

    /// Encode into an unrouted packet. Legacy frames carry base fields only.
    pub fn pack(&self, version: FrameVersion) -> Packet {
        let mut p = Payload::with_capacity(Self::LEN, ENDIANNESS);
${{encode_base:        ${line}
}}${{extensions:        if version == FrameVersion::Extended {
${{encode_ext:            ${line}
}}        }
}}        Packet::new(version, Self::ID, p.into_bytes())
    }

    /// Decode a payload. Missing trailing bytes of an extended payload read as zero.
    pub fn unpack(bytes: &[u8], version: FrameVersion) -> Result<Self, CodecError> {
        let mut p = Payload::reader(bytes, ENDIANNESS, version);
        let mut msg = Self::default();
${{decode_base:        ${line}
}}${{extensions:        if version == FrameVersion::Extended {
${{decode_ext:            ${line}
}}        }
}}        Ok(msg)
    }
${{texts:
    /// `${field}` up to its first zero byte.
    pub fn ${getter}(&self) -> String {
        payload::text_of(&self.${ident})
    }

    /// Store `text` in `${field}`, truncated to ${capacity} bytes and zero-padded.
    pub fn ${setter}(&mut self, text: &str) {
        payload::fill_text(&mut self.${ident}, text);
    }
}}}
"#;

pub const ENUM_TEMPLATE: &str = r#"//! ${name}${summary}

${{entries:${doc}pub const ${ident}: u64 = ${value};
}}
/// (name, value) of every entry, in declaration order.
pub const ENTRIES: &[(&str, u64)] = &[
${{entries:    ("${name}", ${value}),
}}];

pub fn name_of(value: u64) -> Option<&'static str> {
    ENTRIES.iter().find(|(_, v)| *v == value).map(|(n, _)| *n)
}
"#;

pub const DIALECT_TEMPLATE: &str = r#"//! Dialect `${name}`.

#![allow(unused_imports)]

use ${runtime}::codec::{CodecError, Endianness};
use ${runtime}::crc::FingerprintTable;
use ${runtime}::frame::{FrameVersion, Packet};

${{modules:pub mod ${module};
}}
pub const NAME: &str = "${name}";
pub const VERSION: Option<u8> = ${version};
pub const ENDIANNESS: Endianness = Endianness::${endianness};
pub const CRC_EXTRA_ENABLED: bool = ${crc_extra};

/// (message id, fingerprint), ascending by id, includes merged.
pub const MESSAGE_CRCS: &[(u32, u8)] = &[
${{rows:    (${id}, ${fingerprint}),
}}];

/// (message id, legacy payload length, extended payload length), ascending by id.
pub const MESSAGE_LENGTHS: &[(u32, usize, usize)] = &[
${{rows:    (${id}, ${min_len}, ${len}),
}}];

pub fn fingerprints() -> FingerprintTable {
    MESSAGE_CRCS.iter().copied().collect()
}
${{dispatch:
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
${{rows:    ${variant}(${path}),
}}}

impl Message {
    pub fn id(&self) -> u32 {
        match self {
${{rows:            Message::${variant}(_) => ${id},
}}        }
    }

    pub fn pack(&self, version: FrameVersion) -> Packet {
        match self {
${{rows:            Message::${variant}(m) => m.pack(version),
}}        }
    }

    /// Decode a packet; an id outside this dialect yields `Ok(None)`.
    pub fn unpack(packet: &Packet) -> Result<Option<Self>, CodecError> {
        Ok(Some(match packet.message_id {
${{rows:            ${id} => Message::${variant}(${path}::unpack(&packet.payload, packet.version)?),
}}            _ => return Ok(None),
        }))
    }
}
}}"#;

pub const FRAMING_TEMPLATE: &str = r#"//! Framing constants and the fingerprint table shared by every generated dialect.

#![allow(unused_imports, dead_code)]

use ${runtime}::crc::FingerprintTable;

pub use ${runtime}::frame::{FrameError, FrameVersion, Packet};
pub use ${runtime}::payload::Payload;

pub const LEGACY_STX: u8 = ${legacy_stx};
pub const EXTENDED_STX: u8 = ${extended_stx};
pub const LEGACY_HEADER_LEN: usize = ${legacy_header_len};
pub const EXTENDED_HEADER_LEN: usize = ${extended_header_len};
pub const CHECKSUM_LEN: usize = ${checksum_len};
pub const SIGNATURE_LEN: usize = ${signature_len};
pub const INCOMPAT_FLAG_SIGNED: u8 = ${signed_flag};

/// (message id, dialect, message name, fingerprint) for every message of the run, ascending by id.
pub const MESSAGES: &[(u32, &str, &str, u8)] = &[
${{rows:    (${id}, "${dialect}", "${name}", ${fingerprint}),
}}];

pub fn fingerprints() -> FingerprintTable {
    MESSAGES.iter().map(|&(id, _, _, fp)| (id, fp)).collect()
}
"#;

pub const ROOT_TEMPLATE: &str = r#"//! Generated message definitions.

pub mod framing;
${{dialects:pub mod ${module};
}}"#;

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return", "static", "struct",
    "trait", "true", "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final", "macro",
    "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// Field or module name as a Rust identifier: keywords become raw identifiers, except the
/// ones raw syntax does not accept, which get a trailing underscore.
pub fn rust_ident(name: &str) -> String {
    match name {
        "self" | "Self" | "super" | "crate" | "_" => format!("{}_", name),
        n if RUST_KEYWORDS.contains(&n) => format!("r#{}", n),
        n => n.to_string(),
    }
}

/// `SYS_STATUS` → `SysStatus`.
pub fn camel_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let lower = part.to_ascii_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(c) => c.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

pub fn module_name(name: &str) -> String {
    rust_ident(&name.to_ascii_lowercase())
}

pub fn message_module(name: &str) -> String {
    format!("msg_{}", name.to_ascii_lowercase())
}

pub fn enum_module(name: &str) -> String {
    format!("enum_{}", name.to_ascii_lowercase())
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn doc_attr(indent: &str, text: Option<&str>) -> String {
    match text.map(one_line) {
        Some(t) if !t.is_empty() => format!("{}/// {}\n", indent, t),
        _ => String::new(),
    }
}

fn rust_type(step: &Step) -> String {
    let elem = step.ty.storage();
    match step.kind {
        StepKind::Scalar => elem.to_string(),
        StepKind::Array(n) | StepKind::Text(n) => format!("[{}; {}]", elem, n),
    }
}

fn zero_value(step: &Step) -> String {
    let zero = if step.ty.is_float() { "0.0" } else { "0" };
    match step.kind {
        StepKind::Scalar => zero.to_string(),
        StepKind::Array(n) | StepKind::Text(n) => format!("[{}; {}]", zero, n),
    }
}

fn encode_line(step: &Step) -> String {
    let ident = rust_ident(&step.field);
    let acc = step.ty.accessor();
    match step.kind {
        StepKind::Scalar => format!("p.put_{}(self.{});", acc, ident),
        StepKind::Array(_) => format!("for v in self.{}.iter() {{ p.put_{}(*v); }}", ident, acc),
        StepKind::Text(_) => format!("p.put_bytes(&self.{});", ident),
    }
}

fn decode_line(step: &Step) -> String {
    let ident = rust_ident(&step.field);
    let acc = step.ty.accessor();
    match step.kind {
        StepKind::Scalar => format!("msg.{} = p.get_{}()?;", ident, acc),
        StepKind::Array(_) => format!("for v in msg.{}.iter_mut() {{ *v = p.get_{}()?; }}", ident, acc),
        StepKind::Text(_) => format!("p.get_bytes(&mut msg.{})?;", ident),
    }
}

fn lines(steps: &[Step], f: fn(&Step) -> String) -> Context {
    Context::List(steps.iter().map(|s| Context::map().with("line", f(s))).collect())
}

/// Attribute tree of one message.
pub fn message_context(runtime: &str, dialect: &str, message: &Message, plan: &LayoutPlan) -> Context {
    // Struct fields follow declaration order; the plan is in wire order.
    let mut by_index: Vec<&Step> = plan.steps.iter().collect();
    by_index.sort_by_key(|s| s.index);

    let fields: Vec<Context> = by_index
        .iter()
        .map(|s| {
            let f = &message.fields[s.index];
            Context::map()
                .with("ident", rust_ident(&f.name))
                .with("rust_type", rust_type(s))
                .with("zero", zero_value(s))
                .with("doc", doc_attr("    ", f.description.as_deref()))
        })
        .collect();
    let texts: Vec<Context> = by_index
        .iter()
        .filter_map(|s| match s.kind {
            StepKind::Text(n) => Some(
                Context::map()
                    .with("field", s.field.as_str())
                    .with("ident", rust_ident(&s.field))
                    .with("getter", format!("{}_str", s.field))
                    .with("setter", format!("set_{}", s.field))
                    .with("capacity", n),
            ),
            _ => None,
        })
        .collect();
    let doc: Vec<Context> = message
        .description
        .as_deref()
        .map(one_line)
        .filter(|d| !d.is_empty())
        .map(|d| Context::map().with("line", d))
        .into_iter()
        .collect();
    let extensions: Vec<Context> = if plan.has_extensions() { vec![Context::map()] } else { Vec::new() };

    Context::map()
        .with("runtime", runtime)
        .with("dialect", dialect)
        .with("name", message.name.as_str())
        .with("struct_name", camel_case(&message.name))
        .with("id", message.id)
        .with("crc_extra", message.crc_extra)
        .with("min_len", plan.base_len)
        .with("len", plan.full_len)
        .with("doc", doc)
        .with("fields", fields)
        .with("texts", texts)
        .with("encode_base", lines(plan.base_steps(), encode_line))
        .with("encode_ext", lines(plan.extension_steps(), encode_line))
        .with("decode_base", lines(plan.base_steps(), decode_line))
        .with("decode_ext", lines(plan.extension_steps(), decode_line))
        .with("extensions", extensions)
}

/// Render one message module.
pub fn emit_message<R: Render + ?Sized>(
    renderer: &R,
    runtime: &str,
    dialect: &str,
    message: &Message,
    plan: &LayoutPlan,
) -> Result<Emission, GenError> {
    let ctx = message_context(runtime, dialect, message, plan);
    let content = renderer.render(MESSAGE_TEMPLATE, &ctx)?;
    let path = format!("{}/{}.rs", module_name(dialect), message_module(&message.name));
    debug!(message = %message.name, %path, bytes = content.len(), "emitted message");
    Ok(Emission { path, content })
}

/// Render one enum module.
pub fn emit_enum<R: Render + ?Sized>(renderer: &R, dialect: &str, def: &EnumDef) -> Result<Emission, GenError> {
    let entries: Vec<Context> = def
        .entries
        .iter()
        .map(|e| {
            Context::map()
                .with("name", e.name.as_str())
                .with("ident", rust_ident(&e.name))
                .with("value", e.value)
                .with("doc", doc_attr("", e.description.as_deref()))
        })
        .collect();
    let summary = match def.description.as_deref().map(one_line) {
        Some(d) if !d.is_empty() => format!(": {}", d),
        _ => String::new(),
    };
    let ctx = Context::map()
        .with("name", def.name.as_str())
        .with("summary", summary)
        .with("entries", entries);
    let content = renderer.render(ENUM_TEMPLATE, &ctx)?;
    Ok(Emission {
        path: format!("{}/{}.rs", module_name(dialect), enum_module(&def.name)),
        content,
    })
}

/// Render a dialect's `mod.rs`: module list, fingerprint and length tables, dispatch enum.
/// `rows` cover the dialect and everything it includes, ascending by id.
pub fn emit_dialect<R: Render + ?Sized>(
    renderer: &R,
    runtime: &str,
    dialect: &Dialect,
    rows: &[TableRow],
) -> Result<Emission, GenError> {
    let own = module_name(&dialect.name);
    let mut modules: Vec<Context> = dialect
        .messages
        .iter()
        .map(|m| Context::map().with("module", message_module(&m.name)))
        .collect();
    modules.extend(dialect.enums.iter().map(|e| Context::map().with("module", enum_module(&e.name))));

    let table: Vec<Context> = rows
        .iter()
        .map(|r| {
            let module = module_name(&r.dialect);
            let local = format!("{}::{}", message_module(&r.name), camel_case(&r.name));
            let path = if module == own { local } else { format!("super::{}::{}", module, local) };
            Context::map()
                .with("id", r.id)
                .with("fingerprint", r.fingerprint)
                .with("min_len", r.min_len)
                .with("len", r.len)
                .with("variant", camel_case(&r.name))
                .with("path", path)
        })
        .collect();
    let dispatch: Vec<Context> = if rows.is_empty() { Vec::new() } else { vec![Context::map()] };
    let version = match dialect.version {
        Some(v) => format!("Some({})", v),
        None => "None".to_string(),
    };
    let endianness = match dialect.flags.endianness {
        crate::codec::Endianness::Little => "Little",
        crate::codec::Endianness::Big => "Big",
    };

    let ctx = Context::map()
        .with("runtime", runtime)
        .with("name", dialect.name.as_str())
        .with("version", version)
        .with("endianness", endianness)
        .with("crc_extra", dialect.flags.crc_extra)
        .with("modules", modules)
        .with("rows", table)
        .with("dispatch", dispatch);
    let content = renderer.render(DIALECT_TEMPLATE, &ctx)?;
    Ok(Emission {
        path: format!("{}/mod.rs", own),
        content,
    })
}

/// Render the framing module shared by every dialect of a run.
pub fn emit_framing<R: Render + ?Sized>(renderer: &R, runtime: &str, rows: &[TableRow]) -> Result<Emission, GenError> {
    let table: Vec<Context> = rows
        .iter()
        .map(|r| {
            Context::map()
                .with("id", r.id)
                .with("dialect", r.dialect.as_str())
                .with("name", r.name.as_str())
                .with("fingerprint", r.fingerprint)
        })
        .collect();
    let ctx = Context::map()
        .with("runtime", runtime)
        .with("legacy_stx", format!("0x{:02X}", frame::LEGACY_STX))
        .with("extended_stx", format!("0x{:02X}", frame::EXTENDED_STX))
        .with("legacy_header_len", frame::LEGACY_HEADER_LEN)
        .with("extended_header_len", frame::EXTENDED_HEADER_LEN)
        .with("checksum_len", frame::CHECKSUM_LEN)
        .with("signature_len", frame::SIGNATURE_LEN)
        .with("signed_flag", format!("0x{:02X}", frame::INCOMPAT_FLAG_SIGNED))
        .with("rows", table);
    Ok(Emission {
        path: "framing.rs".to_string(),
        content: renderer.render(FRAMING_TEMPLATE, &ctx)?,
    })
}

/// Render the root `mod.rs` declaring every dialect module.
pub fn emit_root<R: Render + ?Sized>(renderer: &R, dialects: &[&str]) -> Result<Emission, GenError> {
    let modules: Vec<Context> = dialects
        .iter()
        .map(|d| Context::map().with("module", module_name(d)))
        .collect();
    Ok(Emission {
        path: "mod.rs".to_string(),
        content: renderer.render(ROOT_TEMPLATE, &Context::map().with("dialects", modules))?,
    })
}
