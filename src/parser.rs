//! Parse dialect definition text into the data model using PEST.

use crate::ast::{Dialect, DialectFlags, EnumDef, EnumEntry, Field, Message};
use crate::codec::Endianness;
use crate::error::GenError;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;
use std::path::Path;
use tracing::debug;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct DialectParser;

/// Parse a dialect file. The file must declare its name with `dialect NAME;`.
pub fn parse(source: &str) -> Result<Dialect, GenError> {
    parse_with_name(source, None)
}

/// Load a dialect file from disk. Without a `dialect` declaration the file stem is the name.
pub fn load(path: &Path) -> Result<Dialect, GenError> {
    let source = std::fs::read_to_string(path)?;
    let stem = path.file_stem().and_then(|s| s.to_str());
    let dialect = parse_with_name(&source, stem).map_err(|e| match e {
        GenError::Parse(msg) => GenError::Parse(format!("{}: {}", path.display(), msg)),
        other => other,
    })?;
    debug!(path = %path.display(), dialect = %dialect.name, messages = dialect.messages.len(), "loaded dialect");
    Ok(dialect)
}

fn parse_with_name(source: &str, default_name: Option<&str>) -> Result<Dialect, GenError> {
    let pairs = DialectParser::parse(Rule::dialect_file, source)
        .map_err(|e| GenError::Parse(format!("Parse error: {}", e)))?;
    let pair = pairs
        .into_iter()
        .next()
        .ok_or_else(|| GenError::Parse("Empty parse".to_string()))?;
    build_dialect(pair, default_name)
}

fn build_dialect(pair: Pair<Rule>, default_name: Option<&str>) -> Result<Dialect, GenError> {
    let mut name: Option<String> = None;
    let mut version = None;
    let mut flags = DialectFlags::default();
    let mut includes = Vec::new();
    let mut items = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::dialect_decl => {
                let ident = first_str(inner, "dialect name")?;
                if let Some(prev) = name.replace(ident.clone()) {
                    return Err(GenError::Parse(format!("dialect declared twice ({} and {})", prev, ident)));
                }
            }
            Rule::version_decl => {
                let n = parse_number(inner.into_inner().next().ok_or_else(|| missing("version number"))?)?;
                let v = u8::try_from(n).map_err(|_| GenError::Parse(format!("version {} does not fit one byte", n)))?;
                version = Some(v);
            }
            Rule::option_decl => {
                let opt = first_str(inner, "option name")?;
                apply_option(&mut flags, &opt)?;
            }
            Rule::include_decl => {
                let s = inner.into_inner().next().ok_or_else(|| missing("include name"))?;
                includes.push(string_value(s));
            }
            Rule::enum_section | Rule::message_section => items.push(inner),
            _ => {}
        }
    }

    let name = name
        .or_else(|| default_name.map(str::to_string))
        .ok_or_else(|| GenError::Parse("missing `dialect NAME;` declaration".to_string()))?;
    let mut dialect = Dialect::new(name);
    dialect.version = version;
    dialect.flags = flags;
    dialect.includes = includes;

    // Messages are sealed against the dialect's flags, so every header is applied first.
    for item in items {
        match item.as_rule() {
            Rule::enum_section => dialect.enums.push(build_enum(item)?),
            Rule::message_section => {
                let message = build_message(item, &dialect.flags)?;
                dialect.add_message(message)?;
            }
            _ => {}
        }
    }
    Ok(dialect)
}

fn apply_option(flags: &mut DialectFlags, option: &str) -> Result<(), GenError> {
    match option {
        "little_endian" => flags.endianness = Endianness::Little,
        "big_endian" => flags.endianness = Endianness::Big,
        "crc_extra" => flags.crc_extra = true,
        "no_crc_extra" => flags.crc_extra = false,
        "sort_fields" => flags.sort_fields = true,
        "no_sort_fields" => flags.sort_fields = false,
        other => return Err(GenError::Parse(format!("unknown option `{}`", other))),
    }
    Ok(())
}

fn build_enum(pair: Pair<Rule>) -> Result<EnumDef, GenError> {
    let mut it = pair.into_inner();
    let name = it.next().ok_or_else(|| missing("enum name"))?.as_str().to_string();
    let mut description = None;
    let mut entries = Vec::new();
    for inner in it {
        match inner.as_rule() {
            Rule::string => description = Some(string_value(inner)),
            Rule::enum_entry => {
                let mut e = inner.into_inner();
                let entry_name = e.next().ok_or_else(|| missing("enum entry name"))?.as_str().to_string();
                let value = parse_number(e.next().ok_or_else(|| missing("enum entry value"))?)?;
                let description = e.next().map(string_value);
                entries.push(EnumEntry {
                    name: entry_name,
                    value,
                    description,
                });
            }
            _ => {}
        }
    }
    Ok(EnumDef {
        name,
        description,
        entries,
    })
}

fn build_message(pair: Pair<Rule>, flags: &DialectFlags) -> Result<Message, GenError> {
    let mut it = pair.into_inner();
    let name = it.next().ok_or_else(|| missing("message name"))?.as_str().to_string();
    let raw_id = parse_number(it.next().ok_or_else(|| missing("message id"))?)?;
    let id = u32::try_from(raw_id).unwrap_or(u32::MAX);
    let mut description = None;
    let mut fields = Vec::new();
    let mut extensions_start = None;

    for inner in it {
        match inner.as_rule() {
            Rule::string => description = Some(string_value(inner)),
            Rule::extensions_marker => {
                if extensions_start.is_some() {
                    return Err(GenError::BadExtensions {
                        message: name,
                        reason: "extensions marker repeated".to_string(),
                    });
                }
                extensions_start = Some(fields.len());
            }
            Rule::field_decl => fields.push(build_field(inner, &name)?),
            _ => {}
        }
    }

    let message = Message::declare(id, name, fields, extensions_start, flags)?;
    Ok(match description {
        Some(d) => message.with_description(d),
        None => message,
    })
}

fn build_field(pair: Pair<Rule>, message: &str) -> Result<Field, GenError> {
    let mut it = pair.into_inner();
    let name = it.next().ok_or_else(|| missing("field name"))?.as_str().to_string();
    let type_tag = it.next().ok_or_else(|| missing("field type"))?.as_str().to_string();
    let mut field = Field::scalar(name, type_tag);
    for inner in it {
        match inner.as_rule() {
            Rule::array_suffix => {
                let n = parse_number(inner.into_inner().next().ok_or_else(|| missing("array length"))?)?;
                if n == 0 {
                    return Err(GenError::Parse(format!(
                        "{}.{}: array length must be at least 1",
                        message, field.name
                    )));
                }
                field.array_length = usize::try_from(n).unwrap_or(usize::MAX);
            }
            Rule::string => field.description = Some(string_value(inner)),
            _ => {}
        }
    }
    Ok(field)
}

fn first_str(pair: Pair<Rule>, what: &str) -> Result<String, GenError> {
    pair.into_inner()
        .next()
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| missing(what))
}

fn missing(what: &str) -> GenError {
    GenError::Parse(format!("missing {}", what))
}

fn parse_number(pair: Pair<Rule>) -> Result<u64, GenError> {
    let text = pair.as_str();
    let digits = pair.into_inner().next().ok_or_else(|| missing("number"))?;
    let parsed = match digits.as_rule() {
        Rule::hex_number => u64::from_str_radix(&text[2..], 16),
        _ => text.parse::<u64>(),
    };
    parsed.map_err(|e| GenError::Parse(format!("bad number `{}`: {}", text, e)))
}

/// Contents of a string literal with `\"`, `\\`, `\n` and `\t` unescaped.
fn string_value(pair: Pair<Rule>) -> String {
    let raw = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headers_and_defaults() {
        let d = parse("dialect minimal;").unwrap();
        assert_eq!(d.name, "minimal");
        assert_eq!(d.version, None);
        assert_eq!(d.flags, DialectFlags::default());

        let d = parse(
            "dialect common; version 3; option big_endian; option no_sort_fields; include \"minimal\";",
        )
        .unwrap();
        assert_eq!(d.version, Some(3));
        assert_eq!(d.flags.endianness, Endianness::Big);
        assert!(!d.flags.sort_fields);
        assert_eq!(d.includes, vec!["minimal".to_string()]);
    }

    #[test]
    fn message_with_extensions() {
        let src = r#"
            dialect t;
            message STATUS = 0x10 "Status \"report\"" {
                mode: uint8_t;
                uptime: uint32_t "ms";
                extensions;
                label: char[8];
            }
        "#;
        let d = parse(src).unwrap();
        let m = &d.messages[0];
        assert_eq!(m.id, 16);
        assert_eq!(m.description.as_deref(), Some("Status \"report\""));
        assert_eq!(m.extensions_start, Some(2));
        assert_eq!(m.fields[1].description.as_deref(), Some("ms"));
        assert_eq!(m.fields[2].array_length, 8);
        assert_eq!((m.wire_min_length, m.wire_length), (5, 13));
    }

    #[test]
    fn field_named_extensions_is_a_field() {
        let d = parse("dialect t; message M = 1 { extensions: uint8_t; }").unwrap();
        assert_eq!(d.messages[0].fields[0].name, "extensions");
        assert_eq!(d.messages[0].extensions_start, None);
    }

    #[test]
    fn enum_entries() {
        let d = parse("dialect t; enum MODE \"Modes\" { A = 0; B = 0x10 \"second\"; }").unwrap();
        let e = &d.enums[0];
        assert_eq!(e.name, "MODE");
        assert_eq!(e.entries[1].value, 16);
        assert_eq!(e.entries[1].description.as_deref(), Some("second"));
    }

    #[test]
    fn comments_are_skipped() {
        let d = parse("// header\ndialect t; /* block */ message M = 1 { a: uint8_t; // trailing\n }").unwrap();
        assert_eq!(d.messages.len(), 1);
    }

    #[test]
    fn rejections() {
        assert!(matches!(parse("message M = 1 { }"), Err(GenError::Parse(_))));
        assert!(matches!(parse("dialect t; option fast;"), Err(GenError::Parse(_))));
        assert!(matches!(parse("dialect t; version 256;"), Err(GenError::Parse(_))));
        assert!(matches!(parse("dialect t; message M = 1 { a: uint8_t[0]; }"), Err(GenError::Parse(_))));
        assert!(matches!(
            parse("dialect t; message M = 1 { a: uint8_t; extensions; extensions; }"),
            Err(GenError::BadExtensions { .. })
        ));
    }
}
