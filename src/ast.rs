//! Dialect data model: dialects, messages, fields and enums.
//!
//! Values are built once by the loader ([`crate::parser`]) and are read-only afterwards.
//! [`Message::declare`] derives the declared wire lengths and the fingerprint at
//! construction time; planning and assembly only read them.

use crate::codec::Endianness;
use crate::crc;
use crate::error::GenError;
use crate::frame::{MAX_EXTENDED_ID, MAX_PAYLOAD_LEN};
use crate::layout::{self, FieldRole};
use std::collections::HashSet;

/// Dialect-wide switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectFlags {
    pub endianness: Endianness,
    /// When off, every message fingerprint is 0.
    pub crc_extra: bool,
    /// Reorder fields by element width (widest first) within the base and extension parts.
    pub sort_fields: bool,
}

impl Default for DialectFlags {
    fn default() -> Self {
        DialectFlags {
            endianness: Endianness::Little,
            crc_extra: true,
            sort_fields: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dialect {
    pub name: String,
    pub version: Option<u8>,
    pub flags: DialectFlags,
    /// Names of included dialects.
    pub includes: Vec<String>,
    pub enums: Vec<EnumDef>,
    pub messages: Vec<Message>,
}

impl Dialect {
    pub fn new(name: impl Into<String>) -> Self {
        Dialect {
            name: name.into(),
            version: None,
            flags: DialectFlags::default(),
            includes: Vec::new(),
            enums: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// Add a message, rejecting an id or name already used in this dialect.
    pub fn add_message(&mut self, message: Message) -> Result<(), GenError> {
        if let Some(existing) = self.message(message.id) {
            return Err(GenError::DuplicateMessageId {
                id: message.id,
                first: existing.name.clone(),
                second: message.name,
            });
        }
        if let Some(existing) = self.message_by_name(&message.name) {
            return Err(GenError::DuplicateMessageName {
                name: message.name,
                first: existing.id,
                second: message.id,
            });
        }
        self.messages.push(message);
        Ok(())
    }

    pub fn message(&self, id: u32) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn message_by_name(&self, name: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub name: String,
    pub description: Option<String>,
    pub entries: Vec<EnumEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumEntry {
    pub name: String,
    pub value: u64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    /// Scalar type tag, resolved by [`ScalarType::resolve`](crate::types::ScalarType::resolve).
    pub type_tag: String,
    /// 0 for scalars; element count for arrays; capacity for `char` text.
    pub array_length: usize,
    pub description: Option<String>,
}

impl Field {
    pub fn scalar(name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Field {
            name: name.into(),
            type_tag: type_tag.into(),
            array_length: 0,
            description: None,
        }
    }

    pub fn array(name: impl Into<String>, type_tag: impl Into<String>, array_length: usize) -> Self {
        Field {
            array_length,
            ..Field::scalar(name, type_tag)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_text(&self) -> bool {
        self.array_length > 0 && self.type_tag == "char"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: u32,
    pub name: String,
    pub description: Option<String>,
    /// Fields in declaration order.
    pub fields: Vec<Field>,
    /// Index of the first extension field, if any.
    pub extensions_start: Option<usize>,
    /// Layout fingerprint folded into every checksum of this message.
    pub crc_extra: u8,
    /// Declared payload length of a legacy frame (base fields only).
    pub wire_min_length: usize,
    /// Declared payload length of an extended frame (base and extension fields).
    pub wire_length: usize,
}

impl Message {
    /// Validate a message definition and derive its wire lengths and fingerprint.
    pub fn declare(
        id: u32,
        name: impl Into<String>,
        fields: Vec<Field>,
        extensions_start: Option<usize>,
        flags: &DialectFlags,
    ) -> Result<Self, GenError> {
        let name = name.into();
        if id > MAX_EXTENDED_ID {
            return Err(GenError::IdOutOfRange {
                message: name,
                id,
                max: MAX_EXTENDED_ID,
            });
        }
        let mut seen = HashSet::new();
        for f in &fields {
            if !seen.insert(f.name.as_str()) {
                return Err(GenError::DuplicateField {
                    message: name,
                    field: f.name.clone(),
                });
            }
        }
        if let Some(start) = extensions_start {
            if start == 0 || start > fields.len() {
                return Err(GenError::BadExtensions {
                    message: name,
                    reason: format!("extensions marker at position {} must follow a base field", start),
                });
            }
        }

        let order = layout::wire_order(&name, &fields, extensions_start, flags.sort_fields)?;
        let (wire_min_length, wire_length) = layout::wire_lengths(&fields, &order);
        if wire_length > MAX_PAYLOAD_LEN {
            return Err(GenError::PayloadTooLarge {
                message: name,
                len: wire_length,
                max: MAX_PAYLOAD_LEN,
            });
        }
        let crc_extra = if flags.crc_extra {
            crc::fingerprint(
                &name,
                order
                    .iter()
                    .filter(|o| o.role == FieldRole::Base)
                    .map(|o| {
                        let f = &fields[o.index];
                        (o.ty.fingerprint_name(), f.name.as_str(), f.array_length)
                    }),
            )
        } else {
            0
        };

        Ok(Message {
            id,
            name,
            description: None,
            fields,
            extensions_start,
            crc_extra,
            wire_min_length,
            wire_length,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn base_fields(&self) -> &[Field] {
        &self.fields[..self.split_index()]
    }

    pub fn extension_fields(&self) -> &[Field] {
        &self.fields[self.split_index()..]
    }

    fn split_index(&self) -> usize {
        self.extensions_start.unwrap_or(self.fields.len()).min(self.fields.len())
    }
}
