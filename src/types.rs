//! Scalar field types: wire width, storage type and payload accessor for each type tag.

use crate::error::GenError;

/// Scalar type of a field (element type for arrays and text).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Float,
    Double,
    Char,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    /// `uint8_t_mavlink_version`: a plain `uint8_t` on the wire and in the fingerprint.
    VersionMarker,
}

impl ScalarType {
    pub const ALL: [ScalarType; 12] = [
        ScalarType::Float,
        ScalarType::Double,
        ScalarType::Char,
        ScalarType::Int8,
        ScalarType::UInt8,
        ScalarType::Int16,
        ScalarType::UInt16,
        ScalarType::Int32,
        ScalarType::UInt32,
        ScalarType::Int64,
        ScalarType::UInt64,
        ScalarType::VersionMarker,
    ];

    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "float" => ScalarType::Float,
            "double" => ScalarType::Double,
            "char" => ScalarType::Char,
            "int8_t" => ScalarType::Int8,
            "uint8_t" => ScalarType::UInt8,
            "int16_t" => ScalarType::Int16,
            "uint16_t" => ScalarType::UInt16,
            "int32_t" => ScalarType::Int32,
            "uint32_t" => ScalarType::UInt32,
            "int64_t" => ScalarType::Int64,
            "uint64_t" => ScalarType::UInt64,
            "uint8_t_mavlink_version" => ScalarType::VersionMarker,
            _ => return None,
        })
    }

    /// Resolve a field's type tag; an unknown tag is a configuration error naming the field.
    pub fn resolve(message: &str, field: &str, tag: &str) -> Result<Self, GenError> {
        Self::from_tag(tag).ok_or_else(|| GenError::UnknownType {
            message: message.to_string(),
            field: field.to_string(),
            tag: tag.to_string(),
        })
    }

    /// Tag as written in a dialect file.
    pub fn tag(self) -> &'static str {
        match self {
            ScalarType::Float => "float",
            ScalarType::Double => "double",
            ScalarType::Char => "char",
            ScalarType::Int8 => "int8_t",
            ScalarType::UInt8 => "uint8_t",
            ScalarType::Int16 => "int16_t",
            ScalarType::UInt16 => "uint16_t",
            ScalarType::Int32 => "int32_t",
            ScalarType::UInt32 => "uint32_t",
            ScalarType::Int64 => "int64_t",
            ScalarType::UInt64 => "uint64_t",
            ScalarType::VersionMarker => "uint8_t_mavlink_version",
        }
    }

    /// Type name folded into the message fingerprint.
    pub fn fingerprint_name(self) -> &'static str {
        match self {
            ScalarType::VersionMarker => "uint8_t",
            other => other.tag(),
        }
    }

    pub fn wire_width(self) -> usize {
        match self {
            ScalarType::Char | ScalarType::Int8 | ScalarType::UInt8 | ScalarType::VersionMarker => 1,
            ScalarType::Int16 | ScalarType::UInt16 => 2,
            ScalarType::Float | ScalarType::Int32 | ScalarType::UInt32 => 4,
            ScalarType::Double | ScalarType::Int64 | ScalarType::UInt64 => 8,
        }
    }

    /// Rust storage type, same width and signedness as the wire value.
    pub fn storage(self) -> &'static str {
        match self {
            ScalarType::Float => "f32",
            ScalarType::Double => "f64",
            ScalarType::Char | ScalarType::UInt8 | ScalarType::VersionMarker => "u8",
            ScalarType::Int8 => "i8",
            ScalarType::Int16 => "i16",
            ScalarType::UInt16 => "u16",
            ScalarType::Int32 => "i32",
            ScalarType::UInt32 => "u32",
            ScalarType::Int64 => "i64",
            ScalarType::UInt64 => "u64",
        }
    }

    /// Suffix of the [`Payload`](crate::payload::Payload) accessor pair (`put_<acc>` / `get_<acc>`).
    pub fn accessor(self) -> &'static str {
        self.storage()
    }

    pub fn is_float(self) -> bool {
        matches!(self, ScalarType::Float | ScalarType::Double)
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            ScalarType::Int8 | ScalarType::Int16 | ScalarType::Int32 | ScalarType::Int64
        ) || self.is_float()
    }
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}
