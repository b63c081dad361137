//! Plan-driven payload encode/decode.
//!
//! The runtime counterpart of the generated message modules: walks a [`LayoutPlan`] and
//! moves [`Value`]s through the same [`Payload`] accessors the generated code uses.
//! Missing values encode as zero, short arrays are zero-padded, text is truncated to
//! its capacity. Legacy frames carry base steps only.

use crate::frame::FrameVersion;
use crate::layout::{LayoutPlan, Step, StepKind};
use crate::payload::Payload;
use crate::types::ScalarType;
use crate::value::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Big,
    Little,
}

impl Endianness {
    pub fn name(self) -> &'static str {
        match self {
            Endianness::Big => "big_endian",
            Endianness::Little => "little_endian",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("payload truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },
    #[error("field '{field}': expected {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: ScalarType,
        found: &'static str,
    },
    #[error("field '{field}': value out of range for {ty}")]
    OutOfRange { field: String, ty: ScalarType },
    #[error("field '{field}': {len} elements, capacity is {max}")]
    TooManyElements { field: String, len: usize, max: usize },
    #[error("unknown message: {0}")]
    UnknownMessage(String),
}

#[derive(Debug, Clone, Copy)]
pub struct Codec {
    pub endianness: Endianness,
}

impl Codec {
    pub fn new(endianness: Endianness) -> Self {
        Codec { endianness }
    }

    /// Encode the steps present in `version` frames. The result is always
    /// `plan.payload_len(version)` bytes long.
    pub fn encode(
        &self,
        plan: &LayoutPlan,
        values: &HashMap<String, Value>,
        version: FrameVersion,
    ) -> Result<Vec<u8>, CodecError> {
        let mut p = Payload::with_capacity(plan.payload_len(version), self.endianness);
        for step in plan.steps_for(version) {
            encode_step(&mut p, step, values.get(&step.field))?;
        }
        Ok(p.into_bytes())
    }

    /// Decode a payload. Extended payloads shorter than the plan read as zero-filled;
    /// legacy payloads must be complete.
    pub fn decode(
        &self,
        plan: &LayoutPlan,
        bytes: &[u8],
        version: FrameVersion,
    ) -> Result<HashMap<String, Value>, CodecError> {
        let mut p = Payload::reader(bytes, self.endianness, version);
        let mut out = HashMap::new();
        for step in plan.steps_for(version) {
            let v = decode_step(&mut p, step)?;
            out.insert(step.field.clone(), v);
        }
        Ok(out)
    }
}

fn encode_step(p: &mut Payload, step: &Step, value: Option<&Value>) -> Result<(), CodecError> {
    match step.kind {
        StepKind::Scalar => put_scalar(p, step.ty, &step.field, value),
        StepKind::Text(n) => {
            match value {
                None => p.put_text("", n),
                Some(Value::Text(s)) => p.put_text(s, n),
                Some(other) => return Err(mismatch(&step.field, step.ty, other)),
            }
            Ok(())
        }
        StepKind::Array(n) => {
            let items = match value {
                None => &[][..],
                Some(Value::List(items)) => items.as_slice(),
                Some(other) => return Err(mismatch(&step.field, step.ty, other)),
            };
            if items.len() > n {
                return Err(CodecError::TooManyElements {
                    field: step.field.clone(),
                    len: items.len(),
                    max: n,
                });
            }
            for i in 0..n {
                put_scalar(p, step.ty, &step.field, items.get(i))?;
            }
            Ok(())
        }
    }
}

fn decode_step(p: &mut Payload, step: &Step) -> Result<Value, CodecError> {
    Ok(match step.kind {
        StepKind::Scalar => get_scalar(p, step.ty)?,
        StepKind::Text(n) => Value::Text(p.get_text(n)?),
        StepKind::Array(n) => Value::List((0..n).map(|_| get_scalar(p, step.ty)).collect::<Result<_, _>>()?),
    })
}

fn put_scalar(p: &mut Payload, ty: ScalarType, field: &str, value: Option<&Value>) -> Result<(), CodecError> {
    let zero = Value::U8(0);
    let v = value.unwrap_or(&zero);
    match ty {
        ScalarType::Float => p.put_f32(v.as_f32().ok_or_else(|| mismatch(field, ty, v))?),
        ScalarType::Double => p.put_f64(v.as_f64().ok_or_else(|| mismatch(field, ty, v))?),
        ScalarType::Char | ScalarType::UInt8 | ScalarType::VersionMarker => p.put_u8(unsigned(field, ty, v)?),
        ScalarType::UInt16 => p.put_u16(unsigned(field, ty, v)?),
        ScalarType::UInt32 => p.put_u32(unsigned(field, ty, v)?),
        ScalarType::UInt64 => p.put_u64(unsigned(field, ty, v)?),
        ScalarType::Int8 => p.put_i8(signed(field, ty, v)?),
        ScalarType::Int16 => p.put_i16(signed(field, ty, v)?),
        ScalarType::Int32 => p.put_i32(signed(field, ty, v)?),
        ScalarType::Int64 => p.put_i64(signed(field, ty, v)?),
    }
    Ok(())
}

fn get_scalar(p: &mut Payload, ty: ScalarType) -> Result<Value, CodecError> {
    Ok(match ty {
        ScalarType::Float => Value::Float(p.get_f32()?),
        ScalarType::Double => Value::Double(p.get_f64()?),
        ScalarType::Char => Value::Char(p.get_u8()?),
        ScalarType::UInt8 | ScalarType::VersionMarker => Value::U8(p.get_u8()?),
        ScalarType::UInt16 => Value::U16(p.get_u16()?),
        ScalarType::UInt32 => Value::U32(p.get_u32()?),
        ScalarType::UInt64 => Value::U64(p.get_u64()?),
        ScalarType::Int8 => Value::I8(p.get_i8()?),
        ScalarType::Int16 => Value::I16(p.get_i16()?),
        ScalarType::Int32 => Value::I32(p.get_i32()?),
        ScalarType::Int64 => Value::I64(p.get_i64()?),
    })
}

fn unsigned<T: TryFrom<u64>>(field: &str, ty: ScalarType, v: &Value) -> Result<T, CodecError> {
    let raw = match v.as_u64() {
        Some(raw) => raw,
        None if v.as_i64().is_some() => return Err(out_of_range(field, ty)),
        None => return Err(mismatch(field, ty, v)),
    };
    T::try_from(raw).map_err(|_| out_of_range(field, ty))
}

fn signed<T: TryFrom<i64>>(field: &str, ty: ScalarType, v: &Value) -> Result<T, CodecError> {
    let raw = match v.as_i64() {
        Some(raw) => raw,
        None if v.as_u64().is_some() => return Err(out_of_range(field, ty)),
        None => return Err(mismatch(field, ty, v)),
    };
    T::try_from(raw).map_err(|_| out_of_range(field, ty))
}

fn mismatch(field: &str, expected: ScalarType, v: &Value) -> CodecError {
    CodecError::TypeMismatch {
        field: field.to_string(),
        expected,
        found: v.kind(),
    }
}

fn out_of_range(field: &str, ty: ScalarType) -> CodecError {
    CodecError::OutOfRange {
        field: field.to_string(),
        ty,
    }
}
