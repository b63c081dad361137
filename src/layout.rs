//! Field-layout planning.
//!
//! A message's fields are put in wire order (optionally reordered by element width,
//! separately for the base part and the extension part), then turned into a list of
//! [`Step`]s with byte offsets. The plan is what both the runtime [`Codec`](crate::codec::Codec)
//! and the emitted code follow.

use crate::ast::{Field, Message};
use crate::error::GenError;
use crate::frame::FrameVersion;
use crate::types::ScalarType;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// Present in legacy and extended frames.
    Base,
    /// Present only in extended frames.
    Extension,
}

/// A field reference in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderedField {
    /// Index into the message's declaration-order field list.
    pub index: usize,
    pub ty: ScalarType,
    pub role: FieldRole,
}

/// Put fields in wire order. With `sort_fields`, each part (base, extension) is stable-sorted
/// by element width, widest first; no field moves across the extensions boundary.
pub fn wire_order(
    message: &str,
    fields: &[Field],
    extensions_start: Option<usize>,
    sort_fields: bool,
) -> Result<Vec<OrderedField>, GenError> {
    let split = extensions_start.unwrap_or(fields.len()).min(fields.len());
    let mut out = Vec::with_capacity(fields.len());
    for (range, role) in [
        (0..split, FieldRole::Base),
        (split..fields.len(), FieldRole::Extension),
    ] {
        let mut part = range
            .map(|i| {
                let f = &fields[i];
                ScalarType::resolve(message, &f.name, &f.type_tag).map(|ty| OrderedField { index: i, ty, role })
            })
            .collect::<Result<Vec<_>, GenError>>()?;
        if sort_fields {
            part.sort_by(|a, b| b.ty.wire_width().cmp(&a.ty.wire_width()));
        }
        out.extend(part);
    }
    Ok(out)
}

/// (legacy payload length, extended payload length) of an ordered field list.
pub fn wire_lengths(fields: &[Field], order: &[OrderedField]) -> (usize, usize) {
    let mut base: usize = 0;
    let mut full: usize = 0;
    for o in order {
        let width = o.ty.wire_width().saturating_mul(fields[o.index].array_length.max(1));
        full = full.saturating_add(width);
        if o.role == FieldRole::Base {
            base = base.saturating_add(width);
        }
    }
    (base, full)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Scalar,
    /// `n` sequential elements, ascending index.
    Array(usize),
    /// `char[n]`: zero-padded on encode, cut at the first zero on decode.
    Text(usize),
}

/// One encode/decode step.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub field: String,
    /// Declaration index of the field.
    pub index: usize,
    pub ty: ScalarType,
    pub kind: StepKind,
    pub role: FieldRole,
    /// Byte offset in the payload.
    pub offset: usize,
}

impl Step {
    pub fn count(&self) -> usize {
        match self.kind {
            StepKind::Scalar => 1,
            StepKind::Array(n) | StepKind::Text(n) => n,
        }
    }

    pub fn width(&self) -> usize {
        self.ty.wire_width() * self.count()
    }
}

/// Encode/decode plan of one message.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlan {
    pub message_id: u32,
    pub message_name: String,
    /// Base steps followed by extension steps.
    pub steps: Vec<Step>,
    /// Payload bytes of a legacy frame.
    pub base_len: usize,
    /// Payload bytes of an extended frame.
    pub full_len: usize,
    base_count: usize,
}

impl LayoutPlan {
    pub fn base_steps(&self) -> &[Step] {
        &self.steps[..self.base_count]
    }

    pub fn extension_steps(&self) -> &[Step] {
        &self.steps[self.base_count..]
    }

    pub fn has_extensions(&self) -> bool {
        self.base_count < self.steps.len()
    }

    /// Steps present on the wire for a frame version.
    pub fn steps_for(&self, version: FrameVersion) -> &[Step] {
        match version {
            FrameVersion::Legacy => self.base_steps(),
            FrameVersion::Extended => &self.steps,
        }
    }

    pub fn payload_len(&self, version: FrameVersion) -> usize {
        match version {
            FrameVersion::Legacy => self.base_len,
            FrameVersion::Extended => self.full_len,
        }
    }

    pub fn step(&self, field: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.field == field)
    }
}

/// Plan a message and check the running offsets against its declared wire lengths.
pub fn plan_message(message: &Message, sort_fields: bool) -> Result<LayoutPlan, GenError> {
    let order = wire_order(&message.name, &message.fields, message.extensions_start, sort_fields)?;
    let mut steps = Vec::with_capacity(order.len());
    let mut offset = 0;
    let mut base_len = 0;
    let mut base_count = 0;
    for o in &order {
        let field = &message.fields[o.index];
        let kind = match (field.array_length, o.ty) {
            (0, _) => StepKind::Scalar,
            (n, ScalarType::Char) => StepKind::Text(n),
            (n, _) => StepKind::Array(n),
        };
        let step = Step {
            field: field.name.clone(),
            index: o.index,
            ty: o.ty,
            kind,
            role: o.role,
            offset,
        };
        offset += step.width();
        if o.role == FieldRole::Base {
            base_len = offset;
            base_count += 1;
        }
        steps.push(step);
    }

    if base_len != message.wire_min_length {
        return Err(GenError::WireLengthMismatch {
            message: message.name.clone(),
            mode: "legacy",
            declared: message.wire_min_length,
            computed: base_len,
        });
    }
    if offset != message.wire_length {
        return Err(GenError::WireLengthMismatch {
            message: message.name.clone(),
            mode: "extended",
            declared: message.wire_length,
            computed: offset,
        });
    }
    debug!(
        message = %message.name,
        id = message.id,
        base_len,
        full_len = offset,
        steps = steps.len(),
        "planned message layout"
    );

    Ok(LayoutPlan {
        message_id: message.id,
        message_name: message.name.clone(),
        steps,
        base_len,
        full_len: offset,
        base_count,
    })
}
