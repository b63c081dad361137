//! Configuration errors raised while loading, planning and assembling dialects.
//!
//! Every variant is fatal for the dialect being generated: generation is
//! deterministic, so nothing here is retried.

use crate::crc::UnknownFingerprint;
use crate::render::RenderError;

#[derive(Debug, thiserror::Error)]
pub enum GenError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse: {0}")]
    Parse(String),
    #[error("message {message}: field {field}: unknown type `{tag}`")]
    UnknownType {
        message: String,
        field: String,
        tag: String,
    },
    #[error("duplicate message id {id}: {first} and {second}")]
    DuplicateMessageId { id: u32, first: String, second: String },
    #[error("duplicate message name {name} (ids {first} and {second})")]
    DuplicateMessageName { name: String, first: u32, second: u32 },
    #[error("message {message}: duplicate field {field}")]
    DuplicateField { message: String, field: String },
    #[error("message {message}: {reason}")]
    BadExtensions { message: String, reason: String },
    #[error("message {message}: id {id} out of range (max {max})")]
    IdOutOfRange { message: String, id: u32, max: u32 },
    #[error("message {message}: payload of {len} bytes exceeds {max}")]
    PayloadTooLarge { message: String, len: usize, max: usize },
    #[error(
        "message {message}: {mode} wire length is {computed} bytes but {declared} were declared"
    )]
    WireLengthMismatch {
        message: String,
        mode: &'static str,
        declared: usize,
        computed: usize,
    },
    #[error(transparent)]
    MissingFingerprint(#[from] UnknownFingerprint),
    #[error("dialect {dialect}: unknown include `{include}`")]
    UnknownInclude { dialect: String, include: String },
    #[error("duplicate dialect {0}")]
    DuplicateDialect(String),
    #[error("unknown dialect {0}")]
    UnknownDialect(String),
    #[error("Render: {0}")]
    Render(#[from] RenderError),
}
