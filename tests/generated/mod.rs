//! Generated message definitions.

pub mod framing;
pub mod minimal;
pub mod common;
