//! Per-traversal object identity, used to preserve sharing and break cycles.

mod decode;
mod encode;

pub use decode::DecodeRefs;
pub use encode::{EncodeRefs, Visit};

// -----------------------------------------------------------------------------
// Tests
