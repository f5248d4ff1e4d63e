//! A JSON [`PickleFormat`] for `vc_pickle`, built on [`serde_json`].
//!
//! # Layout
//!
//! | entry | JSON |
//! |---|---|
//! | `Null` | `null` |
//! | `Ref(k)` | `{"$ref": k}` |
//! | leaf | `{"$type": key, "$value": payload}` |
//! | fields | `{"$type": key, "name": entry, ...}` |
//!
//! `$type` is omitted when the tag is elided, and shared objects carry their
//! object id as `"$id"`, checked on read when present. A field name used more
//! than once in an entry (the `elem` fields of a `Vec`) holds an array of its
//! entries, in write order. When names interleave (the `key` / `value` fields
//! of a map), `"$order"` lists every field name in write order. Fields are
//! read in write order. Field names must not start with `$`.
//!
//! Payloads are JSON scalars, except `i128` / `u128` (decimal strings),
//! non-finite floats (`"NaN"`, `"inf"`, `"-inf"`) and bytes (an array of
//! numbers).
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//!
//! let shared = Rc::new(String::from("shared"));
//! let text = vc_pickle_json::to_string(&(shared.clone(), shared)).unwrap();
//! assert_eq!(
//!     text,
//!     concat!(
//!         r#"{"$type":"(alloc::rc::Rc<alloc::string::String>, alloc::rc::Rc<alloc::string::String>)","#,
//!         r#""0":{"$type":"alloc::string::String","$id":0,"$value":"shared"},"#,
//!         r#""1":{"$ref":0}}"#,
//!     )
//! );
//!
//! let back: (Rc<String>, Rc<String>) = vc_pickle_json::from_str(&text).unwrap();
//! assert!(Rc::ptr_eq(&back.0, &back.1));
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// no_std support

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod builder;
mod payload;
mod reader;

// -----------------------------------------------------------------------------
// Exports

pub use builder::JsonBuilder;
pub use reader::JsonReader;

use alloc::string::String;

use serde_json::Value;
use vc_pickle::format::PickleFormat;
use vc_pickle::{Engine, Pickle, PickleError, Result, Unpickle};

/// The JSON [`PickleFormat`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl PickleFormat for JsonFormat {
    type Output = Value;
    type Input = Value;
    type Builder = JsonBuilder;
    type Reader<'de> = JsonReader<'de>;

    #[inline]
    fn create_builder(&self) -> Self::Builder {
        JsonBuilder::new()
    }

    #[inline]
    fn finish_builder(&self, builder: Self::Builder) -> Result<Self::Output> {
        builder.into_value()
    }

    #[inline]
    fn create_reader<'de>(&self, input: &'de Value) -> Result<Self::Reader<'de>> {
        Ok(JsonReader::new(input))
    }
}

// -----------------------------------------------------------------------------
// Shortcuts

#[cold]
#[inline(never)]
fn json_error(err: serde_json::Error) -> PickleError {
    PickleError::MalformedEntry {
        reason: alloc::format!("invalid JSON: {err}"),
    }
}

/// Encodes `value` as a JSON value with the process-wide registry.
pub fn to_value<T: Pickle + ?Sized>(value: &T) -> Result<Value> {
    Engine::new(JsonFormat).encode(value)
}

/// Decodes a `T` from a JSON value with the process-wide registry.
pub fn from_value<T: Unpickle>(value: &Value) -> Result<T> {
    Engine::new(JsonFormat).decode(value)
}

/// Encodes `value` as compact JSON text.
pub fn to_string<T: Pickle + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(&to_value(value)?).map_err(json_error)
}

/// Decodes a `T` from JSON text.
///
/// Text that is not valid JSON fails with
/// [`MalformedEntry`](PickleError::MalformedEntry).
pub fn from_str<T: Unpickle>(text: &str) -> Result<T> {
    let value: Value = serde_json::from_str(text).map_err(json_error)?;
    from_value(&value)
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests;
