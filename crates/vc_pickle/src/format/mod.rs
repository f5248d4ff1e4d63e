//! The contract between per-type pickling logic and a physical format.
//!
//! A format sees a stream of *entries*. Every entry starts with a begin
//! marker carrying a type tag and [`Hints`], continues with either named
//! field slots (each holding one nested entry) or one raw [`Primitive`]
//! payload, and finishes with an end marker.
//!
//! ```text
//! begin(tag) -> field(a) -> begin(..) .. end -> field(b) -> begin(..) .. end -> end
//! begin(tag) -> primitive(..) -> end
//! ```
//!
//! Readers must be consumed in exactly the order the builder was driven.
//! [`BinaryFormat`] is the reference implementation.

use alloc::borrow::Cow;

use crate::error::Result;
use crate::tag::TypeTag;

mod hints;
mod primitive;

pub mod binary;

pub use binary::BinaryFormat;
pub use hints::Hints;
pub use primitive::{Primitive, PrimitiveKind};

// -----------------------------------------------------------------------------
// EntryBuilder

/// Write half of a format.
///
/// Builders are driven by [`PickleWriter`](crate::PickleWriter), which
/// guarantees balanced markers for well-behaved picklers. Builders still
/// report [`MalformedEntry`](crate::PickleError::MalformedEntry) when the
/// contract is violated.
pub trait EntryBuilder {
    /// Opens an entry.
    ///
    /// When `hints.elided` is set, the builder may omit the tag.
    fn begin_entry(&mut self, tag: &TypeTag, hints: &Hints) -> Result<()>;

    /// Opens a named field slot in the current entry.
    ///
    /// The next `begin_entry` fills the slot.
    fn begin_field(&mut self, name: &str) -> Result<()>;

    /// Writes the raw payload of the current leaf entry.
    fn put_primitive(&mut self, value: Primitive<'_>) -> Result<()>;

    /// Closes the current entry.
    fn end_entry(&mut self) -> Result<()>;
}

// -----------------------------------------------------------------------------
// EntryReader

/// Read half of a format.
pub trait EntryReader {
    /// Opens the next entry and returns its key.
    ///
    /// Returns `None` if the key was elided, the caller supplies the static type.
    fn begin_entry(&mut self) -> Result<Option<Cow<'_, str>>>;

    /// Opens the next field slot of the current entry, checking its name.
    fn read_field(&mut self, name: &str) -> Result<()>;

    /// Reads the raw payload of the current leaf entry.
    fn read_primitive(&mut self, kind: PrimitiveKind) -> Result<Primitive<'static>>;

    /// Closes the current entry, checking that every field was consumed.
    fn end_entry(&mut self) -> Result<()>;

    /// Checks the object id recorded for the entry opened last, if the
    /// format records one.
    ///
    /// Called when that entry is a shared object and `id` is reserved for it.
    fn claim_object_id(&mut self, id: u32) -> Result<()> {
        let _ = id;
        Ok(())
    }

    /// Checks that the root entry was fully consumed and nothing follows it.
    fn finish(&mut self) -> Result<()>;
}

// -----------------------------------------------------------------------------
// PickleFormat

/// A physical format: a factory of builders and readers.
pub trait PickleFormat {
    /// The encoded document.
    type Output;

    /// What a reader consumes, borrowed for the duration of one decode.
    type Input: ?Sized;

    type Builder: EntryBuilder;

    type Reader<'de>: EntryReader;

    /// Creates a builder for one encode call.
    fn create_builder(&self) -> Self::Builder;

    /// Turns a fully written builder into the output document.
    fn finish_builder(&self, builder: Self::Builder) -> Result<Self::Output>;

    /// Creates a reader over `input` for one decode call.
    fn create_reader<'de>(&self, input: &'de Self::Input) -> Result<Self::Reader<'de>>;
}
