use alloc::vec::Vec;

use super::varint::{write_len, write_varint};
use crate::error::{PickleError, Result};
use crate::format::{EntryBuilder, Hints, Primitive};
use crate::tag::TypeTag;

// -----------------------------------------------------------------------------
// Frame

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    /// Neither a field nor a payload was written yet.
    Pending,
    Fields,
    Primitive,
}

/// An open entry. Its key is already written.
#[derive(Debug)]
struct Frame {
    /// Index of the entry's count slot.
    slot: usize,
    fields: u32,
    kind: FrameKind,
    awaiting_value: bool,
}

/// Where a field count goes, right after the key of its entry.
#[derive(Debug)]
struct CountSlot {
    pos: usize,
    /// `None` for leaves, which carry a payload instead.
    count: Option<u32>,
}

// -----------------------------------------------------------------------------
// BinaryBuilder

/// [`EntryBuilder`] of the [`BinaryFormat`](super::BinaryFormat).
///
/// Field counts are only known when an entry ends. Keys, names and payloads
/// go straight to one buffer, and the counts are spliced in at their recorded
/// positions when the root entry is taken out.
#[derive(Debug, Default)]
pub struct BinaryBuilder {
    out: Vec<u8>,
    slots: Vec<CountSlot>,
    stack: Vec<Frame>,
    root_written: bool,
}

impl BinaryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the encoded root entry, checking that it was closed.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        if !self.stack.is_empty() {
            return Err(PickleError::malformed("entry was never closed"));
        }
        if !self.root_written {
            return Err(PickleError::malformed("no root entry was written"));
        }

        // Slots were recorded in begin order, so their positions only grow.
        let mut bytes = Vec::with_capacity(self.out.len() + self.slots.len());
        let mut copied = 0;
        for slot in &self.slots {
            if let Some(count) = slot.count {
                bytes.extend_from_slice(&self.out[copied..slot.pos]);
                write_varint(&mut bytes, count);
                copied = slot.pos;
            }
        }
        bytes.extend_from_slice(&self.out[copied..]);
        Ok(bytes)
    }

    /// Checks that the next entry has a place to go, and claims it.
    fn claim_slot(&mut self) -> Result<()> {
        match self.stack.last_mut() {
            Some(parent) => {
                if !parent.awaiting_value {
                    return Err(PickleError::malformed("entry written outside a field slot"));
                }
                parent.awaiting_value = false;
                Ok(())
            }
            None if self.root_written => Err(PickleError::malformed("more than one root entry")),
            None => Ok(()),
        }
    }

    fn top(&mut self) -> Result<&mut Frame> {
        self.stack
            .last_mut()
            .ok_or_else(|| PickleError::malformed("no open entry"))
    }
}

impl EntryBuilder for BinaryBuilder {
    fn begin_entry(&mut self, tag: &TypeTag, hints: &Hints) -> Result<()> {
        self.claim_slot()?;
        if hints.elided {
            write_varint(&mut self.out, 0);
        } else {
            let key = tag.key();
            if key.is_empty() {
                return Err(PickleError::malformed("empty type key"));
            }
            write_len(&mut self.out, key.len())?;
            self.out.extend_from_slice(key.as_bytes());
        }

        self.slots.push(CountSlot {
            pos: self.out.len(),
            count: None,
        });
        self.stack.push(Frame {
            slot: self.slots.len() - 1,
            fields: 0,
            kind: FrameKind::Pending,
            awaiting_value: false,
        });
        Ok(())
    }

    fn begin_field(&mut self, name: &str) -> Result<()> {
        let frame = self.top()?;
        match frame.kind {
            FrameKind::Primitive => {
                return Err(PickleError::malformed("field written into a leaf entry"));
            }
            _ if frame.awaiting_value => {
                return Err(PickleError::malformed("previous field has no value"));
            }
            _ => {}
        }
        frame.kind = FrameKind::Fields;
        frame.fields += 1;
        frame.awaiting_value = true;
        write_len(&mut self.out, name.len())?;
        self.out.extend_from_slice(name.as_bytes());
        Ok(())
    }

    fn put_primitive(&mut self, value: Primitive<'_>) -> Result<()> {
        let frame = self.top()?;
        if frame.kind != FrameKind::Pending {
            return Err(PickleError::malformed("payload written into an entry with content"));
        }
        frame.kind = FrameKind::Primitive;
        write_payload(&mut self.out, value)
    }

    fn end_entry(&mut self) -> Result<()> {
        let Some(frame) = self.stack.pop() else {
            return Err(PickleError::malformed("end of entry without a begin"));
        };
        if frame.awaiting_value {
            return Err(PickleError::malformed("field has no value"));
        }

        if frame.kind != FrameKind::Primitive {
            self.slots[frame.slot].count = Some(frame.fields);
        }
        if self.stack.is_empty() {
            self.root_written = true;
        }
        Ok(())
    }
}

fn write_payload(buf: &mut Vec<u8>, value: Primitive<'_>) -> Result<()> {
    match value {
        Primitive::Unit => {}
        Primitive::Bool(v) => buf.push(u8::from(v)),
        Primitive::Char(v) => buf.extend_from_slice(&u32::from(v).to_le_bytes()),
        Primitive::I8(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Primitive::I16(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Primitive::I32(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Primitive::I64(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Primitive::I128(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Primitive::Isize(v) => buf.extend_from_slice(&(v as i64).to_le_bytes()),
        Primitive::U8(v) => buf.push(v),
        Primitive::U16(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Primitive::U32(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Primitive::U64(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Primitive::U128(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Primitive::Usize(v) => buf.extend_from_slice(&(v as u64).to_le_bytes()),
        Primitive::F32(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Primitive::F64(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Primitive::Str(v) => {
            write_len(buf, v.len())?;
            buf.extend_from_slice(v.as_bytes());
        }
        Primitive::Bytes(v) => {
            write_len(buf, v.len())?;
            buf.extend_from_slice(&v);
        }
    }
    Ok(())
}
