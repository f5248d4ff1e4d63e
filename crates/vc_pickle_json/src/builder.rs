use alloc::string::String;
use alloc::vec::Vec;

use serde_json::{Map, Value};
use vc_pickle::format::{EntryBuilder, Hints, Primitive};
use vc_pickle::tag::TypeTag;
use vc_pickle::{PickleError, Result};

use crate::payload::primitive_to_json;

pub(crate) const TYPE: &str = "$type";
pub(crate) const ID: &str = "$id";
pub(crate) const VALUE: &str = "$value";
pub(crate) const REF: &str = "$ref";
pub(crate) const ORDER: &str = "$order";

#[cold]
#[inline(never)]
pub(crate) fn malformed(reason: impl Into<String>) -> PickleError {
    PickleError::MalformedEntry {
        reason: reason.into(),
    }
}

// -----------------------------------------------------------------------------
// Frame

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Pending,
    Fields,
    Primitive,
    Null,
    Ref,
}

#[derive(Debug)]
struct Frame {
    object: Map<String, Value>,
    kind: FrameKind,
    /// Name of the field whose entry comes next.
    field: Option<String>,
    /// Field names in write order.
    order: Vec<String>,
    /// A name was repeated after another one, the object alone loses the order.
    interleaved: bool,
}

impl Frame {
    fn new(object: Map<String, Value>, kind: FrameKind) -> Self {
        Self {
            object,
            kind,
            field: None,
            order: Vec::new(),
            interleaved: false,
        }
    }

    fn into_value(mut self) -> Result<Value> {
        match self.kind {
            FrameKind::Null => Ok(Value::Null),
            FrameKind::Ref if !self.object.contains_key(REF) => {
                Err(malformed("back reference without an object id"))
            }
            _ => {
                if self.interleaved {
                    let order = self.order.into_iter().map(Value::String).collect();
                    self.object.insert(ORDER.into(), Value::Array(order));
                }
                Ok(Value::Object(self.object))
            }
        }
    }

    /// Stores the entry of the pending field, grouping repeated names.
    fn put_field_value(&mut self, value: Value) -> Result<()> {
        let Some(name) = self.field.take() else {
            return Err(malformed("entry written outside a field slot"));
        };
        match self.object.get_mut(&name) {
            Some(Value::Array(values)) => values.push(value),
            Some(slot) => {
                let first = slot.take();
                *slot = Value::Array(alloc::vec![first, value]);
            }
            None => {
                self.object.insert(name, value);
            }
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// JsonBuilder

/// [`EntryBuilder`] of the [`JsonFormat`](crate::JsonFormat).
#[derive(Debug, Default)]
pub struct JsonBuilder {
    stack: Vec<Frame>,
    root: Option<Value>,
}

impl JsonBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the root entry, checking that it was closed.
    pub fn into_value(self) -> Result<Value> {
        if !self.stack.is_empty() {
            return Err(malformed("entry was never closed"));
        }
        self.root
            .ok_or_else(|| malformed("no root entry was written"))
    }

    fn top(&mut self) -> Result<&mut Frame> {
        self.stack
            .last_mut()
            .ok_or_else(|| malformed("no open entry"))
    }
}

impl EntryBuilder for JsonBuilder {
    fn begin_entry(&mut self, tag: &TypeTag, hints: &Hints) -> Result<()> {
        match self.stack.last() {
            Some(parent) if parent.field.is_none() => {
                return Err(malformed("entry written outside a field slot"));
            }
            None if self.root.is_some() => return Err(malformed("more than one root entry")),
            _ => {}
        }

        let mut object = Map::new();
        let kind = if tag.is_null() {
            FrameKind::Null
        } else if tag.is_ref() {
            FrameKind::Ref
        } else {
            if !hints.elided {
                object.insert(TYPE.into(), Value::String(tag.key().into()));
            }
            if let Some(id) = hints.object_id {
                object.insert(ID.into(), Value::from(id));
            }
            FrameKind::Pending
        };

        self.stack.push(Frame::new(object, kind));
        Ok(())
    }

    fn begin_field(&mut self, name: &str) -> Result<()> {
        let frame = self.top()?;
        match frame.kind {
            FrameKind::Pending | FrameKind::Fields => {}
            _ => return Err(malformed("field written into a leaf entry")),
        }
        if frame.field.is_some() {
            return Err(malformed("previous field has no value"));
        }
        if name.starts_with('$') {
            return Err(malformed(alloc::format!(
                "field name `{name}` is reserved by the JSON format"
            )));
        }
        let repeated = frame.object.contains_key(name);
        if repeated && frame.order.last().is_some_and(|last| last != name) {
            frame.interleaved = true;
        }
        frame.kind = FrameKind::Fields;
        frame.order.push(name.into());
        frame.field = Some(name.into());
        Ok(())
    }

    fn put_primitive(&mut self, value: Primitive<'_>) -> Result<()> {
        let frame = self.top()?;
        match (frame.kind, value) {
            (FrameKind::Pending, value) => {
                frame.object.insert(VALUE.into(), primitive_to_json(value));
                frame.kind = FrameKind::Primitive;
            }
            (FrameKind::Ref, Primitive::U32(id)) if frame.object.is_empty() => {
                frame.object.insert(REF.into(), Value::from(id));
            }
            (FrameKind::Ref, other) => {
                return Err(malformed(alloc::format!(
                    "back reference carries a {} payload",
                    other.kind()
                )));
            }
            _ => return Err(malformed("payload written into an entry with content")),
        }
        Ok(())
    }

    fn end_entry(&mut self) -> Result<()> {
        let Some(frame) = self.stack.pop() else {
            return Err(malformed("end of entry without a begin"));
        };
        if frame.field.is_some() {
            return Err(malformed("field has no value"));
        }

        let value = frame.into_value()?;
        match self.stack.last_mut() {
            Some(parent) => parent.put_field_value(value),
            None => {
                self.root = Some(value);
                Ok(())
            }
        }
    }
}
