use alloc::borrow::Cow;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::iter;

use serde_json::{Map, Value};
use vc_pickle::Result;
use vc_pickle::format::{EntryReader, Primitive, PrimitiveKind};
use vc_pickle::tag::TypeTag;

use crate::builder::{ID, ORDER, REF, TYPE, VALUE, malformed};
use crate::payload::primitive_from_json;

// -----------------------------------------------------------------------------
// Frame

/// An open entry.
#[derive(Debug)]
enum Frame<'de> {
    Null,
    /// A leaf, holding its payload until it is read.
    Leaf(Option<&'de Value>),
    Fields {
        map: &'de Map<String, Value>,
        /// Field names in write order.
        order: Vec<&'de str>,
        /// Index in `order` of the next field.
        next: usize,
        /// How many entries of each field name were read.
        cursors: BTreeMap<&'de str, usize>,
        /// The entry of the field opened last, not begun yet.
        pending: Option<&'de Value>,
    },
}

fn is_field(name: &str) -> bool {
    !name.starts_with('$')
}

fn entry_count(value: &Value) -> usize {
    match value {
        Value::Array(values) => values.len(),
        _ => 1,
    }
}

/// Returns the field names of `map` in write order.
///
/// Without `$order`, every name holds a run of consecutive fields.
fn field_order(map: &Map<String, Value>) -> Result<Vec<&str>> {
    let fields = map.iter().filter(|(name, _)| is_field(name));

    let Some(order) = map.get(ORDER) else {
        return Ok(fields
            .flat_map(|(name, value)| iter::repeat_n(name.as_str(), entry_count(value)))
            .collect());
    };

    let Value::Array(names) = order else {
        return Err(malformed(format!("`{ORDER}` is not an array: `{order}`")));
    };
    let order = names
        .iter()
        .map(|name| match name {
            Value::String(name) if is_field(name) => Ok(name.as_str()),
            other => Err(malformed(format!("invalid name in `{ORDER}`: `{other}`"))),
        })
        .collect::<Result<Vec<_>>>()?;

    let total: usize = fields.map(|(_, value)| entry_count(value)).sum();
    if order.len() != total {
        return Err(malformed(format!(
            "`{ORDER}` names {} field(s), the entry has {total}",
            order.len()
        )));
    }
    Ok(order)
}

// -----------------------------------------------------------------------------
// JsonReader

/// [`EntryReader`] of the [`JsonFormat`](crate::JsonFormat).
///
/// Fields must be read in write order, each name yielding its entries in
/// turn. Object ids recorded as `$id` are checked against the ids the
/// decoder reserves.
#[derive(Debug)]
pub struct JsonReader<'de> {
    root: &'de Value,
    stack: Vec<Frame<'de>>,
    root_read: bool,
    /// `$id` of the entry begun last.
    last_id: Option<&'de Value>,
}

impl<'de> JsonReader<'de> {
    pub fn new(root: &'de Value) -> Self {
        Self {
            root,
            stack: Vec::new(),
            root_read: false,
            last_id: None,
        }
    }

    /// Returns the value the next entry is read from.
    fn slot(&mut self) -> Result<&'de Value> {
        match self.stack.last_mut() {
            Some(Frame::Fields { pending, .. }) => pending
                .take()
                .ok_or_else(|| malformed("entry read outside a field slot")),
            Some(_) => Err(malformed("entry read inside a leaf entry")),
            None if self.root_read => Err(malformed("more than one root entry")),
            None => {
                self.root_read = true;
                Ok(self.root)
            }
        }
    }
}

impl<'de> EntryReader for JsonReader<'de> {
    fn begin_entry(&mut self) -> Result<Option<Cow<'_, str>>> {
        self.last_id = None;
        let value = self.slot()?;
        let map = match value {
            Value::Null => {
                self.stack.push(Frame::Null);
                return Ok(Some(Cow::Borrowed(TypeTag::NULL_KEY)));
            }
            Value::Object(map) => map,
            other => {
                return Err(malformed(format!("expected an entry, found `{other}`")));
            }
        };

        if let Some(id) = map.get(REF) {
            self.stack.push(Frame::Leaf(Some(id)));
            return Ok(Some(Cow::Borrowed(TypeTag::REF_KEY)));
        }

        let key = match map.get(TYPE) {
            Some(Value::String(key)) => Some(key.as_str()),
            Some(other) => return Err(malformed(format!("type key is not a string: `{other}`"))),
            None => None,
        };

        let frame = match map.get(VALUE) {
            Some(payload) => Frame::Leaf(Some(payload)),
            None => Frame::Fields {
                map,
                order: field_order(map)?,
                next: 0,
                cursors: BTreeMap::new(),
                pending: None,
            },
        };
        self.stack.push(frame);
        self.last_id = map.get(ID);
        Ok(key.map(Cow::Borrowed))
    }

    fn read_field(&mut self, name: &str) -> Result<()> {
        let Some(Frame::Fields {
            map,
            order,
            next,
            cursors,
            pending,
        }) = self.stack.last_mut()
        else {
            return Err(malformed(format!("field `{name}` read outside an entry with fields")));
        };
        if pending.is_some() {
            return Err(malformed("previous field was not read"));
        }

        let map: &'de Map<String, Value> = *map;
        let Some(&found) = order.get(*next) else {
            return Err(malformed(format!("missing field `{name}`")));
        };
        if found != name {
            return Err(malformed(if map.contains_key(name) {
                format!("expected field `{name}`, found `{found}`")
            } else {
                format!("missing field `{name}`")
            }));
        }

        let cursor = cursors.entry(found).or_insert(0);
        let value = match map.get(found) {
            Some(Value::Array(values)) => values.get(*cursor),
            value if *cursor == 0 => value,
            _ => None,
        };
        let Some(value) = value else {
            return Err(malformed(format!("field `{name}` has no more entries")));
        };

        *cursor += 1;
        *next += 1;
        *pending = Some(value);
        Ok(())
    }

    fn read_primitive(&mut self, kind: PrimitiveKind) -> Result<Primitive<'static>> {
        match self.stack.last_mut() {
            Some(Frame::Leaf(payload)) => match payload.take() {
                Some(value) => primitive_from_json(kind, value),
                None => Err(malformed("payload was already read")),
            },
            _ => Err(malformed(format!("expected a {kind} payload in a non-leaf entry"))),
        }
    }

    fn end_entry(&mut self) -> Result<()> {
        match self.stack.pop() {
            None => Err(malformed("end of entry without a begin")),
            Some(Frame::Leaf(Some(_))) => Err(malformed("payload was not read")),
            Some(Frame::Fields { pending: Some(_), .. }) => Err(malformed("field has no value")),
            Some(Frame::Fields { order, next, .. }) if next < order.len() => Err(malformed(
                format!("{} unread field(s)", order.len() - next),
            )),
            Some(_) => Ok(()),
        }
    }

    fn claim_object_id(&mut self, id: u32) -> Result<()> {
        match self.last_id.take() {
            None => Ok(()),
            Some(found) if found.as_u64() == Some(u64::from(id)) => Ok(()),
            Some(found) => Err(malformed(format!(
                "object id `{found}` is out of order, expected {id}"
            ))),
        }
    }

    fn finish(&mut self) -> Result<()> {
        if !self.stack.is_empty() || !self.root_read {
            return Err(malformed("root entry was not fully read"));
        }
        Ok(())
    }
}
