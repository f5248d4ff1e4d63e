use alloc::borrow::Cow;
use alloc::format;
use alloc::vec::Vec;

use super::varint::read_varint;
use crate::error::{PickleError, Result};
use crate::format::{EntryReader, Primitive, PrimitiveKind};

// -----------------------------------------------------------------------------
// Frame

#[derive(Debug, Default)]
struct Frame {
    /// Unread fields, `None` until the count has been read.
    remaining: Option<u32>,
    primitive: bool,
    awaiting_value: bool,
}

// -----------------------------------------------------------------------------
// BinaryReader

/// [`EntryReader`] of the [`BinaryFormat`](super::BinaryFormat).
#[derive(Debug)]
pub struct BinaryReader<'de> {
    input: &'de [u8],
    pos: usize,
    stack: Vec<Frame>,
    root_read: bool,
}

impl<'de> BinaryReader<'de> {
    pub fn new(input: &'de [u8]) -> Self {
        Self {
            input,
            pos: 0,
            stack: Vec::new(),
            root_read: false,
        }
    }

    fn take(&mut self, len: usize) -> Result<&'de [u8]> {
        let input: &'de [u8] = self.input;
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= input.len())
            .ok_or_else(|| PickleError::malformed("unexpected end of input"))?;
        let bytes = &input[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut array = [0_u8; N];
        array.copy_from_slice(self.take(N)?);
        Ok(array)
    }

    fn varint(&mut self) -> Result<u32> {
        read_varint(self.input, &mut self.pos)
    }

    fn str(&mut self) -> Result<&'de str> {
        let len = self.varint()? as usize;
        let bytes = self.take(len)?;
        core::str::from_utf8(bytes).map_err(|_| PickleError::malformed("invalid UTF-8"))
    }

    fn top(&mut self) -> Result<&mut Frame> {
        self.stack
            .last_mut()
            .ok_or_else(|| PickleError::malformed("no open entry"))
    }

    /// Reads the field count of the top frame if not done yet.
    fn remaining(&mut self) -> Result<u32> {
        let pending = self.top()?.remaining;
        match pending {
            Some(count) => Ok(count),
            None => {
                let count = self.varint()?;
                self.top()?.remaining = Some(count);
                Ok(count)
            }
        }
    }

    fn payload(&mut self, kind: PrimitiveKind) -> Result<Primitive<'static>> {
        Ok(match kind {
            PrimitiveKind::Unit => Primitive::Unit,
            PrimitiveKind::Bool => match self.take_array::<1>()? {
                [0] => Primitive::Bool(false),
                [1] => Primitive::Bool(true),
                [other] => {
                    return Err(PickleError::malformed(format!("invalid bool byte {other}")));
                }
            },
            PrimitiveKind::Char => {
                let code = u32::from_le_bytes(self.take_array()?);
                let Some(c) = char::from_u32(code) else {
                    return Err(PickleError::malformed(format!("invalid char {code:#x}")));
                };
                Primitive::Char(c)
            }
            PrimitiveKind::I8 => Primitive::I8(i8::from_le_bytes(self.take_array()?)),
            PrimitiveKind::I16 => Primitive::I16(i16::from_le_bytes(self.take_array()?)),
            PrimitiveKind::I32 => Primitive::I32(i32::from_le_bytes(self.take_array()?)),
            PrimitiveKind::I64 => Primitive::I64(i64::from_le_bytes(self.take_array()?)),
            PrimitiveKind::I128 => Primitive::I128(i128::from_le_bytes(self.take_array()?)),
            PrimitiveKind::Isize => {
                let v = i64::from_le_bytes(self.take_array()?);
                Primitive::Isize(
                    isize::try_from(v)
                        .map_err(|_| PickleError::malformed("isize out of range"))?,
                )
            }
            PrimitiveKind::U8 => Primitive::U8(u8::from_le_bytes(self.take_array()?)),
            PrimitiveKind::U16 => Primitive::U16(u16::from_le_bytes(self.take_array()?)),
            PrimitiveKind::U32 => Primitive::U32(u32::from_le_bytes(self.take_array()?)),
            PrimitiveKind::U64 => Primitive::U64(u64::from_le_bytes(self.take_array()?)),
            PrimitiveKind::U128 => Primitive::U128(u128::from_le_bytes(self.take_array()?)),
            PrimitiveKind::Usize => {
                let v = u64::from_le_bytes(self.take_array()?);
                Primitive::Usize(
                    usize::try_from(v)
                        .map_err(|_| PickleError::malformed("usize out of range"))?,
                )
            }
            PrimitiveKind::F32 => Primitive::F32(f32::from_le_bytes(self.take_array()?)),
            PrimitiveKind::F64 => Primitive::F64(f64::from_le_bytes(self.take_array()?)),
            PrimitiveKind::Str => Primitive::Str(Cow::Owned(self.str()?.into())),
            PrimitiveKind::Bytes => {
                let len = self.varint()? as usize;
                Primitive::Bytes(Cow::Owned(self.take(len)?.to_vec()))
            }
        })
    }
}

impl EntryReader for BinaryReader<'_> {
    fn begin_entry(&mut self) -> Result<Option<Cow<'_, str>>> {
        match self.stack.last_mut() {
            Some(parent) => {
                if !parent.awaiting_value {
                    return Err(PickleError::malformed("entry read outside a field slot"));
                }
                parent.awaiting_value = false;
            }
            None if self.root_read => {
                return Err(PickleError::malformed("more than one root entry"));
            }
            None => {}
        }

        let key = self.str()?;
        self.stack.push(Frame::default());
        if key.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Cow::Borrowed(key)))
        }
    }

    fn read_field(&mut self, name: &str) -> Result<()> {
        let top = self.top()?;
        if top.primitive {
            return Err(PickleError::malformed("field read from a leaf entry"));
        }
        if top.awaiting_value {
            return Err(PickleError::malformed("previous field value was not read"));
        }

        let remaining = self.remaining()?;
        if remaining == 0 {
            return Err(PickleError::malformed(format!(
                "expected field `{name}`, entry has no more fields"
            )));
        }
        let found = self.str()?;
        if found != name {
            return Err(PickleError::malformed(format!(
                "expected field `{name}`, found `{found}`"
            )));
        }

        let top = self.top()?;
        top.remaining = Some(remaining - 1);
        top.awaiting_value = true;
        Ok(())
    }

    fn read_primitive(&mut self, kind: PrimitiveKind) -> Result<Primitive<'static>> {
        let top = self.top()?;
        if top.primitive || top.remaining.is_some() {
            return Err(PickleError::malformed("payload read from an entry with content"));
        }
        top.primitive = true;
        self.payload(kind)
    }

    fn end_entry(&mut self) -> Result<()> {
        let top = self.top()?;
        if top.awaiting_value {
            return Err(PickleError::malformed("field value was not read"));
        }
        if !top.primitive {
            let remaining = self.remaining()?;
            if remaining != 0 {
                return Err(PickleError::malformed(format!(
                    "{remaining} field(s) left unread"
                )));
            }
        }

        self.stack.pop();
        if self.stack.is_empty() {
            self.root_read = true;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if !self.stack.is_empty() || !self.root_read {
            return Err(PickleError::malformed("root entry was not fully read"));
        }
        if self.pos != self.input.len() {
            return Err(PickleError::malformed(format!(
                "{} trailing byte(s)",
                self.input.len() - self.pos
            )));
        }
        Ok(())
    }
}
