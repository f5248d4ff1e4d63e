//! The reference binary format.
//!
//! # Layout
//!
//! ```text
//! entry   = key ( count { name entry }  |  payload )
//! key     = varint(len) utf8           ; len == 0: tag elided
//! name    = varint(len) utf8
//! count   = varint
//! ```
//!
//! Varints are unsigned LEB128 in the `u32` range. Payloads are:
//!
//! | kind | bytes |
//! |---|---|
//! | unit | none |
//! | bool | one byte, `0` or `1` |
//! | char | `u32`, little endian |
//! | `iN` / `uN` | fixed width, little endian (`isize`/`usize` as 64 bits) |
//! | `f32` / `f64` | IEEE 754 bits, little endian |
//! | string, bytes | `varint(len)` followed by the data |
//!
//! A `Null` entry has no fields, a `Ref` entry carries the object id as a
//! `u32` payload. Object ids of full entries are implicit: readers number
//! shared objects in the order their entries begin.

mod builder;
mod reader;
mod varint;

pub use builder::BinaryBuilder;
pub use reader::BinaryReader;

use alloc::vec::Vec;

use crate::error::Result;
use crate::format::PickleFormat;

/// The reference binary [`PickleFormat`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryFormat;

impl PickleFormat for BinaryFormat {
    type Output = Vec<u8>;
    type Input = [u8];
    type Builder = BinaryBuilder;
    type Reader<'de> = BinaryReader<'de>;

    #[inline]
    fn create_builder(&self) -> Self::Builder {
        BinaryBuilder::new()
    }

    #[inline]
    fn finish_builder(&self, builder: Self::Builder) -> Result<Self::Output> {
        builder.into_bytes()
    }

    #[inline]
    fn create_reader<'de>(&self, input: &'de [u8]) -> Result<Self::Reader<'de>> {
        Ok(BinaryReader::new(input))
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{BinaryBuilder, BinaryReader};
    use crate::error::PickleError;
    use crate::format::{EntryBuilder, EntryReader, Hints, Primitive, PrimitiveKind};
    use crate::tag::TypeTag;
    use alloc::vec::Vec;

    fn point(x: i32, y: i32) -> Vec<u8> {
        let mut b = BinaryBuilder::new();
        let leaf = TypeTag::of::<i32>();
        b.begin_entry(&TypeTag::from_static("demo::Point"), &Hints::NONE)
            .unwrap();
        for (name, v) in [("x", x), ("y", y)] {
            b.begin_field(name).unwrap();
            b.begin_entry(&leaf, &Hints::NONE.with_elided(true)).unwrap();
            b.put_primitive(Primitive::I32(v)).unwrap();
            b.end_entry().unwrap();
        }
        b.end_entry().unwrap();
        b.into_bytes().unwrap()
    }

    #[test]
    fn struct_layout() {
        let bytes = point(1, -1);
        let mut expected = Vec::new();
        expected.push(11);
        expected.extend_from_slice(b"demo::Point");
        expected.push(2);
        expected.extend_from_slice(&[1, b'x', 0, 1, 0, 0, 0]);
        expected.extend_from_slice(&[1, b'y', 0, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn counts_follow_their_keys() {
        // 130 fields need a two-byte count, the nested entry has none.
        let mut b = BinaryBuilder::new();
        b.begin_entry(&TypeTag::from_static("demo::Bag"), &Hints::NONE)
            .unwrap();
        b.begin_field("in").unwrap();
        b.begin_entry(&TypeTag::from_static("demo::Nil"), &Hints::NONE)
            .unwrap();
        b.end_entry().unwrap();
        for v in 0..129_u8 {
            b.begin_field("e").unwrap();
            b.begin_entry(&TypeTag::of::<u8>(), &Hints::NONE.with_elided(true))
                .unwrap();
            b.put_primitive(Primitive::U8(v)).unwrap();
            b.end_entry().unwrap();
        }
        b.end_entry().unwrap();

        let mut expected = Vec::new();
        expected.push(9);
        expected.extend_from_slice(b"demo::Bag");
        expected.extend_from_slice(&[0x82, 0x01]);
        expected.extend_from_slice(b"\x02in\x09demo::Nil\x00");
        for v in 0..129_u8 {
            expected.extend_from_slice(&[1, b'e', 0, v]);
        }
        assert_eq!(b.into_bytes().unwrap(), expected);
    }

    #[test]
    fn read_back() {
        let bytes = point(3, 4);
        let mut r = BinaryReader::new(&bytes);
        assert_eq!(r.begin_entry().unwrap().as_deref(), Some("demo::Point"));
        r.read_field("x").unwrap();
        assert_eq!(r.begin_entry().unwrap(), None);
        assert_eq!(r.read_primitive(PrimitiveKind::I32).unwrap(), Primitive::I32(3));
        r.end_entry().unwrap();
        r.read_field("y").unwrap();
        assert_eq!(r.begin_entry().unwrap(), None);
        assert_eq!(r.read_primitive(PrimitiveKind::I32).unwrap(), Primitive::I32(4));
        r.end_entry().unwrap();
        r.end_entry().unwrap();
        r.finish().unwrap();
    }

    #[test]
    fn field_name_mismatch() {
        let bytes = point(3, 4);
        let mut r = BinaryReader::new(&bytes);
        r.begin_entry().unwrap();
        let err = r.read_field("y").unwrap_err();
        assert!(matches!(err, PickleError::MalformedEntry { .. }));
    }

    #[test]
    fn unread_fields() {
        let bytes = point(3, 4);
        let mut r = BinaryReader::new(&bytes);
        r.begin_entry().unwrap();
        assert!(r.end_entry().is_err());
    }

    #[test]
    fn truncated_and_trailing() {
        let bytes = point(3, 4);

        let mut r = BinaryReader::new(&bytes[..bytes.len() - 2]);
        r.begin_entry().unwrap();
        r.read_field("x").unwrap();
        r.begin_entry().unwrap();
        r.read_primitive(PrimitiveKind::I32).unwrap();
        r.end_entry().unwrap();
        r.read_field("y").unwrap();
        r.begin_entry().unwrap();
        assert!(r.read_primitive(PrimitiveKind::I32).is_err());

        let mut long = bytes.clone();
        long.push(0);
        let mut r = BinaryReader::new(&long);
        r.begin_entry().unwrap();
        for name in ["x", "y"] {
            r.read_field(name).unwrap();
            r.begin_entry().unwrap();
            r.read_primitive(PrimitiveKind::I32).unwrap();
            r.end_entry().unwrap();
        }
        r.end_entry().unwrap();
        assert!(r.finish().is_err());
    }

    #[test]
    fn unbalanced_builder() {
        let mut b = BinaryBuilder::new();
        b.begin_entry(&TypeTag::from_static("demo::Point"), &Hints::NONE)
            .unwrap();
        b.begin_field("x").unwrap();
        assert!(b.begin_field("y").is_err());

        let mut b = BinaryBuilder::new();
        b.begin_entry(&TypeTag::from_static("demo::Point"), &Hints::NONE)
            .unwrap();
        b.begin_field("x").unwrap();
        assert!(b.end_entry().is_err());

        let mut b = BinaryBuilder::new();
        b.begin_entry(&TypeTag::NULL, &Hints::NONE).unwrap();
        assert!(b.into_bytes().is_err());
    }

    #[test]
    fn null_and_ref() {
        let mut b = BinaryBuilder::new();
        b.begin_entry(&TypeTag::from_static("demo::Pair"), &Hints::NONE)
            .unwrap();
        b.begin_field("a").unwrap();
        b.begin_entry(&TypeTag::NULL, &Hints::NONE).unwrap();
        b.end_entry().unwrap();
        b.begin_field("b").unwrap();
        b.begin_entry(&TypeTag::REF, &Hints::NONE).unwrap();
        b.put_primitive(Primitive::U32(5)).unwrap();
        b.end_entry().unwrap();
        b.end_entry().unwrap();
        let bytes = b.into_bytes().unwrap();

        let mut expected = Vec::new();
        expected.push(10);
        expected.extend_from_slice(b"demo::Pair");
        expected.push(2);
        expected.extend_from_slice(&[1, b'a', 15]);
        expected.extend_from_slice(b"vc_pickle::Null");
        expected.push(0);
        expected.extend_from_slice(&[1, b'b', 14]);
        expected.extend_from_slice(b"vc_pickle::Ref");
        expected.extend_from_slice(&[5, 0, 0, 0]);
        assert_eq!(bytes, expected);
    }
}
