use alloc::borrow::Cow;
use alloc::format;
use alloc::string::String;

use crate::error::{PickleError, Result};
use crate::format::{Primitive, PrimitiveKind};
use crate::pickle::{Pickle, PickleWriter, Unpickle, UnpickleReader};
use crate::tag::TypeTag;

#[cold]
#[inline(never)]
fn unexpected_payload(expected: PrimitiveKind, found: &Primitive<'_>) -> PickleError {
    PickleError::malformed(format!(
        "expected a {expected} payload, found {}",
        found.kind()
    ))
}

macro_rules! impl_primitive {
    ($($ty:ty => $path:literal, $kind:ident;)*) => {
        crate::impl_type_path! {
            $($ty => $path,)*
        }

        $(
            impl Pickle for $ty {
                const CLOSED: bool = true;

                #[inline]
                fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
                    w.put_leaf(&TypeTag::from_static($path), Primitive::$kind(*self))
                }
            }

            impl Unpickle for $ty {
                fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
                    r.expect_tag::<Self>(&tag)?;
                    match r.read_leaf(PrimitiveKind::$kind)? {
                        Primitive::$kind(value) => Ok(value),
                        other => Err(unexpected_payload(PrimitiveKind::$kind, &other)),
                    }
                }
            }
        )*
    };
}

impl_primitive! {
    bool => "bool", Bool;
    char => "char", Char;
    i8 => "i8", I8;
    i16 => "i16", I16;
    i32 => "i32", I32;
    i64 => "i64", I64;
    i128 => "i128", I128;
    isize => "isize", Isize;
    u8 => "u8", U8;
    u16 => "u16", U16;
    u32 => "u32", U32;
    u64 => "u64", U64;
    u128 => "u128", U128;
    usize => "usize", Usize;
    f32 => "f32", F32;
    f64 => "f64", F64;
}

// -----------------------------------------------------------------------------
// Unit

crate::impl_type_path!(() => "()");

impl Pickle for () {
    const CLOSED: bool = true;

    #[inline]
    fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
        w.put_leaf(&TypeTag::from_static("()"), Primitive::Unit)
    }
}

impl Unpickle for () {
    fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
        r.expect_tag::<Self>(&tag)?;
        match r.read_leaf(PrimitiveKind::Unit)? {
            Primitive::Unit => Ok(()),
            other => Err(unexpected_payload(PrimitiveKind::Unit, &other)),
        }
    }
}

// -----------------------------------------------------------------------------
// String

crate::impl_type_path!(String => "alloc::string::String");

impl Pickle for String {
    const CLOSED: bool = true;

    #[inline]
    fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
        w.put_leaf(
            &TypeTag::from_static("alloc::string::String"),
            Primitive::Str(Cow::Borrowed(self)),
        )
    }
}

impl Unpickle for String {
    fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
        r.expect_tag::<Self>(&tag)?;
        match r.read_leaf(PrimitiveKind::Str)? {
            Primitive::Str(value) => Ok(value.into_owned()),
            other => Err(unexpected_payload(PrimitiveKind::Str, &other)),
        }
    }
}
