use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

// -----------------------------------------------------------------------------
// Primitive

/// A raw leaf payload handed to or read from a format.
///
/// Leaf entries carry exactly one primitive in place of their fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive<'a> {
    Unit,
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    I128(i128),
    Isize(isize),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
    Usize(usize),
    F32(f32),
    F64(f64),
    Str(Cow<'a, str>),
    Bytes(Cow<'a, [u8]>),
}

/// The kind of a [`Primitive`], used to tell a reader what to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Unit,
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    F32,
    F64,
    Str,
    Bytes,
}

impl Primitive<'_> {
    /// Returns the kind of this payload.
    pub const fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Unit => PrimitiveKind::Unit,
            Self::Bool(_) => PrimitiveKind::Bool,
            Self::Char(_) => PrimitiveKind::Char,
            Self::I8(_) => PrimitiveKind::I8,
            Self::I16(_) => PrimitiveKind::I16,
            Self::I32(_) => PrimitiveKind::I32,
            Self::I64(_) => PrimitiveKind::I64,
            Self::I128(_) => PrimitiveKind::I128,
            Self::Isize(_) => PrimitiveKind::Isize,
            Self::U8(_) => PrimitiveKind::U8,
            Self::U16(_) => PrimitiveKind::U16,
            Self::U32(_) => PrimitiveKind::U32,
            Self::U64(_) => PrimitiveKind::U64,
            Self::U128(_) => PrimitiveKind::U128,
            Self::Usize(_) => PrimitiveKind::Usize,
            Self::F32(_) => PrimitiveKind::F32,
            Self::F64(_) => PrimitiveKind::F64,
            Self::Str(_) => PrimitiveKind::Str,
            Self::Bytes(_) => PrimitiveKind::Bytes,
        }
    }

    /// Detaches the payload from any borrowed buffer.
    pub fn into_owned(self) -> Primitive<'static> {
        match self {
            Self::Str(v) => Primitive::Str(Cow::Owned(v.into_owned())),
            Self::Bytes(v) => Primitive::Bytes(Cow::Owned(v.into_owned())),
            Self::Unit => Primitive::Unit,
            Self::Bool(v) => Primitive::Bool(v),
            Self::Char(v) => Primitive::Char(v),
            Self::I8(v) => Primitive::I8(v),
            Self::I16(v) => Primitive::I16(v),
            Self::I32(v) => Primitive::I32(v),
            Self::I64(v) => Primitive::I64(v),
            Self::I128(v) => Primitive::I128(v),
            Self::Isize(v) => Primitive::Isize(v),
            Self::U8(v) => Primitive::U8(v),
            Self::U16(v) => Primitive::U16(v),
            Self::U32(v) => Primitive::U32(v),
            Self::U64(v) => Primitive::U64(v),
            Self::U128(v) => Primitive::U128(v),
            Self::Usize(v) => Primitive::Usize(v),
            Self::F32(v) => Primitive::F32(v),
            Self::F64(v) => Primitive::F64(v),
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unit => "unit",
            Self::Bool => "bool",
            Self::Char => "char",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::I128 => "i128",
            Self::Isize => "isize",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::U128 => "u128",
            Self::Usize => "usize",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Str => "string",
            Self::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

// -----------------------------------------------------------------------------
// Conversions

macro_rules! impl_primitive_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Primitive<'_> {
                #[inline]
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_primitive_from! {
    bool => Bool, char => Char,
    i8 => I8, i16 => I16, i32 => I32, i64 => I64, i128 => I128, isize => Isize,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64, u128 => U128, usize => Usize,
    f32 => F32, f64 => F64,
}

impl<'a> From<&'a str> for Primitive<'a> {
    #[inline]
    fn from(value: &'a str) -> Self {
        Self::Str(Cow::Borrowed(value))
    }
}

impl From<String> for Primitive<'_> {
    #[inline]
    fn from(value: String) -> Self {
        Self::Str(Cow::Owned(value))
    }
}

impl<'a> From<&'a [u8]> for Primitive<'a> {
    #[inline]
    fn from(value: &'a [u8]) -> Self {
        Self::Bytes(Cow::Borrowed(value))
    }
}

impl From<Vec<u8>> for Primitive<'_> {
    #[inline]
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(Cow::Owned(value))
    }
}
