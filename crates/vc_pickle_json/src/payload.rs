//! Primitive payloads as JSON scalars.

use alloc::borrow::Cow;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde_json::{Number, Value};
use vc_pickle::Result;
use vc_pickle::format::{Primitive, PrimitiveKind};

use crate::builder::malformed;

const NAN: &str = "NaN";
const INFINITY: &str = "inf";
const NEG_INFINITY: &str = "-inf";

fn float_to_json(value: f64) -> Value {
    match Number::from_f64(value) {
        Some(number) => Value::Number(number),
        None if value.is_nan() => Value::String(NAN.into()),
        None if value > 0.0 => Value::String(INFINITY.into()),
        None => Value::String(NEG_INFINITY.into()),
    }
}

fn float_from_json(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(s) => match s.as_str() {
            NAN => Some(f64::NAN),
            INFINITY => Some(f64::INFINITY),
            NEG_INFINITY => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn primitive_to_json(value: Primitive<'_>) -> Value {
    match value {
        Primitive::Unit => Value::Null,
        Primitive::Bool(v) => Value::Bool(v),
        Primitive::Char(v) => Value::String(v.to_string()),
        Primitive::I8(v) => Value::from(v),
        Primitive::I16(v) => Value::from(v),
        Primitive::I32(v) => Value::from(v),
        Primitive::I64(v) => Value::from(v),
        Primitive::Isize(v) => Value::from(v as i64),
        Primitive::U8(v) => Value::from(v),
        Primitive::U16(v) => Value::from(v),
        Primitive::U32(v) => Value::from(v),
        Primitive::U64(v) => Value::from(v),
        Primitive::Usize(v) => Value::from(v as u64),
        // Beyond the range JSON numbers are portable in.
        Primitive::I128(v) => Value::String(v.to_string()),
        Primitive::U128(v) => Value::String(v.to_string()),
        Primitive::F32(v) => float_to_json(f64::from(v)),
        Primitive::F64(v) => float_to_json(v),
        Primitive::Str(v) => Value::String(v.into_owned()),
        Primitive::Bytes(v) => Value::Array(v.iter().map(|&b| Value::from(b)).collect()),
    }
}

fn int<T: TryFrom<i64>>(value: &Value) -> Option<T> {
    value.as_i64().and_then(|v| T::try_from(v).ok())
}

fn uint<T: TryFrom<u64>>(value: &Value) -> Option<T> {
    value.as_u64().and_then(|v| T::try_from(v).ok())
}

fn wide<T: core::str::FromStr + TryFrom<i64> + TryFrom<u64>>(value: &Value) -> Option<T> {
    match value {
        Value::String(s) => s.parse().ok(),
        _ => int(value).or_else(|| uint(value)),
    }
}

fn bytes(value: &Value) -> Option<Vec<u8>> {
    value.as_array()?.iter().map(uint::<u8>).collect()
}

fn single_char(value: &Value) -> Option<char> {
    let mut chars = value.as_str()?.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

pub(crate) fn primitive_from_json(kind: PrimitiveKind, value: &Value) -> Result<Primitive<'static>> {
    let primitive = match kind {
        PrimitiveKind::Unit => value.is_null().then_some(Primitive::Unit),
        PrimitiveKind::Bool => value.as_bool().map(Primitive::Bool),
        PrimitiveKind::Char => single_char(value).map(Primitive::Char),
        PrimitiveKind::I8 => int(value).map(Primitive::I8),
        PrimitiveKind::I16 => int(value).map(Primitive::I16),
        PrimitiveKind::I32 => int(value).map(Primitive::I32),
        PrimitiveKind::I64 => int(value).map(Primitive::I64),
        PrimitiveKind::Isize => int(value).map(Primitive::Isize),
        PrimitiveKind::U8 => uint(value).map(Primitive::U8),
        PrimitiveKind::U16 => uint(value).map(Primitive::U16),
        PrimitiveKind::U32 => uint(value).map(Primitive::U32),
        PrimitiveKind::U64 => uint(value).map(Primitive::U64),
        PrimitiveKind::Usize => uint(value).map(Primitive::Usize),
        PrimitiveKind::I128 => wide(value).map(Primitive::I128),
        PrimitiveKind::U128 => wide(value).map(Primitive::U128),
        PrimitiveKind::F32 => float_from_json(value).map(|v| Primitive::F32(v as f32)),
        PrimitiveKind::F64 => float_from_json(value).map(Primitive::F64),
        PrimitiveKind::Str => value
            .as_str()
            .map(|s| Primitive::Str(Cow::Owned(String::from(s)))),
        PrimitiveKind::Bytes => bytes(value).map(|v| Primitive::Bytes(Cow::Owned(v))),
    };
    primitive.ok_or_else(|| malformed(format!("expected a {kind} payload, found `{value}`")))
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{primitive_from_json, primitive_to_json};
    use alloc::borrow::Cow;
    use alloc::string::ToString;
    use serde_json::{Value, json};
    use vc_pickle::PickleError;
    use vc_pickle::format::{Primitive, PrimitiveKind};

    #[test]
    fn wide_integers_are_strings() {
        let value = primitive_to_json(Primitive::U128(u128::MAX));
        assert_eq!(value, Value::String(u128::MAX.to_string()));
        assert_eq!(
            primitive_from_json(PrimitiveKind::U128, &value).unwrap(),
            Primitive::U128(u128::MAX)
        );
        // Small values written by hand as numbers are accepted too.
        assert_eq!(
            primitive_from_json(PrimitiveKind::I128, &json!(-3)).unwrap(),
            Primitive::I128(-3)
        );
    }

    #[test]
    fn non_finite_floats() {
        assert_eq!(primitive_to_json(Primitive::F64(f64::NAN)), json!("NaN"));
        assert_eq!(primitive_to_json(Primitive::F32(f32::INFINITY)), json!("inf"));
        assert_eq!(
            primitive_from_json(PrimitiveKind::F64, &json!("-inf")).unwrap(),
            Primitive::F64(f64::NEG_INFINITY)
        );
        let Primitive::F64(nan) = primitive_from_json(PrimitiveKind::F64, &json!("NaN")).unwrap()
        else {
            panic!("expected an f64 payload");
        };
        assert!(nan.is_nan());
    }

    #[test]
    fn chars_and_bytes() {
        assert_eq!(primitive_to_json(Primitive::Char('λ')), json!("λ"));
        assert!(primitive_from_json(PrimitiveKind::Char, &json!("ab")).is_err());

        let bytes = primitive_to_json(Primitive::Bytes(Cow::Borrowed(&[1, 2, 255])));
        assert_eq!(bytes, json!([1, 2, 255]));
        assert_eq!(
            primitive_from_json(PrimitiveKind::Bytes, &json!([1, 256])).err(),
            Some(PickleError::MalformedEntry {
                reason: "expected a bytes payload, found `[1,256]`".into()
            })
        );
    }

    #[test]
    fn out_of_range_integer() {
        let err = primitive_from_json(PrimitiveKind::U8, &json!(300)).unwrap_err();
        assert!(matches!(err, PickleError::MalformedEntry { .. }));
        assert!(primitive_from_json(PrimitiveKind::U32, &json!(-1)).is_err());
    }
}
