use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;

use serde_json::json;
use vc_pickle::tag::TypeTag;
use vc_pickle::{
    Engine, Pickle, PickleConfig, PickleError, PickleWriter, Result, Unpickle, UnpickleReader,
};

use crate::{JsonFormat, from_str, from_value, to_string, to_value};

#[derive(Debug, Default, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}

vc_pickle::impl_type_path!(Point => "demo::Point");

impl Pickle for Point {
    const CLOSED: bool = true;

    fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
        w.begin_entry_of::<Self>()?;
        w.put_field("x", &self.x)?;
        w.put_field("y", &self.y)?;
        w.end_entry()
    }
}

impl Unpickle for Point {
    fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
        r.expect_tag::<Self>(&tag)?;
        let x = r.read_field("x")?;
        let y = r.read_field("y")?;
        r.end_entry()?;
        Ok(Point { x, y })
    }
}

#[derive(Default)]
struct Link {
    value: u8,
    next: Option<Rc<RefCell<Link>>>,
}

vc_pickle::impl_type_path!(Link => "demo::Link");

impl Pickle for Link {
    fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
        w.begin_entry_of::<Self>()?;
        w.put_field("value", &self.value)?;
        w.put_field("next", &self.next)?;
        w.end_entry()
    }
}

impl Unpickle for Link {
    fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
        r.expect_tag::<Self>(&tag)?;
        let value = r.read_field("value")?;
        let next = r.read_field("next")?;
        r.end_entry()?;
        Ok(Link { value, next })
    }
}

/// Writes a field whose name the JSON format reserves.
struct Reserved;

vc_pickle::impl_type_path!(Reserved => "demo::Reserved");

impl Pickle for Reserved {
    fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
        w.begin_entry_of::<Self>()?;
        w.put_field("$type", &0_u8)?;
        w.end_entry()
    }
}

/// Three shared strings, written in the order `a`, `b`, `c`.
struct Trio {
    a: Rc<String>,
    b: Rc<String>,
    c: Rc<String>,
}

vc_pickle::impl_type_path!(Trio => "demo::Trio");

impl Pickle for Trio {
    fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
        w.begin_entry_of::<Self>()?;
        w.put_field("a", &self.a)?;
        w.put_field("b", &self.b)?;
        w.put_field("c", &self.c)?;
        w.end_entry()
    }
}

impl Unpickle for Trio {
    fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
        r.expect_tag::<Self>(&tag)?;
        let a = r.read_field("a")?;
        let b = r.read_field("b")?;
        let c = r.read_field("c")?;
        r.end_entry()?;
        Ok(Trio { a, b, c })
    }
}

/// Reads a `Trio` entry starting with `b`.
struct SwappedTrio;

vc_pickle::impl_type_path!(SwappedTrio => "demo::Trio");

impl Unpickle for SwappedTrio {
    fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
        r.expect_tag::<Self>(&tag)?;
        let _: Rc<String> = r.read_field("b")?;
        let _: Rc<String> = r.read_field("a")?;
        let _: Rc<String> = r.read_field("c")?;
        r.end_entry()?;
        Ok(SwappedTrio)
    }
}

fn trio() -> Trio {
    let a = Rc::new(String::from("A"));
    Trio {
        a: a.clone(),
        b: Rc::new(String::from("B")),
        c: a,
    }
}

#[test]
fn struct_layout() {
    let value = to_value(&Point { x: 1, y: -2 }).unwrap();
    assert_eq!(
        value,
        json!({
            "$type": "demo::Point",
            "x": { "$type": "i32", "$value": 1 },
            "y": { "$type": "i32", "$value": -2 },
        })
    );
    assert_eq!(from_value::<Point>(&value).unwrap(), Point { x: 1, y: -2 });
}

#[test]
fn repeated_fields_become_arrays() {
    let value = to_value(&vec![Some(7_u8), None]).unwrap();
    assert_eq!(
        value,
        json!({
            "$type": "alloc::vec::Vec<core::option::Option<u8>>",
            "len": { "$type": "u64", "$value": 2 },
            "elem": [{ "$type": "u8", "$value": 7 }, null],
        })
    );
    assert_eq!(from_value::<Vec<Option<u8>>>(&value).unwrap(), vec![Some(7), None]);

    let one = to_value(&vec![3_u8]).unwrap();
    assert_eq!(one["elem"], json!({ "$type": "u8", "$value": 3 }));
    assert_eq!(from_value::<Vec<u8>>(&one).unwrap(), vec![3]);
}

#[test]
fn interleaved_fields_keep_their_order() {
    let map = BTreeMap::from([(1_u8, 'a'), (2, 'b')]);
    let value = to_value(&map).unwrap();
    assert_eq!(value["$order"], json!(["len", "key", "value", "key", "value"]));

    let text = to_string(&map).unwrap();
    assert_eq!(from_str::<BTreeMap<u8, char>>(&text).unwrap(), map);

    let mut shuffled = value.clone();
    shuffled["$order"] = json!(["len", "key", "key", "value", "value"]);
    assert_eq!(
        from_value::<BTreeMap<u8, char>>(&shuffled).unwrap_err(),
        PickleError::MalformedEntry {
            reason: "expected field `value`, found `key`".into()
        }
    );
}

#[test]
fn fields_are_read_in_write_order() {
    let value = to_value(&trio()).unwrap();
    let back: Trio = from_value(&value).unwrap();
    assert!(Rc::ptr_eq(&back.a, &back.c));
    assert_eq!(*back.b, "B");

    assert_eq!(
        from_value::<SwappedTrio>(&value).err(),
        Some(PickleError::MalformedEntry {
            reason: "expected field `b`, found `a`".into()
        })
    );
}

#[test]
fn object_ids_are_checked() {
    let mut value = to_value(&trio()).unwrap();
    assert_eq!(value["a"]["$id"], json!(0));
    assert_eq!(value["b"]["$id"], json!(1));
    assert_eq!(value["c"], json!({ "$ref": 0 }));

    value["b"]["$id"] = json!(7);
    assert_eq!(
        from_value::<Trio>(&value).err(),
        Some(PickleError::MalformedEntry {
            reason: "object id `7` is out of order, expected 1".into()
        })
    );

    // Ids are optional in hand-written documents.
    value["b"].as_object_mut().unwrap().remove("$id");
    let back: Trio = from_value(&value).unwrap();
    assert!(Rc::ptr_eq(&back.a, &back.c));
}

#[test]
fn nested_options() {
    let value = to_value(&Some(None::<i32>)).unwrap();
    assert_eq!(
        value,
        json!({ "$type": "core::option::Option<core::option::Option<i32>>", "some": null })
    );
    assert_eq!(from_value::<Option<Option<i32>>>(&value).unwrap(), Some(None));
    assert_eq!(to_value(&None::<Option<i32>>).unwrap(), json!(null));
}

#[test]
fn cycle_round_trip() {
    let a = Rc::new(RefCell::new(Link { value: 1, next: None }));
    let b = Rc::new(RefCell::new(Link {
        value: 2,
        next: Some(a.clone()),
    }));
    a.borrow_mut().next = Some(b.clone());

    let value = to_value(&a).unwrap();
    assert_eq!(value["$id"], json!(0));
    assert_eq!(value["next"]["$id"], json!(1));
    assert_eq!(value["next"]["next"], json!({ "$ref": 0 }));

    let back: Rc<RefCell<Link>> = from_value(&value).unwrap();
    let back_b = back.borrow().next.clone().unwrap();
    assert_eq!(back_b.borrow().value, 2);
    assert!(Rc::ptr_eq(back_b.borrow().next.as_ref().unwrap(), &back));

    a.borrow_mut().next = None;
    back.borrow_mut().next = None;
}

#[test]
fn elided_tags() {
    let engine = Engine::new(JsonFormat)
        .with_config(PickleConfig::new().with_elide_closed_tags(true));
    let value = engine.encode(&Point { x: 3, y: 4 }).unwrap();
    assert_eq!(
        value,
        json!({ "x": { "$value": 3 }, "y": { "$value": 4 } })
    );
    assert_eq!(engine.decode::<Point>(&value).unwrap(), Point { x: 3, y: 4 });
}

#[test]
fn wide_and_special_payloads() {
    let value = (u128::MAX, f64::INFINITY, '\u{1F980}', ());
    let text = to_string(&value).unwrap();
    let back: (u128, f64, char, ()) = from_str(&text).unwrap();
    assert_eq!(back, value);
}

#[test]
fn reserved_field_name() {
    let err = to_value(&Reserved).unwrap_err();
    assert!(matches!(err, PickleError::MalformedEntry { .. }));
}

#[test]
fn invalid_text() {
    let err = from_str::<i32>("{\"$type\": ").unwrap_err();
    assert!(matches!(err, PickleError::MalformedEntry { .. }));
}

#[test]
fn missing_and_unread_fields() {
    let missing = json!({ "$type": "demo::Point", "x": { "$type": "i32", "$value": 1 } });
    assert_eq!(
        from_value::<Point>(&missing).unwrap_err(),
        PickleError::MalformedEntry {
            reason: "missing field `y`".into()
        }
    );

    let extra = json!({
        "$type": "demo::Point",
        "x": { "$type": "i32", "$value": 1 },
        "y": { "$type": "i32", "$value": 2 },
        "z": { "$type": "i32", "$value": 3 },
    });
    assert_eq!(
        from_value::<Point>(&extra).unwrap_err(),
        PickleError::MalformedEntry {
            reason: "1 unread field(s)".into()
        }
    );
}

#[test]
fn type_mismatch_names_both_types() {
    let value = to_value(&1_i64).unwrap();
    assert_eq!(
        from_value::<Point>(&value).unwrap_err(),
        PickleError::TypeMismatch {
            expected: "demo::Point".into(),
            found: "i64".into(),
        }
    );
}
