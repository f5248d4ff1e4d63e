//! Whole-graph scenarios, driven through the engine.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;
use std::sync::{Mutex, RwLock};

use crate::format::BinaryFormat;
use crate::tag::{Dynamic, TypeTag};
use crate::{Engine, PickleConfig, PickleError, PicklerRegistry, PicklerRegistryArc};
use crate::{Pickle, PickleWriter, Result, Unpickle, UnpickleReader};

// -----------------------------------------------------------------------------
// Fixtures

#[derive(Default)]
struct Node {
    name: String,
    next: Option<Rc<RefCell<Node>>>,
}

crate::impl_type_path!(Node => "demo::Node");

impl Pickle for Node {
    fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
        w.begin_entry_of::<Self>()?;
        w.put_field("name", &self.name)?;
        w.put_field("next", &self.next)?;
        w.end_entry()
    }
}

impl Unpickle for Node {
    fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
        r.expect_tag::<Self>(&tag)?;
        let name = r.read_field("name")?;
        let next = r.read_field("next")?;
        r.end_entry()?;
        Ok(Node { name, next })
    }
}

fn node(name: &str) -> Rc<RefCell<Node>> {
    Rc::new(RefCell::new(Node {
        name: name.into(),
        next: None,
    }))
}

fn next_of(node: &Rc<RefCell<Node>>) -> Rc<RefCell<Node>> {
    node.borrow().next.clone().unwrap()
}

/// Breaks the cycles of a ring so the test does not leak it.
fn unlink(start: &Rc<RefCell<Node>>) {
    let mut cursor = start.borrow_mut().next.take();
    while let Some(node) = cursor {
        if Rc::ptr_eq(&node, start) {
            break;
        }
        cursor = node.borrow_mut().next.take();
    }
}

/// A node that cannot be exposed before its fields are read.
struct Frozen {
    next: Option<Rc<Frozen>>,
}

crate::impl_type_path!(Frozen => "demo::Frozen");

impl Pickle for Frozen {
    fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
        w.begin_entry_of::<Self>()?;
        w.put_field("next", &self.next)?;
        w.end_entry()
    }
}

impl Unpickle for Frozen {
    fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
        r.expect_tag::<Self>(&tag)?;
        let next = r.read_field("next")?;
        r.end_entry()?;
        Ok(Frozen { next })
    }
}

trait Shape: Dynamic {
    fn area(&self) -> f64;
}

#[derive(Debug, PartialEq)]
struct Square(f64);

#[derive(Debug, PartialEq)]
struct Circle(f64);

#[derive(Debug, PartialEq)]
struct Triangle(f64, f64);

crate::impl_type_path! {
    Square => "demo::Square",
    Circle => "demo::Circle",
    Triangle => "demo::Triangle",
}

impl Shape for Square {
    fn area(&self) -> f64 {
        self.0 * self.0
    }
}

impl Shape for Circle {
    fn area(&self) -> f64 {
        3.0 * self.0 * self.0
    }
}

impl Shape for Triangle {
    fn area(&self) -> f64 {
        self.0 * self.1 / 2.0
    }
}

impl Pickle for Square {
    fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
        w.begin_entry_of::<Self>()?;
        w.put_field("side", &self.0)?;
        w.end_entry()
    }
}

impl Unpickle for Square {
    fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
        r.expect_tag::<Self>(&tag)?;
        let side = r.read_field("side")?;
        r.end_entry()?;
        Ok(Square(side))
    }
}

impl Pickle for Circle {
    fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
        w.begin_entry_of::<Self>()?;
        w.put_field("radius", &self.0)?;
        w.end_entry()
    }
}

impl Unpickle for Circle {
    fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
        r.expect_tag::<Self>(&tag)?;
        let radius = r.read_field("radius")?;
        r.end_entry()?;
        Ok(Circle(radius))
    }
}

impl Pickle for Triangle {
    fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
        w.begin_entry_of::<Self>()?;
        w.put_field("base", &self.0)?;
        w.put_field("height", &self.1)?;
        w.end_entry()
    }
}

impl Unpickle for Triangle {
    fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
        r.expect_tag::<Self>(&tag)?;
        let base = r.read_field("base")?;
        let height = r.read_field("height")?;
        r.end_entry()?;
        Ok(Triangle(base, height))
    }
}

crate::impl_pickle_family!(dyn Shape as "demo::Shape" => [Square, Circle]);

fn engine() -> Engine<BinaryFormat> {
    Engine::new(BinaryFormat)
}

/// An engine whose registry also knows `Triangle` as a `dyn Shape`.
fn engine_with_triangle() -> Engine<BinaryFormat> {
    let mut registry = PicklerRegistry::new();
    registry.register_upcast::<Triangle, dyn Shape>(|t: Triangle| -> Box<dyn Shape> {
        Box::new(t)
    });
    engine().with_registry(PicklerRegistryArc::new(registry))
}

fn push_str(buf: &mut Vec<u8>, s: &str) {
    buf.push(s.len() as u8);
    buf.extend_from_slice(s.as_bytes());
}

// -----------------------------------------------------------------------------
// Shared objects and cycles

#[test]
fn primitive_root_bytes() {
    let (bytes, stats) = engine().encode_with_stats(&42_i32).unwrap();
    assert_eq!(bytes, b"\x03i32\x2a\x00\x00\x00");
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.shared_objects, 0);
    assert_eq!(engine().decode::<i32>(&bytes).unwrap(), 42);
}

#[test]
fn shared_leaf_is_written_once() {
    let shared = Rc::new(String::from("shared"));
    let pair = (shared.clone(), shared);

    let (bytes, stats) = engine().encode_with_stats(&pair).unwrap();
    assert_eq!(stats.shared_objects, 1);
    assert_eq!(stats.back_refs, 1);

    let back: (Rc<String>, Rc<String>) = engine().decode(&bytes).unwrap();
    assert_eq!(*back.0, "shared");
    assert!(Rc::ptr_eq(&back.0, &back.1));
}

#[test]
fn two_node_cycle() {
    let a = node("a");
    let b = node("b");
    a.borrow_mut().next = Some(b.clone());
    b.borrow_mut().next = Some(a.clone());

    let (bytes, stats) = engine().encode_with_stats(&a).unwrap();

    // a (#0) -> b (#1) -> Ref(0)
    let mut expected = Vec::new();
    for name in ["a", "b"] {
        push_str(&mut expected, "demo::Node");
        expected.push(2);
        push_str(&mut expected, "name");
        push_str(&mut expected, "alloc::string::String");
        push_str(&mut expected, name);
        push_str(&mut expected, "next");
    }
    push_str(&mut expected, "vc_pickle::Ref");
    expected.extend_from_slice(&[0, 0, 0, 0]);
    assert_eq!(bytes, expected);

    assert_eq!(stats.entries, 5);
    assert_eq!(stats.shared_objects, 2);
    assert_eq!(stats.back_refs, 1);
    assert_eq!(stats.runtime_lookups, 0);

    let (back, stats): (Rc<RefCell<Node>>, _) = engine().decode_with_stats(&bytes).unwrap();
    assert_eq!(stats.shared_objects, 2);
    assert_eq!(stats.back_refs, 1);

    let back_b = next_of(&back);
    assert_eq!(back.borrow().name, "a");
    assert_eq!(back_b.borrow().name, "b");
    assert!(Rc::ptr_eq(&next_of(&back_b), &back));

    unlink(&a);
    unlink(&back);
}

#[test]
fn self_cycle() {
    let a = node("self");
    a.borrow_mut().next = Some(a.clone());

    let bytes = engine().encode(&a).unwrap();
    let back: Rc<RefCell<Node>> = engine().decode(&bytes).unwrap();
    assert!(Rc::ptr_eq(&next_of(&back), &back));

    unlink(&a);
    unlink(&back);
}

#[test]
fn three_node_ring() {
    let a = node("a");
    let b = node("b");
    let c = node("c");
    a.borrow_mut().next = Some(b.clone());
    b.borrow_mut().next = Some(c.clone());
    c.borrow_mut().next = Some(a.clone());

    let bytes = engine().encode(&a).unwrap();
    let back: Rc<RefCell<Node>> = engine().decode(&bytes).unwrap();

    let back_b = next_of(&back);
    let back_c = next_of(&back_b);
    assert_eq!(back_c.borrow().name, "c");
    assert!(Rc::ptr_eq(&next_of(&back_c), &back));

    unlink(&a);
    unlink(&back);
}

#[test]
fn diamond_shares_the_bottom() {
    let bottom = Rc::new(String::from("bottom"));
    let left = Rc::new((bottom.clone(), 1_i32));
    let right = Rc::new((bottom, 2_i32));
    let top = (left, right);

    let (bytes, stats) = engine().encode_with_stats(&top).unwrap();
    assert_eq!(stats.shared_objects, 3);
    assert_eq!(stats.back_refs, 1);

    type Side = Rc<(Rc<String>, i32)>;
    let back: (Side, Side) = engine().decode(&bytes).unwrap();
    assert_eq!(back.0.1, 1);
    assert_eq!(back.1.1, 2);
    assert!(Rc::ptr_eq(&back.0.0, &back.1.0));
    assert!(!Rc::ptr_eq(&back.0, &back.1));
}

#[test]
fn arc_mutex_sharing() {
    let shared = Arc::new(Mutex::new(5_i32));
    let pair = (shared.clone(), shared);

    let bytes = engine().encode(&pair).unwrap();
    let back: (Arc<Mutex<i32>>, Arc<Mutex<i32>>) = engine().decode(&bytes).unwrap();
    assert!(Arc::ptr_eq(&back.0, &back.1));
    assert_eq!(*back.0.lock().unwrap(), 5);
}

#[test]
fn optional_fields() {
    let value: (Option<i32>, Option<String>) = (None, Some(String::from("x")));
    let bytes = engine().encode(&value).unwrap();
    let back: (Option<i32>, Option<String>) = engine().decode(&bytes).unwrap();
    assert_eq!(back, value);
}

#[test]
fn nested_options_keep_their_depth() {
    for value in [None, Some(None), Some(Some(4_i32))] {
        let bytes = engine().encode(&value).unwrap();
        assert_eq!(engine().decode::<Option<Option<i32>>>(&bytes).unwrap(), value);
    }

    // Some(None): an option entry whose `some` field is Null.
    let mut expected = Vec::new();
    push_str(&mut expected, "core::option::Option<core::option::Option<i32>>");
    expected.push(1);
    push_str(&mut expected, "some");
    push_str(&mut expected, "vc_pickle::Null");
    expected.push(0);
    assert_eq!(engine().encode(&Some(None::<i32>)).unwrap(), expected);

    let shared: Option<Rc<Option<u8>>> = Some(Rc::new(None));
    let bytes = engine().encode(&shared).unwrap();
    let back: Option<Rc<Option<u8>>> = engine().decode(&bytes).unwrap();
    assert_eq!(back.as_deref(), Some(&None));
}

#[test]
fn long_chain_without_depth_limit() {
    const LEN: usize = 4_000;

    let head = node("link");
    let mut tail = head.clone();
    for _ in 1..LEN {
        let next = node("link");
        tail.borrow_mut().next = Some(next.clone());
        tail = next;
    }

    let bytes = engine().encode(&head).unwrap();
    let back: Rc<RefCell<Node>> = engine().decode(&bytes).unwrap();

    let mut len = 1;
    let mut cursor = back.borrow().next.clone();
    while let Some(link) = cursor {
        len += 1;
        cursor = link.borrow().next.clone();
    }
    assert_eq!(len, LEN);

    unlink(&head);
    unlink(&back);
}

#[test]
fn cycle_without_hollow_form_is_unfinished() {
    // Frozen (#0) whose `next` refers back to itself.
    let mut bytes = Vec::new();
    push_str(&mut bytes, "demo::Frozen");
    bytes.push(1);
    push_str(&mut bytes, "next");
    push_str(&mut bytes, "vc_pickle::Ref");
    bytes.extend_from_slice(&[0, 0, 0, 0]);

    let err = engine().decode::<Rc<Frozen>>(&bytes).err().unwrap();
    assert_eq!(err, PickleError::UnfinishedReference { id: 0 });
}

#[test]
fn dangling_reference() {
    let mut bytes = Vec::new();
    push_str(&mut bytes, "vc_pickle::Ref");
    bytes.extend_from_slice(&[3, 0, 0, 0]);

    let err = engine().decode::<Rc<String>>(&bytes).err().unwrap();
    assert_eq!(err, PickleError::DanglingReference { id: 3 });
}

#[test]
fn frozen_chain_round_trip() {
    let tail = Rc::new(Frozen { next: None });
    let head = Frozen {
        next: Some(tail.clone()),
    };
    let bytes = engine().encode(&(head, tail)).unwrap();

    let back: (Frozen, Rc<Frozen>) = engine().decode(&bytes).unwrap();
    assert!(Rc::ptr_eq(back.0.next.as_ref().unwrap(), &back.1));
}

#[test]
fn borrowed_cell_is_unavailable() {
    let cell = RefCell::new(1_i32);
    let _guard = cell.borrow_mut();
    let err = engine().encode(&cell).err().unwrap();
    assert!(matches!(err, PickleError::Unavailable { .. }));
}

// -----------------------------------------------------------------------------
// Dispatch

#[test]
fn closed_sites_never_look_up() {
    let value = (vec![1_i32, 2, 3], String::from("closed"), Some(1.5_f64));
    let (bytes, stats) = engine().encode_with_stats(&value).unwrap();
    assert_eq!(stats.runtime_lookups, 0);

    let (back, stats): ((Vec<i32>, String, Option<f64>), _) =
        engine().decode_with_stats(&bytes).unwrap();
    assert_eq!(back, value);
    assert_eq!(stats.runtime_lookups, 0);
}

#[test]
fn candidates_resolve_without_registry() {
    let shapes: Vec<Box<dyn Shape>> = vec![Box::new(Square(2.0)), Box::new(Circle(1.0))];

    let (bytes, stats) = engine().encode_with_stats(&shapes).unwrap();
    assert_eq!(stats.runtime_lookups, 2);
    assert_eq!(stats.candidate_hits, 2);
    assert_eq!(stats.registry_fallbacks, 0);

    let (back, stats): (Vec<Box<dyn Shape>>, _) = engine().decode_with_stats(&bytes).unwrap();
    assert_eq!(stats.candidate_hits, 2);
    assert_eq!(stats.registry_fallbacks, 0);
    assert_eq!(back[0].area(), 4.0);
    assert_eq!(back[1].area(), 3.0);
    assert_eq!((*back[1]).as_any().downcast_ref::<Circle>(), Some(&Circle(1.0)));
}

#[test]
fn candidates_take_precedence_over_registry() {
    let mut registry = PicklerRegistry::new();
    registry.register_upcast::<Square, dyn Shape>(|s: Square| -> Box<dyn Shape> { Box::new(s) });
    let engine = engine().with_registry(PicklerRegistryArc::new(registry));

    let shape: Box<dyn Shape> = Box::new(Square(2.0));
    let (bytes, stats) = engine.encode_with_stats(&shape).unwrap();
    assert_eq!(stats.candidate_hits, 1);
    assert_eq!(stats.registry_fallbacks, 0);

    let (back, stats): (Box<dyn Shape>, _) = engine.decode_with_stats(&bytes).unwrap();
    assert_eq!(stats.candidate_hits, 1);
    assert_eq!(stats.registry_fallbacks, 0);
    assert_eq!(back.area(), 4.0);
}

#[test]
fn registry_fallback_for_non_candidates() {
    let engine = engine_with_triangle();
    let shapes: Vec<Box<dyn Shape>> = vec![Box::new(Square(1.0)), Box::new(Triangle(4.0, 3.0))];

    let (bytes, stats) = engine.encode_with_stats(&shapes).unwrap();
    assert_eq!(stats.candidate_hits, 1);
    assert_eq!(stats.registry_fallbacks, 1);

    let (back, stats): (Vec<Box<dyn Shape>>, _) = engine.decode_with_stats(&bytes).unwrap();
    assert_eq!(stats.registry_fallbacks, 1);
    assert_eq!(back[1].area(), 6.0);
}

#[test]
fn unregistered_runtime_type() {
    let shape: Box<dyn Shape> = Box::new(Triangle(1.0, 1.0));
    let err = engine().encode(&shape).err().unwrap();
    assert_eq!(
        err,
        PickleError::UnknownType {
            key: "demo::Triangle".into()
        }
    );
}

#[test]
fn unregistered_stream_key() {
    let mut bytes = Vec::new();
    push_str(&mut bytes, "demo::Hexagon");
    bytes.push(0);

    let unknown = PickleError::UnknownType {
        key: "demo::Hexagon".into(),
    };
    let err = engine().decode::<Box<dyn Shape>>(&bytes).err().unwrap();
    assert_eq!(err, unknown);

    let family = TypeTag::of::<dyn Shape>();
    let err = engine().decode_dynamic(&bytes, Some(&family)).err().unwrap();
    assert_eq!(err, unknown);
}

#[test]
fn registered_type_outside_family() {
    let bytes = engine().encode(&7_i32).unwrap();
    let err = engine().decode::<Box<dyn Shape>>(&bytes).err().unwrap();
    assert!(matches!(err, PickleError::TypeMismatch { .. }));

    let err = engine().decode::<String>(&bytes).err().unwrap();
    assert_eq!(
        err,
        PickleError::TypeMismatch {
            expected: "alloc::string::String".into(),
            found: "i32".into(),
        }
    );
}

#[test]
fn shared_family_members() {
    let square: Rc<dyn Shape> = Rc::new(Square(3.0));
    let pair = (square.clone(), square);

    let bytes = engine().encode(&pair).unwrap();
    let back: (Rc<dyn Shape>, Rc<dyn Shape>) = engine().decode(&bytes).unwrap();
    assert!(Rc::ptr_eq(&back.0, &back.1));
    assert_eq!(back.0.area(), 9.0);
}

// -----------------------------------------------------------------------------
// Dynamic roots

#[test]
fn dynamic_round_trip() {
    let engine = engine();
    let value: &dyn Dynamic = &5_i32;
    let bytes = engine.encode_dynamic(value).unwrap();
    assert_eq!(bytes, engine.encode(&5_i32).unwrap());

    let back = engine
        .decode_dynamic(&bytes, Some(&TypeTag::of::<i32>()))
        .unwrap();
    assert_eq!(back.downcast_ref::<i32>(), Some(&5));

    let err = engine
        .decode_dynamic(&bytes, Some(&TypeTag::of::<String>()))
        .err()
        .unwrap();
    assert!(matches!(err, PickleError::TypeMismatch { .. }));
}

#[test]
fn dynamic_family_root() {
    let engine = engine_with_triangle();
    let value: &dyn Dynamic = &Triangle(2.0, 2.0);
    let bytes = engine.encode_dynamic(value).unwrap();

    let back = engine
        .decode_dynamic(&bytes, Some(&TypeTag::of::<dyn Shape>()))
        .unwrap();
    assert_eq!(back.downcast_ref::<Triangle>(), Some(&Triangle(2.0, 2.0)));

    let err = self::engine().encode_dynamic(value).err().unwrap();
    assert!(matches!(err, PickleError::UnknownType { .. }));
}

#[test]
fn ambiguous_expected_type() {
    let bytes = engine().encode(&1_u8).unwrap();
    for expected in [None, Some(&TypeTag::NULL), Some(&TypeTag::REF)] {
        let err = engine().decode_dynamic(&bytes, expected).err().unwrap();
        assert!(matches!(err, PickleError::AmbiguousType { .. }));
    }
}

// -----------------------------------------------------------------------------
// Concurrency

#[test]
fn concurrent_first_use() {
    // Types used nowhere else, so their generic paths are computed in the race.
    type Value = (Vec<Option<u16>>, Arc<RwLock<u64>>, Box<dyn Shape>);

    std::thread::scope(|scope| {
        for i in 0..8_u16 {
            scope.spawn(move || {
                let engine = engine();
                let value: Value = (
                    vec![Some(i), None],
                    Arc::new(RwLock::new(u64::from(i))),
                    Box::new(Circle(f64::from(i))),
                );
                let bytes = engine.encode(&value).unwrap();
                let back: Value = engine.decode(&bytes).unwrap();
                assert_eq!(back.0, value.0);
                assert_eq!(*back.1.read().unwrap(), u64::from(i));
                assert_eq!(back.2.area(), value.2.area());

                let dynamic = engine.encode_dynamic(&i).unwrap();
                let decoded = engine
                    .decode_dynamic(&dynamic, Some(&TypeTag::of::<u16>()))
                    .unwrap();
                assert_eq!(decoded.downcast_ref::<u16>(), Some(&i));
            });
        }
    });
}

// -----------------------------------------------------------------------------
// Configuration

#[test]
fn depth_limit_is_opt_in() {
    assert_eq!(PickleConfig::new().max_depth, None);

    let nested = vec![vec![vec![1_i32]]];
    let limited = engine().with_config(PickleConfig::new().with_max_depth(2));

    let err = limited.encode(&nested).err().unwrap();
    assert_eq!(err, PickleError::DepthLimitExceeded { limit: 2 });

    let bytes = engine().encode(&nested).unwrap();
    let err = limited.decode::<Vec<Vec<Vec<i32>>>>(&bytes).err().unwrap();
    assert_eq!(err, PickleError::DepthLimitExceeded { limit: 2 });
}

#[test]
fn elided_tags_round_trip() {
    let value = (vec![1_i32, 2, 3], Some(String::from("elided")));
    let elided = engine().with_config(PickleConfig::new().with_elide_closed_tags(true));

    let full = engine().encode(&value).unwrap();
    let short = elided.encode(&value).unwrap();
    assert!(short.len() < full.len());

    let back: (Vec<i32>, Option<String>) = elided.decode(&short).unwrap();
    assert_eq!(back, value);
    // Readers need no configuration to accept elided keys.
    let back: (Vec<i32>, Option<String>) = engine().decode(&short).unwrap();
    assert_eq!(back, value);
}

#[test]
fn trailing_input_is_rejected() {
    let mut bytes = engine().encode(&1_i32).unwrap();
    bytes.push(0);
    let err = engine().decode::<i32>(&bytes).err().unwrap();
    assert!(matches!(err, PickleError::MalformedEntry { .. }));
}
