//! Per-type pickling traits and the traversal contexts that drive them.

mod reader;
mod trace;
mod writer;

pub use reader::UnpickleReader;
pub use writer::PickleWriter;

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::sync::Arc;
use core::ops::Deref;

use crate::error::{PickleError, Result};
use crate::tag::{TypePath, TypeTag};

// -----------------------------------------------------------------------------
// Stack growth

/// Stack that must remain before a nested entry is processed.
const RED_ZONE: usize = 128 * 1024;

/// Size of every stack segment allocated on demand.
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

/// Runs one level of the traversal, moving to a fresh stack segment when the
/// current one is nearly exhausted. Nesting depth is bounded by the heap.
#[inline]
fn nested<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_SEGMENT, f)
}

// -----------------------------------------------------------------------------
// Pickle

/// Encodes a value as exactly one entry.
///
/// Implementations open an entry, write their fields (recursing through
/// [`PickleWriter::put_field`]) or a primitive payload, and close it.
/// Shareable pointers route through [`PickleWriter::write_shared`].
pub trait Pickle: TypePath {
    /// Whether the type at a static site always equals the runtime type.
    ///
    /// Closed types may have their tag elided at closed sites when
    /// [`PickleConfig::elide_closed_tags`](crate::PickleConfig::elide_closed_tags)
    /// is set. Types that may write a `Null` or `Ref` entry, or any other
    /// tag than their own, must keep the default.
    const CLOSED: bool = false;

    /// Whether a value of this type may be written as a `Null` entry.
    ///
    /// `Option<T>` wraps `Some(value)` in an entry of its own when `T` is
    /// nullable, so `Some(None)` and `None` stay distinct. Transparent
    /// wrappers forward the flag of the wrapped type.
    const NULLABLE: bool = false;

    fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()>;
}

// -----------------------------------------------------------------------------
// Unpickle

/// Decodes a value from exactly one entry.
///
/// # Two-phase construction
///
/// A shared pointer decoding a value that may be referenced from inside its
/// own fields must expose it before the fields are read. Types that can do
/// so return a placeholder from [`hollow`](Self::hollow) and patch it in
/// [`fill_hollow`](Self::fill_hollow). `RefCell<T>`, `Mutex<T>` and
/// `RwLock<T>` do it for any `T: Default`.
///
/// # Example
///
/// ```
/// use vc_pickle::{Unpickle, UnpickleReader, Result, impl_type_path};
/// use vc_pickle::tag::TypeTag;
///
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl_type_path!(Point => "demo::Point");
///
/// impl Unpickle for Point {
///     fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
///         r.expect_tag::<Self>(&tag)?;
///         let x = r.read_field("x")?;
///         let y = r.read_field("y")?;
///         r.end_entry()?;
///         Ok(Point { x, y })
///     }
/// }
/// ```
pub trait Unpickle: TypePath + Sized {
    /// Reads an entry, begin marker included.
    fn unpickle(r: &mut UnpickleReader<'_>) -> Result<Self> {
        let tag = r.begin_entry()?;
        Self::unpickle_tagged(tag, r)
    }

    /// Reads the rest of an entry whose begin marker returned `tag`.
    ///
    /// Must consume the end marker.
    fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self>;

    /// The tag a stream carries for this type.
    ///
    /// Transparent wrappers (`Box<T>`, `RefCell<T>`, ...) return the tag of
    /// the wrapped type.
    #[inline]
    fn static_tag() -> TypeTag {
        TypeTag::of::<Self>()
    }

    /// Returns a placeholder that can be shared before its fields are known.
    #[inline]
    fn hollow() -> Option<Self> {
        None
    }

    /// Patches a placeholder returned by [`hollow`](Self::hollow).
    fn fill_hollow(hollow: &Self, value: Self) -> Result<()> {
        let _ = (hollow, value);
        Err(PickleError::Unavailable {
            reason: alloc::format!("`{}` has no hollow form", Self::type_path()),
        })
    }
}

// -----------------------------------------------------------------------------
// UnpicklePointee

/// Decoding of values that live behind a pointer (`Box`, `Rc`, `Arc`).
///
/// Implemented for every sized [`Unpickle`] type, and for open families
/// by [`impl_pickle_family!`](crate::impl_pickle_family), which is what lets
/// `Box<dyn Family>` and `Rc<dyn Family>` be decoded.
///
/// `unpickle_rc` and `unpickle_arc` receive the object id reserved for the
/// pointer, and must [`fill`](UnpickleReader::fill) it with the pointer
/// before returning.
pub trait UnpicklePointee: TypePath {
    /// The tag a stream carries for the pointee at a static site.
    fn pointee_tag() -> TypeTag;

    fn unpickle_boxed(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Box<Self>>;

    fn unpickle_rc(tag: TypeTag, id: u32, r: &mut UnpickleReader<'_>) -> Result<Rc<Self>>;

    fn unpickle_arc(tag: TypeTag, id: u32, r: &mut UnpickleReader<'_>) -> Result<Arc<Self>>;
}

impl<T: Unpickle> UnpicklePointee for T {
    #[inline]
    fn pointee_tag() -> TypeTag {
        T::static_tag()
    }

    #[inline]
    fn unpickle_boxed(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Box<Self>> {
        T::unpickle_tagged(tag, r).map(Box::new)
    }

    #[inline]
    fn unpickle_rc(tag: TypeTag, id: u32, r: &mut UnpickleReader<'_>) -> Result<Rc<Self>> {
        unpickle_shared(tag, id, r, Rc::new)
    }

    #[inline]
    fn unpickle_arc(tag: TypeTag, id: u32, r: &mut UnpickleReader<'_>) -> Result<Arc<Self>> {
        unpickle_shared(tag, id, r, Arc::new)
    }
}

/// Decodes a shared sized value, exposing its hollow form first if any.
fn unpickle_shared<T, P>(
    tag: TypeTag,
    id: u32,
    r: &mut UnpickleReader<'_>,
    new: fn(T) -> P,
) -> Result<P>
where
    T: Unpickle,
    P: Deref<Target = T> + Clone + 'static,
{
    match T::hollow() {
        Some(hollow) => {
            let shared = new(hollow);
            r.fill(id, shared.clone())?;
            let value = T::unpickle_tagged(tag, r)?;
            T::fill_hollow(&shared, value)?;
            Ok(shared)
        }
        None => {
            let shared = new(T::unpickle_tagged(tag, r)?);
            r.fill(id, shared.clone())?;
            Ok(shared)
        }
    }
}
