use alloc::boxed::Box;
use alloc::string::String;
use core::any::{Any, TypeId};
use std::sync::{PoisonError, RwLock};

use crate::hash::HashMap;

// -----------------------------------------------------------------------------
// GenericPathCell

/// Container for static storage of generic type paths.
///
/// If the type contains generics, the `static CELL` in the function is shared
/// by every instantiation, therefore the container is keyed by [`TypeId`].
///
/// Paths are leaked once per instantiation, they live for the rest of the process.
///
/// # Example
///
/// ```
/// use vc_pickle::tag::{GenericPathCell, TypePath, concat};
///
/// struct Pair<T>(T, T);
///
/// impl<T: TypePath> TypePath for Pair<T> {
///     fn type_path() -> &'static str {
///         static CELL: GenericPathCell = GenericPathCell::new();
///         CELL.get_or_insert::<Self>(|| concat(&["demo::Pair<", T::type_path(), ">"]))
///     }
/// }
///
/// assert_eq!(<Pair<u8>>::type_path(), "demo::Pair<u8>");
/// assert_eq!(<Pair<bool>>::type_path(), "demo::Pair<bool>");
/// ```
pub struct GenericPathCell(RwLock<Option<HashMap<TypeId, &'static str>>>);

impl GenericPathCell {
    /// Create a empty cell.
    #[inline]
    pub const fn new() -> Self {
        Self(RwLock::new(None))
    }

    /// Returns the path stored for `G`, computing it with `f` on first use.
    #[inline(always)]
    pub fn get_or_insert<G: Any + ?Sized>(&self, f: impl FnOnce() -> String) -> &'static str {
        self.get_or_insert_by_type_id(TypeId::of::<G>(), f)
    }

    // Separate to reduce code compilation times
    #[inline(never)]
    fn get_or_insert_by_type_id(&self, type_id: TypeId, f: impl FnOnce() -> String) -> &'static str {
        if let Some(path) = self
            .0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|map| map.get(&type_id))
        {
            return path;
        }

        let path = f();
        let mut guard = self.0.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have won the race, keep its result.
        guard
            .get_or_insert_with(HashMap::default)
            .entry(type_id)
            .or_insert_with(|| Box::leak(path.into_boxed_str()))
    }
}

/// An efficient string concatenation function.
///
/// This is usually used for the implementation of [`TypePath`](super::TypePath).
#[inline(never)]
pub fn concat(arr: &[&str]) -> String {
    let len = arr.iter().map(|item| item.len()).sum();
    let mut res = String::with_capacity(len);
    for &item in arr {
        res.push_str(item);
    }
    res
}
