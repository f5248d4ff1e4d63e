use core::any::Any;

use crate::tag::{TypePath, TypeTag};

// -----------------------------------------------------------------------------
// Dynamic

/// Runtime access to the concrete type behind a trait object.
///
/// Implemented for every sized `Any + TypePath` type. Open type families
/// declare it as a supertrait, so `&dyn Family` can report the tag of the
/// value it points to.
///
/// ```
/// use vc_pickle::tag::{Dynamic, TypeTag, tag_of};
///
/// let value: &dyn Dynamic = &7_u8;
/// assert_eq!(value.dynamic_tag(), TypeTag::of::<u8>());
/// assert_eq!(tag_of(Some(value)), TypeTag::of::<u8>());
/// assert_eq!(tag_of(None), TypeTag::NULL);
/// ```
pub trait Dynamic: Any {
    /// Returns `self` as [`Any`], for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns the tag of the concrete type.
    fn dynamic_tag(&self) -> TypeTag;
}

impl<T: Any + TypePath> Dynamic for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn dynamic_tag(&self) -> TypeTag {
        TypeTag::of::<T>()
    }
}

/// Returns the runtime tag of `value`, or [`TypeTag::NULL`] if absent.
#[inline]
pub fn tag_of(value: Option<&dyn Dynamic>) -> TypeTag {
    match value {
        Some(value) => value.dynamic_tag(),
        None => TypeTag::NULL,
    }
}
