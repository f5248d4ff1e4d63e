use alloc::boxed::Box;
use core::any::{Any, TypeId};
use core::fmt;

use crate::error::{PickleError, Result};
use crate::pickle::{Pickle, PickleWriter, Unpickle, UnpickleReader};
use crate::tag::TypeTag;

// -----------------------------------------------------------------------------
// ErasedEncoder

/// A type-erased [`Pickle`] implementation.
///
/// Stores a function pointer that downcasts the value and pickles it, so it
/// can be copied out of the registry before it runs.
#[derive(Clone, Copy)]
pub struct ErasedEncoder {
    type_id: TypeId,
    func: fn(&dyn Any, &mut PickleWriter<'_>) -> Result<()>,
}

impl ErasedEncoder {
    /// Creates the encoder of `T`.
    #[inline]
    pub fn of<T: Pickle>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            func: |value, w| match value.downcast_ref::<T>() {
                Some(value) => w.write_dispatched(value),
                None => Err(PickleError::mismatch(T::type_path(), "a value of another type")),
            },
        }
    }

    /// The [`TypeId`] of the encoded type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Pickles `value`, which must be of the encoded type.
    #[inline]
    pub fn encode(&self, value: &dyn Any, w: &mut PickleWriter<'_>) -> Result<()> {
        (self.func)(value, w)
    }
}

impl fmt::Debug for ErasedEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedEncoder")
            .field("type_id", &self.type_id)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// ErasedDecoder

/// A type-erased [`Unpickle`] implementation.
#[derive(Clone, Copy)]
pub struct ErasedDecoder {
    type_id: TypeId,
    func: fn(TypeTag, &mut UnpickleReader<'_>) -> Result<Box<dyn Any>>,
}

impl ErasedDecoder {
    /// Creates the decoder of `T`.
    #[inline]
    pub fn of<T: Unpickle>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            func: |tag, r| {
                T::unpickle_tagged(tag, r).map(|value| Box::new(value) as Box<dyn Any>)
            },
        }
    }

    /// The [`TypeId`] of the decoded type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Reads the rest of an entry whose begin marker returned `tag`.
    #[inline]
    pub fn decode(&self, tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Box<dyn Any>> {
        (self.func)(tag, r)
    }
}

impl fmt::Debug for ErasedDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedDecoder")
            .field("type_id", &self.type_id)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Upcast

/// Converts a decoded value of some registered type into `Box<B>`.
///
/// `B` is usually an open family, `dyn Shape`.
pub struct Upcast<B: ?Sized + 'static> {
    func: Box<dyn Fn(Box<dyn Any>) -> Result<Box<B>, Box<dyn Any>> + Send + Sync>,
}

impl<B: ?Sized + 'static> Upcast<B> {
    /// Creates the conversion of `T` values.
    pub fn new<T: Any>(upcast: fn(T) -> Box<B>) -> Self {
        Self {
            func: Box::new(move |value: Box<dyn Any>| {
                value.downcast::<T>().map(|value| upcast(*value))
            }),
        }
    }

    /// Converts `value`, handing it back if it is not of the expected type.
    #[inline]
    pub fn apply(&self, value: Box<dyn Any>) -> Result<Box<B>, Box<dyn Any>> {
        (self.func)(value)
    }
}
