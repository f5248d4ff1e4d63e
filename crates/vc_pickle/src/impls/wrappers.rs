//! Transparent wrappers: the stream holds the entry of the wrapped value.

use alloc::boxed::Box;
use alloc::format;
use core::cell::RefCell;
use std::sync::{Mutex, PoisonError, RwLock, TryLockError};

use crate::error::{PickleError, Result};
use crate::pickle::{Pickle, PickleWriter, Unpickle, UnpicklePointee, UnpickleReader};
use crate::tag::{GenericPathCell, TypePath, TypeTag, concat};

macro_rules! impl_wrapper_path {
    ($($wrapper:ident => $prefix:literal),* $(,)?) => {
        $(
            impl<T: TypePath + ?Sized> TypePath for $wrapper<T> {
                fn type_path() -> &'static str {
                    static CELL: GenericPathCell = GenericPathCell::new();
                    CELL.get_or_insert::<Self>(|| concat(&[$prefix, "<", T::type_path(), ">"]))
                }
            }
        )*
    };
}

impl_wrapper_path! {
    Box => "alloc::boxed::Box",
    RefCell => "core::cell::RefCell",
    Mutex => "std::sync::Mutex",
    RwLock => "std::sync::RwLock",
}

const OPTION_PATH: &str = "core::option::Option";

impl<T: TypePath> TypePath for Option<T> {
    fn type_path() -> &'static str {
        static CELL: GenericPathCell = GenericPathCell::new();
        CELL.get_or_insert::<Self>(|| concat(&[OPTION_PATH, "<", T::type_path(), ">"]))
    }
}

// -----------------------------------------------------------------------------
// Option

/// `None` is a `Null` entry, `Some(v)` is the entry of `v`.
///
/// When `v` may itself be `Null`, `Some(v)` is an entry tagged with the
/// option's own path, holding `v` in its `some` field.
impl<T: Pickle> Pickle for Option<T> {
    const NULLABLE: bool = true;

    fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
        match self {
            Some(value) if T::NULLABLE => {
                w.begin_entry_of::<Self>()?;
                w.put_field("some", value)?;
                w.end_entry()
            }
            Some(value) => w.write(value),
            None => w.put_null(),
        }
    }
}

impl<T: Unpickle> Unpickle for Option<T> {
    #[inline]
    fn static_tag() -> TypeTag {
        T::static_tag()
    }

    fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
        if tag.is_null() {
            r.end_entry()?;
            return Ok(None);
        }
        if tag.base() == OPTION_PATH {
            let expected = TypeTag::of::<Self>();
            if tag != expected {
                return Err(PickleError::mismatch(expected.key(), tag.key()));
            }
            let value = r.read_field("some")?;
            r.end_entry()?;
            return Ok(Some(value));
        }
        T::unpickle_tagged(tag, r).map(Some)
    }
}

// -----------------------------------------------------------------------------
// Box

impl<T: Pickle + ?Sized> Pickle for Box<T> {
    const CLOSED: bool = T::CLOSED;
    const NULLABLE: bool = T::NULLABLE;

    #[inline]
    fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
        T::pickle(self, w)
    }
}

impl<T: UnpicklePointee + ?Sized> Unpickle for Box<T> {
    #[inline]
    fn static_tag() -> TypeTag {
        T::pointee_tag()
    }

    #[inline]
    fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
        T::unpickle_boxed(tag, r)
    }
}

// -----------------------------------------------------------------------------
// RefCell

impl<T: Pickle> Pickle for RefCell<T> {
    const CLOSED: bool = T::CLOSED;
    const NULLABLE: bool = T::NULLABLE;

    fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
        let value = self.try_borrow().map_err(|_| PickleError::Unavailable {
            reason: format!("`{}` is mutably borrowed", Self::type_path()),
        })?;
        value.pickle(w)
    }
}

/// Hollow form: `RefCell::new(T::default())`.
impl<T: Unpickle + Default> Unpickle for RefCell<T> {
    #[inline]
    fn static_tag() -> TypeTag {
        T::static_tag()
    }

    #[inline]
    fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
        T::unpickle_tagged(tag, r).map(RefCell::new)
    }

    #[inline]
    fn hollow() -> Option<Self> {
        Some(RefCell::new(T::default()))
    }

    fn fill_hollow(hollow: &Self, value: Self) -> Result<()> {
        let mut slot = hollow.try_borrow_mut().map_err(|_| PickleError::Unavailable {
            reason: format!("`{}` is borrowed", Self::type_path()),
        })?;
        *slot = value.into_inner();
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Mutex & RwLock

#[cold]
#[inline(never)]
fn lock_error<T: TypePath + ?Sized, G>(error: &TryLockError<G>) -> PickleError {
    let state = match error {
        TryLockError::Poisoned(_) => "poisoned",
        TryLockError::WouldBlock => "locked",
    };
    PickleError::Unavailable {
        reason: format!("`{}` is {state}", T::type_path()),
    }
}

impl<T: Pickle> Pickle for Mutex<T> {
    const CLOSED: bool = T::CLOSED;
    const NULLABLE: bool = T::NULLABLE;

    fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
        let value = self.try_lock().map_err(|e| lock_error::<Self, _>(&e))?;
        value.pickle(w)
    }
}

/// Hollow form: `Mutex::new(T::default())`.
impl<T: Unpickle + Default> Unpickle for Mutex<T> {
    #[inline]
    fn static_tag() -> TypeTag {
        T::static_tag()
    }

    #[inline]
    fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
        T::unpickle_tagged(tag, r).map(Mutex::new)
    }

    #[inline]
    fn hollow() -> Option<Self> {
        Some(Mutex::new(T::default()))
    }

    fn fill_hollow(hollow: &Self, value: Self) -> Result<()> {
        let mut slot = hollow.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = value.into_inner().unwrap_or_else(PoisonError::into_inner);
        Ok(())
    }
}

impl<T: Pickle> Pickle for RwLock<T> {
    const CLOSED: bool = T::CLOSED;
    const NULLABLE: bool = T::NULLABLE;

    fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
        let value = self.try_read().map_err(|e| lock_error::<Self, _>(&e))?;
        value.pickle(w)
    }
}

/// Hollow form: `RwLock::new(T::default())`.
impl<T: Unpickle + Default> Unpickle for RwLock<T> {
    #[inline]
    fn static_tag() -> TypeTag {
        T::static_tag()
    }

    #[inline]
    fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
        T::unpickle_tagged(tag, r).map(RwLock::new)
    }

    #[inline]
    fn hollow() -> Option<Self> {
        Some(RwLock::new(T::default()))
    }

    fn fill_hollow(hollow: &Self, value: Self) -> Result<()> {
        let mut slot = hollow.write().unwrap_or_else(PoisonError::into_inner);
        *slot = value.into_inner().unwrap_or_else(PoisonError::into_inner);
        Ok(())
    }
}
