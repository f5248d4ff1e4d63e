//! Shared pointers, routed through the identity registry of the traversal.
//!
//! The first visit of an allocation writes the pointee in full, later visits
//! write a `Ref` entry. Decoding reserves the object id before the pointee
//! is read, so back references from inside the pointee resolve to the
//! pointer as soon as it has a hollow form.

use alloc::rc::Rc;
use alloc::sync::Arc;
use core::any::TypeId;

use crate::error::Result;
use crate::pickle::{Pickle, PickleWriter, Unpickle, UnpicklePointee, UnpickleReader};
use crate::tag::{GenericPathCell, TypePath, TypeTag, concat};

macro_rules! impl_shared {
    ($shared:ident => $prefix:literal, $unpickle:ident) => {
        impl<T: TypePath + ?Sized> TypePath for $shared<T> {
            fn type_path() -> &'static str {
                static CELL: GenericPathCell = GenericPathCell::new();
                CELL.get_or_insert::<Self>(|| concat(&[$prefix, "<", T::type_path(), ">"]))
            }
        }

        impl<T: Pickle + ?Sized> Pickle for $shared<T> {
            const NULLABLE: bool = T::NULLABLE;

            fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
                let addr = $shared::as_ptr(self).cast::<()>();
                w.write_shared(addr, TypeId::of::<Self>(), |w| T::pickle(self, w))
            }
        }

        impl<T: UnpicklePointee + ?Sized> Unpickle for $shared<T> {
            #[inline]
            fn static_tag() -> TypeTag {
                T::pointee_tag()
            }

            fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
                if tag.is_ref() {
                    let id = r.read_ref_id()?;
                    return r.resolve::<Self>(id);
                }
                let id = r.reserve_id()?;
                T::$unpickle(tag, id, r)
            }
        }
    };
}

impl_shared!(Rc => "alloc::rc::Rc", unpickle_rc);
impl_shared!(Arc => "alloc::sync::Arc", unpickle_arc);
