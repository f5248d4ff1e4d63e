use alloc::collections::BTreeMap;
use alloc::format;
use alloc::vec::Vec;

use crate::error::{PickleError, Result};
use crate::pickle::{Pickle, PickleWriter, Unpickle, UnpickleReader};
use crate::tag::{GenericPathCell, TypePath, TypeTag, concat};

/// Upper bound of the capacity reserved from a decoded length.
const MAX_PREALLOC: usize = 4096;

fn read_len(r: &mut UnpickleReader<'_>) -> Result<usize> {
    let len: u64 = r.read_field("len")?;
    usize::try_from(len).map_err(|_| PickleError::malformed(format!("length {len} is too large")))
}

// -----------------------------------------------------------------------------
// Vec

impl<T: TypePath> TypePath for Vec<T> {
    fn type_path() -> &'static str {
        static CELL: GenericPathCell = GenericPathCell::new();
        CELL.get_or_insert::<Self>(|| concat(&["alloc::vec::Vec<", T::type_path(), ">"]))
    }
}

impl<T: Pickle> Pickle for Vec<T> {
    const CLOSED: bool = true;

    fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
        w.hint_size(self.len());
        w.begin_entry_of::<Self>()?;
        w.put_field("len", &(self.len() as u64))?;
        for elem in self {
            w.put_field("elem", elem)?;
        }
        w.end_entry()
    }
}

impl<T: Unpickle> Unpickle for Vec<T> {
    fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
        r.expect_tag::<Self>(&tag)?;
        let len = read_len(r)?;
        let mut vec = Vec::with_capacity(len.min(MAX_PREALLOC));
        for _ in 0..len {
            vec.push(r.read_field("elem")?);
        }
        r.end_entry()?;
        Ok(vec)
    }
}

// -----------------------------------------------------------------------------
// BTreeMap

impl<K: TypePath, V: TypePath> TypePath for BTreeMap<K, V> {
    fn type_path() -> &'static str {
        static CELL: GenericPathCell = GenericPathCell::new();
        CELL.get_or_insert::<Self>(|| {
            concat(&[
                "alloc::collections::BTreeMap<",
                K::type_path(),
                ", ",
                V::type_path(),
                ">",
            ])
        })
    }
}

impl<K: Pickle, V: Pickle> Pickle for BTreeMap<K, V> {
    const CLOSED: bool = true;

    fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
        w.hint_size(self.len());
        w.begin_entry_of::<Self>()?;
        w.put_field("len", &(self.len() as u64))?;
        for (key, value) in self {
            w.put_field("key", key)?;
            w.put_field("value", value)?;
        }
        w.end_entry()
    }
}

impl<K: Unpickle + Ord, V: Unpickle> Unpickle for BTreeMap<K, V> {
    fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
        r.expect_tag::<Self>(&tag)?;
        let len = read_len(r)?;
        let mut map = BTreeMap::new();
        for _ in 0..len {
            let key = r.read_field("key")?;
            let value = r.read_field("value")?;
            map.insert(key, value);
        }
        r.end_entry()?;
        Ok(map)
    }
}

// -----------------------------------------------------------------------------
// Tuples

macro_rules! impl_tuple {
    ($($name:ident : $index:tt),+) => {
        impl<$($name: TypePath),+> TypePath for ($($name,)+) {
            fn type_path() -> &'static str {
                static CELL: GenericPathCell = GenericPathCell::new();
                CELL.get_or_insert::<Self>(|| {
                    let parts: &[&str] = &[$($name::type_path()),+];
                    if parts.len() == 1 {
                        concat(&["(", parts[0], ",)"])
                    } else {
                        concat(&["(", &parts.join(", "), ")"])
                    }
                })
            }
        }

        impl<$($name: Pickle),+> Pickle for ($($name,)+) {
            const CLOSED: bool = true;

            fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
                w.begin_entry_of::<Self>()?;
                $(w.put_field(stringify!($index), &self.$index)?;)+
                w.end_entry()
            }
        }

        impl<$($name: Unpickle),+> Unpickle for ($($name,)+) {
            fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
                r.expect_tag::<Self>(&tag)?;
                let value = ($(r.read_field::<$name>(stringify!($index))?,)+);
                r.end_entry()?;
                Ok(value)
            }
        }
    };
}

impl_tuple!(A: 0);
impl_tuple!(A: 0, B: 1);
impl_tuple!(A: 0, B: 1, C: 2);
impl_tuple!(A: 0, B: 1, C: 2, D: 3);
