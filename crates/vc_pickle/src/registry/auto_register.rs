//! Compile-time registration, collected with [`inventory`].

use super::PicklerRegistry;

/// One registration submitted by [`auto_register_pickler!`] or
/// [`auto_register_upcast!`].
///
/// [`auto_register_pickler!`]: crate::auto_register_pickler
/// [`auto_register_upcast!`]: crate::auto_register_upcast
pub struct AutoRegistration {
    register: fn(&mut PicklerRegistry),
}

impl AutoRegistration {
    #[inline]
    pub const fn new(register: fn(&mut PicklerRegistry)) -> Self {
        Self { register }
    }
}

inventory::collect!(AutoRegistration);

/// Runs every submitted registration, returns how many ran.
pub(super) fn register_all(registry: &mut PicklerRegistry) -> usize {
    let mut count = 0;
    for registration in inventory::iter::<AutoRegistration> {
        (registration.register)(registry);
        count += 1;
    }
    count
}

/// Registers the picklers of a type in the global registry at startup.
///
/// The type must implement [`Pickle`](crate::Pickle) and
/// [`Unpickle`](crate::Unpickle).
///
/// ```no_run
/// use vc_pickle::{auto_register_pickler, PicklerRegistryArc};
/// use vc_pickle::tag::TypeTag;
/// # use vc_pickle::{Pickle, PickleWriter, Unpickle, UnpickleReader, Result, impl_type_path};
/// # struct Meters(f64);
/// # impl_type_path!(Meters => "units::Meters");
/// # impl Pickle for Meters {
/// #     fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
/// #         w.begin_entry_of::<Self>()?;
/// #         w.put_field("value", &self.0)?;
/// #         w.end_entry()
/// #     }
/// # }
/// # impl Unpickle for Meters {
/// #     fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
/// #         r.expect_tag::<Self>(&tag)?;
/// #         let value = r.read_field("value")?;
/// #         r.end_entry()?;
/// #         Ok(Meters(value))
/// #     }
/// # }
///
/// auto_register_pickler!(Meters);
///
/// let registry = PicklerRegistryArc::global().read();
/// assert!(registry.contains(&TypeTag::from_static("units::Meters")));
/// ```
#[macro_export]
macro_rules! auto_register_pickler {
    ($ty:ty) => {
        $crate::__macro_exports::inventory::submit! {
            $crate::registry::AutoRegistration::new(|registry| registry.register::<$ty>())
        }
    };
}

/// Registers a type as a member of an open family at startup.
///
/// ```ignore
/// auto_register_upcast!(Circle => dyn Shape);
/// ```
#[macro_export]
macro_rules! auto_register_upcast {
    ($ty:ty => $family:ty) => {
        $crate::__macro_exports::inventory::submit! {
            $crate::registry::AutoRegistration::new(|registry| {
                registry.register_upcast::<$ty, $family>(|value| {
                    $crate::__macro_exports::Box::new(value)
                })
            })
        }
    };
}
