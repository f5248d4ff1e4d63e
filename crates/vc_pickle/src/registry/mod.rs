//! Process-wide pickler registry, consulted by open dispatch.
//!
//! # Auto registration
//!
//! With the `auto_register` feature, [`auto_register_pickler!`] and
//! [`auto_register_upcast!`] submit registrations at compile time with the
//! [`inventory`] crate. [`PicklerRegistryArc::global`] runs them on first use,
//! other registries run them with [`PicklerRegistry::auto_register`].
//!
//! Supported platforms are those of `inventory`: Linux, macOS, Windows, iOS,
//! Android and Web.
//!
//! [`auto_register_pickler!`]: crate::auto_register_pickler
//! [`auto_register_upcast!`]: crate::auto_register_upcast
//! [`inventory`]: https://docs.rs/inventory

mod erased;
mod pickler_registry;

#[cfg(feature = "auto_register")]
mod auto_register;

pub use erased::{ErasedDecoder, ErasedEncoder, Upcast};
pub use pickler_registry::{PicklerRegistry, PicklerRegistryArc};

#[cfg(feature = "auto_register")]
pub use auto_register::AutoRegistration;
