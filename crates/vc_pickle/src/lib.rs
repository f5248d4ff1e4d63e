#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// Compilation config

/// Some macros used for compilation control.
///
/// A local copy of the `vc_cfg::define_alias!` pattern, one alias per cfg.
pub(crate) mod cfg {
    #[cfg(all(debug_assertions, feature = "debug"))]
    macro_rules! debug {
        (if { $($p:tt)* } else { $($n:tt)* }) => { { $($p)* } };
        ($($p:tt)*) => { $($p)* };
    }

    #[cfg(not(all(debug_assertions, feature = "debug")))]
    macro_rules! debug {
        (if { $($p:tt)* } else { $($n:tt)* }) => { { $($n)* } };
        ($($p:tt)*) => {};
    }

    #[cfg(feature = "auto_register")]
    macro_rules! auto_register {
        (if { $($p:tt)* } else { $($n:tt)* }) => { { $($p)* } };
        ($($p:tt)*) => { $($p)* };
    }

    #[cfg(not(feature = "auto_register"))]
    macro_rules! auto_register {
        (if { $($p:tt)* } else { $($n:tt)* }) => { { $($n)* } };
        ($($p:tt)*) => {};
    }

    pub(crate) use auto_register;
    pub(crate) use debug;
}

// -----------------------------------------------------------------------------
// Extern Self

// Doc tests and exported macros name the crate `vc_pickle`.
extern crate self as vc_pickle;

// -----------------------------------------------------------------------------
// no_std support

extern crate alloc;
extern crate std;

// -----------------------------------------------------------------------------
// Modules

mod engine;
mod error;
mod hash;
mod impls;
mod pickle;

pub mod dispatch;
pub mod format;
pub mod identity;
pub mod registry;
pub mod tag;

#[cfg(test)]
mod tests;

// -----------------------------------------------------------------------------
// Top-Level exports

#[doc(hidden)]
pub mod __macro_exports;

pub use engine::{Engine, PickleConfig, TraversalStats, from_bytes, to_bytes};
pub use error::{PickleError, Result};
pub use pickle::{Pickle, PickleWriter, Unpickle, UnpicklePointee, UnpickleReader};
pub use registry::{PicklerRegistry, PicklerRegistryArc};
