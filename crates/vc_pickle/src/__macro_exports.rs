//! Items used by the exported macros. Not public API.

pub use alloc::boxed::Box;
pub use alloc::rc::Rc;
pub use alloc::sync::Arc;
pub use std::sync::OnceLock;

#[cfg(feature = "auto_register")]
pub use inventory;
