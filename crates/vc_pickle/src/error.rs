use alloc::string::String;

use thiserror::Error;

// -----------------------------------------------------------------------------
// PickleError

/// Errors raised by a single encode or decode call.
///
/// All errors are local to the traversal that produced them. Output written
/// before the failure is never handed back, and must be considered unusable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PickleError {
    /// Dispatch found no encoder or decoder for a runtime type or a decoded type key.
    #[error("no pickler is registered for type `{key}`")]
    UnknownType { key: String },

    /// A `Ref` entry points to an object id that was never registered.
    #[error("reference to object #{id}, which was never registered")]
    DanglingReference { id: u32 },

    /// A `Ref` entry points to an object whose construction has not finished,
    /// and whose type cannot be shared before its fields are known.
    #[error("reference to object #{id} before its construction finished")]
    UnfinishedReference { id: u32 },

    /// A decoded value is not compatible with the requested type.
    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    TypeMismatch { expected: String, found: String },

    /// The requested type cannot be resolved to a concrete decoder.
    #[error("cannot decode into `{key}`: no concrete unpickler can be resolved")]
    AmbiguousType { key: String },

    /// The entry framing contract was violated.
    #[error("malformed entry: {reason}")]
    MalformedEntry { reason: String },

    /// Entries are nested deeper than [`PickleConfig::max_depth`].
    ///
    /// [`PickleConfig::max_depth`]: crate::PickleConfig::max_depth
    #[error("entries are nested deeper than the limit of {limit}")]
    DepthLimitExceeded { limit: usize },

    /// A value could not be accessed while encoding (already borrowed, poisoned lock).
    #[error("value is unavailable: {reason}")]
    Unavailable { reason: String },
}

impl PickleError {
    #[cold]
    #[inline(never)]
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedEntry {
            reason: reason.into(),
        }
    }

    #[cold]
    #[inline(never)]
    pub(crate) fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    #[cold]
    #[inline(never)]
    pub(crate) fn unknown(key: impl Into<String>) -> Self {
        Self::UnknownType { key: key.into() }
    }
}

/// Result alias used across the crate.
pub type Result<T, E = PickleError> = core::result::Result<T, E>;

// -----------------------------------------------------------------------------
// Tests
