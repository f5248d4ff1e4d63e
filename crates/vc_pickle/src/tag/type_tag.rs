use alloc::sync::Arc;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{Hash, Hasher};

use crate::tag::TypePath;

// -----------------------------------------------------------------------------
// TypeTag

#[derive(Clone)]
enum TagKey {
    Static(&'static str),
    Shared(Arc<str>),
}

/// The runtime identity of a type inside a stream.
///
/// A tag is a canonical key (see [`TypePath`]) and compares, hashes and
/// displays as that key. Cloning is cheap: tags of statically known types
/// borrow a `&'static str`, tags built from other keys share one `Arc<str>`.
///
/// Decoders resolve a key read from a stream to the tag of the expected type
/// or of a registered type when the key matches one, so only unknown keys
/// allocate, and nothing outlives the tags built from them.
///
/// Two tags are reserved: [`TypeTag::NULL`] marks an absent value and
/// [`TypeTag::REF`] marks a back reference to an already registered object.
///
/// # Example
///
/// ```
/// use vc_pickle::tag::TypeTag;
///
/// let tag = TypeTag::of::<Vec<i32>>();
/// assert_eq!(tag.key(), "alloc::vec::Vec<i32>");
/// assert_eq!(tag.base(), "alloc::vec::Vec");
/// assert_eq!(tag.arity(), 1);
/// assert_eq!(tag, TypeTag::from_key("alloc::vec::Vec<i32>"));
/// ```
#[derive(Clone)]
pub struct TypeTag(TagKey);

impl TypeTag {
    /// Key of [`NULL`](Self::NULL).
    pub const NULL_KEY: &'static str = "vc_pickle::Null";

    /// Key of [`REF`](Self::REF).
    pub const REF_KEY: &'static str = "vc_pickle::Ref";

    /// Tag of an absent value (`None`).
    pub const NULL: TypeTag = TypeTag::from_static(Self::NULL_KEY);

    /// Tag of a back reference to an object registered earlier in the stream.
    pub const REF: TypeTag = TypeTag::from_static(Self::REF_KEY);

    /// Creates a tag from a static key.
    #[inline]
    pub const fn from_static(key: &'static str) -> Self {
        Self(TagKey::Static(key))
    }

    /// Returns the tag of `T`.
    #[inline]
    pub fn of<T: TypePath + ?Sized>() -> Self {
        Self(TagKey::Static(T::type_path()))
    }

    /// Returns the tag for a key known only at runtime.
    ///
    /// The reserved keys map to [`NULL`](Self::NULL) and [`REF`](Self::REF),
    /// any other key is copied into a new allocation.
    pub fn from_key(key: &str) -> Self {
        match key {
            Self::NULL_KEY => Self::NULL,
            Self::REF_KEY => Self::REF,
            _ => Self(TagKey::Shared(Arc::from(key))),
        }
    }

    /// Returns the canonical key.
    #[inline]
    pub fn key(&self) -> &str {
        match &self.0 {
            TagKey::Static(key) => key,
            TagKey::Shared(key) => key,
        }
    }

    /// Returns the key without its generic arguments.
    pub fn base(&self) -> &str {
        let key = self.key();
        match key.find('<') {
            Some(index) => &key[..index],
            None => key,
        }
    }

    /// Returns the number of top-level generic arguments.
    pub fn arity(&self) -> usize {
        let key = self.key();
        let Some(start) = key.find('<') else {
            return 0;
        };

        let mut depth = 0_usize;
        let mut count = 1_usize;
        for byte in key[start..].bytes() {
            match byte {
                b'<' | b'(' | b'[' => depth += 1,
                b'>' | b')' | b']' => depth = depth.saturating_sub(1),
                b',' if depth == 1 => count += 1,
                _ => {}
            }
        }
        count
    }

    /// Returns `true` for [`TypeTag::NULL`].
    #[inline]
    pub fn is_null(&self) -> bool {
        self.key() == Self::NULL_KEY
    }

    /// Returns `true` for [`TypeTag::REF`].
    #[inline]
    pub fn is_ref(&self) -> bool {
        self.key() == Self::REF_KEY
    }
}

impl PartialEq for TypeTag {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl Borrow<str> for TypeTag {
    #[inline]
    fn borrow(&self) -> &str {
        self.key()
    }
}

impl fmt::Display for TypeTag {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeTag").field(&self.key()).finish()
    }
}

// -----------------------------------------------------------------------------
// Tests
