use alloc::boxed::Box;
use alloc::sync::Arc;
use core::any::{Any, TypeId};
use core::fmt;
use std::sync::{LazyLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{ErasedDecoder, ErasedEncoder, Upcast};
use crate::hash::{HashMap, HashSet};
use crate::pickle::{Pickle, Unpickle};
use crate::tag::{TypePath, TypeTag};

// -----------------------------------------------------------------------------
// PicklerRegistry

/// The registry of picklers reachable by runtime tag.
///
/// Open dispatch sites fall back to it when their candidate list does not
/// know a runtime type, and [`Engine::decode_dynamic`] uses it to decode a
/// root entry of unknown type.
///
/// Entries:
/// - an encoder and a decoder per tag;
/// - upcasts, which turn a decoded value into `Box<dyn Family>`, per
///   (family, tag) pair;
/// - the members registered for each family.
///
/// [`Engine::decode_dynamic`]: crate::Engine::decode_dynamic
pub struct PicklerRegistry {
    encoders: HashMap<TypeTag, ErasedEncoder>,
    decoders: HashMap<TypeTag, ErasedDecoder>,
    upcasts: HashMap<(TypeId, TypeTag), Arc<dyn Any + Send + Sync>>,
    families: HashMap<TypeTag, HashSet<TypeTag>>,
}

impl Default for PicklerRegistry {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl PicklerRegistry {
    /// Creates a registry without any entry.
    pub fn empty() -> Self {
        Self {
            encoders: HashMap::default(),
            decoders: HashMap::default(),
            upcasts: HashMap::default(),
            families: HashMap::default(),
        }
    }

    /// Creates a registry with the primitive types and `String`.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register::<()>();
        registry.register::<bool>();
        registry.register::<char>();
        registry.register::<i8>();
        registry.register::<i16>();
        registry.register::<i32>();
        registry.register::<i64>();
        registry.register::<i128>();
        registry.register::<isize>();
        registry.register::<u8>();
        registry.register::<u16>();
        registry.register::<u32>();
        registry.register::<u64>();
        registry.register::<u128>();
        registry.register::<usize>();
        registry.register::<f32>();
        registry.register::<f64>();
        registry.register::<alloc::string::String>();
        registry
    }

    /// Registers the encoder of `tag`, replacing any previous one.
    pub fn register_encoder(&mut self, tag: TypeTag, encoder: ErasedEncoder) {
        if let Some(old) = self.encoders.insert(tag.clone(), encoder)
            && old.type_id() != encoder.type_id()
        {
            log::warn!("encoder of `{tag}` was replaced by one of another type");
        }
    }

    /// Registers the decoder of `tag`, replacing any previous one.
    pub fn register_decoder(&mut self, tag: TypeTag, decoder: ErasedDecoder) {
        if let Some(old) = self.decoders.insert(tag.clone(), decoder)
            && old.type_id() != decoder.type_id()
        {
            log::warn!("decoder of `{tag}` was replaced by one of another type");
        }
    }

    /// Registers the encoder and decoder of `T` under its tag, if absent.
    pub fn register<T: Pickle + Unpickle>(&mut self) {
        let tag = TypeTag::of::<T>();
        self.encoders
            .entry(tag.clone())
            .or_insert_with(ErasedEncoder::of::<T>);
        self.decoders
            .entry(tag)
            .or_insert_with(ErasedDecoder::of::<T>);
    }

    /// Registers `T` as a member of the family `B`.
    ///
    /// `T` itself is registered too, so values of `T` can be found by tag at
    /// any open site of `B`.
    pub fn register_upcast<T, B>(&mut self, upcast: fn(T) -> Box<B>)
    where
        T: Pickle + Unpickle,
        B: TypePath + ?Sized,
    {
        self.register::<T>();
        let member = TypeTag::of::<T>();
        self.upcasts.insert(
            (TypeId::of::<B>(), member.clone()),
            Arc::new(Upcast::new(upcast)),
        );
        self.families
            .entry(TypeTag::of::<B>())
            .or_default()
            .insert(member);
    }

    /// Returns a copy of the encoder registered for `tag`.
    #[inline]
    pub fn lookup_encoder(&self, tag: &TypeTag) -> Option<ErasedEncoder> {
        self.encoders.get(tag).copied()
    }

    /// Returns a copy of the decoder registered for `tag`.
    #[inline]
    pub fn lookup_decoder(&self, tag: &TypeTag) -> Option<ErasedDecoder> {
        self.decoders.get(tag).copied()
    }

    /// Returns the conversion of `tag` values into `Box<B>`.
    pub fn lookup_upcast<B: ?Sized + 'static>(&self, tag: &TypeTag) -> Option<Arc<Upcast<B>>> {
        self.upcasts
            .get(&(TypeId::of::<B>(), tag.clone()))?
            .clone()
            .downcast::<Upcast<B>>()
            .ok()
    }

    /// Returns `true` if `member` was registered as a member of `family`.
    pub fn is_family_member(&self, family: &TypeTag, member: &TypeTag) -> bool {
        self.families
            .get(family)
            .is_some_and(|members| members.contains(member))
    }

    /// Returns the registered tag whose key is `key`.
    pub fn registered_tag(&self, key: &str) -> Option<TypeTag> {
        self.decoders
            .get_key_value(key)
            .map(|(tag, _)| tag)
            .or_else(|| self.encoders.get_key_value(key).map(|(tag, _)| tag))
            .cloned()
    }

    /// Returns `true` if an encoder or decoder is registered for `tag`.
    #[inline]
    pub fn contains(&self, tag: &TypeTag) -> bool {
        self.encoders.contains_key(tag) || self.decoders.contains_key(tag)
    }

    /// Runs every registration submitted with [`auto_register_pickler!`] and
    /// [`auto_register_upcast!`].
    ///
    /// Repeated calls do not replace picklers that are already registered.
    ///
    /// Returns `false` if the `auto_register` feature is disabled.
    ///
    /// [`auto_register_pickler!`]: crate::auto_register_pickler
    /// [`auto_register_upcast!`]: crate::auto_register_upcast
    #[cfg_attr(not(feature = "auto_register"), inline(always))]
    pub fn auto_register(&mut self) -> bool {
        crate::cfg::auto_register! {
            if {
                let count = super::auto_register::register_all(self);
                log::debug!("auto registration ran {count} registration(s)");
                true
            } else {
                false
            }
        }
    }
}

impl fmt::Debug for PicklerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.encoders.keys()).finish()
    }
}

// -----------------------------------------------------------------------------
// PicklerRegistryArc

/// A shared [`PicklerRegistry`] behind a read-write lock.
///
/// Lookups copy the erased functions out of the registry, so no lock is held
/// while picklers run.
#[derive(Clone, Default)]
pub struct PicklerRegistryArc {
    /// The wrapped [`PicklerRegistry`].
    pub internal: Arc<RwLock<PicklerRegistry>>,
}

impl PicklerRegistryArc {
    pub fn new(registry: PicklerRegistry) -> Self {
        Self {
            internal: Arc::new(RwLock::new(registry)),
        }
    }

    /// The process-wide registry.
    ///
    /// Holds the primitive types and, with the `auto_register` feature, every
    /// auto registered pickler.
    pub fn global() -> &'static PicklerRegistryArc {
        static GLOBAL: LazyLock<PicklerRegistryArc> = LazyLock::new(|| {
            let mut registry = PicklerRegistry::new();
            registry.auto_register();
            PicklerRegistryArc::new(registry)
        });
        &GLOBAL
    }

    /// Takes a read lock on the underlying [`PicklerRegistry`].
    pub fn read(&self) -> RwLockReadGuard<'_, PicklerRegistry> {
        self.internal.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes a write lock on the underlying [`PicklerRegistry`].
    pub fn write(&self) -> RwLockWriteGuard<'_, PicklerRegistry> {
        self.internal
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for PicklerRegistryArc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.read().fmt(f)
    }
}
