//! The pickling engine: one top-level encode or decode call per traversal.

mod config;
mod stats;

pub use config::PickleConfig;
pub use stats::TraversalStats;

use alloc::boxed::Box;
use core::any::Any;

use crate::error::{PickleError, Result};
use crate::format::{BinaryFormat, PickleFormat};
use crate::pickle::{Pickle, PickleWriter, Unpickle, UnpickleReader};
use crate::registry::PicklerRegistryArc;
use crate::tag::{Dynamic, TypeTag};

// -----------------------------------------------------------------------------
// Engine

/// Encodes and decodes object graphs with a [`PickleFormat`].
///
/// Every call is an independent traversal with its own identity registry.
/// Picklers found at runtime come from the engine's [`PicklerRegistryArc`],
/// the process-wide one unless [`with_registry`](Self::with_registry) is used.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use vc_pickle::Engine;
/// use vc_pickle::format::BinaryFormat;
///
/// let shared = Rc::new(String::from("shared"));
/// let pair = (shared.clone(), shared);
///
/// let engine = Engine::new(BinaryFormat);
/// let bytes = engine.encode(&pair).unwrap();
/// let back: (Rc<String>, Rc<String>) = engine.decode(&bytes).unwrap();
///
/// assert!(Rc::ptr_eq(&back.0, &back.1));
/// ```
#[derive(Debug, Clone)]
pub struct Engine<F: PickleFormat> {
    format: F,
    registry: PicklerRegistryArc,
    config: PickleConfig,
}

impl<F: PickleFormat + Default> Default for Engine<F> {
    #[inline]
    fn default() -> Self {
        Self::new(F::default())
    }
}

impl<F: PickleFormat> Engine<F> {
    /// Creates an engine over the process-wide registry.
    pub fn new(format: F) -> Self {
        Self {
            format,
            registry: PicklerRegistryArc::global().clone(),
            config: PickleConfig::new(),
        }
    }

    pub fn with_registry(mut self, registry: PicklerRegistryArc) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_config(mut self, config: PickleConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    pub fn format(&self) -> &F {
        &self.format
    }

    #[inline]
    pub fn registry(&self) -> &PicklerRegistryArc {
        &self.registry
    }

    #[inline]
    pub fn config(&self) -> &PickleConfig {
        &self.config
    }

    /// Encodes the graph rooted at `value`.
    #[inline]
    pub fn encode<T: Pickle + ?Sized>(&self, value: &T) -> Result<F::Output> {
        self.encode_with_stats(value).map(|(output, _)| output)
    }

    /// Encodes the graph rooted at `value`, returning the traversal counters.
    pub fn encode_with_stats<T: Pickle + ?Sized>(
        &self,
        value: &T,
    ) -> Result<(F::Output, TraversalStats)> {
        self.run_encode(T::type_path(), |w| w.write(value))
    }

    /// Encodes a value whose type is only known at run time.
    ///
    /// The encoder is looked up in the registry by the runtime tag.
    pub fn encode_dynamic(&self, value: &dyn Dynamic) -> Result<F::Output> {
        let tag = value.dynamic_tag();
        let encoder = self
            .registry
            .read()
            .lookup_encoder(&tag)
            .ok_or_else(|| PickleError::unknown(tag.key()))?;

        self.run_encode(tag.key(), |w| {
            w.stats_mut().runtime_lookups += 1;
            w.stats_mut().registry_fallbacks += 1;
            encoder.encode(value.as_any(), w)
        })
        .map(|(output, _)| output)
    }

    fn run_encode(
        &self,
        root: &str,
        f: impl FnOnce(&mut PickleWriter<'_>) -> Result<()>,
    ) -> Result<(F::Output, TraversalStats)> {
        log::trace!("encoding `{root}`");

        let mut builder = self.format.create_builder();
        let mut writer = PickleWriter::new(&mut builder, &self.registry, self.config);
        if let Err(err) = f(&mut writer) {
            log::debug!("encoding `{root}` failed at {}: {err}", writer.trace());
            return Err(err);
        }

        let stats = *writer.stats();
        drop(writer);
        let output = self.format.finish_builder(builder)?;
        log::trace!("encoded `{root}`: {stats}");
        Ok((output, stats))
    }

    /// Decodes a graph rooted at a value of type `T`.
    #[inline]
    pub fn decode<T: Unpickle>(&self, input: &F::Input) -> Result<T> {
        self.decode_with_stats(input).map(|(value, _)| value)
    }

    /// Decodes a graph rooted at a value of type `T`, returning the traversal counters.
    pub fn decode_with_stats<T: Unpickle>(&self, input: &F::Input) -> Result<(T, TraversalStats)> {
        self.run_decode(T::type_path(), input, |r| r.read::<T>())
    }

    /// Decodes a root entry whose type is only known from the stream.
    ///
    /// `expected` is the static type at the call site: a concrete type, or an
    /// open family whose registered members are accepted.
    ///
    /// # Errors
    ///
    /// - [`AmbiguousType`](PickleError::AmbiguousType) if `expected` is absent
    ///   or names `Null` or `Ref`, before the input is read;
    /// - [`UnknownType`](PickleError::UnknownType) if the root key has no
    ///   registered decoder;
    /// - [`TypeMismatch`](PickleError::TypeMismatch) if the decoded type is
    ///   neither `expected` nor a registered member of it.
    pub fn decode_dynamic(
        &self,
        input: &F::Input,
        expected: Option<&TypeTag>,
    ) -> Result<Box<dyn Any>> {
        let expected = match expected {
            Some(tag) if !tag.is_null() && !tag.is_ref() => tag.clone(),
            Some(tag) => {
                return Err(PickleError::AmbiguousType {
                    key: tag.key().into(),
                });
            }
            None => {
                return Err(PickleError::AmbiguousType {
                    key: "<unspecified>".into(),
                });
            }
        };

        self.run_decode(expected.key(), input, |r| {
            let tag = r.begin_entry()?;
            let decoder = {
                let registry = r.registry().read();
                let Some(decoder) = registry.lookup_decoder(&tag) else {
                    return Err(PickleError::unknown(tag.key()));
                };
                if tag != expected && !registry.is_family_member(&expected, &tag) {
                    return Err(PickleError::mismatch(expected.key(), tag.key()));
                }
                decoder
            };

            r.stats_mut().runtime_lookups += 1;
            r.stats_mut().registry_fallbacks += 1;
            decoder.decode(tag, r)
        })
        .map(|(value, _)| value)
    }

    fn run_decode<T>(
        &self,
        root: &str,
        input: &F::Input,
        f: impl FnOnce(&mut UnpickleReader<'_>) -> Result<T>,
    ) -> Result<(T, TraversalStats)> {
        log::trace!("decoding `{root}`");

        let mut source = self.format.create_reader(input)?;
        let mut reader = UnpickleReader::new(&mut source, &self.registry, self.config);
        let value = match f(&mut reader).and_then(|value| reader.finish().map(|()| value)) {
            Ok(value) => value,
            Err(err) => {
                log::debug!("decoding `{root}` failed at {}: {err}", reader.trace());
                return Err(err);
            }
        };

        let stats = *reader.stats();
        log::trace!("decoded `{root}`: {stats}");
        Ok((value, stats))
    }
}

// -----------------------------------------------------------------------------
// Shortcuts

/// Encodes `value` with the [`BinaryFormat`] and the process-wide registry.
///
/// ```
/// assert_eq!(vc_pickle::to_bytes(&42_i32).unwrap(), b"\x03i32\x2a\x00\x00\x00");
/// ```
pub fn to_bytes<T: Pickle + ?Sized>(value: &T) -> Result<alloc::vec::Vec<u8>> {
    Engine::new(BinaryFormat).encode(value)
}

/// Decodes a `T` from the [`BinaryFormat`] with the process-wide registry.
pub fn from_bytes<T: Unpickle>(bytes: &[u8]) -> Result<T> {
    Engine::new(BinaryFormat).decode(bytes)
}
