//! Runtime dispatch for open type families (trait objects).
//!
//! An open site holds a value whose concrete type is only known at run time,
//! e.g. `Box<dyn Shape>`. Dispatch resolves the pickler in this order:
//!
//! 1. **Candidates**: the ordered list declared with the family, compared by
//!    [`TypeId`] when encoding and by tag when decoding. First match wins.
//! 2. **Registry**: the [`PicklerRegistry`] of the traversal, by tag key.
//!    Decoding also needs an upcast registered for the family.
//! 3. Otherwise [`PickleError::UnknownType`].
//!
//! Closed sites (any `T: Pickle` written with [`PickleWriter::write`]) never
//! come here.
//!
//! [`PicklerRegistry`]: crate::PicklerRegistry

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::{Any, TypeId};
use core::fmt;

use crate::error::{PickleError, Result};
use crate::pickle::{Pickle, PickleWriter, Unpickle, UnpickleReader};
use crate::registry::{ErasedDecoder, ErasedEncoder, Upcast};
use crate::tag::{Dynamic, TypePath, TypeTag};

mod family;

// -----------------------------------------------------------------------------
// Candidate

type CandidateDecode<B> =
    Box<dyn Fn(TypeTag, &mut UnpickleReader<'_>) -> Result<Box<B>> + Send + Sync>;

/// A concrete member of an open family, known where the family is declared.
pub struct Candidate<B: ?Sized + 'static> {
    tag: TypeTag,
    type_id: TypeId,
    encode: ErasedEncoder,
    decode: CandidateDecode<B>,
}

impl<B: ?Sized + 'static> Candidate<B> {
    /// Creates the candidate of `T`, converted into the family by `upcast`.
    pub fn new<T: Pickle + Unpickle>(upcast: fn(T) -> Box<B>) -> Self {
        Self {
            tag: TypeTag::of::<T>(),
            type_id: TypeId::of::<T>(),
            encode: ErasedEncoder::of::<T>(),
            decode: Box::new(move |tag: TypeTag, r: &mut UnpickleReader<'_>| {
                T::unpickle_tagged(tag, r).map(upcast)
            }),
        }
    }

    #[inline]
    pub fn tag(&self) -> &TypeTag {
        &self.tag
    }

    #[inline]
    pub fn decode(&self, tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Box<B>> {
        (self.decode)(tag, r)
    }
}

impl<B: ?Sized + 'static> fmt::Debug for Candidate<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Resolution

/// Where an open site found its encoder.
#[derive(Debug, Clone, Copy)]
pub enum ResolvedEncoder {
    Candidate(ErasedEncoder),
    Registry(ErasedEncoder),
}

/// Where an open site found its decoder.
pub enum ResolvedDecoder<'a, B: ?Sized + 'static> {
    Candidate(&'a Candidate<B>),
    Registry(ErasedDecoder, Arc<Upcast<B>>),
}

// -----------------------------------------------------------------------------
// OpenDispatch

/// The dispatch table of the open family `B`.
///
/// Usually declared with [`impl_pickle_family!`](crate::impl_pickle_family),
/// which keeps one table per family in a static.
pub struct OpenDispatch<B: ?Sized + 'static> {
    candidates: Vec<Candidate<B>>,
}

impl<B: ?Sized + 'static> Default for OpenDispatch<B> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<B: ?Sized + 'static> fmt::Debug for OpenDispatch<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.candidates.iter()).finish()
    }
}

impl<B: ?Sized + 'static> OpenDispatch<B> {
    /// Creates a table without candidates, which always falls back to the registry.
    #[inline]
    pub const fn new() -> Self {
        Self {
            candidates: Vec::new(),
        }
    }

    /// Appends a candidate. Candidates are tried in insertion order.
    pub fn with_candidate<T: Pickle + Unpickle>(mut self, upcast: fn(T) -> Box<B>) -> Self {
        self.candidates.push(Candidate::new(upcast));
        self
    }

    #[inline]
    pub fn candidates(&self) -> &[Candidate<B>] {
        &self.candidates
    }
}

impl<B: ?Sized + Dynamic + TypePath> OpenDispatch<B> {
    /// Resolves the encoder of a value of runtime type `type_id` and tag `tag`.
    pub fn resolve_encoder(
        &self,
        type_id: TypeId,
        tag: &TypeTag,
        w: &PickleWriter<'_>,
    ) -> Result<ResolvedEncoder> {
        if let Some(candidate) = self.candidates.iter().find(|c| c.type_id == type_id) {
            return Ok(ResolvedEncoder::Candidate(candidate.encode));
        }
        match w.registry().read().lookup_encoder(tag) {
            Some(encoder) => Ok(ResolvedEncoder::Registry(encoder)),
            None => Err(PickleError::unknown(tag.key())),
        }
    }

    /// Resolves the decoder of an entry tagged `tag`.
    pub fn resolve_decoder(
        &self,
        tag: &TypeTag,
        r: &UnpickleReader<'_>,
    ) -> Result<ResolvedDecoder<'_, B>> {
        if tag.is_null() || tag.is_ref() {
            return Err(PickleError::mismatch(B::type_path(), tag.key()));
        }
        if let Some(candidate) = self.candidates.iter().find(|c| c.tag == *tag) {
            return Ok(ResolvedDecoder::Candidate(candidate));
        }

        let registry = r.registry().read();
        let Some(decoder) = registry.lookup_decoder(tag) else {
            return Err(PickleError::unknown(tag.key()));
        };
        let Some(upcast) = registry.lookup_upcast::<B>(tag) else {
            return Err(PickleError::mismatch(B::type_path(), tag.key()));
        };
        Ok(ResolvedDecoder::Registry(decoder, upcast))
    }

    /// Pickles `value` with the encoder of its runtime type.
    pub fn pickle(&self, value: &B, w: &mut PickleWriter<'_>) -> Result<()> {
        w.stats_mut().runtime_lookups += 1;

        let any: &dyn Any = value.as_any();
        let tag = value.dynamic_tag();
        match self.resolve_encoder(any.type_id(), &tag, w)? {
            ResolvedEncoder::Candidate(encoder) => {
                w.stats_mut().candidate_hits += 1;
                encoder.encode(any, w)
            }
            ResolvedEncoder::Registry(encoder) => {
                w.stats_mut().registry_fallbacks += 1;
                encoder.encode(any, w)
            }
        }
    }

    /// Reads the rest of an entry tagged `tag` as a member of the family.
    pub fn unpickle_tagged(&self, tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Box<B>> {
        r.stats_mut().runtime_lookups += 1;

        match self.resolve_decoder(&tag, r)? {
            ResolvedDecoder::Candidate(candidate) => {
                r.stats_mut().candidate_hits += 1;
                candidate.decode(tag, r)
            }
            ResolvedDecoder::Registry(decoder, upcast) => {
                r.stats_mut().registry_fallbacks += 1;
                let value = decoder.decode(tag.clone(), r)?;
                upcast
                    .apply(value)
                    .map_err(|_| PickleError::mismatch(B::type_path(), tag.key()))
            }
        }
    }
}
