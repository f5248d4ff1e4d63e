use alloc::boxed::Box;
use alloc::format;
use core::any::Any;

use super::Unpickle;
use super::trace::EntryTrace;
use crate::engine::{PickleConfig, TraversalStats};
use crate::error::{PickleError, Result};
use crate::format::{EntryReader, Primitive, PrimitiveKind};
use crate::identity::DecodeRefs;
use crate::registry::PicklerRegistryArc;
use crate::tag::{TypePath, TypeTag};

/// Returns the tag of a key read from the stream.
///
/// Registered types reuse their static tag, other keys get their own copy.
fn resolve_key(registry: &PicklerRegistryArc, key: &str) -> TypeTag {
    match key {
        TypeTag::NULL_KEY => TypeTag::NULL,
        TypeTag::REF_KEY => TypeTag::REF,
        _ => registry
            .read()
            .registered_tag(key)
            .unwrap_or_else(|| TypeTag::from_key(key)),
    }
}

// -----------------------------------------------------------------------------
// UnpickleReader

/// The decode context of one traversal.
///
/// Mirrors [`PickleWriter`](crate::PickleWriter): owns the identity
/// registry of the traversal and drives the format's [`EntryReader`].
/// Entries must be read in the order they were written.
pub struct UnpickleReader<'a> {
    reader: &'a mut dyn EntryReader,
    registry: &'a PicklerRegistryArc,
    config: PickleConfig,
    refs: DecodeRefs,
    expected: Option<TypeTag>,
    depth: usize,
    stats: TraversalStats,
    trace: EntryTrace,
}

impl<'a> UnpickleReader<'a> {
    pub fn new(
        reader: &'a mut dyn EntryReader,
        registry: &'a PicklerRegistryArc,
        config: PickleConfig,
    ) -> Self {
        Self {
            reader,
            registry,
            config,
            refs: DecodeRefs::new(),
            expected: None,
            depth: 0,
            stats: TraversalStats::default(),
            trace: EntryTrace::default(),
        }
    }

    /// Reads a value at a site whose static type is `T`.
    ///
    /// If the writer elided the tag, the static tag of `T` is used.
    #[inline]
    pub fn read<T: Unpickle>(&mut self) -> Result<T> {
        self.expected = Some(T::static_tag());
        super::nested(|| T::unpickle(self))
    }

    /// Opens the next entry and returns its tag.
    pub fn begin_entry(&mut self) -> Result<TypeTag> {
        if let Some(limit) = self.config.max_depth
            && self.depth >= limit
        {
            return Err(PickleError::DepthLimitExceeded { limit });
        }

        let expected = self.expected.take();
        let tag = match self.reader.begin_entry()? {
            Some(key) => match expected {
                Some(expected) if expected.key() == &*key => expected,
                _ => resolve_key(self.registry, &key),
            },
            None => expected.ok_or_else(|| {
                PickleError::malformed("elided tag at a site without a static type")
            })?,
        };

        self.depth += 1;
        self.stats.entries += 1;
        self.trace.enter_entry(&tag);
        Ok(tag)
    }

    pub fn end_entry(&mut self) -> Result<()> {
        self.reader.end_entry()?;
        self.depth -= 1;
        self.trace.exit_entry();
        Ok(())
    }

    /// Checks that `tag` is the static tag of `T`.
    pub fn expect_tag<T: Unpickle>(&self, tag: &TypeTag) -> Result<()> {
        let expected = T::static_tag();
        if *tag == expected {
            Ok(())
        } else {
            Err(PickleError::mismatch(expected.key(), tag.key()))
        }
    }

    /// Reads the named field and its value.
    #[inline]
    pub fn read_field<T: Unpickle>(&mut self, name: &str) -> Result<T> {
        self.read_field_with(name, |r| r.read::<T>())
    }

    /// Reads the named field, decoding its entry with `f`.
    pub fn read_field_with<T>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.reader.read_field(name)?;
        self.trace.enter_field(name);
        f(self)
    }

    /// Reads the payload of the current leaf entry.
    #[inline]
    pub fn read_primitive(&mut self, kind: PrimitiveKind) -> Result<Primitive<'static>> {
        self.reader.read_primitive(kind)
    }

    /// Reads the payload of the current leaf entry and closes it.
    pub fn read_leaf(&mut self, kind: PrimitiveKind) -> Result<Primitive<'static>> {
        let value = self.reader.read_primitive(kind)?;
        self.end_entry()?;
        Ok(value)
    }

    /// Reads the object id of a `Ref` entry whose begin marker was consumed.
    pub fn read_ref_id(&mut self) -> Result<u32> {
        match self.read_leaf(PrimitiveKind::U32)? {
            Primitive::U32(id) => Ok(id),
            other => Err(PickleError::malformed(format!(
                "back reference carries a {} payload",
                other.kind()
            ))),
        }
    }

    /// Reserves the id of the shared object whose entry just began.
    ///
    /// Fails if the format recorded another id for the entry.
    pub fn reserve_id(&mut self) -> Result<u32> {
        let id = self.refs.reserve();
        self.reader.claim_object_id(id)?;
        self.stats.shared_objects += 1;
        Ok(id)
    }

    /// Makes `value` visible to later back references to `id`.
    pub fn fill<T: Any>(&mut self, id: u32, value: T) -> Result<()> {
        self.refs.fill(id, Box::new(value))
    }

    /// Returns a clone of the object registered under `id`.
    pub fn resolve<T: TypePath + Clone>(&mut self, id: u32) -> Result<T> {
        let value = self
            .refs
            .get(id)?
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| PickleError::mismatch(T::type_path(), format!("object #{id}")))?;
        self.stats.back_refs += 1;
        Ok(value)
    }

    #[inline]
    pub fn registry(&self) -> &'a PicklerRegistryArc {
        self.registry
    }

    #[inline]
    pub fn config(&self) -> &PickleConfig {
        &self.config
    }

    #[inline]
    pub fn stats(&self) -> &TraversalStats {
        &self.stats
    }

    #[inline]
    pub(crate) fn stats_mut(&mut self) -> &mut TraversalStats {
        &mut self.stats
    }

    /// Checks that the root entry was fully consumed.
    pub(crate) fn finish(&mut self) -> Result<()> {
        self.reader.finish()
    }

    #[inline]
    pub(crate) fn trace(&self) -> &EntryTrace {
        &self.trace
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::resolve_key;
    use crate::tag::TypeTag;
    use crate::{PicklerRegistry, PicklerRegistryArc};
    use alloc::string::String;

    #[test]
    fn registered_keys_reuse_static_tags() {
        let registry = PicklerRegistryArc::new(PicklerRegistry::new());

        let tag = resolve_key(&registry, "i32");
        assert!(core::ptr::eq(tag.key(), TypeTag::of::<i32>().key()));
        assert!(resolve_key(&registry, "vc_pickle::Ref").is_ref());

        let unknown = String::from("demo::Unknown");
        let tag = resolve_key(&registry, &unknown);
        assert_eq!(tag.key(), "demo::Unknown");
        assert!(!core::ptr::eq(tag.key(), unknown.as_str()));
    }
}
