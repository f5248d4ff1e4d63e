use core::any::TypeId;
use core::mem;

use super::Pickle;
use super::trace::EntryTrace;
use crate::engine::{PickleConfig, TraversalStats};
use crate::error::{PickleError, Result};
use crate::format::{EntryBuilder, Hints, Primitive};
use crate::identity::{EncodeRefs, Visit};
use crate::registry::PicklerRegistryArc;
use crate::tag::TypeTag;

// -----------------------------------------------------------------------------
// PickleWriter

/// The encode context of one traversal.
///
/// Owns the identity registry of the traversal and drives the format's
/// [`EntryBuilder`]. Picklers receive it by `&mut` and recurse through
/// [`write`](Self::write) and the field helpers.
///
/// # Example
///
/// ```
/// use vc_pickle::{Pickle, PickleWriter, Result, impl_type_path};
///
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl_type_path!(Point => "demo::Point");
///
/// impl Pickle for Point {
///     const CLOSED: bool = true;
///
///     fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
///         w.begin_entry_of::<Self>()?;
///         w.put_field("x", &self.x)?;
///         w.put_field("y", &self.y)?;
///         w.end_entry()
///     }
/// }
/// ```
pub struct PickleWriter<'a> {
    builder: &'a mut dyn EntryBuilder,
    registry: &'a PicklerRegistryArc,
    config: PickleConfig,
    refs: EncodeRefs,
    hints: Hints,
    depth: usize,
    stats: TraversalStats,
    trace: EntryTrace,
}

impl<'a> PickleWriter<'a> {
    pub fn new(
        builder: &'a mut dyn EntryBuilder,
        registry: &'a PicklerRegistryArc,
        config: PickleConfig,
    ) -> Self {
        Self {
            builder,
            registry,
            config,
            refs: EncodeRefs::new(),
            hints: Hints::NONE,
            depth: 0,
            stats: TraversalStats::default(),
            trace: EntryTrace::default(),
        }
    }

    /// Writes `value` at a site whose static type is `T`.
    ///
    /// This is closed dispatch: no registry is consulted. When `T` is closed
    /// and [`PickleConfig::elide_closed_tags`] is set, the tag is elided.
    #[inline]
    pub fn write<T: Pickle + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.hints.elided = T::CLOSED && self.config.elide_closed_tags;
        super::nested(|| value.pickle(self))
    }

    /// Writes `value` whose type was found by runtime dispatch.
    ///
    /// The tag is always written, the reader cannot know it statically.
    #[inline]
    pub fn write_dispatched<T: Pickle + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.hints.elided = false;
        super::nested(|| value.pickle(self))
    }

    /// Opens an entry, consuming the pending hints.
    pub fn begin_entry(&mut self, tag: &TypeTag) -> Result<()> {
        if let Some(limit) = self.config.max_depth
            && self.depth >= limit
        {
            return Err(PickleError::DepthLimitExceeded { limit });
        }

        let mut hints = mem::take(&mut self.hints);
        if !self.config.size_hints {
            hints.size = None;
        }
        self.builder.begin_entry(tag, &hints)?;

        self.depth += 1;
        self.stats.entries += 1;
        self.trace.enter_entry(tag);
        Ok(())
    }

    /// Opens an entry tagged with the type path of `T`.
    #[inline]
    pub fn begin_entry_of<T: Pickle + ?Sized>(&mut self) -> Result<()> {
        self.begin_entry(&TypeTag::of::<T>())
    }

    pub fn end_entry(&mut self) -> Result<()> {
        self.builder.end_entry()?;
        self.depth -= 1;
        self.trace.exit_entry();
        Ok(())
    }

    /// Writes a named field holding `value`.
    #[inline]
    pub fn put_field<T: Pickle + ?Sized>(&mut self, name: &str, value: &T) -> Result<()> {
        self.put_field_with(name, |w| w.write(value))
    }

    /// Writes a named field whose entry is produced by `f`.
    ///
    /// `f` must write exactly one entry.
    pub fn put_field_with(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        self.builder.begin_field(name)?;
        self.trace.enter_field(name);
        f(self)
    }

    /// Writes the payload of the current leaf entry.
    #[inline]
    pub fn put_primitive<'p>(&mut self, value: impl Into<Primitive<'p>>) -> Result<()> {
        self.builder.put_primitive(value.into())
    }

    /// Writes a complete leaf entry.
    pub fn put_leaf<'p>(&mut self, tag: &TypeTag, value: impl Into<Primitive<'p>>) -> Result<()> {
        self.begin_entry(tag)?;
        self.put_primitive(value)?;
        self.end_entry()
    }

    /// Writes an absent value.
    pub fn put_null(&mut self) -> Result<()> {
        self.hints = Hints::NONE;
        self.begin_entry(&TypeTag::NULL)?;
        self.end_entry()
    }

    /// Writes a back reference to the object registered under `id`.
    pub fn put_ref(&mut self, id: u32) -> Result<()> {
        self.hints = Hints::NONE;
        self.begin_entry(&TypeTag::REF)?;
        self.put_primitive(id)?;
        self.end_entry()?;
        self.stats.back_refs += 1;
        Ok(())
    }

    /// Writes a shared object through the identity registry.
    ///
    /// The object is identified by `addr` and `type_id` (the type of the
    /// shared pointer). On first sight it gets the next object id and `f`
    /// writes it in full, later visits write a back reference instead.
    pub fn write_shared(
        &mut self,
        addr: *const (),
        type_id: TypeId,
        f: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        match self.refs.visit(addr, type_id) {
            Visit::Seen(id) => self.put_ref(id),
            Visit::Fresh(id) => {
                self.stats.shared_objects += 1;
                self.hints.object_id = Some(id);
                f(self)
            }
        }
    }

    /// Hints the element count of the next entry.
    #[inline]
    pub fn hint_size(&mut self, size: usize) {
        self.hints.size = Some(size);
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

    #[inline]
    pub(crate) fn trace(&self) -> &EntryTrace {
        &self.trace
    }
}
