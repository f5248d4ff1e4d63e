use core::any::TypeId;

use hashbrown::hash_map::Entry;

use crate::hash::HashMap;

/// Outcome of [`EncodeRefs::visit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// First sight, the object was assigned this id and must be written in full.
    Fresh(u32),
    /// Already written under this id, a back reference must be written instead.
    Seen(u32),
}

/// Identity registry of one encode traversal.
///
/// Objects are keyed by address and the [`TypeId`] of the shared pointer.
/// One allocation seen as `Rc<T>` and as `Rc<dyn Family>` is written twice,
/// since each site resolves its back references to its own pointer type.
/// Ids are allocated in first-sight order, which is the pre-order of the
/// entries in the stream.
#[derive(Debug, Default)]
pub struct EncodeRefs {
    ids: HashMap<(usize, TypeId), u32>,
}

impl EncodeRefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the object at `addr`, allocating the next id on first sight.
    pub fn visit(&mut self, addr: *const (), type_id: TypeId) -> Visit {
        let next = self.ids.len() as u32;
        match self.ids.entry((addr.addr(), type_id)) {
            Entry::Occupied(entry) => Visit::Seen(*entry.get()),
            Entry::Vacant(entry) => {
                entry.insert(next);
                Visit::Fresh(next)
            }
        }
    }

    /// Number of registered objects.
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }
}
