use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;

use crate::error::{PickleError, Result};

enum Slot {
    /// Registered before its fields were read, not shareable yet.
    Reserved,
    Filled(Box<dyn Any>),
}

/// Identity registry of one decode traversal.
///
/// Ids are handed out by [`reserve`](Self::reserve) in the order shared
/// entries begin, mirroring the numbering of the encoder.
#[derive(Default)]
pub struct DecodeRefs {
    slots: Vec<Slot>,
}

impl DecodeRefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a placeholder for the next object and returns its id.
    pub fn reserve(&mut self) -> u32 {
        let id = self.slots.len() as u32;
        self.slots.push(Slot::Reserved);
        id
    }

    /// Makes the object with `id` visible to later back references.
    pub fn fill(&mut self, id: u32, value: Box<dyn Any>) -> Result<()> {
        match self.slots.get_mut(id as usize) {
            Some(slot) => {
                *slot = Slot::Filled(value);
                Ok(())
            }
            None => Err(PickleError::DanglingReference { id }),
        }
    }

    /// Returns the object registered under `id`.
    pub fn get(&self, id: u32) -> Result<&dyn Any> {
        match self.slots.get(id as usize) {
            Some(Slot::Filled(value)) => Ok(value.as_ref()),
            Some(Slot::Reserved) => Err(PickleError::UnfinishedReference { id }),
            None => Err(PickleError::DanglingReference { id }),
        }
    }

    /// Number of reserved ids.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }
}
