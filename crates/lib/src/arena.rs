//! Slot storage with generational indices.
//!
//! Removing a value frees its slot for the next insert. Every slot carries a
//! generation that is bumped on removal, so an [`ArenaIndex`] handed out for
//! an earlier occupant no longer resolves once the slot is reused.

use std::fmt;

use serde::Serialize;

/// Position of a value in an [`Arena`], valid for one occupant of the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ArenaIndex {
    slot: u32,
    generation: u32,
}

impl ArenaIndex {
    fn slot(&self) -> usize {
        self.slot as usize
    }
}

impl fmt::Display for ArenaIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "{}", self.slot)
        } else {
            write!(f, "{}v{}", self.slot, self.generation)
        }
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

#[derive(Debug)]
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    /// Vacant slots, most recently freed last.
    free: Vec<u32>,
    live: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }
}

impl<T> Arena<T> {
    /// The index the next [`insert`](Self::insert) will return.
    pub(crate) fn next_index(&self) -> ArenaIndex {
        match self.free.last() {
            Some(&slot) => ArenaIndex {
                slot,
                generation: self.slots[slot as usize].generation,
            },
            None => ArenaIndex {
                slot: self.slots.len() as u32,
                generation: 0,
            },
        }
    }

    pub(crate) fn insert(&mut self, value: T) -> ArenaIndex {
        let index = self.next_index();
        match self.free.pop() {
            Some(slot) => self.slots[slot as usize].value = Some(value),
            None => self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            }),
        }
        self.live += 1;
        index
    }

    pub(crate) fn remove(&mut self, index: ArenaIndex) -> Option<T> {
        let slot = self
            .slots
            .get_mut(index.slot())
            .filter(|slot| slot.generation == index.generation)?;
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index.slot);
        self.live -= 1;
        Some(value)
    }

    pub(crate) fn get(&self, index: ArenaIndex) -> Option<&T> {
        self.slots
            .get(index.slot())
            .filter(|slot| slot.generation == index.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub(crate) fn get_mut(&mut self, index: ArenaIndex) -> Option<&mut T> {
        self.slots
            .get_mut(index.slot())
            .filter(|slot| slot.generation == index.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }

    /// Allocated slots, live or vacant.
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Live values in slot order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(|slot| slot.value.as_ref())
    }
}
