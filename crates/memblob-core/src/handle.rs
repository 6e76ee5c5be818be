//! Generic slot+generation handle table.
//!
//! Prevents use-after-free through handles: removed entries bump their
//! slot's generation, so stale handles return `None` instead of aliasing
//! whatever reuses the slot. Double-remove is a safe no-op.

use crate::id::Handle;

struct Slot<T> {
    generation: u32,
    data: Option<T>,
}

/// A slot+generation table mapping [`Handle`]s to owned values.
///
/// Reuses slots via a free list. Generation counters increment on removal,
/// making stale handles detectable.
pub struct HandleTable<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    live: usize,
}

impl<T> HandleTable<T> {
    /// Create an empty handle table.
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Insert a value and return its handle.
    pub fn insert(&mut self, value: T) -> Handle {
        self.live += 1;
        if let Some(slot_idx) = self.free_list.pop() {
            let slot = &mut self.slots[slot_idx as usize];
            slot.data = Some(value);
            Handle::from_parts(slot_idx, slot.generation)
        } else {
            let slot_idx = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                data: Some(value),
            });
            Handle::from_parts(slot_idx, 0)
        }
    }

    /// Get a shared reference to the value behind a handle.
    ///
    /// Returns `None` if the handle is stale or was never valid.
    pub fn get(&self, handle: Handle) -> Option<&T> {
        let slot = self.slots.get(handle.slot() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.data.as_ref()
    }

    /// Get a mutable reference to the value behind a handle.
    ///
    /// Returns `None` if the handle is stale or invalid.
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.slot() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.data.as_mut()
    }

    /// Remove the value behind a handle, returning it.
    ///
    /// Increments the generation counter and adds the slot to the free list.
    /// If the generation wraps back to 0 the slot is retired instead, so a
    /// handle from the first epoch can never resolve again.
    /// Returns `None` if the handle is stale (double-remove is safe).
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let slot_idx = handle.slot();
        let slot = self.slots.get_mut(slot_idx as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        let value = slot.data.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        if slot.generation != 0 {
            self.free_list.push(slot_idx);
        }
        self.live -= 1;
        Some(value)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether the table holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterate over live entries with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.data
                .as_ref()
                .map(|v| (Handle::from_parts(idx as u32, slot.generation), v))
        })
    }
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
