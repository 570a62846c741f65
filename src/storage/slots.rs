//! Slot Store
//!
//! An append-only, index-addressed array of value cells with a FIFO free list.
//!
//! ```text
//!   index:   0        1        2        3        4
//!          ┌────────┬────────┬────────┬────────┬────────┐
//!   slots: │ (a, 1) │  free  │ (c, 3) │  free  │ (e, 5) │
//!          └────────┴────────┴────────┴────────┴────────┘
//!   free:  [1, 3]   (oldest freed index first)
//! ```
//!
//! Slots are never physically removed. Deleting an entry clears its cell and
//! queues the index for reuse, so a bounded working set under insert/delete
//! churn never grows the array past its high-water mark.
//!
//! The store has no locking of its own: the owning map serializes every
//! mutation together with the partition table.

use crate::key::CanonicalKey;
use std::collections::VecDeque;
use tracing::trace;

/// A live cell: the canonical key plus the value it owns.
#[derive(Debug, Clone)]
pub struct Slot<V> {
    pub key: CanonicalKey,
    pub value: V,
}

/// Index-addressed value storage with O(1) slot reuse.
#[derive(Debug)]
pub struct SlotStore<V> {
    /// `None` marks a cleared cell whose index sits in `free`
    slots: Vec<Option<Slot<V>>>,
    /// Reusable indices, popped from the front
    free: VecDeque<usize>,
}

impl<V> SlotStore<V> {
    /// Creates a store with room for `capacity` slots before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: VecDeque::new(),
        }
    }

    /// Stores an entry and returns its index.
    ///
    /// Reuses the oldest freed index if there is one, otherwise appends.
    pub fn allocate(&mut self, key: CanonicalKey, value: V) -> usize {
        let slot = Some(Slot { key, value });

        if let Some(index) = self.free.pop_front() {
            debug_assert!(self.slots[index].is_none(), "free index {} is live", index);
            self.slots[index] = slot;
            trace!(index, "Reused free slot");
            return index;
        }

        self.slots.push(slot);
        let index = self.slots.len() - 1;
        trace!(index, "Appended slot");
        index
    }

    /// Returns the entry at a live index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Slot<V>> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Replaces the value at a live index in place, returning the old value.
    ///
    /// Returns `None` (and stores nothing) if the index is not live.
    pub fn overwrite(&mut self, index: usize, value: V) -> Option<V> {
        self.slots
            .get_mut(index)
            .and_then(Option::as_mut)
            .map(|slot| std::mem::replace(&mut slot.value, value))
    }

    /// Replaces both key and value at a live index, returning the old entry.
    ///
    /// Used when a different key with the same partition key takes the slot.
    pub fn replace(&mut self, index: usize, key: CanonicalKey, value: V) -> Option<Slot<V>> {
        let cell = self.slots.get_mut(index)?;
        if cell.is_none() {
            return None;
        }
        cell.replace(Slot { key, value })
    }

    /// Empties a live slot and queues its index for reuse.
    ///
    /// The caller must already have dropped every index mapping that points
    /// here. Clearing an index that is already free is a no-op.
    pub fn clear(&mut self, index: usize) -> Option<Slot<V>> {
        let slot = self.slots.get_mut(index)?.take()?;
        self.free.push_back(index);
        trace!(index, "Cleared slot");
        Some(slot)
    }

    /// Number of live slots.
    #[inline]
    pub fn count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Total slots ever allocated (the high-water mark).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of cleared slots waiting for reuse.
    #[inline]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Iterates live slots in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Slot<V>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, cell)| cell.as_ref().map(|slot| (index, slot)))
    }

    /// Drops every slot and forgets the free list.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}
