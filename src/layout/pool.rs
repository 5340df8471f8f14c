use std::collections::HashMap;

use crate::ir::ItemId;
use crate::sequence::SequenceGenerator;

/// Set of items keyed by id with O(1) removal.
///
/// Iteration order is deterministic for a given sequence of operations, which
/// keeps random draws reproducible.
#[derive(Debug, Clone, Default)]
pub struct ItemPool {
    order: Vec<ItemId>,
    slots: HashMap<ItemId, usize>,
}

impl ItemPool {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn ids(&self) -> &[ItemId] {
        &self.order
    }

    /// Returns `false` if the id was already present.
    pub fn insert(&mut self, id: ItemId) -> bool {
        if self.slots.contains_key(&id) {
            return false;
        }
        self.slots.insert(id, self.order.len());
        self.order.push(id);
        true
    }

    pub fn remove(&mut self, id: ItemId) -> bool {
        let Some(slot) = self.slots.remove(&id) else {
            return false;
        };
        self.order.swap_remove(slot);
        if let Some(moved) = self.order.get(slot) {
            self.slots.insert(*moved, slot);
        }
        true
    }

    pub fn pop_random(&mut self, rng: &mut SequenceGenerator) -> Option<ItemId> {
        if self.order.is_empty() {
            return None;
        }
        let id = self.order[rng.index(self.order.len())];
        self.remove(id);
        Some(id)
    }
}
