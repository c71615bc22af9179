//! Index-tracked unordered set
//!
//! Elements live in a growable array and a map remembers each element's slot,
//! so membership, lookup by index and removal are all O(1). Removal moves the
//! last element into the freed slot; order of the remaining elements is only
//! insertion order until the first removal.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct IndexedSet<T> {
    items: Vec<T>,
    slots: HashMap<T, usize>,
}

impl<T> Default for IndexedSet<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            slots: HashMap::new(),
        }
    }
}

impl<T: Copy + Eq + Hash> IndexedSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.slots.contains_key(item)
    }

    /// Current slot of `item`
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.slots.get(item).copied()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.items.get(index).copied()
    }

    /// Returns false if the item was already present
    pub fn insert(&mut self, item: T) -> bool {
        if self.slots.contains_key(&item) {
            return false;
        }
        self.slots.insert(item, self.items.len());
        self.items.push(item);
        true
    }

    /// Swap-and-pop removal. Returns false if the item was absent.
    pub fn remove(&mut self, item: &T) -> bool {
        let Some(index) = self.slots.remove(item) else {
            return false;
        };
        let last = self.items.len() - 1;
        if index != last {
            let moved = self.items[last];
            self.items[index] = moved;
            self.slots.insert(moved, index);
        }
        self.items.pop();
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    #[cfg(test)]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}
