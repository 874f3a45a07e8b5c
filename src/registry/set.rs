//! Enumerable set
//!
//! Vector of members plus a reverse index. Insertion appends, removal swaps
//! the last member into the hole, so both are O(1). Enumeration order is
//! insertion order until the first removal, after which it is whatever the
//! swaps left behind.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct EnumerableSet<T> {
    items: Vec<T>,
    index: HashMap<T, usize>,
}

impl<T: Clone + Eq + Hash> EnumerableSet<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Returns false if already present
    pub fn insert(&mut self, item: T) -> bool {
        if self.index.contains_key(&item) {
            return false;
        }
        self.index.insert(item.clone(), self.items.len());
        self.items.push(item);
        true
    }

    /// Returns false if absent
    pub fn remove(&mut self, item: &T) -> bool {
        let Some(position) = self.index.remove(item) else {
            return false;
        };
        self.items.swap_remove(position);
        if let Some(moved) = self.items.get(position) {
            self.index.insert(moved.clone(), position);
        }
        true
    }

    #[cfg(test)]
    pub fn contains(&self, item: &T) -> bool {
        self.index.contains_key(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Contiguous window `[offset, offset + limit)`, clipped to the set
    pub fn window(&self, offset: usize, limit: usize) -> &[T] {
        let start = offset.min(self.items.len());
        let end = start.saturating_add(limit).min(self.items.len());
        &self.items[start..end]
    }
}

impl<T: Clone + Eq + Hash> Default for EnumerableSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
