//! Order-preserving keyed collection.
//!
//! Items live in a `Vec` (iteration follows insertion order) with a side
//! index from key to position for O(1) lookup. Removing an item shifts the
//! items behind it and reindexes them, so iteration order is never
//! disturbed.

use std::collections::HashMap;

/// Anything stored in a [`Registry`] exposes a stable integer key.
pub trait Keyed {
    fn key(&self) -> u32;
}

#[derive(Debug, Clone)]
pub struct Registry<T> {
    items: Vec<T>,
    index: HashMap<u32, usize>,
}

impl<T: Keyed> Registry<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Appends an item. An item with an existing key replaces the old one
    /// in place.
    pub fn push(&mut self, item: T) {
        let key = item.key();
        match self.index.get(&key) {
            Some(&position) => self.items[position] = item,
            None => {
                self.index.insert(key, self.items.len());
                self.items.push(item);
            }
        }
    }

    pub fn lookup(&self, key: u32) -> Option<&T> {
        self.index.get(&key).map(|&position| &self.items[position])
    }

    pub fn lookup_mut(&mut self, key: u32) -> Option<&mut T> {
        match self.index.get(&key) {
            Some(&position) => Some(&mut self.items[position]),
            None => None,
        }
    }

    pub fn contains(&self, key: u32) -> bool {
        self.index.contains_key(&key)
    }

    pub fn remove(&mut self, key: u32) -> Option<T> {
        let position = self.index.remove(&key)?;
        let item = self.items.remove(position);
        self.reindex_from(position);
        Some(item)
    }

    /// Removes every item matching `predicate`, scanning back to front.
    /// Returned items are in registry order.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> Vec<T>
    where
        F: FnMut(&T) -> bool,
    {
        let mut removed = Vec::new();
        let mut lowest = None;
        for position in (0..self.items.len()).rev() {
            if predicate(&self.items[position]) {
                let item = self.items.remove(position);
                self.index.remove(&item.key());
                removed.push(item);
                lowest = Some(position);
            }
        }
        if let Some(position) = lowest {
            self.reindex_from(position);
        }
        removed.reverse();
        removed
    }

    fn reindex_from(&mut self, start: usize) {
        for (position, item) in self.items.iter().enumerate().skip(start) {
            self.index.insert(item.key(), position);
        }
    }

    pub fn get_index(&self, position: usize) -> Option<&T> {
        self.items.get(position)
    }

    pub fn get_index_mut(&mut self, position: usize) -> Option<&mut T> {
        self.items.get_mut(position)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn keys(&self) -> Vec<u32> {
        self.items.iter().map(Keyed::key).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }
}

impl<T: Keyed> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T: Keyed> IntoIterator for &'a Registry<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: u32,
        label: &'static str,
    }

    impl Keyed for Item {
        fn key(&self) -> u32 {
            self.id
        }
    }

    fn item(id: u32, label: &'static str) -> Item {
        Item { id, label }
    }

    #[test]
    fn test_insertion_order_and_lookup() {
        let mut registry = Registry::new();
        registry.push(item(5, "a"));
        registry.push(item(2, "b"));
        registry.push(item(9, "c"));

        assert_eq!(registry.keys(), vec![5, 2, 9]);
        assert_eq!(registry.lookup(2).map(|i| i.label), Some("b"));
        assert!(registry.lookup(3).is_none());
    }

    #[test]
    fn test_remove_keeps_order_and_index() {
        let mut registry = Registry::new();
        for id in 1..=5 {
            registry.push(item(id, "x"));
        }

        assert_eq!(registry.remove(2).map(|i| i.id), Some(2));
        assert_eq!(registry.keys(), vec![1, 3, 4, 5]);
        assert_eq!(registry.lookup(5).map(|i| i.id), Some(5));
        assert!(registry.remove(2).is_none());
    }

    #[test]
    fn test_remove_where() {
        let mut registry = Registry::new();
        for id in 1..=6 {
            registry.push(item(id, if id % 2 == 0 { "even" } else { "odd" }));
        }

        let removed = registry.remove_where(|i| i.label == "even");
        assert_eq!(removed.iter().map(|i| i.id).collect::<Vec<_>>(), vec![2, 4, 6]);
        assert_eq!(registry.keys(), vec![1, 3, 5]);
        for id in [1, 3, 5] {
            assert_eq!(registry.lookup(id).map(|i| i.id), Some(id));
        }
    }

    #[test]
    fn test_push_existing_key_replaces() {
        let mut registry = Registry::new();
        registry.push(item(1, "old"));
        registry.push(item(2, "other"));
        registry.push(item(1, "new"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get_index(0).map(|i| i.label), Some("new"));
    }
}
