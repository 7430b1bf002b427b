//! Id-keyed entity storage

use std::collections::BTreeMap;

/// Collection of one entity kind with its own monotonic id counter.
/// Ids start at 0 and are never handed out twice.
#[derive(Debug, Clone)]
pub struct Registry<T> {
    entries: BTreeMap<u64, T>,
    next_id: u64,
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Insert an entity built from its freshly assigned id
    pub fn insert_with(&mut self, build: impl FnOnce(u64) -> T) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, build(id));
        id
    }

    pub fn get(&self, id: u64) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.entries.contains_key(&id)
    }

    /// Remove an entity. Removing an absent id is a no-op.
    pub fn remove(&mut self, id: u64) -> Option<T> {
        self.entries.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &T)> {
        self.entries.iter().map(|(id, entity)| (*id, entity))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    /// Snapshot of the current ids, safe to hold while mutating entries
    pub fn ids(&self) -> Vec<u64> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_zero_and_are_never_reused() {
        let mut registry = Registry::new();
        let a = registry.insert_with(|id| format!("a{id}"));
        let b = registry.insert_with(|id| format!("b{id}"));
        assert_eq!((a, b), (0, 1));

        registry.remove(b);
        let c = registry.insert_with(|id| format!("c{id}"));
        assert_eq!(c, 2);
        assert_eq!(registry.get(c).map(String::as_str), Some("c2"));
    }

    #[test]
    fn removing_twice_is_a_no_op() {
        let mut registry = Registry::new();
        let id = registry.insert_with(|_| 7u32);
        assert_eq!(registry.remove(id), Some(7));
        assert_eq!(registry.remove(id), None);
        assert!(registry.is_empty());
        assert_eq!(registry.remove(99), None);
    }

    #[test]
    fn counters_are_independent_per_registry() {
        let mut left: Registry<()> = Registry::new();
        let mut right: Registry<()> = Registry::new();
        left.insert_with(|_| ());
        left.insert_with(|_| ());
        assert_eq!(right.insert_with(|_| ()), 0);
    }

    #[test]
    fn membership_survives_removals() {
        let mut registry = Registry::new();
        let ids: Vec<u64> = (0..5).map(|n| registry.insert_with(|_| n)).collect();
        registry.remove(ids[1]);
        registry.remove(ids[3]);

        let mut remaining = registry.ids();
        remaining.sort_unstable();
        assert_eq!(remaining, vec![0, 2, 4]);
        assert_eq!(registry.len(), 3);
        assert!(!registry.contains(ids[1]));
    }
}
