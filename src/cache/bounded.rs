//! Fixed-capacity slot cache with age-based eviction.
//!
//! The cache owns `capacity` slots allocated once at construction. Every
//! touch (a hit through [`BoundedCache::get`], a [`BoundedCache::set`], or an
//! [`BoundedCache::add`]) resets the touched slot's age to zero and ages every
//! other occupied slot by one. When a fresh key arrives and no slot is free,
//! the occupied slot with the highest age is evicted, lowest index first on
//! ties, so eviction is fully deterministic.
//!
//! This type is not synchronized. Shared use goes through
//! [`TypedCache`](super::TypedCache), which wraps it in a mutex.

use std::num::NonZeroUsize;

use super::CacheError;

/// One storage cell.
#[derive(Debug, Clone)]
pub struct Slot<K, V> {
    entry: Option<(K, V)>,
    age: u64,
}

impl<K, V> Slot<K, V> {
    fn empty() -> Self {
        Self { entry: None, age: 0 }
    }

    /// Whether the slot currently holds a key/value pair.
    pub fn is_occupied(&self) -> bool {
        self.entry.is_some()
    }

    /// Current age of the slot. Zero for free slots.
    pub fn age(&self) -> u64 {
        self.age
    }

    fn key(&self) -> Option<&K> {
        self.entry.as_ref().map(|(k, _)| k)
    }
}

/// Key-indexed cache holding at most `capacity` entries.
#[derive(Debug, Clone)]
pub struct BoundedCache<K, V> {
    slots: Vec<Slot<K, V>>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq,
    V: Clone,
{
    /// Allocate a cache with `capacity` slots.
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        NonZeroUsize::new(capacity)
            .map(Self::with_slots)
            .ok_or(CacheError::ZeroCapacity)
    }

    /// Allocate a cache with a capacity known to be non-zero.
    pub fn with_slots(capacity: NonZeroUsize) -> Self {
        let slots = (0..capacity.get()).map(|_| Slot::empty()).collect();
        Self { slots }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_occupied()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| !s.is_occupied())
    }

    /// Whether `key` is cached. Does not touch ages.
    pub fn contains(&self, key: &K) -> bool {
        self.position(key).is_some()
    }

    /// Return the value for `key` and mark it most recently used.
    pub fn get(&mut self, key: &K) -> Result<V, CacheError> {
        let index = self.position(key).ok_or(CacheError::KeyNotFound)?;
        self.touch(index);
        match &self.slots[index].entry {
            Some((_, value)) => Ok(value.clone()),
            None => Err(CacheError::KeyNotFound),
        }
    }

    /// Replace the value of an existing key.
    pub fn set(&mut self, key: K, value: V) -> Result<(), CacheError> {
        let index = self.position(&key).ok_or(CacheError::KeyNotFound)?;
        self.slots[index].entry = Some((key, value));
        self.touch(index);
        Ok(())
    }

    /// Insert or overwrite `key`.
    ///
    /// Returns the key/value pair evicted to make room, if any.
    pub fn add(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(index) = self.position(&key) {
            self.slots[index].entry = Some((key, value));
            self.touch(index);
            return None;
        }

        let (index, evicted) = match self.slots.iter().position(|s| !s.is_occupied()) {
            Some(free) => (free, None),
            None => {
                let victim = self.victim();
                (victim, self.slots[victim].entry.take())
            }
        };

        self.slots[index].entry = Some((key, value));
        self.touch(index);
        evicted
    }

    /// Drop `key` from the cache. Other slots keep their ages.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let index = self.position(key)?;
        let slot = &mut self.slots[index];
        slot.age = 0;
        slot.entry.take().map(|(_, v)| v)
    }

    /// Snapshot of every cached value, in slot order.
    pub fn values(&self) -> Vec<V> {
        self.slots
            .iter()
            .filter_map(|s| s.entry.as_ref().map(|(_, v)| v.clone()))
            .collect()
    }

    /// Clear every slot and zero all ages.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::empty();
        }
    }

    /// Read-only view of the slot array.
    pub fn slots(&self) -> &[Slot<K, V>] {
        &self.slots
    }

    fn position(&self, key: &K) -> Option<usize> {
        self.slots.iter().position(|s| s.key() == Some(key))
    }

    fn touch(&mut self, index: usize) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if i == index {
                slot.age = 0;
            } else if slot.is_occupied() {
                slot.age = slot.age.saturating_add(1);
            }
        }
    }

    // Only called when every slot is occupied.
    fn victim(&self) -> usize {
        let mut victim = 0;
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.age > self.slots[victim].age {
                victim = i;
            }
        }
        victim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cache(capacity: usize) -> BoundedCache<u32, &'static str> {
        BoundedCache::new(capacity).unwrap()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = BoundedCache::<u32, u32>::new(0);
        assert!(matches!(result, Err(CacheError::ZeroCapacity)));
    }

    #[test]
    fn test_touched_key_survives_eviction() {
        let mut c = cache(2);
        c.add(1, "A");
        c.add(2, "B");
        assert_eq!(c.get(&1).unwrap(), "A");
        assert_eq!(c.slots()[0].age(), 0);
        assert_eq!(c.slots()[1].age(), 1);

        let evicted = c.add(3, "C");
        assert_eq!(evicted, Some((2, "B")));
        assert!(c.contains(&1));
        assert!(!c.contains(&2));
        assert!(c.contains(&3));
    }

    #[test]
    fn test_untouched_inserts_evict_first_inserted() {
        let mut c = cache(3);
        for k in 1..=3 {
            c.add(k, "v");
        }
        c.add(4, "v");
        assert!(!c.contains(&1));
        for k in 2..=4 {
            assert!(c.contains(&k));
        }
        assert_eq!(c.len(), 3);
    }

    #[test]
    fn test_eviction_follows_touch_order() {
        let mut c = cache(3);
        c.add(1, "A");
        c.add(2, "B");
        c.add(3, "C");
        c.get(&1).unwrap();
        c.set(2, "B2").unwrap();

        // 3 is now the least recently touched.
        assert_eq!(c.add(4, "D"), Some((3, "C")));
        // Then 1, since 2 and 4 were touched after it.
        assert_eq!(c.add(5, "E"), Some((1, "A")));
        assert!(c.contains(&2));
        assert!(c.contains(&4));
    }

    #[test]
    fn test_victim_prefers_lowest_index_on_tie() {
        let mut c = cache(3);
        c.add(1, "A");
        c.add(2, "B");
        c.add(3, "C");
        for slot in &mut c.slots {
            slot.age = u64::MAX;
        }
        assert_eq!(c.add(4, "D"), Some((1, "A")));
    }

    #[test]
    fn test_get_missing_key() {
        let mut c = cache(2);
        assert!(matches!(c.get(&1), Err(CacheError::KeyNotFound)));
    }

    #[test]
    fn test_set_replaces_without_occupancy_change() {
        let mut c = cache(4);
        c.add(1, "v1");
        c.set(1, "v2").unwrap();
        assert_eq!(c.get(&1).unwrap(), "v2");
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_set_missing_key() {
        let mut c = cache(2);
        assert!(matches!(c.set(5, "x"), Err(CacheError::KeyNotFound)));
        assert!(c.is_empty());
    }

    #[test]
    fn test_add_existing_key_overwrites_in_place() {
        let mut c = cache(2);
        c.add(1, "A");
        c.add(2, "B");
        assert_eq!(c.add(1, "A2"), None);
        assert_eq!(c.len(), 2);
        assert_eq!(c.get(&1).unwrap(), "A2");
        assert!(c.contains(&2));
    }

    #[test]
    fn test_contains_does_not_age() {
        let mut c = cache(3);
        c.add(1, "A");
        c.add(2, "B");
        let before: Vec<u64> = c.slots().iter().map(Slot::age).collect();
        assert!(c.contains(&1));
        assert!(!c.contains(&9));
        let after: Vec<u64> = c.slots().iter().map(Slot::age).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_remove_then_add_is_fresh_insert() {
        let mut c = cache(3);
        c.add(1, "A");
        c.add(2, "B");
        c.add(3, "C");
        assert_eq!(c.remove(&2), Some("B"));
        assert!(!c.contains(&2));
        assert_eq!(c.slots()[0].age(), 2);
        assert_eq!(c.slots()[2].age(), 0);

        assert_eq!(c.add(2, "B2"), None);
        assert_eq!(c.len(), 3);
        assert_eq!(c.get(&2).unwrap(), "B2");
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut c = cache(3);
        c.add(1, "A");
        c.add(2, "B");
        c.reset();
        assert!(c.is_empty());
        assert!(c.slots().iter().all(|s| s.age() == 0));
        assert!(c.values().is_empty());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(u8),
        Get(u8),
        Set(u8),
        Remove(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..16).prop_map(Op::Add),
            (0u8..16).prop_map(Op::Get),
            (0u8..16).prop_map(Op::Set),
            (0u8..16).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn prop_capacity_and_uniqueness(capacity in 1usize..8, ops in prop::collection::vec(op(), 0..200)) {
            let mut c: BoundedCache<u8, u32> = BoundedCache::new(capacity).unwrap();
            for (i, op) in ops.into_iter().enumerate() {
                match op {
                    Op::Add(k) => { c.add(k, i as u32); }
                    Op::Get(k) => { let _ = c.get(&k); }
                    Op::Set(k) => { let _ = c.set(k, i as u32); }
                    Op::Remove(k) => { c.remove(&k); }
                }

                prop_assert!(c.len() <= capacity);
                let mut keys: Vec<u8> = c.slots().iter().filter_map(|s| s.key().copied()).collect();
                let total = keys.len();
                keys.sort_unstable();
                keys.dedup();
                prop_assert_eq!(keys.len(), total);
                prop_assert!(c.slots().iter().all(|s| s.is_occupied() || s.age() == 0));
            }
        }

        #[test]
        fn prop_hit_after_insert(capacity in 1usize..8, k in 0u8..16, v in any::<u32>()) {
            let mut c: BoundedCache<u8, u32> = BoundedCache::new(capacity).unwrap();
            c.add(k, v);
            prop_assert!(c.contains(&k));
            prop_assert_eq!(c.get(&k).unwrap(), v);
        }
    }
}
