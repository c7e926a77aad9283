//! A generic, access-order LRU cache bounded by entry count and/or total
//! cost, shared by [`crate::model_cache::ModelCache`],
//! [`crate::diffusion_cache::DiffusionModelCache`] and
//! [`crate::embedding_cache::TextEmbeddingCache`]. `0` for either bound means
//! that bound is unenforced.

use indexmap::IndexMap;
use std::hash::Hash;

/// A value's declared cost in whatever unit the owning cache measures
/// (bytes, for every cache in this crate).
pub trait Costed {
    fn cost(&self) -> u64;
}

/// A point-in-time snapshot of a cache's occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub count: usize,
    pub total_cost: u64,
}

/// An LRU cache keyed by `K`. Both `get` and `put` mark the key
/// most-recently-used; eviction always removes the least-recently-used entry
/// first, so ties are broken by which was touched longest ago.
pub struct LruCache<K, V> {
    entries: IndexMap<K, V>,
    count_limit: usize,
    cost_limit: u64,
    total_cost: u64,
}

impl<K: Hash + Eq + Clone, V: Costed> LruCache<K, V> {
    pub fn new(count_limit: usize, cost_limit: u64) -> Self {
        Self { entries: IndexMap::new(), count_limit, cost_limit, total_cost: 0 }
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.touch(key);
        self.entries.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts `value` under `key`, evicting least-recently-used entries
    /// until both bounds hold. Returns every evicted `(key, value)` pair in
    /// eviction order, so the caller can release whatever resource each one
    /// held without blocking on it here.
    pub fn put(&mut self, key: K, value: V) -> Vec<(K, V)> {
        let cost = value.cost();
        if let Some(old) = self.entries.shift_remove(&key) {
            self.total_cost = self.total_cost.saturating_sub(old.cost());
        }
        self.entries.insert(key, value);
        self.total_cost += cost;
        self.evict_to_bounds()
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.entries.shift_remove(key);
        if let Some(value) = &removed {
            self.total_cost = self.total_cost.saturating_sub(value.cost());
        }
        removed
    }

    pub fn clear(&mut self) -> Vec<(K, V)> {
        self.total_cost = 0;
        self.entries.drain(..).collect()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats { count: self.entries.len(), total_cost: self.total_cost }
    }

    pub fn ids(&self) -> Vec<K> {
        self.entries.keys().cloned().collect()
    }

    /// Iterates every tracked `(key, value)` pair, oldest-touched first.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    /// Removes `key` from tracking without treating it as a cost-bearing
    /// eviction, for the case where the value itself reports it's already
    /// gone (see `ModelCache::get`'s reap-on-miss behaviour).
    pub fn untrack(&mut self, key: &K) {
        self.remove(key);
    }

    fn touch(&mut self, key: &K) {
        if let Some(index) = self.entries.get_index_of(key) {
            let last = self.entries.len() - 1;
            self.entries.move_index(index, last);
        }
    }

    fn evict_to_bounds(&mut self) -> Vec<(K, V)> {
        let mut evicted = Vec::new();
        while self.over_bounds() {
            match self.entries.shift_remove_index(0) {
                Some((key, value)) => {
                    self.total_cost = self.total_cost.saturating_sub(value.cost());
                    evicted.push((key, value));
                }
                None => break,
            }
        }
        evicted
    }

    fn over_bounds(&self) -> bool {
        (self.count_limit > 0 && self.entries.len() > self.count_limit)
            || (self.cost_limit > 0 && self.total_cost > self.cost_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Entry(u64);
    impl Costed for Entry {
        fn cost(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn evicts_least_recently_used_past_count_limit() {
        let mut cache: LruCache<&str, Entry> = LruCache::new(2, 0);
        cache.put("a", Entry(1));
        cache.put("b", Entry(1));
        let evicted = cache.put("c", Entry(1));
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].0, "a");
        assert_eq!(cache.stats().count, 2);
    }

    #[test]
    fn accessing_a_key_protects_it_from_the_next_eviction() {
        let mut cache: LruCache<&str, Entry> = LruCache::new(2, 0);
        cache.put("a", Entry(1));
        cache.put("b", Entry(1));
        cache.get(&"a");
        let evicted = cache.put("c", Entry(1));
        assert_eq!(evicted[0].0, "b");
        assert!(cache.contains(&"a"));
    }

    #[test]
    fn cost_limit_evicts_even_under_the_count_limit() {
        let mut cache: LruCache<&str, Entry> = LruCache::new(10, 5);
        cache.put("a", Entry(3));
        let evicted = cache.put("b", Entry(4));
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].0, "a");
        assert!(cache.stats().total_cost <= 5);
    }

    #[test]
    fn clear_drops_every_entry_and_resets_cost() {
        let mut cache: LruCache<&str, Entry> = LruCache::new(10, 0);
        cache.put("a", Entry(3));
        cache.clear();
        assert_eq!(cache.stats(), CacheStats { count: 0, total_cost: 0 });
    }
}
