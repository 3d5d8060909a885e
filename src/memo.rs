//! Memoizing call cache keyed by argument tuples.
//!
//! [`MemoCache`] remembers the result of an expensive computation per
//! argument key. The cache lives alongside the function it memoizes and can
//! be inspected and cleared. Backed by a `DashMap` so concurrent callers
//! share hits without an outer lock.

use std::hash::Hash;

use dashmap::DashMap;

/// Concurrent map-based memoization cache.
pub struct MemoCache<K, V> {
    entries: DashMap<K, V>,
}

impl<K: Eq + Hash + Clone, V: Clone> MemoCache<K, V> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    ///
    /// The computation runs without holding any shard lock, so it may
    /// re-enter the cache (recursive memoized functions). If two callers
    /// race on the same key, the first stored value wins.
    pub fn get_or_compute(&self, key: K, compute: impl FnOnce(&K) -> V) -> V {
        if let Some(hit) = self.entries.get(&key) {
            return hit.value().clone();
        }
        let value = compute(&key);
        self.entries.entry(key).or_insert(value).value().clone()
    }

    /// Look up a cached value without computing.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|r| r.value().clone())
    }

    /// Whether `key` has a cached value.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all cached entries.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for MemoCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V> std::fmt::Debug for MemoCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fibonacci(n: u64, cache: &MemoCache<u64, u64>) -> u64 {
        cache.get_or_compute(n, |&n| {
            if n < 2 {
                n
            } else {
                fibonacci(n - 1, cache) + fibonacci(n - 2, cache)
            }
        })
    }

    #[test]
    fn recursive_memoization() {
        let cache = MemoCache::new();
        assert!(cache.is_empty());

        assert_eq!(fibonacci(3, &cache), 2);
        // 0, 1, 2, 3 are all cached after one top-level call.
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.get(&2), Some(1));

        assert_eq!(fibonacci(10, &cache), 55);
        assert_eq!(cache.len(), 11);
    }

    #[test]
    fn repeated_calls_hit_the_cache() {
        let calls = AtomicUsize::new(0);
        let cache: MemoCache<(i64, i64), i64> = MemoCache::new();

        let sum = |a: i64, b: i64| {
            cache.get_or_compute((a, b), |&(a, b)| {
                calls.fetch_add(1, Ordering::SeqCst);
                a + b
            })
        };

        assert_eq!(sum(1, 2), 3);
        assert_eq!(sum(1, 2), 3);
        assert_eq!(sum(5, 6), 11);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = MemoCache::new();
        cache.get_or_compute(1u32, |_| "one".to_string());
        assert!(cache.contains(&1));

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&1), None);
    }
}
