//! Bounded store of completed prefetch results.
//!
//! Entries are grouped by template namespace. Each namespace holds at most
//! `capacity` entries and evicts in insertion order (a bounded FIFO queue;
//! reads do not refresh an entry). A successful [`PrefetchCache::get`]
//! removes the entry: every prefetched artifact is redeemable exactly once,
//! so a row claimed by the list can never be handed out again stale.

use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::collections::map::HashMap;
use crate::config::DEFAULT_CACHE_CAPACITY;
use crate::key::TemplateKey;

/// Hit/miss/eviction counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct CacheEntry<V> {
    namespace: TemplateKey,
    artifact: V,
    insertion_order: u64,
}

struct CacheInner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// Per-namespace keys, oldest first.
    namespaces: HashMap<TemplateKey, VecDeque<(u64, K)>>,
    next_order: u64,
    stats: CacheStats,
}

impl<K: Eq + Hash + Clone, V> CacheInner<K, V> {
    fn unlink(&mut self, key: &K, namespace: &TemplateKey) {
        if let Some(queue) = self.namespaces.get_mut(namespace) {
            if let Some(pos) = queue.iter().position(|(_, k)| k == key) {
                queue.remove(pos);
            }
            if queue.is_empty() {
                self.namespaces.remove(namespace);
            }
        }
    }
}

/// One-shot prefetch result cache.
///
/// `K` identifies an artifact (typically the item position), `V` is the
/// artifact itself. The cache is internally synchronized so tasks running on
/// another thread may fill it while the list redeems entries.
pub struct PrefetchCache<K, V> {
    capacity: usize,
    inner: Mutex<CacheInner<K, V>>,
}

impl<K: Eq + Hash + Clone, V> Default for PrefetchCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl<K: Eq + Hash + Clone, V> PrefetchCache<K, V> {
    /// Creates a cache holding up to `capacity` entries per namespace.
    ///
    /// A zero capacity is clamped to [`DEFAULT_CACHE_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            log::warn!("prefetch cache capacity 0 is invalid; using {DEFAULT_CACHE_CAPACITY}");
            DEFAULT_CACHE_CAPACITY
        } else {
            capacity
        };
        Self {
            capacity,
            inner: Mutex::new(CacheInner {
                entries: HashMap::default(),
                namespaces: HashMap::default(),
                next_order: 0,
                stats: CacheStats::default(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stores `artifact` under `key` in `namespace`.
    ///
    /// Re-caching an existing key replaces its artifact and moves it to the
    /// back of its namespace. If the namespace is full, its earliest entry is
    /// evicted; other namespaces are never touched.
    pub fn cache(&self, namespace: TemplateKey, key: K, artifact: V) {
        let mut inner = self.lock();

        if let Some(previous) = inner.entries.remove(&key) {
            inner.unlink(&key, &previous.namespace);
        }

        let capacity = self.capacity;
        let mut evicted = Vec::new();
        if let Some(queue) = inner.namespaces.get_mut(&namespace) {
            while queue.len() >= capacity {
                match queue.pop_front() {
                    Some((_, oldest)) => evicted.push(oldest),
                    None => break,
                }
            }
        }
        for oldest in evicted {
            inner.entries.remove(&oldest);
            inner.stats.evictions += 1;
            log::trace!("prefetch cache evicted oldest entry of namespace `{namespace}`");
        }

        let order = inner.next_order;
        inner.next_order += 1;
        inner
            .namespaces
            .entry(namespace.clone())
            .or_default()
            .push_back((order, key.clone()));
        inner.entries.insert(
            key,
            CacheEntry {
                namespace,
                artifact,
                insertion_order: order,
            },
        );
    }

    /// Removes and returns the artifact for `key`.
    ///
    /// `None` is a regular cache miss: the caller is expected to compute the
    /// artifact synchronously. A second `get` for the same key always misses.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.lock();
        match inner.entries.remove(key) {
            Some(entry) => {
                inner.unlink(key, &entry.namespace);
                inner.stats.hits += 1;
                Some(entry.artifact)
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    /// Non-consuming existence check.
    pub fn has_cached(&self, key: &K) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Insertion sequence number of `key`, if cached.
    pub fn insertion_order(&self, key: &K) -> Option<u64> {
        self.lock().entries.get(key).map(|entry| entry.insertion_order)
    }

    /// Drops every entry of `namespace`.
    pub fn clear_namespace(&self, namespace: &TemplateKey) {
        let mut inner = self.lock();
        if let Some(queue) = inner.namespaces.remove(namespace) {
            for (_, key) in queue {
                inner.entries.remove(&key);
            }
        }
    }

    /// Drops the entire cache. Statistics are kept.
    pub fn clear_all(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.namespaces.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn namespace_len(&self, namespace: &TemplateKey) -> usize {
        self.lock()
            .namespaces
            .get(namespace)
            .map(VecDeque::len)
            .unwrap_or(0)
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> std::fmt::Debug for PrefetchCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("PrefetchCache")
            .field("capacity", &self.capacity)
            .field("entry_count", &inner.entries.len())
            .field("namespace_count", &inner.namespaces.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns(name: &str) -> TemplateKey {
        TemplateKey::from(name)
    }

    #[test]
    fn get_is_one_shot() {
        let cache = PrefetchCache::new(4);
        cache.cache(ns("row"), 7usize, "layout-7");
        assert!(cache.has_cached(&7));
        assert_eq!(cache.get(&7), Some("layout-7"));
        assert_eq!(cache.get(&7), None);
        assert!(!cache.has_cached(&7));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                evictions: 0
            }
        );
    }

    #[test]
    fn has_cached_does_not_consume() {
        let cache = PrefetchCache::new(4);
        cache.cache(ns("row"), 1usize, 10);
        assert!(cache.has_cached(&1));
        assert!(cache.has_cached(&1));
        assert_eq!(cache.get(&1), Some(10));
    }

    #[test]
    fn eviction_is_fifo_within_namespace() {
        let cache = PrefetchCache::new(2);
        cache.cache(ns("row"), 1usize, 'a');
        cache.cache(ns("row"), 2usize, 'b');
        cache.cache(ns("header"), 100usize, 'h');
        cache.cache(ns("row"), 3usize, 'c');

        assert!(!cache.has_cached(&1));
        assert!(cache.has_cached(&2));
        assert!(cache.has_cached(&3));
        assert!(cache.has_cached(&100));
        assert_eq!(cache.namespace_len(&ns("row")), 2);
        assert_eq!(cache.namespace_len(&ns("header")), 1);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn reads_do_not_refresh_eviction_order() {
        let cache = PrefetchCache::new(2);
        cache.cache(ns("row"), 1usize, 'a');
        cache.cache(ns("row"), 2usize, 'b');
        assert!(cache.has_cached(&1));
        cache.cache(ns("row"), 3usize, 'c');
        assert!(!cache.has_cached(&1));
        assert!(cache.has_cached(&2));
    }

    #[test]
    fn consumed_entries_free_namespace_slots() {
        let cache = PrefetchCache::new(2);
        cache.cache(ns("row"), 1usize, 'a');
        cache.cache(ns("row"), 2usize, 'b');
        assert_eq!(cache.get(&1), Some('a'));
        cache.cache(ns("row"), 3usize, 'c');
        assert!(cache.has_cached(&2));
        assert!(cache.has_cached(&3));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn recaching_replaces_and_moves_to_back() {
        let cache = PrefetchCache::new(2);
        cache.cache(ns("row"), 1usize, 'a');
        cache.cache(ns("row"), 2usize, 'b');
        cache.cache(ns("row"), 1usize, 'z');
        cache.cache(ns("row"), 3usize, 'c');

        assert!(!cache.has_cached(&2));
        assert_eq!(cache.get(&1), Some('z'));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn recaching_under_new_namespace_moves_entry() {
        let cache = PrefetchCache::new(2);
        cache.cache(ns("row"), 1usize, 'a');
        cache.cache(ns("card"), 1usize, 'b');
        assert_eq!(cache.namespace_len(&ns("row")), 0);
        assert_eq!(cache.namespace_len(&ns("card")), 1);
    }

    #[test]
    fn clear_namespace_leaves_others() {
        let cache = PrefetchCache::new(4);
        cache.cache(ns("row"), 1usize, 'a');
        cache.cache(ns("header"), 2usize, 'b');
        cache.clear_namespace(&ns("row"));
        assert!(!cache.has_cached(&1));
        assert!(cache.has_cached(&2));

        cache.clear_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn insertion_order_increases() {
        let cache = PrefetchCache::new(4);
        cache.cache(ns("row"), 1usize, 'a');
        cache.cache(ns("header"), 2usize, 'b');
        let first = cache.insertion_order(&1).unwrap();
        let second = cache.insertion_order(&2).unwrap();
        assert!(first < second);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let cache: PrefetchCache<usize, ()> = PrefetchCache::new(0);
        assert_eq!(cache.capacity(), DEFAULT_CACHE_CAPACITY);
    }
}
