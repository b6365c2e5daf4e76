//! In-memory caches: the process-wide composition store and a small generic
//! bounded LRU.

use crate::model::Composition;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, OnceLock, Weak};

/// Retention tier for a cached composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Kept alive until explicitly removed or cleared.
    Strong,
    /// Dropped as soon as no caller holds an `Arc` to it; a dead entry
    /// behaves as a miss.
    Weak,
}

/// Keyed store for parsed compositions. Two key spaces: free-form strings
/// and raw resource ids (mapped through [`CompositionCache::raw_key`]).
///
/// Not an LRU: there is no eviction beyond the weak tier collapsing when the
/// last external reference drops. The cache never owns the only source of
/// truth and never mutates a cached composition.
pub struct CompositionCache {
    inner: Mutex<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    strong: HashMap<String, Arc<Composition>>,
    weak: HashMap<String, Weak<Composition>>,
}

impl CompositionCache {
    pub fn new() -> Self {
        CompositionCache {
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Process-wide instance used by the crate-level cached loaders.
    pub fn global() -> &'static CompositionCache {
        static GLOBAL: OnceLock<CompositionCache> = OnceLock::new();
        GLOBAL.get_or_init(CompositionCache::new)
    }

    /// Key for the raw-resource key space.
    pub fn raw_key(resource_id: u32) -> String {
        format!("rawRes_{resource_id}")
    }

    /// Strong tier first, then the weak tier. A collected weak entry is
    /// removed on the way out and reported as a miss.
    pub fn get(&self, key: &str) -> Option<Arc<Composition>> {
        let Ok(mut inner) = self.inner.lock() else {
            return None;
        };
        if let Some(found) = inner.strong.get(key) {
            return Some(found.clone());
        }
        match inner.weak.get(key).and_then(Weak::upgrade) {
            Some(found) => Some(found),
            None => {
                inner.weak.remove(key);
                None
            }
        }
    }

    pub fn put(&self, key: impl Into<String>, composition: &Arc<Composition>, retention: Retention) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        let key = key.into();
        match retention {
            Retention::Strong => {
                inner.weak.remove(&key);
                inner.strong.insert(key, composition.clone());
            }
            Retention::Weak => {
                inner.strong.remove(&key);
                inner.weak.insert(key, Arc::downgrade(composition));
            }
        }
    }

    pub fn remove(&self, key: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.strong.remove(key);
            inner.weak.remove(key);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.strong.clear();
            inner.weak.clear();
        }
    }
}

impl Default for CompositionCache {
    fn default() -> Self {
        CompositionCache::new()
    }
}

const NIL: usize = usize::MAX;

struct LruEntry<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

/// Capacity-bounded cache with O(1) get/put: a hash map into a slab of
/// entries threaded on an index-based doubly-linked recency list. Putting
/// into a full cache evicts the least-recently-used entry.
pub struct LruCache<K, V> {
    map: HashMap<K, usize>,
    entries: Vec<LruEntry<K, V>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        LruCache {
            map: HashMap::with_capacity(capacity),
            entries: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Returns the value and marks the entry as most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let idx = *self.map.get(key)?;
        self.detach(idx);
        self.attach_front(idx);
        Some(&self.entries[idx].value)
    }

    /// Inserts or replaces. Returns the previous value for `key`, if any.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&idx) = self.map.get(&key) {
            let old = std::mem::replace(&mut self.entries[idx].value, value);
            self.detach(idx);
            self.attach_front(idx);
            return Some(old);
        }

        if self.map.len() >= self.capacity {
            self.evict_tail();
        }

        let entry = LruEntry {
            key: key.clone(),
            value,
            prev: NIL,
            next: NIL,
        };
        let idx = match self.free.pop() {
            Some(slot) => {
                self.entries[slot] = entry;
                slot
            }
            None => {
                self.entries.push(entry);
                self.entries.len() - 1
            }
        };
        self.map.insert(key, idx);
        self.attach_front(idx);
        None
    }

    fn evict_tail(&mut self) {
        let tail = self.tail;
        if tail == NIL {
            return;
        }
        self.detach(tail);
        self.map.remove(&self.entries[tail].key);
        self.free.push(tail);
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = (self.entries[idx].prev, self.entries[idx].next);
        if prev != NIL {
            self.entries[prev].next = next;
        } else if self.head == idx {
            self.head = next;
        }
        if next != NIL {
            self.entries[next].prev = prev;
        } else if self.tail == idx {
            self.tail = prev;
        }
        self.entries[idx].prev = NIL;
        self.entries[idx].next = NIL;
    }

    fn attach_front(&mut self, idx: usize) {
        self.entries[idx].prev = NIL;
        self.entries[idx].next = self.head;
        if self.head != NIL {
            self.entries[self.head].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lru_evicts_least_recently_used_at_capacity_one() {
        let mut cache = LruCache::new(1);
        cache.put("a", 1);
        cache.put("b", 2);
        assert!(!cache.contains(&"a"));
        assert_eq!(cache.get(&"b"), Some(&2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn lru_get_refreshes_recency() {
        let mut cache = LruCache::new(2);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.get(&"a");
        cache.put("c", 3);
        assert!(cache.contains(&"a"));
        assert!(!cache.contains(&"b"));
        assert!(cache.contains(&"c"));
    }

    #[test]
    fn lru_put_replaces_existing_value() {
        let mut cache = LruCache::new(2);
        assert_eq!(cache.put("a", 1), None);
        assert_eq!(cache.put("a", 5), Some(1));
        assert_eq!(cache.get(&"a"), Some(&5));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn lru_reuses_evicted_slots() {
        let mut cache = LruCache::new(2);
        for i in 0..10 {
            cache.put(i, i);
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.entries.len() <= 3);
    }
}
