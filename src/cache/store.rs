//! Entry Store Module
//!
//! The local (L1) tier: HashMap storage with LRU tracking, TTL expiration and
//! weight-based capacity. Every operation runs under the store's own mutex, so
//! each single call is atomic while a get followed by a put is not.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::cache::{CacheEntry, LruTracker};

#[derive(Debug)]
struct StoreState<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker<String>,
    /// Sum of the weights of all entries
    weight: u64,
}

impl<V> StoreState<V> {
    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(&key.to_string());
        self.weight -= entry.weight;
        Some(entry)
    }
}

// == Entry Store ==
/// Bounded, thread-safe local store.
#[derive(Debug)]
pub struct EntryStore<V> {
    state: Mutex<StoreState<V>>,
    /// Maximum total weight allowed
    capacity: u64,
}

impl<V: Clone> EntryStore<V> {
    // == Constructor ==
    /// Creates a new store holding at most `capacity` weight units.
    pub fn new(capacity: u64) -> Self {
        Self {
            state: Mutex::new(StoreState {
                entries: HashMap::new(),
                lru: LruTracker::new(),
                weight: 0,
            }),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Get ==
    /// Retrieves a live value by key.
    ///
    /// Expired entries are removed and reported as absent. A hit makes the
    /// key the most recently used.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut state = self.lock();

        let expired = state.entries.get(key)?.is_expired();
        if expired {
            state.remove(key);
            debug!(key, "Dropped expired local entry");
            return None;
        }

        state.lru.touch(&key.to_string());
        state.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Put ==
    /// Stores a value with weight one. See [`EntryStore::put_weighted`].
    pub fn put(&self, key: &str, value: V, ttl: Option<Duration>) -> u64 {
        self.put_weighted(key, value, ttl, 1)
    }

    /// Stores a value, replacing any previous entry for the key.
    ///
    /// Least recently used entries are evicted until the new entry fits.
    /// Returns the number of entries evicted. An entry heavier than the whole
    /// capacity is not admitted, and the previous entry for the key is dropped.
    pub fn put_weighted(&self, key: &str, value: V, ttl: Option<Duration>, weight: u64) -> u64 {
        let mut state = self.lock();
        state.remove(key);

        if weight > self.capacity {
            warn!(
                key,
                weight,
                capacity = self.capacity,
                "Entry heavier than local capacity, not cached"
            );
            return 0;
        }

        let mut evicted = 0;
        while state.weight + weight > self.capacity {
            let Some(oldest) = state.lru.evict_oldest() else {
                break;
            };
            if let Some(entry) = state.entries.remove(&oldest) {
                state.weight -= entry.weight;
                evicted += 1;
                debug!(key = %oldest, "Evicted least recently used entry");
            }
        }

        state
            .entries
            .insert(key.to_string(), CacheEntry::weighted(value, ttl, weight));
        state.lru.touch(&key.to_string());
        state.weight += weight;

        evicted
    }

    // == Evict ==
    /// Removes an entry by key. Returns whether an entry was present.
    pub fn evict(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    // == Clear ==
    /// Removes every entry.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.lru.clear();
        state.weight = 0;
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the store.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut state = self.lock();
        let now = Instant::now();

        let expired_keys: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            state.remove(key);
        }

        expired_keys.len()
    }

    /// Returns true if a live entry exists, without touching recency.
    pub fn contains(&self, key: &str) -> bool {
        self.lock()
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    /// Returns the current number of entries in the store.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Total weight currently held.
    pub fn weight(&self) -> u64 {
        self.lock().weight
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread::sleep;

    fn store(capacity: u64) -> EntryStore<String> {
        EntryStore::new(capacity)
    }

    fn long_ttl() -> Option<Duration> {
        Some(Duration::from_secs(300))
    }

    #[test]
    fn test_store_new() {
        let store = store(100);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.capacity(), 100);
    }

    #[test]
    fn test_store_put_and_get() {
        let store = store(100);

        store.put("key1", "value1".to_string(), long_ttl());

        assert_eq!(store.get("key1").as_deref(), Some("value1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        assert!(store(100).get("nonexistent").is_none());
    }

    #[test]
    fn test_store_evict() {
        let store = store(100);

        store.put("key1", "value1".to_string(), long_ttl());
        assert!(store.evict("key1"));

        assert!(store.is_empty());
        assert!(store.get("key1").is_none());
    }

    #[test]
    fn test_store_evict_twice_is_noop() {
        let store = store(100);

        store.put("key1", "value1".to_string(), long_ttl());
        assert!(store.evict("key1"));
        assert!(!store.evict("key1"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_overwrite() {
        let store = store(100);

        store.put("key1", "value1".to_string(), long_ttl());
        store.put("key1", "value2".to_string(), long_ttl());

        assert_eq!(store.get("key1").as_deref(), Some("value2"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.weight(), 1);
    }

    #[test]
    fn test_store_overwrite_refreshes_ttl() {
        let store = store(100);

        store.put("key1", "value1".to_string(), Some(Duration::from_millis(40)));
        sleep(Duration::from_millis(25));
        store.put("key1", "value2".to_string(), Some(Duration::from_millis(40)));
        sleep(Duration::from_millis(25));

        assert_eq!(store.get("key1").as_deref(), Some("value2"));
    }

    #[test]
    fn test_store_ttl_expiration() {
        let store = store(100);

        store.put("key1", "value1".to_string(), Some(Duration::from_millis(50)));
        assert!(store.get("key1").is_some());

        sleep(Duration::from_millis(80));

        assert!(store.get("key1").is_none());
        assert!(store.is_empty(), "Expired entry should be removed on read");
    }

    #[test]
    fn test_store_no_ttl_never_expires() {
        let store = store(100);
        store.put("key1", "value1".to_string(), None);
        sleep(Duration::from_millis(20));
        assert!(store.get("key1").is_some());
    }

    #[test]
    fn test_store_lru_eviction() {
        let store = store(3);

        store.put("key1", "value1".to_string(), long_ttl());
        store.put("key2", "value2".to_string(), long_ttl());
        store.put("key3", "value3".to_string(), long_ttl());

        let evicted = store.put("key4", "value4".to_string(), long_ttl());

        assert_eq!(evicted, 1);
        assert_eq!(store.len(), 3);
        assert!(store.get("key1").is_none());
        assert!(store.get("key2").is_some());
        assert!(store.get("key3").is_some());
        assert!(store.get("key4").is_some());
    }

    #[test]
    fn test_store_capacity_two_scenario() {
        let store = store(2);

        store.put("A", "a".to_string(), long_ttl());
        store.put("B", "b".to_string(), long_ttl());
        store.put("C", "c".to_string(), long_ttl());

        assert!(store.get("A").is_none());
        assert!(store.contains("B"));
        assert!(store.contains("C"));
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let store = store(3);

        store.put("key1", "value1".to_string(), long_ttl());
        store.put("key2", "value2".to_string(), long_ttl());
        store.put("key3", "value3".to_string(), long_ttl());

        store.get("key1");
        store.put("key4", "value4".to_string(), long_ttl());

        assert!(store.get("key1").is_some());
        assert!(store.get("key2").is_none());
    }

    #[test]
    fn test_store_weighted_eviction() {
        let store = store(10);

        store.put_weighted("small1", "s".to_string(), long_ttl(), 3);
        store.put_weighted("small2", "s".to_string(), long_ttl(), 3);
        store.put_weighted("small3", "s".to_string(), long_ttl(), 3);

        let evicted = store.put_weighted("big", "b".to_string(), long_ttl(), 6);

        assert_eq!(evicted, 2);
        assert_eq!(store.weight(), 9);
        assert!(store.contains("small3"));
        assert!(store.contains("big"));
    }

    #[test]
    fn test_store_rejects_oversized_entry() {
        let store = store(4);

        store.put("key", "old".to_string(), long_ttl());
        let evicted = store.put_weighted("key", "huge".to_string(), long_ttl(), 5);

        assert_eq!(evicted, 0);
        assert!(store.get("key").is_none(), "Stale value must not survive");
        assert_eq!(store.weight(), 0);
    }

    #[test]
    fn test_store_clear() {
        let store = store(10);
        store.put("a", "1".to_string(), long_ttl());
        store.put("b", "2".to_string(), long_ttl());

        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.weight(), 0);
        assert!(store.get("a").is_none());
    }

    #[test]
    fn test_store_cleanup_expired() {
        let store = store(100);

        store.put("key1", "value1".to_string(), Some(Duration::from_millis(30)));
        store.put("key2", "value2".to_string(), long_ttl());

        sleep(Duration::from_millis(60));

        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("key2").is_some());
    }

    #[test]
    fn test_store_concurrent_puts_respect_capacity() {
        let store = Arc::new(store(16));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.put(&format!("t{t}-k{i}"), i.to_string(), long_ttl());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 16);
        assert_eq!(store.weight(), 16);
    }
}
