//! Core cache implementation
//!
//! A generic, thread-safe cache with bounded size, LRU/FIFO eviction and
//! TTL expiration. Entries may carry an individual TTL overriding the
//! configured default, which the tiered flag cache uses to hold flags and
//! overrides with different lifetimes in one store.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use super::config::{CacheConfig, EvictionPolicy};
use super::stats::{CacheStats, MetricsCollector};
use crate::time::{Clock, SystemClock};

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

#[derive(Debug)]
struct Storage<K, V>
where
    K: Eq + Hash + Clone,
{
    entries: HashMap<K, Entry<V>>,
    /// Insertion/access order for FIFO/LRU eviction
    order: Vec<K>,
}

impl<K, V> Storage<K, V>
where
    K: Eq + Hash + Clone,
{
    fn new() -> Self {
        Self { entries: HashMap::new(), order: Vec::new() }
    }
}

/// Generic thread-safe cache with bounded size and TTL expiration
///
/// # Type Parameters
/// - `K`: key type (`Eq + Hash + Clone`)
/// - `V`: value type (`Clone`)
/// - `C`: clock used for TTL checks (defaults to [`SystemClock`])
///
/// # Example
/// ```
/// use featuregate_common::cache::{Cache, CacheConfig};
///
/// let cache: Cache<String, i32> = Cache::new(CacheConfig::lru(100));
/// cache.insert("key".to_string(), 42);
/// assert_eq!(cache.get(&"key".to_string()), Some(42));
/// ```
pub struct Cache<K, V, C = SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    storage: Arc<RwLock<Storage<K, V>>>,
    config: CacheConfig,
    metrics: MetricsCollector,
    clock: C,
}

impl<K, V> Cache<K, V, SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a new cache with the given configuration using the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<K, V, C> Cache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    /// Create a new cache with a custom clock (useful for testing).
    pub fn with_clock(config: CacheConfig, clock: C) -> Self {
        Self {
            storage: Arc::new(RwLock::new(Storage::new())),
            config,
            metrics: MetricsCollector::new(),
            clock,
        }
    }

    /// Insert a value using the configured default TTL.
    ///
    /// If the cache is at capacity, an entry is evicted according to the
    /// configured eviction policy first.
    pub fn insert(&self, key: K, value: V) {
        self.insert_entry(key, value, self.config.ttl);
    }

    /// Insert a value with an explicit TTL overriding the default.
    pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        self.insert_entry(key, value, Some(ttl));
    }

    fn insert_entry(&self, key: K, value: V, ttl: Option<Duration>) {
        let mut storage = self.storage.write().unwrap_or_else(|e| e.into_inner());

        if let Some(max_size) = self.config.max_size {
            if storage.entries.len() >= max_size && !storage.entries.contains_key(&key) {
                self.evict_one(&mut storage);
            }
        }

        let expires_at = ttl.map(|ttl| self.clock.now() + ttl);
        storage.entries.insert(key.clone(), Entry { value, expires_at });

        if matches!(self.config.eviction_policy, EvictionPolicy::Lru | EvictionPolicy::Fifo) {
            storage.order.retain(|k| k != &key);
            storage.order.push(key);
        }

        if self.config.track_metrics {
            self.metrics.record_insert();
        }
    }

    /// Get a value, returning `None` if the key is absent or expired.
    ///
    /// Expired entries are removed eagerly; an LRU read refreshes the
    /// entry's position in the eviction order.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut storage = self.storage.write().unwrap_or_else(|e| e.into_inner());

        let expired = match storage.entries.get(key) {
            None => {
                if self.config.track_metrics {
                    self.metrics.record_miss();
                }
                return None;
            }
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            storage.entries.remove(key);
            storage.order.retain(|k| k != key);
            if self.config.track_metrics {
                self.metrics.record_miss();
                self.metrics.record_expiration();
            }
            return None;
        }

        let value = storage.entries.get(key).map(|entry| entry.value.clone());

        if value.is_some() && self.config.eviction_policy == EvictionPolicy::Lru {
            storage.order.retain(|k| k != key);
            storage.order.push(key.clone());
        }

        if self.config.track_metrics {
            self.metrics.record_hit();
        }

        value
    }

    /// Remove a value, returning it if it was present.
    pub fn remove(&self, key: &K) -> Option<V> {
        let mut storage = self.storage.write().unwrap_or_else(|e| e.into_inner());
        storage.order.retain(|k| k != key);
        storage.entries.remove(key).map(|entry| entry.value)
    }

    /// Clear all entries and reset metrics.
    pub fn clear(&self) {
        let mut storage = self.storage.write().unwrap_or_else(|e| e.into_inner());
        storage.entries.clear();
        storage.order.clear();

        if self.config.track_metrics {
            self.metrics.reset();
        }
    }

    /// Current number of entries, including not-yet-collected expired ones.
    pub fn len(&self) -> usize {
        self.storage.read().unwrap_or_else(|e| e.into_inner()).entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all expired entries, returning how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let mut storage = self.storage.write().unwrap_or_else(|e| e.into_inner());

        let expired_keys: Vec<K> = storage
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            storage.entries.remove(key);
            storage.order.retain(|k| k != key);

            if self.config.track_metrics {
                self.metrics.record_expiration();
            }
        }

        expired_keys.len()
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot(self.len(), self.config.max_size)
    }

    fn evict_one(&self, storage: &mut Storage<K, V>) {
        // LRU and FIFO both evict the front of the order vector; they
        // differ only in whether get() refreshes positions.
        let victim = match self.config.eviction_policy {
            EvictionPolicy::Lru | EvictionPolicy::Fifo => storage.order.first().cloned(),
            EvictionPolicy::None => None,
        };

        if let Some(key) = victim {
            storage.entries.remove(&key);
            storage.order.retain(|k| k != &key);

            if self.config.track_metrics {
                self.metrics.record_eviction();
            }
        }
    }
}

impl<K, V, C> Clone for Cache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock + Clone,
{
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            config: self.config.clone(),
            metrics: self.metrics.clone(),
            clock: self.clock.clone(),
        }
    }
}
