//! Cache configuration

use std::time::Duration;

/// Eviction policy applied when the cache reaches its size bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Evict the least recently used entry
    #[default]
    Lru,
    /// Evict the oldest inserted entry
    Fifo,
    /// Never evict; inserts beyond the bound are still accepted
    None,
}

/// Configuration for a [`Cache`](super::Cache)
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries (None = unbounded)
    pub max_size: Option<usize>,
    /// Default time-to-live applied to entries inserted without an
    /// explicit TTL (None = entries never expire by default)
    pub ttl: Option<Duration>,
    /// Eviction policy used at capacity
    pub eviction_policy: EvictionPolicy,
    /// Whether to collect hit/miss metrics
    pub track_metrics: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_size: None, ttl: None, eviction_policy: EvictionPolicy::Lru, track_metrics: false }
    }
}

impl CacheConfig {
    /// Start building a configuration.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// LRU cache bounded to `max_size` entries, no TTL.
    pub fn lru(max_size: usize) -> Self {
        Self { max_size: Some(max_size), ..Self::default() }
    }

    /// Unbounded cache whose entries expire after `ttl`.
    pub fn ttl(ttl: Duration) -> Self {
        Self { ttl: Some(ttl), ..Self::default() }
    }

    /// LRU cache bounded to `max_size` entries with a default `ttl`.
    pub fn ttl_lru(ttl: Duration, max_size: usize) -> Self {
        Self { max_size: Some(max_size), ttl: Some(ttl), ..Self::default() }
    }
}

/// Builder for [`CacheConfig`]
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    max_size: Option<usize>,
    ttl: Option<Duration>,
    eviction_policy: EvictionPolicy,
    track_metrics: bool,
}

impl CacheConfigBuilder {
    /// Bound the cache to `max_size` entries.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Set the default entry TTL.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the eviction policy.
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = policy;
        self
    }

    /// Enable or disable metrics collection.
    pub fn track_metrics(mut self, enabled: bool) -> Self {
        self.track_metrics = enabled;
        self
    }

    /// Finish building the configuration.
    pub fn build(self) -> CacheConfig {
        CacheConfig {
            max_size: self.max_size,
            ttl: self.ttl,
            eviction_policy: self.eviction_policy,
            track_metrics: self.track_metrics,
        }
    }
}
