//! Cache ports provided to the evaluation core
//!
//! Evaluation treats the cache as optional: every call site tolerates an
//! absent cache and a failing cache (read errors fall through, write
//! errors are logged).

use std::time::Duration;

use async_trait::async_trait;
use featuregate_domain::{
    CacheUpdateMessage, FeatureFlag, FlagOverride, Result, TargetType, TieredCacheStats,
};

/// Port for a flag/override cache tier
#[async_trait]
pub trait FlagCache: Send + Sync {
    /// Look up a flag by key.
    async fn get(&self, key: &str) -> Result<Option<FeatureFlag>>;

    /// Store a flag with the given TTL.
    async fn set(&self, key: &str, flag: &FeatureFlag, ttl: Duration) -> Result<()>;

    /// Drop a flag entry.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Look up an override by its `(flag, target)` triple.
    async fn get_override(
        &self,
        flag_key: &str,
        target_type: TargetType,
        target_id: &str,
    ) -> Result<Option<FlagOverride>>;

    /// Store an override with the given TTL.
    async fn set_override(&self, entry: &FlagOverride, ttl: Duration) -> Result<()>;

    /// Drop an override entry.
    async fn delete_override(
        &self,
        flag_key: &str,
        target_type: TargetType,
        target_id: &str,
    ) -> Result<()>;

    /// Drop every entry.
    async fn invalidate_all(&self) -> Result<()>;

    /// Release resources held by the cache.
    async fn close(&self) -> Result<()>;
}

/// Two-tier cache exposing explicit access to its process-local tier
#[async_trait]
pub trait TieredFlagCache: FlagCache {
    /// Look up a flag in the local tier only.
    async fn get_l1(&self, key: &str) -> Option<FeatureFlag>;

    /// Store a flag in the local tier only.
    async fn set_l1(&self, key: &str, flag: &FeatureFlag);

    /// Drop a flag from the local tier only.
    async fn invalidate_l1(&self, key: &str);

    /// Per-tier hit/miss counters.
    fn stats(&self) -> TieredCacheStats;
}

/// Callback invoked for every invalidation message received.
pub type InvalidationCallback = Box<dyn Fn(CacheUpdateMessage) + Send + Sync>;

/// Port for the cross-instance invalidation channel
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    /// Publish a message to every subscriber.
    async fn publish(&self, message: &CacheUpdateMessage) -> Result<()>;

    /// Register a callback for incoming messages.
    async fn subscribe(&self, callback: InvalidationCallback) -> Result<()>;

    /// Stop delivering messages.
    async fn close(&self) -> Result<()>;
}
