//! Tiered cache: process-local L1 over a shared L2
//!
//! Reads go L1 → L2 → miss; an L2 hit re-populates L1 with the short L1
//! TTL. Writes go to both tiers with their respective TTLs, deletes
//! clear both. Invalidation messages only touch L1: the publisher wrote
//! L2 before publishing, so L2 is already consistent, and a stale L1
//! entry lives at most until its short TTL expires.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use featuregate_common::cache::{Cache, CacheConfig};
use featuregate_core::{CacheInvalidator, FlagCache, TieredFlagCache};
use featuregate_domain::{
    CacheAction, CacheSettings, CacheUpdateMessage, FeatureFlag, FlagOverride, Result, TargetType,
    TieredCacheStats,
};
use tracing::{debug, warn};

use super::override_key;

/// Two-tier flag cache
pub struct TieredCache {
    l1_flags: Cache<String, FeatureFlag>,
    l1_overrides: Cache<String, FlagOverride>,
    l2: Arc<dyn FlagCache>,
    settings: CacheSettings,
    l1_hits: AtomicU64,
    l1_misses: AtomicU64,
    l2_hits: AtomicU64,
    l2_misses: AtomicU64,
}

impl TieredCache {
    /// Create a tiered cache over a shared tier.
    pub fn new(l2: Arc<dyn FlagCache>, settings: CacheSettings) -> Self {
        let config = CacheConfig::ttl_lru(settings.l1_ttl, settings.l1_max_size);
        Self {
            l1_flags: Cache::new(config.clone()),
            l1_overrides: Cache::new(config),
            l2,
            settings,
            l1_hits: AtomicU64::new(0),
            l1_misses: AtomicU64::new(0),
            l2_hits: AtomicU64::new(0),
            l2_misses: AtomicU64::new(0),
        }
    }

    /// Apply one invalidation message to the local tier. Idempotent:
    /// deletes commute with each other and with reads.
    pub fn apply_invalidation(&self, message: &CacheUpdateMessage) {
        match message.action {
            CacheAction::Updated | CacheAction::Deleted => {
                if let Some(key) = &message.flag_key {
                    self.l1_flags.remove(key);
                    debug!(key = %key, "local flag entry invalidated");
                }
            }
            CacheAction::OverrideUpdated | CacheAction::OverrideDeleted => {
                if let (Some(flag_key), Some(target_type), Some(target_id)) =
                    (&message.flag_key, message.target_type, &message.target_id)
                {
                    self.l1_overrides.remove(&override_key(flag_key, target_type, target_id));
                    debug!(flag_key = %flag_key, "local override entry invalidated");
                }
            }
            CacheAction::InvalidateAll => {
                self.l1_flags.clear();
                self.l1_overrides.clear();
                debug!("local tier cleared");
            }
        }
    }

    /// Subscribe this cache to an invalidation channel. Each received
    /// message is applied to the local tier.
    pub async fn subscribe_invalidations(
        self: &Arc<Self>,
        invalidator: &dyn CacheInvalidator,
    ) -> Result<()> {
        let cache = Arc::clone(self);
        invalidator.subscribe(Box::new(move |message| cache.apply_invalidation(&message))).await
    }
}

#[async_trait]
impl FlagCache for TieredCache {
    async fn get(&self, key: &str) -> Result<Option<FeatureFlag>> {
        if let Some(flag) = self.l1_flags.get(&key.to_string()) {
            self.l1_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Some(flag));
        }
        self.l1_misses.fetch_add(1, Ordering::Relaxed);

        match self.l2.get(key).await {
            Ok(Some(flag)) => {
                self.l2_hits.fetch_add(1, Ordering::Relaxed);
                self.l1_flags.insert(key.to_string(), flag.clone());
                Ok(Some(flag))
            }
            Ok(None) => {
                self.l2_misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Err(err) => {
                // A failing shared tier degrades to a miss; the caller
                // falls through to the repository.
                warn!(key, error = %err, "shared tier read failed");
                self.l2_misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, flag: &FeatureFlag, ttl: Duration) -> Result<()> {
        self.l1_flags.insert(key.to_string(), flag.clone());
        if let Err(err) = self.l2.set(key, flag, ttl).await {
            warn!(key, error = %err, "shared tier write failed");
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.l1_flags.remove(&key.to_string());
        if let Err(err) = self.l2.delete(key).await {
            warn!(key, error = %err, "shared tier delete failed");
        }
        Ok(())
    }

    async fn get_override(
        &self,
        flag_key: &str,
        target_type: TargetType,
        target_id: &str,
    ) -> Result<Option<FlagOverride>> {
        let key = override_key(flag_key, target_type, target_id);

        if let Some(entry) = self.l1_overrides.get(&key) {
            self.l1_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Some(entry));
        }
        self.l1_misses.fetch_add(1, Ordering::Relaxed);

        match self.l2.get_override(flag_key, target_type, target_id).await {
            Ok(Some(entry)) => {
                self.l2_hits.fetch_add(1, Ordering::Relaxed);
                self.l1_overrides.insert(key, entry.clone());
                Ok(Some(entry))
            }
            Ok(None) => {
                self.l2_misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Err(err) => {
                warn!(flag_key, error = %err, "shared tier override read failed");
                self.l2_misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set_override(&self, entry: &FlagOverride, ttl: Duration) -> Result<()> {
        let key = override_key(&entry.flag_key, entry.target_type, &entry.target_id);
        self.l1_overrides.insert(key, entry.clone());
        if let Err(err) = self.l2.set_override(entry, ttl).await {
            warn!(flag_key = %entry.flag_key, error = %err, "shared tier override write failed");
        }
        Ok(())
    }

    async fn delete_override(
        &self,
        flag_key: &str,
        target_type: TargetType,
        target_id: &str,
    ) -> Result<()> {
        self.l1_overrides.remove(&override_key(flag_key, target_type, target_id));
        if let Err(err) = self.l2.delete_override(flag_key, target_type, target_id).await {
            warn!(flag_key, error = %err, "shared tier override delete failed");
        }
        Ok(())
    }

    async fn invalidate_all(&self) -> Result<()> {
        self.l1_flags.clear();
        self.l1_overrides.clear();
        if let Err(err) = self.l2.invalidate_all().await {
            warn!(error = %err, "shared tier flush failed");
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.l2.close().await
    }
}

#[async_trait]
impl TieredFlagCache for TieredCache {
    async fn get_l1(&self, key: &str) -> Option<FeatureFlag> {
        self.l1_flags.get(&key.to_string())
    }

    async fn set_l1(&self, key: &str, flag: &FeatureFlag) {
        self.l1_flags.insert(key.to_string(), flag.clone());
    }

    async fn invalidate_l1(&self, key: &str) {
        self.l1_flags.remove(&key.to_string());
    }

    fn stats(&self) -> TieredCacheStats {
        TieredCacheStats {
            l1_hits: self.l1_hits.load(Ordering::Relaxed),
            l1_misses: self.l1_misses.load(Ordering::Relaxed),
            l2_hits: self.l2_hits.load(Ordering::Relaxed),
            l2_misses: self.l2_misses.load(Ordering::Relaxed),
            entries: (self.l1_flags.len() + self.l1_overrides.len()) as u64,
        }
    }
}
