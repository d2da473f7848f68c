//! In-memory shared cache
//!
//! Per-entry TTL over a concurrent map. Serves as the L2 tier in
//! single-node deployments and tests; expired entries are dropped on
//! read.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use featuregate_core::FlagCache;
use featuregate_domain::{FeatureFlag, FlagOverride, Result, TargetType};

use super::override_key;

#[derive(Debug, Clone)]
struct Entry<T> {
    value: T,
    expires_at: Instant,
}

impl<T: Clone> Entry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self { value, expires_at: Instant::now() + ttl }
    }

    fn live_value(&self) -> Option<T> {
        (Instant::now() < self.expires_at).then(|| self.value.clone())
    }
}

/// Shared-map cache with per-entry TTL
#[derive(Debug, Default)]
pub struct InMemoryFlagCache {
    flags: DashMap<String, Entry<FeatureFlag>>,
    overrides: DashMap<String, Entry<FlagOverride>>,
}

impl InMemoryFlagCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live plus not-yet-collected entries.
    pub fn len(&self) -> usize {
        self.flags.len() + self.overrides.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl FlagCache for InMemoryFlagCache {
    async fn get(&self, key: &str) -> Result<Option<FeatureFlag>> {
        let Some(entry) = self.flags.get(key) else {
            return Ok(None);
        };
        match entry.live_value() {
            Some(flag) => Ok(Some(flag)),
            None => {
                drop(entry);
                self.flags.remove(key);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, flag: &FeatureFlag, ttl: Duration) -> Result<()> {
        self.flags.insert(key.to_string(), Entry::new(flag.clone(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.flags.remove(key);
        Ok(())
    }

    async fn get_override(
        &self,
        flag_key: &str,
        target_type: TargetType,
        target_id: &str,
    ) -> Result<Option<FlagOverride>> {
        let key = override_key(flag_key, target_type, target_id);
        let Some(entry) = self.overrides.get(&key) else {
            return Ok(None);
        };
        match entry.live_value() {
            Some(value) => Ok(Some(value)),
            None => {
                drop(entry);
                self.overrides.remove(&key);
                Ok(None)
            }
        }
    }

    async fn set_override(&self, entry: &FlagOverride, ttl: Duration) -> Result<()> {
        let key = override_key(&entry.flag_key, entry.target_type, &entry.target_id);
        self.overrides.insert(key, Entry::new(entry.clone(), ttl));
        Ok(())
    }

    async fn delete_override(
        &self,
        flag_key: &str,
        target_type: TargetType,
        target_id: &str,
    ) -> Result<()> {
        self.overrides.remove(&override_key(flag_key, target_type, target_id));
        Ok(())
    }

    async fn invalidate_all(&self) -> Result<()> {
        self.flags.clear();
        self.overrides.clear();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for cache::memory.
    use featuregate_domain::{FlagType, FlagValue};

    use super::*;

    fn flag(key: &str) -> FeatureFlag {
        FeatureFlag::new(key, "Flag", None, FlagType::Boolean, FlagValue::on(), "tester").unwrap()
    }

    /// Tests set/get/delete round-trip.
    #[tokio::test]
    async fn test_flag_round_trip() {
        let cache = InMemoryFlagCache::new();
        let flag = flag("beta-login");

        cache.set("beta-login", &flag, Duration::from_secs(60)).await.unwrap();
        let cached = cache.get("beta-login").await.unwrap().unwrap();
        assert_eq!(cached.key(), "beta-login");

        cache.delete("beta-login").await.unwrap();
        assert!(cache.get("beta-login").await.unwrap().is_none());
    }

    /// Tests that entries expire after their TTL.
    #[tokio::test]
    async fn test_entry_expires() {
        let cache = InMemoryFlagCache::new();
        cache.set("beta-login", &flag("beta-login"), Duration::ZERO).await.unwrap();

        assert!(cache.get("beta-login").await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    /// Tests override storage keyed by the full triple.
    #[tokio::test]
    async fn test_override_keyed_by_triple() {
        let cache = InMemoryFlagCache::new();
        let entry = FlagOverride::new(
            "new-ui",
            TargetType::User,
            "u-1",
            FlagValue::off(),
            None,
            None,
            None,
        )
        .unwrap();

        cache.set_override(&entry, Duration::from_secs(60)).await.unwrap();

        assert!(cache.get_override("new-ui", TargetType::User, "u-1").await.unwrap().is_some());
        assert!(cache.get_override("new-ui", TargetType::Tenant, "u-1").await.unwrap().is_none());
        assert!(cache.get_override("new-ui", TargetType::User, "u-2").await.unwrap().is_none());

        cache.delete_override("new-ui", TargetType::User, "u-1").await.unwrap();
        assert!(cache.get_override("new-ui", TargetType::User, "u-1").await.unwrap().is_none());
    }

    /// Tests invalidate_all clears both stores.
    #[tokio::test]
    async fn test_invalidate_all() {
        let cache = InMemoryFlagCache::new();
        cache.set("a", &flag("a"), Duration::from_secs(60)).await.unwrap();
        cache.set("b", &flag("b"), Duration::from_secs(60)).await.unwrap();

        cache.invalidate_all().await.unwrap();
        assert!(cache.is_empty());
    }
}
