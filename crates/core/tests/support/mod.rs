//! Mock implementations of the core ports for integration tests
//!
//! In-memory, deliberately simple, with switchable failure modes so
//! tests can exercise the best-effort paths (audit, outbox, cache).

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use featuregate_core::{
    CacheInvalidator, FeatureFlagRepository, FlagAuditLogRepository, FlagCache,
    FlagOverrideRepository, InvalidationCallback, OutboxRepository,
};
use featuregate_domain::{
    AuditFilter, CacheUpdateMessage, FeatureFlag, FlagAuditLog, FlagError, FlagFilter,
    FlagOverride, FlagStatus, FlagType, OutboxEntry, OverrideFilter, Result, TargetType,
};
use uuid::Uuid;

fn storage_failure() -> FlagError {
    FlagError::InternalError("storage unavailable".to_string())
}

/// In-memory mock for `FeatureFlagRepository` with a failure switch.
#[derive(Default)]
pub struct MockFlagRepository {
    flags: RwLock<HashMap<String, FeatureFlag>>,
    fail: AtomicBool,
}

impl MockFlagRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the mock with a flag, bypassing service plumbing.
    pub fn with_flag(self, flag: FeatureFlag) -> Self {
        self.flags.write().unwrap().insert(flag.key().to_string(), flag);
        self
    }

    /// Make every subsequent call fail with an internal error.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(storage_failure());
        }
        Ok(())
    }
}

#[async_trait]
impl FeatureFlagRepository for MockFlagRepository {
    async fn create(&self, flag: &FeatureFlag) -> Result<()> {
        self.check()?;
        let mut flags = self.flags.write().unwrap();
        if flags.contains_key(flag.key()) {
            return Err(FlagError::FlagExists(flag.key().to_string()));
        }
        flags.insert(flag.key().to_string(), flag.clone());
        Ok(())
    }

    async fn update(&self, flag: &FeatureFlag) -> Result<()> {
        self.check()?;
        let mut flags = self.flags.write().unwrap();
        let stored = flags
            .get(flag.key())
            .ok_or_else(|| FlagError::FlagNotFound(flag.key().to_string()))?;
        if flag.version != stored.version + 1 {
            return Err(FlagError::OptimisticLockFailed(flag.key().to_string()));
        }
        flags.insert(flag.key().to_string(), flag.clone());
        Ok(())
    }

    async fn find_by_key(&self, key: &str) -> Result<FeatureFlag> {
        self.check()?;
        self.flags
            .read()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| FlagError::FlagNotFound(key.to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<FeatureFlag> {
        self.check()?;
        self.flags
            .read()
            .unwrap()
            .values()
            .find(|flag| flag.id == id)
            .cloned()
            .ok_or_else(|| FlagError::FlagNotFound(id.to_string()))
    }

    async fn find_all(&self, filter: &FlagFilter) -> Result<Vec<FeatureFlag>> {
        self.check()?;
        let mut flags: Vec<FeatureFlag> = self
            .flags
            .read()
            .unwrap()
            .values()
            .filter(|flag| {
                filter.status.map_or(true, |status| flag.status == status)
                    && filter.flag_type.map_or(true, |flag_type| flag.flag_type == flag_type)
                    && filter.tags.iter().all(|tag| flag.tags().contains(tag))
            })
            .cloned()
            .collect();
        flags.sort_by(|a, b| a.key().cmp(b.key()));
        Ok(flags
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn find_by_status(&self, status: FlagStatus) -> Result<Vec<FeatureFlag>> {
        self.find_all(&FlagFilter::default().with_status(status)).await
    }

    async fn find_by_tags(&self, tags: &[String]) -> Result<Vec<FeatureFlag>> {
        let filter = FlagFilter { tags: tags.to_vec(), ..FlagFilter::default() };
        self.find_all(&filter).await
    }

    async fn find_by_type(&self, flag_type: FlagType) -> Result<Vec<FeatureFlag>> {
        self.find_all(&FlagFilter::default().with_type(flag_type)).await
    }

    async fn find_enabled(&self, filter: &FlagFilter) -> Result<Vec<FeatureFlag>> {
        let filter = FlagFilter { status: Some(FlagStatus::Enabled), ..filter.clone() };
        self.find_all(&filter).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check()?;
        self.flags
            .write()
            .unwrap()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| FlagError::FlagNotFound(key.to_string()))
    }

    async fn exists_by_key(&self, key: &str) -> Result<bool> {
        self.check()?;
        Ok(self.flags.read().unwrap().contains_key(key))
    }

    async fn count(&self) -> Result<u64> {
        self.check()?;
        Ok(self.flags.read().unwrap().len() as u64)
    }

    async fn count_by_status(&self, status: FlagStatus) -> Result<u64> {
        self.check()?;
        Ok(self
            .flags
            .read()
            .unwrap()
            .values()
            .filter(|flag| flag.status == status)
            .count() as u64)
    }
}

/// In-memory mock for `FlagOverrideRepository`.
#[derive(Default)]
pub struct MockOverrideRepository {
    overrides: RwLock<HashMap<Uuid, FlagOverride>>,
}

impl MockOverrideRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the mock with an override, bypassing validation.
    pub fn with_override(self, entry: FlagOverride) -> Self {
        self.overrides.write().unwrap().insert(entry.id, entry);
        self
    }
}

#[async_trait]
impl FlagOverrideRepository for MockOverrideRepository {
    async fn create(&self, entry: &FlagOverride) -> Result<()> {
        let mut overrides = self.overrides.write().unwrap();
        let now = Utc::now();
        let duplicate = overrides.values().any(|existing| {
            existing.flag_key == entry.flag_key
                && existing.target_type == entry.target_type
                && existing.target_id == entry.target_id
                && existing.is_active(now)
        });
        if duplicate {
            return Err(FlagError::OverrideExists(entry.flag_key.clone()));
        }
        overrides.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn update(&self, entry: &FlagOverride) -> Result<()> {
        let mut overrides = self.overrides.write().unwrap();
        if !overrides.contains_key(&entry.id) {
            return Err(FlagError::OverrideNotFound(entry.id.to_string()));
        }
        overrides.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<FlagOverride> {
        self.overrides
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| FlagError::OverrideNotFound(id.to_string()))
    }

    async fn find_by_flag_key(
        &self,
        flag_key: &str,
        _filter: &OverrideFilter,
    ) -> Result<Vec<FlagOverride>> {
        Ok(self
            .overrides
            .read()
            .unwrap()
            .values()
            .filter(|entry| entry.flag_key == flag_key)
            .cloned()
            .collect())
    }

    async fn find_by_target(
        &self,
        target_type: TargetType,
        target_id: &str,
        _filter: &OverrideFilter,
    ) -> Result<Vec<FlagOverride>> {
        Ok(self
            .overrides
            .read()
            .unwrap()
            .values()
            .filter(|entry| entry.target_type == target_type && entry.target_id == target_id)
            .cloned()
            .collect())
    }

    async fn find_by_flag_key_and_target(
        &self,
        flag_key: &str,
        target_type: TargetType,
        target_id: &str,
    ) -> Result<Option<FlagOverride>> {
        let overrides = self.overrides.read().unwrap();
        let now = Utc::now();
        let mut candidates: Vec<&FlagOverride> = overrides
            .values()
            .filter(|entry| {
                entry.flag_key == flag_key
                    && entry.target_type == target_type
                    && entry.target_id == target_id
            })
            .collect();
        candidates.sort_by_key(|entry| entry.created_at);
        let active = candidates.iter().find(|entry| entry.is_active(now));
        Ok(active.or(candidates.last()).map(|entry| (*entry).clone()))
    }

    async fn find_expired(&self, as_of: DateTime<Utc>) -> Result<Vec<FlagOverride>> {
        Ok(self
            .overrides
            .read()
            .unwrap()
            .values()
            .filter(|entry| !entry.is_active(as_of))
            .cloned()
            .collect())
    }

    async fn find_active(&self, as_of: DateTime<Utc>) -> Result<Vec<FlagOverride>> {
        Ok(self
            .overrides
            .read()
            .unwrap()
            .values()
            .filter(|entry| entry.is_active(as_of))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.overrides
            .write()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| FlagError::OverrideNotFound(id.to_string()))
    }

    async fn delete_by_flag_key(&self, flag_key: &str) -> Result<u64> {
        let mut overrides = self.overrides.write().unwrap();
        let before = overrides.len();
        overrides.retain(|_, entry| entry.flag_key != flag_key);
        Ok((before - overrides.len()) as u64)
    }

    async fn delete_expired(&self, as_of: DateTime<Utc>) -> Result<Vec<FlagOverride>> {
        let mut overrides = self.overrides.write().unwrap();
        let expired: Vec<FlagOverride> =
            overrides.values().filter(|entry| !entry.is_active(as_of)).cloned().collect();
        for entry in &expired {
            overrides.remove(&entry.id);
        }
        Ok(expired)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.overrides.read().unwrap().len() as u64)
    }

    async fn count_by_flag_key(&self, flag_key: &str) -> Result<u64> {
        Ok(self
            .overrides
            .read()
            .unwrap()
            .values()
            .filter(|entry| entry.flag_key == flag_key)
            .count() as u64)
    }
}

/// In-memory mock for `FlagAuditLogRepository` with a failure switch.
#[derive(Default)]
pub struct MockAuditRepository {
    entries: RwLock<Vec<FlagAuditLog>>,
    fail: AtomicBool,
}

impl MockAuditRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn entries(&self) -> Vec<FlagAuditLog> {
        self.entries.read().unwrap().clone()
    }

    fn check(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(storage_failure());
        }
        Ok(())
    }
}

#[async_trait]
impl FlagAuditLogRepository for MockAuditRepository {
    async fn create(&self, entry: &FlagAuditLog) -> Result<()> {
        self.check()?;
        self.entries.write().unwrap().push(entry.clone());
        Ok(())
    }

    async fn create_batch(&self, entries: &[FlagAuditLog]) -> Result<()> {
        self.check()?;
        self.entries.write().unwrap().extend(entries.iter().cloned());
        Ok(())
    }

    async fn find_by_flag_key(
        &self,
        flag_key: &str,
        _filter: &AuditFilter,
    ) -> Result<Vec<FlagAuditLog>> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .iter()
            .filter(|entry| entry.flag_key == flag_key)
            .cloned()
            .collect())
    }

    async fn find_by_user_id(
        &self,
        user_id: &str,
        _filter: &AuditFilter,
    ) -> Result<Vec<FlagAuditLog>> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .iter()
            .filter(|entry| entry.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect())
    }

    async fn find_by_action(
        &self,
        action: &str,
        _filter: &AuditFilter,
    ) -> Result<Vec<FlagAuditLog>> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .iter()
            .filter(|entry| entry.action == action)
            .cloned()
            .collect())
    }

    async fn find_all(&self, _filter: &AuditFilter) -> Result<Vec<FlagAuditLog>> {
        Ok(self.entries())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.entries.read().unwrap().len() as u64)
    }

    async fn count_by_flag_key(&self, flag_key: &str) -> Result<u64> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .iter()
            .filter(|entry| entry.flag_key == flag_key)
            .count() as u64)
    }
}

/// In-memory mock for `OutboxRepository` with a failure switch.
#[derive(Default)]
pub struct MockOutboxRepository {
    entries: RwLock<Vec<OutboxEntry>>,
    fail: AtomicBool,
}

impl MockOutboxRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn entries(&self) -> Vec<OutboxEntry> {
        self.entries.read().unwrap().clone()
    }
}

#[async_trait]
impl OutboxRepository for MockOutboxRepository {
    async fn save(&self, entries: &[OutboxEntry]) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(storage_failure());
        }
        self.entries.write().unwrap().extend(entries.iter().cloned());
        Ok(())
    }
}

/// Counting mock for `FlagCache`, tracking reads and writes.
#[derive(Default)]
pub struct MockFlagCache {
    flags: RwLock<HashMap<String, FeatureFlag>>,
    overrides: RwLock<HashMap<String, FlagOverride>>,
    pub flag_gets: AtomicU64,
    pub flag_sets: AtomicU64,
}

impl MockFlagCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn override_key(flag_key: &str, target_type: TargetType, target_id: &str) -> String {
        format!("{flag_key}:{target_type}:{target_id}")
    }
}

#[async_trait]
impl FlagCache for MockFlagCache {
    async fn get(&self, key: &str) -> Result<Option<FeatureFlag>> {
        self.flag_gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.flags.read().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, flag: &FeatureFlag, _ttl: Duration) -> Result<()> {
        self.flag_sets.fetch_add(1, Ordering::SeqCst);
        self.flags.write().unwrap().insert(key.to_string(), flag.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.flags.write().unwrap().remove(key);
        Ok(())
    }

    async fn get_override(
        &self,
        flag_key: &str,
        target_type: TargetType,
        target_id: &str,
    ) -> Result<Option<FlagOverride>> {
        let key = Self::override_key(flag_key, target_type, target_id);
        Ok(self.overrides.read().unwrap().get(&key).cloned())
    }

    async fn set_override(&self, entry: &FlagOverride, _ttl: Duration) -> Result<()> {
        let key = Self::override_key(&entry.flag_key, entry.target_type, &entry.target_id);
        self.overrides.write().unwrap().insert(key, entry.clone());
        Ok(())
    }

    async fn delete_override(
        &self,
        flag_key: &str,
        target_type: TargetType,
        target_id: &str,
    ) -> Result<()> {
        let key = Self::override_key(flag_key, target_type, target_id);
        self.overrides.write().unwrap().remove(&key);
        Ok(())
    }

    async fn invalidate_all(&self) -> Result<()> {
        self.flags.write().unwrap().clear();
        self.overrides.write().unwrap().clear();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Recording mock for `CacheInvalidator`.
#[derive(Default)]
pub struct MockInvalidator {
    published: RwLock<Vec<CacheUpdateMessage>>,
}

impl MockInvalidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<CacheUpdateMessage> {
        self.published.read().unwrap().clone()
    }
}

#[async_trait]
impl CacheInvalidator for MockInvalidator {
    async fn publish(&self, message: &CacheUpdateMessage) -> Result<()> {
        self.published.write().unwrap().push(message.clone());
        Ok(())
    }

    async fn subscribe(&self, _callback: InvalidationCallback) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
