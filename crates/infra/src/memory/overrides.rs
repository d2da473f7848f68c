//! In-memory override repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use featuregate_core::FlagOverrideRepository;
use featuregate_domain::{FlagError, FlagOverride, OverrideFilter, Result, TargetType};
use uuid::Uuid;

use super::paginate;

/// Concurrent-map override store
///
/// Enforces at most one active override per `(flag, target)` triple;
/// expired rows may coexist with a newer active one until the sweep
/// removes them.
#[derive(Debug, Default)]
pub struct InMemoryOverrideRepository {
    overrides: DashMap<Uuid, FlagOverride>,
}

impl InMemoryOverrideRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    fn collect<F>(&self, predicate: F) -> Vec<FlagOverride>
    where
        F: Fn(&FlagOverride) -> bool,
    {
        let mut entries: Vec<FlagOverride> = self
            .overrides
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        entries
    }

    fn filtered(&self, base: Vec<FlagOverride>, filter: &OverrideFilter) -> Vec<FlagOverride> {
        let now = Utc::now();
        let entries: Vec<FlagOverride> = base
            .into_iter()
            .filter(|entry| {
                filter.target_type.map_or(true, |target_type| entry.target_type == target_type)
                    && (!filter.active_only || entry.is_active(now))
            })
            .collect();
        paginate(entries, filter.offset, filter.limit)
    }
}

#[async_trait]
impl FlagOverrideRepository for InMemoryOverrideRepository {
    async fn create(&self, entry: &FlagOverride) -> Result<()> {
        let now = Utc::now();
        let duplicate = self.overrides.iter().any(|existing| {
            let existing = existing.value();
            existing.flag_key == entry.flag_key
                && existing.target_type == entry.target_type
                && existing.target_id == entry.target_id
                && existing.is_active(now)
        });
        if duplicate {
            return Err(FlagError::OverrideExists(format!(
                "{}/{}/{}",
                entry.flag_key, entry.target_type, entry.target_id
            )));
        }

        self.overrides.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn update(&self, entry: &FlagOverride) -> Result<()> {
        if !self.overrides.contains_key(&entry.id) {
            return Err(FlagError::OverrideNotFound(entry.id.to_string()));
        }
        self.overrides.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<FlagOverride> {
        self.overrides
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| FlagError::OverrideNotFound(id.to_string()))
    }

    async fn find_by_flag_key(
        &self,
        flag_key: &str,
        filter: &OverrideFilter,
    ) -> Result<Vec<FlagOverride>> {
        let base = self.collect(|entry| entry.flag_key == flag_key);
        Ok(self.filtered(base, filter))
    }

    async fn find_by_target(
        &self,
        target_type: TargetType,
        target_id: &str,
        filter: &OverrideFilter,
    ) -> Result<Vec<FlagOverride>> {
        let base =
            self.collect(|entry| entry.target_type == target_type && entry.target_id == target_id);
        Ok(self.filtered(base, filter))
    }

    async fn find_by_flag_key_and_target(
        &self,
        flag_key: &str,
        target_type: TargetType,
        target_id: &str,
    ) -> Result<Option<FlagOverride>> {
        let candidates = self.collect(|entry| {
            entry.flag_key == flag_key
                && entry.target_type == target_type
                && entry.target_id == target_id
        });

        // Prefer the active override; fall back to the newest row so
        // callers can still inspect an expired one.
        let now = Utc::now();
        let active = candidates.iter().find(|entry| entry.is_active(now)).cloned();
        Ok(active.or_else(|| candidates.into_iter().last()))
    }

    async fn find_expired(&self, as_of: DateTime<Utc>) -> Result<Vec<FlagOverride>> {
        Ok(self.collect(|entry| !entry.is_active(as_of)))
    }

    async fn find_active(&self, as_of: DateTime<Utc>) -> Result<Vec<FlagOverride>> {
        Ok(self.collect(|entry| entry.is_active(as_of)))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.overrides
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| FlagError::OverrideNotFound(id.to_string()))
    }

    async fn delete_by_flag_key(&self, flag_key: &str) -> Result<u64> {
        let before = self.overrides.len();
        self.overrides.retain(|_, entry| entry.flag_key != flag_key);
        Ok((before - self.overrides.len()) as u64)
    }

    async fn delete_expired(&self, as_of: DateTime<Utc>) -> Result<Vec<FlagOverride>> {
        let expired = self.collect(|entry| !entry.is_active(as_of));
        for entry in &expired {
            self.overrides.remove(&entry.id);
        }
        Ok(expired)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.overrides.len() as u64)
    }

    async fn count_by_flag_key(&self, flag_key: &str) -> Result<u64> {
        Ok(self.overrides.iter().filter(|entry| entry.value().flag_key == flag_key).count() as u64)
    }
}
