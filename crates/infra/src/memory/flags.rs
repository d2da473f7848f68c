//! In-memory flag repository

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use featuregate_core::FeatureFlagRepository;
use featuregate_domain::{
    FeatureFlag, FlagError, FlagFilter, FlagStatus, FlagType, Result,
};
use uuid::Uuid;

use super::paginate;

/// Concurrent-map flag store with optimistic concurrency on `version`
#[derive(Debug, Default)]
pub struct InMemoryFlagRepository {
    flags: DashMap<String, FeatureFlag>,
}

impl InMemoryFlagRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    fn matching(&self, filter: &FlagFilter) -> Vec<FeatureFlag> {
        let mut flags: Vec<FeatureFlag> = self
            .flags
            .iter()
            .filter(|entry| {
                let flag = entry.value();
                filter.status.map_or(true, |status| flag.status == status)
                    && filter.flag_type.map_or(true, |flag_type| flag.flag_type == flag_type)
                    && filter.tags.iter().all(|tag| flag.tags().contains(tag))
            })
            .map(|entry| entry.value().clone())
            .collect();
        flags.sort_by(|a, b| a.key().cmp(b.key()));
        paginate(flags, filter.offset, filter.limit)
    }
}

#[async_trait]
impl FeatureFlagRepository for InMemoryFlagRepository {
    async fn create(&self, flag: &FeatureFlag) -> Result<()> {
        match self.flags.entry(flag.key().to_string()) {
            Entry::Occupied(_) => Err(FlagError::FlagExists(flag.key().to_string())),
            Entry::Vacant(slot) => {
                slot.insert(flag.clone());
                Ok(())
            }
        }
    }

    async fn update(&self, flag: &FeatureFlag) -> Result<()> {
        match self.flags.entry(flag.key().to_string()) {
            Entry::Vacant(_) => Err(FlagError::FlagNotFound(flag.key().to_string())),
            Entry::Occupied(mut slot) => {
                let stored = slot.get();
                if flag.version != stored.version + 1 {
                    return Err(FlagError::OptimisticLockFailed(format!(
                        "flag '{}': expected version {}, stored version is {}",
                        flag.key(),
                        stored.version + 1,
                        stored.version
                    )));
                }
                slot.insert(flag.clone());
                Ok(())
            }
        }
    }

    async fn find_by_key(&self, key: &str) -> Result<FeatureFlag> {
        self.flags
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| FlagError::FlagNotFound(key.to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<FeatureFlag> {
        self.flags
            .iter()
            .find(|entry| entry.value().id == id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| FlagError::FlagNotFound(id.to_string()))
    }

    async fn find_all(&self, filter: &FlagFilter) -> Result<Vec<FeatureFlag>> {
        Ok(self.matching(filter))
    }

    async fn find_by_status(&self, status: FlagStatus) -> Result<Vec<FeatureFlag>> {
        Ok(self.matching(&FlagFilter::default().with_status(status)))
    }

    async fn find_by_tags(&self, tags: &[String]) -> Result<Vec<FeatureFlag>> {
        let filter = FlagFilter { tags: tags.to_vec(), ..FlagFilter::default() };
        Ok(self.matching(&filter))
    }

    async fn find_by_type(&self, flag_type: FlagType) -> Result<Vec<FeatureFlag>> {
        Ok(self.matching(&FlagFilter::default().with_type(flag_type)))
    }

    async fn find_enabled(&self, filter: &FlagFilter) -> Result<Vec<FeatureFlag>> {
        let filter = FlagFilter { status: Some(FlagStatus::Enabled), ..filter.clone() };
        Ok(self.matching(&filter))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.flags
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| FlagError::FlagNotFound(key.to_string()))
    }

    async fn exists_by_key(&self, key: &str) -> Result<bool> {
        Ok(self.flags.contains_key(key))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.flags.len() as u64)
    }

    async fn count_by_status(&self, status: FlagStatus) -> Result<u64> {
        Ok(self.flags.iter().filter(|entry| entry.value().status == status).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for memory::flags.
    use featuregate_domain::FlagValue;

    use super::*;

    fn flag(key: &str) -> FeatureFlag {
        let mut flag =
            FeatureFlag::new(key, "Flag", None, FlagType::Boolean, FlagValue::on(), "tester")
                .unwrap();
        flag.take_events();
        flag
    }

    /// Tests create/find/delete round-trip with the not-found sentinel.
    #[tokio::test]
    async fn test_round_trip() {
        let repo = InMemoryFlagRepository::new();
        let flag = flag("beta-login");

        repo.create(&flag).await.unwrap();
        assert!(repo.exists_by_key("beta-login").await.unwrap());
        assert_eq!(repo.find_by_key("beta-login").await.unwrap().id, flag.id);
        assert_eq!(repo.find_by_id(flag.id).await.unwrap().key(), "beta-login");

        repo.delete("beta-login").await.unwrap();
        assert!(matches!(
            repo.find_by_key("beta-login").await,
            Err(FlagError::FlagNotFound(_))
        ));
        assert!(matches!(repo.delete("beta-login").await, Err(FlagError::FlagNotFound(_))));
    }

    /// Tests that duplicate keys are rejected.
    #[tokio::test]
    async fn test_duplicate_key() {
        let repo = InMemoryFlagRepository::new();
        repo.create(&flag("beta-login")).await.unwrap();

        assert!(matches!(
            repo.create(&flag("beta-login")).await,
            Err(FlagError::FlagExists(_))
        ));
    }

    /// Tests optimistic concurrency: a stale writer loses.
    #[tokio::test]
    async fn test_optimistic_locking() {
        let repo = InMemoryFlagRepository::new();
        let base = flag("beta-login");
        repo.create(&base).await.unwrap();

        // Writer A mutates and persists.
        let mut writer_a = repo.find_by_key("beta-login").await.unwrap();
        writer_a.enable("a").unwrap();
        repo.update(&writer_a).await.unwrap();

        // Writer B started from the same snapshot; its version is stale.
        let mut writer_b = base.clone();
        writer_b.enable("b").unwrap();
        assert!(matches!(
            repo.update(&writer_b).await,
            Err(FlagError::OptimisticLockFailed(_))
        ));
    }

    /// Tests filtered listing by status, type and tags.
    #[tokio::test]
    async fn test_filters() {
        let repo = InMemoryFlagRepository::new();

        let mut enabled = flag("enabled-flag");
        enabled.enable("t").unwrap();
        enabled.set_tags(["checkout"], "t").unwrap();
        repo.create(&enabled).await.unwrap();
        repo.create(&flag("disabled-flag")).await.unwrap();

        let enabled_only = repo.find_enabled(&FlagFilter::default()).await.unwrap();
        assert_eq!(enabled_only.len(), 1);
        assert_eq!(enabled_only[0].key(), "enabled-flag");

        let tagged = repo.find_by_tags(&["checkout".to_string()]).await.unwrap();
        assert_eq!(tagged.len(), 1);

        assert_eq!(repo.count().await.unwrap(), 2);
        assert_eq!(repo.count_by_status(FlagStatus::Disabled).await.unwrap(), 1);
    }

    /// Tests pagination ordering by key.
    #[tokio::test]
    async fn test_pagination() {
        let repo = InMemoryFlagRepository::new();
        for key in ["cc", "aa", "bb"] {
            repo.create(&flag(key)).await.unwrap();
        }

        let filter = FlagFilter { limit: Some(2), offset: 1, ..FlagFilter::default() };
        let page = repo.find_all(&filter).await.unwrap();
        let keys: Vec<&str> = page.iter().map(FeatureFlag::key).collect();
        assert_eq!(keys, vec!["bb", "cc"]);
    }
}
