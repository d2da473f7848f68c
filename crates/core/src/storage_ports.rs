//! Storage ports consumed by the evaluation core
//!
//! Persistence engines live behind these traits; the core never sees a
//! concrete database. "Row absent" funnels through the dedicated
//! not-found error kinds so callers can distinguish it from
//! infrastructure failure.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use featuregate_domain::{
    AuditFilter, FeatureFlag, FlagAuditLog, FlagFilter, FlagOverride, FlagStatus, FlagType,
    OutboxEntry, OverrideFilter, Result, TargetType,
};
use uuid::Uuid;

/// Port for the global flag store.
///
/// Flags are global aggregates; implementations must not scope queries
/// by tenant.
#[async_trait]
pub trait FeatureFlagRepository: Send + Sync {
    /// Persist a new flag; `flag_exists` when the key is taken.
    async fn create(&self, flag: &FeatureFlag) -> Result<()>;

    /// Persist a mutated flag using optimistic concurrency on `version`;
    /// `optimistic_lock_failed` when the expected version does not match.
    async fn update(&self, flag: &FeatureFlag) -> Result<()>;

    /// Load a flag by key; `flag_not_found` when absent.
    async fn find_by_key(&self, key: &str) -> Result<FeatureFlag>;

    /// Load a flag by id; `flag_not_found` when absent.
    async fn find_by_id(&self, id: Uuid) -> Result<FeatureFlag>;

    /// List flags matching the filter.
    async fn find_all(&self, filter: &FlagFilter) -> Result<Vec<FeatureFlag>>;

    /// List flags in the given lifecycle state.
    async fn find_by_status(&self, status: FlagStatus) -> Result<Vec<FeatureFlag>>;

    /// List flags carrying all of the given tags.
    async fn find_by_tags(&self, tags: &[String]) -> Result<Vec<FeatureFlag>>;

    /// List flags of the given type.
    async fn find_by_type(&self, flag_type: FlagType) -> Result<Vec<FeatureFlag>>;

    /// List enabled flags matching the filter.
    async fn find_enabled(&self, filter: &FlagFilter) -> Result<Vec<FeatureFlag>>;

    /// Delete a flag by key; `flag_not_found` when absent.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Whether a flag with the key exists.
    async fn exists_by_key(&self, key: &str) -> Result<bool>;

    /// Total number of flags.
    async fn count(&self) -> Result<u64>;

    /// Number of flags in the given lifecycle state.
    async fn count_by_status(&self, status: FlagStatus) -> Result<u64>;
}

/// Port for the override store.
#[async_trait]
pub trait FlagOverrideRepository: Send + Sync {
    /// Persist a new override; `override_exists` when an active override
    /// already targets the same `(flag, target)` triple.
    async fn create(&self, entry: &FlagOverride) -> Result<()>;

    /// Persist an updated override; `override_not_found` when absent.
    async fn update(&self, entry: &FlagOverride) -> Result<()>;

    /// Load an override by id; `override_not_found` when absent.
    async fn find_by_id(&self, id: Uuid) -> Result<FlagOverride>;

    /// List overrides for a flag.
    async fn find_by_flag_key(
        &self,
        flag_key: &str,
        filter: &OverrideFilter,
    ) -> Result<Vec<FlagOverride>>;

    /// List overrides targeting one user or tenant across flags.
    async fn find_by_target(
        &self,
        target_type: TargetType,
        target_id: &str,
        filter: &OverrideFilter,
    ) -> Result<Vec<FlagOverride>>;

    /// Point lookup for evaluation; absence is an expected outcome, not
    /// an error.
    async fn find_by_flag_key_and_target(
        &self,
        flag_key: &str,
        target_type: TargetType,
        target_id: &str,
    ) -> Result<Option<FlagOverride>>;

    /// Overrides whose expiry has passed as of `as_of`.
    async fn find_expired(&self, as_of: DateTime<Utc>) -> Result<Vec<FlagOverride>>;

    /// Overrides still active as of `as_of`.
    async fn find_active(&self, as_of: DateTime<Utc>) -> Result<Vec<FlagOverride>>;

    /// Delete an override by id; `override_not_found` when absent.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Delete all overrides of a flag, returning how many were removed.
    async fn delete_by_flag_key(&self, flag_key: &str) -> Result<u64>;

    /// Delete expired overrides, returning the purged entries so callers
    /// can invalidate their cache entries.
    async fn delete_expired(&self, as_of: DateTime<Utc>) -> Result<Vec<FlagOverride>>;

    /// Total number of overrides.
    async fn count(&self) -> Result<u64>;

    /// Number of overrides for one flag.
    async fn count_by_flag_key(&self, flag_key: &str) -> Result<u64>;
}

/// Port for the audit trail. Writes are best-effort at call sites:
/// failures are logged, never propagated.
#[async_trait]
pub trait FlagAuditLogRepository: Send + Sync {
    /// Persist one audit record.
    async fn create(&self, entry: &FlagAuditLog) -> Result<()>;

    /// Persist a batch of audit records.
    async fn create_batch(&self, entries: &[FlagAuditLog]) -> Result<()>;

    /// Records for one flag, newest first.
    async fn find_by_flag_key(
        &self,
        flag_key: &str,
        filter: &AuditFilter,
    ) -> Result<Vec<FlagAuditLog>>;

    /// Records produced by one user, newest first.
    async fn find_by_user_id(
        &self,
        user_id: &str,
        filter: &AuditFilter,
    ) -> Result<Vec<FlagAuditLog>>;

    /// Records for one action, newest first.
    async fn find_by_action(&self, action: &str, filter: &AuditFilter)
        -> Result<Vec<FlagAuditLog>>;

    /// All records, newest first.
    async fn find_all(&self, filter: &AuditFilter) -> Result<Vec<FlagAuditLog>>;

    /// Total number of records.
    async fn count(&self) -> Result<u64>;

    /// Number of records for one flag.
    async fn count_by_flag_key(&self, flag_key: &str) -> Result<u64>;
}

/// Port for the transactional outbox. The core only appends; an external
/// relay drains entries to the bus and retries failures.
#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Append entries atomically.
    async fn save(&self, entries: &[OutboxEntry]) -> Result<()>;
}
