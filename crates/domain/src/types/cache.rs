//! Cache invalidation protocol types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::overrides::TargetType;

/// What a cache invalidation message asks subscribers to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheAction {
    Updated,
    Deleted,
    OverrideUpdated,
    OverrideDeleted,
    InvalidateAll,
}

/// Message fanned out on the invalidation channel after a mutation
///
/// Messages are idempotent and tolerate out-of-order delivery: deletes
/// commute with each other and with subsequent reads, and the publisher
/// writes the shared tier before publishing, so dropping the local entry
/// is always safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheUpdateMessage {
    pub action: CacheAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<TargetType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl CacheUpdateMessage {
    fn new(action: CacheAction, flag_key: Option<String>) -> Self {
        Self { action, flag_key, target_type: None, target_id: None, timestamp: Utc::now() }
    }

    /// A flag was created or updated.
    pub fn updated(flag_key: impl Into<String>) -> Self {
        Self::new(CacheAction::Updated, Some(flag_key.into()))
    }

    /// A flag was deleted or its cache entry must be dropped.
    pub fn deleted(flag_key: impl Into<String>) -> Self {
        Self::new(CacheAction::Deleted, Some(flag_key.into()))
    }

    /// An override was created or updated.
    pub fn override_updated(
        flag_key: impl Into<String>,
        target_type: TargetType,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            target_type: Some(target_type),
            target_id: Some(target_id.into()),
            ..Self::new(CacheAction::OverrideUpdated, Some(flag_key.into()))
        }
    }

    /// An override was removed.
    pub fn override_deleted(
        flag_key: impl Into<String>,
        target_type: TargetType,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            target_type: Some(target_type),
            target_id: Some(target_id.into()),
            ..Self::new(CacheAction::OverrideDeleted, Some(flag_key.into()))
        }
    }

    /// Drop every cached entry.
    pub fn invalidate_all() -> Self {
        Self::new(CacheAction::InvalidateAll, None)
    }
}

/// Per-tier hit/miss counters exposed for observability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieredCacheStats {
    pub l1_hits: u64,
    pub l1_misses: u64,
    pub l2_hits: u64,
    pub l2_misses: u64,
    /// Entries currently held in the local tier
    pub entries: u64,
}

impl TieredCacheStats {
    /// Combined hit ratio across both tiers: a request counts as a hit
    /// when either tier served it.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.l1_hits + self.l1_misses;
        if total == 0 {
            return 0.0;
        }
        (self.l1_hits + self.l2_hits) as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for types::cache.
    use super::*;

    /// Tests the invalidation message wire shape.
    #[test]
    fn test_message_wire_shape() {
        let msg = CacheUpdateMessage::override_updated("new-ui", TargetType::User, "user-1");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["action"], "override_updated");
        assert_eq!(json["flag_key"], "new-ui");
        assert_eq!(json["target_type"], "user");
        assert_eq!(json["target_id"], "user-1");
        assert!(json.get("timestamp").is_some());
    }

    /// Tests that invalidate-all omits the per-key fields.
    #[test]
    fn test_invalidate_all_shape() {
        let json = serde_json::to_value(CacheUpdateMessage::invalidate_all()).unwrap();

        assert_eq!(json["action"], "invalidate_all");
        assert!(json.get("flag_key").is_none());
        assert!(json.get("target_type").is_none());
    }

    /// Tests the combined hit ratio, including the L2-rescue case.
    #[test]
    fn test_hit_ratio() {
        let stats = TieredCacheStats { l1_hits: 6, l1_misses: 4, l2_hits: 2, l2_misses: 2, entries: 10 };
        assert_eq!(stats.hit_ratio(), 0.8);

        assert_eq!(TieredCacheStats::default().hit_ratio(), 0.0);
    }
}
