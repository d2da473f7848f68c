//! Domain events emitted by flag and override mutations
//!
//! Events drive cache invalidation and external audit through the
//! transactional outbox. Flags are global, so every event carries the
//! nil tenant id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Aggregate type stamped on every emitted event.
pub const AGGREGATE_TYPE: &str = "FeatureFlag";

/// Typed domain event names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlagEventType {
    FlagCreated,
    FlagUpdated,
    FlagUpdatedWithDetails,
    FlagEnabled,
    FlagDisabled,
    FlagArchived,
    OverrideCreated,
    OverrideUpdated,
    OverrideRemoved,
}

impl std::fmt::Display for FlagEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::FlagCreated => "FlagCreated",
            Self::FlagUpdated => "FlagUpdated",
            Self::FlagUpdatedWithDetails => "FlagUpdatedWithDetails",
            Self::FlagEnabled => "FlagEnabled",
            Self::FlagDisabled => "FlagDisabled",
            Self::FlagArchived => "FlagArchived",
            Self::OverrideCreated => "OverrideCreated",
            Self::OverrideUpdated => "OverrideUpdated",
            Self::OverrideRemoved => "OverrideRemoved",
        };
        write!(f, "{name}")
    }
}

/// Domain event carried to the outbox after a successful mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub event_type: FlagEventType,
    pub aggregate_type: String,
    /// Flag key for flag events, override id for override events
    pub aggregate_id: String,
    /// Nil UUID: flags are global, tenancy enters only via overrides
    pub tenant_id: Uuid,
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent {
    /// Create an event for the global flag aggregate.
    pub fn new(event_type: FlagEventType, aggregate_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event_type,
            aggregate_type: AGGREGATE_TYPE.to_string(),
            aggregate_id: aggregate_id.into(),
            tenant_id: Uuid::nil(),
            payload,
            occurred_at: Utc::now(),
        }
    }
}
