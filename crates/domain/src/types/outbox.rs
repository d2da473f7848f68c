//! Transactional outbox entries
//!
//! Domain events are buffered here and relayed to the external bus by a
//! separate worker; this core only appends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::DomainEvent;

/// Relay status of an outbox entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    Sent,
    Failed,
}

impl std::fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// One buffered domain event awaiting relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: Uuid,
    pub event_type: String,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub tenant_id: Uuid,
    pub payload: serde_json::Value,
    pub status: OutboxStatus,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
}

impl OutboxEntry {
    /// Wrap a domain event for relay.
    pub fn from_event(event: &DomainEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event.event_type.to_string(),
            aggregate_type: event.aggregate_type.clone(),
            aggregate_id: event.aggregate_id.clone(),
            tenant_id: event.tenant_id,
            payload: event.payload.clone(),
            status: OutboxStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at: event.occurred_at,
            sent_at: None,
        }
    }
}
