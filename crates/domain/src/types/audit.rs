//! Flag audit trail records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Best-effort record of who changed a flag and how
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagAuditLog {
    pub id: Uuid,
    pub flag_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl FlagAuditLog {
    /// Create a record for an action on a flag.
    pub fn new(
        flag_key: impl Into<String>,
        user_id: Option<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            flag_key: flag_key.into(),
            user_id,
            action: action.into(),
            old_value: None,
            new_value: None,
            created_at: Utc::now(),
        }
    }

    /// Attach the pre-mutation state.
    #[must_use]
    pub fn with_old_value(mut self, value: serde_json::Value) -> Self {
        self.old_value = Some(value);
        self
    }

    /// Attach the post-mutation state.
    #[must_use]
    pub fn with_new_value(mut self, value: serde_json::Value) -> Self {
        self.new_value = Some(value);
        self
    }
}
