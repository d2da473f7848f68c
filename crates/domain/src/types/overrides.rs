//! Per-user / per-tenant flag overrides

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value::FlagValue;
use crate::errors::{FlagError, Result};

/// Override target scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    User,
    Tenant,
}

impl TargetType {
    /// Wire spelling of the target type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Tenant => "tenant",
        }
    }
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = FlagError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Self::User),
            "tenant" => Ok(Self::Tenant),
            other => Err(FlagError::InvalidTargetType(other.to_string())),
        }
    }
}

/// Value replacing normal evaluation for one (flag, target) pair
///
/// At most one active override exists per `(flag_key, target_type,
/// target_id)` triple. An override is active iff `expires_at` is unset
/// or strictly in the future; only active overrides influence
/// evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagOverride {
    pub id: Uuid,
    pub flag_key: String,
    pub target_type: TargetType,
    pub target_id: String,
    pub value: FlagValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FlagOverride {
    /// Create a new override. `expires_at`, when set, must be strictly in
    /// the future.
    pub fn new(
        flag_key: impl Into<String>,
        target_type: TargetType,
        target_id: impl Into<String>,
        value: FlagValue,
        reason: Option<String>,
        expires_at: Option<DateTime<Utc>>,
        created_by: Option<String>,
    ) -> Result<Self> {
        let target_id = target_id.into();
        if target_id.trim().is_empty() {
            return Err(FlagError::InvalidTargetId("target id must not be empty".to_string()));
        }

        let now = Utc::now();
        validate_expiry(expires_at, now)?;

        Ok(Self {
            id: Uuid::new_v4(),
            flag_key: flag_key.into(),
            target_type,
            target_id,
            value,
            reason,
            expires_at,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether the override participates in evaluation at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |deadline| deadline > now)
    }

    /// Replace value, reason and expiry. A new `expires_at` must be
    /// strictly in the future.
    pub fn update(
        &mut self,
        value: FlagValue,
        reason: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let now = Utc::now();
        validate_expiry(expires_at, now)?;

        self.value = value;
        self.reason = reason;
        self.expires_at = expires_at;
        self.updated_at = now;
        Ok(())
    }
}

fn validate_expiry(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<()> {
    if let Some(deadline) = expires_at {
        if deadline <= now {
            return Err(FlagError::InvalidExpiresAt(format!(
                "expiry {deadline} is not in the future"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    //! Unit tests for types::overrides.
    use chrono::Duration;

    use super::*;

    fn override_for(expires_at: Option<DateTime<Utc>>) -> Result<FlagOverride> {
        FlagOverride::new(
            "new-ui",
            TargetType::User,
            "user-1",
            FlagValue::off(),
            Some("support escalation".to_string()),
            expires_at,
            Some("alice".to_string()),
        )
    }

    /// Tests that expiry must be strictly in the future at creation.
    #[test]
    fn test_expiry_must_be_future() {
        assert!(override_for(None).is_ok());
        assert!(override_for(Some(Utc::now() + Duration::hours(1))).is_ok());
        assert!(matches!(
            override_for(Some(Utc::now() - Duration::seconds(1))),
            Err(FlagError::InvalidExpiresAt(_))
        ));
    }

    /// Tests activity around the expiry boundary.
    #[test]
    fn test_is_active() {
        let now = Utc::now();
        let active = override_for(Some(now + Duration::hours(1))).unwrap();
        assert!(active.is_active(now));
        assert!(!active.is_active(now + Duration::hours(2)));

        // Expiry equal to "now" counts as expired.
        assert!(!active.is_active(now + Duration::hours(1)));

        let unbounded = override_for(None).unwrap();
        assert!(unbounded.is_active(now + Duration::days(365)));
    }

    /// Tests that target ids must be non-empty.
    #[test]
    fn test_target_id_validation() {
        let result = FlagOverride::new(
            "new-ui",
            TargetType::Tenant,
            "  ",
            FlagValue::on(),
            None,
            None,
            None,
        );
        assert!(matches!(result, Err(FlagError::InvalidTargetId(_))));
    }

    /// Tests update expiry validation.
    #[test]
    fn test_update_validates_expiry() {
        let mut ovr = override_for(None).unwrap();

        let past = Some(Utc::now() - Duration::minutes(5));
        assert!(matches!(
            ovr.update(FlagValue::on(), None, past),
            Err(FlagError::InvalidExpiresAt(_))
        ));

        ovr.update(FlagValue::on(), None, Some(Utc::now() + Duration::minutes(5))).unwrap();
        assert!(ovr.value.enabled);
    }

    /// Tests the override wire shape.
    #[test]
    fn test_wire_shape() {
        let ovr = override_for(None).unwrap();
        let json = serde_json::to_value(&ovr).unwrap();

        assert_eq!(json["flag_key"], "new-ui");
        assert_eq!(json["target_type"], "user");
        assert_eq!(json["target_id"], "user-1");
        assert!(json.get("expires_at").is_none());
    }
}
