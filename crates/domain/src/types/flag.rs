//! Feature flag aggregate root
//!
//! Flags are global (not tenant-scoped); tenancy enters evaluation only
//! via overrides. Every state-changing operation validates its input,
//! rejects mutation of archived flags, bumps the optimistic-concurrency
//! version and appends a typed domain event to a transient buffer the
//! service layer drains into the outbox.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::plan::SubscriptionPlan;
use super::rule::TargetingRule;
use super::value::FlagValue;
use crate::errors::{FlagError, Result};
use crate::events::{DomainEvent, FlagEventType};

/// Maximum length of a flag key.
pub const MAX_KEY_LENGTH: usize = 100;
/// Maximum length of a flag name.
pub const MAX_NAME_LENGTH: usize = 200;

static KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_.-]*$").expect("key pattern is valid"));

/// Evaluation semantics of a flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagType {
    Boolean,
    Percentage,
    Variant,
    UserSegment,
}

impl FlagType {
    /// Wire spelling of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Percentage => "percentage",
            Self::Variant => "variant",
            Self::UserSegment => "user_segment",
        }
    }
}

impl std::fmt::Display for FlagType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FlagType {
    type Err = FlagError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "boolean" => Ok(Self::Boolean),
            "percentage" => Ok(Self::Percentage),
            "variant" => Ok(Self::Variant),
            "user_segment" => Ok(Self::UserSegment),
            other => Err(FlagError::InvalidFlagType(other.to_string())),
        }
    }
}

/// Lifecycle state of a flag
///
/// Transitions: `disabled ↔ enabled`, and either may move to `archived`,
/// which is terminal for mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagStatus {
    Enabled,
    Disabled,
    Archived,
}

impl FlagStatus {
    /// Wire spelling of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Archived => "archived",
        }
    }
}

impl std::fmt::Display for FlagStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FlagStatus {
    type Err = FlagError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "enabled" => Ok(Self::Enabled),
            "disabled" => Ok(Self::Disabled),
            "archived" => Ok(Self::Archived),
            other => Err(FlagError::InvalidStatus(other.to_string())),
        }
    }
}

/// Feature flag aggregate root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFlag {
    pub id: Uuid,
    key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub flag_type: FlagType,
    pub status: FlagStatus,
    pub default_value: FlagValue,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    rules: Vec<TargetingRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_plan: Option<SubscriptionPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
    #[serde(skip)]
    pending_events: Vec<DomainEvent>,
}

impl FeatureFlag {
    /// Create a new flag. Flags start disabled with version 1 and emit
    /// `FlagCreated`.
    pub fn new(
        key: impl AsRef<str>,
        name: impl Into<String>,
        description: Option<String>,
        flag_type: FlagType,
        default_value: FlagValue,
        created_by: impl Into<String>,
    ) -> Result<Self> {
        let key = normalize_key(key.as_ref())?;
        let name = validate_name(name.into())?;
        let created_by = created_by.into();
        let now = Utc::now();

        let mut flag = Self {
            id: Uuid::new_v4(),
            key,
            name,
            description,
            flag_type,
            status: FlagStatus::Disabled,
            default_value,
            rules: Vec::new(),
            tags: Vec::new(),
            required_plan: None,
            created_by: Some(created_by.clone()),
            updated_by: Some(created_by),
            created_at: now,
            updated_at: now,
            version: 1,
            pending_events: Vec::new(),
        };

        let payload = json!({
            "key": flag.key,
            "name": flag.name,
            "type": flag.flag_type,
            "status": flag.status,
        });
        flag.record_event(FlagEventType::FlagCreated, payload);
        Ok(flag)
    }

    /// Normalized flag key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Rules ordered by ascending priority.
    pub fn rules(&self) -> &[TargetingRule] {
        &self.rules
    }

    /// Normalized tags in first-seen order.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Whether the flag is currently enabled.
    pub fn is_enabled(&self) -> bool {
        self.status == FlagStatus::Enabled
    }

    /// Look up a rule by id.
    pub fn rule(&self, rule_id: &str) -> Option<&TargetingRule> {
        self.rules.iter().find(|rule| rule.rule_id == rule_id)
    }

    /// Drain the pending domain events.
    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Pending (not yet drained) domain events.
    pub fn pending_events(&self) -> &[DomainEvent] {
        &self.pending_events
    }

    /// Update name and/or description.
    pub fn update_details(
        &mut self,
        name: Option<String>,
        description: Option<String>,
        updated_by: impl Into<String>,
    ) -> Result<()> {
        self.ensure_mutable()?;

        if let Some(name) = name {
            self.name = validate_name(name)?;
        }
        if let Some(description) = description {
            self.description = Some(description);
        }

        self.touch(updated_by);
        let payload = json!({"key": self.key, "name": self.name, "description": self.description});
        self.record_event(FlagEventType::FlagUpdated, payload);
        Ok(())
    }

    /// Replace the default value, emitting the detailed update event with
    /// the old and new values.
    pub fn set_default_value(
        &mut self,
        value: FlagValue,
        updated_by: impl Into<String>,
    ) -> Result<()> {
        self.ensure_mutable()?;

        let old_value = std::mem::replace(&mut self.default_value, value);

        self.touch(updated_by);
        let payload = json!({
            "key": self.key,
            "old_value": old_value,
            "new_value": self.default_value,
        });
        self.record_event(FlagEventType::FlagUpdatedWithDetails, payload);
        Ok(())
    }

    /// Add a targeting rule; rule ids must be unique within the flag.
    pub fn add_rule(&mut self, rule: TargetingRule, updated_by: impl Into<String>) -> Result<()> {
        self.ensure_mutable()?;
        rule.validate()?;

        if self.rule(&rule.rule_id).is_some() {
            return Err(FlagError::DuplicateRuleId(rule.rule_id));
        }

        let rule_id = rule.rule_id.clone();
        self.rules.push(rule);
        self.sort_rules();

        self.touch(updated_by);
        let payload = json!({"key": self.key, "rule_added": rule_id});
        self.record_event(FlagEventType::FlagUpdated, payload);
        Ok(())
    }

    /// Replace an existing rule, matched by id.
    pub fn update_rule(&mut self, rule: TargetingRule, updated_by: impl Into<String>) -> Result<()> {
        self.ensure_mutable()?;
        rule.validate()?;

        let position = self
            .rules
            .iter()
            .position(|existing| existing.rule_id == rule.rule_id)
            .ok_or_else(|| FlagError::RuleNotFound(rule.rule_id.clone()))?;

        let rule_id = rule.rule_id.clone();
        self.rules[position] = rule;
        self.sort_rules();

        self.touch(updated_by);
        let payload = json!({"key": self.key, "rule_updated": rule_id});
        self.record_event(FlagEventType::FlagUpdated, payload);
        Ok(())
    }

    /// Remove a rule by id.
    pub fn remove_rule(&mut self, rule_id: &str, updated_by: impl Into<String>) -> Result<()> {
        self.ensure_mutable()?;

        let position = self
            .rules
            .iter()
            .position(|rule| rule.rule_id == rule_id)
            .ok_or_else(|| FlagError::RuleNotFound(rule_id.to_string()))?;
        self.rules.remove(position);

        self.touch(updated_by);
        let payload = json!({"key": self.key, "rule_removed": rule_id});
        self.record_event(FlagEventType::FlagUpdated, payload);
        Ok(())
    }

    /// Remove all rules.
    pub fn clear_rules(&mut self, updated_by: impl Into<String>) -> Result<()> {
        self.ensure_mutable()?;

        self.rules.clear();

        self.touch(updated_by);
        let payload = json!({"key": self.key, "rules_cleared": true});
        self.record_event(FlagEventType::FlagUpdated, payload);
        Ok(())
    }

    /// Replace the tag set; tags are trimmed, lowercased and deduplicated
    /// preserving first-seen order.
    pub fn set_tags<I, S>(&mut self, tags: I, updated_by: impl Into<String>) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_mutable()?;

        self.tags = normalize_tags(tags);

        self.touch(updated_by);
        let payload = json!({"key": self.key, "tags": self.tags});
        self.record_event(FlagEventType::FlagUpdated, payload);
        Ok(())
    }

    /// Add a single tag; a no-op when the normalized tag is already set.
    pub fn add_tag(&mut self, tag: &str, updated_by: impl Into<String>) -> Result<()> {
        self.ensure_mutable()?;

        let normalized = tag.trim().to_lowercase();
        if normalized.is_empty() || self.tags.contains(&normalized) {
            return Ok(());
        }
        self.tags.push(normalized);

        self.touch(updated_by);
        let payload = json!({"key": self.key, "tags": self.tags});
        self.record_event(FlagEventType::FlagUpdated, payload);
        Ok(())
    }

    /// Remove a single tag; a no-op when absent.
    pub fn remove_tag(&mut self, tag: &str, updated_by: impl Into<String>) -> Result<()> {
        self.ensure_mutable()?;

        let normalized = tag.trim().to_lowercase();
        let before = self.tags.len();
        self.tags.retain(|existing| existing != &normalized);
        if self.tags.len() == before {
            return Ok(());
        }

        self.touch(updated_by);
        let payload = json!({"key": self.key, "tags": self.tags});
        self.record_event(FlagEventType::FlagUpdated, payload);
        Ok(())
    }

    /// Set or clear the subscription-plan gate.
    pub fn set_required_plan(
        &mut self,
        plan: Option<SubscriptionPlan>,
        updated_by: impl Into<String>,
    ) -> Result<()> {
        self.ensure_mutable()?;

        self.required_plan = plan;

        self.touch(updated_by);
        let payload = json!({"key": self.key, "required_plan": self.required_plan});
        self.record_event(FlagEventType::FlagUpdated, payload);
        Ok(())
    }

    /// Enable the flag.
    pub fn enable(&mut self, updated_by: impl Into<String>) -> Result<()> {
        match self.status {
            FlagStatus::Archived => Err(FlagError::CannotEnable(self.key.clone())),
            FlagStatus::Enabled => Err(FlagError::AlreadyEnabled(self.key.clone())),
            FlagStatus::Disabled => {
                self.status = FlagStatus::Enabled;
                self.touch(updated_by);
                let payload = json!({"key": self.key});
                self.record_event(FlagEventType::FlagEnabled, payload);
                Ok(())
            }
        }
    }

    /// Disable the flag.
    pub fn disable(&mut self, updated_by: impl Into<String>) -> Result<()> {
        match self.status {
            FlagStatus::Archived => Err(FlagError::CannotDisable(self.key.clone())),
            FlagStatus::Disabled => Err(FlagError::AlreadyDisabled(self.key.clone())),
            FlagStatus::Enabled => {
                self.status = FlagStatus::Disabled;
                self.touch(updated_by);
                let payload = json!({"key": self.key});
                self.record_event(FlagEventType::FlagDisabled, payload);
                Ok(())
            }
        }
    }

    /// Archive the flag; terminal for mutation.
    pub fn archive(&mut self, updated_by: impl Into<String>) -> Result<()> {
        if self.status == FlagStatus::Archived {
            return Err(FlagError::AlreadyArchived(self.key.clone()));
        }

        self.status = FlagStatus::Archived;
        self.touch(updated_by);
        let payload = json!({"key": self.key});
        self.record_event(FlagEventType::FlagArchived, payload);
        Ok(())
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.status == FlagStatus::Archived {
            return Err(FlagError::CannotUpdate(self.key.clone()));
        }
        Ok(())
    }

    fn sort_rules(&mut self) {
        self.rules.sort_by_key(|rule| rule.priority);
    }

    fn touch(&mut self, updated_by: impl Into<String>) {
        self.updated_by = Some(updated_by.into());
        self.updated_at = Utc::now();
        self.version += 1;
    }

    fn record_event(&mut self, event_type: FlagEventType, payload: serde_json::Value) {
        self.pending_events.push(DomainEvent::new(event_type, self.key.clone(), payload));
    }
}

fn normalize_key(raw: &str) -> Result<String> {
    let key = raw.trim().to_lowercase();
    if key.is_empty() || key.len() > MAX_KEY_LENGTH {
        return Err(FlagError::InvalidKey(raw.to_string()));
    }
    if !KEY_PATTERN.is_match(&key) {
        return Err(FlagError::InvalidKey(raw.to_string()));
    }
    Ok(key)
}

fn validate_name(name: String) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_NAME_LENGTH {
        return Err(FlagError::InvalidName(name));
    }
    Ok(trimmed.to_string())
}

fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}
