//! Evaluation results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value::FlagValue;
use crate::errors::FlagError;

/// Why an evaluation produced its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationReason {
    OverrideUser,
    OverrideTenant,
    RuleMatch,
    Percentage,
    Default,
    Disabled,
    PlanRestricted,
    FlagNotFound,
    Error,
}

impl EvaluationReason {
    /// Wire spelling of the reason.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OverrideUser => "override_user",
            Self::OverrideTenant => "override_tenant",
            Self::RuleMatch => "rule_match",
            Self::Percentage => "percentage",
            Self::Default => "default",
            Self::Disabled => "disabled",
            Self::PlanRestricted => "plan_restricted",
            Self::FlagNotFound => "flag_not_found",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for EvaluationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of evaluating one flag for one context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub key: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    pub value: FlagValue,
    pub reason: EvaluationReason,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rule_id: String,
    #[serde(default)]
    pub flag_version: u64,
    pub evaluated_at: DateTime<Utc>,
    /// Transient error detail; never serialized
    #[serde(skip)]
    pub error: Option<FlagError>,
}

impl EvaluationResult {
    /// Build a result from a value, deriving `enabled` and `variant`.
    pub fn new(key: impl Into<String>, value: FlagValue, reason: EvaluationReason) -> Self {
        Self {
            key: key.into(),
            enabled: value.enabled,
            variant: value.variant.clone(),
            value,
            reason,
            rule_id: String::new(),
            flag_version: 0,
            evaluated_at: Utc::now(),
            error: None,
        }
    }

    /// Attach the matched rule id.
    #[must_use]
    pub fn with_rule_id(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = rule_id.into();
        self
    }

    /// Attach the evaluated flag's version.
    #[must_use]
    pub fn with_flag_version(mut self, version: u64) -> Self {
        self.flag_version = version;
        self
    }

    /// Attach a transient error detail.
    #[must_use]
    pub fn with_error(mut self, error: FlagError) -> Self {
        self.error = Some(error);
        self
    }
}
