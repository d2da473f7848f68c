//! Targeting rules

use serde::{Deserialize, Serialize};

use super::condition::Condition;
use super::value::FlagValue;
use crate::errors::{FlagError, Result};

fn default_percentage() -> u8 {
    100
}

/// Prioritized predicate producing a flag value when it matches
///
/// Lower `priority` means higher precedence. An empty condition list is
/// a catch-all. `percentage` gates matched users through the consistent
/// hash; it defaults to 100 (no gate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetingRule {
    pub rule_id: String,
    pub priority: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    pub value: FlagValue,
    #[serde(default = "default_percentage")]
    pub percentage: u8,
}

impl TargetingRule {
    /// Create a validated rule with the default 100% rollout.
    pub fn new(
        rule_id: impl Into<String>,
        priority: u32,
        conditions: Vec<Condition>,
        value: FlagValue,
    ) -> Result<Self> {
        let rule =
            Self { rule_id: rule_id.into(), priority, conditions, value, percentage: 100 };
        rule.validate()?;
        Ok(rule)
    }

    /// Set the rollout percentage, validating the 0..=100 range.
    pub fn with_percentage(mut self, percentage: u8) -> Result<Self> {
        self.percentage = percentage;
        self.validate()?;
        Ok(self)
    }

    /// Check the construction invariants.
    pub fn validate(&self) -> Result<()> {
        if self.rule_id.trim().is_empty() {
            return Err(FlagError::InvalidCondition("rule id must not be empty".to_string()));
        }
        if self.percentage > 100 {
            return Err(FlagError::InvalidPercentage(format!(
                "rule '{}' percentage {} exceeds 100",
                self.rule_id, self.percentage
            )));
        }
        for condition in &self.conditions {
            condition.validate()?;
        }
        Ok(())
    }
}
