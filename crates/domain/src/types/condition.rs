//! Targeting rule conditions

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{FlagError, Result};

/// Comparison operator applied by a [`Condition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    In,
    NotIn,
    Contains,
    GreaterThan,
    LessThan,
}

impl ConditionOperator {
    /// Wire spelling of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Contains => "contains",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
        }
    }
}

impl std::fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConditionOperator {
    type Err = FlagError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "equals" => Ok(Self::Equals),
            "not_equals" => Ok(Self::NotEquals),
            "in" => Ok(Self::In),
            "not_in" => Ok(Self::NotIn),
            "contains" => Ok(Self::Contains),
            "greater_than" => Ok(Self::GreaterThan),
            "less_than" => Ok(Self::LessThan),
            other => Err(FlagError::InvalidOperator(other.to_string())),
        }
    }
}

/// Single predicate over the evaluation context
///
/// Construction validates the attribute name and the value list; the
/// operator semantics live in the condition matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub attribute: String,
    pub operator: ConditionOperator,
    pub values: Vec<String>,
}

impl Condition {
    /// Create a validated condition.
    pub fn new(
        attribute: impl Into<String>,
        operator: ConditionOperator,
        values: Vec<String>,
    ) -> Result<Self> {
        let condition = Self { attribute: attribute.into(), operator, values };
        condition.validate()?;
        Ok(condition)
    }

    /// Check the construction invariants.
    pub fn validate(&self) -> Result<()> {
        if self.attribute.trim().is_empty() {
            return Err(FlagError::InvalidCondition("attribute must not be empty".to_string()));
        }
        if self.values.is_empty() {
            return Err(FlagError::InvalidCondition(format!(
                "condition on '{}' has no values",
                self.attribute
            )));
        }
        Ok(())
    }
}
