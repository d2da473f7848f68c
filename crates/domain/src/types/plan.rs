//! Subscription plan tiers

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{FlagError, Result};

/// Subscription tier gate, totally ordered: free < basic < pro <
/// enterprise. A context without a plan sits below every tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    Free,
    Basic,
    Pro,
    Enterprise,
}

impl SubscriptionPlan {
    /// Wire spelling of the plan.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }

    /// Lenient parse used for context plans: unknown spellings mean "no
    /// plan" rather than an error.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        Self::from_str(s.trim().to_lowercase().as_str()).ok()
    }
}

impl std::fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubscriptionPlan {
    type Err = FlagError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "free" => Ok(Self::Free),
            "basic" => Ok(Self::Basic),
            "pro" => Ok(Self::Pro),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(FlagError::InvalidPlan(other.to_string())),
        }
    }
}

/// Whether `candidate` meets a flag's `required` plan. `None` (no plan
/// on the context) never satisfies a requirement.
pub fn plan_satisfies(candidate: Option<SubscriptionPlan>, required: SubscriptionPlan) -> bool {
    candidate.is_some_and(|plan| plan >= required)
}
