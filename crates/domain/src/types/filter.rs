//! Repository query filters

use serde::{Deserialize, Serialize};

use super::flag::{FlagStatus, FlagType};
use super::overrides::TargetType;

/// Filter for flag listing queries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagFilter {
    pub status: Option<FlagStatus>,
    pub flag_type: Option<FlagType>,
    pub tags: Vec<String>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl FlagFilter {
    /// Restrict by status.
    #[must_use]
    pub fn with_status(mut self, status: FlagStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restrict by flag type.
    #[must_use]
    pub fn with_type(mut self, flag_type: FlagType) -> Self {
        self.flag_type = Some(flag_type);
        self
    }

    /// Bound the page size.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Filter for override listing queries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverrideFilter {
    pub target_type: Option<TargetType>,
    pub active_only: bool,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// Filter for audit-log queries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditFilter {
    pub limit: Option<usize>,
    pub offset: usize,
}
