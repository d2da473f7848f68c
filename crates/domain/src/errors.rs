//! Error types used throughout the feature flag service
//!
//! Every failure carries a machine-readable `kind` tag on the wire so
//! callers can branch without string matching. Evaluation treats
//! `flag_not_found` as a caller-safe outcome, not an infrastructure
//! failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for FeatureGate
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FlagError {
    #[error("flag not found: {0}")]
    FlagNotFound(String),

    #[error("override not found: {0}")]
    OverrideNotFound(String),

    #[error("flag already exists: {0}")]
    FlagExists(String),

    #[error("an active override already exists for target: {0}")]
    OverrideExists(String),

    #[error("flag is archived: {0}")]
    FlagArchived(String),

    #[error("optimistic lock failed: {0}")]
    OptimisticLockFailed(String),

    #[error("invalid flag key: {0}")]
    InvalidKey(String),

    #[error("invalid flag name: {0}")]
    InvalidName(String),

    #[error("invalid flag type: {0}")]
    InvalidFlagType(String),

    #[error("invalid flag status: {0}")]
    InvalidStatus(String),

    #[error("invalid condition operator: {0}")]
    InvalidOperator(String),

    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    #[error("invalid percentage: {0}")]
    InvalidPercentage(String),

    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error("invalid expiry: {0}")]
    InvalidExpiresAt(String),

    #[error("invalid target type: {0}")]
    InvalidTargetType(String),

    #[error("invalid target id: {0}")]
    InvalidTargetId(String),

    #[error("invalid subscription plan: {0}")]
    InvalidPlan(String),

    #[error("flag is already enabled: {0}")]
    AlreadyEnabled(String),

    #[error("flag is already disabled: {0}")]
    AlreadyDisabled(String),

    #[error("flag is already archived: {0}")]
    AlreadyArchived(String),

    #[error("cannot update archived flag: {0}")]
    CannotUpdate(String),

    #[error("cannot enable archived flag: {0}")]
    CannotEnable(String),

    #[error("cannot disable archived flag: {0}")]
    CannotDisable(String),

    #[error("duplicate rule id: {0}")]
    DuplicateRuleId(String),

    #[error("rule not found: {0}")]
    RuleNotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("evaluation error: {0}")]
    EvaluationError(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

/// Result type alias for FeatureGate operations
pub type Result<T> = std::result::Result<T, FlagError>;
