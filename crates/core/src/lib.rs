//! # FeatureGate Core
//!
//! Business logic of the feature flag evaluation core - no
//! infrastructure dependencies.
//!
//! This crate contains:
//! - The consistent hash engine and condition matcher
//! - The pure precedence pipeline and the repository-backed evaluator
//! - Port/adapter interfaces (traits) for storage, cache and pub/sub
//! - The service facades for evaluation and mutation
//!
//! ## Architecture Principles
//! - Only depends on `featuregate-domain`
//! - No database, network, or cache implementation code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod cache_ports;
pub mod conditions;
pub mod evaluation;
pub mod hash;
pub mod service;
pub mod storage_ports;

// Re-export specific items to avoid ambiguity
pub use cache_ports::{CacheInvalidator, FlagCache, InvalidationCallback, TieredFlagCache};
pub use evaluation::{FlagEvaluator, PureEvaluator, EVALUATE_ALL_SCAN_LIMIT};
pub use service::{EvaluationService, FlagService, MAX_BATCH_SIZE};
pub use storage_ports::{
    FeatureFlagRepository, FlagAuditLogRepository, FlagOverrideRepository, OutboxRepository,
};
