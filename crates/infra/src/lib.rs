//! # FeatureGate Infra
//!
//! Adapters behind the core's ports:
//! - Tiered cache (process-local L1 over a shared L2) with the
//!   invalidation protocol
//! - In-memory shared cache usable as the L2 tier for single-node
//!   deployments and tests
//! - Broadcast-channel pub/sub invalidator
//! - In-memory repositories for flags, overrides, audit records and the
//!   outbox
//! - Periodic override expiry sweeper

pub mod cache;
pub mod expiry;
pub mod memory;
pub mod pubsub;

pub use cache::{InMemoryFlagCache, TieredCache};
pub use expiry::OverrideExpirySweeper;
pub use memory::{
    InMemoryAuditLogRepository, InMemoryFlagRepository, InMemoryOutboxRepository,
    InMemoryOverrideRepository,
};
pub use pubsub::BroadcastInvalidator;
