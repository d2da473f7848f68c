//! Configuration structures for the evaluation core

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{FlagError, Result};

/// Default TTL for flag entries in the shared (L2) cache tier.
pub const DEFAULT_FLAG_TTL: Duration = Duration::from_secs(60);
/// Default TTL for override entries in the shared (L2) cache tier.
pub const DEFAULT_OVERRIDE_TTL: Duration = Duration::from_secs(60);
/// Default TTL for entries in the process-local (L1) cache tier.
pub const DEFAULT_L1_TTL: Duration = Duration::from_secs(10);
/// Default size bound of the process-local (L1) cache tier.
pub const DEFAULT_L1_MAX_SIZE: usize = 10_000;
/// Default pub/sub channel carrying cache invalidation messages.
pub const DEFAULT_PUBSUB_CHANNEL: &str = "feature_flag:updates";

/// Cache tier and invalidation-channel settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// TTL for flag entries in the shared tier
    #[serde(with = "duration_secs")]
    pub flag_ttl: Duration,
    /// TTL for override entries in the shared tier
    #[serde(with = "duration_secs")]
    pub override_ttl: Duration,
    /// TTL for entries in the process-local tier
    #[serde(with = "duration_secs")]
    pub l1_ttl: Duration,
    /// Size bound of the process-local tier
    pub l1_max_size: usize,
    /// Pub/sub channel name for invalidation messages
    pub pubsub_channel: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            flag_ttl: DEFAULT_FLAG_TTL,
            override_ttl: DEFAULT_OVERRIDE_TTL,
            l1_ttl: DEFAULT_L1_TTL,
            l1_max_size: DEFAULT_L1_MAX_SIZE,
            pubsub_channel: DEFAULT_PUBSUB_CHANNEL.to_string(),
        }
    }
}

impl CacheSettings {
    /// Validate the settings, rejecting zero durations and an empty channel.
    pub fn validate(&self) -> Result<()> {
        if self.flag_ttl.is_zero() {
            return Err(FlagError::InvalidDuration("flag_ttl must be positive".to_string()));
        }
        if self.override_ttl.is_zero() {
            return Err(FlagError::InvalidDuration("override_ttl must be positive".to_string()));
        }
        if self.l1_ttl.is_zero() {
            return Err(FlagError::InvalidDuration("l1_ttl must be positive".to_string()));
        }
        if self.pubsub_channel.is_empty() {
            return Err(FlagError::InvalidRequest("pubsub_channel must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Serde adapter storing `Duration` as whole seconds on the wire.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
