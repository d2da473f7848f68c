//! Periodic override expiry sweep
//!
//! Expired overrides never influence evaluation, but their rows and
//! cache entries linger until this sweep purges them and fans out the
//! matching invalidations.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use featuregate_core::{CacheInvalidator, FlagCache, FlagOverrideRepository};
use featuregate_domain::{CacheUpdateMessage, Result};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Background task purging expired overrides
pub struct OverrideExpirySweeper {
    overrides: Arc<dyn FlagOverrideRepository>,
    cache: Option<Arc<dyn FlagCache>>,
    invalidator: Option<Arc<dyn CacheInvalidator>>,
    interval: Duration,
}

impl OverrideExpirySweeper {
    /// Create a sweeper running every `interval`.
    pub fn new(overrides: Arc<dyn FlagOverrideRepository>, interval: Duration) -> Self {
        Self { overrides, cache: None, invalidator: None, interval }
    }

    /// Attach the cache cleared for purged overrides.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn FlagCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Attach the invalidation channel publisher.
    #[must_use]
    pub fn with_invalidator(mut self, invalidator: Arc<dyn CacheInvalidator>) -> Self {
        self.invalidator = Some(invalidator);
        self
    }

    /// Run one sweep, returning how many overrides were purged.
    pub async fn run_once(&self) -> Result<usize> {
        let purged = self.overrides.delete_expired(Utc::now()).await?;

        for entry in &purged {
            if let Some(cache) = &self.cache {
                if let Err(err) = cache
                    .delete_override(&entry.flag_key, entry.target_type, &entry.target_id)
                    .await
                {
                    warn!(flag_key = %entry.flag_key, error = %err, "override cache purge failed");
                }
            }
            if let Some(invalidator) = &self.invalidator {
                let message = CacheUpdateMessage::override_deleted(
                    &entry.flag_key,
                    entry.target_type,
                    &entry.target_id,
                );
                if let Err(err) = invalidator.publish(&message).await {
                    warn!(flag_key = %entry.flag_key, error = %err, "override purge publish failed");
                }
            }
        }

        if !purged.is_empty() {
            info!(count = purged.len(), "expired overrides purged");
        }
        Ok(purged.len())
    }

    /// Spawn the sweep loop; it stops when `shutdown` is cancelled.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = self.run_once().await {
                            warn!(error = %err, "expiry sweep failed");
                        }
                    }
                }
            }
        })
    }
}
