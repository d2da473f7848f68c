//! Repository-backed evaluator
//!
//! Wraps the pure pipeline with I/O: read-through cache for flags and
//! overrides, parallel override lookups, batch and evaluate-all fan-out,
//! startup warmup and invalidation helpers. Cache failures never fail an
//! evaluation; they fall through to the next tier and are logged.

use std::sync::Arc;

use featuregate_domain::{
    CacheSettings, EvaluationContext, EvaluationReason, EvaluationResult, FeatureFlag, FlagError,
    FlagFilter, FlagOverride, FlagStatus, FlagValue, TargetType,
};
use futures::future::join_all;
use tracing::{debug, warn};

use super::pure::PureEvaluator;
use crate::cache_ports::FlagCache;
use crate::storage_ports::{FeatureFlagRepository, FlagOverrideRepository};

/// Ceiling on the enabled-flag scan behind `evaluate_all`. Deployments
/// with more enabled flags than this must evaluate batched keys instead;
/// the scan is not cursored.
pub const EVALUATE_ALL_SCAN_LIMIT: usize = 1000;

/// Evaluator orchestrating cache, repositories and the pure pipeline
pub struct FlagEvaluator {
    flags: Arc<dyn FeatureFlagRepository>,
    overrides: Arc<dyn FlagOverrideRepository>,
    cache: Option<Arc<dyn FlagCache>>,
    settings: CacheSettings,
}

impl FlagEvaluator {
    /// Create an evaluator. The cache is optional; every cache
    /// interaction tolerates its absence.
    pub fn new(
        flags: Arc<dyn FeatureFlagRepository>,
        overrides: Arc<dyn FlagOverrideRepository>,
        cache: Option<Arc<dyn FlagCache>>,
        settings: CacheSettings,
    ) -> Self {
        Self { flags, overrides, cache, settings }
    }

    /// Evaluate one flag for one context.
    ///
    /// Infrastructure failures surface as a result with reason `error`
    /// and the transient error attached; a missing flag is the
    /// caller-safe `flag_not_found` outcome.
    pub async fn evaluate(
        &self,
        key: &str,
        context: Option<&EvaluationContext>,
    ) -> EvaluationResult {
        let flag = match self.load_flag(key).await {
            Ok(Some(flag)) => flag,
            Ok(None) => {
                return PureEvaluator::evaluate(key, None, context, None, None);
            }
            Err(err) => {
                warn!(key, error = %err, "flag load failed");
                return EvaluationResult::new(key, FlagValue::off(), EvaluationReason::Error)
                    .with_error(FlagError::EvaluationError(err.to_string()));
            }
        };

        self.evaluate_loaded(&flag, context).await
    }

    /// Evaluate a batch of keys against one shared context. Results come
    /// back in key order; a failure on one key does not affect the
    /// others.
    pub async fn evaluate_batch(
        &self,
        keys: &[String],
        context: Option<&EvaluationContext>,
    ) -> Vec<EvaluationResult> {
        join_all(keys.iter().map(|key| self.evaluate(key, context))).await
    }

    /// Evaluate every enabled flag for one caller.
    ///
    /// Bounded scan (no cursoring): at most [`EVALUATE_ALL_SCAN_LIMIT`]
    /// flags are considered. The cache is side-populated with every flag
    /// read; overrides are fetched lazily per flag.
    pub async fn evaluate_all(
        &self,
        context: Option<&EvaluationContext>,
    ) -> Result<Vec<EvaluationResult>, FlagError> {
        let filter = FlagFilter::default()
            .with_status(FlagStatus::Enabled)
            .with_limit(EVALUATE_ALL_SCAN_LIMIT);
        let flags = self.flags.find_enabled(&filter).await?;

        let mut results = Vec::with_capacity(flags.len());
        for flag in &flags {
            self.populate_flag_cache(flag).await;
            results.push(self.evaluate_loaded(flag, context).await);
        }
        Ok(results)
    }

    /// Load every enabled flag into the cache with the flag TTL.
    /// Returns the number of warmed entries; a no-op without a cache.
    pub async fn warm_cache(&self) -> Result<usize, FlagError> {
        if self.cache.is_none() {
            return Ok(0);
        }

        let filter = FlagFilter::default()
            .with_status(FlagStatus::Enabled)
            .with_limit(EVALUATE_ALL_SCAN_LIMIT);
        let flags = self.flags.find_enabled(&filter).await?;

        for flag in &flags {
            self.populate_flag_cache(flag).await;
        }
        debug!(count = flags.len(), "cache warmed");
        Ok(flags.len())
    }

    /// Drop a flag's cache entry; a no-op without a cache.
    pub async fn invalidate_flag(&self, key: &str) {
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.delete(key).await {
                warn!(key, error = %err, "flag cache invalidation failed");
            }
        }
    }

    /// Drop an override's cache entry; a no-op without a cache.
    pub async fn invalidate_override(
        &self,
        flag_key: &str,
        target_type: TargetType,
        target_id: &str,
    ) {
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.delete_override(flag_key, target_type, target_id).await {
                warn!(flag_key, error = %err, "override cache invalidation failed");
            }
        }
    }

    /// Drop every cache entry; a no-op without a cache.
    pub async fn invalidate_all(&self) {
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.invalidate_all().await {
                warn!(error = %err, "cache flush failed");
            }
        }
    }

    async fn evaluate_loaded(
        &self,
        flag: &FeatureFlag,
        context: Option<&EvaluationContext>,
    ) -> EvaluationResult {
        let key = flag.key();
        let user_id = context.and_then(EvaluationContext::user_id);
        let tenant_id = context.and_then(EvaluationContext::tenant_id);

        // Both override lookups can suspend; run them in parallel.
        let (user_override, tenant_override) = tokio::join!(
            self.load_override_for(key, TargetType::User, user_id),
            self.load_override_for(key, TargetType::Tenant, tenant_id),
        );

        PureEvaluator::evaluate(
            key,
            Some(flag),
            context,
            user_override.as_ref(),
            tenant_override.as_ref(),
        )
    }

    /// Flag lookup protocol: cache, then repository, populating the
    /// cache on a repository hit. A repository "not found" becomes
    /// `Ok(None)`; any other error propagates.
    async fn load_flag(&self, key: &str) -> Result<Option<FeatureFlag>, FlagError> {
        if let Some(cache) = &self.cache {
            match cache.get(key).await {
                Ok(Some(flag)) => return Ok(Some(flag)),
                Ok(None) => {}
                Err(err) => warn!(key, error = %err, "flag cache read failed"),
            }
        }

        match self.flags.find_by_key(key).await {
            Ok(flag) => {
                self.populate_flag_cache(&flag).await;
                Ok(Some(flag))
            }
            Err(FlagError::FlagNotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Override lookup protocol, symmetric to the flag lookup. Lookup
    /// errors are tolerated: the evaluation proceeds without the
    /// override.
    async fn load_override_for(
        &self,
        flag_key: &str,
        target_type: TargetType,
        target_id: Option<&str>,
    ) -> Option<FlagOverride> {
        let target_id = target_id?;

        if let Some(cache) = &self.cache {
            match cache.get_override(flag_key, target_type, target_id).await {
                Ok(Some(entry)) => return Some(entry),
                Ok(None) => {}
                Err(err) => {
                    warn!(flag_key, %target_type, error = %err, "override cache read failed");
                }
            }
        }

        match self.overrides.find_by_flag_key_and_target(flag_key, target_type, target_id).await {
            Ok(Some(entry)) => {
                if let Some(cache) = &self.cache {
                    if let Err(err) = cache.set_override(&entry, self.settings.override_ttl).await {
                        warn!(flag_key, error = %err, "override cache write failed");
                    }
                }
                Some(entry)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(flag_key, %target_type, error = %err, "override lookup failed");
                None
            }
        }
    }

    async fn populate_flag_cache(&self, flag: &FeatureFlag) {
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.set(flag.key(), flag, self.settings.flag_ttl).await {
                warn!(key = flag.key(), error = %err, "flag cache write failed");
            }
        }
    }
}
