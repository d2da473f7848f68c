//! Evaluation facade
//!
//! Request-level guards and error classification on top of the
//! evaluator. A missing flag stays a caller-safe result; infrastructure
//! failures become structured `evaluation_error`s.

use std::collections::HashMap;
use std::sync::Arc;

use featuregate_domain::{EvaluationContext, EvaluationReason, EvaluationResult, FlagError, Result};
use tracing::debug;

use crate::evaluation::FlagEvaluator;

/// Maximum number of keys accepted by a batch evaluation.
pub const MAX_BATCH_SIZE: usize = 100;

/// Facade for evaluation requests
pub struct EvaluationService {
    evaluator: Arc<FlagEvaluator>,
}

impl EvaluationService {
    /// Create a service over an evaluator.
    pub fn new(evaluator: Arc<FlagEvaluator>) -> Self {
        Self { evaluator }
    }

    /// Evaluate one flag.
    ///
    /// `flag_not_found` comes back as a successful result with that
    /// reason; repository failures surface as `evaluation_error`.
    pub async fn evaluate(
        &self,
        key: &str,
        context: Option<&EvaluationContext>,
    ) -> Result<EvaluationResult> {
        let result = self.evaluator.evaluate(key, context).await;
        if result.reason == EvaluationReason::Error {
            return Err(result
                .error
                .unwrap_or_else(|| FlagError::EvaluationError(format!("evaluation of '{key}' failed"))));
        }
        debug!(key, reason = %result.reason, "flag evaluated");
        Ok(result)
    }

    /// Evaluate a batch of 1..=100 keys against one context.
    ///
    /// Per-key failures stay inside their result (reason `error`); only
    /// an invalid batch size fails the call.
    pub async fn evaluate_batch(
        &self,
        keys: &[String],
        context: Option<&EvaluationContext>,
    ) -> Result<Vec<EvaluationResult>> {
        if keys.is_empty() || keys.len() > MAX_BATCH_SIZE {
            return Err(FlagError::InvalidRequest(format!(
                "batch size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                keys.len()
            )));
        }
        Ok(self.evaluator.evaluate_batch(keys, context).await)
    }

    /// Client config: every flag that evaluates enabled for this caller,
    /// keyed by flag key.
    pub async fn client_config(
        &self,
        context: Option<&EvaluationContext>,
    ) -> Result<HashMap<String, EvaluationResult>> {
        let results =
            self.evaluator.evaluate_all(context).await.map_err(classify_infrastructure)?;
        Ok(results
            .into_iter()
            .filter(|result| result.enabled)
            .map(|result| (result.key.clone(), result))
            .collect())
    }

    /// Warm the cache with every enabled flag.
    pub async fn warm_cache(&self) -> Result<usize> {
        self.evaluator.warm_cache().await.map_err(classify_infrastructure)
    }
}

fn classify_infrastructure(err: FlagError) -> FlagError {
    match err {
        FlagError::EvaluationError(_) => err,
        other => FlagError::EvaluationError(other.to_string()),
    }
}
