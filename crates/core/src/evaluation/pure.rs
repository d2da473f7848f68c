//! The precedence pipeline
//!
//! Pure CPU: once the flag, context and overrides are resolved there are
//! no suspension points. Steps run in strict order and the first match
//! wins; the order is observable and load-bearing (an active user
//! override beats everything, disabled status beats rules, the plan gate
//! sits between status and rules).

use chrono::Utc;
use featuregate_domain::{
    plan_satisfies, EvaluationContext, EvaluationReason, EvaluationResult, FeatureFlag, FlagType,
    FlagValue, FlagOverride,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::{conditions, hash};

/// Stateless evaluator implementing the precedence pipeline
pub struct PureEvaluator;

impl PureEvaluator {
    /// Evaluate a loaded flag against a context and pre-resolved
    /// overrides.
    ///
    /// `flag = None` produces a `flag_not_found` result; expired
    /// overrides are ignored regardless of how they were fetched.
    pub fn evaluate(
        key: &str,
        flag: Option<&FeatureFlag>,
        context: Option<&EvaluationContext>,
        user_override: Option<&FlagOverride>,
        tenant_override: Option<&FlagOverride>,
    ) -> EvaluationResult {
        let Some(flag) = flag else {
            return EvaluationResult::new(key, FlagValue::off(), EvaluationReason::FlagNotFound);
        };

        let now = context.and_then(EvaluationContext::timestamp).unwrap_or_else(Utc::now);

        if let Some(user_override) = user_override.filter(|o| o.is_active(now)) {
            debug!(key, "user override applied");
            return EvaluationResult::new(
                key,
                user_override.value.clone(),
                EvaluationReason::OverrideUser,
            )
            .with_flag_version(flag.version);
        }

        if let Some(tenant_override) = tenant_override.filter(|o| o.is_active(now)) {
            debug!(key, "tenant override applied");
            return EvaluationResult::new(
                key,
                tenant_override.value.clone(),
                EvaluationReason::OverrideTenant,
            )
            .with_flag_version(flag.version);
        }

        if !flag.is_enabled() {
            // The canonical "off" value, not the flag's default: the
            // pipeline communicates "off", whatever the flag type.
            return EvaluationResult::new(key, FlagValue::off(), EvaluationReason::Disabled)
                .with_flag_version(flag.version);
        }

        if let Some(required) = flag.required_plan {
            let plan = context.and_then(EvaluationContext::plan);
            if !plan_satisfies(plan, required) {
                let value =
                    FlagValue::off().with_metadata("required_plan", json!(required.as_str()));
                return EvaluationResult::new(key, value, EvaluationReason::PlanRestricted)
                    .with_flag_version(flag.version);
            }
        }

        let user_id = context.and_then(EvaluationContext::user_id).unwrap_or_default();

        for rule in flag.rules() {
            let matched =
                rule.conditions.is_empty() || conditions::matches_all(&rule.conditions, context);
            if !matched {
                continue;
            }

            if rule.percentage < 100 {
                let rollout_key = format!("{}:{}", flag.key(), rule.rule_id);
                if !hash::is_in_percentage(&rollout_key, user_id, f64::from(rule.percentage)) {
                    // Outside the rule's bucket: consider the next rule
                    // rather than falling through to the default.
                    debug!(key, rule_id = %rule.rule_id, "rule matched but user outside rollout");
                    continue;
                }
            }

            return EvaluationResult::new(key, rule.value.clone(), EvaluationReason::RuleMatch)
                .with_rule_id(rule.rule_id.clone())
                .with_flag_version(flag.version);
        }

        Self::evaluate_default(flag, user_id)
    }

    /// Type-specific default when no override or rule decided the
    /// outcome.
    fn evaluate_default(flag: &FeatureFlag, user_id: &str) -> EvaluationResult {
        let key = flag.key();
        match flag.flag_type {
            FlagType::Boolean | FlagType::UserSegment => {
                // User segments are expressed exclusively through rules;
                // unmatched means the default applies.
                EvaluationResult::new(key, flag.default_value.clone(), EvaluationReason::Default)
                    .with_flag_version(flag.version)
            }
            FlagType::Percentage => {
                let percentage = flag
                    .default_value
                    .metadata_value("percentage")
                    .as_ref()
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0);
                let included = hash::is_in_percentage(key, user_id, percentage);
                EvaluationResult::new(key, FlagValue::new(included), EvaluationReason::Percentage)
                    .with_flag_version(flag.version)
            }
            FlagType::Variant => {
                let variants = variant_names(&flag.default_value);
                if variants.is_empty() {
                    return EvaluationResult::new(
                        key,
                        flag.default_value.clone(),
                        EvaluationReason::Default,
                    )
                    .with_flag_version(flag.version);
                }

                let weights = variant_weights(&flag.default_value);
                let selected = match weights {
                    Some(weights) => {
                        hash::select_weighted_variant(key, user_id, &variants, &weights)
                    }
                    None => hash::select_variant(key, user_id, &variants),
                };

                EvaluationResult::new(
                    key,
                    flag.default_value.clone().with_variant(selected),
                    EvaluationReason::Default,
                )
                .with_flag_version(flag.version)
            }
        }
    }
}

/// Variant names from default-value metadata, tolerating heterogeneous
/// source typing by filtering non-strings.
fn variant_names(value: &FlagValue) -> Vec<String> {
    match value.metadata_value("variants") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(ToString::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn variant_weights(value: &FlagValue) -> Option<Vec<i64>> {
    match value.metadata_value("weights") {
        Some(Value::Array(items)) => {
            Some(items.iter().filter_map(Value::as_i64).collect())
        }
        _ => None,
    }
}
