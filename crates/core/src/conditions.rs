//! Condition matching over evaluation contexts
//!
//! Attribute lookup goes through the context's alias table first, then
//! its free-form attributes. String comparisons are case-insensitive.
//! Ordering comparisons coerce both sides to numbers first and fall back
//! to lexicographic comparison when either side does not parse; the
//! fallback is observable behavior relied on by existing rules.

use std::cmp::Ordering;

use featuregate_domain::{Condition, ConditionOperator, EvaluationContext};
use serde_json::Value;

/// Whether a single condition matches the context.
///
/// A missing context, a missing attribute or an empty value list never
/// match.
pub fn matches(condition: &Condition, context: Option<&EvaluationContext>) -> bool {
    let Some(context) = context else {
        return false;
    };
    if condition.values.is_empty() {
        return false;
    }
    let Some(attribute) = context.attribute(&condition.attribute) else {
        return false;
    };

    match condition.operator {
        ConditionOperator::Equals | ConditionOperator::In => {
            matches_any_value(&attribute, &condition.values)
        }
        ConditionOperator::NotEquals | ConditionOperator::NotIn => {
            !matches_any_value(&attribute, &condition.values)
        }
        ConditionOperator::Contains => contains_any(&attribute, &condition.values),
        ConditionOperator::GreaterThan => {
            compare(&attribute, &condition.values[0], Ordering::Greater)
        }
        ConditionOperator::LessThan => compare(&attribute, &condition.values[0], Ordering::Less),
    }
}

/// AND over a sequence of conditions; an empty sequence matches.
pub fn matches_all(conditions: &[Condition], context: Option<&EvaluationContext>) -> bool {
    if context.is_none() {
        return false;
    }
    conditions.iter().all(|condition| matches(condition, context))
}

/// OR over a sequence of conditions; an empty sequence never matches.
pub fn matches_any(conditions: &[Condition], context: Option<&EvaluationContext>) -> bool {
    if context.is_none() {
        return false;
    }
    conditions.iter().any(|condition| matches(condition, context))
}

fn matches_any_value(attribute: &Value, values: &[String]) -> bool {
    let Some(attribute) = value_to_string(attribute) else {
        return false;
    };
    let attribute = attribute.to_lowercase();
    values.iter().any(|candidate| candidate.to_lowercase() == attribute)
}

fn contains_any(attribute: &Value, values: &[String]) -> bool {
    let Some(attribute) = value_to_string(attribute) else {
        return false;
    };
    let attribute = attribute.to_lowercase();
    values.iter().any(|candidate| attribute.contains(&candidate.to_lowercase()))
}

fn compare(attribute: &Value, reference: &str, expected: Ordering) -> bool {
    // Numeric coercion first; lexicographic comparison only when either
    // side fails to parse. Equal values never match.
    if let (Some(lhs), Some(rhs)) = (value_to_f64(attribute), reference.trim().parse::<f64>().ok())
    {
        return lhs.partial_cmp(&rhs) == Some(expected);
    }

    let Some(lhs) = value_to_string(attribute) else {
        return false;
    };
    lhs.to_lowercase().cmp(&reference.to_lowercase()) == expected
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for conditions.
    use featuregate_domain::EvaluationContext;
    use serde_json::json;

    use super::*;

    fn condition(attribute: &str, operator: ConditionOperator, values: &[&str]) -> Condition {
        Condition::new(
            attribute,
            operator,
            values.iter().map(|value| (*value).to_string()).collect(),
        )
        .unwrap()
    }

    fn context() -> EvaluationContext {
        EvaluationContext::new()
            .with_user_id("user-1")
            .with_user_role("Admin")
            .with_user_plan("pro")
            .with_environment("staging")
            .with_attribute("login_count", json!(42))
            .with_attribute("region", json!("eu-west-1"))
            .with_attribute("beta", json!(true))
    }

    /// Tests that equals matches case-insensitively against any value.
    #[test]
    fn test_equals_case_insensitive_membership() {
        let ctx = context();

        assert!(matches(&condition("role", ConditionOperator::Equals, &["admin"]), Some(&ctx)));
        assert!(matches(
            &condition("role", ConditionOperator::Equals, &["viewer", "ADMIN"]),
            Some(&ctx)
        ));
        assert!(!matches(&condition("role", ConditionOperator::Equals, &["viewer"]), Some(&ctx)));
    }

    /// Tests that in/not_in behave exactly like equals/not_equals
    /// membership.
    #[test]
    fn test_in_is_membership() {
        let ctx = context();

        assert!(matches(&condition("plan", ConditionOperator::In, &["basic", "pro"]), Some(&ctx)));
        assert!(!matches(&condition("plan", ConditionOperator::NotIn, &["basic", "pro"]), Some(&ctx)));
        assert!(matches(&condition("plan", ConditionOperator::NotEquals, &["basic"]), Some(&ctx)));
    }

    /// Tests substring matching on lowercased forms.
    #[test]
    fn test_contains() {
        let ctx = context();

        assert!(matches(&condition("region", ConditionOperator::Contains, &["WEST"]), Some(&ctx)));
        assert!(matches(
            &condition("region", ConditionOperator::Contains, &["north", "eu-"]),
            Some(&ctx)
        ));
        assert!(!matches(&condition("region", ConditionOperator::Contains, &["east"]), Some(&ctx)));
    }

    /// Tests numeric coercion for ordering comparisons, including numeric
    /// strings.
    #[test]
    fn test_numeric_comparison() {
        let ctx = context();

        assert!(matches(&condition("login_count", ConditionOperator::GreaterThan, &["41"]), Some(&ctx)));
        assert!(!matches(&condition("login_count", ConditionOperator::GreaterThan, &["42"]), Some(&ctx)));
        assert!(matches(&condition("login_count", ConditionOperator::LessThan, &["42.5"]), Some(&ctx)));

        // Numeric string attribute coerces too.
        let ctx = EvaluationContext::new().with_attribute("score", json!("9"));
        assert!(matches(&condition("score", ConditionOperator::GreaterThan, &["8.5"]), Some(&ctx)));
    }

    /// Tests the lexicographic fallback when a side does not parse as a
    /// number.
    #[test]
    fn test_lexicographic_fallback() {
        let ctx = EvaluationContext::new().with_attribute("tier", json!("silver"));

        assert!(matches(&condition("tier", ConditionOperator::GreaterThan, &["gold"]), Some(&ctx)));
        assert!(!matches(&condition("tier", ConditionOperator::LessThan, &["gold"]), Some(&ctx)));
        // Equal values never match either direction.
        assert!(!matches(&condition("tier", ConditionOperator::GreaterThan, &["silver"]), Some(&ctx)));
        assert!(!matches(&condition("tier", ConditionOperator::LessThan, &["SILVER"]), Some(&ctx)));
    }

    /// Tests that a missing attribute or missing context never matches.
    #[test]
    fn test_missing_attribute_and_context() {
        let ctx = context();
        let cond = condition("missing", ConditionOperator::Equals, &["x"]);

        assert!(!matches(&cond, Some(&ctx)));
        assert!(!matches(&cond, None));
    }

    /// Tests boolean attributes compare through their string form.
    #[test]
    fn test_boolean_attribute() {
        let ctx = context();
        assert!(matches(&condition("beta", ConditionOperator::Equals, &["true"]), Some(&ctx)));
        assert!(matches(&condition("beta", ConditionOperator::Equals, &["TRUE"]), Some(&ctx)));
    }

    /// Tests matches_all: AND semantics, empty list matches, null context
    /// does not.
    #[test]
    fn test_matches_all() {
        let ctx = context();
        let both = vec![
            condition("role", ConditionOperator::Equals, &["admin"]),
            condition("env", ConditionOperator::Equals, &["staging"]),
        ];
        let one_fails = vec![
            condition("role", ConditionOperator::Equals, &["admin"]),
            condition("env", ConditionOperator::Equals, &["production"]),
        ];

        assert!(matches_all(&both, Some(&ctx)));
        assert!(!matches_all(&one_fails, Some(&ctx)));
        assert!(matches_all(&[], Some(&ctx)));
        assert!(!matches_all(&[], None));
    }

    /// Tests matches_any: OR semantics, empty list never matches.
    #[test]
    fn test_matches_any() {
        let ctx = context();
        let one_hits = vec![
            condition("role", ConditionOperator::Equals, &["viewer"]),
            condition("env", ConditionOperator::Equals, &["staging"]),
        ];

        assert!(matches_any(&one_hits, Some(&ctx)));
        assert!(!matches_any(&[], Some(&ctx)));
        assert!(!matches_any(&one_hits, None));
    }
}
