//! Evaluation context
//!
//! Immutable request-scoped input to evaluation. Built-in fields are
//! reachable through case-insensitive aliases; unknown attribute names
//! fall through to the free-form `user_attributes` map.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::plan::SubscriptionPlan;

/// Who and where a flag is being evaluated for
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_plan: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    user_attributes: HashMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
}

impl EvaluationContext {
    /// Empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy-on-write setter for the tenant id.
    #[must_use]
    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Copy-on-write setter for the user id.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Copy-on-write setter for the user role.
    #[must_use]
    pub fn with_user_role(mut self, user_role: impl Into<String>) -> Self {
        self.user_role = Some(user_role.into());
        self
    }

    /// Copy-on-write setter for the user plan.
    #[must_use]
    pub fn with_user_plan(mut self, user_plan: impl Into<String>) -> Self {
        self.user_plan = Some(user_plan.into());
        self
    }

    /// Copy-on-write setter adding one free-form attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.user_attributes.insert(name.into(), value);
        self
    }

    /// Copy-on-write setter for the request id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Copy-on-write setter for the environment name.
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Copy-on-write setter for the evaluation timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Tenant id, if present.
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    /// User id, if present.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// User role, if present.
    pub fn user_role(&self) -> Option<&str> {
        self.user_role.as_deref()
    }

    /// Raw user plan string, if present.
    pub fn user_plan(&self) -> Option<&str> {
        self.user_plan.as_deref()
    }

    /// Parsed plan tier; unknown spellings count as "no plan".
    pub fn plan(&self) -> Option<SubscriptionPlan> {
        self.user_plan.as_deref().and_then(SubscriptionPlan::parse_lenient)
    }

    /// Request id, if present.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Environment name, if present.
    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    /// Explicit evaluation timestamp, if present.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Free-form attributes.
    pub fn user_attributes(&self) -> &HashMap<String, Value> {
        &self.user_attributes
    }

    /// Resolve an attribute by name.
    ///
    /// Built-in aliases are matched case-insensitively
    /// (`tenant_id`/`tenantid`, `user_id`/`userid`, `role`/`user_role`,
    /// `plan`/`user_plan`, `env`/`environment`,
    /// `request_id`/`requestid`); anything else falls through to
    /// `user_attributes`. Missing attributes resolve to `None`.
    pub fn attribute(&self, name: &str) -> Option<Value> {
        let builtin = match name.to_lowercase().as_str() {
            "tenant_id" | "tenantid" => self.tenant_id.as_deref(),
            "user_id" | "userid" => self.user_id.as_deref(),
            "role" | "user_role" => self.user_role.as_deref(),
            "plan" | "user_plan" => self.user_plan.as_deref(),
            "env" | "environment" => self.environment.as_deref(),
            "request_id" | "requestid" => self.request_id.as_deref(),
            _ => return self.user_attributes.get(name).cloned(),
        };
        builtin.map(|value| Value::String(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for types::context.
    use serde_json::json;

    use super::*;

    fn context() -> EvaluationContext {
        EvaluationContext::new()
            .with_tenant_id("acme")
            .with_user_id("user-1")
            .with_user_role("admin")
            .with_user_plan("pro")
            .with_environment("staging")
            .with_request_id("req-9")
            .with_attribute("beta_opt_in", json!(true))
    }

    /// Tests that builder setters do not mutate the source context.
    #[test]
    fn test_copy_on_write() {
        let base = EvaluationContext::new().with_user_id("user-1");
        let derived = base.clone().with_user_role("admin");

        assert_eq!(base.user_role(), None);
        assert_eq!(derived.user_role(), Some("admin"));
        assert_eq!(derived.user_id(), Some("user-1"));
    }

    /// Tests built-in alias resolution, case-insensitively.
    #[test]
    fn test_builtin_aliases() {
        let ctx = context();

        assert_eq!(ctx.attribute("tenant_id"), Some(json!("acme")));
        assert_eq!(ctx.attribute("TenantId"), Some(json!("acme")));
        assert_eq!(ctx.attribute("userid"), Some(json!("user-1")));
        assert_eq!(ctx.attribute("role"), Some(json!("admin")));
        assert_eq!(ctx.attribute("USER_ROLE"), Some(json!("admin")));
        assert_eq!(ctx.attribute("plan"), Some(json!("pro")));
        assert_eq!(ctx.attribute("env"), Some(json!("staging")));
        assert_eq!(ctx.attribute("request_id"), Some(json!("req-9")));
    }

    /// Tests that unknown names fall through to user attributes.
    #[test]
    fn test_fall_through_to_user_attributes() {
        let ctx = context();

        assert_eq!(ctx.attribute("beta_opt_in"), Some(json!(true)));
        assert_eq!(ctx.attribute("missing"), None);
    }

    /// Tests lenient plan parsing on the context.
    #[test]
    fn test_plan_parsing() {
        assert_eq!(context().plan(), Some(SubscriptionPlan::Pro));

        let unknown = EvaluationContext::new().with_user_plan("platinum");
        assert_eq!(unknown.plan(), None);

        assert_eq!(EvaluationContext::new().plan(), None);
    }
}
