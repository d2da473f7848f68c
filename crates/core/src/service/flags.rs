//! Flag mutation facade
//!
//! Every mutation follows the same flow: load the aggregate, apply the
//! invariant-checked transition, persist, write a best-effort audit
//! record, append the drained domain events to the outbox and clear the
//! cache entry while publishing an invalidation. Audit and outbox
//! failures are logged, never propagated; the outbox relay retries
//! later.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use featuregate_domain::{
    CacheUpdateMessage, DomainEvent, FeatureFlag, FlagAuditLog, FlagError, FlagEventType,
    FlagFilter, FlagOverride, FlagType, FlagValue, OutboxEntry, OverrideFilter, Result,
    SubscriptionPlan, TargetType, TargetingRule,
};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache_ports::{CacheInvalidator, FlagCache};
use crate::storage_ports::{
    FeatureFlagRepository, FlagAuditLogRepository, FlagOverrideRepository, OutboxRepository,
};

/// Facade for flag and override mutations
pub struct FlagService {
    flags: Arc<dyn FeatureFlagRepository>,
    overrides: Arc<dyn FlagOverrideRepository>,
    audit: Arc<dyn FlagAuditLogRepository>,
    outbox: Arc<dyn OutboxRepository>,
    cache: Option<Arc<dyn FlagCache>>,
    invalidator: Option<Arc<dyn CacheInvalidator>>,
}

impl FlagService {
    /// Create a service without cache or invalidation wiring.
    pub fn new(
        flags: Arc<dyn FeatureFlagRepository>,
        overrides: Arc<dyn FlagOverrideRepository>,
        audit: Arc<dyn FlagAuditLogRepository>,
        outbox: Arc<dyn OutboxRepository>,
    ) -> Self {
        Self { flags, overrides, audit, outbox, cache: None, invalidator: None }
    }

    /// Attach the cache cleared on mutations.
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

    // ------------------------------------------------------------------
    // Flag lifecycle
    // ------------------------------------------------------------------

    /// Create a new flag (created disabled).
    pub async fn create_flag(
        &self,
        key: &str,
        name: &str,
        description: Option<String>,
        flag_type: FlagType,
        default_value: FlagValue,
        actor: &str,
    ) -> Result<FeatureFlag> {
        let mut flag =
            FeatureFlag::new(key, name, description, flag_type, default_value, actor)?;

        if self.flags.exists_by_key(flag.key()).await? {
            return Err(FlagError::FlagExists(flag.key().to_string()));
        }

        let events = flag.take_events();
        self.flags.create(&flag).await?;
        info!(key = flag.key(), "flag created");

        let new_state = serde_json::to_value(&flag).ok();
        self.record_audit(flag.key(), actor, "flag.created", None, new_state).await;
        self.append_outbox(&events).await;
        self.invalidate_flag(flag.key(), CacheUpdateMessage::updated(flag.key())).await;

        Ok(flag)
    }

    /// Load a flag by key.
    pub async fn get_flag(&self, key: &str) -> Result<FeatureFlag> {
        self.flags.find_by_key(key).await
    }

    /// List flags matching a filter.
    pub async fn list_flags(&self, filter: &FlagFilter) -> Result<Vec<FeatureFlag>> {
        self.flags.find_all(filter).await
    }

    /// Total number of flags.
    pub async fn count_flags(&self) -> Result<u64> {
        self.flags.count().await
    }

    /// Update name and/or description.
    pub async fn update_flag_details(
        &self,
        key: &str,
        name: Option<String>,
        description: Option<String>,
        actor: &str,
    ) -> Result<FeatureFlag> {
        self.mutate_flag(key, "flag.updated", actor, |flag| {
            flag.update_details(name, description, actor)
        })
        .await
    }

    /// Replace the default value.
    pub async fn set_default_value(
        &self,
        key: &str,
        value: FlagValue,
        actor: &str,
    ) -> Result<FeatureFlag> {
        self.mutate_flag(key, "flag.default_value.updated", actor, |flag| {
            flag.set_default_value(value, actor)
        })
        .await
    }

    /// Add a targeting rule.
    pub async fn add_rule(
        &self,
        key: &str,
        rule: TargetingRule,
        actor: &str,
    ) -> Result<FeatureFlag> {
        self.mutate_flag(key, "flag.rule.added", actor, |flag| flag.add_rule(rule, actor)).await
    }

    /// Replace an existing targeting rule.
    pub async fn update_rule(
        &self,
        key: &str,
        rule: TargetingRule,
        actor: &str,
    ) -> Result<FeatureFlag> {
        self.mutate_flag(key, "flag.rule.updated", actor, |flag| flag.update_rule(rule, actor))
            .await
    }

    /// Remove a targeting rule.
    pub async fn remove_rule(&self, key: &str, rule_id: &str, actor: &str) -> Result<FeatureFlag> {
        self.mutate_flag(key, "flag.rule.removed", actor, |flag| flag.remove_rule(rule_id, actor))
            .await
    }

    /// Remove every targeting rule.
    pub async fn clear_rules(&self, key: &str, actor: &str) -> Result<FeatureFlag> {
        self.mutate_flag(key, "flag.rules.cleared", actor, |flag| flag.clear_rules(actor)).await
    }

    /// Replace the tag set.
    pub async fn set_tags(&self, key: &str, tags: Vec<String>, actor: &str) -> Result<FeatureFlag> {
        self.mutate_flag(key, "flag.tags.updated", actor, |flag| flag.set_tags(tags, actor)).await
    }

    /// Add one tag.
    pub async fn add_tag(&self, key: &str, tag: &str, actor: &str) -> Result<FeatureFlag> {
        self.mutate_flag(key, "flag.tags.updated", actor, |flag| flag.add_tag(tag, actor)).await
    }

    /// Remove one tag.
    pub async fn remove_tag(&self, key: &str, tag: &str, actor: &str) -> Result<FeatureFlag> {
        self.mutate_flag(key, "flag.tags.updated", actor, |flag| flag.remove_tag(tag, actor)).await
    }

    /// Set or clear the plan gate.
    pub async fn set_required_plan(
        &self,
        key: &str,
        plan: Option<SubscriptionPlan>,
        actor: &str,
    ) -> Result<FeatureFlag> {
        self.mutate_flag(key, "flag.plan.updated", actor, |flag| {
            flag.set_required_plan(plan, actor)
        })
        .await
    }

    /// Enable a flag.
    pub async fn enable_flag(&self, key: &str, actor: &str) -> Result<FeatureFlag> {
        self.mutate_flag(key, "flag.enabled", actor, |flag| flag.enable(actor)).await
    }

    /// Disable a flag.
    pub async fn disable_flag(&self, key: &str, actor: &str) -> Result<FeatureFlag> {
        self.mutate_flag(key, "flag.disabled", actor, |flag| flag.disable(actor)).await
    }

    /// Archive a flag (terminal).
    pub async fn archive_flag(&self, key: &str, actor: &str) -> Result<FeatureFlag> {
        self.mutate_flag(key, "flag.archived", actor, |flag| flag.archive(actor)).await
    }

    /// Delete a flag and its overrides.
    pub async fn delete_flag(&self, key: &str, actor: &str) -> Result<()> {
        let flag = self.flags.find_by_key(key).await?;
        self.flags.delete(flag.key()).await?;

        if let Err(err) = self.overrides.delete_by_flag_key(flag.key()).await {
            warn!(key = flag.key(), error = %err, "override cleanup after flag delete failed");
        }

        info!(key = flag.key(), "flag deleted");
        let old_state = serde_json::to_value(&flag).ok();
        self.record_audit(flag.key(), actor, "flag.deleted", old_state, None).await;
        self.invalidate_flag(flag.key(), CacheUpdateMessage::deleted(flag.key())).await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Overrides
    // ------------------------------------------------------------------

    /// Create an override for a `(flag, target)` triple. At most one
    /// active override may exist per triple.
    pub async fn create_override(
        &self,
        flag_key: &str,
        target_type: TargetType,
        target_id: &str,
        value: FlagValue,
        reason: Option<String>,
        expires_at: Option<DateTime<Utc>>,
        actor: &str,
    ) -> Result<FlagOverride> {
        let flag = self.flags.find_by_key(flag_key).await?;

        let existing = self
            .overrides
            .find_by_flag_key_and_target(flag.key(), target_type, target_id)
            .await?;
        if existing.is_some_and(|entry| entry.is_active(Utc::now())) {
            return Err(FlagError::OverrideExists(format!(
                "{}/{target_type}/{target_id}",
                flag.key()
            )));
        }

        let entry = FlagOverride::new(
            flag.key(),
            target_type,
            target_id,
            value,
            reason,
            expires_at,
            Some(actor.to_string()),
        )?;
        self.overrides.create(&entry).await?;
        info!(flag_key = flag.key(), %target_type, target_id, "override created");

        let new_state = serde_json::to_value(&entry).ok();
        self.record_audit(flag.key(), actor, "override.created", None, new_state).await;
        self.append_outbox(&[override_event(FlagEventType::OverrideCreated, &entry)]).await;
        self.invalidate_override(
            flag.key(),
            target_type,
            target_id,
            CacheUpdateMessage::override_updated(flag.key(), target_type, target_id),
        )
        .await;

        Ok(entry)
    }

    /// Update an override's value, reason and expiry.
    pub async fn update_override(
        &self,
        id: Uuid,
        value: FlagValue,
        reason: Option<String>,
        expires_at: Option<DateTime<Utc>>,
        actor: &str,
    ) -> Result<FlagOverride> {
        let mut entry = self.overrides.find_by_id(id).await?;
        let old_state = serde_json::to_value(&entry).ok();

        entry.update(value, reason, expires_at)?;
        self.overrides.update(&entry).await?;

        let new_state = serde_json::to_value(&entry).ok();
        self.record_audit(&entry.flag_key, actor, "override.updated", old_state, new_state).await;
        self.append_outbox(&[override_event(FlagEventType::OverrideUpdated, &entry)]).await;
        self.invalidate_override(
            &entry.flag_key,
            entry.target_type,
            &entry.target_id,
            CacheUpdateMessage::override_updated(&entry.flag_key, entry.target_type, &entry.target_id),
        )
        .await;

        Ok(entry)
    }

    /// Delete an override.
    pub async fn remove_override(&self, id: Uuid, actor: &str) -> Result<()> {
        let entry = self.overrides.find_by_id(id).await?;
        self.overrides.delete(id).await?;
        info!(flag_key = %entry.flag_key, target_id = %entry.target_id, "override removed");

        let old_state = serde_json::to_value(&entry).ok();
        self.record_audit(&entry.flag_key, actor, "override.removed", old_state, None).await;
        self.append_outbox(&[override_event(FlagEventType::OverrideRemoved, &entry)]).await;
        self.invalidate_override(
            &entry.flag_key,
            entry.target_type,
            &entry.target_id,
            CacheUpdateMessage::override_deleted(&entry.flag_key, entry.target_type, &entry.target_id),
        )
        .await;
        Ok(())
    }

    /// Load an override by id.
    pub async fn get_override(&self, id: Uuid) -> Result<FlagOverride> {
        self.overrides.find_by_id(id).await
    }

    /// List overrides for a flag.
    pub async fn list_overrides(
        &self,
        flag_key: &str,
        filter: &OverrideFilter,
    ) -> Result<Vec<FlagOverride>> {
        self.overrides.find_by_flag_key(flag_key, filter).await
    }

    // ------------------------------------------------------------------
    // Mutation plumbing
    // ------------------------------------------------------------------

    async fn mutate_flag<F>(
        &self,
        key: &str,
        action: &str,
        actor: &str,
        mutate: F,
    ) -> Result<FeatureFlag>
    where
        F: FnOnce(&mut FeatureFlag) -> Result<()>,
    {
        let mut flag = self.flags.find_by_key(key).await?;
        let old_state = serde_json::to_value(&flag).ok();

        mutate(&mut flag)?;
        let events = flag.take_events();

        self.flags.update(&flag).await?;
        info!(key = flag.key(), version = flag.version, action, "flag mutated");

        let new_state = serde_json::to_value(&flag).ok();
        self.record_audit(flag.key(), actor, action, old_state, new_state).await;
        self.append_outbox(&events).await;
        self.invalidate_flag(flag.key(), CacheUpdateMessage::updated(flag.key())).await;

        Ok(flag)
    }

    /// Best-effort audit write; failures are logged, never propagated.
    async fn record_audit(
        &self,
        flag_key: &str,
        actor: &str,
        action: &str,
        old_state: Option<serde_json::Value>,
        new_state: Option<serde_json::Value>,
    ) {
        let mut entry = FlagAuditLog::new(flag_key, Some(actor.to_string()), action);
        if let Some(old_state) = old_state {
            entry = entry.with_old_value(old_state);
        }
        if let Some(new_state) = new_state {
            entry = entry.with_new_value(new_state);
        }

        if let Err(err) = self.audit.create(&entry).await {
            warn!(flag_key, action, error = %err, "audit write failed");
        }
    }

    /// Best-effort outbox append; the relay retries delivery, so a
    /// failure here only delays the events.
    async fn append_outbox(&self, events: &[DomainEvent]) {
        if events.is_empty() {
            return;
        }
        let entries: Vec<OutboxEntry> = events.iter().map(OutboxEntry::from_event).collect();
        if let Err(err) = self.outbox.save(&entries).await {
            warn!(count = entries.len(), error = %err, "outbox append failed");
        }
    }

    async fn invalidate_flag(&self, key: &str, message: CacheUpdateMessage) {
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.delete(key).await {
                warn!(key, error = %err, "flag cache delete failed");
            }
        }
        self.publish(message).await;
    }

    async fn invalidate_override(
        &self,
        flag_key: &str,
        target_type: TargetType,
        target_id: &str,
        message: CacheUpdateMessage,
    ) {
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.delete_override(flag_key, target_type, target_id).await {
                warn!(flag_key, error = %err, "override cache delete failed");
            }
        }
        self.publish(message).await;
    }

    async fn publish(&self, message: CacheUpdateMessage) {
        if let Some(invalidator) = &self.invalidator {
            if let Err(err) = invalidator.publish(&message).await {
                warn!(action = ?message.action, error = %err, "invalidation publish failed");
            }
        }
    }
}

fn override_event(event_type: FlagEventType, entry: &FlagOverride) -> DomainEvent {
    DomainEvent::new(
        event_type,
        entry.flag_key.clone(),
        json!({
            "flag_key": entry.flag_key,
            "target_type": entry.target_type,
            "target_id": entry.target_id,
            "override_id": entry.id,
        }),
    )
}
