//! In-memory outbox repository

use async_trait::async_trait;
use featuregate_core::OutboxRepository;
use featuregate_domain::{OutboxEntry, OutboxStatus, Result};
use parking_lot::RwLock;

/// Append-only outbox buffer
///
/// The relay that drains entries to the bus lives outside this core;
/// accessors exist so tests and the relay can observe appended entries.
#[derive(Debug, Default)]
pub struct InMemoryOutboxRepository {
    entries: RwLock<Vec<OutboxEntry>>,
}

impl InMemoryOutboxRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every appended entry, in append order.
    pub fn entries(&self) -> Vec<OutboxEntry> {
        self.entries.read().clone()
    }

    /// Number of entries still pending relay.
    pub fn pending_count(&self) -> usize {
        self.entries.read().iter().filter(|entry| entry.status == OutboxStatus::Pending).count()
    }
}

#[async_trait]
impl OutboxRepository for InMemoryOutboxRepository {
    async fn save(&self, entries: &[OutboxEntry]) -> Result<()> {
        self.entries.write().extend(entries.iter().cloned());
        Ok(())
    }
}
