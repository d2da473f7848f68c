//! In-memory audit log repository

use async_trait::async_trait;
use featuregate_core::FlagAuditLogRepository;
use featuregate_domain::{AuditFilter, FlagAuditLog, Result};
use parking_lot::RwLock;

use super::paginate;

/// Append-only audit store
#[derive(Debug, Default)]
pub struct InMemoryAuditLogRepository {
    entries: RwLock<Vec<FlagAuditLog>>,
}

impl InMemoryAuditLogRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    fn query<F>(&self, predicate: F, filter: &AuditFilter) -> Vec<FlagAuditLog>
    where
        F: Fn(&FlagAuditLog) -> bool,
    {
        // Newest first.
        let matches: Vec<FlagAuditLog> =
            self.entries.read().iter().rev().filter(|entry| predicate(entry)).cloned().collect();
        paginate(matches, filter.offset, filter.limit)
    }
}

#[async_trait]
impl FlagAuditLogRepository for InMemoryAuditLogRepository {
    async fn create(&self, entry: &FlagAuditLog) -> Result<()> {
        self.entries.write().push(entry.clone());
        Ok(())
    }

    async fn create_batch(&self, entries: &[FlagAuditLog]) -> Result<()> {
        self.entries.write().extend(entries.iter().cloned());
        Ok(())
    }

    async fn find_by_flag_key(
        &self,
        flag_key: &str,
        filter: &AuditFilter,
    ) -> Result<Vec<FlagAuditLog>> {
        Ok(self.query(|entry| entry.flag_key == flag_key, filter))
    }

    async fn find_by_user_id(
        &self,
        user_id: &str,
        filter: &AuditFilter,
    ) -> Result<Vec<FlagAuditLog>> {
        Ok(self.query(|entry| entry.user_id.as_deref() == Some(user_id), filter))
    }

    async fn find_by_action(
        &self,
        action: &str,
        filter: &AuditFilter,
    ) -> Result<Vec<FlagAuditLog>> {
        Ok(self.query(|entry| entry.action == action, filter))
    }

    async fn find_all(&self, filter: &AuditFilter) -> Result<Vec<FlagAuditLog>> {
        Ok(self.query(|_| true, filter))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.entries.read().len() as u64)
    }

    async fn count_by_flag_key(&self, flag_key: &str) -> Result<u64> {
        Ok(self.entries.read().iter().filter(|entry| entry.flag_key == flag_key).count() as u64)
    }
}
