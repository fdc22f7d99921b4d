use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gatehouse_application::AuditLogRepository;
use gatehouse_core::{AppError, AppResult, AuditEntryId, VisitorId};
use gatehouse_domain::AuditLogEntry;
use tokio::sync::RwLock;

/// In-memory append-only audit ledger.
///
/// Insertion order is preserved so recency queries do not depend on map
/// iteration order.
#[derive(Debug, Default)]
pub struct InMemoryAuditLogRepository {
    entries: RwLock<Ledger>,
}

#[derive(Debug, Default)]
struct Ledger {
    by_id: HashMap<AuditEntryId, AuditLogEntry>,
    order: Vec<AuditEntryId>,
}

impl InMemoryAuditLogRepository {
    /// Creates an empty in-memory ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Ledger::default()),
        }
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditLogRepository {
    async fn append(&self, entry: AuditLogEntry) -> AppResult<()> {
        let mut ledger = self.entries.write().await;

        if ledger.by_id.contains_key(&entry.id()) {
            return Err(AppError::Conflict(format!(
                "audit entry '{}' already exists",
                entry.id()
            )));
        }

        ledger.order.push(entry.id());
        ledger.by_id.insert(entry.id(), entry);
        Ok(())
    }

    async fn find(&self, entry_id: AuditEntryId) -> AppResult<Option<AuditLogEntry>> {
        let ledger = self.entries.read().await;
        Ok(ledger.by_id.get(&entry_id).cloned())
    }

    async fn update(&self, entry: AuditLogEntry) -> AppResult<()> {
        let mut ledger = self.entries.write().await;

        if !ledger.by_id.contains_key(&entry.id()) {
            return Err(AppError::NotFound(format!("audit entry '{}'", entry.id())));
        }

        ledger.by_id.insert(entry.id(), entry);
        Ok(())
    }

    async fn delete(&self, entry_id: AuditEntryId) -> AppResult<()> {
        let mut ledger = self.entries.write().await;
        ledger.by_id.remove(&entry_id);
        ledger.order.retain(|stored| *stored != entry_id);
        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> AppResult<Vec<AuditLogEntry>> {
        let ledger = self.entries.read().await;
        Ok(ledger
            .order
            .iter()
            .rev()
            .take(limit)
            .filter_map(|entry_id| ledger.by_id.get(entry_id).cloned())
            .collect())
    }

    async fn list_for_visitor(&self, visitor_id: VisitorId) -> AppResult<Vec<AuditLogEntry>> {
        let ledger = self.entries.read().await;
        Ok(ledger
            .order
            .iter()
            .rev()
            .filter_map(|entry_id| ledger.by_id.get(entry_id))
            .filter(|entry| entry.visitor_id() == Some(visitor_id))
            .cloned()
            .collect())
    }

    async fn list_expired(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<AuditLogEntry>> {
        let ledger = self.entries.read().await;
        Ok(ledger
            .by_id
            .values()
            .filter(|entry| !entry.is_anonymized() && entry.is_past_retention(cutoff))
            .cloned()
            .collect())
    }
}
