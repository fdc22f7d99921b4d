use std::collections::HashMap;

use async_trait::async_trait;
use gatehouse_application::ConsentRepository;
use gatehouse_core::{AppError, AppResult, ConsentRecordId, VisitorId};
use gatehouse_domain::{ConsentRecord, ConsentType};
use tokio::sync::RwLock;

/// In-memory consent ledger implementation. Records are never deleted;
/// withdrawal and renewal are status changes, matching the port contract.
#[derive(Debug, Default)]
pub struct InMemoryConsentRepository {
    records: RwLock<HashMap<ConsentRecordId, ConsentRecord>>,
}

impl InMemoryConsentRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ConsentRepository for InMemoryConsentRepository {
    async fn insert(&self, record: ConsentRecord) -> AppResult<()> {
        let mut records = self.records.write().await;

        if records.contains_key(&record.id()) {
            return Err(AppError::Conflict(format!(
                "consent record '{}' already exists",
                record.id()
            )));
        }

        records.insert(record.id(), record);
        Ok(())
    }

    async fn find(&self, record_id: ConsentRecordId) -> AppResult<Option<ConsentRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&record_id).cloned())
    }

    async fn update(&self, record: ConsentRecord) -> AppResult<()> {
        let mut records = self.records.write().await;

        if !records.contains_key(&record.id()) {
            return Err(AppError::NotFound(format!(
                "consent record '{}'",
                record.id()
            )));
        }

        records.insert(record.id(), record);
        Ok(())
    }

    async fn find_active(
        &self,
        visitor_id: VisitorId,
        consent_type: ConsentType,
    ) -> AppResult<Option<ConsentRecord>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|record| {
                record.visitor_id() == visitor_id
                    && record.consent_type() == consent_type
                    && record.is_active()
            })
            .cloned())
    }

    async fn list_for_visitor(&self, visitor_id: VisitorId) -> AppResult<Vec<ConsentRecord>> {
        let records = self.records.read().await;
        let mut history: Vec<ConsentRecord> = records
            .values()
            .filter(|record| record.visitor_id() == visitor_id)
            .cloned()
            .collect();
        history.sort_by_key(|record| std::cmp::Reverse(record.granted_at()));
        Ok(history)
    }
}
