use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gatehouse_core::{AppResult, AuditEntryId, VisitorId};
use gatehouse_domain::AuditLogEntry;

/// Repository port for the append-only audit ledger.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Appends one entry. A failure here must fail the causing operation.
    async fn append(&self, entry: AuditLogEntry) -> AppResult<()>;

    /// Finds an entry by identifier.
    async fn find(&self, entry_id: AuditEntryId) -> AppResult<Option<AuditLogEntry>>;

    /// Replaces a stored entry. Only anonymization goes through here.
    async fn update(&self, entry: AuditLogEntry) -> AppResult<()>;

    /// Removes an entry. Only the purge-mode retention sweep goes through
    /// here.
    async fn delete(&self, entry_id: AuditEntryId) -> AppResult<()>;

    /// Lists the newest entries, up to `limit`.
    async fn list_recent(&self, limit: usize) -> AppResult<Vec<AuditLogEntry>>;

    /// Lists entries referencing a visitor, newest first.
    async fn list_for_visitor(&self, visitor_id: VisitorId) -> AppResult<Vec<AuditLogEntry>>;

    /// Lists non-anonymized entries whose retention date is at or before
    /// `cutoff`.
    async fn list_expired(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<AuditLogEntry>>;
}
