use async_trait::async_trait;
use gatehouse_core::{AppResult, ConsentRecordId, VisitorId};
use gatehouse_domain::{ConsentRecord, ConsentType};

/// Repository port for consent records.
///
/// Records are append-mostly: updates only flip status/activity flags,
/// nothing is ever removed.
#[async_trait]
pub trait ConsentRepository: Send + Sync {
    /// Inserts a new record.
    async fn insert(&self, record: ConsentRecord) -> AppResult<()>;

    /// Finds a record by identifier.
    async fn find(&self, record_id: ConsentRecordId) -> AppResult<Option<ConsentRecord>>;

    /// Replaces a stored record. NotFound when the identifier is unknown.
    async fn update(&self, record: ConsentRecord) -> AppResult<()>;

    /// Finds the active record for a (visitor, type) pair, if one exists.
    async fn find_active(
        &self,
        visitor_id: VisitorId,
        consent_type: ConsentType,
    ) -> AppResult<Option<ConsentRecord>>;

    /// Lists the full history for a visitor, newest first.
    async fn list_for_visitor(&self, visitor_id: VisitorId) -> AppResult<Vec<ConsentRecord>>;
}
