use async_trait::async_trait;
use gatehouse_core::{AppResult, VisitId, VisitorId};
use gatehouse_domain::{Visit, VisitStatus, Visitor};

/// Repository port for visitor profiles.
#[async_trait]
pub trait VisitorRepository: Send + Sync {
    /// Inserts a new visitor. Conflict when the identifier already exists.
    async fn insert(&self, visitor: Visitor) -> AppResult<()>;

    /// Finds a visitor by identifier.
    async fn find(&self, visitor_id: VisitorId) -> AppResult<Option<Visitor>>;

    /// Finds a visitor by normalized email.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Visitor>>;

    /// Replaces a stored visitor. NotFound when the identifier is unknown.
    async fn update(&self, visitor: Visitor) -> AppResult<()>;

    /// Lists all visitors.
    async fn list(&self) -> AppResult<Vec<Visitor>>;
}

/// Repository port for visit state.
///
/// The registry service is the sole writer; the repository only stores.
#[async_trait]
pub trait VisitRepository: Send + Sync {
    /// Inserts a new visit. Conflict when the identifier already exists.
    async fn insert(&self, visit: Visit) -> AppResult<()>;

    /// Finds a visit by identifier.
    async fn find(&self, visit_id: VisitId) -> AppResult<Option<Visit>>;

    /// Replaces a stored visit. NotFound when the identifier is unknown.
    async fn update(&self, visit: Visit) -> AppResult<()>;

    /// Removes a visit. Used only to roll back an insert whose audit write
    /// failed.
    async fn remove(&self, visit_id: VisitId) -> AppResult<()>;

    /// Lists visits currently in the given state.
    async fn list_by_status(&self, status: VisitStatus) -> AppResult<Vec<Visit>>;

    /// Finds the active (`checked_in`) visit for a visitor, if one exists.
    async fn find_active_for_visitor(&self, visitor_id: VisitorId) -> AppResult<Option<Visit>>;

    /// Counts visits currently in the given state.
    async fn count_by_status(&self, status: VisitStatus) -> AppResult<usize>;
}
