use std::collections::HashMap;

use async_trait::async_trait;
use gatehouse_application::VisitRepository;
use gatehouse_core::{AppError, AppResult, VisitId, VisitorId};
use gatehouse_domain::{Visit, VisitStatus};
use tokio::sync::RwLock;

/// In-memory visit repository implementation.
#[derive(Debug, Default)]
pub struct InMemoryVisitRepository {
    visits: RwLock<HashMap<VisitId, Visit>>,
}

impl InMemoryVisitRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            visits: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl VisitRepository for InMemoryVisitRepository {
    async fn insert(&self, visit: Visit) -> AppResult<()> {
        let mut visits = self.visits.write().await;

        if visits.contains_key(&visit.id()) {
            return Err(AppError::Conflict(format!(
                "visit '{}' already exists",
                visit.id()
            )));
        }

        visits.insert(visit.id(), visit);
        Ok(())
    }

    async fn find(&self, visit_id: VisitId) -> AppResult<Option<Visit>> {
        let visits = self.visits.read().await;
        Ok(visits.get(&visit_id).cloned())
    }

    async fn update(&self, visit: Visit) -> AppResult<()> {
        let mut visits = self.visits.write().await;

        if !visits.contains_key(&visit.id()) {
            return Err(AppError::NotFound(format!("visit '{}'", visit.id())));
        }

        visits.insert(visit.id(), visit);
        Ok(())
    }

    async fn remove(&self, visit_id: VisitId) -> AppResult<()> {
        let mut visits = self.visits.write().await;
        visits.remove(&visit_id);
        Ok(())
    }

    async fn list_by_status(&self, status: VisitStatus) -> AppResult<Vec<Visit>> {
        let visits = self.visits.read().await;
        let mut values: Vec<Visit> = visits
            .values()
            .filter(|visit| visit.status() == status)
            .cloned()
            .collect();
        values.sort_by_key(Visit::scheduled_start);
        Ok(values)
    }

    async fn find_active_for_visitor(&self, visitor_id: VisitorId) -> AppResult<Option<Visit>> {
        let visits = self.visits.read().await;
        Ok(visits
            .values()
            .find(|visit| {
                visit.visitor_id() == visitor_id && visit.status() == VisitStatus::CheckedIn
            })
            .cloned())
    }

    async fn count_by_status(&self, status: VisitStatus) -> AppResult<usize> {
        let visits = self.visits.read().await;
        Ok(visits
            .values()
            .filter(|visit| visit.status() == status)
            .count())
    }
}
