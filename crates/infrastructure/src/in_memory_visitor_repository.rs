use std::collections::HashMap;

use async_trait::async_trait;
use gatehouse_application::VisitorRepository;
use gatehouse_core::{AppError, AppResult, VisitorId};
use gatehouse_domain::Visitor;
use tokio::sync::RwLock;

/// In-memory visitor repository implementation.
#[derive(Debug, Default)]
pub struct InMemoryVisitorRepository {
    visitors: RwLock<HashMap<VisitorId, Visitor>>,
}

impl InMemoryVisitorRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            visitors: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl VisitorRepository for InMemoryVisitorRepository {
    async fn insert(&self, visitor: Visitor) -> AppResult<()> {
        let mut visitors = self.visitors.write().await;

        if visitors.contains_key(&visitor.id()) {
            return Err(AppError::Conflict(format!(
                "visitor '{}' already exists",
                visitor.id()
            )));
        }
        if visitors
            .values()
            .any(|stored| stored.email().as_str() == visitor.email().as_str())
        {
            return Err(AppError::Conflict(format!(
                "a visitor with email '{}' already exists",
                visitor.email()
            )));
        }

        visitors.insert(visitor.id(), visitor);
        Ok(())
    }

    async fn find(&self, visitor_id: VisitorId) -> AppResult<Option<Visitor>> {
        let visitors = self.visitors.read().await;
        Ok(visitors.get(&visitor_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Visitor>> {
        let visitors = self.visitors.read().await;
        Ok(visitors
            .values()
            .find(|visitor| visitor.email().as_str() == email)
            .cloned())
    }

    async fn update(&self, visitor: Visitor) -> AppResult<()> {
        let mut visitors = self.visitors.write().await;

        if !visitors.contains_key(&visitor.id()) {
            return Err(AppError::NotFound(format!("visitor '{}'", visitor.id())));
        }

        visitors.insert(visitor.id(), visitor);
        Ok(())
    }

    async fn list(&self) -> AppResult<Vec<Visitor>> {
        let visitors = self.visitors.read().await;
        let mut values: Vec<Visitor> = visitors.values().cloned().collect();
        values.sort_by_key(Visitor::created_at);
        Ok(values)
    }
}
