use std::collections::HashMap;

use async_trait::async_trait;
use gatehouse_application::StaffDirectory;
use gatehouse_core::{AppResult, UserId};
use gatehouse_domain::{NotificationPreferences, StaffRole};
use tokio::sync::RwLock;

/// In-memory staff directory. Staff identity is an external capability;
/// this adapter holds the role roster and notification preferences the
/// router needs for escalation.
#[derive(Debug, Default)]
pub struct InMemoryStaffDirectory {
    roles: RwLock<HashMap<StaffRole, Vec<UserId>>>,
    preferences: RwLock<HashMap<UserId, NotificationPreferences>>,
}

impl InMemoryStaffDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            roles: RwLock::new(HashMap::new()),
            preferences: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a user to a role roster.
    pub async fn add_member(&self, role: StaffRole, user_id: UserId) {
        let mut roles = self.roles.write().await;
        let members = roles.entry(role).or_default();
        if !members.contains(&user_id) {
            members.push(user_id);
        }
    }

    /// Sets a user's notification preferences.
    pub async fn set_preferences(&self, user_id: UserId, preferences: NotificationPreferences) {
        self.preferences.write().await.insert(user_id, preferences);
    }
}

#[async_trait]
impl StaffDirectory for InMemoryStaffDirectory {
    async fn members_of_role(&self, role: StaffRole) -> AppResult<Vec<UserId>> {
        let roles = self.roles.read().await;
        Ok(roles.get(&role).cloned().unwrap_or_default())
    }

    async fn preferences(&self, user_id: UserId) -> AppResult<Option<NotificationPreferences>> {
        let preferences = self.preferences.read().await;
        Ok(preferences.get(&user_id).cloned())
    }
}
