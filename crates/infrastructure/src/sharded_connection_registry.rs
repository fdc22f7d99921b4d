use std::collections::HashMap;

use async_trait::async_trait;
use gatehouse_application::{ConnectionHandle, ConnectionRegistry};
use gatehouse_core::{AppResult, ConnectionId, UserId};
use gatehouse_domain::StaffRole;
use tokio::sync::RwLock;
use uuid::Uuid;

const SHARD_COUNT: usize = 16;

/// Sharded live-connection registry.
///
/// Connections are stored in a fixed array of shards keyed by the owning
/// user id, so per-user lookups and presence checks touch one shard and
/// never contend on a global lock. A second sharded index maps connection
/// ids back to users for unregistration. Role and room queries fan across
/// all shards; they run on dispatch, which is already a fan-out.
pub struct ShardedConnectionRegistry {
    shards: Vec<RwLock<HashMap<ConnectionId, ConnectionHandle>>>,
    owners: Vec<RwLock<HashMap<ConnectionId, UserId>>>,
}

impl ShardedConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect(),
            owners: (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    fn shard_index(id: Uuid) -> usize {
        (id.as_u128() % SHARD_COUNT as u128) as usize
    }

    fn user_shard(&self, user_id: UserId) -> &RwLock<HashMap<ConnectionId, ConnectionHandle>> {
        &self.shards[Self::shard_index(user_id.as_uuid())]
    }

    fn owner_shard(&self, connection_id: ConnectionId) -> &RwLock<HashMap<ConnectionId, UserId>> {
        &self.owners[Self::shard_index(connection_id.as_uuid())]
    }
}

impl Default for ShardedConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionRegistry for ShardedConnectionRegistry {
    async fn register(&self, handle: ConnectionHandle) -> AppResult<()> {
        let connection_id = handle.connection_id;
        let user_id = handle.user_id;

        {
            let mut shard = self.user_shard(user_id).write().await;
            shard.insert(connection_id, handle);
        }

        let mut owners = self.owner_shard(connection_id).write().await;
        owners.insert(connection_id, user_id);
        Ok(())
    }

    async fn unregister(&self, connection_id: ConnectionId) -> AppResult<Option<UserId>> {
        let owner = {
            let mut owners = self.owner_shard(connection_id).write().await;
            owners.remove(&connection_id)
        };

        let Some(user_id) = owner else {
            return Ok(None);
        };

        let mut shard = self.user_shard(user_id).write().await;
        shard.remove(&connection_id);
        Ok(Some(user_id))
    }

    async fn connections_for_user(&self, user_id: UserId) -> AppResult<Vec<ConnectionHandle>> {
        let shard = self.user_shard(user_id).read().await;
        Ok(shard
            .values()
            .filter(|handle| handle.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn connections_for_role(&self, role: StaffRole) -> AppResult<Vec<ConnectionHandle>> {
        let mut matches = Vec::new();
        for shard in &self.shards {
            let shard = shard.read().await;
            matches.extend(shard.values().filter(|handle| handle.role == role).cloned());
        }
        Ok(matches)
    }

    async fn connections_for_room(&self, room: &str) -> AppResult<Vec<ConnectionHandle>> {
        let mut matches = Vec::new();
        for shard in &self.shards {
            let shard = shard.read().await;
            matches.extend(shard.values().filter(|handle| handle.in_room(room)).cloned());
        }
        Ok(matches)
    }

    async fn all_connections(&self) -> AppResult<Vec<ConnectionHandle>> {
        let mut connections = Vec::new();
        for shard in &self.shards {
            let shard = shard.read().await;
            connections.extend(shard.values().cloned());
        }
        Ok(connections)
    }

    async fn is_online(&self, user_id: UserId) -> AppResult<bool> {
        let shard = self.user_shard(user_id).read().await;
        Ok(shard.values().any(|handle| handle.user_id == user_id))
    }
}

#[cfg(test)]
mod tests {
    use gatehouse_domain::StaffRole;
    use tokio::sync::mpsc;

    use super::*;

    fn handle(user_id: UserId, role: StaffRole) -> ConnectionHandle {
        let (sender, _receiver) = mpsc::channel(1);
        ConnectionHandle {
            connection_id: ConnectionId::new(),
            user_id,
            role,
            extra_rooms: Vec::new(),
            sender,
        }
    }

    #[tokio::test]
    async fn register_and_unregister_roundtrip() {
        let registry = ShardedConnectionRegistry::new();
        let user_id = UserId::new();
        let connection = handle(user_id, StaffRole::Host);
        let connection_id = connection.connection_id;

        assert!(registry.register(connection).await.is_ok());
        assert!(registry.is_online(user_id).await.is_ok_and(|online| online));

        let removed = registry.unregister(connection_id).await;
        assert!(removed.is_ok_and(|owner| owner == Some(user_id)));
        assert!(registry.is_online(user_id).await.is_ok_and(|online| !online));
    }

    #[tokio::test]
    async fn user_stays_online_until_last_connection_closes() {
        let registry = ShardedConnectionRegistry::new();
        let user_id = UserId::new();
        let first = handle(user_id, StaffRole::Host);
        let second = handle(user_id, StaffRole::Host);
        let first_id = first.connection_id;

        assert!(registry.register(first).await.is_ok());
        assert!(registry.register(second).await.is_ok());

        assert!(registry.unregister(first_id).await.is_ok());
        assert!(registry.is_online(user_id).await.is_ok_and(|online| online));
    }

    #[tokio::test]
    async fn role_queries_fan_across_shards() {
        let registry = ShardedConnectionRegistry::new();
        for _ in 0..20 {
            let connection = handle(UserId::new(), StaffRole::Security);
            assert!(registry.register(connection).await.is_ok());
        }
        let connection = handle(UserId::new(), StaffRole::Host);
        assert!(registry.register(connection).await.is_ok());

        let security = registry.connections_for_role(StaffRole::Security).await;
        assert!(security.is_ok_and(|connections| connections.len() == 20));

        let everyone = registry.all_connections().await;
        assert!(everyone.is_ok_and(|connections| connections.len() == 21));
    }

    #[tokio::test]
    async fn role_implied_rooms_are_queryable() {
        let registry = ShardedConnectionRegistry::new();
        let connection = handle(UserId::new(), StaffRole::Receptionist);
        assert!(registry.register(connection).await.is_ok());

        let front_desk = registry
            .connections_for_room(gatehouse_domain::FRONT_DESK_ROOM)
            .await;
        assert!(front_desk.is_ok_and(|connections| connections.len() == 1));
    }
}
