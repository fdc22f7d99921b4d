use async_trait::async_trait;
use gatehouse_core::{AppResult, ConnectionId, UserId};
use gatehouse_domain::{NotificationPreferences, RealtimeMessage, StaffRole};
use tokio::sync::mpsc;

/// One live realtime connection known to the registry.
///
/// The sender is the connection's outbound frame queue; the websocket task
/// on the other end drains it.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    /// Connection identifier, unique per socket.
    pub connection_id: ConnectionId,
    /// Owning user.
    pub user_id: UserId,
    /// Role the connection authenticated as.
    pub role: StaffRole,
    /// Extra ad-hoc rooms beyond the role-implied ones.
    pub extra_rooms: Vec<String>,
    /// Outbound frame queue.
    pub sender: mpsc::Sender<RealtimeMessage>,
}

impl ConnectionHandle {
    /// Whether this connection is a member of the named room.
    #[must_use]
    pub fn in_room(&self, room: &str) -> bool {
        self.role.implied_rooms().contains(&room)
            || self.extra_rooms.iter().any(|extra| extra == room)
    }
}

/// Registry of live connections, shared by every connection task.
///
/// Implementations must use fine-grained (per-user or sharded) locking;
/// fan-out to thousands of connections must not serialize on one mutex.
/// State is in-memory only and rebuilt from reconnects after a restart.
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Registers a connection. Idempotent per connection id: re-registering
    /// replaces the stored handle.
    async fn register(&self, handle: ConnectionHandle) -> AppResult<()>;

    /// Removes a connection. Returns the owning user when the connection
    /// was known.
    async fn unregister(&self, connection_id: ConnectionId) -> AppResult<Option<UserId>>;

    /// Lists live connections for one user.
    async fn connections_for_user(&self, user_id: UserId) -> AppResult<Vec<ConnectionHandle>>;

    /// Lists live connections registered under a role.
    async fn connections_for_role(&self, role: StaffRole) -> AppResult<Vec<ConnectionHandle>>;

    /// Lists live connections in a named room.
    async fn connections_for_room(&self, room: &str) -> AppResult<Vec<ConnectionHandle>>;

    /// Lists every live connection.
    async fn all_connections(&self) -> AppResult<Vec<ConnectionHandle>>;

    /// Whether the user has at least one live connection.
    async fn is_online(&self, user_id: UserId) -> AppResult<bool>;
}

/// Outbound email capability. Transport is an external concern.
#[async_trait]
pub trait EmailService: Send + Sync {
    /// Sends one email.
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
    ) -> AppResult<()>;
}

/// Outbound SMS capability. Transport is an external concern.
#[async_trait]
pub trait SmsService: Send + Sync {
    /// Sends one SMS.
    async fn send_sms(&self, to: &str, body: &str) -> AppResult<()>;
}

/// Lookup port for staff role membership and notification preferences.
#[async_trait]
pub trait StaffDirectory: Send + Sync {
    /// Lists the users holding a role.
    async fn members_of_role(&self, role: StaffRole) -> AppResult<Vec<UserId>>;

    /// Returns a user's notification preferences, if the user is known.
    async fn preferences(&self, user_id: UserId) -> AppResult<Option<NotificationPreferences>>;
}
