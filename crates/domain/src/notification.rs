use std::str::FromStr;

use chrono::{DateTime, Utc};
use gatehouse_core::{AppError, EmailAddress, PhoneNumber, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shared room joined by every front-of-house staff connection.
pub const FRONT_DESK_ROOM: &str = "front_desk";

/// Server-pushed realtime event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Generic informational notification.
    Notification,
    /// A visitor checked in and the host should be told.
    VisitorArrived,
    /// A visitor checked out.
    VisitorDeparted,
    /// Emergency declared in the facility.
    EmergencyNotification,
    /// Live occupancy count changed.
    OccupancyChanged,
    /// Occupancy crossed the configured alert threshold.
    OccupancyAlert,
    /// A checked-in visit passed its expected checkout time.
    VisitOverdue,
}

impl NotificationKind {
    /// Returns the stable wire value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notification => "notification",
            Self::VisitorArrived => "visitor_arrived",
            Self::VisitorDeparted => "visitor_departed",
            Self::EmergencyNotification => "emergency_notification",
            Self::OccupancyChanged => "occupancy_changed",
            Self::OccupancyAlert => "occupancy_alert",
            Self::VisitOverdue => "visit_overdue",
        }
    }
}

/// Staff roles known to the notification router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    /// Facility administrator.
    Admin,
    /// Front-desk receptionist.
    Receptionist,
    /// Security officer.
    Security,
    /// Regular employee who hosts visitors.
    Host,
}

impl StaffRole {
    /// Returns the stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Receptionist => "receptionist",
            Self::Security => "security",
            Self::Host => "host",
        }
    }

    /// Shared rooms a connection with this role joins automatically.
    #[must_use]
    pub fn implied_rooms(&self) -> &'static [&'static str] {
        match self {
            Self::Receptionist | Self::Security => &[FRONT_DESK_ROOM],
            Self::Admin | Self::Host => &[],
        }
    }
}

impl FromStr for StaffRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Self::Admin),
            "receptionist" => Ok(Self::Receptionist),
            "security" => Ok(Self::Security),
            "host" => Ok(Self::Host),
            _ => Err(AppError::Validation(format!(
                "unknown staff role '{value}'"
            ))),
        }
    }
}

/// Addressing for one logical notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationTarget {
    /// A single user's personal channel.
    User {
        /// Target user.
        user_id: UserId,
    },
    /// Every connection registered under a role.
    Role {
        /// Target role.
        role: StaffRole,
    },
    /// Every connection in a named shared room.
    Room {
        /// Target room name.
        room: String,
    },
    /// Every live connection.
    Broadcast,
}

/// Delivery urgency. High and critical events escalate to off-line channels
/// when the target user has no live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    /// Informational, realtime only.
    Low,
    /// Default priority, realtime only.
    Normal,
    /// Important, escalates to durable channels for offline users.
    High,
    /// Emergency. Escalates, and exhausting every channel is an error.
    Critical,
}

impl NotificationPriority {
    /// Whether offline targets must be reached over durable channels.
    #[must_use]
    pub fn requires_durability(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

/// Delivery channels in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    /// Live websocket push.
    Realtime,
    /// Email fallback.
    Email,
    /// SMS fallback of last resort.
    Sms,
}

impl NotificationChannel {
    /// Returns the stable storage value for this channel.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Realtime => "realtime",
            Self::Email => "email",
            Self::Sms => "sms",
        }
    }
}

/// Outcome of one channel attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelOutcome {
    /// The channel accepted the message.
    Delivered,
    /// The recipient has the channel disabled; not attempted.
    SkippedDisabled,
    /// The channel was attempted and failed (provider error or timeout).
    Failed,
}

impl ChannelOutcome {
    /// Returns the stable storage value for this outcome.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::SkippedDisabled => "skipped_disabled",
            Self::Failed => "failed",
        }
    }
}

/// One recorded channel attempt for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAttempt {
    /// Channel attempted.
    pub channel: NotificationChannel,
    /// When the attempt completed.
    pub attempted_at: DateTime<Utc>,
    /// What happened.
    pub outcome: ChannelOutcome,
}

/// Per-recipient channel preferences, resolved by the staff directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    /// Whether email escalation is enabled.
    pub email_enabled: bool,
    /// Whether SMS escalation is enabled.
    pub sms_enabled: bool,
    /// Escalation email address.
    pub email: Option<EmailAddress>,
    /// Escalation phone number.
    pub phone: Option<PhoneNumber>,
}

/// One logical notification to fan out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Wire kind of the event.
    pub kind: NotificationKind,
    /// One or more addressing targets; delivery set is their union.
    pub targets: Vec<NotificationTarget>,
    /// Short human title.
    pub title: String,
    /// Human message body.
    pub message: String,
    /// Structured payload pushed alongside the message.
    pub data: Value,
    /// Delivery urgency.
    pub priority: NotificationPriority,
    /// When the event was created.
    pub created_at: DateTime<Utc>,
}

impl NotificationEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(
        kind: NotificationKind,
        targets: Vec<NotificationTarget>,
        title: impl Into<String>,
        message: impl Into<String>,
        data: Value,
        priority: NotificationPriority,
    ) -> Self {
        Self {
            kind,
            targets,
            title: title.into(),
            message: message.into(),
            data,
            priority,
            created_at: Utc::now(),
        }
    }
}

/// Frame pushed to a live connection: `{type, title, message, data, timestamp}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeMessage {
    /// Event kind wire value.
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Short human title.
    pub title: String,
    /// Human message body.
    pub message: String,
    /// Structured payload.
    pub data: Value,
    /// Event creation time.
    pub timestamp: DateTime<Utc>,
}

impl RealtimeMessage {
    /// Builds the wire frame for an event.
    #[must_use]
    pub fn from_event(event: &NotificationEvent) -> Self {
        Self {
            kind: event.kind,
            title: event.title.clone(),
            message: event.message.clone(),
            data: event.data.clone(),
            timestamp: event.created_at,
        }
    }
}
