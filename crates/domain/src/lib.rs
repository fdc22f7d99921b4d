//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod audit;
mod consent;
mod notification;
mod visit;
mod visitor;

pub use audit::{
    AuditAction, AuditActor, AuditCategory, AuditDetail, AuditLogEntry, AuditOutcome,
    AuditSeverity, NewAuditEntry, RiskLevel,
};
pub use consent::{ConsentMethod, ConsentRecord, ConsentStatus, ConsentType};
pub use notification::{
    ChannelOutcome, FRONT_DESK_ROOM, NotificationAttempt, NotificationChannel, NotificationEvent,
    NotificationKind, NotificationPreferences, NotificationPriority, NotificationTarget,
    RealtimeMessage, StaffRole,
};
pub use visit::{EvacuationRecord, QrToken, Visit, VisitAnnotation, VisitStatus};
pub use visitor::{ConsentSummary, Visitor};
