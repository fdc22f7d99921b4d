use std::str::FromStr;

use chrono::{DateTime, Utc};
use gatehouse_core::{
    AppError, AuditEntryId, ConsentRecordId, UserId, VisitId, VisitorId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consent::{ConsentStatus, ConsentType};
use crate::notification::{NotificationAttempt, NotificationKind};
use crate::visit::VisitStatus;

/// Stable audit actions emitted by application use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A visit was pre-registered.
    VisitPreRegistered,
    /// A visit moved to checked-in.
    VisitCheckedIn,
    /// A visit moved to checked-out.
    VisitCheckedOut,
    /// A visit was cancelled before arrival.
    VisitCancelled,
    /// A pre-registration expired unclaimed.
    VisitExpired,
    /// A pre-registration lapsed into no-show.
    VisitNoShow,
    /// A checked-in visit was marked evacuated.
    VisitEvacuated,
    /// A completed visit received rating or feedback.
    VisitAnnotated,
    /// A checked-in visit passed its expected checkout.
    VisitOverdueFlagged,
    /// Pre-registration or check-in was blocked by policy.
    VisitPolicyRejected,
    /// A visitor profile was registered.
    VisitorRegistered,
    /// A visitor was placed on the blacklist.
    VisitorBlacklisted,
    /// A visitor was removed from the blacklist.
    VisitorUnblacklisted,
    /// A consent grant was recorded.
    ConsentGranted,
    /// A consent grant was withdrawn.
    ConsentWithdrawn,
    /// A consent grant was renewed.
    ConsentRenewed,
    /// A notification event finished its channel attempts.
    NotificationDispatched,
    /// An emergency broadcast went out.
    EmergencyBroadcast,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VisitPreRegistered => "visit.pre_registered",
            Self::VisitCheckedIn => "visit.checked_in",
            Self::VisitCheckedOut => "visit.checked_out",
            Self::VisitCancelled => "visit.cancelled",
            Self::VisitExpired => "visit.expired",
            Self::VisitNoShow => "visit.no_show",
            Self::VisitEvacuated => "visit.evacuated",
            Self::VisitAnnotated => "visit.annotated",
            Self::VisitOverdueFlagged => "visit.overdue_flagged",
            Self::VisitPolicyRejected => "visit.policy_rejected",
            Self::VisitorRegistered => "visitor.registered",
            Self::VisitorBlacklisted => "visitor.blacklisted",
            Self::VisitorUnblacklisted => "visitor.unblacklisted",
            Self::ConsentGranted => "consent.granted",
            Self::ConsentWithdrawn => "consent.withdrawn",
            Self::ConsentRenewed => "consent.renewed",
            Self::NotificationDispatched => "notification.dispatched",
            Self::EmergencyBroadcast => "emergency.broadcast",
        }
    }
}

/// Audit entry categories; each carries its own retention policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    /// Login and identity events.
    Authentication,
    /// Permission checks and grants.
    Authorization,
    /// Reads of sensitive records.
    DataAccess,
    /// Writes to sensitive records.
    DataModification,
    /// System-level access (connections, dispatch).
    SystemAccess,
    /// Security-relevant policy events.
    Security,
    /// Personal-data handling events.
    Privacy,
    /// Regulatory record-keeping events.
    Compliance,
    /// Unexpected failures.
    Error,
}

impl AuditCategory {
    /// Returns a stable storage value for this category.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::DataAccess => "data_access",
            Self::DataModification => "data_modification",
            Self::SystemAccess => "system_access",
            Self::Security => "security",
            Self::Privacy => "privacy",
            Self::Compliance => "compliance",
            Self::Error => "error",
        }
    }
}

impl FromStr for AuditCategory {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "authentication" => Ok(Self::Authentication),
            "authorization" => Ok(Self::Authorization),
            "data_access" => Ok(Self::DataAccess),
            "data_modification" => Ok(Self::DataModification),
            "system_access" => Ok(Self::SystemAccess),
            "security" => Ok(Self::Security),
            "privacy" => Ok(Self::Privacy),
            "compliance" => Ok(Self::Compliance),
            "error" => Ok(Self::Error),
            _ => Err(AppError::Validation(format!(
                "unknown audit category '{value}'"
            ))),
        }
    }
}

/// Severity of an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
    /// Routine event.
    Info,
    /// Needs review.
    Warning,
    /// Needs immediate attention.
    Critical,
}

impl AuditSeverity {
    /// Returns a stable storage value for this severity.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// Whether the audited action succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// The action completed.
    Success,
    /// The action was rejected or failed.
    Failure,
}

impl AuditOutcome {
    /// Returns a stable storage value for this outcome.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Assessed risk level of the audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Routine operation.
    Low,
    /// Elevated interest.
    Medium,
    /// Policy-relevant.
    High,
    /// Incident-grade.
    Critical,
}

/// Who performed the audited action. A `None` user is the system itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditActor {
    /// Acting staff user, if any.
    pub user_id: Option<UserId>,
    /// Source IP address, if known.
    pub ip_address: Option<String>,
    /// Client user agent, if known.
    pub user_agent: Option<String>,
    /// Session identifier, if known.
    pub session_id: Option<String>,
}

impl AuditActor {
    /// The system actor for scheduler- and router-driven entries.
    #[must_use]
    pub fn system() -> Self {
        Self::default()
    }

    /// An operator actor without transport metadata.
    #[must_use]
    pub fn operator(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }
}

/// Closed, tagged per-action detail payloads.
///
/// Replaces the loosely-typed JSON "details" column of the usual audit
/// schema: each action carries exactly the fields its variant declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditDetail {
    /// A visit lifecycle transition.
    VisitTransition {
        /// Visit that moved.
        visit_id: VisitId,
        /// State before the transition, if the visit already existed.
        from: Option<VisitStatus>,
        /// State after the transition.
        to: VisitStatus,
    },
    /// A policy gate rejected an operation.
    PolicyRejection {
        /// The rule that fired.
        rule: String,
        /// The visit involved, when the gate ran against an existing visit.
        visit_id: Option<VisitId>,
    },
    /// A consent record changed.
    ConsentChange {
        /// The record affected.
        record_id: ConsentRecordId,
        /// Its consent purpose.
        consent_type: ConsentType,
        /// Its resulting status.
        status: ConsentStatus,
        /// Its version.
        version: i32,
    },
    /// A notification event finished its channel attempts.
    Delivery {
        /// Event kind.
        kind: NotificationKind,
        /// Human summary of the target set.
        target_summary: String,
        /// One entry per channel attempted.
        attempts: Vec<NotificationAttempt>,
    },
    /// A visitor profile changed.
    VisitorChange {
        /// The field or aspect that changed.
        field: String,
    },
    /// An emergency broadcast.
    Emergency {
        /// Broadcast message.
        message: String,
        /// Number of visits marked evacuated.
        evacuated_visits: usize,
    },
    /// Detail redacted by anonymization.
    Redacted,
}

/// Input for appending an audit entry. The trail computes identifier,
/// timestamp and retention date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    /// Who acted.
    pub actor: AuditActor,
    /// Visitor subject, if any.
    pub visitor_id: Option<VisitorId>,
    /// Visit subject, if any.
    pub visit_id: Option<VisitId>,
    /// Stable action.
    pub action: AuditAction,
    /// Retention category.
    pub category: AuditCategory,
    /// Severity.
    pub severity: AuditSeverity,
    /// Outcome.
    pub outcome: AuditOutcome,
    /// Assessed risk.
    pub risk_level: RiskLevel,
    /// Per-action detail payload.
    pub detail: AuditDetail,
    /// Snapshot before the change, if the action mutated a record.
    pub before: Option<Value>,
    /// Snapshot after the change, if the action mutated a record.
    pub after: Option<Value>,
}

/// One append-only entry of the compliance ledger.
///
/// The only permitted mutation is [`AuditLogEntry::anonymize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    id: AuditEntryId,
    occurred_at: DateTime<Utc>,
    actor: AuditActor,
    visitor_id: Option<VisitorId>,
    visit_id: Option<VisitId>,
    action: AuditAction,
    category: AuditCategory,
    severity: AuditSeverity,
    outcome: AuditOutcome,
    risk_level: RiskLevel,
    detail: AuditDetail,
    before: Option<Value>,
    after: Option<Value>,
    retention_until: DateTime<Utc>,
    anonymized: bool,
}

impl AuditLogEntry {
    /// Materializes an entry from its input, stamped and retention-dated.
    #[must_use]
    pub fn from_input(
        input: NewAuditEntry,
        retention_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            occurred_at: now,
            actor: input.actor,
            visitor_id: input.visitor_id,
            visit_id: input.visit_id,
            action: input.action,
            category: input.category,
            severity: input.severity,
            outcome: input.outcome,
            risk_level: input.risk_level,
            detail: input.detail,
            before: input.before,
            after: input.after,
            retention_until,
            anonymized: false,
        }
    }

    /// Irreversibly redacts direct identifiers while preserving the
    /// statistical fields (action, category, severity, outcome, risk).
    ///
    /// Returns `false` when the entry was already anonymized.
    pub fn anonymize(&mut self) -> bool {
        if self.anonymized {
            return false;
        }

        self.actor = AuditActor {
            user_id: None,
            ip_address: None,
            user_agent: None,
            session_id: None,
        };
        self.visitor_id = None;
        self.visit_id = None;
        self.detail = AuditDetail::Redacted;
        self.before = None;
        self.after = None;
        self.anonymized = true;
        true
    }

    /// Whether the retention date has passed.
    #[must_use]
    pub fn is_past_retention(&self, now: DateTime<Utc>) -> bool {
        now >= self.retention_until
    }

    /// Returns the entry identifier.
    #[must_use]
    pub fn id(&self) -> AuditEntryId {
        self.id
    }

    /// Returns when the action happened.
    #[must_use]
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Returns the actor.
    #[must_use]
    pub fn actor(&self) -> &AuditActor {
        &self.actor
    }

    /// Returns the visitor subject, if any.
    #[must_use]
    pub fn visitor_id(&self) -> Option<VisitorId> {
        self.visitor_id
    }

    /// Returns the visit subject, if any.
    #[must_use]
    pub fn visit_id(&self) -> Option<VisitId> {
        self.visit_id
    }

    /// Returns the action.
    #[must_use]
    pub fn action(&self) -> AuditAction {
        self.action
    }

    /// Returns the category.
    #[must_use]
    pub fn category(&self) -> AuditCategory {
        self.category
    }

    /// Returns the severity.
    #[must_use]
    pub fn severity(&self) -> AuditSeverity {
        self.severity
    }

    /// Returns the outcome.
    #[must_use]
    pub fn outcome(&self) -> AuditOutcome {
        self.outcome
    }

    /// Returns the assessed risk level.
    #[must_use]
    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    /// Returns the detail payload.
    #[must_use]
    pub fn detail(&self) -> &AuditDetail {
        &self.detail
    }

    /// Returns the pre-change snapshot, if recorded.
    #[must_use]
    pub fn before(&self) -> Option<&Value> {
        self.before.as_ref()
    }

    /// Returns the post-change snapshot, if recorded.
    #[must_use]
    pub fn after(&self) -> Option<&Value> {
        self.after.as_ref()
    }

    /// Returns the retention date.
    #[must_use]
    pub fn retention_until(&self) -> DateTime<Utc> {
        self.retention_until
    }

    /// Whether the entry has been anonymized.
    #[must_use]
    pub fn is_anonymized(&self) -> bool {
        self.anonymized
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use gatehouse_core::{UserId, VisitId, VisitorId};
    use serde_json::json;

    use super::{
        AuditAction, AuditActor, AuditCategory, AuditDetail, AuditLogEntry, AuditOutcome,
        AuditSeverity, NewAuditEntry, RiskLevel,
    };
    use crate::visit::VisitStatus;

    fn entry() -> AuditLogEntry {
        let input = NewAuditEntry {
            actor: AuditActor {
                user_id: Some(UserId::new()),
                ip_address: Some("203.0.113.9".to_owned()),
                user_agent: Some("kiosk/2.1".to_owned()),
                session_id: Some("sess-1".to_owned()),
            },
            visitor_id: Some(VisitorId::new()),
            visit_id: Some(VisitId::new()),
            action: AuditAction::VisitCheckedIn,
            category: AuditCategory::DataModification,
            severity: AuditSeverity::Info,
            outcome: AuditOutcome::Success,
            risk_level: RiskLevel::Low,
            detail: AuditDetail::VisitTransition {
                visit_id: VisitId::new(),
                from: Some(VisitStatus::PreRegistered),
                to: VisitStatus::CheckedIn,
            },
            before: Some(json!({"status": "pre_registered"})),
            after: Some(json!({"status": "checked_in"})),
        };

        AuditLogEntry::from_input(input, Utc::now() + Duration::days(2555), Utc::now())
    }

    #[test]
    fn anonymize_redacts_identifiers_and_keeps_statistics() {
        let mut entry = entry();

        assert!(entry.anonymize());
        assert!(entry.is_anonymized());
        assert!(entry.actor().user_id.is_none());
        assert!(entry.actor().ip_address.is_none());
        assert!(entry.actor().user_agent.is_none());
        assert!(entry.actor().session_id.is_none());
        assert!(entry.visitor_id().is_none());
        assert!(entry.before().is_none());
        assert!(entry.after().is_none());
        assert!(matches!(entry.detail(), AuditDetail::Redacted));

        assert_eq!(entry.action(), AuditAction::VisitCheckedIn);
        assert_eq!(entry.category(), AuditCategory::DataModification);
        assert_eq!(entry.outcome(), AuditOutcome::Success);
    }

    #[test]
    fn anonymize_is_idempotent() {
        let mut entry = entry();
        assert!(entry.anonymize());
        assert!(!entry.anonymize());
    }

    #[test]
    fn detail_serializes_as_tagged_variant() {
        let entry = entry();
        let value = serde_json::to_value(entry.detail()).unwrap_or_default();
        assert_eq!(value["type"], "visit_transition");
        assert_eq!(value["to"], "checked_in");
    }
}
