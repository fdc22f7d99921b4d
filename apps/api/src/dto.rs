use chrono::{DateTime, Utc};
use gatehouse_application::{OccupancySnapshot, PreRegisteredVisit};
use gatehouse_core::{ConsentRecordId, UserId, VisitId, VisitorId};
use gatehouse_domain::{AuditLogEntry, ConsentRecord, Visit, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Health response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Incoming payload for visit pre-registration.
#[derive(Debug, Deserialize)]
pub struct PreRegisterVisitRequest {
    pub visitor_id: VisitorId,
    pub host_id: UserId,
    pub operator_id: UserId,
    pub purpose: String,
    pub scheduled_start: DateTime<Utc>,
    pub expected_duration_minutes: Option<i64>,
}

/// Incoming payload for check-in.
#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    pub operator_id: UserId,
}

/// Incoming payload for check-out.
#[derive(Debug, Deserialize)]
pub struct CheckOutRequest {
    pub operator_id: UserId,
    pub rating: Option<u8>,
    pub feedback: Option<String>,
}

/// Incoming payload for cancellation.
#[derive(Debug, Deserialize)]
pub struct CancelVisitRequest {
    pub operator_id: UserId,
    pub reason: String,
}

/// Incoming payload for the emergency broadcast.
#[derive(Debug, Deserialize)]
pub struct EmergencyRequest {
    pub operator_id: UserId,
    pub message: String,
}

/// API representation of a visit.
#[derive(Debug, Serialize)]
pub struct VisitResponse {
    pub id: VisitId,
    pub visitor_id: VisitorId,
    pub host_id: UserId,
    pub purpose: String,
    pub status: &'static str,
    pub scheduled_start: DateTime<Utc>,
    pub expected_duration_minutes: Option<i64>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub checked_out_at: Option<DateTime<Utc>>,
    pub expected_checkout: Option<DateTime<Utc>>,
    pub actual_duration_minutes: Option<i64>,
    pub badge_number: Option<String>,
    pub evacuated: bool,
    pub overdue_flagged: bool,
    pub cancel_reason: Option<String>,
    pub rating: Option<u8>,
}

impl From<Visit> for VisitResponse {
    fn from(visit: Visit) -> Self {
        Self {
            id: visit.id(),
            visitor_id: visit.visitor_id(),
            host_id: visit.host_id(),
            purpose: visit.purpose().to_string(),
            status: visit.status().as_str(),
            scheduled_start: visit.scheduled_start(),
            expected_duration_minutes: visit.expected_duration_minutes(),
            checked_in_at: visit.checked_in_at(),
            checked_out_at: visit.checked_out_at(),
            expected_checkout: visit.expected_checkout(),
            actual_duration_minutes: visit.actual_duration_minutes(),
            badge_number: visit.badge_number().map(str::to_owned),
            evacuated: visit.evacuation().is_some(),
            overdue_flagged: visit.overdue_flagged(),
            cancel_reason: visit.cancel_reason().map(str::to_owned),
            rating: visit.annotation().map(|annotation| annotation.rating),
        }
    }
}

/// Pre-registration response: the visit plus the raw QR token. The token
/// appears only here; the service stores its hash.
#[derive(Debug, Serialize)]
pub struct PreRegisteredVisitResponse {
    pub visit: VisitResponse,
    pub qr_token: String,
}

impl From<PreRegisteredVisit> for PreRegisteredVisitResponse {
    fn from(outcome: PreRegisteredVisit) -> Self {
        Self {
            visit: VisitResponse::from(outcome.visit),
            qr_token: outcome.qr_token,
        }
    }
}

/// Current occupancy projection.
#[derive(Debug, Serialize)]
pub struct OccupancyResponse {
    pub current: usize,
    pub max: usize,
    pub rate: f64,
}

impl From<OccupancySnapshot> for OccupancyResponse {
    fn from(snapshot: OccupancySnapshot) -> Self {
        Self {
            current: snapshot.current,
            max: snapshot.max,
            rate: snapshot.rate,
        }
    }
}

/// Incoming payload for visitor registration.
#[derive(Debug, Deserialize)]
pub struct RegisterVisitorRequest {
    pub operator_id: UserId,
    pub email: String,
    pub full_name: String,
    pub company: Option<String>,
    pub phone: Option<String>,
}

/// Incoming payload for blacklisting.
#[derive(Debug, Deserialize)]
pub struct BlacklistRequest {
    pub operator_id: UserId,
    pub reason: String,
}

/// Incoming payload for clearing a blacklist entry.
#[derive(Debug, Deserialize)]
pub struct ClearBlacklistRequest {
    pub operator_id: UserId,
}

/// API representation of a visitor.
#[derive(Debug, Serialize)]
pub struct VisitorResponse {
    pub id: VisitorId,
    pub email: String,
    pub full_name: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub blacklisted: bool,
    pub blacklist_reason: Option<String>,
    pub recurring: bool,
    pub retention_until: DateTime<Utc>,
}

impl From<Visitor> for VisitorResponse {
    fn from(visitor: Visitor) -> Self {
        Self {
            id: visitor.id(),
            email: visitor.email().as_str().to_owned(),
            full_name: visitor.full_name().to_string(),
            company: visitor.company().map(str::to_owned),
            phone: visitor.phone().map(|phone| phone.as_str().to_owned()),
            blacklisted: visitor.is_blacklisted(),
            blacklist_reason: visitor.blacklist_reason().map(str::to_owned),
            recurring: visitor.is_recurring(),
            retention_until: visitor.retention_until(),
        }
    }
}

/// Incoming payload for a consent grant.
#[derive(Debug, Deserialize)]
pub struct GrantConsentRequest {
    pub operator_id: UserId,
    pub consent_type: String,
    pub consent_text: String,
    pub method: String,
    pub legal_basis: String,
    pub processing_purpose: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Incoming payload for a consent withdrawal.
#[derive(Debug, Deserialize)]
pub struct WithdrawConsentRequest {
    pub operator_id: UserId,
    pub reason: String,
}

/// Incoming payload for a consent renewal.
#[derive(Debug, Deserialize)]
pub struct RenewConsentRequest {
    pub operator_id: UserId,
    pub consent_text: String,
    pub version: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// API representation of a consent record.
#[derive(Debug, Serialize)]
pub struct ConsentRecordResponse {
    pub id: ConsentRecordId,
    pub visitor_id: VisitorId,
    pub consent_type: &'static str,
    pub status: &'static str,
    pub version: i32,
    pub method: &'static str,
    pub legal_basis: String,
    pub processing_purpose: String,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub withdrawn_at: Option<DateTime<Utc>>,
    pub parent_consent_id: Option<ConsentRecordId>,
    pub active: bool,
}

impl From<ConsentRecord> for ConsentRecordResponse {
    fn from(record: ConsentRecord) -> Self {
        Self {
            id: record.id(),
            visitor_id: record.visitor_id(),
            consent_type: record.consent_type().as_str(),
            status: record.status().as_str(),
            version: record.version(),
            method: record.method().as_str(),
            legal_basis: record.legal_basis().to_owned(),
            processing_purpose: record.processing_purpose().to_owned(),
            granted_at: record.granted_at(),
            expires_at: record.expires_at(),
            withdrawn_at: record.withdrawn_at(),
            parent_consent_id: record.parent_consent_id(),
            active: record.is_active(),
        }
    }
}

/// API representation of an audit ledger entry.
#[derive(Debug, Serialize)]
pub struct AuditEntryResponse {
    pub id: gatehouse_core::AuditEntryId,
    pub occurred_at: DateTime<Utc>,
    pub action: &'static str,
    pub category: &'static str,
    pub severity: &'static str,
    pub outcome: &'static str,
    pub visitor_id: Option<VisitorId>,
    pub visit_id: Option<VisitId>,
    pub detail: Value,
    pub retention_until: DateTime<Utc>,
    pub anonymized: bool,
}

impl From<AuditLogEntry> for AuditEntryResponse {
    fn from(entry: AuditLogEntry) -> Self {
        let detail = serde_json::to_value(entry.detail()).unwrap_or(Value::Null);
        Self {
            id: entry.id(),
            occurred_at: entry.occurred_at(),
            action: entry.action().as_str(),
            category: entry.category().as_str(),
            severity: entry.severity().as_str(),
            outcome: entry.outcome().as_str(),
            visitor_id: entry.visitor_id(),
            visit_id: entry.visit_id(),
            detail,
            retention_until: entry.retention_until(),
            anonymized: entry.is_anonymized(),
        }
    }
}
