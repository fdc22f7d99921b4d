use std::str::FromStr;

use chrono::{DateTime, Utc};
use gatehouse_core::{AppError, AppResult, ConsentRecordId, VisitorId};
use serde::{Deserialize, Serialize};

/// Closed set of consent purposes a visitor can grant or deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentType {
    /// Processing of personal data for visit management. Gates
    /// pre-registration.
    DataProcessing,
    /// Photo capture for the visitor badge.
    Photo,
    /// Biometric capture (e.g. facial recognition at the gate).
    Biometric,
    /// Marketing communication.
    Marketing,
    /// Background screening before sensitive-area access.
    BackgroundCheck,
}

impl ConsentType {
    /// Returns the stable storage value for this type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataProcessing => "data_processing",
            Self::Photo => "photo",
            Self::Biometric => "biometric",
            Self::Marketing => "marketing",
            Self::BackgroundCheck => "background_check",
        }
    }

    /// Returns all known consent types.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[ConsentType] = &[
            ConsentType::DataProcessing,
            ConsentType::Photo,
            ConsentType::Biometric,
            ConsentType::Marketing,
            ConsentType::BackgroundCheck,
        ];

        ALL
    }
}

impl FromStr for ConsentType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "data_processing" => Ok(Self::DataProcessing),
            "photo" => Ok(Self::Photo),
            "biometric" => Ok(Self::Biometric),
            "marketing" => Ok(Self::Marketing),
            "background_check" => Ok(Self::BackgroundCheck),
            _ => Err(AppError::Validation(format!(
                "unknown consent type '{value}'"
            ))),
        }
    }
}

/// Grant state of a consent record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentStatus {
    /// The visitor granted the purpose.
    Granted,
    /// The visitor explicitly denied the purpose.
    Denied,
    /// A previously granted purpose was withdrawn.
    Withdrawn,
}

impl ConsentStatus {
    /// Returns the stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Withdrawn => "withdrawn",
        }
    }
}

/// How the consent was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentMethod {
    /// Captured on the self-service kiosk.
    Kiosk,
    /// Captured through the web portal.
    Web,
    /// Captured on paper and transcribed by staff.
    Paper,
    /// Recorded verbally by staff.
    Verbal,
}

impl ConsentMethod {
    /// Returns the stable storage value for this method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kiosk => "kiosk",
            Self::Web => "web",
            Self::Paper => "paper",
            Self::Verbal => "verbal",
        }
    }
}

impl FromStr for ConsentMethod {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "kiosk" => Ok(Self::Kiosk),
            "web" => Ok(Self::Web),
            "paper" => Ok(Self::Paper),
            "verbal" => Ok(Self::Verbal),
            _ => Err(AppError::Validation(format!(
                "unknown consent method '{value}'"
            ))),
        }
    }
}

/// A versioned, revocable grant-or-denial of one processing purpose.
///
/// Records are never deleted: withdrawal flips the status, renewal creates a
/// successor linked through `parent_consent_id` and deactivates the parent.
/// At most one record per (visitor, type) is active at an instant; the
/// consent ledger enforces that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    id: ConsentRecordId,
    visitor_id: VisitorId,
    consent_type: ConsentType,
    status: ConsentStatus,
    version: i32,
    consent_text: String,
    method: ConsentMethod,
    legal_basis: String,
    processing_purpose: String,
    granted_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    withdrawn_at: Option<DateTime<Utc>>,
    withdrawal_reason: Option<String>,
    parent_consent_id: Option<ConsentRecordId>,
    is_active: bool,
}

impl ConsentRecord {
    /// Creates an active granted record.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn grant(
        visitor_id: VisitorId,
        consent_type: ConsentType,
        version: i32,
        consent_text: impl Into<String>,
        method: ConsentMethod,
        legal_basis: impl Into<String>,
        processing_purpose: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ConsentRecordId::new(),
            visitor_id,
            consent_type,
            status: ConsentStatus::Granted,
            version,
            consent_text: consent_text.into(),
            method,
            legal_basis: legal_basis.into(),
            processing_purpose: processing_purpose.into(),
            granted_at: now,
            expires_at,
            withdrawn_at: None,
            withdrawal_reason: None,
            parent_consent_id: None,
            is_active: true,
        }
    }

    /// Creates the successor record of a renewal, linked to its parent.
    ///
    /// The caller deactivates the parent in the same unit of work.
    #[must_use]
    pub fn renewal(
        parent: &ConsentRecord,
        consent_text: impl Into<String>,
        version: i32,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ConsentRecordId::new(),
            visitor_id: parent.visitor_id,
            consent_type: parent.consent_type,
            status: ConsentStatus::Granted,
            version,
            consent_text: consent_text.into(),
            method: parent.method,
            legal_basis: parent.legal_basis.clone(),
            processing_purpose: parent.processing_purpose.clone(),
            granted_at: now,
            expires_at,
            withdrawn_at: None,
            withdrawal_reason: None,
            parent_consent_id: Some(parent.id),
            is_active: true,
        }
    }

    /// Withdraws an active grant. Never deletes; the record stays queryable
    /// history with `withdrawn` status.
    pub fn withdraw(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> AppResult<()> {
        if !self.is_active {
            return Err(AppError::Conflict(
                "consent record is no longer active".to_owned(),
            ));
        }

        self.status = ConsentStatus::Withdrawn;
        self.is_active = false;
        self.withdrawn_at = Some(now);
        self.withdrawal_reason = Some(reason.into());
        Ok(())
    }

    /// Deactivates the record without changing its status. Used when a newer
    /// grant or renewal supersedes it.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// The single validity predicate: active, granted and not past expiry.
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.status == ConsentStatus::Granted
            && self.expires_at.is_none_or(|expires_at| now < expires_at)
    }

    /// Returns the record identifier.
    #[must_use]
    pub fn id(&self) -> ConsentRecordId {
        self.id
    }

    /// Returns the visitor reference.
    #[must_use]
    pub fn visitor_id(&self) -> VisitorId {
        self.visitor_id
    }

    /// Returns the consent purpose.
    #[must_use]
    pub fn consent_type(&self) -> ConsentType {
        self.consent_type
    }

    /// Returns the grant state.
    #[must_use]
    pub fn status(&self) -> ConsentStatus {
        self.status
    }

    /// Returns the version number.
    #[must_use]
    pub fn version(&self) -> i32 {
        self.version
    }

    /// Returns the consent text shown to the visitor.
    #[must_use]
    pub fn consent_text(&self) -> &str {
        self.consent_text.as_str()
    }

    /// Returns the capture method.
    #[must_use]
    pub fn method(&self) -> ConsentMethod {
        self.method
    }

    /// Returns the legal basis.
    #[must_use]
    pub fn legal_basis(&self) -> &str {
        self.legal_basis.as_str()
    }

    /// Returns the processing purpose.
    #[must_use]
    pub fn processing_purpose(&self) -> &str {
        self.processing_purpose.as_str()
    }

    /// Returns the grant instant.
    #[must_use]
    pub fn granted_at(&self) -> DateTime<Utc> {
        self.granted_at
    }

    /// Returns the expiry instant, if bounded.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns the withdrawal instant, if withdrawn.
    #[must_use]
    pub fn withdrawn_at(&self) -> Option<DateTime<Utc>> {
        self.withdrawn_at
    }

    /// Returns the withdrawal reason, if withdrawn.
    #[must_use]
    pub fn withdrawal_reason(&self) -> Option<&str> {
        self.withdrawal_reason.as_deref()
    }

    /// Returns the parent record of a renewal chain, if any.
    #[must_use]
    pub fn parent_consent_id(&self) -> Option<ConsentRecordId> {
        self.parent_consent_id
    }

    /// Whether the record is the active one for its (visitor, type) pair.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use gatehouse_core::VisitorId;

    use super::{ConsentMethod, ConsentRecord, ConsentStatus, ConsentType};

    fn granted() -> ConsentRecord {
        ConsentRecord::grant(
            VisitorId::new(),
            ConsentType::DataProcessing,
            1,
            "I agree to visit data processing",
            ConsentMethod::Kiosk,
            "consent",
            "visitor management",
            None,
            Utc::now(),
        )
    }

    #[test]
    fn granted_record_is_valid() {
        let record = granted();
        assert!(record.is_valid(Utc::now()));
    }

    #[test]
    fn withdrawal_keeps_history_but_invalidates() {
        let mut record = granted();
        let now = Utc::now();

        assert!(record.withdraw("changed my mind", now).is_ok());
        assert_eq!(record.status(), ConsentStatus::Withdrawn);
        assert!(!record.is_active());
        assert!(!record.is_valid(now));
        assert_eq!(record.withdrawal_reason(), Some("changed my mind"));

        // A second withdraw is a conflict, not a silent no-op.
        assert!(record.withdraw("again", now).is_err());
    }

    #[test]
    fn expiry_invalidates_without_status_change() {
        let mut record = granted();
        record = ConsentRecord::renewal(&record, "renewed text", 2, Some(Utc::now() - Duration::days(1)), Utc::now());

        assert_eq!(record.status(), ConsentStatus::Granted);
        assert!(!record.is_valid(Utc::now()));
    }

    #[test]
    fn renewal_links_parent_and_bumps_version() {
        let parent = granted();
        let successor = ConsentRecord::renewal(&parent, "updated text", 2, None, Utc::now());

        assert_eq!(successor.parent_consent_id(), Some(parent.id()));
        assert_eq!(successor.version(), 2);
        assert_eq!(successor.consent_type(), parent.consent_type());
        assert!(successor.is_active());
    }
}
