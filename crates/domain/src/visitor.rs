use chrono::{DateTime, Utc};
use gatehouse_core::{AppResult, EmailAddress, NonEmptyString, PhoneNumber, VisitorId};
use serde::{Deserialize, Serialize};

use crate::consent::ConsentType;

/// Denormalized per-type consent booleans, kept in sync by the consent
/// ledger. The ledger's records are the source of truth; this summary only
/// exists for cheap reads on the visitor profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentSummary {
    /// Active data-processing consent.
    pub data_processing: bool,
    /// Active photo consent.
    pub photo: bool,
    /// Active biometric consent.
    pub biometric: bool,
    /// Active marketing consent.
    pub marketing: bool,
    /// Active background-check consent.
    pub background_check: bool,
}

impl ConsentSummary {
    /// Returns the flag for one consent type.
    #[must_use]
    pub fn has(&self, consent_type: ConsentType) -> bool {
        match consent_type {
            ConsentType::DataProcessing => self.data_processing,
            ConsentType::Photo => self.photo,
            ConsentType::Biometric => self.biometric,
            ConsentType::Marketing => self.marketing,
            ConsentType::BackgroundCheck => self.background_check,
        }
    }

    /// Sets the flag for one consent type.
    pub fn set(&mut self, consent_type: ConsentType, active: bool) {
        match consent_type {
            ConsentType::DataProcessing => self.data_processing = active,
            ConsentType::Photo => self.photo = active,
            ConsentType::Biometric => self.biometric = active,
            ConsentType::Marketing => self.marketing = active,
            ConsentType::BackgroundCheck => self.background_check = active,
        }
    }
}

/// A registered third-party visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visitor {
    id: VisitorId,
    email: EmailAddress,
    full_name: NonEmptyString,
    company: Option<String>,
    phone: Option<PhoneNumber>,
    blacklisted: bool,
    blacklist_reason: Option<String>,
    recurring: bool,
    consent_summary: ConsentSummary,
    retention_until: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl Visitor {
    /// Registers a visitor with validated contact fields.
    pub fn register(
        email: impl Into<String>,
        full_name: impl Into<String>,
        company: Option<String>,
        phone: Option<String>,
        retention_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            id: VisitorId::new(),
            email: EmailAddress::new(email)?,
            full_name: NonEmptyString::new(full_name)?,
            company,
            phone: phone.map(PhoneNumber::new).transpose()?,
            blacklisted: false,
            blacklist_reason: None,
            recurring: false,
            consent_summary: ConsentSummary::default(),
            retention_until,
            created_at: now,
        })
    }

    /// Places the visitor on the blacklist.
    pub fn blacklist(&mut self, reason: impl Into<String>) {
        self.blacklisted = true;
        self.blacklist_reason = Some(reason.into());
    }

    /// Removes the visitor from the blacklist.
    pub fn clear_blacklist(&mut self) {
        self.blacklisted = false;
        self.blacklist_reason = None;
    }

    /// Marks the visitor as recurring.
    pub fn mark_recurring(&mut self) {
        self.recurring = true;
    }

    /// Updates the denormalized consent flag for one type.
    pub fn set_consent(&mut self, consent_type: ConsentType, active: bool) {
        self.consent_summary.set(consent_type, active);
    }

    /// Whether the retention date has passed.
    #[must_use]
    pub fn is_past_retention(&self, now: DateTime<Utc>) -> bool {
        now >= self.retention_until
    }

    /// Returns a copy with direct identifiers redacted.
    ///
    /// Used when serving a profile past its retention date: the record is
    /// never hard-deleted before expiry, but sensitive fields are nulled on
    /// read.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut redacted = self.clone();
        redacted.email = EmailAddress::new("redacted@anonymized.invalid")
            .unwrap_or_else(|_| unreachable!());
        redacted.full_name =
            NonEmptyString::new("Anonymized Visitor").unwrap_or_else(|_| unreachable!());
        redacted.company = None;
        redacted.phone = None;
        redacted.blacklist_reason = None;
        redacted
    }

    /// Returns the visitor identifier.
    #[must_use]
    pub fn id(&self) -> VisitorId {
        self.id
    }

    /// Returns the contact email.
    #[must_use]
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Returns the full name.
    #[must_use]
    pub fn full_name(&self) -> &NonEmptyString {
        &self.full_name
    }

    /// Returns the company, if stated.
    #[must_use]
    pub fn company(&self) -> Option<&str> {
        self.company.as_deref()
    }

    /// Returns the phone number, if stated.
    #[must_use]
    pub fn phone(&self) -> Option<&PhoneNumber> {
        self.phone.as_ref()
    }

    /// Whether the visitor is blacklisted.
    #[must_use]
    pub fn is_blacklisted(&self) -> bool {
        self.blacklisted
    }

    /// Returns the blacklist reason, if blacklisted.
    #[must_use]
    pub fn blacklist_reason(&self) -> Option<&str> {
        self.blacklist_reason.as_deref()
    }

    /// Whether the visitor is marked recurring.
    #[must_use]
    pub fn is_recurring(&self) -> bool {
        self.recurring
    }

    /// Returns the denormalized consent summary.
    #[must_use]
    pub fn consent_summary(&self) -> ConsentSummary {
        self.consent_summary
    }

    /// Returns the retention date.
    #[must_use]
    pub fn retention_until(&self) -> DateTime<Utc> {
        self.retention_until
    }

    /// Returns the registration instant.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{ConsentType, Visitor};

    fn visitor() -> Visitor {
        Visitor::register(
            "ada@example.com",
            "Ada Lovelace",
            Some("Analytical Engines Ltd".to_owned()),
            Some("+44 20 1234 5678".to_owned()),
            Utc::now() + Duration::days(365),
            Utc::now(),
        )
        .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn blacklist_round_trip() {
        let mut visitor = visitor();
        assert!(!visitor.is_blacklisted());

        visitor.blacklist("prior incident");
        assert!(visitor.is_blacklisted());
        assert_eq!(visitor.blacklist_reason(), Some("prior incident"));

        visitor.clear_blacklist();
        assert!(!visitor.is_blacklisted());
        assert!(visitor.blacklist_reason().is_none());
    }

    #[test]
    fn consent_summary_tracks_per_type_flags() {
        let mut visitor = visitor();
        visitor.set_consent(ConsentType::DataProcessing, true);

        assert!(visitor.consent_summary().has(ConsentType::DataProcessing));
        assert!(!visitor.consent_summary().has(ConsentType::Photo));
    }

    #[test]
    fn redaction_nulls_sensitive_fields_and_keeps_id() {
        let mut visitor = visitor();
        visitor.blacklist("prior incident");
        let redacted = visitor.redacted();

        assert_eq!(redacted.id(), visitor.id());
        assert_eq!(redacted.email().as_str(), "redacted@anonymized.invalid");
        assert!(redacted.company().is_none());
        assert!(redacted.phone().is_none());
        assert!(redacted.blacklist_reason().is_none());
        assert!(redacted.is_blacklisted());
    }

    #[test]
    fn past_retention_is_inclusive_of_the_instant() {
        let visitor = visitor();
        assert!(!visitor.is_past_retention(Utc::now()));
        assert!(visitor.is_past_retention(visitor.retention_until()));
    }
}
