//! Consent ledger: versioned grants, withdrawal and renewal.
//!
//! `is_valid` is the single consent predicate in the system; the visit
//! registry's pre-registration gate calls it and no component reimplements
//! validity logic. All mutations keep the visitor's denormalized consent
//! flag in step within the same unit of work, and every one writes a
//! privacy-category audit entry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gatehouse_core::{AppError, AppResult, ConsentRecordId, VisitorId};
use gatehouse_domain::{
    AuditAction, AuditActor, AuditCategory, AuditDetail, AuditOutcome, AuditSeverity,
    ConsentMethod, ConsentRecord, ConsentType, NewAuditEntry, RiskLevel,
};

use crate::audit_service::AuditService;
use crate::consent_ports::ConsentRepository;
use crate::visit_ports::VisitorRepository;

/// Input payload for a consent grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantConsentInput {
    /// Granting visitor.
    pub visitor_id: VisitorId,
    /// Purpose being granted.
    pub consent_type: ConsentType,
    /// Consent text shown to the visitor.
    pub consent_text: String,
    /// Capture method.
    pub method: ConsentMethod,
    /// Legal basis for processing.
    pub legal_basis: String,
    /// Processing purpose description.
    pub processing_purpose: String,
    /// Optional expiry instant.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Application service owning consent records.
#[derive(Clone)]
pub struct ConsentService {
    consents: Arc<dyn ConsentRepository>,
    visitors: Arc<dyn VisitorRepository>,
    audit: AuditService,
}

impl ConsentService {
    /// Creates the consent ledger.
    #[must_use]
    pub fn new(
        consents: Arc<dyn ConsentRepository>,
        visitors: Arc<dyn VisitorRepository>,
        audit: AuditService,
    ) -> Self {
        Self {
            consents,
            visitors,
            audit,
        }
    }

    /// Records a grant, deactivating (not deleting) any prior active record
    /// of the same type so at most one record per (visitor, type) is active.
    pub async fn grant(
        &self,
        actor: AuditActor,
        input: GrantConsentInput,
    ) -> AppResult<ConsentRecord> {
        let mut visitor = self
            .visitors
            .find(input.visitor_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("visitor '{}'", input.visitor_id)))?;

        let now = Utc::now();
        let prior = self
            .consents
            .find_active(input.visitor_id, input.consent_type)
            .await?;

        let version = prior
            .as_ref()
            .map_or(1, |record| record.version().saturating_add(1));

        if let Some(mut prior) = prior.clone() {
            prior.deactivate();
            self.consents.update(prior).await?;
        }

        let record = ConsentRecord::grant(
            input.visitor_id,
            input.consent_type,
            version,
            input.consent_text,
            input.method,
            input.legal_basis,
            input.processing_purpose,
            input.expires_at,
            now,
        );
        self.consents.insert(record.clone()).await?;

        visitor.set_consent(input.consent_type, true);
        self.visitors.update(visitor).await?;

        let audited = self
            .audit
            .record(consent_audit(
                actor,
                AuditAction::ConsentGranted,
                &record,
            ))
            .await;

        if let Err(error) = audited {
            self.rollback_grant(&record, prior, input.consent_type).await;
            return Err(error);
        }

        Ok(record)
    }

    /// Withdraws an active grant. The record stays queryable history; the
    /// visitor's denormalized flag is cleared in the same unit of work.
    pub async fn withdraw(
        &self,
        actor: AuditActor,
        record_id: ConsentRecordId,
        reason: impl Into<String>,
    ) -> AppResult<ConsentRecord> {
        let mut record = self
            .consents
            .find(record_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("consent record '{record_id}'")))?;
        let previous_record = record.clone();

        record.withdraw(reason, Utc::now())?;
        self.consents.update(record.clone()).await?;

        let previous_visitor = self.visitors.find(record.visitor_id()).await?;
        if let Some(mut visitor) = previous_visitor.clone() {
            visitor.set_consent(record.consent_type(), false);
            self.visitors.update(visitor).await?;
        }

        let audited = self
            .audit
            .record(consent_audit(
                actor,
                AuditAction::ConsentWithdrawn,
                &record,
            ))
            .await;

        if let Err(error) = audited {
            // The withdrawal must not survive without its ledger entry.
            let _ = self.consents.update(previous_record).await;
            if let Some(visitor) = previous_visitor {
                let _ = self.visitors.update(visitor).await;
            }
            return Err(error);
        }

        Ok(record)
    }

    /// Renews an active grant: creates a successor linked through
    /// `parent_consent_id` and deactivates the original.
    pub async fn renew(
        &self,
        actor: AuditActor,
        record_id: ConsentRecordId,
        new_text: impl Into<String>,
        new_version: Option<i32>,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<ConsentRecord> {
        let mut parent = self
            .consents
            .find(record_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("consent record '{record_id}'")))?;

        if !parent.is_active() {
            return Err(AppError::Conflict(
                "only the active consent record can be renewed".to_owned(),
            ));
        }

        let version = new_version.unwrap_or_else(|| parent.version().saturating_add(1));
        let successor = ConsentRecord::renewal(&parent, new_text, version, expires_at, Utc::now());
        let previous_parent = parent.clone();

        parent.deactivate();
        self.consents.update(parent).await?;
        self.consents.insert(successor.clone()).await?;

        let audited = self
            .audit
            .record(consent_audit(
                actor,
                AuditAction::ConsentRenewed,
                &successor,
            ))
            .await;

        if let Err(error) = audited {
            // Deactivate the unrecorded successor and reinstate the parent.
            let mut cancelled = successor;
            cancelled.deactivate();
            let _ = self.consents.update(cancelled).await;
            let _ = self.consents.update(previous_parent).await;
            return Err(error);
        }

        Ok(successor)
    }

    /// The single validity predicate: does the visitor hold a currently
    /// valid consent of this type?
    pub async fn is_valid(
        &self,
        visitor_id: VisitorId,
        consent_type: ConsentType,
    ) -> AppResult<bool> {
        let record = self.consents.find_active(visitor_id, consent_type).await?;
        Ok(record.is_some_and(|record| record.is_valid(Utc::now())))
    }

    /// Lists the full consent history for a visitor, newest first.
    pub async fn history(&self, visitor_id: VisitorId) -> AppResult<Vec<ConsentRecord>> {
        self.consents.list_for_visitor(visitor_id).await
    }

    // Best-effort undo when the ledger write fails after the grant was
    // stored. The grant must not survive without its audit entry.
    async fn rollback_grant(
        &self,
        record: &ConsentRecord,
        prior: Option<ConsentRecord>,
        consent_type: ConsentType,
    ) {
        let mut cancelled = record.clone();
        cancelled.deactivate();
        let _ = self.consents.update(cancelled).await;

        let restore_flag = if let Some(prior) = prior {
            let still_valid = prior.is_valid(Utc::now());
            let _ = self.consents.update(prior).await;
            still_valid
        } else {
            false
        };

        if let Ok(Some(mut visitor)) = self.visitors.find(record.visitor_id()).await {
            visitor.set_consent(consent_type, restore_flag);
            let _ = self.visitors.update(visitor).await;
        }
    }
}

fn consent_audit(actor: AuditActor, action: AuditAction, record: &ConsentRecord) -> NewAuditEntry {
    NewAuditEntry {
        actor,
        visitor_id: Some(record.visitor_id()),
        visit_id: None,
        action,
        category: AuditCategory::Privacy,
        severity: AuditSeverity::Info,
        outcome: AuditOutcome::Success,
        risk_level: RiskLevel::Medium,
        detail: AuditDetail::ConsentChange {
            record_id: record.id(),
            consent_type: record.consent_type(),
            status: record.status(),
            version: record.version(),
        },
        before: None,
        after: None,
    }
}

#[cfg(test)]
mod tests;
