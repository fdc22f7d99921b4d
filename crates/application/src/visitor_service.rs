//! Visitor profiles: registration, blacklist management, and
//! retention-aware reads.

use std::sync::Arc;

use chrono::{Duration, Utc};
use gatehouse_core::{AppError, AppResult, UserId, VisitorId};
use gatehouse_domain::{
    AuditAction, AuditActor, AuditCategory, AuditDetail, AuditOutcome, AuditSeverity,
    NewAuditEntry, RiskLevel, Visitor,
};

use crate::audit_service::AuditService;
use crate::visit_ports::VisitorRepository;

/// Input payload for visitor registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterVisitorInput {
    /// Contact email, unique per visitor.
    pub email: String,
    /// Full name.
    pub full_name: String,
    /// Optional company.
    pub company: Option<String>,
    /// Optional phone number.
    pub phone: Option<String>,
}

/// Application service owning visitor profiles.
#[derive(Clone)]
pub struct VisitorService {
    visitors: Arc<dyn VisitorRepository>,
    audit: AuditService,
    retention_days: i64,
}

impl VisitorService {
    /// Creates the visitor service. `retention_days` sets how long personal
    /// data stays readable before reads return the redacted form.
    #[must_use]
    pub fn new(visitors: Arc<dyn VisitorRepository>, audit: AuditService, retention_days: i64) -> Self {
        Self {
            visitors,
            audit,
            retention_days,
        }
    }

    /// Registers a visitor, or returns the existing profile for a known
    /// email. Re-registration of a returning visitor marks them recurring.
    pub async fn register(
        &self,
        operator: UserId,
        input: RegisterVisitorInput,
    ) -> AppResult<Visitor> {
        if let Some(mut existing) = self.visitors.find_by_email(&input.email).await? {
            if !existing.is_recurring() {
                existing.mark_recurring();
                self.visitors.update(existing.clone()).await?;
            }
            return Ok(existing);
        }

        let now = Utc::now();
        let visitor = Visitor::register(
            input.email,
            input.full_name,
            input.company,
            input.phone,
            now + Duration::days(self.retention_days),
            now,
        )?;

        self.visitors.insert(visitor.clone()).await?;

        let audited = self
            .audit
            .record(NewAuditEntry {
                actor: AuditActor::operator(operator),
                visitor_id: Some(visitor.id()),
                visit_id: None,
                action: AuditAction::VisitorRegistered,
                category: AuditCategory::DataModification,
                severity: AuditSeverity::Info,
                outcome: AuditOutcome::Success,
                risk_level: RiskLevel::Low,
                detail: AuditDetail::VisitorChange {
                    field: "profile".to_owned(),
                },
                before: None,
                after: None,
            })
            .await;

        if let Err(error) = audited {
            // No standalone remove on the port; overwrite with the redacted
            // form so the unrecorded profile holds no personal data.
            let _ = self.visitors.update(visitor.redacted()).await;
            return Err(error);
        }

        Ok(visitor)
    }

    /// Blacklists a visitor. Security-relevant and always audited.
    pub async fn blacklist(
        &self,
        operator: UserId,
        visitor_id: VisitorId,
        reason: impl Into<String>,
    ) -> AppResult<Visitor> {
        let mut visitor = self.find_visitor(visitor_id).await?;
        let previous = visitor.clone();

        visitor.blacklist(reason);
        self.commit_flag_change(
            &previous,
            &visitor,
            operator,
            AuditAction::VisitorBlacklisted,
            RiskLevel::High,
        )
        .await?;

        Ok(visitor)
    }

    /// Removes a visitor from the blacklist.
    pub async fn clear_blacklist(
        &self,
        operator: UserId,
        visitor_id: VisitorId,
    ) -> AppResult<Visitor> {
        let mut visitor = self.find_visitor(visitor_id).await?;
        let previous = visitor.clone();

        visitor.clear_blacklist();
        self.commit_flag_change(
            &previous,
            &visitor,
            operator,
            AuditAction::VisitorUnblacklisted,
            RiskLevel::Medium,
        )
        .await?;

        Ok(visitor)
    }

    /// Returns a visitor profile, redacted once the retention window has
    /// passed. The stored record is untouched; redaction applies on read.
    pub async fn get(&self, visitor_id: VisitorId) -> AppResult<Visitor> {
        let visitor = self.find_visitor(visitor_id).await?;
        if visitor.is_past_retention(Utc::now()) {
            return Ok(visitor.redacted());
        }
        Ok(visitor)
    }

    /// Lists all visitors, applying retention redaction per profile.
    pub async fn list(&self) -> AppResult<Vec<Visitor>> {
        let now = Utc::now();
        let visitors = self.visitors.list().await?;
        Ok(visitors
            .into_iter()
            .map(|visitor| {
                if visitor.is_past_retention(now) {
                    visitor.redacted()
                } else {
                    visitor
                }
            })
            .collect())
    }

    async fn find_visitor(&self, visitor_id: VisitorId) -> AppResult<Visitor> {
        self.visitors
            .find(visitor_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("visitor '{visitor_id}'")))
    }

    async fn commit_flag_change(
        &self,
        previous: &Visitor,
        updated: &Visitor,
        operator: UserId,
        action: AuditAction,
        risk_level: RiskLevel,
    ) -> AppResult<()> {
        self.visitors.update(updated.clone()).await?;

        let audited = self
            .audit
            .record(NewAuditEntry {
                actor: AuditActor::operator(operator),
                visitor_id: Some(updated.id()),
                visit_id: None,
                action,
                category: AuditCategory::Security,
                severity: AuditSeverity::Warning,
                outcome: AuditOutcome::Success,
                risk_level,
                detail: AuditDetail::VisitorChange {
                    field: "blacklist".to_owned(),
                },
                before: None,
                after: None,
            })
            .await;

        if let Err(error) = audited {
            let _ = self.visitors.update(previous.clone()).await;
            return Err(error);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
