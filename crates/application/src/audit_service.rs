//! Append-only audit trail with retention-driven anonymization.
//!
//! `record` is the one write path every other service calls; its failure is
//! fatal to the causing operation rather than silently dropped. The retention
//! sweep anonymizes by default and hard-deletes only when auto-purge is
//! explicitly enabled.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use gatehouse_core::{AppError, AppResult, AuditEntryId, VisitorId};
use gatehouse_domain::{AuditCategory, AuditLogEntry, NewAuditEntry};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::audit_ports::AuditLogRepository;

/// Default retention period: 2555 days, roughly seven years.
pub const DEFAULT_RETENTION_DAYS: i64 = 2555;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Per-category retention policy, read once at startup.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    default_days: i64,
    overrides: HashMap<AuditCategory, i64>,
    auto_purge: bool,
}

impl RetentionPolicy {
    /// Creates a policy with a default period and per-category overrides.
    #[must_use]
    pub fn new(default_days: i64, overrides: HashMap<AuditCategory, i64>, auto_purge: bool) -> Self {
        Self {
            default_days,
            overrides,
            auto_purge,
        }
    }

    /// Returns the retention period for a category, in days.
    #[must_use]
    pub fn days_for(&self, category: AuditCategory) -> i64 {
        self.overrides
            .get(&category)
            .copied()
            .unwrap_or(self.default_days)
    }

    /// Whether eligible entries are hard-deleted instead of anonymized.
    #[must_use]
    pub fn auto_purge(&self) -> bool {
        self.auto_purge
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            default_days: DEFAULT_RETENTION_DAYS,
            overrides: HashMap::new(),
            auto_purge: false,
        }
    }
}

/// Outcome of one retention sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionSweepReport {
    /// Entries anonymized this pass.
    pub anonymized: usize,
    /// Entries deleted this pass (auto-purge mode only).
    pub deleted: usize,
    /// Whether the pass was skipped because another was in flight.
    pub skipped: bool,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Application service owning the compliance ledger.
#[derive(Clone)]
pub struct AuditService {
    repository: Arc<dyn AuditLogRepository>,
    policy: RetentionPolicy,
    retention_sweep: Arc<Mutex<()>>,
}

impl AuditService {
    /// Creates the audit trail over a ledger repository.
    #[must_use]
    pub fn new(repository: Arc<dyn AuditLogRepository>, policy: RetentionPolicy) -> Self {
        Self {
            repository,
            policy,
            retention_sweep: Arc::new(Mutex::new(())),
        }
    }

    /// Appends one entry, computing its retention date from the category
    /// policy.
    ///
    /// Callers must propagate a failure here: the triggering operation is
    /// rolled back, correctness of the compliance record outranks feature
    /// availability.
    pub async fn record(&self, input: NewAuditEntry) -> AppResult<AuditLogEntry> {
        let now = Utc::now();
        let retention_until = now + Duration::days(self.policy.days_for(input.category));
        let entry = AuditLogEntry::from_input(input, retention_until, now);

        self.repository.append(entry.clone()).await?;
        Ok(entry)
    }

    /// Irreversibly anonymizes one entry.
    ///
    /// Produces no further ledger entry (that would regress forever); the
    /// redaction is logged operationally instead. Returns `false` when the
    /// entry was already anonymized.
    pub async fn anonymize(&self, entry_id: AuditEntryId) -> AppResult<bool> {
        let mut entry = self
            .repository
            .find(entry_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("audit entry '{entry_id}'")))?;

        if !entry.anonymize() {
            return Ok(false);
        }

        self.repository.update(entry).await?;
        info!(entry_id = %entry_id, "anonymized audit entry");
        Ok(true)
    }

    /// Anonymizes (or, in auto-purge mode, deletes) every entry past its
    /// retention date.
    ///
    /// Idempotent: anonymized entries no longer match the eligibility query,
    /// so a second pass over the same data is a no-op. Single-flight: an
    /// overlapping invocation returns a skipped report immediately.
    pub async fn sweep_retention(&self, now: DateTime<Utc>) -> AppResult<RetentionSweepReport> {
        let Ok(_guard) = self.retention_sweep.try_lock() else {
            return Ok(RetentionSweepReport {
                skipped: true,
                ..RetentionSweepReport::default()
            });
        };

        let mut report = RetentionSweepReport::default();

        for mut entry in self.repository.list_expired(now).await? {
            let entry_id = entry.id();

            if self.policy.auto_purge() {
                self.repository.delete(entry_id).await?;
                report.deleted += 1;
                continue;
            }

            if entry.anonymize() {
                self.repository.update(entry).await?;
                report.anonymized += 1;
            }
        }

        if report.anonymized > 0 || report.deleted > 0 {
            warn!(
                anonymized = report.anonymized,
                deleted = report.deleted,
                "retention sweep redacted expired audit entries"
            );
        }

        Ok(report)
    }

    /// Lists the newest entries, up to `limit`.
    pub async fn list_recent(&self, limit: usize) -> AppResult<Vec<AuditLogEntry>> {
        self.repository.list_recent(limit).await
    }

    /// Lists entries referencing a visitor, newest first.
    pub async fn entries_for_visitor(
        &self,
        visitor_id: VisitorId,
    ) -> AppResult<Vec<AuditLogEntry>> {
        self.repository.list_for_visitor(visitor_id).await
    }
}
