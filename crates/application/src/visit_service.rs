//! Visit registry: the lifecycle state machine and its orchestration.
//!
//! The registry is the sole writer of visit state. Transitions are
//! serialized per visit through keyed locks (check-in additionally per
//! visitor), gate on blacklist and consent
//! policy, commit exactly one audit entry per accepted transition (rolling
//! the transition back when the ledger write fails), update the occupancy
//! projection synchronously, and hand notification fan-out to the router
//! without blocking on delivery.

mod locks;
mod token;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use gatehouse_core::{AppError, AppResult, UserId, VisitId, VisitorId};
use gatehouse_domain::{
    AuditAction, AuditActor, AuditCategory, AuditDetail, AuditOutcome, AuditSeverity,
    ConsentType, NewAuditEntry, NotificationEvent, NotificationKind, NotificationPriority,
    NotificationTarget, QrToken, RiskLevel, Visit, VisitStatus, Visitor, FRONT_DESK_ROOM,
};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::warn;

use crate::audit_service::AuditService;
use crate::consent_service::ConsentService;
use crate::notification_router::NotificationRouter;
use crate::occupancy::OccupancyTracker;
use crate::visit_ports::{VisitRepository, VisitorRepository};
use locks::KeyedLocks;

// ---------------------------------------------------------------------------
// Configuration and inputs
// ---------------------------------------------------------------------------

/// Registry tuning, read once at startup.
#[derive(Debug, Clone)]
pub struct VisitConfig {
    /// QR token time-to-live, in hours.
    pub qr_ttl_hours: i64,
    /// Grace past the scheduled start before a pre-registration becomes a
    /// no-show, in minutes.
    pub no_show_grace_minutes: i64,
}

impl Default for VisitConfig {
    fn default() -> Self {
        Self {
            qr_ttl_hours: 24,
            no_show_grace_minutes: 120,
        }
    }
}

/// Input payload for pre-registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreRegisterInput {
    /// Expected visitor.
    pub visitor_id: VisitorId,
    /// Hosting staff member.
    pub host_id: UserId,
    /// Stated purpose of the visit.
    pub purpose: String,
    /// Scheduled arrival instant.
    pub scheduled_start: DateTime<Utc>,
    /// Expected duration in minutes, if known.
    pub expected_duration_minutes: Option<i64>,
}

/// A freshly pre-registered visit and the raw QR token to hand out.
///
/// The raw token exists only in this response; the registry stores its hash.
#[derive(Debug, Clone)]
pub struct PreRegisteredVisit {
    /// The created visit.
    pub visit: Visit,
    /// The raw QR token for the visitor's pass.
    pub qr_token: String,
}

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Visits affected this pass.
    pub affected: usize,
    /// Whether the pass was skipped because another was in flight.
    pub skipped: bool,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Application service owning the visit state machine.
#[derive(Clone)]
pub struct VisitService {
    visits: Arc<dyn VisitRepository>,
    visitors: Arc<dyn VisitorRepository>,
    consent: ConsentService,
    audit: AuditService,
    occupancy: Arc<OccupancyTracker>,
    router: NotificationRouter,
    config: VisitConfig,
    locks: Arc<KeyedLocks<VisitId>>,
    visitor_locks: Arc<KeyedLocks<VisitorId>>,
    overdue_sweep: Arc<Mutex<()>>,
    expiry_sweep: Arc<Mutex<()>>,
    no_show_sweep: Arc<Mutex<()>>,
}

impl VisitService {
    /// Creates the visit registry over its collaborators.
    #[must_use]
    pub fn new(
        visits: Arc<dyn VisitRepository>,
        visitors: Arc<dyn VisitorRepository>,
        consent: ConsentService,
        audit: AuditService,
        occupancy: Arc<OccupancyTracker>,
        router: NotificationRouter,
        config: VisitConfig,
    ) -> Self {
        Self {
            visits,
            visitors,
            consent,
            audit,
            occupancy,
            router,
            config,
            locks: Arc::new(KeyedLocks::default()),
            visitor_locks: Arc::new(KeyedLocks::default()),
            overdue_sweep: Arc::new(Mutex::new(())),
            expiry_sweep: Arc::new(Mutex::new(())),
            no_show_sweep: Arc::new(Mutex::new(())),
        }
    }

    /// Pre-registers a visit after the blacklist and consent gates pass,
    /// allocating a QR token with the configured TTL.
    pub async fn pre_register(
        &self,
        operator: UserId,
        input: PreRegisterInput,
    ) -> AppResult<PreRegisteredVisit> {
        let visitor = self
            .visitors
            .find(input.visitor_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("visitor '{}'", input.visitor_id)))?;

        if visitor.is_blacklisted() {
            self.record_policy_rejection(
                operator,
                &visitor,
                None,
                "blacklist",
                AuditCategory::Security,
            )
            .await?;
            return Err(AppError::VisitorBlacklisted(
                visitor.blacklist_reason().map(str::to_owned),
            ));
        }

        if !self
            .consent
            .is_valid(input.visitor_id, ConsentType::DataProcessing)
            .await?
        {
            self.record_policy_rejection(
                operator,
                &visitor,
                None,
                "consent",
                AuditCategory::Privacy,
            )
            .await?;
            return Err(AppError::ConsentMissing(
                ConsentType::DataProcessing.as_str().to_owned(),
            ));
        }

        let now = Utc::now();
        let (raw_token, token_hash) = token::generate_token()?;
        let qr_token = QrToken::new(token_hash, now + Duration::hours(self.config.qr_ttl_hours));

        let visit = Visit::pre_register(
            input.visitor_id,
            input.host_id,
            input.purpose,
            input.scheduled_start,
            input.expected_duration_minutes,
            qr_token,
            now,
        )?;

        self.visits.insert(visit.clone()).await?;

        let audited = self
            .audit
            .record(transition_entry(
                AuditActor::operator(operator),
                &visit,
                None,
                AuditAction::VisitPreRegistered,
            ))
            .await;

        if let Err(error) = audited {
            // The ledger could not record the creation; undo it.
            let _ = self.visits.remove(visit.id()).await;
            return Err(error);
        }

        Ok(PreRegisteredVisit {
            visit,
            qr_token: raw_token,
        })
    }

    /// Checks a visit in.
    ///
    /// Re-checks the blacklist at the gate (status can change after
    /// pre-registration), rejects an elapsed QR token, enforces the
    /// one-active-visit-per-visitor invariant, then commits, bumps
    /// occupancy, and fans out `visitor_arrived`.
    pub async fn check_in(&self, visit_id: VisitId, operator: UserId) -> AppResult<Visit> {
        let lock = self.locks.for_key(visit_id);
        let _guard = lock.lock().await;

        let mut visit = self.find_visit(visit_id).await?;
        let previous = visit.clone();

        let visitor = self
            .visitors
            .find(visit.visitor_id())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("visitor '{}'", visit.visitor_id())))?;

        if visitor.is_blacklisted() {
            self.record_policy_rejection(
                operator,
                &visitor,
                Some(visit_id),
                "blacklist",
                AuditCategory::Security,
            )
            .await?;
            return Err(AppError::VisitorBlacklisted(
                visitor.blacklist_reason().map(str::to_owned),
            ));
        }

        // Concurrent check-ins of different visits for the same visitor
        // serialize here, so the active-visit lookup and the commit sit
        // inside one critical section.
        let visitor_id = visit.visitor_id();
        let visitor_lock = self.visitor_locks.for_key(visitor_id);
        let _visitor_guard = visitor_lock.lock().await;

        if let Some(active) = self.visits.find_active_for_visitor(visitor_id).await?
            && active.id() != visit_id
        {
            return Err(AppError::Conflict(format!(
                "visitor '{visitor_id}' already has an active visit"
            )));
        }

        let now = Utc::now();
        if let Err(error) = visit.check_in(operator, now) {
            if matches!(error, AppError::TokenExpired) {
                self.record_policy_rejection(
                    operator,
                    &visitor,
                    Some(visit_id),
                    "token_expiry",
                    AuditCategory::Security,
                )
                .await?;
            }
            return Err(error);
        }

        self.commit_update(&previous, &visit, AuditActor::operator(operator), AuditAction::VisitCheckedIn)
            .await?;

        drop(_visitor_guard);
        drop(visitor_lock);
        self.visitor_locks.release(visitor_id);

        if let Some(alert) = self.occupancy.on_checked_in() {
            self.spawn_dispatch(alert);
        }
        self.spawn_dispatch(self.occupancy.changed_event());
        self.spawn_visit_dispatch(visit_id, arrival_event(&visit, &visitor));

        Ok(visit)
    }

    /// Checks a visit out, computing its actual duration, then decrements
    /// occupancy and fans out `visitor_departed`.
    pub async fn check_out(
        &self,
        visit_id: VisitId,
        operator: UserId,
        rating: Option<u8>,
        feedback: Option<String>,
    ) -> AppResult<Visit> {
        let lock = self.locks.for_key(visit_id);
        let _guard = lock.lock().await;

        let mut visit = self.find_visit(visit_id).await?;
        let previous = visit.clone();

        let now = Utc::now();
        visit.check_out(operator, now)?;
        if let Some(rating) = rating {
            visit.annotate(rating, feedback)?;
        }

        self.commit_update(&previous, &visit, AuditActor::operator(operator), AuditAction::VisitCheckedOut)
            .await?;

        self.occupancy.on_checked_out();
        self.spawn_dispatch(self.occupancy.changed_event());
        self.spawn_visit_dispatch(visit_id, departure_event(&visit));

        drop(_guard);
        drop(lock);
        self.locks.release(visit_id);
        Ok(visit)
    }

    /// Cancels a pre-registered visit.
    pub async fn cancel(
        &self,
        visit_id: VisitId,
        operator: UserId,
        reason: impl Into<String>,
    ) -> AppResult<Visit> {
        let lock = self.locks.for_key(visit_id);
        let _guard = lock.lock().await;

        let mut visit = self.find_visit(visit_id).await?;
        let previous = visit.clone();

        visit.cancel(reason)?;
        self.commit_update(&previous, &visit, AuditActor::operator(operator), AuditAction::VisitCancelled)
            .await?;

        drop(_guard);
        drop(lock);
        self.locks.release(visit_id);
        Ok(visit)
    }

    /// Marks a checked-in visit evacuated. The status does not change.
    pub async fn mark_evacuated(
        &self,
        visit_id: VisitId,
        operator: UserId,
        details: impl Into<String>,
    ) -> AppResult<Visit> {
        let lock = self.locks.for_key(visit_id);
        let _guard = lock.lock().await;

        let mut visit = self.find_visit(visit_id).await?;
        let previous = visit.clone();

        visit.mark_evacuated(details, Utc::now())?;
        self.commit_with(
            &previous,
            &visit,
            NewAuditEntry {
                actor: AuditActor::operator(operator),
                visitor_id: Some(visit.visitor_id()),
                visit_id: Some(visit.id()),
                action: AuditAction::VisitEvacuated,
                category: AuditCategory::Security,
                severity: AuditSeverity::Warning,
                outcome: AuditOutcome::Success,
                risk_level: RiskLevel::High,
                detail: AuditDetail::VisitTransition {
                    visit_id: visit.id(),
                    from: Some(previous.status()),
                    to: visit.status(),
                },
                before: None,
                after: None,
            },
        )
        .await?;

        Ok(visit)
    }

    /// Attaches post-hoc rating and feedback to a completed visit.
    pub async fn annotate(
        &self,
        visit_id: VisitId,
        operator: UserId,
        rating: u8,
        feedback: Option<String>,
    ) -> AppResult<Visit> {
        let lock = self.locks.for_key(visit_id);
        let _guard = lock.lock().await;

        let mut visit = self.find_visit(visit_id).await?;
        let previous = visit.clone();

        visit.annotate(rating, feedback)?;
        self.commit_with(
            &previous,
            &visit,
            NewAuditEntry {
                actor: AuditActor::operator(operator),
                visitor_id: Some(visit.visitor_id()),
                visit_id: Some(visit.id()),
                action: AuditAction::VisitAnnotated,
                category: AuditCategory::DataModification,
                severity: AuditSeverity::Info,
                outcome: AuditOutcome::Success,
                risk_level: RiskLevel::Low,
                detail: AuditDetail::VisitTransition {
                    visit_id: visit.id(),
                    from: Some(previous.status()),
                    to: visit.status(),
                },
                before: None,
                after: None,
            },
        )
        .await?;

        Ok(visit)
    }

    /// Declares an emergency: marks every checked-in visit evacuated and
    /// broadcasts a critical alert. `DeliveryExhausted` propagates so the
    /// caller can escalate out-of-band.
    pub async fn declare_emergency(
        &self,
        operator: UserId,
        message: impl Into<String>,
    ) -> AppResult<usize> {
        let message = message.into();
        let now = Utc::now();
        let mut evacuated = 0_usize;

        for candidate in self.visits.list_by_status(VisitStatus::CheckedIn).await? {
            let visit_id = candidate.id();
            let lock = self.locks.for_key(visit_id);
            let _visit_guard = lock.lock().await;

            // The listing is a snapshot; re-read under the lock so a
            // concurrently committed transition is never overwritten.
            let Some(mut visit) = self.visits.find(visit_id).await? else {
                continue;
            };
            if visit.status() != VisitStatus::CheckedIn || visit.evacuation().is_some() {
                continue;
            }

            let previous = visit.clone();
            if visit.mark_evacuated(message.clone(), now).is_ok() {
                self.commit_with(
                    &previous,
                    &visit,
                    NewAuditEntry {
                        actor: AuditActor::operator(operator),
                        visitor_id: Some(visit.visitor_id()),
                        visit_id: Some(visit.id()),
                        action: AuditAction::VisitEvacuated,
                        category: AuditCategory::Security,
                        severity: AuditSeverity::Critical,
                        outcome: AuditOutcome::Success,
                        risk_level: RiskLevel::Critical,
                        detail: AuditDetail::VisitTransition {
                            visit_id: visit.id(),
                            from: Some(previous.status()),
                            to: visit.status(),
                        },
                        before: None,
                        after: None,
                    },
                )
                .await?;
                evacuated += 1;
            }
        }

        self.audit
            .record(NewAuditEntry {
                actor: AuditActor::operator(operator),
                visitor_id: None,
                visit_id: None,
                action: AuditAction::EmergencyBroadcast,
                category: AuditCategory::Security,
                severity: AuditSeverity::Critical,
                outcome: AuditOutcome::Success,
                risk_level: RiskLevel::Critical,
                detail: AuditDetail::Emergency {
                    message: message.clone(),
                    evacuated_visits: evacuated,
                },
                before: None,
                after: None,
            })
            .await?;

        self.router
            .broadcast_emergency(
                "Emergency",
                message,
                json!({"evacuated_visits": evacuated}),
            )
            .await?;

        Ok(evacuated)
    }

    /// Flags checked-in visits past their expected checkout and notifies
    /// the host and the front desk, once per visit. Overdue is advisory;
    /// the status does not change.
    pub async fn sweep_overdue(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let Ok(_guard) = self.overdue_sweep.try_lock() else {
            return Ok(SweepReport {
                skipped: true,
                ..SweepReport::default()
            });
        };

        let mut report = SweepReport::default();

        for candidate in self.visits.list_by_status(VisitStatus::CheckedIn).await? {
            let visit_id = candidate.id();
            let lock = self.locks.for_key(visit_id);
            let _visit_guard = lock.lock().await;

            // Re-read under the lock; the listing snapshot may be stale.
            let Some(mut visit) = self.visits.find(visit_id).await? else {
                continue;
            };
            if visit.status() != VisitStatus::CheckedIn {
                continue;
            }

            let previous = visit.clone();
            if !visit.flag_overdue(now) {
                continue;
            }

            self.commit_with(
                &previous,
                &visit,
                NewAuditEntry {
                    actor: AuditActor::system(),
                    visitor_id: Some(visit.visitor_id()),
                    visit_id: Some(visit.id()),
                    action: AuditAction::VisitOverdueFlagged,
                    category: AuditCategory::Compliance,
                    severity: AuditSeverity::Warning,
                    outcome: AuditOutcome::Success,
                    risk_level: RiskLevel::Medium,
                    detail: AuditDetail::VisitTransition {
                        visit_id: visit.id(),
                        from: Some(previous.status()),
                        to: visit.status(),
                    },
                    before: None,
                    after: None,
                },
            )
            .await?;

            self.spawn_visit_dispatch(visit.id(), overdue_event(&visit));
            report.affected += 1;
        }

        Ok(report)
    }

    /// Transitions pre-registrations whose QR TTL has elapsed to `expired`.
    pub async fn sweep_expired_pre_registrations(
        &self,
        now: DateTime<Utc>,
    ) -> AppResult<SweepReport> {
        let Ok(_guard) = self.expiry_sweep.try_lock() else {
            return Ok(SweepReport {
                skipped: true,
                ..SweepReport::default()
            });
        };

        let mut report = SweepReport::default();

        for candidate in self
            .visits
            .list_by_status(VisitStatus::PreRegistered)
            .await?
        {
            let visit_id = candidate.id();
            let lock = self.locks.for_key(visit_id);
            let _visit_guard = lock.lock().await;

            // Re-read under the lock; the listing snapshot may be stale.
            let Some(mut visit) = self.visits.find(visit_id).await? else {
                continue;
            };
            if visit.status() != VisitStatus::PreRegistered {
                continue;
            }

            let previous = visit.clone();
            if visit.expire(now).is_err() {
                continue;
            }

            self.commit_with(
                &previous,
                &visit,
                system_transition_entry(&previous, &visit, AuditAction::VisitExpired),
            )
            .await?;

            drop(_visit_guard);
            drop(lock);
            self.locks.release(visit_id);
            report.affected += 1;
        }

        Ok(report)
    }

    /// Transitions pre-registrations past their scheduled start plus grace
    /// window to `no_show`.
    pub async fn sweep_no_shows(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let Ok(_guard) = self.no_show_sweep.try_lock() else {
            return Ok(SweepReport {
                skipped: true,
                ..SweepReport::default()
            });
        };

        let grace = Duration::minutes(self.config.no_show_grace_minutes);
        let mut report = SweepReport::default();

        for candidate in self
            .visits
            .list_by_status(VisitStatus::PreRegistered)
            .await?
        {
            if candidate.scheduled_start() + grace >= now {
                continue;
            }

            let visit_id = candidate.id();
            let lock = self.locks.for_key(visit_id);
            let _visit_guard = lock.lock().await;

            // Re-read under the lock; the listing snapshot may be stale.
            let Some(mut visit) = self.visits.find(visit_id).await? else {
                continue;
            };
            if visit.status() != VisitStatus::PreRegistered {
                continue;
            }

            let previous = visit.clone();
            if visit.mark_no_show().is_err() {
                continue;
            }

            self.commit_with(
                &previous,
                &visit,
                system_transition_entry(&previous, &visit, AuditAction::VisitNoShow),
            )
            .await?;

            drop(_visit_guard);
            drop(lock);
            self.locks.release(visit_id);
            report.affected += 1;
        }

        Ok(report)
    }

    /// Finds a visit by identifier.
    pub async fn get(&self, visit_id: VisitId) -> AppResult<Visit> {
        self.find_visit(visit_id).await
    }

    /// Lists checked-in visits past their expected checkout.
    pub async fn list_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<Visit>> {
        let visits = self.visits.list_by_status(VisitStatus::CheckedIn).await?;
        Ok(visits
            .into_iter()
            .filter(|visit| visit.is_overdue(now))
            .collect())
    }

    /// Returns the occupancy projection.
    #[must_use]
    pub fn occupancy(&self) -> &OccupancyTracker {
        &self.occupancy
    }

    async fn find_visit(&self, visit_id: VisitId) -> AppResult<Visit> {
        self.visits
            .find(visit_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("visit '{visit_id}'")))
    }

    // Persists an updated visit and appends its audit entry; restores the
    // previous state when the ledger write fails so a transition never
    // commits unrecorded.
    async fn commit_update(
        &self,
        previous: &Visit,
        updated: &Visit,
        actor: AuditActor,
        action: AuditAction,
    ) -> AppResult<()> {
        self.commit_with(
            previous,
            updated,
            transition_entry(actor, updated, Some(previous.status()), action),
        )
        .await
    }

    async fn commit_with(
        &self,
        previous: &Visit,
        updated: &Visit,
        entry: NewAuditEntry,
    ) -> AppResult<()> {
        self.visits.update(updated.clone()).await?;

        if let Err(error) = self.audit.record(entry).await {
            let _ = self.visits.update(previous.clone()).await;
            return Err(error);
        }

        Ok(())
    }

    async fn record_policy_rejection(
        &self,
        operator: UserId,
        visitor: &Visitor,
        visit_id: Option<VisitId>,
        rule: &str,
        category: AuditCategory,
    ) -> AppResult<()> {
        self.audit
            .record(NewAuditEntry {
                actor: AuditActor::operator(operator),
                visitor_id: Some(visitor.id()),
                visit_id,
                action: AuditAction::VisitPolicyRejected,
                category,
                severity: AuditSeverity::Warning,
                outcome: AuditOutcome::Failure,
                risk_level: RiskLevel::High,
                detail: AuditDetail::PolicyRejection {
                    rule: rule.to_owned(),
                    visit_id,
                },
                before: None,
                after: None,
            })
            .await?;
        Ok(())
    }

    // Delivery must not block the transition that triggered it.
    fn spawn_dispatch(&self, event: NotificationEvent) {
        let router = self.router.clone();
        tokio::spawn(async move {
            let kind = event.kind;
            if let Err(error) = router.dispatch(event).await {
                warn!(kind = kind.as_str(), %error, "notification dispatch failed");
            }
        });
    }

    // As `spawn_dispatch`, but appends the channel attempts to the visit's
    // notification log afterwards, serialized behind the visit lock.
    fn spawn_visit_dispatch(&self, visit_id: VisitId, event: NotificationEvent) {
        let router = self.router.clone();
        let visits = Arc::clone(&self.visits);
        let locks = Arc::clone(&self.locks);

        tokio::spawn(async move {
            let kind = event.kind;
            let report = match router.dispatch(event).await {
                Ok(report) => report,
                Err(error) => {
                    warn!(kind = kind.as_str(), %error, "notification dispatch failed");
                    return;
                }
            };
            if report.attempts.is_empty() {
                return;
            }

            let lock = locks.for_key(visit_id);
            let _guard = lock.lock().await;
            let found = match visits.find(visit_id).await {
                Ok(found) => found,
                Err(error) => {
                    warn!(visit_id = %visit_id, %error, "failed to load visit for notification log");
                    return;
                }
            };
            let Some(mut visit) = found else {
                return;
            };

            for attempt in report.attempts {
                visit.record_notification(attempt);
            }
            if let Err(error) = visits.update(visit).await {
                warn!(visit_id = %visit_id, %error, "failed to record notification log");
            }

            drop(_guard);
            drop(lock);
            locks.release(visit_id);
        });
    }
}

fn transition_entry(
    actor: AuditActor,
    visit: &Visit,
    from: Option<VisitStatus>,
    action: AuditAction,
) -> NewAuditEntry {
    NewAuditEntry {
        actor,
        visitor_id: Some(visit.visitor_id()),
        visit_id: Some(visit.id()),
        action,
        category: AuditCategory::DataModification,
        severity: AuditSeverity::Info,
        outcome: AuditOutcome::Success,
        risk_level: RiskLevel::Low,
        detail: AuditDetail::VisitTransition {
            visit_id: visit.id(),
            from,
            to: visit.status(),
        },
        before: from.map(|status| json!({"status": status.as_str()})),
        after: Some(json!({"status": visit.status().as_str()})),
    }
}

fn system_transition_entry(previous: &Visit, updated: &Visit, action: AuditAction) -> NewAuditEntry {
    transition_entry(
        AuditActor::system(),
        updated,
        Some(previous.status()),
        action,
    )
}

fn arrival_event(visit: &Visit, visitor: &Visitor) -> NotificationEvent {
    NotificationEvent::new(
        NotificationKind::VisitorArrived,
        vec![
            NotificationTarget::User {
                user_id: visit.host_id(),
            },
            NotificationTarget::Room {
                room: FRONT_DESK_ROOM.to_owned(),
            },
        ],
        "Visitor arrived",
        format!("{} has checked in", visitor.full_name()),
        json!({
            "visit_id": visit.id(),
            "visitor_id": visit.visitor_id(),
            "expected_checkout": visit.expected_checkout(),
        }),
        NotificationPriority::High,
    )
}

fn departure_event(visit: &Visit) -> NotificationEvent {
    NotificationEvent::new(
        NotificationKind::VisitorDeparted,
        vec![
            NotificationTarget::User {
                user_id: visit.host_id(),
            },
            NotificationTarget::Room {
                room: FRONT_DESK_ROOM.to_owned(),
            },
        ],
        "Visitor departed",
        "Your visitor has checked out".to_owned(),
        json!({
            "visit_id": visit.id(),
            "visitor_id": visit.visitor_id(),
            "actual_duration_minutes": visit.actual_duration_minutes(),
        }),
        NotificationPriority::Normal,
    )
}

fn overdue_event(visit: &Visit) -> NotificationEvent {
    NotificationEvent::new(
        NotificationKind::VisitOverdue,
        vec![
            NotificationTarget::User {
                user_id: visit.host_id(),
            },
            NotificationTarget::Room {
                room: FRONT_DESK_ROOM.to_owned(),
            },
        ],
        "Visit overdue",
        "A visitor is past the expected checkout time".to_owned(),
        json!({
            "visit_id": visit.id(),
            "visitor_id": visit.visitor_id(),
            "expected_checkout": visit.expected_checkout(),
        }),
        NotificationPriority::High,
    )
}
