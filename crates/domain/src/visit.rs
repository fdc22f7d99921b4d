use chrono::{DateTime, Duration, Utc};
use gatehouse_core::{AppError, AppResult, NonEmptyString, UserId, VisitId, VisitorId};
use serde::{Deserialize, Serialize};

use crate::notification::NotificationAttempt;

/// Lifecycle states of a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    /// Created ahead of arrival; QR token outstanding.
    PreRegistered,
    /// Visitor is inside the facility.
    CheckedIn,
    /// Visitor left through the normal path. Terminal.
    CheckedOut,
    /// Cancelled before arrival. Terminal.
    Cancelled,
    /// QR token TTL elapsed without a check-in. Terminal.
    Expired,
    /// Scheduled start passed without arrival. Terminal.
    NoShow,
}

impl VisitStatus {
    /// Returns the stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreRegistered => "pre_registered",
            Self::CheckedIn => "checked_in",
            Self::CheckedOut => "checked_out",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
            Self::NoShow => "no_show",
        }
    }

    /// Whether the state admits no further transition.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::CheckedOut | Self::Cancelled | Self::Expired | Self::NoShow
        )
    }
}

/// Check-in token bound to one visit. Only the hash is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrToken {
    token_hash: String,
    expires_at: DateTime<Utc>,
}

impl QrToken {
    /// Creates a token from its stored hash and expiry instant.
    #[must_use]
    pub fn new(token_hash: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token_hash: token_hash.into(),
            expires_at,
        }
    }

    /// Returns the stored token hash.
    #[must_use]
    pub fn token_hash(&self) -> &str {
        self.token_hash.as_str()
    }

    /// Returns the expiry instant.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the token TTL has elapsed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Evacuation marking applied while a visit is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvacuationRecord {
    /// When the visit was marked evacuated.
    pub marked_at: DateTime<Utc>,
    /// Operator-supplied context (assembly point, incident reference).
    pub details: String,
}

/// Post-hoc feedback attached to a completed visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitAnnotation {
    /// Rating from 1 to 5.
    pub rating: u8,
    /// Optional free-text feedback.
    pub feedback: Option<String>,
}

/// One visitor's single presence episode, governed by the lifecycle above.
///
/// Transition methods enforce every precondition and reject illegal moves;
/// terminal states are immutable except for [`Visit::annotate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    id: VisitId,
    visitor_id: VisitorId,
    host_id: UserId,
    purpose: NonEmptyString,
    status: VisitStatus,
    scheduled_start: DateTime<Utc>,
    expected_duration_minutes: Option<i64>,
    pre_registered_at: DateTime<Utc>,
    checked_in_at: Option<DateTime<Utc>>,
    checked_in_by: Option<UserId>,
    checked_out_at: Option<DateTime<Utc>>,
    checked_out_by: Option<UserId>,
    expected_checkout: Option<DateTime<Utc>>,
    actual_duration_minutes: Option<i64>,
    qr_token: QrToken,
    badge_number: Option<String>,
    notification_log: Vec<NotificationAttempt>,
    evacuation: Option<EvacuationRecord>,
    host_confirmed: bool,
    security_approved: bool,
    overdue_flagged: bool,
    cancel_reason: Option<String>,
    annotation: Option<VisitAnnotation>,
}

impl Visit {
    /// Creates a visit in `pre_registered` with an outstanding QR token.
    pub fn pre_register(
        visitor_id: VisitorId,
        host_id: UserId,
        purpose: impl Into<String>,
        scheduled_start: DateTime<Utc>,
        expected_duration_minutes: Option<i64>,
        qr_token: QrToken,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        if let Some(minutes) = expected_duration_minutes
            && minutes <= 0
        {
            return Err(AppError::Validation(
                "expected duration must be a positive number of minutes".to_owned(),
            ));
        }

        Ok(Self {
            id: VisitId::new(),
            visitor_id,
            host_id,
            purpose: NonEmptyString::new(purpose)?,
            status: VisitStatus::PreRegistered,
            scheduled_start,
            expected_duration_minutes,
            pre_registered_at: now,
            checked_in_at: None,
            checked_in_by: None,
            checked_out_at: None,
            checked_out_by: None,
            expected_checkout: None,
            actual_duration_minutes: None,
            qr_token,
            badge_number: None,
            notification_log: Vec::new(),
            evacuation: None,
            host_confirmed: false,
            security_approved: false,
            overdue_flagged: false,
            cancel_reason: None,
            annotation: None,
        })
    }

    /// Moves `pre_registered → checked_in`.
    ///
    /// Rejects re-entrant check-in (`AlreadyCheckedIn`), terminal visits
    /// (`VisitCompleted`) and an elapsed QR token (`TokenExpired`). Sets the
    /// expected checkout when an expected duration was given.
    pub fn check_in(&mut self, operator: UserId, now: DateTime<Utc>) -> AppResult<()> {
        match self.status {
            VisitStatus::CheckedIn => return Err(AppError::AlreadyCheckedIn),
            VisitStatus::CheckedOut
            | VisitStatus::Cancelled
            | VisitStatus::Expired
            | VisitStatus::NoShow => return Err(AppError::VisitCompleted),
            VisitStatus::PreRegistered => {}
        }

        if self.qr_token.is_expired(now) {
            return Err(AppError::TokenExpired);
        }

        self.status = VisitStatus::CheckedIn;
        self.checked_in_at = Some(now);
        self.checked_in_by = Some(operator);
        self.expected_checkout = self
            .expected_duration_minutes
            .map(|minutes| now + Duration::minutes(minutes));

        Ok(())
    }

    /// Moves `checked_in → checked_out` and computes the actual duration
    /// (minutes, rounded to nearest).
    pub fn check_out(&mut self, operator: UserId, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != VisitStatus::CheckedIn {
            return Err(AppError::NotCheckedIn);
        }

        self.status = VisitStatus::CheckedOut;
        self.checked_out_at = Some(now);
        self.checked_out_by = Some(operator);
        self.actual_duration_minutes = self
            .checked_in_at
            .map(|checked_in_at| rounded_minutes(now - checked_in_at));

        Ok(())
    }

    /// Moves `pre_registered → cancelled`.
    pub fn cancel(&mut self, reason: impl Into<String>) -> AppResult<()> {
        match self.status {
            VisitStatus::CheckedIn => return Err(AppError::VisitActive),
            VisitStatus::CheckedOut
            | VisitStatus::Cancelled
            | VisitStatus::Expired
            | VisitStatus::NoShow => return Err(AppError::VisitCompleted),
            VisitStatus::PreRegistered => {}
        }

        self.status = VisitStatus::Cancelled;
        self.cancel_reason = Some(reason.into());
        Ok(())
    }

    /// Moves `pre_registered → expired` once the QR token TTL has elapsed.
    pub fn expire(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != VisitStatus::PreRegistered {
            return Err(AppError::Conflict(format!(
                "cannot expire a visit in state '{}'",
                self.status.as_str()
            )));
        }

        if !self.qr_token.is_expired(now) {
            return Err(AppError::Conflict(
                "visit token has not yet expired".to_owned(),
            ));
        }

        self.status = VisitStatus::Expired;
        Ok(())
    }

    /// Moves `pre_registered → no_show`.
    pub fn mark_no_show(&mut self) -> AppResult<()> {
        if self.status != VisitStatus::PreRegistered {
            return Err(AppError::Conflict(format!(
                "cannot mark a visit in state '{}' as no-show",
                self.status.as_str()
            )));
        }

        self.status = VisitStatus::NoShow;
        Ok(())
    }

    /// Sets the orthogonal evacuation flag. Legal only while checked in;
    /// does not change `status`.
    pub fn mark_evacuated(
        &mut self,
        details: impl Into<String>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if self.status != VisitStatus::CheckedIn {
            return Err(AppError::NotCheckedIn);
        }

        self.evacuation = Some(EvacuationRecord {
            marked_at: now,
            details: details.into(),
        });
        Ok(())
    }

    /// Attaches post-hoc rating and feedback. Legal only on `checked_out`.
    pub fn annotate(&mut self, rating: u8, feedback: Option<String>) -> AppResult<()> {
        if self.status != VisitStatus::CheckedOut {
            return Err(AppError::Conflict(
                "only completed visits can be rated".to_owned(),
            ));
        }

        if !(1..=5).contains(&rating) {
            return Err(AppError::Validation(
                "rating must be between 1 and 5".to_owned(),
            ));
        }

        self.annotation = Some(VisitAnnotation { rating, feedback });
        Ok(())
    }

    /// Flags an overdue visit, once. Returns whether this call set the flag.
    ///
    /// Overdue is advisory: the status stays `checked_in`.
    pub fn flag_overdue(&mut self, now: DateTime<Utc>) -> bool {
        if self.overdue_flagged || !self.is_overdue(now) {
            return false;
        }

        self.overdue_flagged = true;
        true
    }

    /// Whether the visit is checked in past its expected checkout.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == VisitStatus::CheckedIn
            && self
                .expected_checkout
                .is_some_and(|expected| expected < now)
    }

    /// Appends one channel attempt to the notification log.
    pub fn record_notification(&mut self, attempt: NotificationAttempt) {
        self.notification_log.push(attempt);
    }

    /// Records host confirmation of the visit.
    pub fn confirm_host(&mut self) {
        self.host_confirmed = true;
    }

    /// Records security approval of the visit.
    pub fn approve_security(&mut self) {
        self.security_approved = true;
    }

    /// Assigns a physical badge number.
    pub fn assign_badge(&mut self, badge_number: impl Into<String>) {
        self.badge_number = Some(badge_number.into());
    }

    /// Returns the visit identifier.
    #[must_use]
    pub fn id(&self) -> VisitId {
        self.id
    }

    /// Returns the visitor reference.
    #[must_use]
    pub fn visitor_id(&self) -> VisitorId {
        self.visitor_id
    }

    /// Returns the host reference.
    #[must_use]
    pub fn host_id(&self) -> UserId {
        self.host_id
    }

    /// Returns the stated purpose.
    #[must_use]
    pub fn purpose(&self) -> &NonEmptyString {
        &self.purpose
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn status(&self) -> VisitStatus {
        self.status
    }

    /// Returns the scheduled start instant.
    #[must_use]
    pub fn scheduled_start(&self) -> DateTime<Utc> {
        self.scheduled_start
    }

    /// Returns the expected duration in minutes, if stated.
    #[must_use]
    pub fn expected_duration_minutes(&self) -> Option<i64> {
        self.expected_duration_minutes
    }

    /// Returns the pre-registration instant.
    #[must_use]
    pub fn pre_registered_at(&self) -> DateTime<Utc> {
        self.pre_registered_at
    }

    /// Returns the check-in instant, if checked in.
    #[must_use]
    pub fn checked_in_at(&self) -> Option<DateTime<Utc>> {
        self.checked_in_at
    }

    /// Returns the check-in operator.
    #[must_use]
    pub fn checked_in_by(&self) -> Option<UserId> {
        self.checked_in_by
    }

    /// Returns the check-out instant, if checked out.
    #[must_use]
    pub fn checked_out_at(&self) -> Option<DateTime<Utc>> {
        self.checked_out_at
    }

    /// Returns the check-out operator.
    #[must_use]
    pub fn checked_out_by(&self) -> Option<UserId> {
        self.checked_out_by
    }

    /// Returns the expected checkout instant, if a duration was stated.
    #[must_use]
    pub fn expected_checkout(&self) -> Option<DateTime<Utc>> {
        self.expected_checkout
    }

    /// Actual duration in rounded minutes. Defined iff both check timestamps
    /// are set.
    #[must_use]
    pub fn actual_duration_minutes(&self) -> Option<i64> {
        self.actual_duration_minutes
    }

    /// Returns the bound QR token.
    #[must_use]
    pub fn qr_token(&self) -> &QrToken {
        &self.qr_token
    }

    /// Returns the assigned badge number, if any.
    #[must_use]
    pub fn badge_number(&self) -> Option<&str> {
        self.badge_number.as_deref()
    }

    /// Returns the ordered channel-attempt log.
    #[must_use]
    pub fn notification_log(&self) -> &[NotificationAttempt] {
        self.notification_log.as_slice()
    }

    /// Returns the evacuation record, if the visit was marked evacuated.
    #[must_use]
    pub fn evacuation(&self) -> Option<&EvacuationRecord> {
        self.evacuation.as_ref()
    }

    /// Whether the host confirmed the visit.
    #[must_use]
    pub fn host_confirmed(&self) -> bool {
        self.host_confirmed
    }

    /// Whether security approved the visit.
    #[must_use]
    pub fn security_approved(&self) -> bool {
        self.security_approved
    }

    /// Whether the overdue flag has been raised.
    #[must_use]
    pub fn overdue_flagged(&self) -> bool {
        self.overdue_flagged
    }

    /// Returns the cancellation reason, if cancelled.
    #[must_use]
    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    /// Returns the post-hoc annotation, if any.
    #[must_use]
    pub fn annotation(&self) -> Option<&VisitAnnotation> {
        self.annotation.as_ref()
    }
}

fn rounded_minutes(elapsed: Duration) -> i64 {
    (elapsed.num_seconds() + 30).div_euclid(60)
}
