//! Real-time notification fan-out with channel fallback.
//!
//! The router owns the live-connection view of the world: who is reachable
//! over the realtime channel, which role rooms they sit in, and how to reach
//! them when they are not connected. Delivery is best-effort per channel;
//! per-channel outcomes are recorded and summarized into one audit entry per
//! event. Only a critical event exhausting every channel surfaces an error.

mod rate_limit;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use gatehouse_core::{AppError, AppResult, ConnectionId, UserId};
use gatehouse_domain::{
    AuditAction, AuditActor, AuditCategory, AuditDetail, AuditOutcome, AuditSeverity,
    ChannelOutcome, NewAuditEntry, NotificationAttempt, NotificationChannel, NotificationEvent,
    NotificationKind, NotificationPreferences, NotificationPriority, NotificationTarget,
    RealtimeMessage, RiskLevel,
};
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::audit_service::AuditService;
use crate::notification_ports::{
    ConnectionHandle, ConnectionRegistry, EmailService, SmsService, StaffDirectory,
};
use rate_limit::ConnectionRateLimiter;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Router tuning, read once at startup.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Bounded attempts per offline channel (email, SMS).
    pub retry_attempts: u32,
    /// Initial backoff between retries; doubles per attempt.
    pub retry_backoff: StdDuration,
    /// Upper bound on any single channel attempt.
    pub channel_timeout: StdDuration,
    /// Events of one kind allowed per connection per window.
    pub rate_limit_max: u32,
    /// Rolling-window length for the per-connection limit.
    pub rate_limit_window_seconds: i64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_backoff: StdDuration::from_millis(200),
            channel_timeout: StdDuration::from_secs(5),
            rate_limit_max: 30,
            rate_limit_window_seconds: 60,
        }
    }
}

/// Summary of one dispatch pass.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// Live connections that accepted the frame.
    pub realtime_delivered: usize,
    /// Live connections skipped by the per-connection rate limit.
    pub rate_limited: usize,
    /// One entry per channel attempted (or skipped as disabled).
    pub attempts: Vec<NotificationAttempt>,
}

impl DispatchReport {
    /// Whether any channel accepted the event.
    #[must_use]
    pub fn delivered_anywhere(&self) -> bool {
        self.realtime_delivered > 0
            || self
                .attempts
                .iter()
                .any(|attempt| attempt.outcome == ChannelOutcome::Delivered)
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Application service fanning events out to connections and fallback
/// channels.
#[derive(Clone)]
pub struct NotificationRouter {
    registry: Arc<dyn ConnectionRegistry>,
    email: Arc<dyn EmailService>,
    sms: Arc<dyn SmsService>,
    directory: Arc<dyn StaffDirectory>,
    audit: AuditService,
    config: RouterConfig,
    rate_limiter: Arc<ConnectionRateLimiter>,
}

impl NotificationRouter {
    /// Creates the router over its collaborator ports.
    #[must_use]
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        email: Arc<dyn EmailService>,
        sms: Arc<dyn SmsService>,
        directory: Arc<dyn StaffDirectory>,
        audit: AuditService,
        config: RouterConfig,
    ) -> Self {
        let rate_limiter = Arc::new(ConnectionRateLimiter::new(
            config.rate_limit_max,
            Duration::seconds(config.rate_limit_window_seconds),
        ));

        Self {
            registry,
            email,
            sms,
            directory,
            audit,
            config,
            rate_limiter,
        }
    }

    /// Registers a live connection. Idempotent per connection id.
    pub async fn connect(&self, handle: ConnectionHandle) -> AppResult<()> {
        debug!(
            connection_id = %handle.connection_id,
            user_id = %handle.user_id,
            role = handle.role.as_str(),
            "connection registered"
        );
        self.registry.register(handle).await
    }

    /// Removes a connection; the user goes offline with their last one.
    pub async fn disconnect(&self, connection_id: ConnectionId) -> AppResult<()> {
        self.rate_limiter.forget(connection_id);
        let user = self.registry.unregister(connection_id).await?;
        if let Some(user_id) = user {
            debug!(connection_id = %connection_id, user_id = %user_id, "connection removed");
        }
        Ok(())
    }

    /// Whether the user has at least one live connection.
    pub async fn is_online(&self, user_id: UserId) -> AppResult<bool> {
        self.registry.is_online(user_id).await
    }

    /// Delivers one event: realtime fan-out to every matching live
    /// connection, then email → SMS escalation for offline users when the
    /// priority requires durability.
    ///
    /// Channel failures are recorded, never raised — except when every
    /// channel of a `Critical` event fails, which returns
    /// [`AppError::DeliveryExhausted`] so the caller can escalate
    /// out-of-band. An audit-ledger failure also propagates.
    pub async fn dispatch(&self, event: NotificationEvent) -> AppResult<DispatchReport> {
        let mut report = DispatchReport::default();

        self.fan_out_realtime(&event, &mut report).await?;
        if event.priority.requires_durability() {
            self.escalate_offline(&event, &mut report).await?;
        }

        let delivered = report.delivered_anywhere();
        self.record_dispatch(&event, &report, delivered).await?;

        if event.priority == NotificationPriority::Critical && !delivered {
            return Err(AppError::DeliveryExhausted);
        }

        Ok(report)
    }

    /// Convenience for the emergency path: a critical broadcast that also
    /// reaches security and admin staff over durable channels.
    pub async fn broadcast_emergency(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
        data: Value,
    ) -> AppResult<DispatchReport> {
        let event = NotificationEvent::new(
            NotificationKind::EmergencyNotification,
            vec![
                NotificationTarget::Broadcast,
                NotificationTarget::Role {
                    role: gatehouse_domain::StaffRole::Security,
                },
                NotificationTarget::Role {
                    role: gatehouse_domain::StaffRole::Admin,
                },
            ],
            title,
            message,
            data,
            NotificationPriority::Critical,
        );

        self.dispatch(event).await
    }

    async fn fan_out_realtime(
        &self,
        event: &NotificationEvent,
        report: &mut DispatchReport,
    ) -> AppResult<()> {
        let connections = self.resolve_connections(event).await?;
        if connections.is_empty() {
            return Ok(());
        }

        let frame = RealtimeMessage::from_event(event);
        let now = Utc::now();
        let mut failed = 0_usize;

        for handle in connections.values() {
            if !self
                .rate_limiter
                .allow(handle.connection_id, event.kind, now)
            {
                report.rate_limited += 1;
                continue;
            }

            match timeout(self.config.channel_timeout, handle.sender.send(frame.clone())).await {
                Ok(Ok(())) => report.realtime_delivered += 1,
                Ok(Err(_closed)) => {
                    failed += 1;
                    warn!(
                        connection_id = %handle.connection_id,
                        "realtime send failed, connection queue closed"
                    );
                }
                Err(_elapsed) => {
                    failed += 1;
                    warn!(
                        connection_id = %handle.connection_id,
                        "realtime send timed out"
                    );
                }
            }
        }

        if report.realtime_delivered > 0 || failed > 0 {
            report.attempts.push(NotificationAttempt {
                channel: NotificationChannel::Realtime,
                attempted_at: Utc::now(),
                outcome: if report.realtime_delivered > 0 {
                    ChannelOutcome::Delivered
                } else {
                    ChannelOutcome::Failed
                },
            });
        }

        Ok(())
    }

    async fn escalate_offline(
        &self,
        event: &NotificationEvent,
        report: &mut DispatchReport,
    ) -> AppResult<()> {
        for user_id in self.durable_recipients(event).await? {
            if self.registry.is_online(user_id).await? {
                continue;
            }

            let Some(preferences) = self.directory.preferences(user_id).await? else {
                debug!(user_id = %user_id, "no notification preferences, skipping escalation");
                continue;
            };

            let email_outcome = self.try_email(event, &preferences).await;
            report.attempts.push(NotificationAttempt {
                channel: NotificationChannel::Email,
                attempted_at: Utc::now(),
                outcome: email_outcome,
            });

            if email_outcome == ChannelOutcome::Delivered {
                continue;
            }

            let sms_outcome = self.try_sms(event, &preferences).await;
            report.attempts.push(NotificationAttempt {
                channel: NotificationChannel::Sms,
                attempted_at: Utc::now(),
                outcome: sms_outcome,
            });
        }

        Ok(())
    }

    async fn try_email(
        &self,
        event: &NotificationEvent,
        preferences: &NotificationPreferences,
    ) -> ChannelOutcome {
        let Some(address) = preferences
            .email
            .as_ref()
            .filter(|_| preferences.email_enabled)
        else {
            return ChannelOutcome::SkippedDisabled;
        };

        let mut backoff = self.config.retry_backoff;
        for attempt in 1..=self.config.retry_attempts {
            match timeout(
                self.config.channel_timeout,
                self.email
                    .send_email(address.as_str(), &event.title, &event.message, None),
            )
            .await
            {
                Ok(Ok(())) => return ChannelOutcome::Delivered,
                Ok(Err(error)) => {
                    warn!(attempt, %error, "email escalation attempt failed");
                }
                Err(_elapsed) => {
                    // A stalled provider must not starve the other channels;
                    // a timeout ends this channel for the dispatch.
                    warn!(attempt, "email escalation timed out");
                    return ChannelOutcome::Failed;
                }
            }

            if attempt < self.config.retry_attempts {
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }

        ChannelOutcome::Failed
    }

    async fn try_sms(
        &self,
        event: &NotificationEvent,
        preferences: &NotificationPreferences,
    ) -> ChannelOutcome {
        let Some(phone) = preferences.phone.as_ref().filter(|_| preferences.sms_enabled) else {
            return ChannelOutcome::SkippedDisabled;
        };

        let body = format!("{}: {}", event.title, event.message);
        let mut backoff = self.config.retry_backoff;
        for attempt in 1..=self.config.retry_attempts {
            match timeout(
                self.config.channel_timeout,
                self.sms.send_sms(phone.as_str(), &body),
            )
            .await
            {
                Ok(Ok(())) => return ChannelOutcome::Delivered,
                Ok(Err(error)) => {
                    warn!(attempt, %error, "sms escalation attempt failed");
                }
                Err(_elapsed) => {
                    warn!(attempt, "sms escalation timed out");
                    return ChannelOutcome::Failed;
                }
            }

            if attempt < self.config.retry_attempts {
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }

        ChannelOutcome::Failed
    }

    async fn resolve_connections(
        &self,
        event: &NotificationEvent,
    ) -> AppResult<HashMap<ConnectionId, ConnectionHandle>> {
        let mut connections = HashMap::new();

        for target in &event.targets {
            let matched = match target {
                NotificationTarget::User { user_id } => {
                    self.registry.connections_for_user(*user_id).await?
                }
                NotificationTarget::Role { role } => {
                    self.registry.connections_for_role(*role).await?
                }
                NotificationTarget::Room { room } => {
                    self.registry.connections_for_room(room).await?
                }
                NotificationTarget::Broadcast => self.registry.all_connections().await?,
            };

            for handle in matched {
                connections.insert(handle.connection_id, handle);
            }
        }

        Ok(connections)
    }

    // Users the event must durably reach: explicit user targets plus the
    // members of targeted roles. Broadcasts stay realtime-only.
    async fn durable_recipients(&self, event: &NotificationEvent) -> AppResult<Vec<UserId>> {
        let mut recipients = HashSet::new();

        for target in &event.targets {
            match target {
                NotificationTarget::User { user_id } => {
                    recipients.insert(*user_id);
                }
                NotificationTarget::Role { role } => {
                    for user_id in self.directory.members_of_role(*role).await? {
                        recipients.insert(user_id);
                    }
                }
                NotificationTarget::Room { .. } | NotificationTarget::Broadcast => {}
            }
        }

        Ok(recipients.into_iter().collect())
    }

    async fn record_dispatch(
        &self,
        event: &NotificationEvent,
        report: &DispatchReport,
        delivered: bool,
    ) -> AppResult<()> {
        let target_summary = summarize_targets(event);

        self.audit
            .record(NewAuditEntry {
                actor: AuditActor::system(),
                visitor_id: None,
                visit_id: None,
                action: AuditAction::NotificationDispatched,
                category: AuditCategory::SystemAccess,
                severity: if delivered {
                    AuditSeverity::Info
                } else {
                    AuditSeverity::Warning
                },
                outcome: if delivered || report.attempts.is_empty() {
                    AuditOutcome::Success
                } else {
                    AuditOutcome::Failure
                },
                risk_level: RiskLevel::Low,
                detail: AuditDetail::Delivery {
                    kind: event.kind,
                    target_summary,
                    attempts: report.attempts.clone(),
                },
                before: None,
                after: None,
            })
            .await?;

        Ok(())
    }
}

fn summarize_targets(event: &NotificationEvent) -> String {
    let parts: Vec<String> = event
        .targets
        .iter()
        .map(|target| match target {
            NotificationTarget::User { user_id } => format!("user:{user_id}"),
            NotificationTarget::Role { role } => format!("role:{}", role.as_str()),
            NotificationTarget::Room { room } => format!("room:{room}"),
            NotificationTarget::Broadcast => "broadcast".to_owned(),
        })
        .collect();

    parts.join(",")
}

#[cfg(test)]
mod tests;
