use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration as StdDuration;

use gatehouse_core::{AppError, ConnectionId, EmailAddress, PhoneNumber, UserId};
use gatehouse_domain::{
    AuditDetail, ChannelOutcome, NotificationChannel, NotificationEvent, NotificationKind,
    NotificationPreferences, NotificationPriority, NotificationTarget, RealtimeMessage, StaffRole,
    FRONT_DESK_ROOM,
};
use serde_json::json;
use tokio::sync::mpsc;

use crate::audit_service::{AuditService, RetentionPolicy};
use crate::notification_ports::{ConnectionHandle, ConnectionRegistry};
use crate::test_support::{
    FakeAuditRepository, FakeConnectionRegistry, FakeEmailService, FakeSmsService,
    FakeStaffDirectory,
};

use super::{NotificationRouter, RouterConfig};

struct Fixture {
    router: NotificationRouter,
    registry: Arc<FakeConnectionRegistry>,
    email: Arc<FakeEmailService>,
    sms: Arc<FakeSmsService>,
    directory: Arc<FakeStaffDirectory>,
    audit_repository: Arc<FakeAuditRepository>,
}

fn fixture_with(config: RouterConfig) -> Fixture {
    let registry = Arc::new(FakeConnectionRegistry::default());
    let email = Arc::new(FakeEmailService::default());
    let sms = Arc::new(FakeSmsService::default());
    let directory = Arc::new(FakeStaffDirectory::default());
    let audit_repository = Arc::new(FakeAuditRepository::default());
    let audit = AuditService::new(audit_repository.clone(), RetentionPolicy::default());

    let router = NotificationRouter::new(
        registry.clone(),
        email.clone(),
        sms.clone(),
        directory.clone(),
        audit,
        config,
    );

    Fixture {
        router,
        registry,
        email,
        sms,
        directory,
        audit_repository,
    }
}

fn fixture() -> Fixture {
    fixture_with(RouterConfig {
        retry_backoff: StdDuration::from_millis(1),
        ..RouterConfig::default()
    })
}

fn handle(user_id: UserId, role: StaffRole) -> (ConnectionHandle, mpsc::Receiver<RealtimeMessage>) {
    let (sender, receiver) = mpsc::channel(16);
    (
        ConnectionHandle {
            connection_id: ConnectionId::new(),
            user_id,
            role,
            extra_rooms: Vec::new(),
            sender,
        },
        receiver,
    )
}

fn event_for(targets: Vec<NotificationTarget>, priority: NotificationPriority) -> NotificationEvent {
    NotificationEvent::new(
        NotificationKind::VisitorArrived,
        targets,
        "Visitor arrived",
        "Your visitor is at the front desk",
        json!({"visit_id": "v-1"}),
        priority,
    )
}

#[tokio::test]
async fn dispatch_reaches_personal_channel_and_front_desk_room() {
    let fixture = fixture();
    let host = UserId::new();

    let (host_handle, mut host_rx) = handle(host, StaffRole::Host);
    let (desk_handle, mut desk_rx) = handle(UserId::new(), StaffRole::Receptionist);
    let (other_handle, mut other_rx) = handle(UserId::new(), StaffRole::Host);

    for connection in [host_handle, desk_handle, other_handle] {
        assert!(fixture.router.connect(connection).await.is_ok());
    }

    let event = event_for(
        vec![
            NotificationTarget::User { user_id: host },
            NotificationTarget::Room {
                room: FRONT_DESK_ROOM.to_owned(),
            },
        ],
        NotificationPriority::Normal,
    );

    let report = fixture.router.dispatch(event).await;
    assert!(report.is_ok_and(|report| report.realtime_delivered == 2));

    assert!(host_rx.try_recv().is_ok());
    assert!(desk_rx.try_recv().is_ok());
    assert!(other_rx.try_recv().is_err());
}

#[tokio::test]
async fn disconnecting_last_connection_takes_user_offline() {
    let fixture = fixture();
    let user = UserId::new();
    let (first, _rx1) = handle(user, StaffRole::Host);
    let (second, _rx2) = handle(user, StaffRole::Host);
    let first_id = first.connection_id;
    let second_id = second.connection_id;

    assert!(fixture.router.connect(first).await.is_ok());
    assert!(fixture.router.connect(second).await.is_ok());
    assert!(matches!(fixture.router.is_online(user).await, Ok(true)));

    assert!(fixture.router.disconnect(first_id).await.is_ok());
    assert!(matches!(fixture.router.is_online(user).await, Ok(true)));

    assert!(fixture.router.disconnect(second_id).await.is_ok());
    assert!(matches!(fixture.router.is_online(user).await, Ok(false)));
}

#[tokio::test]
async fn offline_high_priority_escalates_to_email() {
    let fixture = fixture();
    let host = UserId::new();
    fixture
        .directory
        .seed_preferences(
            host,
            NotificationPreferences {
                email_enabled: true,
                sms_enabled: true,
                email: EmailAddress::new("host@example.com").ok(),
                phone: PhoneNumber::new("+65 9123 4567").ok(),
            },
        )
        .await;

    let event = event_for(
        vec![NotificationTarget::User { user_id: host }],
        NotificationPriority::High,
    );

    let report = fixture.router.dispatch(event).await;
    assert!(report.is_ok_and(|report| {
        report
            .attempts
            .iter()
            .any(|attempt| attempt.channel == NotificationChannel::Email
                && attempt.outcome == ChannelOutcome::Delivered)
    }));

    assert_eq!(fixture.email.sent.lock().await.len(), 1);
    // Email delivered, so SMS is never attempted.
    assert!(fixture.sms.sent.lock().await.is_empty());
}

#[tokio::test]
async fn email_failure_falls_back_to_sms_after_retries() {
    let fixture = fixture();
    let host = UserId::new();
    // More failures than the configured retry budget.
    fixture.email.failures_remaining.store(10, Ordering::SeqCst);
    fixture
        .directory
        .seed_preferences(
            host,
            NotificationPreferences {
                email_enabled: true,
                sms_enabled: true,
                email: EmailAddress::new("host@example.com").ok(),
                phone: PhoneNumber::new("+65 9123 4567").ok(),
            },
        )
        .await;

    let event = event_for(
        vec![NotificationTarget::User { user_id: host }],
        NotificationPriority::High,
    );

    let report = fixture.router.dispatch(event).await;
    let Ok(report) = report else { unreachable!() };

    let email_failed = report.attempts.iter().any(|attempt| {
        attempt.channel == NotificationChannel::Email && attempt.outcome == ChannelOutcome::Failed
    });
    let sms_delivered = report.attempts.iter().any(|attempt| {
        attempt.channel == NotificationChannel::Sms && attempt.outcome == ChannelOutcome::Delivered
    });
    assert!(email_failed && sms_delivered);
    assert_eq!(fixture.sms.sent.lock().await.len(), 1);
}

#[tokio::test]
async fn disabled_channels_are_skipped_not_failed() {
    let fixture = fixture();
    let host = UserId::new();
    fixture
        .directory
        .seed_preferences(
            host,
            NotificationPreferences {
                email_enabled: false,
                sms_enabled: true,
                email: EmailAddress::new("host@example.com").ok(),
                phone: PhoneNumber::new("+65 9123 4567").ok(),
            },
        )
        .await;

    let event = event_for(
        vec![NotificationTarget::User { user_id: host }],
        NotificationPriority::High,
    );

    let report = fixture.router.dispatch(event).await;
    let Ok(report) = report else { unreachable!() };

    assert!(report.attempts.iter().any(|attempt| {
        attempt.channel == NotificationChannel::Email
            && attempt.outcome == ChannelOutcome::SkippedDisabled
    }));
    assert!(report.attempts.iter().any(|attempt| {
        attempt.channel == NotificationChannel::Sms && attempt.outcome == ChannelOutcome::Delivered
    }));
}

#[tokio::test]
async fn critical_event_with_every_channel_failing_signals_exhaustion() {
    let fixture = fixture();
    let host = UserId::new();
    fixture.email.failures_remaining.store(100, Ordering::SeqCst);
    fixture.sms.fail_all.store(true, Ordering::SeqCst);
    fixture
        .directory
        .seed_preferences(
            host,
            NotificationPreferences {
                email_enabled: true,
                sms_enabled: true,
                email: EmailAddress::new("host@example.com").ok(),
                phone: PhoneNumber::new("+65 9123 4567").ok(),
            },
        )
        .await;

    let event = event_for(
        vec![NotificationTarget::User { user_id: host }],
        NotificationPriority::Critical,
    );

    let result = fixture.router.dispatch(event).await;
    assert!(matches!(result, Err(AppError::DeliveryExhausted)));
}

#[tokio::test]
async fn normal_priority_never_escalates_offline() {
    let fixture = fixture();
    let host = UserId::new();
    fixture
        .directory
        .seed_preferences(
            host,
            NotificationPreferences {
                email_enabled: true,
                sms_enabled: true,
                email: EmailAddress::new("host@example.com").ok(),
                phone: PhoneNumber::new("+65 9123 4567").ok(),
            },
        )
        .await;

    let event = event_for(
        vec![NotificationTarget::User { user_id: host }],
        NotificationPriority::Normal,
    );

    let report = fixture.router.dispatch(event).await;
    assert!(report.is_ok_and(|report| report.attempts.is_empty()));
    assert!(fixture.email.sent.lock().await.is_empty());
}

#[tokio::test]
async fn dispatch_writes_one_audit_entry_with_all_attempts() {
    let fixture = fixture();
    let host = UserId::new();
    fixture.email.failures_remaining.store(100, Ordering::SeqCst);
    fixture
        .directory
        .seed_preferences(
            host,
            NotificationPreferences {
                email_enabled: true,
                sms_enabled: true,
                email: EmailAddress::new("host@example.com").ok(),
                phone: PhoneNumber::new("+65 9123 4567").ok(),
            },
        )
        .await;

    let event = event_for(
        vec![NotificationTarget::User { user_id: host }],
        NotificationPriority::High,
    );
    let report = fixture.router.dispatch(event).await;
    assert!(report.is_ok());

    assert_eq!(fixture.audit_repository.entry_count().await, 1);
    let entry = fixture.audit_repository.last_entry().await;
    assert!(entry.is_some_and(|entry| match entry.detail() {
        AuditDetail::Delivery { attempts, .. } => attempts.len() == 2,
        _ => false,
    }));
}

#[tokio::test]
async fn rate_limited_connections_are_skipped() {
    let fixture = fixture_with(RouterConfig {
        rate_limit_max: 2,
        retry_backoff: StdDuration::from_millis(1),
        ..RouterConfig::default()
    });
    let user = UserId::new();
    let (connection, mut rx) = handle(user, StaffRole::Host);
    assert!(fixture.router.connect(connection).await.is_ok());

    for _ in 0..3 {
        let event = event_for(
            vec![NotificationTarget::User { user_id: user }],
            NotificationPriority::Normal,
        );
        let _ = fixture.router.dispatch(event).await;
    }

    let mut received = 0;
    while rx.try_recv().is_ok() {
        received += 1;
    }
    assert_eq!(received, 2);
}

#[tokio::test]
async fn reconnect_with_same_connection_id_is_idempotent() {
    let fixture = fixture();
    let user = UserId::new();
    let (first, _rx1) = handle(user, StaffRole::Host);
    let connection_id = first.connection_id;

    let (sender, _rx2) = mpsc::channel(16);
    let replacement = ConnectionHandle {
        connection_id,
        user_id: user,
        role: StaffRole::Host,
        extra_rooms: Vec::new(),
        sender,
    };

    assert!(fixture.router.connect(first).await.is_ok());
    assert!(fixture.router.connect(replacement).await.is_ok());

    let connections = fixture.registry.connections_for_user(user).await;
    assert!(connections.is_ok_and(|connections| connections.len() == 1));
}

#[tokio::test]
async fn role_escalation_reaches_offline_members() {
    let fixture = fixture();
    let admin = UserId::new();
    fixture.directory.seed_member(StaffRole::Admin, admin).await;
    fixture
        .directory
        .seed_preferences(
            admin,
            NotificationPreferences {
                email_enabled: true,
                sms_enabled: false,
                email: EmailAddress::new("admin@example.com").ok(),
                phone: None,
            },
        )
        .await;

    let event = event_for(
        vec![NotificationTarget::Role {
            role: StaffRole::Admin,
        }],
        NotificationPriority::High,
    );

    let report = fixture.router.dispatch(event).await;
    assert!(report.is_ok());
    assert_eq!(fixture.email.sent.lock().await.len(), 1);
}
