use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::{Duration, Utc};
use gatehouse_core::{AppError, UserId};
use gatehouse_domain::{AuditAction, AuditCategory, Visitor};

use crate::audit_service::{AuditService, RetentionPolicy};
use crate::test_support::{FakeAuditRepository, FakeVisitorRepository};
use crate::visit_ports::VisitorRepository;

use super::{RegisterVisitorInput, VisitorService};

struct Fixture {
    service: VisitorService,
    visitors: Arc<FakeVisitorRepository>,
    audit: Arc<FakeAuditRepository>,
    operator: UserId,
}

fn fixture() -> Fixture {
    let visitors = Arc::new(FakeVisitorRepository::default());
    let audit_repo = Arc::new(FakeAuditRepository::default());
    let audit = AuditService::new(audit_repo.clone(), RetentionPolicy::default());

    Fixture {
        service: VisitorService::new(visitors.clone(), audit, 365),
        visitors,
        audit: audit_repo,
        operator: UserId::new(),
    }
}

fn sample_input() -> RegisterVisitorInput {
    RegisterVisitorInput {
        email: "ada@example.com".to_owned(),
        full_name: "Ada Lovelace".to_owned(),
        company: Some("Analytical Engines Ltd".to_owned()),
        phone: None,
    }
}

#[tokio::test]
async fn registration_creates_profile_and_audit_entry() {
    let fixture = fixture();

    let registered = fixture.service.register(fixture.operator, sample_input()).await;

    assert!(registered.is_ok_and(|visitor| {
        visitor.email().as_str() == "ada@example.com" && !visitor.is_recurring()
    }));
    let entry = fixture.audit.last_entry().await;
    assert!(entry.is_some_and(|entry| entry.action() == AuditAction::VisitorRegistered));
}

#[tokio::test]
async fn re_registration_returns_existing_profile_marked_recurring() {
    let fixture = fixture();

    let first = fixture.service.register(fixture.operator, sample_input()).await;
    let second = fixture.service.register(fixture.operator, sample_input()).await;

    let Ok(first) = first else {
        unreachable!();
    };
    assert!(second.is_ok_and(|visitor| visitor.id() == first.id() && visitor.is_recurring()));
    assert_eq!(fixture.audit.entry_count().await, 1);
}

#[tokio::test]
async fn blacklisting_is_a_security_audited_action() {
    let fixture = fixture();
    let registered = fixture.service.register(fixture.operator, sample_input()).await;
    let Ok(visitor) = registered else {
        unreachable!();
    };

    let blacklisted = fixture
        .service
        .blacklist(fixture.operator, visitor.id(), "tailgating incident")
        .await;
    assert!(blacklisted.is_ok_and(|visitor| visitor.is_blacklisted()));

    let entry = fixture.audit.last_entry().await;
    assert!(entry.is_some_and(|entry| {
        entry.action() == AuditAction::VisitorBlacklisted
            && entry.category() == AuditCategory::Security
    }));

    let cleared = fixture
        .service
        .clear_blacklist(fixture.operator, visitor.id())
        .await;
    assert!(cleared.is_ok_and(|visitor| !visitor.is_blacklisted()));
}

#[tokio::test]
async fn audit_write_failure_rolls_back_the_blacklist() {
    let fixture = fixture();
    let registered = fixture.service.register(fixture.operator, sample_input()).await;
    let Ok(visitor) = registered else {
        unreachable!();
    };

    fixture.audit.fail_appends.store(true, Ordering::SeqCst);
    let failed = fixture
        .service
        .blacklist(fixture.operator, visitor.id(), "unconfirmed report")
        .await;
    fixture.audit.fail_appends.store(false, Ordering::SeqCst);

    assert!(matches!(failed, Err(AppError::Internal(_))));
    let stored = fixture.service.get(visitor.id()).await;
    assert!(stored.is_ok_and(|visitor| !visitor.is_blacklisted()));
}

#[tokio::test]
async fn reads_redact_profiles_past_retention() {
    let fixture = fixture();
    let now = Utc::now();

    let expired = Visitor::register(
        "old@example.com",
        "Old Visitor",
        None,
        None,
        now - Duration::days(1),
        now - Duration::days(400),
    );
    let Ok(expired) = expired else {
        unreachable!();
    };
    let visitor_id = expired.id();
    fixture.visitors.seed(expired).await;

    let read = fixture.service.get(visitor_id).await;
    assert!(read.is_ok_and(|visitor| {
        visitor.email().as_str() != "old@example.com" && visitor.id() == visitor_id
    }));

    // The stored record keeps its data; redaction applies on read only.
    let stored = fixture.visitors.find(visitor_id).await;
    assert!(
        stored.is_ok_and(|stored| {
            stored.is_some_and(|visitor| visitor.email().as_str() == "old@example.com")
        })
    );
}
