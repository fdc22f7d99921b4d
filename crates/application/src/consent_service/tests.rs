use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::{Duration, Utc};
use gatehouse_domain::{AuditActor, ConsentMethod, ConsentStatus, ConsentType};

use crate::audit_service::{AuditService, RetentionPolicy};
use crate::consent_ports::ConsentRepository;
use crate::test_support::{sample_visitor, shared_fakes};
use crate::visit_ports::VisitorRepository;

use super::{ConsentService, GrantConsentInput};

fn grant_input(visitor_id: gatehouse_core::VisitorId) -> GrantConsentInput {
    GrantConsentInput {
        visitor_id,
        consent_type: ConsentType::DataProcessing,
        consent_text: "I agree to visit data processing".to_owned(),
        method: ConsentMethod::Kiosk,
        legal_basis: "consent".to_owned(),
        processing_purpose: "visitor management".to_owned(),
        expires_at: None,
    }
}

struct Fixture {
    service: ConsentService,
    visitors: Arc<crate::test_support::FakeVisitorRepository>,
    consents: Arc<crate::test_support::FakeConsentRepository>,
    audit_repository: Arc<crate::test_support::FakeAuditRepository>,
}

fn fixture() -> Fixture {
    let (visitors, _visits, consents, audit_repository) = shared_fakes();
    let audit = AuditService::new(audit_repository.clone(), RetentionPolicy::default());
    let service = ConsentService::new(consents.clone(), visitors.clone(), audit);

    Fixture {
        service,
        visitors,
        consents,
        audit_repository,
    }
}

#[tokio::test]
async fn grant_activates_record_and_syncs_visitor_flag() {
    let fixture = fixture();
    let visitor = sample_visitor();
    let visitor_id = visitor.id();
    fixture.visitors.seed(visitor).await;

    let record = fixture
        .service
        .grant(AuditActor::system(), grant_input(visitor_id))
        .await;

    assert!(record.as_ref().is_ok_and(|record| record.is_active()));
    assert!(record.is_ok_and(|record| record.version() == 1));

    let stored = fixture.visitors.find(visitor_id).await;
    assert!(
        stored.is_ok_and(|visitor| visitor
            .is_some_and(|visitor| visitor.consent_summary().has(ConsentType::DataProcessing)))
    );
    assert_eq!(fixture.audit_repository.entry_count().await, 1);
}

#[tokio::test]
async fn regrant_deactivates_prior_and_bumps_version() {
    let fixture = fixture();
    let visitor = sample_visitor();
    let visitor_id = visitor.id();
    fixture.visitors.seed(visitor).await;

    let first = fixture
        .service
        .grant(AuditActor::system(), grant_input(visitor_id))
        .await;
    let second = fixture
        .service
        .grant(AuditActor::system(), grant_input(visitor_id))
        .await;

    assert!(second.is_ok_and(|record| record.version() == 2 && record.is_active()));

    // The prior record remains queryable history, deactivated.
    let Ok(first) = first else { unreachable!() };
    let stored_first = fixture.consents.find(first.id()).await;
    assert!(stored_first.is_ok_and(|record| {
        record.is_some_and(|record| !record.is_active() && record.status() == ConsentStatus::Granted)
    }));

    let history = fixture.service.history(visitor_id).await;
    assert!(history.is_ok_and(|records| records.len() == 2));
}

#[tokio::test]
async fn withdraw_clears_flag_and_keeps_history() {
    let fixture = fixture();
    let visitor = sample_visitor();
    let visitor_id = visitor.id();
    fixture.visitors.seed(visitor).await;

    let record = fixture
        .service
        .grant(AuditActor::system(), grant_input(visitor_id))
        .await;
    let Ok(record) = record else { unreachable!() };

    let withdrawn = fixture
        .service
        .withdraw(AuditActor::system(), record.id(), "visitor request")
        .await;
    assert!(withdrawn.is_ok_and(|record| record.status() == ConsentStatus::Withdrawn));

    let valid = fixture
        .service
        .is_valid(visitor_id, ConsentType::DataProcessing)
        .await;
    assert!(matches!(valid, Ok(false)));

    let stored = fixture.visitors.find(visitor_id).await;
    assert!(stored.is_ok_and(|visitor| {
        visitor.is_some_and(|visitor| !visitor.consent_summary().has(ConsentType::DataProcessing))
    }));
}

#[tokio::test]
async fn renew_links_successor_and_deactivates_parent() {
    let fixture = fixture();
    let visitor = sample_visitor();
    let visitor_id = visitor.id();
    fixture.visitors.seed(visitor).await;

    let parent = fixture
        .service
        .grant(AuditActor::system(), grant_input(visitor_id))
        .await;
    let Ok(parent) = parent else { unreachable!() };

    let successor = fixture
        .service
        .renew(
            AuditActor::system(),
            parent.id(),
            "updated consent text",
            None,
            Some(Utc::now() + Duration::days(365)),
        )
        .await;

    assert!(successor.as_ref().is_ok_and(|record| {
        record.parent_consent_id() == Some(parent.id()) && record.version() == 2
    }));

    // Renewing the now-inactive parent again is a conflict.
    let again = fixture
        .service
        .renew(AuditActor::system(), parent.id(), "again", None, None)
        .await;
    assert!(again.is_err());

    let valid = fixture
        .service
        .is_valid(visitor_id, ConsentType::DataProcessing)
        .await;
    assert!(matches!(valid, Ok(true)));
}

#[tokio::test]
async fn expired_consent_is_not_valid() {
    let fixture = fixture();
    let visitor = sample_visitor();
    let visitor_id = visitor.id();
    fixture.visitors.seed(visitor).await;

    let mut input = grant_input(visitor_id);
    input.expires_at = Some(Utc::now() - Duration::minutes(1));
    let granted = fixture.service.grant(AuditActor::system(), input).await;
    assert!(granted.is_ok());

    let valid = fixture
        .service
        .is_valid(visitor_id, ConsentType::DataProcessing)
        .await;
    assert!(matches!(valid, Ok(false)));
}

#[tokio::test]
async fn grant_rolls_back_when_audit_write_fails() {
    let fixture = fixture();
    let visitor = sample_visitor();
    let visitor_id = visitor.id();
    fixture.visitors.seed(visitor).await;

    fixture
        .audit_repository
        .fail_appends
        .store(true, Ordering::SeqCst);

    let result = fixture
        .service
        .grant(AuditActor::system(), grant_input(visitor_id))
        .await;
    assert!(result.is_err());

    let valid = fixture
        .service
        .is_valid(visitor_id, ConsentType::DataProcessing)
        .await;
    assert!(matches!(valid, Ok(false)));

    let stored = fixture.visitors.find(visitor_id).await;
    assert!(stored.is_ok_and(|visitor| {
        visitor.is_some_and(|visitor| !visitor.consent_summary().has(ConsentType::DataProcessing))
    }));
}

#[tokio::test]
async fn withdraw_rolls_back_when_audit_write_fails() {
    let fixture = fixture();
    let visitor = sample_visitor();
    let visitor_id = visitor.id();
    fixture.visitors.seed(visitor).await;

    let record = fixture
        .service
        .grant(AuditActor::system(), grant_input(visitor_id))
        .await;
    let Ok(record) = record else { unreachable!() };

    fixture
        .audit_repository
        .fail_appends
        .store(true, Ordering::SeqCst);
    let result = fixture
        .service
        .withdraw(AuditActor::system(), record.id(), "visitor request")
        .await;
    fixture
        .audit_repository
        .fail_appends
        .store(false, Ordering::SeqCst);

    assert!(result.is_err());

    // The unrecorded withdrawal did not stick: the record is still active
    // and the visitor's denormalized flag is intact.
    let stored = fixture.consents.find(record.id()).await;
    assert!(stored.is_ok_and(|record| {
        record.is_some_and(|record| record.is_active() && record.status() == ConsentStatus::Granted)
    }));

    let valid = fixture
        .service
        .is_valid(visitor_id, ConsentType::DataProcessing)
        .await;
    assert!(matches!(valid, Ok(true)));
}

#[tokio::test]
async fn renew_rolls_back_when_audit_write_fails() {
    let fixture = fixture();
    let visitor = sample_visitor();
    let visitor_id = visitor.id();
    fixture.visitors.seed(visitor).await;

    let parent = fixture
        .service
        .grant(AuditActor::system(), grant_input(visitor_id))
        .await;
    let Ok(parent) = parent else { unreachable!() };

    fixture
        .audit_repository
        .fail_appends
        .store(true, Ordering::SeqCst);
    let result = fixture
        .service
        .renew(AuditActor::system(), parent.id(), "renewed text", None, None)
        .await;
    fixture
        .audit_repository
        .fail_appends
        .store(false, Ordering::SeqCst);

    assert!(result.is_err());

    // The parent stays the single active record of its type.
    let active = fixture
        .consents
        .find_active(visitor_id, ConsentType::DataProcessing)
        .await;
    assert!(active.is_ok_and(|record| record.is_some_and(|record| record.id() == parent.id())));

    let history = fixture.service.history(visitor_id).await;
    assert!(history.is_ok_and(|records| {
        records.iter().filter(|record| record.is_active()).count() == 1
    }));
}
