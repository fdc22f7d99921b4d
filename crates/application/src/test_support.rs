//! Fake port implementations shared by the service test modules.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gatehouse_core::{
    AppError, AppResult, AuditEntryId, ConnectionId, ConsentRecordId, UserId, VisitId, VisitorId,
};
use gatehouse_domain::{
    AuditLogEntry, ConsentRecord, ConsentType, NotificationPreferences, StaffRole, Visit,
    VisitStatus, Visitor,
};
use tokio::sync::Mutex;

use crate::audit_ports::AuditLogRepository;
use crate::consent_ports::ConsentRepository;
use crate::notification_ports::{
    ConnectionHandle, ConnectionRegistry, EmailService, SmsService, StaffDirectory,
};
use crate::visit_ports::{VisitRepository, VisitorRepository};

#[derive(Default)]
pub struct FakeAuditRepository {
    pub entries: Mutex<Vec<AuditLogEntry>>,
    pub fail_appends: AtomicBool,
}

impl FakeAuditRepository {
    pub async fn entry_count(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn last_entry(&self) -> Option<AuditLogEntry> {
        self.entries.lock().await.last().cloned()
    }
}

#[async_trait]
impl AuditLogRepository for FakeAuditRepository {
    async fn append(&self, entry: AuditLogEntry) -> AppResult<()> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(AppError::Internal("ledger unavailable".to_owned()));
        }

        self.entries.lock().await.push(entry);
        Ok(())
    }

    async fn find(&self, entry_id: AuditEntryId) -> AppResult<Option<AuditLogEntry>> {
        Ok(self
            .entries
            .lock()
            .await
            .iter()
            .find(|entry| entry.id() == entry_id)
            .cloned())
    }

    async fn update(&self, entry: AuditLogEntry) -> AppResult<()> {
        let mut entries = self.entries.lock().await;
        let Some(slot) = entries.iter_mut().find(|stored| stored.id() == entry.id()) else {
            return Err(AppError::NotFound(format!("audit entry '{}'", entry.id())));
        };

        *slot = entry;
        Ok(())
    }

    async fn delete(&self, entry_id: AuditEntryId) -> AppResult<()> {
        self.entries
            .lock()
            .await
            .retain(|entry| entry.id() != entry_id);
        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> AppResult<Vec<AuditLogEntry>> {
        let entries = self.entries.lock().await;
        Ok(entries.iter().rev().take(limit).cloned().collect())
    }

    async fn list_for_visitor(&self, visitor_id: VisitorId) -> AppResult<Vec<AuditLogEntry>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .iter()
            .rev()
            .filter(|entry| entry.visitor_id() == Some(visitor_id))
            .cloned()
            .collect())
    }

    async fn list_expired(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<AuditLogEntry>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .iter()
            .filter(|entry| !entry.is_anonymized() && entry.is_past_retention(cutoff))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct FakeVisitorRepository {
    pub visitors: Mutex<HashMap<VisitorId, Visitor>>,
}

impl FakeVisitorRepository {
    pub async fn seed(&self, visitor: Visitor) {
        self.visitors.lock().await.insert(visitor.id(), visitor);
    }
}

#[async_trait]
impl VisitorRepository for FakeVisitorRepository {
    async fn insert(&self, visitor: Visitor) -> AppResult<()> {
        self.visitors.lock().await.insert(visitor.id(), visitor);
        Ok(())
    }

    async fn find(&self, visitor_id: VisitorId) -> AppResult<Option<Visitor>> {
        Ok(self.visitors.lock().await.get(&visitor_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Visitor>> {
        Ok(self
            .visitors
            .lock()
            .await
            .values()
            .find(|visitor| visitor.email().as_str() == email)
            .cloned())
    }

    async fn update(&self, visitor: Visitor) -> AppResult<()> {
        let mut visitors = self.visitors.lock().await;
        if !visitors.contains_key(&visitor.id()) {
            return Err(AppError::NotFound(format!("visitor '{}'", visitor.id())));
        }

        visitors.insert(visitor.id(), visitor);
        Ok(())
    }

    async fn list(&self) -> AppResult<Vec<Visitor>> {
        Ok(self.visitors.lock().await.values().cloned().collect())
    }
}

#[derive(Default)]
pub struct FakeVisitRepository {
    pub visits: Mutex<HashMap<VisitId, Visit>>,
}

#[async_trait]
impl VisitRepository for FakeVisitRepository {
    async fn insert(&self, visit: Visit) -> AppResult<()> {
        self.visits.lock().await.insert(visit.id(), visit);
        Ok(())
    }

    async fn find(&self, visit_id: VisitId) -> AppResult<Option<Visit>> {
        Ok(self.visits.lock().await.get(&visit_id).cloned())
    }

    async fn update(&self, visit: Visit) -> AppResult<()> {
        let mut visits = self.visits.lock().await;
        if !visits.contains_key(&visit.id()) {
            return Err(AppError::NotFound(format!("visit '{}'", visit.id())));
        }

        visits.insert(visit.id(), visit);
        Ok(())
    }

    async fn remove(&self, visit_id: VisitId) -> AppResult<()> {
        self.visits.lock().await.remove(&visit_id);
        Ok(())
    }

    async fn list_by_status(&self, status: VisitStatus) -> AppResult<Vec<Visit>> {
        Ok(self
            .visits
            .lock()
            .await
            .values()
            .filter(|visit| visit.status() == status)
            .cloned()
            .collect())
    }

    async fn find_active_for_visitor(&self, visitor_id: VisitorId) -> AppResult<Option<Visit>> {
        Ok(self
            .visits
            .lock()
            .await
            .values()
            .find(|visit| {
                visit.visitor_id() == visitor_id && visit.status() == VisitStatus::CheckedIn
            })
            .cloned())
    }

    async fn count_by_status(&self, status: VisitStatus) -> AppResult<usize> {
        Ok(self
            .visits
            .lock()
            .await
            .values()
            .filter(|visit| visit.status() == status)
            .count())
    }
}

#[derive(Default)]
pub struct FakeConsentRepository {
    pub records: Mutex<HashMap<ConsentRecordId, ConsentRecord>>,
}

#[async_trait]
impl ConsentRepository for FakeConsentRepository {
    async fn insert(&self, record: ConsentRecord) -> AppResult<()> {
        self.records.lock().await.insert(record.id(), record);
        Ok(())
    }

    async fn find(&self, record_id: ConsentRecordId) -> AppResult<Option<ConsentRecord>> {
        Ok(self.records.lock().await.get(&record_id).cloned())
    }

    async fn update(&self, record: ConsentRecord) -> AppResult<()> {
        let mut records = self.records.lock().await;
        if !records.contains_key(&record.id()) {
            return Err(AppError::NotFound(format!(
                "consent record '{}'",
                record.id()
            )));
        }

        records.insert(record.id(), record);
        Ok(())
    }

    async fn find_active(
        &self,
        visitor_id: VisitorId,
        consent_type: ConsentType,
    ) -> AppResult<Option<ConsentRecord>> {
        Ok(self
            .records
            .lock()
            .await
            .values()
            .find(|record| {
                record.visitor_id() == visitor_id
                    && record.consent_type() == consent_type
                    && record.is_active()
            })
            .cloned())
    }

    async fn list_for_visitor(&self, visitor_id: VisitorId) -> AppResult<Vec<ConsentRecord>> {
        let records = self.records.lock().await;
        let mut history: Vec<ConsentRecord> = records
            .values()
            .filter(|record| record.visitor_id() == visitor_id)
            .cloned()
            .collect();
        history.sort_by_key(|record| std::cmp::Reverse(record.granted_at()));
        Ok(history)
    }
}

/// Single-lock registry; test-only, the sharded one lives in infrastructure.
#[derive(Default)]
pub struct FakeConnectionRegistry {
    pub connections: Mutex<HashMap<ConnectionId, ConnectionHandle>>,
}

#[async_trait]
impl ConnectionRegistry for FakeConnectionRegistry {
    async fn register(&self, handle: ConnectionHandle) -> AppResult<()> {
        self.connections
            .lock()
            .await
            .insert(handle.connection_id, handle);
        Ok(())
    }

    async fn unregister(&self, connection_id: ConnectionId) -> AppResult<Option<UserId>> {
        Ok(self
            .connections
            .lock()
            .await
            .remove(&connection_id)
            .map(|handle| handle.user_id))
    }

    async fn connections_for_user(&self, user_id: UserId) -> AppResult<Vec<ConnectionHandle>> {
        Ok(self
            .connections
            .lock()
            .await
            .values()
            .filter(|handle| handle.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn connections_for_role(&self, role: StaffRole) -> AppResult<Vec<ConnectionHandle>> {
        Ok(self
            .connections
            .lock()
            .await
            .values()
            .filter(|handle| handle.role == role)
            .cloned()
            .collect())
    }

    async fn connections_for_room(&self, room: &str) -> AppResult<Vec<ConnectionHandle>> {
        Ok(self
            .connections
            .lock()
            .await
            .values()
            .filter(|handle| handle.in_room(room))
            .cloned()
            .collect())
    }

    async fn all_connections(&self) -> AppResult<Vec<ConnectionHandle>> {
        Ok(self.connections.lock().await.values().cloned().collect())
    }

    async fn is_online(&self, user_id: UserId) -> AppResult<bool> {
        Ok(self
            .connections
            .lock()
            .await
            .values()
            .any(|handle| handle.user_id == user_id))
    }
}

#[derive(Default)]
pub struct FakeEmailService {
    pub sent: Mutex<Vec<(String, String)>>,
    pub failures_remaining: AtomicUsize,
}

#[async_trait]
impl EmailService for FakeEmailService {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        _text_body: &str,
        _html_body: Option<&str>,
    ) -> AppResult<()> {
        if self.failures_remaining.load(Ordering::SeqCst) > 0 {
            self.failures_remaining.fetch_sub(1, Ordering::SeqCst);
            return Err(AppError::Internal("email provider error".to_owned()));
        }

        self.sent
            .lock()
            .await
            .push((to.to_owned(), subject.to_owned()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSmsService {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail_all: AtomicBool,
}

#[async_trait]
impl SmsService for FakeSmsService {
    async fn send_sms(&self, to: &str, body: &str) -> AppResult<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(AppError::Internal("sms provider error".to_owned()));
        }

        self.sent
            .lock()
            .await
            .push((to.to_owned(), body.to_owned()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeStaffDirectory {
    pub roles: Mutex<HashMap<StaffRole, Vec<UserId>>>,
    pub preferences: Mutex<HashMap<UserId, NotificationPreferences>>,
}

impl FakeStaffDirectory {
    pub async fn seed_member(&self, role: StaffRole, user_id: UserId) {
        self.roles.lock().await.entry(role).or_default().push(user_id);
    }

    pub async fn seed_preferences(&self, user_id: UserId, preferences: NotificationPreferences) {
        self.preferences.lock().await.insert(user_id, preferences);
    }
}

#[async_trait]
impl StaffDirectory for FakeStaffDirectory {
    async fn members_of_role(&self, role: StaffRole) -> AppResult<Vec<UserId>> {
        Ok(self
            .roles
            .lock()
            .await
            .get(&role)
            .cloned()
            .unwrap_or_default())
    }

    async fn preferences(&self, user_id: UserId) -> AppResult<Option<NotificationPreferences>> {
        Ok(self.preferences.lock().await.get(&user_id).cloned())
    }
}

/// A standard visitor with a one-year retention window.
pub fn sample_visitor() -> Visitor {
    Visitor::register(
        "grace@example.com",
        "Grace Hopper",
        Some("Eckert-Mauchly".to_owned()),
        Some("+1 617 555 0100".to_owned()),
        Utc::now() + chrono::Duration::days(365),
        Utc::now(),
    )
    .unwrap_or_else(|_| unreachable!())
}

pub type SharedFakes = (
    Arc<FakeVisitorRepository>,
    Arc<FakeVisitRepository>,
    Arc<FakeConsentRepository>,
    Arc<FakeAuditRepository>,
);

/// Bundles the repositories most service tests need.
#[must_use]
pub fn shared_fakes() -> SharedFakes {
    (
        Arc::new(FakeVisitorRepository::default()),
        Arc::new(FakeVisitRepository::default()),
        Arc::new(FakeConsentRepository::default()),
        Arc::new(FakeAuditRepository::default()),
    )
}
