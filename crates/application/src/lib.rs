//! Application services and ports.

#![forbid(unsafe_code)]

mod audit_ports;
mod audit_service;
mod consent_ports;
mod consent_service;
mod notification_ports;
mod notification_router;
mod occupancy;
mod sweep_scheduler;
mod visit_ports;
mod visit_service;
mod visitor_service;

#[cfg(test)]
mod test_support;

pub use audit_ports::AuditLogRepository;
pub use audit_service::{
    AuditService, DEFAULT_RETENTION_DAYS, RetentionPolicy, RetentionSweepReport,
};
pub use consent_ports::ConsentRepository;
pub use consent_service::{ConsentService, GrantConsentInput};
pub use notification_ports::{
    ConnectionHandle, ConnectionRegistry, EmailService, SmsService, StaffDirectory,
};
pub use notification_router::{DispatchReport, NotificationRouter, RouterConfig};
pub use occupancy::{OccupancySnapshot, OccupancyTracker};
pub use sweep_scheduler::{SweepConfig, SweepScheduler};
pub use visit_ports::{VisitRepository, VisitorRepository};
pub use visit_service::{
    PreRegisterInput, PreRegisteredVisit, SweepReport, VisitConfig, VisitService,
};
pub use visitor_service::{RegisterVisitorInput, VisitorService};
