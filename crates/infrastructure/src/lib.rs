//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod console_email_service;
mod console_sms_service;
mod in_memory_audit_log_repository;
mod in_memory_consent_repository;
mod in_memory_staff_directory;
mod in_memory_visit_repository;
mod in_memory_visitor_repository;
mod sharded_connection_registry;
mod smtp_email_service;

pub use console_email_service::ConsoleEmailService;
pub use console_sms_service::ConsoleSmsService;
pub use in_memory_audit_log_repository::InMemoryAuditLogRepository;
pub use in_memory_consent_repository::InMemoryConsentRepository;
pub use in_memory_staff_directory::InMemoryStaffDirectory;
pub use in_memory_visit_repository::InMemoryVisitRepository;
pub use in_memory_visitor_repository::InMemoryVisitorRepository;
pub use sharded_connection_registry::ShardedConnectionRegistry;
pub use smtp_email_service::{SmtpEmailConfig, SmtpEmailService};
