//! Gatehouse API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod dto;
mod error;
mod handlers;
mod state;

use std::sync::Arc;

use gatehouse_application::{
    AuditService, ConsentService, EmailService, NotificationRouter, OccupancyTracker,
    SweepScheduler, VisitService, VisitorService,
};
use gatehouse_core::AppError;
use gatehouse_infrastructure::{
    ConsoleEmailService, ConsoleSmsService, InMemoryAuditLogRepository, InMemoryConsentRepository,
    InMemoryStaffDirectory, InMemoryVisitRepository, InMemoryVisitorRepository,
    ShardedConnectionRegistry, SmtpEmailConfig, SmtpEmailService,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api_config::{ApiConfig, EmailProviderConfig};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let visitors = Arc::new(InMemoryVisitorRepository::new());
    let visits = Arc::new(InMemoryVisitRepository::new());
    let consents = Arc::new(InMemoryConsentRepository::new());
    let audit_log = Arc::new(InMemoryAuditLogRepository::new());
    let directory = Arc::new(InMemoryStaffDirectory::new());
    let registry = Arc::new(ShardedConnectionRegistry::new());

    let email_service: Arc<dyn EmailService> = match &config.email_provider {
        EmailProviderConfig::Console => Arc::new(ConsoleEmailService::new()),
        EmailProviderConfig::Smtp(smtp) => Arc::new(SmtpEmailService::new(SmtpEmailConfig {
            host: smtp.host.clone(),
            port: smtp.port,
            username: smtp.username.clone(),
            password: smtp.password.clone(),
            from_address: smtp.from_address.clone(),
        })),
    };

    let audit_service = AuditService::new(audit_log, config.retention.clone());
    let consent_service = ConsentService::new(consents, visitors.clone(), audit_service.clone());
    let notification_router = NotificationRouter::new(
        registry,
        email_service,
        Arc::new(ConsoleSmsService::new()),
        directory,
        audit_service.clone(),
        config.router.clone(),
    );

    let occupancy = Arc::new(OccupancyTracker::new(config.max_occupancy));
    occupancy.rebuild(visits.as_ref()).await?;

    let visit_service = VisitService::new(
        visits,
        visitors.clone(),
        consent_service.clone(),
        audit_service.clone(),
        occupancy,
        notification_router.clone(),
        config.visit.clone(),
    );
    let visitor_service = VisitorService::new(
        visitors,
        audit_service.clone(),
        config.visitor_retention_days,
    );

    let scheduler = SweepScheduler::start(
        visit_service.clone(),
        audit_service.clone(),
        config.sweeps.clone(),
    );

    let app_state = AppState {
        visit_service,
        visitor_service,
        consent_service,
        audit_service,
        notification_router,
    };

    let app = api_router::build_router(app_state);

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "gatehouse-api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))?;

    scheduler.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    // Shutdown on ctrl-c; failing to install the handler means running
    // until killed, which is acceptable for a dev server.
    let _ = tokio::signal::ctrl_c().await;
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
