use gatehouse_application::{
    AuditService, ConsentService, NotificationRouter, VisitService, VisitorService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub visit_service: VisitService,
    pub visitor_service: VisitorService,
    pub consent_service: ConsentService,
    pub audit_service: AuditService,
    pub notification_router: NotificationRouter,
}
