use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health::health_handler))
        .route(
            "/api/visits",
            post(handlers::visits::pre_register_visit_handler),
        )
        .route(
            "/api/visits/occupancy",
            get(handlers::visits::occupancy_handler),
        )
        .route(
            "/api/visits/overdue",
            get(handlers::visits::list_overdue_handler),
        )
        .route(
            "/api/visits/{visit_id}",
            get(handlers::visits::get_visit_handler)
                .delete(handlers::visits::cancel_visit_handler),
        )
        .route(
            "/api/visits/{visit_id}/checkin",
            post(handlers::visits::check_in_handler),
        )
        .route(
            "/api/visits/{visit_id}/checkout",
            post(handlers::visits::check_out_handler),
        )
        .route("/api/emergency", post(handlers::visits::emergency_handler))
        .route(
            "/api/visitors",
            get(handlers::visitors::list_visitors_handler)
                .post(handlers::visitors::register_visitor_handler),
        )
        .route(
            "/api/visitors/{visitor_id}",
            get(handlers::visitors::get_visitor_handler),
        )
        .route(
            "/api/visitors/{visitor_id}/blacklist",
            post(handlers::visitors::blacklist_visitor_handler)
                .delete(handlers::visitors::clear_blacklist_handler),
        )
        .route(
            "/api/visitors/{visitor_id}/consents",
            get(handlers::consents::consent_history_handler)
                .post(handlers::consents::grant_consent_handler),
        )
        .route(
            "/api/consents/{record_id}/withdraw",
            post(handlers::consents::withdraw_consent_handler),
        )
        .route(
            "/api/consents/{record_id}/renew",
            post(handlers::consents::renew_consent_handler),
        )
        .route(
            "/api/visitors/{visitor_id}/audit",
            get(handlers::audit::visitor_audit_handler),
        )
        .route("/api/audit/recent", get(handlers::audit::recent_audit_handler))
        .route("/api/ws", get(handlers::ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
