use axum::Json;
use axum::extract::{Path, Query, State};
use gatehouse_core::VisitorId;
use serde::Deserialize;

use crate::dto::AuditEntryResponse;
use crate::error::ApiResult;
use crate::state::AppState;

const DEFAULT_RECENT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct RecentAuditQuery {
    pub limit: Option<usize>,
}

pub async fn recent_audit_handler(
    State(state): State<AppState>,
    Query(query): Query<RecentAuditQuery>,
) -> ApiResult<Json<Vec<AuditEntryResponse>>> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    let entries = state
        .audit_service
        .list_recent(limit)
        .await?
        .into_iter()
        .map(AuditEntryResponse::from)
        .collect();
    Ok(Json(entries))
}

pub async fn visitor_audit_handler(
    State(state): State<AppState>,
    Path(visitor_id): Path<VisitorId>,
) -> ApiResult<Json<Vec<AuditEntryResponse>>> {
    let entries = state
        .audit_service
        .entries_for_visitor(visitor_id)
        .await?
        .into_iter()
        .map(AuditEntryResponse::from)
        .collect();
    Ok(Json(entries))
}
