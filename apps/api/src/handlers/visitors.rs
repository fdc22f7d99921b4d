use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use gatehouse_application::RegisterVisitorInput;
use gatehouse_core::VisitorId;

use crate::dto::{
    BlacklistRequest, ClearBlacklistRequest, RegisterVisitorRequest, VisitorResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn register_visitor_handler(
    State(state): State<AppState>,
    Json(payload): Json<RegisterVisitorRequest>,
) -> ApiResult<(StatusCode, Json<VisitorResponse>)> {
    let visitor = state
        .visitor_service
        .register(
            payload.operator_id,
            RegisterVisitorInput {
                email: payload.email,
                full_name: payload.full_name,
                company: payload.company,
                phone: payload.phone,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(VisitorResponse::from(visitor))))
}

pub async fn get_visitor_handler(
    State(state): State<AppState>,
    Path(visitor_id): Path<VisitorId>,
) -> ApiResult<Json<VisitorResponse>> {
    let visitor = state.visitor_service.get(visitor_id).await?;
    Ok(Json(VisitorResponse::from(visitor)))
}

pub async fn list_visitors_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<VisitorResponse>>> {
    let visitors = state
        .visitor_service
        .list()
        .await?
        .into_iter()
        .map(VisitorResponse::from)
        .collect();
    Ok(Json(visitors))
}

pub async fn blacklist_visitor_handler(
    State(state): State<AppState>,
    Path(visitor_id): Path<VisitorId>,
    Json(payload): Json<BlacklistRequest>,
) -> ApiResult<Json<VisitorResponse>> {
    let visitor = state
        .visitor_service
        .blacklist(payload.operator_id, visitor_id, payload.reason)
        .await?;
    Ok(Json(VisitorResponse::from(visitor)))
}

pub async fn clear_blacklist_handler(
    State(state): State<AppState>,
    Path(visitor_id): Path<VisitorId>,
    Json(payload): Json<ClearBlacklistRequest>,
) -> ApiResult<Json<VisitorResponse>> {
    let visitor = state
        .visitor_service
        .clear_blacklist(payload.operator_id, visitor_id)
        .await?;
    Ok(Json(VisitorResponse::from(visitor)))
}
