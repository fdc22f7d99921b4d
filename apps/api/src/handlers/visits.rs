use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use gatehouse_application::PreRegisterInput;
use gatehouse_core::VisitId;

use crate::dto::{
    CancelVisitRequest, CheckInRequest, CheckOutRequest, EmergencyRequest, OccupancyResponse,
    PreRegisterVisitRequest, PreRegisteredVisitResponse, VisitResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn pre_register_visit_handler(
    State(state): State<AppState>,
    Json(payload): Json<PreRegisterVisitRequest>,
) -> ApiResult<(StatusCode, Json<PreRegisteredVisitResponse>)> {
    let outcome = state
        .visit_service
        .pre_register(
            payload.operator_id,
            PreRegisterInput {
                visitor_id: payload.visitor_id,
                host_id: payload.host_id,
                purpose: payload.purpose,
                scheduled_start: payload.scheduled_start,
                expected_duration_minutes: payload.expected_duration_minutes,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PreRegisteredVisitResponse::from(outcome)),
    ))
}

pub async fn get_visit_handler(
    State(state): State<AppState>,
    Path(visit_id): Path<VisitId>,
) -> ApiResult<Json<VisitResponse>> {
    let visit = state.visit_service.get(visit_id).await?;
    Ok(Json(VisitResponse::from(visit)))
}

pub async fn check_in_handler(
    State(state): State<AppState>,
    Path(visit_id): Path<VisitId>,
    Json(payload): Json<CheckInRequest>,
) -> ApiResult<Json<VisitResponse>> {
    let visit = state
        .visit_service
        .check_in(visit_id, payload.operator_id)
        .await?;
    Ok(Json(VisitResponse::from(visit)))
}

pub async fn check_out_handler(
    State(state): State<AppState>,
    Path(visit_id): Path<VisitId>,
    Json(payload): Json<CheckOutRequest>,
) -> ApiResult<Json<VisitResponse>> {
    let visit = state
        .visit_service
        .check_out(visit_id, payload.operator_id, payload.rating, payload.feedback)
        .await?;
    Ok(Json(VisitResponse::from(visit)))
}

pub async fn cancel_visit_handler(
    State(state): State<AppState>,
    Path(visit_id): Path<VisitId>,
    Json(payload): Json<CancelVisitRequest>,
) -> ApiResult<Json<VisitResponse>> {
    let visit = state
        .visit_service
        .cancel(visit_id, payload.operator_id, payload.reason)
        .await?;
    Ok(Json(VisitResponse::from(visit)))
}

pub async fn occupancy_handler(State(state): State<AppState>) -> Json<OccupancyResponse> {
    Json(OccupancyResponse::from(
        state.visit_service.occupancy().snapshot(),
    ))
}

pub async fn list_overdue_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<VisitResponse>>> {
    let visits = state
        .visit_service
        .list_overdue(Utc::now())
        .await?
        .into_iter()
        .map(VisitResponse::from)
        .collect();
    Ok(Json(visits))
}

pub async fn emergency_handler(
    State(state): State<AppState>,
    Json(payload): Json<EmergencyRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let evacuated = state
        .visit_service
        .declare_emergency(payload.operator_id, payload.message)
        .await?;
    Ok(Json(serde_json::json!({ "evacuated_visits": evacuated })))
}
