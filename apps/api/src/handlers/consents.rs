use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use gatehouse_application::GrantConsentInput;
use gatehouse_core::{ConsentRecordId, VisitorId};
use gatehouse_domain::{AuditActor, ConsentMethod, ConsentType};

use crate::dto::{ConsentRecordResponse, GrantConsentRequest, RenewConsentRequest, WithdrawConsentRequest};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn grant_consent_handler(
    State(state): State<AppState>,
    Path(visitor_id): Path<VisitorId>,
    Json(payload): Json<GrantConsentRequest>,
) -> ApiResult<(StatusCode, Json<ConsentRecordResponse>)> {
    let consent_type = ConsentType::from_str(&payload.consent_type)?;
    let method = ConsentMethod::from_str(&payload.method)?;

    let record = state
        .consent_service
        .grant(
            AuditActor::operator(payload.operator_id),
            GrantConsentInput {
                visitor_id,
                consent_type,
                consent_text: payload.consent_text,
                method,
                legal_basis: payload.legal_basis,
                processing_purpose: payload.processing_purpose,
                expires_at: payload.expires_at,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ConsentRecordResponse::from(record))))
}

pub async fn withdraw_consent_handler(
    State(state): State<AppState>,
    Path(record_id): Path<ConsentRecordId>,
    Json(payload): Json<WithdrawConsentRequest>,
) -> ApiResult<Json<ConsentRecordResponse>> {
    let record = state
        .consent_service
        .withdraw(
            AuditActor::operator(payload.operator_id),
            record_id,
            payload.reason,
        )
        .await?;
    Ok(Json(ConsentRecordResponse::from(record)))
}

pub async fn renew_consent_handler(
    State(state): State<AppState>,
    Path(record_id): Path<ConsentRecordId>,
    Json(payload): Json<RenewConsentRequest>,
) -> ApiResult<Json<ConsentRecordResponse>> {
    let record = state
        .consent_service
        .renew(
            AuditActor::operator(payload.operator_id),
            record_id,
            payload.consent_text,
            payload.version,
            payload.expires_at,
        )
        .await?;
    Ok(Json(ConsentRecordResponse::from(record)))
}

pub async fn consent_history_handler(
    State(state): State<AppState>,
    Path(visitor_id): Path<VisitorId>,
) -> ApiResult<Json<Vec<ConsentRecordResponse>>> {
    let history = state
        .consent_service
        .history(visitor_id)
        .await?
        .into_iter()
        .map(ConsentRecordResponse::from)
        .collect();
    Ok(Json(history))
}
