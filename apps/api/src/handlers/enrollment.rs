use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use zeroline_application::{IssueTokenInput, RegisterDeviceInput};

use crate::dto::{
    DeviceResponse, IssueTokenRequest, IssuedTokenResponse, RegisterDeviceRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn issue_token_handler(
    State(state): State<AppState>,
    Json(payload): Json<IssueTokenRequest>,
) -> ApiResult<(StatusCode, Json<IssuedTokenResponse>)> {
    let issued = state
        .enrollment_service
        .issue_token(IssueTokenInput {
            ttl_minutes: payload.ttl_minutes,
            max_uses: payload.max_uses,
            claims: payload.claims,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(IssuedTokenResponse::from(issued))))
}

pub async fn register_device_handler(
    State(state): State<AppState>,
    Json(payload): Json<RegisterDeviceRequest>,
) -> ApiResult<(StatusCode, Json<DeviceResponse>)> {
    let device = state
        .enrollment_service
        .redeem_token(RegisterDeviceInput {
            token: payload.token,
            hostname: payload.hostname,
            os_type: payload.os_type,
            arch: payload.arch,
            facts: payload.facts,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(DeviceResponse::from(device))))
}
