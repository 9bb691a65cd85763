use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use crate::dto::DeviceResponse;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_devices_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<DeviceResponse>>> {
    let devices = state
        .device_service
        .list_devices()
        .await?
        .into_iter()
        .map(DeviceResponse::from)
        .collect();

    Ok(Json(devices))
}

pub async fn get_device_handler(
    State(state): State<AppState>,
    Path(device_id): Path<Uuid>,
) -> ApiResult<Json<DeviceResponse>> {
    let device = state.device_service.get_device(device_id).await?;

    Ok(Json(DeviceResponse::from(device)))
}
