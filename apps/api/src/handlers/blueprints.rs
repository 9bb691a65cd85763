use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::dto::{BlueprintResponse, SaveBlueprintRequest};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn create_blueprint_handler(
    State(state): State<AppState>,
    Json(payload): Json<SaveBlueprintRequest>,
) -> ApiResult<(StatusCode, Json<BlueprintResponse>)> {
    let blueprint = state
        .blueprint_service
        .create_blueprint(payload.into())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BlueprintResponse::from(blueprint)),
    ))
}

pub async fn list_blueprints_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<BlueprintResponse>>> {
    let blueprints = state
        .blueprint_service
        .list_blueprints()
        .await?
        .into_iter()
        .map(BlueprintResponse::from)
        .collect();

    Ok(Json(blueprints))
}

pub async fn get_blueprint_handler(
    State(state): State<AppState>,
    Path(blueprint_id): Path<Uuid>,
) -> ApiResult<Json<BlueprintResponse>> {
    let blueprint = state.blueprint_service.get_blueprint(blueprint_id).await?;

    Ok(Json(BlueprintResponse::from(blueprint)))
}

pub async fn update_blueprint_handler(
    State(state): State<AppState>,
    Path(blueprint_id): Path<Uuid>,
    Json(payload): Json<SaveBlueprintRequest>,
) -> ApiResult<Json<BlueprintResponse>> {
    let blueprint = state
        .blueprint_service
        .update_blueprint(blueprint_id, payload.into())
        .await?;

    Ok(Json(BlueprintResponse::from(blueprint)))
}

pub async fn delete_blueprint_handler(
    State(state): State<AppState>,
    Path(blueprint_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .blueprint_service
        .delete_blueprint(blueprint_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
