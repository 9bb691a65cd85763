use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use uuid::Uuid;

use zeroline_application::StartRunInput;

use crate::dto::{QueueStatsResponse, StartWorkflowRequest, WorkflowRunResponse};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, serde::Deserialize)]
pub struct QueueStatsQueryRequest {
    pub active_window_seconds: Option<u32>,
}

pub async fn start_workflow_handler(
    State(state): State<AppState>,
    Path(device_id): Path<Uuid>,
    Json(payload): Json<StartWorkflowRequest>,
) -> ApiResult<(StatusCode, Json<WorkflowRunResponse>)> {
    let run = state
        .workflow_service
        .start_run(StartRunInput {
            device_id,
            blueprint_id: payload.blueprint_id,
            dry_run: payload.dry_run,
        })
        .await?;

    Ok((StatusCode::ACCEPTED, Json(WorkflowRunResponse::from(run))))
}

pub async fn get_workflow_handler(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> ApiResult<Json<WorkflowRunResponse>> {
    let run = state.workflow_service.get_run(run_id).await?;

    Ok(Json(WorkflowRunResponse::from(run)))
}

pub async fn queue_stats_handler(
    State(state): State<AppState>,
    Query(query): Query<QueueStatsQueryRequest>,
) -> ApiResult<Json<QueueStatsResponse>> {
    let stats = state
        .workflow_service
        .queue_stats(query.active_window_seconds.unwrap_or(60))
        .await?;

    Ok(Json(QueueStatsResponse::from(stats)))
}
