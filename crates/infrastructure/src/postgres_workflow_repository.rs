use async_trait::async_trait;
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use zeroline_application::{
    ClaimedJob, CreateRunInput, FinalizeRunInput, QueueStats, WorkerHeartbeatInput,
    WorkflowRepository, WorkflowRun,
};
use zeroline_core::{AppError, AppResult};
use zeroline_domain::{RunStep, WorkflowRunStatus};

mod queue;
mod runs;

/// PostgreSQL-backed workflow run repository and durable job queue.
#[derive(Clone)]
pub struct PostgresWorkflowRepository {
    pool: PgPool,
}

impl PostgresWorkflowRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct WorkflowRunRow {
    id: Uuid,
    device_id: Uuid,
    blueprint_id: Uuid,
    status: String,
    steps: Value,
    started_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    last_error: Option<String>,
}

#[derive(Debug, FromRow)]
struct ClaimedJobRow {
    job_id: Uuid,
    run_id: Uuid,
    dry_run: bool,
    lease_token: String,
}

#[derive(Debug, FromRow)]
struct QueueStatsRow {
    pending_jobs: i64,
    leased_jobs: i64,
    completed_jobs: i64,
    failed_jobs: i64,
    expired_leases: i64,
}

const RUN_COLUMNS: &str =
    "id, device_id, blueprint_id, status, steps, started_at, updated_at, last_error";

fn workflow_run_from_row(row: WorkflowRunRow) -> AppResult<WorkflowRun> {
    Ok(WorkflowRun {
        id: row.id,
        device_id: row.device_id,
        blueprint_id: row.blueprint_id,
        status: WorkflowRunStatus::parse(row.status.as_str())?,
        steps: run_steps_from_json(row.steps)?,
        started_at: row.started_at,
        updated_at: row.updated_at,
        last_error: row.last_error,
    })
}

fn run_steps_from_json(value: Value) -> AppResult<Vec<RunStep>> {
    serde_json::from_value(value).map_err(|error| {
        AppError::Internal(format!(
            "failed to deserialize workflow run steps: {error}"
        ))
    })
}

fn run_steps_to_json(steps: &[RunStep]) -> AppResult<Value> {
    serde_json::to_value(steps).map_err(|error| {
        AppError::Internal(format!("failed to serialize workflow run steps: {error}"))
    })
}

fn claimed_job_from_row(row: ClaimedJobRow) -> ClaimedJob {
    ClaimedJob {
        job_id: row.job_id,
        run_id: row.run_id,
        dry_run: row.dry_run,
        lease_token: row.lease_token,
    }
}

#[async_trait]
impl WorkflowRepository for PostgresWorkflowRepository {
    async fn create_run(&self, input: CreateRunInput) -> AppResult<WorkflowRun> {
        self.create_run_impl(input).await
    }

    async fn find_run(&self, run_id: Uuid) -> AppResult<Option<WorkflowRun>> {
        self.find_run_impl(run_id).await
    }

    async fn enqueue_job(&self, run_id: Uuid, dry_run: bool) -> AppResult<()> {
        self.enqueue_job_impl(run_id, dry_run).await
    }

    async fn claim_jobs(
        &self,
        worker_id: &str,
        limit: usize,
        lease_seconds: u32,
    ) -> AppResult<Vec<ClaimedJob>> {
        self.claim_jobs_impl(worker_id, limit, lease_seconds).await
    }

    async fn complete_job(
        &self,
        job_id: Uuid,
        worker_id: &str,
        lease_token: &str,
    ) -> AppResult<()> {
        self.complete_job_impl(job_id, worker_id, lease_token).await
    }

    async fn fail_job(
        &self,
        job_id: Uuid,
        worker_id: &str,
        lease_token: &str,
        error_message: &str,
    ) -> AppResult<()> {
        self.fail_job_impl(job_id, worker_id, lease_token, error_message)
            .await
    }

    async fn mark_run_provisioning(&self, run_id: Uuid) -> AppResult<()> {
        self.mark_run_provisioning_impl(run_id).await
    }

    async fn finalize_run(&self, input: FinalizeRunInput) -> AppResult<WorkflowRun> {
        self.finalize_run_impl(input).await
    }

    async fn upsert_worker_heartbeat(
        &self,
        worker_id: &str,
        input: WorkerHeartbeatInput,
    ) -> AppResult<()> {
        self.upsert_worker_heartbeat_impl(worker_id, input).await
    }

    async fn queue_stats(&self, active_window_seconds: u32) -> AppResult<QueueStats> {
        self.queue_stats_impl(active_window_seconds).await
    }
}
