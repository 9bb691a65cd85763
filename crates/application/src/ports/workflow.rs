use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use zeroline_core::AppResult;
use zeroline_domain::{DeviceStatus, RunStep, WorkflowRunStatus};

/// Persisted workflow run record.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowRun {
    /// Run identifier.
    pub id: Uuid,
    /// Device being provisioned.
    pub device_id: Uuid,
    /// Blueprint driving the run.
    pub blueprint_id: Uuid,
    /// Current state machine position.
    pub status: WorkflowRunStatus,
    /// Ordered step history.
    pub steps: Vec<RunStep>,
    /// Run creation timestamp.
    pub started_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Failure message when the run ended in `Failed`.
    pub last_error: Option<String>,
}

/// Run creation payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateRunInput {
    /// Device being provisioned.
    pub device_id: Uuid,
    /// Blueprint driving the run.
    pub blueprint_id: Uuid,
}

/// One claimed queued provisioning job handed to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedJob {
    /// Job identifier.
    pub job_id: Uuid,
    /// Workflow run to execute.
    pub run_id: Uuid,
    /// Whether the run plans without mutating device state.
    pub dry_run: bool,
    /// Lease token used for fencing-token completion checks.
    pub lease_token: String,
}

/// Terminal mutation applied to one run as a single transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizeRunInput {
    /// Run identifier.
    pub run_id: Uuid,
    /// Terminal status.
    pub status: WorkflowRunStatus,
    /// Full ordered step history to persist.
    pub steps: Vec<RunStep>,
    /// Failure message when the run failed.
    pub last_error: Option<String>,
    /// Status applied to the run's device in the same transaction,
    /// when the outcome changes device state.
    pub device_status: Option<DeviceStatus>,
}

/// Worker heartbeat payload persisted for queue observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerHeartbeatInput {
    /// Jobs claimed in the latest worker cycle.
    pub claimed_jobs: u32,
    /// Jobs completed in the latest worker cycle.
    pub executed_jobs: u32,
    /// Jobs that failed in the latest worker cycle.
    pub failed_jobs: u32,
}

/// Aggregated queue stats for operations visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    /// Jobs waiting to be claimed.
    pub pending_jobs: i64,
    /// Jobs currently leased by workers.
    pub leased_jobs: i64,
    /// Jobs completed successfully.
    pub completed_jobs: i64,
    /// Jobs marked failed at queue level.
    pub failed_jobs: i64,
    /// Leased jobs whose lease is expired.
    pub expired_leases: i64,
    /// Workers with a heartbeat inside the active window.
    pub active_workers: i64,
}

/// Repository port for workflow runs and the durable job queue.
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Creates a run in `queued` state and marks its device
    /// `provisioning` in the same transaction.
    async fn create_run(&self, input: CreateRunInput) -> AppResult<WorkflowRun>;

    /// Returns one run including its step history.
    async fn find_run(&self, run_id: Uuid) -> AppResult<Option<WorkflowRun>>;

    /// Enqueues one durable job for worker execution. Enqueueing the
    /// same run twice is a no-op.
    async fn enqueue_job(&self, run_id: Uuid, dry_run: bool) -> AppResult<()>;

    /// Claims queued jobs for one worker with a bounded lease. Jobs with
    /// an expired lease are reclaimable (at-least-once delivery).
    async fn claim_jobs(
        &self,
        worker_id: &str,
        limit: usize,
        lease_seconds: u32,
    ) -> AppResult<Vec<ClaimedJob>>;

    /// Marks one leased job as completed.
    async fn complete_job(
        &self,
        job_id: Uuid,
        worker_id: &str,
        lease_token: &str,
    ) -> AppResult<()>;

    /// Marks one leased job as failed with an error message.
    async fn fail_job(
        &self,
        job_id: Uuid,
        worker_id: &str,
        lease_token: &str,
        error_message: &str,
    ) -> AppResult<()>;

    /// Moves one queued run into `provisioning`.
    async fn mark_run_provisioning(&self, run_id: Uuid) -> AppResult<()>;

    /// Applies the terminal run mutation (status, steps, last_error,
    /// updated_at, optional device status) atomically.
    async fn finalize_run(&self, input: FinalizeRunInput) -> AppResult<WorkflowRun>;

    /// Updates one worker heartbeat snapshot.
    async fn upsert_worker_heartbeat(
        &self,
        worker_id: &str,
        input: WorkerHeartbeatInput,
    ) -> AppResult<()>;

    /// Returns aggregate queue and worker heartbeat stats.
    async fn queue_stats(&self, active_window_seconds: u32) -> AppResult<QueueStats>;
}
