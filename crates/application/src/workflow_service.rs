use std::sync::Arc;

use uuid::Uuid;
use zeroline_core::{AppError, AppResult};
use zeroline_domain::{AuditAction, DeviceStatus, RunStep, WorkflowRunStatus, planner};

use crate::ports::{
    AuditEvent, AuditRepository, BlueprintRepository, ClaimedJob, CreateRunInput, DeviceRepository,
    FinalizeRunInput, QueueStats, QueueStatsCache, WorkerHeartbeatInput, WorkflowRepository,
    WorkflowRun,
};

mod execution;
mod queue;

/// Request to start one workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartRunInput {
    /// Device to provision.
    pub device_id: Uuid,
    /// Blueprint to apply.
    pub blueprint_id: Uuid,
    /// Plan only; device state is never mutated by a dry run.
    pub dry_run: bool,
}

/// Workflow run state machine owner: queues runs on the request path and
/// executes claimed runs on the worker path.
#[derive(Clone)]
pub struct WorkflowService {
    repository: Arc<dyn WorkflowRepository>,
    device_repository: Arc<dyn DeviceRepository>,
    blueprint_repository: Arc<dyn BlueprintRepository>,
    audit_repository: Arc<dyn AuditRepository>,
    queue_stats_cache: Option<Arc<dyn QueueStatsCache>>,
    queue_stats_cache_ttl_seconds: u32,
}

impl WorkflowService {
    /// Creates a workflow service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn WorkflowRepository>,
        device_repository: Arc<dyn DeviceRepository>,
        blueprint_repository: Arc<dyn BlueprintRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            repository,
            device_repository,
            blueprint_repository,
            audit_repository,
            queue_stats_cache: None,
            queue_stats_cache_ttl_seconds: 0,
        }
    }

    /// Adds optional queue stats caching behavior.
    #[must_use]
    pub fn with_queue_stats_cache(
        mut self,
        queue_stats_cache: Arc<dyn QueueStatsCache>,
        ttl_seconds: u32,
    ) -> Self {
        self.queue_stats_cache = Some(queue_stats_cache);
        self.queue_stats_cache_ttl_seconds = ttl_seconds;
        self
    }

    /// Queues one workflow run for a device against a blueprint.
    ///
    /// Fails with a not-found error before any mutation when either
    /// referenced entity is absent. On success the run is persisted in
    /// `queued`, the device moves to `provisioning`, and a durable job
    /// is handed to the execution boundary.
    pub async fn start_run(&self, input: StartRunInput) -> AppResult<WorkflowRun> {
        let device = self
            .device_repository
            .find_device(input.device_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("device '{}' not found", input.device_id))
            })?;

        let blueprint = self
            .blueprint_repository
            .find_blueprint(input.blueprint_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("blueprint '{}' not found", input.blueprint_id))
            })?;

        let run = self
            .repository
            .create_run(CreateRunInput {
                device_id: device.id,
                blueprint_id: blueprint.id,
            })
            .await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor: "api".to_owned(),
                action: AuditAction::WorkflowRunStarted,
                target_type: "workflow_run".to_owned(),
                target_id: run.id.to_string(),
                message: format!("device={} blueprint={}", device.hostname, blueprint.name),
            })
            .await?;

        self.repository.enqueue_job(run.id, input.dry_run).await?;

        Ok(run)
    }

    /// Returns one run including its ordered step history.
    pub async fn get_run(&self, run_id: Uuid) -> AppResult<WorkflowRun> {
        self.repository
            .find_run(run_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("workflow run '{run_id}' not found")))
    }
}

#[cfg(test)]
mod tests;
