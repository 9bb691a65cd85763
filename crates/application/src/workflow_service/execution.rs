use tracing::warn;

use super::*;

impl WorkflowService {
    /// Executes one claimed queued job end-to-end and finalizes queue
    /// state.
    ///
    /// Returns `None` when the referenced run row no longer exists: the
    /// job is completed and the message dropped with a warning, since
    /// there is nothing left to record a failure against.
    pub async fn execute_claimed_job(
        &self,
        worker_id: &str,
        job: ClaimedJob,
    ) -> AppResult<Option<WorkflowRun>> {
        if worker_id.trim().is_empty() {
            return Err(AppError::Validation(
                "worker_id must not be empty".to_owned(),
            ));
        }

        if job.lease_token.trim().is_empty() {
            return Err(AppError::Validation(
                "claimed job lease_token must not be empty".to_owned(),
            ));
        }

        let run_result = self
            .process_queued_run(worker_id, job.run_id, job.dry_run)
            .await;

        match run_result {
            Ok(run) => {
                self.repository
                    .complete_job(job.job_id, worker_id, job.lease_token.as_str())
                    .await?;
                Ok(run)
            }
            Err(error) => {
                let error_message = error.to_string();
                if let Err(mark_error) = self
                    .repository
                    .fail_job(
                        job.job_id,
                        worker_id,
                        job.lease_token.as_str(),
                        error_message.as_str(),
                    )
                    .await
                {
                    return Err(AppError::Internal(format!(
                        "failed to execute provisioning job '{}': {error}; additionally failed to mark queue job failed: {mark_error}",
                        job.job_id
                    )));
                }

                Err(error)
            }
        }
    }

    async fn process_queued_run(
        &self,
        worker_id: &str,
        run_id: Uuid,
        dry_run: bool,
    ) -> AppResult<Option<WorkflowRun>> {
        let Some(run) = self.repository.find_run(run_id).await? else {
            warn!(%run_id, "claimed provisioning job references a missing run");
            return Ok(None);
        };

        // At-least-once delivery: a redelivered terminal run must not
        // re-execute provisioning actions.
        if run.status.is_terminal() {
            return Ok(Some(run));
        }

        self.repository.mark_run_provisioning(run_id).await?;

        let device = self.device_repository.find_device(run.device_id).await?;
        let blueprint = self
            .blueprint_repository
            .find_blueprint(run.blueprint_id)
            .await?;

        let (Some(device), Some(blueprint)) = (device, blueprint) else {
            let message = "missing device or blueprint";
            let finalized = self
                .repository
                .finalize_run(FinalizeRunInput {
                    run_id,
                    status: WorkflowRunStatus::Failed,
                    steps: vec![RunStep::failed("error", message)],
                    last_error: Some(message.to_owned()),
                    device_status: None,
                })
                .await?;

            self.append_run_audit(worker_id, &finalized).await?;
            return Ok(Some(finalized));
        };

        let mut steps = vec![RunStep::ok("fetch_blueprint", Vec::new())];

        let (status, last_error, device_status) = if dry_run {
            steps.push(RunStep::ok("plan", vec!["dry-run no-op".to_owned()]));
            (WorkflowRunStatus::Completed, None, None)
        } else {
            let plan = planner::plan(device.os_type.as_str(), &blueprint, &device.facts);
            if plan.ok {
                steps.push(RunStep::ok("apply", plan.actions));
                (
                    WorkflowRunStatus::Completed,
                    None,
                    Some(DeviceStatus::Provisioned),
                )
            } else {
                let message = plan
                    .error
                    .unwrap_or_else(|| "provisioning plan failed".to_owned());
                steps.push(RunStep::failed("error", message.clone()));
                (
                    WorkflowRunStatus::Failed,
                    Some(message),
                    Some(DeviceStatus::Error),
                )
            }
        };

        let finalized = self
            .repository
            .finalize_run(FinalizeRunInput {
                run_id,
                status,
                steps,
                last_error,
                device_status,
            })
            .await?;

        self.append_run_audit(worker_id, &finalized).await?;
        Ok(Some(finalized))
    }

    async fn append_run_audit(&self, worker_id: &str, run: &WorkflowRun) -> AppResult<()> {
        self.audit_repository
            .append_event(AuditEvent {
                actor: format!("worker:{worker_id}"),
                action: AuditAction::WorkflowRunFinished,
                target_type: "workflow_run".to_owned(),
                target_id: run.id.to_string(),
                message: format!("status={}", run.status.as_str()),
            })
            .await
    }
}
