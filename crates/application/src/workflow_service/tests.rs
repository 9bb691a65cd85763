use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;

use zeroline_core::{AppError, AppResult};
use zeroline_domain::{
    Blueprint, BlueprintInput, Device, DeviceStatus, PackageManifest, SecurityManifest,
    StepStatus, UserManifest, WorkflowRunStatus,
};

use crate::ports::{
    AuditEvent, AuditRepository, BlueprintRepository, ClaimedJob, CreateRunInput, DeviceRepository,
    FinalizeRunInput, QueueStats, WorkerHeartbeatInput, WorkflowRepository, WorkflowRun,
};

use super::{StartRunInput, WorkflowService};

#[derive(Default)]
struct FakeAuditRepository {
    events: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

#[derive(Default)]
struct FakeDeviceRepository {
    devices: Mutex<HashMap<Uuid, Device>>,
}

#[async_trait]
impl DeviceRepository for FakeDeviceRepository {
    async fn list_devices(&self) -> AppResult<Vec<Device>> {
        Ok(self.devices.lock().await.values().cloned().collect())
    }

    async fn find_device(&self, device_id: Uuid) -> AppResult<Option<Device>> {
        Ok(self.devices.lock().await.get(&device_id).cloned())
    }
}

#[derive(Default)]
struct FakeBlueprintRepository {
    blueprints: Mutex<HashMap<Uuid, Blueprint>>,
}

#[async_trait]
impl BlueprintRepository for FakeBlueprintRepository {
    async fn create_blueprint(&self, blueprint: Blueprint) -> AppResult<Blueprint> {
        self.blueprints
            .lock()
            .await
            .insert(blueprint.id, blueprint.clone());
        Ok(blueprint)
    }

    async fn list_blueprints(&self) -> AppResult<Vec<Blueprint>> {
        Ok(self.blueprints.lock().await.values().cloned().collect())
    }

    async fn find_blueprint(&self, blueprint_id: Uuid) -> AppResult<Option<Blueprint>> {
        Ok(self.blueprints.lock().await.get(&blueprint_id).cloned())
    }

    async fn update_blueprint(&self, blueprint: Blueprint) -> AppResult<Option<Blueprint>> {
        let mut blueprints = self.blueprints.lock().await;
        if !blueprints.contains_key(&blueprint.id) {
            return Ok(None);
        }

        blueprints.insert(blueprint.id, blueprint.clone());
        Ok(Some(blueprint))
    }

    async fn delete_blueprint(&self, blueprint_id: Uuid) -> AppResult<bool> {
        Ok(self.blueprints.lock().await.remove(&blueprint_id).is_some())
    }
}

#[derive(Debug, Clone)]
struct FakeJobRow {
    job_id: Uuid,
    run_id: Uuid,
    dry_run: bool,
    status: &'static str,
    leased_by: Option<String>,
    lease_token: Option<String>,
}

struct FakeWorkflowRepository {
    device_repository: Arc<FakeDeviceRepository>,
    runs: Mutex<HashMap<Uuid, WorkflowRun>>,
    jobs: Mutex<Vec<FakeJobRow>>,
    heartbeats: Mutex<HashMap<String, WorkerHeartbeatInput>>,
}

impl FakeWorkflowRepository {
    fn new(device_repository: Arc<FakeDeviceRepository>) -> Self {
        Self {
            device_repository,
            runs: Mutex::new(HashMap::new()),
            jobs: Mutex::new(Vec::new()),
            heartbeats: Mutex::new(HashMap::new()),
        }
    }

    async fn set_device_status(&self, device_id: Uuid, status: DeviceStatus) {
        if let Some(device) = self
            .device_repository
            .devices
            .lock()
            .await
            .get_mut(&device_id)
        {
            device.status = status;
        }
    }

    async fn requeue_job_for_redelivery(&self, job_id: Uuid) {
        for job in self.jobs.lock().await.iter_mut() {
            if job.job_id == job_id {
                job.status = "pending";
                job.leased_by = None;
                job.lease_token = None;
            }
        }
    }
}

#[async_trait]
impl WorkflowRepository for FakeWorkflowRepository {
    async fn create_run(&self, input: CreateRunInput) -> AppResult<WorkflowRun> {
        let run = WorkflowRun {
            id: Uuid::new_v4(),
            device_id: input.device_id,
            blueprint_id: input.blueprint_id,
            status: WorkflowRunStatus::Queued,
            steps: Vec::new(),
            started_at: Utc::now(),
            updated_at: Utc::now(),
            last_error: None,
        };

        self.runs.lock().await.insert(run.id, run.clone());
        self.set_device_status(input.device_id, DeviceStatus::Provisioning)
            .await;
        Ok(run)
    }

    async fn find_run(&self, run_id: Uuid) -> AppResult<Option<WorkflowRun>> {
        Ok(self.runs.lock().await.get(&run_id).cloned())
    }

    async fn enqueue_job(&self, run_id: Uuid, dry_run: bool) -> AppResult<()> {
        let mut jobs = self.jobs.lock().await;
        if jobs.iter().any(|job| job.run_id == run_id) {
            return Ok(());
        }

        jobs.push(FakeJobRow {
            job_id: Uuid::new_v4(),
            run_id,
            dry_run,
            status: "pending",
            leased_by: None,
            lease_token: None,
        });
        Ok(())
    }

    async fn claim_jobs(
        &self,
        worker_id: &str,
        limit: usize,
        _lease_seconds: u32,
    ) -> AppResult<Vec<ClaimedJob>> {
        let mut claimed = Vec::new();
        for job in self.jobs.lock().await.iter_mut() {
            if claimed.len() >= limit {
                break;
            }

            if job.status == "pending" {
                let lease_token = Uuid::new_v4().to_string();
                job.status = "leased";
                job.leased_by = Some(worker_id.to_owned());
                job.lease_token = Some(lease_token.clone());
                claimed.push(ClaimedJob {
                    job_id: job.job_id,
                    run_id: job.run_id,
                    dry_run: job.dry_run,
                    lease_token,
                });
            }
        }

        Ok(claimed)
    }

    async fn complete_job(
        &self,
        job_id: Uuid,
        worker_id: &str,
        lease_token: &str,
    ) -> AppResult<()> {
        for job in self.jobs.lock().await.iter_mut() {
            if job.job_id == job_id
                && job.leased_by.as_deref() == Some(worker_id)
                && job.lease_token.as_deref() == Some(lease_token)
            {
                job.status = "completed";
                return Ok(());
            }
        }

        Err(AppError::Conflict(format!(
            "job '{job_id}' is not leased by worker '{worker_id}'"
        )))
    }

    async fn fail_job(
        &self,
        job_id: Uuid,
        worker_id: &str,
        lease_token: &str,
        _error_message: &str,
    ) -> AppResult<()> {
        for job in self.jobs.lock().await.iter_mut() {
            if job.job_id == job_id
                && job.leased_by.as_deref() == Some(worker_id)
                && job.lease_token.as_deref() == Some(lease_token)
            {
                job.status = "failed";
                return Ok(());
            }
        }

        Err(AppError::Conflict(format!(
            "job '{job_id}' is not leased by worker '{worker_id}'"
        )))
    }

    async fn mark_run_provisioning(&self, run_id: Uuid) -> AppResult<()> {
        if let Some(run) = self.runs.lock().await.get_mut(&run_id) {
            run.status = WorkflowRunStatus::Provisioning;
            run.updated_at = Utc::now();
        }

        Ok(())
    }

    async fn finalize_run(&self, input: FinalizeRunInput) -> AppResult<WorkflowRun> {
        let finalized = {
            let mut runs = self.runs.lock().await;
            let run = runs.get_mut(&input.run_id).ok_or_else(|| {
                AppError::NotFound(format!("workflow run '{}' not found", input.run_id))
            })?;

            run.status = input.status;
            run.steps = input.steps;
            run.last_error = input.last_error;
            run.updated_at = Utc::now();
            run.clone()
        };

        if let Some(status) = input.device_status {
            self.set_device_status(finalized.device_id, status).await;
        }

        Ok(finalized)
    }

    async fn upsert_worker_heartbeat(
        &self,
        worker_id: &str,
        input: WorkerHeartbeatInput,
    ) -> AppResult<()> {
        self.heartbeats
            .lock()
            .await
            .insert(worker_id.to_owned(), input);
        Ok(())
    }

    async fn queue_stats(&self, _active_window_seconds: u32) -> AppResult<QueueStats> {
        let jobs = self.jobs.lock().await;
        let count = |status: &str| {
            i64::try_from(jobs.iter().filter(|job| job.status == status).count()).unwrap_or(0)
        };

        Ok(QueueStats {
            pending_jobs: count("pending"),
            leased_jobs: count("leased"),
            completed_jobs: count("completed"),
            failed_jobs: count("failed"),
            expired_leases: 0,
            active_workers: i64::try_from(self.heartbeats.lock().await.len()).unwrap_or(0),
        })
    }
}

struct Harness {
    service: WorkflowService,
    device_repository: Arc<FakeDeviceRepository>,
    blueprint_repository: Arc<FakeBlueprintRepository>,
    workflow_repository: Arc<FakeWorkflowRepository>,
    audit_repository: Arc<FakeAuditRepository>,
}

fn build_harness() -> Harness {
    let device_repository = Arc::new(FakeDeviceRepository::default());
    let blueprint_repository = Arc::new(FakeBlueprintRepository::default());
    let workflow_repository = Arc::new(FakeWorkflowRepository::new(device_repository.clone()));
    let audit_repository = Arc::new(FakeAuditRepository::default());

    let service = WorkflowService::new(
        workflow_repository.clone(),
        device_repository.clone(),
        blueprint_repository.clone(),
        audit_repository.clone(),
    );

    Harness {
        service,
        device_repository,
        blueprint_repository,
        workflow_repository,
        audit_repository,
    }
}

async fn seed_device(harness: &Harness, os_type: &str) -> Uuid {
    let device = Device {
        id: Uuid::new_v4(),
        hostname: "edge-node-01".to_owned(),
        os_type: os_type.to_owned(),
        arch: "x86_64".to_owned(),
        status: DeviceStatus::Enrolled,
        facts: json!({}),
        blueprint_id: None,
        enrollment_token_id: None,
        last_seen: Some(Utc::now()),
    };

    let device_id = device.id;
    harness
        .device_repository
        .devices
        .lock()
        .await
        .insert(device_id, device);
    device_id
}

async fn seed_blueprint(harness: &Harness) -> Uuid {
    let blueprint = Blueprint::with_id(
        Uuid::new_v4(),
        BlueprintInput {
            name: "workstation-baseline".to_owned(),
            description: String::new(),
            os_targets: vec!["linux".to_owned()],
            packages: PackageManifest {
                choco: Vec::new(),
                brew: vec!["ripgrep".to_owned()],
                apt: Vec::new(),
            },
            files: Default::default(),
            users: UserManifest::default(),
            security: SecurityManifest::default(),
        },
    )
    .unwrap_or_else(|_| unreachable!());

    let blueprint_id = blueprint.id;
    harness
        .blueprint_repository
        .blueprints
        .lock()
        .await
        .insert(blueprint_id, blueprint);
    blueprint_id
}

async fn device_status(harness: &Harness, device_id: Uuid) -> DeviceStatus {
    harness
        .device_repository
        .devices
        .lock()
        .await
        .get(&device_id)
        .map(|device| device.status)
        .unwrap_or(DeviceStatus::Pending)
}

async fn claim_one(harness: &Harness) -> ClaimedJob {
    let claimed = harness
        .service
        .claim_jobs_for_worker("worker-1", 10, 30)
        .await
        .unwrap_or_default();
    assert_eq!(claimed.len(), 1);
    claimed.into_iter().next().unwrap_or_else(|| unreachable!())
}

#[tokio::test]
async fn start_with_missing_blueprint_mutates_nothing() {
    let harness = build_harness();
    let device_id = seed_device(&harness, "linux").await;

    let started = harness
        .service
        .start_run(StartRunInput {
            device_id,
            blueprint_id: Uuid::new_v4(),
            dry_run: false,
        })
        .await;

    assert!(matches!(started, Err(AppError::NotFound(_))));
    assert!(harness.workflow_repository.runs.lock().await.is_empty());
    assert!(harness.workflow_repository.jobs.lock().await.is_empty());
    assert_eq!(
        device_status(&harness, device_id).await,
        DeviceStatus::Enrolled
    );
}

#[tokio::test]
async fn start_with_missing_device_mutates_nothing() {
    let harness = build_harness();
    let blueprint_id = seed_blueprint(&harness).await;

    let started = harness
        .service
        .start_run(StartRunInput {
            device_id: Uuid::new_v4(),
            blueprint_id,
            dry_run: false,
        })
        .await;

    assert!(matches!(started, Err(AppError::NotFound(_))));
    assert!(harness.workflow_repository.runs.lock().await.is_empty());
}

#[tokio::test]
async fn start_queues_run_and_marks_device_provisioning() {
    let harness = build_harness();
    let device_id = seed_device(&harness, "linux").await;
    let blueprint_id = seed_blueprint(&harness).await;

    let run = harness
        .service
        .start_run(StartRunInput {
            device_id,
            blueprint_id,
            dry_run: true,
        })
        .await;

    assert!(run.is_ok());
    let run = run.unwrap_or_else(|_| unreachable!());
    assert_eq!(run.status, WorkflowRunStatus::Queued);
    assert!(run.steps.is_empty());
    assert_eq!(
        device_status(&harness, device_id).await,
        DeviceStatus::Provisioning
    );

    let jobs = harness.workflow_repository.jobs.lock().await;
    assert_eq!(jobs.len(), 1);
    assert!(jobs[0].dry_run);
}

#[tokio::test]
async fn dry_run_completes_without_touching_device_status() {
    let harness = build_harness();
    let device_id = seed_device(&harness, "linux").await;
    let blueprint_id = seed_blueprint(&harness).await;

    let started = harness
        .service
        .start_run(StartRunInput {
            device_id,
            blueprint_id,
            dry_run: true,
        })
        .await;
    assert!(started.is_ok());

    let job = claim_one(&harness).await;
    let executed = harness.service.execute_claimed_job("worker-1", job).await;

    assert!(executed.is_ok());
    let run = executed
        .unwrap_or(None)
        .unwrap_or_else(|| unreachable!());
    assert_eq!(run.status, WorkflowRunStatus::Completed);
    assert!(run.steps.iter().any(|step| step.name == "plan"));
    // Dry runs never promote the device to provisioned.
    assert_eq!(
        device_status(&harness, device_id).await,
        DeviceStatus::Provisioning
    );
}

#[tokio::test]
async fn executed_run_applies_plan_and_provisions_device() {
    let harness = build_harness();
    let device_id = seed_device(&harness, "linux").await;
    let blueprint_id = seed_blueprint(&harness).await;

    let started = harness
        .service
        .start_run(StartRunInput {
            device_id,
            blueprint_id,
            dry_run: false,
        })
        .await;
    assert!(started.is_ok());

    let job = claim_one(&harness).await;
    let executed = harness.service.execute_claimed_job("worker-1", job).await;

    assert!(executed.is_ok());
    let run = executed
        .unwrap_or(None)
        .unwrap_or_else(|| unreachable!());
    assert_eq!(run.status, WorkflowRunStatus::Completed);

    let step_names: Vec<&str> = run.steps.iter().map(|step| step.name.as_str()).collect();
    assert_eq!(step_names, vec!["fetch_blueprint", "apply"]);
    assert!(run.steps[1].detail[0].contains("ripgrep"));

    assert_eq!(
        device_status(&harness, device_id).await,
        DeviceStatus::Provisioned
    );

    let jobs = harness.workflow_repository.jobs.lock().await;
    assert_eq!(jobs[0].status, "completed");
}

#[tokio::test]
async fn blueprint_deleted_after_enqueue_fails_the_run() {
    let harness = build_harness();
    let device_id = seed_device(&harness, "linux").await;
    let blueprint_id = seed_blueprint(&harness).await;

    let started = harness
        .service
        .start_run(StartRunInput {
            device_id,
            blueprint_id,
            dry_run: false,
        })
        .await;
    assert!(started.is_ok());

    harness
        .blueprint_repository
        .blueprints
        .lock()
        .await
        .remove(&blueprint_id);

    let job = claim_one(&harness).await;
    let executed = harness.service.execute_claimed_job("worker-1", job).await;

    assert!(executed.is_ok());
    let run = executed
        .unwrap_or(None)
        .unwrap_or_else(|| unreachable!());
    assert_eq!(run.status, WorkflowRunStatus::Failed);
    assert_eq!(
        run.last_error.as_deref(),
        Some("missing device or blueprint")
    );
    assert_eq!(run.steps.len(), 1);
    assert_eq!(run.steps[0].status, StepStatus::Failed);

    // The queue job itself completed: the failure is recorded on the run.
    let jobs = harness.workflow_repository.jobs.lock().await;
    assert_eq!(jobs[0].status, "completed");
}

#[tokio::test]
async fn redelivered_terminal_run_is_a_safe_noop() {
    let harness = build_harness();
    let device_id = seed_device(&harness, "linux").await;
    let blueprint_id = seed_blueprint(&harness).await;

    let started = harness
        .service
        .start_run(StartRunInput {
            device_id,
            blueprint_id,
            dry_run: false,
        })
        .await;
    assert!(started.is_ok());

    let job = claim_one(&harness).await;
    let job_id = job.job_id;
    let first = harness.service.execute_claimed_job("worker-1", job).await;
    assert!(first.is_ok());

    let audit_count_after_first = harness.audit_repository.events.lock().await.len();

    harness
        .workflow_repository
        .requeue_job_for_redelivery(job_id)
        .await;
    let redelivered = claim_one(&harness).await;
    let second = harness
        .service
        .execute_claimed_job("worker-1", redelivered)
        .await;

    assert!(second.is_ok());
    let run = second
        .unwrap_or(None)
        .unwrap_or_else(|| unreachable!());
    assert_eq!(run.status, WorkflowRunStatus::Completed);
    assert_eq!(run.steps.len(), 2);

    // No second finish audit entry: the terminal run was not re-executed.
    assert_eq!(
        harness.audit_repository.events.lock().await.len(),
        audit_count_after_first
    );
}

#[tokio::test]
async fn job_for_a_missing_run_is_dropped_with_completion() {
    let harness = build_harness();

    let run_id = Uuid::new_v4();
    let enqueued = harness.workflow_repository.enqueue_job(run_id, false).await;
    assert!(enqueued.is_ok());

    let job = claim_one(&harness).await;
    let executed = harness.service.execute_claimed_job("worker-1", job).await;

    assert!(executed.is_ok());
    assert!(executed.unwrap_or(None).is_none());

    let jobs = harness.workflow_repository.jobs.lock().await;
    assert_eq!(jobs[0].status, "completed");
}

#[tokio::test]
async fn claim_rejects_zero_limit() {
    let harness = build_harness();

    let claimed = harness.service.claim_jobs_for_worker("worker-1", 0, 30).await;
    assert!(matches!(claimed, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn queue_stats_counts_job_states() {
    let harness = build_harness();
    let device_id = seed_device(&harness, "linux").await;
    let blueprint_id = seed_blueprint(&harness).await;

    let started = harness
        .service
        .start_run(StartRunInput {
            device_id,
            blueprint_id,
            dry_run: false,
        })
        .await;
    assert!(started.is_ok());

    let heartbeat = harness
        .service
        .heartbeat_worker(
            "worker-1",
            WorkerHeartbeatInput {
                claimed_jobs: 0,
                executed_jobs: 0,
                failed_jobs: 0,
            },
        )
        .await;
    assert!(heartbeat.is_ok());

    let stats = harness.service.queue_stats(60).await;
    assert!(stats.is_ok());
    let stats = stats.unwrap_or_else(|_| unreachable!());
    assert_eq!(stats.pending_jobs, 1);
    assert_eq!(stats.active_workers, 1);
}
