//! Zeroline provisioning worker runtime.
//!
//! Polls the durable job queue, executes each claimed workflow run
//! end-to-end, and publishes heartbeats for queue observability.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use zeroline_application::{WorkerHeartbeatInput, WorkflowService};
use zeroline_core::{AppError, AppResult};
use zeroline_infrastructure::{
    PostgresAuditRepository, PostgresBlueprintRepository, PostgresDeviceRepository,
    PostgresWorkflowRepository,
};

#[derive(Debug, Clone)]
struct WorkerConfig {
    database_url: String,
    worker_id: String,
    claim_limit: usize,
    lease_seconds: u32,
    poll_interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    let pool = connect_pool(config.database_url.as_str()).await?;
    let workflow_service = build_workflow_service(pool);

    info!(
        worker_id = %config.worker_id,
        claim_limit = config.claim_limit,
        lease_seconds = config.lease_seconds,
        poll_interval_ms = config.poll_interval_ms,
        "zeroline-worker started"
    );

    loop {
        let claimed_jobs = match workflow_service
            .claim_jobs_for_worker(
                config.worker_id.as_str(),
                config.claim_limit,
                config.lease_seconds,
            )
            .await
        {
            Ok(jobs) => jobs,
            Err(error) => {
                warn!(
                    worker_id = %config.worker_id,
                    error = %error,
                    "failed to claim provisioning jobs"
                );
                tokio::time::sleep(Duration::from_millis(config.poll_interval_ms)).await;
                continue;
            }
        };

        let claimed_job_count = u32::try_from(claimed_jobs.len()).unwrap_or(u32::MAX);
        let mut executed_jobs = 0_u32;
        let mut failed_jobs = 0_u32;

        if claimed_jobs.is_empty() {
            publish_heartbeat(&workflow_service, &config, 0, 0, 0).await;
            tokio::time::sleep(Duration::from_millis(config.poll_interval_ms)).await;
            continue;
        }

        info!(
            worker_id = %config.worker_id,
            claimed_count = claimed_jobs.len(),
            "claimed provisioning jobs"
        );

        for claimed_job in claimed_jobs {
            let job_id = claimed_job.job_id;
            let run_id = claimed_job.run_id;

            match workflow_service
                .execute_claimed_job(config.worker_id.as_str(), claimed_job)
                .await
            {
                Ok(Some(run)) => {
                    executed_jobs = executed_jobs.saturating_add(1);
                    info!(
                        worker_id = %config.worker_id,
                        %job_id,
                        %run_id,
                        status = %run.status.as_str(),
                        "provisioning job executed"
                    );
                }
                Ok(None) => {
                    executed_jobs = executed_jobs.saturating_add(1);
                    warn!(
                        worker_id = %config.worker_id,
                        %job_id,
                        %run_id,
                        "provisioning job dropped: run no longer exists"
                    );
                }
                Err(error) => {
                    failed_jobs = failed_jobs.saturating_add(1);
                    warn!(
                        worker_id = %config.worker_id,
                        %job_id,
                        %run_id,
                        error = %error,
                        "provisioning job execution failed"
                    );
                }
            }
        }

        publish_heartbeat(
            &workflow_service,
            &config,
            claimed_job_count,
            executed_jobs,
            failed_jobs,
        )
        .await;
    }
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn build_workflow_service(pool: PgPool) -> WorkflowService {
    let workflow_repository = Arc::new(PostgresWorkflowRepository::new(pool.clone()));
    let device_repository = Arc::new(PostgresDeviceRepository::new(pool.clone()));
    let blueprint_repository = Arc::new(PostgresBlueprintRepository::new(pool.clone()));
    let audit_repository = Arc::new(PostgresAuditRepository::new(pool));

    WorkflowService::new(
        workflow_repository,
        device_repository,
        blueprint_repository,
        audit_repository,
    )
}

async fn publish_heartbeat(
    workflow_service: &WorkflowService,
    config: &WorkerConfig,
    claimed_jobs: u32,
    executed_jobs: u32,
    failed_jobs: u32,
) {
    let heartbeat = workflow_service
        .heartbeat_worker(
            config.worker_id.as_str(),
            WorkerHeartbeatInput {
                claimed_jobs,
                executed_jobs,
                failed_jobs,
            },
        )
        .await;

    if let Err(error) = heartbeat {
        warn!(
            worker_id = %config.worker_id,
            error = %error,
            "failed to publish worker heartbeat"
        );
    }
}

impl WorkerConfig {
    fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let worker_id = env::var("WORKER_ID")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| format!("worker-{}", std::process::id()));
        let claim_limit = parse_env_usize("WORKER_CLAIM_LIMIT", 10)?;
        let lease_seconds = parse_env_u32("WORKER_LEASE_SECONDS", 30)?;
        let poll_interval_ms = parse_env_u64("WORKER_POLL_INTERVAL_MS", 1500)?;

        if claim_limit == 0 {
            return Err(AppError::Validation(
                "WORKER_CLAIM_LIMIT must be greater than zero".to_owned(),
            ));
        }

        if lease_seconds == 0 {
            return Err(AppError::Validation(
                "WORKER_LEASE_SECONDS must be greater than zero".to_owned(),
            ));
        }

        if poll_interval_ms == 0 {
            return Err(AppError::Validation(
                "WORKER_POLL_INTERVAL_MS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            worker_id,
            claim_limit,
            lease_seconds,
            poll_interval_ms,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_env_usize(name: &str, default: usize) -> AppResult<usize> {
    match env::var(name) {
        Ok(value) => value.parse::<usize>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> AppResult<u32> {
    match env::var(name) {
        Ok(value) => value.parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
