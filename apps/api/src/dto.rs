use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use zeroline_application::{IssuedToken, QueueStats, WorkflowRun};
use zeroline_domain::{
    Blueprint, BlueprintInput, Device, PackageManifest, RunStep, SecurityManifest, UserManifest,
};

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

fn default_ttl_minutes() -> u32 {
    30
}

fn default_max_uses() -> u32 {
    1
}

/// Incoming payload for token issuance.
#[derive(Debug, Deserialize)]
pub struct IssueTokenRequest {
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u32,
    #[serde(default = "default_max_uses")]
    pub max_uses: u32,
    #[serde(default = "empty_object")]
    pub claims: Value,
}

/// Issued token payload, returned exactly once.
#[derive(Debug, Serialize)]
pub struct IssuedTokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub uses_remaining: i32,
    pub enrollment_url: String,
}

impl From<IssuedToken> for IssuedTokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            token: issued.token,
            expires_at: issued.expires_at,
            uses_remaining: issued.uses_remaining,
            enrollment_url: issued.enrollment_url,
        }
    }
}

/// Incoming payload for device registration.
#[derive(Debug, Deserialize)]
pub struct RegisterDeviceRequest {
    pub token: String,
    pub hostname: String,
    pub os_type: String,
    pub arch: String,
    #[serde(default = "empty_object")]
    pub facts: Value,
}

/// Device representation returned by the API.
#[derive(Debug, Serialize)]
pub struct DeviceResponse {
    pub id: Uuid,
    pub hostname: String,
    pub os_type: String,
    pub arch: String,
    pub status: String,
    pub blueprint_id: Option<Uuid>,
    pub last_seen: Option<DateTime<Utc>>,
    pub facts: Value,
}

impl From<Device> for DeviceResponse {
    fn from(device: Device) -> Self {
        Self {
            id: device.id,
            hostname: device.hostname,
            os_type: device.os_type,
            arch: device.arch,
            status: device.status.as_str().to_owned(),
            blueprint_id: device.blueprint_id,
            last_seen: device.last_seen,
            facts: device.facts,
        }
    }
}

/// Incoming payload for blueprint create/update.
#[derive(Debug, Deserialize)]
pub struct SaveBlueprintRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub os_targets: Vec<String>,
    #[serde(default)]
    pub packages: PackageManifest,
    #[serde(default)]
    pub files: BTreeMap<String, Value>,
    #[serde(default)]
    pub users: UserManifest,
    #[serde(default)]
    pub security: SecurityManifest,
}

impl From<SaveBlueprintRequest> for BlueprintInput {
    fn from(request: SaveBlueprintRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            os_targets: request.os_targets,
            packages: request.packages,
            files: request.files,
            users: request.users,
            security: request.security,
        }
    }
}

/// Blueprint representation returned by the API.
#[derive(Debug, Serialize)]
pub struct BlueprintResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub os_targets: Vec<String>,
    pub packages: PackageManifest,
    pub files: BTreeMap<String, Value>,
    pub users: UserManifest,
    pub security: SecurityManifest,
}

impl From<Blueprint> for BlueprintResponse {
    fn from(blueprint: Blueprint) -> Self {
        Self {
            id: blueprint.id,
            name: blueprint.name,
            description: blueprint.description,
            os_targets: blueprint.os_targets,
            packages: blueprint.packages,
            files: blueprint.files,
            users: blueprint.users,
            security: blueprint.security,
        }
    }
}

/// Incoming payload for starting a workflow run.
#[derive(Debug, Deserialize)]
pub struct StartWorkflowRequest {
    pub blueprint_id: Uuid,
    #[serde(default)]
    pub dry_run: bool,
}

/// One recorded run step.
#[derive(Debug, Serialize)]
pub struct RunStepResponse {
    pub name: String,
    pub status: String,
    pub detail: Vec<String>,
}

impl From<RunStep> for RunStepResponse {
    fn from(step: RunStep) -> Self {
        let status = match step.status {
            zeroline_domain::StepStatus::Ok => "ok",
            zeroline_domain::StepStatus::Failed => "failed",
        };

        Self {
            name: step.name,
            status: status.to_owned(),
            detail: step.detail,
        }
    }
}

/// Workflow run representation returned by the API.
#[derive(Debug, Serialize)]
pub struct WorkflowRunResponse {
    pub id: Uuid,
    pub device_id: Uuid,
    pub blueprint_id: Uuid,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub steps: Vec<RunStepResponse>,
    pub last_error: Option<String>,
}

impl From<WorkflowRun> for WorkflowRunResponse {
    fn from(run: WorkflowRun) -> Self {
        Self {
            id: run.id,
            device_id: run.device_id,
            blueprint_id: run.blueprint_id,
            status: run.status.as_str().to_owned(),
            started_at: run.started_at,
            updated_at: run.updated_at,
            steps: run.steps.into_iter().map(RunStepResponse::from).collect(),
            last_error: run.last_error,
        }
    }
}

/// Aggregate queue stats returned by the API.
#[derive(Debug, Serialize)]
pub struct QueueStatsResponse {
    pub pending_jobs: i64,
    pub leased_jobs: i64,
    pub completed_jobs: i64,
    pub failed_jobs: i64,
    pub expired_leases: i64,
    pub active_workers: i64,
}

impl From<QueueStats> for QueueStatsResponse {
    fn from(stats: QueueStats) -> Self {
        Self {
            pending_jobs: stats.pending_jobs,
            leased_jobs: stats.leased_jobs,
            completed_jobs: stats.completed_jobs,
            failed_jobs: stats.failed_jobs,
            expired_leases: stats.expired_leases,
            active_workers: stats.active_workers,
        }
    }
}
