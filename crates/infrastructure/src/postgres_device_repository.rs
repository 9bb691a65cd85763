use async_trait::async_trait;
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use zeroline_application::DeviceRepository;
use zeroline_core::{AppError, AppResult};
use zeroline_domain::{Device, DeviceStatus};

/// PostgreSQL-backed device read repository.
#[derive(Clone)]
pub struct PostgresDeviceRepository {
    pool: PgPool,
}

impl PostgresDeviceRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct DeviceRow {
    pub(crate) id: Uuid,
    pub(crate) hostname: String,
    pub(crate) os_type: String,
    pub(crate) arch: String,
    pub(crate) status: String,
    pub(crate) facts: Value,
    pub(crate) blueprint_id: Option<Uuid>,
    pub(crate) enrollment_token_id: Option<Uuid>,
    pub(crate) last_seen: Option<chrono::DateTime<chrono::Utc>>,
}

pub(crate) fn device_from_row(row: DeviceRow) -> AppResult<Device> {
    Ok(Device {
        id: row.id,
        hostname: row.hostname,
        os_type: row.os_type,
        arch: row.arch,
        status: DeviceStatus::parse(row.status.as_str())?,
        facts: row.facts,
        blueprint_id: row.blueprint_id,
        enrollment_token_id: row.enrollment_token_id,
        last_seen: row.last_seen,
    })
}

pub(crate) const DEVICE_COLUMNS: &str =
    "id, hostname, os_type, arch, status, facts, blueprint_id, enrollment_token_id, last_seen";

#[async_trait]
impl DeviceRepository for PostgresDeviceRepository {
    async fn list_devices(&self) -> AppResult<Vec<Device>> {
        let rows = sqlx::query_as::<_, DeviceRow>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list devices: {error}")))?;

        rows.into_iter().map(device_from_row).collect()
    }

    async fn find_device(&self, device_id: Uuid) -> AppResult<Option<Device>> {
        let row = sqlx::query_as::<_, DeviceRow>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices WHERE id = $1"
        ))
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find device '{device_id}': {error}"))
        })?;

        row.map(device_from_row).transpose()
    }
}
