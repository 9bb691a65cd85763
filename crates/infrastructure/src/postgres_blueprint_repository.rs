use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use zeroline_application::BlueprintRepository;
use zeroline_core::{AppError, AppResult};
use zeroline_domain::{Blueprint, PackageManifest, SecurityManifest, UserManifest};

/// PostgreSQL-backed blueprint repository.
#[derive(Clone)]
pub struct PostgresBlueprintRepository {
    pool: PgPool,
}

impl PostgresBlueprintRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct BlueprintRow {
    id: Uuid,
    name: String,
    description: String,
    os_targets: Value,
    packages: Value,
    files: Value,
    users: Value,
    security: Value,
}

fn blueprint_from_row(row: BlueprintRow) -> AppResult<Blueprint> {
    Ok(Blueprint {
        id: row.id,
        name: row.name,
        description: row.description,
        os_targets: decode_column::<Vec<String>>(row.os_targets, "os_targets")?,
        packages: decode_column::<PackageManifest>(row.packages, "packages")?,
        files: decode_column::<BTreeMap<String, Value>>(row.files, "files")?,
        users: decode_column::<UserManifest>(row.users, "users")?,
        security: decode_column::<SecurityManifest>(row.security, "security")?,
    })
}

fn decode_column<T: serde::de::DeserializeOwned>(value: Value, column: &str) -> AppResult<T> {
    serde_json::from_value(value).map_err(|error| {
        AppError::Internal(format!(
            "failed to deserialize blueprint column '{column}': {error}"
        ))
    })
}

fn encode_column<T: serde::Serialize>(value: &T, column: &str) -> AppResult<Value> {
    serde_json::to_value(value).map_err(|error| {
        AppError::Internal(format!(
            "failed to serialize blueprint column '{column}': {error}"
        ))
    })
}

const BLUEPRINT_COLUMNS: &str =
    "id, name, description, os_targets, packages, files, users, security";

#[async_trait]
impl BlueprintRepository for PostgresBlueprintRepository {
    async fn create_blueprint(&self, blueprint: Blueprint) -> AppResult<Blueprint> {
        let row = sqlx::query_as::<_, BlueprintRow>(&format!(
            r#"
            INSERT INTO blueprints (
                id, name, description, os_targets, packages, files, users, security
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {BLUEPRINT_COLUMNS}
            "#
        ))
        .bind(blueprint.id)
        .bind(blueprint.name.as_str())
        .bind(blueprint.description.as_str())
        .bind(encode_column(&blueprint.os_targets, "os_targets")?)
        .bind(encode_column(&blueprint.packages, "packages")?)
        .bind(encode_column(&blueprint.files, "files")?)
        .bind(encode_column(&blueprint.users, "users")?)
        .bind(encode_column(&blueprint.security, "security")?)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to create blueprint '{}': {error}",
                blueprint.name
            ))
        })?;

        blueprint_from_row(row)
    }

    async fn list_blueprints(&self) -> AppResult<Vec<Blueprint>> {
        let rows = sqlx::query_as::<_, BlueprintRow>(&format!(
            "SELECT {BLUEPRINT_COLUMNS} FROM blueprints ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list blueprints: {error}")))?;

        rows.into_iter().map(blueprint_from_row).collect()
    }

    async fn find_blueprint(&self, blueprint_id: Uuid) -> AppResult<Option<Blueprint>> {
        let row = sqlx::query_as::<_, BlueprintRow>(&format!(
            "SELECT {BLUEPRINT_COLUMNS} FROM blueprints WHERE id = $1"
        ))
        .bind(blueprint_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to find blueprint '{blueprint_id}': {error}"
            ))
        })?;

        row.map(blueprint_from_row).transpose()
    }

    async fn update_blueprint(&self, blueprint: Blueprint) -> AppResult<Option<Blueprint>> {
        let row = sqlx::query_as::<_, BlueprintRow>(&format!(
            r#"
            UPDATE blueprints
            SET
                name = $2,
                description = $3,
                os_targets = $4,
                packages = $5,
                files = $6,
                users = $7,
                security = $8,
                updated_at = now()
            WHERE id = $1
            RETURNING {BLUEPRINT_COLUMNS}
            "#
        ))
        .bind(blueprint.id)
        .bind(blueprint.name.as_str())
        .bind(blueprint.description.as_str())
        .bind(encode_column(&blueprint.os_targets, "os_targets")?)
        .bind(encode_column(&blueprint.packages, "packages")?)
        .bind(encode_column(&blueprint.files, "files")?)
        .bind(encode_column(&blueprint.users, "users")?)
        .bind(encode_column(&blueprint.security, "security")?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to update blueprint '{}': {error}",
                blueprint.id
            ))
        })?;

        row.map(blueprint_from_row).transpose()
    }

    async fn delete_blueprint(&self, blueprint_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM blueprints WHERE id = $1")
            .bind(blueprint_id)
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to delete blueprint '{blueprint_id}': {error}"
                ))
            })?;

        Ok(result.rows_affected() > 0)
    }
}
