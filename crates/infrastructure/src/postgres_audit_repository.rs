use async_trait::async_trait;
use sqlx::PgPool;

use zeroline_application::{AuditEvent, AuditRepository};
use zeroline_core::{AppError, AppResult};

/// PostgreSQL-backed append-only audit repository.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log_entries (
                actor,
                action,
                target_type,
                target_id,
                message
            )
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.actor)
        .bind(event.action.as_str())
        .bind(event.target_type)
        .bind(event.target_id)
        .bind(event.message)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to append audit event: {error}")))?;

        Ok(())
    }
}
