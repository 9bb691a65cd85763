use async_trait::async_trait;
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use zeroline_application::{NewDevice, NewEnrollmentToken, TokenRepository};
use zeroline_core::{AppError, AppResult};
use zeroline_domain::{Device, EnrollmentToken};

use crate::postgres_device_repository::{DEVICE_COLUMNS, DeviceRow, device_from_row};

/// PostgreSQL-backed enrollment token repository.
#[derive(Clone)]
pub struct PostgresTokenRepository {
    pool: PgPool,
}

impl PostgresTokenRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TokenRow {
    id: Uuid,
    token_hash: String,
    expires_at: chrono::DateTime<chrono::Utc>,
    uses_remaining: i32,
    created_by: String,
    claims: Value,
}

impl From<TokenRow> for EnrollmentToken {
    fn from(row: TokenRow) -> Self {
        Self {
            id: row.id,
            token_hash: row.token_hash,
            expires_at: row.expires_at,
            uses_remaining: row.uses_remaining,
            created_by: row.created_by,
            claims: row.claims,
        }
    }
}

#[async_trait]
impl TokenRepository for PostgresTokenRepository {
    async fn create_token(&self, token: NewEnrollmentToken) -> AppResult<EnrollmentToken> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            INSERT INTO enrollment_tokens (
                token_hash,
                expires_at,
                uses_remaining,
                created_by,
                claims
            )
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, token_hash, expires_at, uses_remaining, created_by, claims
            "#,
        )
        .bind(token.token_hash)
        .bind(token.expires_at)
        .bind(token.uses_remaining)
        .bind(token.created_by)
        .bind(token.claims)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to create enrollment token: {error}"))
        })?;

        Ok(row.into())
    }

    async fn find_token_by_hash(&self, token_hash: &str) -> AppResult<Option<EnrollmentToken>> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT id, token_hash, expires_at, uses_remaining, created_by, claims
            FROM enrollment_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find enrollment token: {error}"))
        })?;

        Ok(row.map(EnrollmentToken::from))
    }

    async fn redeem_token_and_register_device(
        &self,
        token_hash: &str,
        device: NewDevice,
    ) -> AppResult<Option<Device>> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to start token redemption transaction: {error}"
            ))
        })?;

        // Guarded decrement: serializes concurrent redemptions of the
        // same token at the row level. Zero rows means the token was
        // spent or expired between the caller's read and this write.
        let redeemed_token_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE enrollment_tokens
            SET uses_remaining = uses_remaining - 1
            WHERE token_hash = $1
              AND uses_remaining > 0
              AND expires_at > now()
            RETURNING id
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to redeem enrollment token: {error}"))
        })?;

        if redeemed_token_id.is_none() {
            transaction.rollback().await.map_err(|error| {
                AppError::Internal(format!(
                    "failed to roll back token redemption transaction: {error}"
                ))
            })?;
            return Ok(None);
        }

        let row = sqlx::query_as::<_, DeviceRow>(&format!(
            r#"
            INSERT INTO devices (
                hostname,
                os_type,
                arch,
                status,
                facts,
                blueprint_id,
                enrollment_token_id,
                last_seen
            )
            VALUES ($1, $2, $3, 'enrolled', $4, $5, $6, now())
            RETURNING {DEVICE_COLUMNS}
            "#
        ))
        .bind(device.hostname)
        .bind(device.os_type)
        .bind(device.arch)
        .bind(device.facts)
        .bind(device.blueprint_id)
        .bind(device.enrollment_token_id)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to register device: {error}")))?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to commit token redemption transaction: {error}"
            ))
        })?;

        device_from_row(row).map(Some)
    }
}
