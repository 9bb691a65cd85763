use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;
use zeroline_core::{AppError, AppResult};

/// Maximum enrollment token lifetime in minutes (24 hours).
pub const TOKEN_TTL_MINUTES_LIMIT: u32 = 24 * 60;

/// Maximum redemption count for one enrollment token.
pub const TOKEN_MAX_USES_LIMIT: u32 = 1000;

/// Validated parameters for issuing one enrollment token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenIssuance {
    ttl_minutes: u32,
    max_uses: u32,
    claims: Value,
}

impl TokenIssuance {
    /// Creates validated issuance parameters.
    pub fn new(ttl_minutes: u32, max_uses: u32, claims: Value) -> AppResult<Self> {
        if ttl_minutes == 0 || ttl_minutes > TOKEN_TTL_MINUTES_LIMIT {
            return Err(AppError::Validation(format!(
                "ttl_minutes must be between 1 and {TOKEN_TTL_MINUTES_LIMIT}"
            )));
        }

        if max_uses == 0 || max_uses > TOKEN_MAX_USES_LIMIT {
            return Err(AppError::Validation(format!(
                "max_uses must be between 1 and {TOKEN_MAX_USES_LIMIT}"
            )));
        }

        if !claims.is_object() {
            return Err(AppError::Validation(
                "claims must be a JSON object".to_owned(),
            ));
        }

        Ok(Self {
            ttl_minutes,
            max_uses,
            claims,
        })
    }

    /// Returns token lifetime in minutes.
    #[must_use]
    pub fn ttl_minutes(&self) -> u32 {
        self.ttl_minutes
    }

    /// Returns maximum redemption count.
    #[must_use]
    pub fn max_uses(&self) -> u32 {
        self.max_uses
    }

    /// Returns claims carried through to device registration.
    #[must_use]
    pub fn claims(&self) -> &Value {
        &self.claims
    }
}

/// Enrollment token record as persisted.
///
/// Only the SHA-256 hash of the token value is stored; the raw value is
/// returned exactly once at issue time. Rows are never deleted so that
/// exhausted and expired tokens remain visible for audit.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentToken {
    /// Token identifier.
    pub id: Uuid,
    /// SHA-256 hash of the raw token value.
    pub token_hash: String,
    /// Expiry timestamp; redemption at or after this instant fails.
    pub expires_at: DateTime<Utc>,
    /// Redemptions remaining. Only ever decreases, never below zero.
    pub uses_remaining: i32,
    /// Subject that issued the token.
    pub created_by: String,
    /// Opaque claims carried through to registration.
    pub claims: Value,
}

impl EnrollmentToken {
    /// Returns whether the token is past its expiry at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Returns whether the token has no redemptions remaining.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.uses_remaining <= 0
    }
}
