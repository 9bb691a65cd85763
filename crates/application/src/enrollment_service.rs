//! Enrollment token lifecycle and device registration.
//!
//! Tokens are cryptographically random, stored as SHA-256 hashes,
//! time-limited, and budgeted to a fixed number of redemptions. Redeeming
//! a token and creating the device happen in one repository transaction
//! so a single-use token can never produce two devices.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;
use zeroline_core::{AppError, AppResult, NonEmptyString};
use zeroline_domain::{AuditAction, Device, TokenIssuance};

use crate::ports::{AuditEvent, AuditRepository, NewDevice, NewEnrollmentToken, TokenRepository};

mod token_crypto;

/// Issue request accepted from the API surface.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueTokenInput {
    /// Token lifetime in minutes.
    pub ttl_minutes: u32,
    /// Redemption budget.
    pub max_uses: u32,
    /// Opaque claims carried through to registration.
    pub claims: Value,
}

/// Issued token returned exactly once to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Raw token value; only its hash is retained at rest.
    pub token: String,
    /// Expiry timestamp.
    pub expires_at: chrono::DateTime<Utc>,
    /// Redemption budget.
    pub uses_remaining: i32,
    /// URL a device scans or opens to enroll. Rendering it as a QR code
    /// is the caller's concern.
    pub enrollment_url: String,
}

/// Registration request presented by an enrolling device.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterDeviceInput {
    /// Raw enrollment token value.
    pub token: String,
    /// Device hostname.
    pub hostname: String,
    /// Device OS identifier.
    pub os_type: String,
    /// Device CPU architecture.
    pub arch: String,
    /// Opaque facts; `blueprint_id` assigns a blueprint when present.
    pub facts: Value,
}

/// Application service for token issue and redeem-plus-register.
#[derive(Clone)]
pub struct EnrollmentService {
    token_repository: Arc<dyn TokenRepository>,
    audit_repository: Arc<dyn AuditRepository>,
    enrollment_base_url: String,
}

impl EnrollmentService {
    /// Creates an enrollment service.
    #[must_use]
    pub fn new(
        token_repository: Arc<dyn TokenRepository>,
        audit_repository: Arc<dyn AuditRepository>,
        enrollment_base_url: String,
    ) -> Self {
        Self {
            token_repository,
            audit_repository,
            enrollment_base_url,
        }
    }

    /// Issues one enrollment token and returns its raw value plus the
    /// enrollment URL embedding it.
    pub async fn issue_token(&self, input: IssueTokenInput) -> AppResult<IssuedToken> {
        let issuance = TokenIssuance::new(input.ttl_minutes, input.max_uses, input.claims)?;

        let (raw_token, token_hash) = token_crypto::generate_token()?;
        let expires_at = Utc::now() + chrono::Duration::minutes(i64::from(issuance.ttl_minutes()));

        let uses_remaining = i32::try_from(issuance.max_uses()).map_err(|error| {
            AppError::Validation(format!("invalid max_uses value: {error}"))
        })?;

        let token = self
            .token_repository
            .create_token(NewEnrollmentToken {
                token_hash,
                expires_at,
                uses_remaining,
                created_by: "api".to_owned(),
                claims: issuance.claims().clone(),
            })
            .await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor: "api".to_owned(),
                action: AuditAction::TokenIssued,
                target_type: "enrollment_token".to_owned(),
                target_id: token.id.to_string(),
                message: format!(
                    "ttl={} uses={}",
                    issuance.ttl_minutes(),
                    issuance.max_uses()
                ),
            })
            .await?;

        let enrollment_url = format!("{}/enroll?token={raw_token}", self.enrollment_base_url);

        Ok(IssuedToken {
            token: raw_token,
            expires_at: token.expires_at,
            uses_remaining: token.uses_remaining,
            enrollment_url,
        })
    }

    /// Redeems one enrollment token and registers the presenting device.
    ///
    /// Validation (absent, expired, exhausted) happens before any
    /// mutation; the decrement-and-register step is atomic, so a raced
    /// single-use token yields exactly one device and an exhaustion
    /// error for the loser.
    pub async fn redeem_token(&self, input: RegisterDeviceInput) -> AppResult<Device> {
        let hostname = NonEmptyString::new(input.hostname)?;
        let os_type = NonEmptyString::new(input.os_type)?;
        let arch = NonEmptyString::new(input.arch)?;

        if !input.facts.is_object() {
            return Err(AppError::Validation(
                "facts must be a JSON object".to_owned(),
            ));
        }

        let token_hash = token_crypto::hash_token(input.token.as_str());
        let token = self
            .token_repository
            .find_token_by_hash(token_hash.as_str())
            .await?
            .ok_or_else(|| AppError::NotFound("enrollment token not found".to_owned()))?;

        if token.is_expired(Utc::now()) {
            return Err(AppError::Expired("enrollment token is expired".to_owned()));
        }

        if token.is_exhausted() {
            return Err(AppError::Exhausted(
                "enrollment token has no uses remaining".to_owned(),
            ));
        }

        let blueprint_id = blueprint_reference(&input.facts)?;

        let device = self
            .token_repository
            .redeem_token_and_register_device(
                token_hash.as_str(),
                NewDevice {
                    hostname: hostname.into(),
                    os_type: os_type.into(),
                    arch: arch.into(),
                    facts: input.facts,
                    blueprint_id,
                    enrollment_token_id: token.id,
                },
            )
            .await?
            .ok_or_else(|| {
                // The guarded decrement matched no row: a concurrent
                // redemption spent the last use between the read above
                // and the write.
                AppError::Exhausted("enrollment token has no uses remaining".to_owned())
            })?;

        self.audit_repository
            .append_event(AuditEvent {
                actor: device.hostname.clone(),
                action: AuditAction::DeviceRegistered,
                target_type: "device".to_owned(),
                target_id: device.id.to_string(),
                message: format!("os={} arch={}", device.os_type, device.arch),
            })
            .await?;

        Ok(device)
    }
}

/// Extracts an optional blueprint assignment from registration facts.
fn blueprint_reference(facts: &Value) -> AppResult<Option<Uuid>> {
    let Some(raw) = facts.get("blueprint_id") else {
        return Ok(None);
    };

    let raw = raw.as_str().ok_or_else(|| {
        AppError::Validation("facts.blueprint_id must be a string".to_owned())
    })?;

    let blueprint_id = Uuid::parse_str(raw).map_err(|error| {
        AppError::Validation(format!("facts.blueprint_id is not a valid UUID: {error}"))
    })?;

    Ok(Some(blueprint_id))
}
