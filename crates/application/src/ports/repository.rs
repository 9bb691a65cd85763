use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;
use zeroline_core::AppResult;
use zeroline_domain::{Blueprint, Device, EnrollmentToken};

/// Insert payload for one enrollment token.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEnrollmentToken {
    /// SHA-256 hash of the raw token value.
    pub token_hash: String,
    /// Expiry timestamp.
    pub expires_at: DateTime<Utc>,
    /// Initial redemption budget.
    pub uses_remaining: i32,
    /// Subject that issued the token.
    pub created_by: String,
    /// Opaque claims carried through to registration.
    pub claims: Value,
}

/// Insert payload for one device created during token redemption.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDevice {
    /// Hostname reported by the enrolling device.
    pub hostname: String,
    /// OS identifier reported by the enrolling device.
    pub os_type: String,
    /// CPU architecture reported by the enrolling device.
    pub arch: String,
    /// Opaque facts supplied at registration.
    pub facts: Value,
    /// Blueprint reference extracted from the facts, when present.
    pub blueprint_id: Option<Uuid>,
    /// Token being redeemed.
    pub enrollment_token_id: Uuid,
}

/// Repository port for enrollment token persistence.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Stores one freshly issued token.
    async fn create_token(&self, token: NewEnrollmentToken) -> AppResult<EnrollmentToken>;

    /// Looks up one token by the hash of its raw value.
    async fn find_token_by_hash(&self, token_hash: &str) -> AppResult<Option<EnrollmentToken>>;

    /// Atomically decrements `uses_remaining` and creates the device in
    /// the same transaction.
    ///
    /// The decrement is guarded: it only applies while the token is
    /// unexpired with uses remaining. Returns `None` when the guard
    /// matched no row, i.e. a concurrent redemption won the race — the
    /// caller maps that to an exhaustion error and no device exists.
    async fn redeem_token_and_register_device(
        &self,
        token_hash: &str,
        device: NewDevice,
    ) -> AppResult<Option<Device>>;
}

/// Repository port for device reads.
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Lists all registered devices.
    async fn list_devices(&self) -> AppResult<Vec<Device>>;

    /// Returns one device by identifier.
    async fn find_device(&self, device_id: Uuid) -> AppResult<Option<Device>>;
}

/// Repository port for blueprint persistence.
#[async_trait]
pub trait BlueprintRepository: Send + Sync {
    /// Stores one new blueprint.
    async fn create_blueprint(&self, blueprint: Blueprint) -> AppResult<Blueprint>;

    /// Lists all blueprints.
    async fn list_blueprints(&self) -> AppResult<Vec<Blueprint>>;

    /// Returns one blueprint by identifier.
    async fn find_blueprint(&self, blueprint_id: Uuid) -> AppResult<Option<Blueprint>>;

    /// Replaces one existing blueprint, returning `None` when absent.
    async fn update_blueprint(&self, blueprint: Blueprint) -> AppResult<Option<Blueprint>>;

    /// Deletes one blueprint, returning whether a row existed.
    async fn delete_blueprint(&self, blueprint_id: Uuid) -> AppResult<bool>;
}
