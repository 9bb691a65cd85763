use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use zeroline_core::{AppError, AppResult};

/// Lifecycle status of one managed device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    /// Known but not yet enrolled.
    Pending,
    /// Registered through a redeemed enrollment token.
    Enrolled,
    /// A workflow run is queued or executing for this device.
    Provisioning,
    /// Last workflow run applied its plan successfully.
    Provisioned,
    /// Last workflow run failed.
    Error,
}

impl DeviceStatus {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Enrolled => "enrolled",
            Self::Provisioning => "provisioning",
            Self::Provisioned => "provisioned",
            Self::Error => "error",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "pending" => Ok(Self::Pending),
            "enrolled" => Ok(Self::Enrolled),
            "provisioning" => Ok(Self::Provisioning),
            "provisioned" => Ok(Self::Provisioned),
            "error" => Ok(Self::Error),
            _ => Err(AppError::Validation(format!(
                "unknown device status '{value}'"
            ))),
        }
    }
}

/// Registered device record.
///
/// Hostname carries no uniqueness constraint: a re-imaged machine
/// re-enrolls with a fresh token and becomes a new record.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    /// Device identifier.
    pub id: Uuid,
    /// Hostname reported at registration.
    pub hostname: String,
    /// Operating system identifier reported at registration.
    pub os_type: String,
    /// CPU architecture reported at registration.
    pub arch: String,
    /// Lifecycle status.
    pub status: DeviceStatus,
    /// Opaque facts supplied at registration.
    pub facts: Value,
    /// Assigned blueprint, when the registration facts carried one.
    pub blueprint_id: Option<Uuid>,
    /// Enrollment token consumed at registration.
    pub enrollment_token_id: Option<Uuid>,
    /// Last contact timestamp.
    pub last_seen: Option<DateTime<Utc>>,
}
