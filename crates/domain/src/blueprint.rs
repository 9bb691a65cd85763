use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use zeroline_core::{AppResult, NonEmptyString};

/// Package lists per package manager.
///
/// Unrecognized manager keys are rejected at deserialization instead of
/// being carried along silently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageManifest {
    /// Chocolatey packages for Windows targets.
    pub choco: Vec<String>,
    /// Homebrew packages for macOS/Linux targets.
    pub brew: Vec<String>,
    /// Apt packages, used when no brew packages are listed.
    pub apt: Vec<String>,
}

/// One local account to create on a Windows target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalUserSpec {
    /// Account name.
    pub name: String,
}

/// Accounts to materialize on the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UserManifest {
    /// Local accounts (Windows variant only).
    pub local: Vec<LocalUserSpec>,
}

/// Security-related settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityManifest {
    /// MDM webhook invoked for remote-managed device classes.
    pub mdm_webhook: Option<String>,
}

/// Declarative target-state document for a device class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    /// Blueprint identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// OS identifiers this blueprint targets.
    pub os_targets: Vec<String>,
    /// Packages to install.
    pub packages: PackageManifest,
    /// Files to write, keyed by target path.
    pub files: BTreeMap<String, Value>,
    /// Accounts to create.
    pub users: UserManifest,
    /// Security settings.
    pub security: SecurityManifest,
}

/// Input payload used to construct a validated blueprint.
#[derive(Debug, Clone, PartialEq)]
pub struct BlueprintInput {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// OS identifiers this blueprint targets.
    pub os_targets: Vec<String>,
    /// Packages to install.
    pub packages: PackageManifest,
    /// Files to write, keyed by target path.
    pub files: BTreeMap<String, Value>,
    /// Accounts to create.
    pub users: UserManifest,
    /// Security settings.
    pub security: SecurityManifest,
}

impl Blueprint {
    /// Creates a validated blueprint with a fresh identifier.
    pub fn new(input: BlueprintInput) -> AppResult<Self> {
        Self::with_id(Uuid::new_v4(), input)
    }

    /// Creates a validated blueprint with a known identifier.
    pub fn with_id(id: Uuid, input: BlueprintInput) -> AppResult<Self> {
        let name = NonEmptyString::new(input.name)?;

        Ok(Self {
            id,
            name: name.into(),
            description: input.description,
            os_targets: input.os_targets,
            packages: input.packages,
            files: input.files,
            users: input.users,
            security: input.security,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Blueprint, BlueprintInput, PackageManifest, SecurityManifest, UserManifest};

    #[test]
    fn blueprint_requires_a_name() {
        let blueprint = Blueprint::new(BlueprintInput {
            name: "  ".to_owned(),
            description: String::new(),
            os_targets: Vec::new(),
            packages: PackageManifest::default(),
            files: Default::default(),
            users: UserManifest::default(),
            security: SecurityManifest::default(),
        });

        assert!(blueprint.is_err());
    }

    #[test]
    fn package_manifest_rejects_unknown_manager() {
        let parsed: Result<PackageManifest, _> =
            serde_json::from_value(json!({"choco": ["git"], "winget": ["7zip"]}));
        assert!(parsed.is_err());
    }

    #[test]
    fn user_manifest_rejects_unknown_account_fields() {
        let parsed: Result<UserManifest, _> =
            serde_json::from_value(json!({"local": [{"name": "svc", "password": "hunter2"}]}));
        assert!(parsed.is_err());
    }

    #[test]
    fn security_manifest_defaults_to_no_webhook() {
        let parsed: Result<SecurityManifest, _> = serde_json::from_value(json!({}));
        assert!(parsed.is_ok());
        assert_eq!(parsed.unwrap_or_default().mdm_webhook, None);
    }
}
