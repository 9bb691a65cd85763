//! Pure translation of a blueprint into an ordered, OS-specific action plan.
//!
//! The planner is descriptive only: it never touches a device, invokes a
//! webhook, or performs I/O. Execution of the plan belongs to an external
//! agent.

use serde_json::Value;

use crate::blueprint::Blueprint;

/// OS classification used to select a planning variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    /// Any identifier containing "windows".
    Windows,
    /// Exactly one of macos, darwin, linux.
    Unix,
    /// Everything else: mobile, IoT, unknown identifiers.
    RemoteManaged,
}

impl OsFamily {
    /// Classifies an OS identifier, case-insensitively.
    ///
    /// Unknown identifiers never fail classification; they degrade to
    /// [`OsFamily::RemoteManaged`].
    #[must_use]
    pub fn classify(os_type: &str) -> Self {
        let lowered = os_type.to_lowercase();
        if lowered.contains("windows") {
            return Self::Windows;
        }

        if matches!(lowered.as_str(), "macos" | "darwin" | "linux") {
            return Self::Unix;
        }

        Self::RemoteManaged
    }
}

/// Result of planning one blueprint against one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionPlan {
    /// Whether planning succeeded. Always true in the current design:
    /// no validation failure path is modeled yet.
    pub ok: bool,
    /// Ordered, descriptive provisioning actions.
    pub actions: Vec<String>,
    /// Failure message when `ok` is false.
    pub error: Option<String>,
}

impl ProvisionPlan {
    fn succeeded(actions: Vec<String>) -> Self {
        Self {
            ok: true,
            actions,
            error: None,
        }
    }
}

/// Plans provisioning actions for one device.
///
/// `facts` is accepted for parity with the registration contract; no
/// current variant consumes it.
#[must_use]
pub fn plan(os_type: &str, blueprint: &Blueprint, facts: &Value) -> ProvisionPlan {
    match OsFamily::classify(os_type) {
        OsFamily::Windows => plan_windows(blueprint, facts),
        OsFamily::Unix => plan_unix(blueprint, facts),
        OsFamily::RemoteManaged => plan_remote_managed(blueprint, facts),
    }
}

fn plan_windows(blueprint: &Blueprint, _facts: &Value) -> ProvisionPlan {
    let mut actions = Vec::new();

    if !blueprint.packages.choco.is_empty() {
        actions.push(format!(
            "choco install {} -y",
            blueprint.packages.choco.join(" ")
        ));
    }

    for user in &blueprint.users.local {
        actions.push(format!("powershell.exe New-LocalUser {}", user.name));
    }

    ProvisionPlan::succeeded(actions)
}

fn plan_unix(blueprint: &Blueprint, _facts: &Value) -> ProvisionPlan {
    let mut actions = Vec::new();

    let packages = if blueprint.packages.brew.is_empty() {
        &blueprint.packages.apt
    } else {
        &blueprint.packages.brew
    };
    if !packages.is_empty() {
        actions.push(format!("install packages: {}", packages.join(" ")));
    }

    for (path, content) in &blueprint.files {
        // Plans end up in run step logs; record the content length, never
        // the content itself.
        actions.push(format!(
            "write file {path} ({} chars)",
            content_length(content)
        ));
    }

    ProvisionPlan::succeeded(actions)
}

fn plan_remote_managed(blueprint: &Blueprint, _facts: &Value) -> ProvisionPlan {
    let mut actions = Vec::new();

    if let Some(webhook) = &blueprint.security.mdm_webhook {
        actions.push(format!("invoke webhook {webhook}"));
    }

    ProvisionPlan::succeeded(actions)
}

fn content_length(content: &Value) -> usize {
    match content {
        Value::String(text) => text.chars().count(),
        other => other.to_string().len(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;
    use uuid::Uuid;

    use crate::blueprint::{
        Blueprint, BlueprintInput, LocalUserSpec, PackageManifest, SecurityManifest, UserManifest,
    };

    use super::{plan, OsFamily};

    fn blueprint(input: BlueprintInput) -> Blueprint {
        Blueprint::with_id(Uuid::new_v4(), input).unwrap_or_else(|_| unreachable!())
    }

    fn base_input() -> BlueprintInput {
        BlueprintInput {
            name: "workstation-baseline".to_owned(),
            description: String::new(),
            os_targets: Vec::new(),
            packages: PackageManifest::default(),
            files: BTreeMap::new(),
            users: UserManifest::default(),
            security: SecurityManifest::default(),
        }
    }

    #[test]
    fn classification_is_case_insensitive_and_priority_ordered() {
        assert_eq!(OsFamily::classify("Windows 11 Pro"), OsFamily::Windows);
        assert_eq!(OsFamily::classify("WINDOWS"), OsFamily::Windows);
        assert_eq!(OsFamily::classify("Darwin"), OsFamily::Unix);
        assert_eq!(OsFamily::classify("LINUX"), OsFamily::Unix);
        assert_eq!(OsFamily::classify("ChromeOS"), OsFamily::RemoteManaged);
        assert_eq!(OsFamily::classify("ubuntu"), OsFamily::RemoteManaged);
    }

    #[test]
    fn windows_plan_installs_packages_and_creates_users() {
        let mut input = base_input();
        input.packages.choco = vec!["git".to_owned()];
        input.users.local = vec![LocalUserSpec {
            name: "svc".to_owned(),
        }];

        let result = plan("Windows 11 Pro", &blueprint(input), &json!({}));

        assert!(result.ok);
        assert_eq!(result.actions.len(), 2);
        assert!(result.actions[0].contains("git"));
        assert!(result.actions[1].contains("svc"));
    }

    #[test]
    fn unix_plan_falls_back_to_apt_when_brew_is_empty() {
        let mut input = base_input();
        input.packages.apt = vec!["curl".to_owned(), "jq".to_owned()];

        let result = plan("linux", &blueprint(input), &json!({}));

        assert!(result.ok);
        assert_eq!(result.actions, vec!["install packages: curl jq"]);
    }

    #[test]
    fn unix_plan_prefers_brew_over_apt() {
        let mut input = base_input();
        input.packages.brew = vec!["ripgrep".to_owned()];
        input.packages.apt = vec!["curl".to_owned()];

        let result = plan("macos", &blueprint(input), &json!({}));

        assert_eq!(result.actions, vec!["install packages: ripgrep"]);
    }

    #[test]
    fn unix_plan_annotates_file_length_without_content() {
        let mut input = base_input();
        input
            .files
            .insert("/etc/motd".to_owned(), json!("managed by zeroline"));

        let result = plan("linux", &blueprint(input), &json!({}));

        assert_eq!(result.actions, vec!["write file /etc/motd (19 chars)"]);
        assert!(!result.actions[0].contains("managed by"));
    }

    #[test]
    fn remote_managed_plan_invokes_webhook_when_configured() {
        let mut input = base_input();
        input.security.mdm_webhook = Some("https://mdm.example.com/hook".to_owned());

        let result = plan("iOS", &blueprint(input), &json!({}));

        assert_eq!(
            result.actions,
            vec!["invoke webhook https://mdm.example.com/hook"]
        );
    }

    #[test]
    fn unknown_os_with_empty_security_yields_empty_plan() {
        let result = plan("ChromeOS", &blueprint(base_input()), &json!({}));

        assert!(result.ok);
        assert!(result.actions.is_empty());
    }
}
