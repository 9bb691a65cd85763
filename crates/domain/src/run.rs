use serde::{Deserialize, Serialize};
use zeroline_core::{AppError, AppResult};

/// Workflow run state machine.
///
/// `Queued` is the initial state; `Completed` and `Failed` are terminal
/// and a run is never reopened after reaching either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowRunStatus {
    /// Persisted and waiting for a worker.
    Queued,
    /// Claimed by a worker and executing.
    Provisioning,
    /// Plan produced (and, for non-dry runs, recorded for application).
    Completed,
    /// Execution failed; failures are terminal, no retry is attempted.
    Failed,
}

impl WorkflowRunStatus {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Provisioning => "provisioning",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "queued" => Ok(Self::Queued),
            "provisioning" => Ok(Self::Provisioning),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(AppError::Validation(format!(
                "unknown workflow run status '{value}'"
            ))),
        }
    }

    /// Returns whether the state admits no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Outcome of one recorded run step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step finished successfully.
    Ok,
    /// Step failed; the run terminates in `Failed`.
    Failed,
}

/// One recorded step inside a workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStep {
    /// Step name, e.g. `fetch_blueprint`, `plan`, `apply`, `error`.
    pub name: String,
    /// Step outcome.
    pub status: StepStatus,
    /// Detail lines: planned actions, or a failure message.
    pub detail: Vec<String>,
}

impl RunStep {
    /// Creates a successful step record.
    #[must_use]
    pub fn ok(name: impl Into<String>, detail: Vec<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Ok,
            detail,
        }
    }

    /// Creates a failed step record carrying the failure message.
    #[must_use]
    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Failed,
            detail: vec![message.into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::WorkflowRunStatus;

    #[test]
    fn status_roundtrips_storage_value() {
        for status in [
            WorkflowRunStatus::Queued,
            WorkflowRunStatus::Provisioning,
            WorkflowRunStatus::Completed,
            WorkflowRunStatus::Failed,
        ] {
            let parsed = WorkflowRunStatus::parse(status.as_str());
            assert!(parsed.is_ok());
            assert_eq!(parsed.unwrap_or(WorkflowRunStatus::Queued), status);
        }
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(!WorkflowRunStatus::Queued.is_terminal());
        assert!(!WorkflowRunStatus::Provisioning.is_terminal());
        assert!(WorkflowRunStatus::Completed.is_terminal());
        assert!(WorkflowRunStatus::Failed.is_terminal());
    }
}
