use serde::{Deserialize, Serialize};

/// Stable audit actions emitted by application use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when an enrollment token is issued.
    TokenIssued,
    /// Emitted when a device registers through a redeemed token.
    DeviceRegistered,
    /// Emitted when a blueprint is created.
    BlueprintCreated,
    /// Emitted when a blueprint is updated.
    BlueprintUpdated,
    /// Emitted when a blueprint is deleted.
    BlueprintDeleted,
    /// Emitted when a workflow run is queued.
    WorkflowRunStarted,
    /// Emitted when a workflow run reaches a terminal state.
    WorkflowRunFinished,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TokenIssued => "enrollment.token.issued",
            Self::DeviceRegistered => "device.registered",
            Self::BlueprintCreated => "blueprint.created",
            Self::BlueprintUpdated => "blueprint.updated",
            Self::BlueprintDeleted => "blueprint.deleted",
            Self::WorkflowRunStarted => "workflow.run.started",
            Self::WorkflowRunFinished => "workflow.run.finished",
        }
    }
}
