use async_trait::async_trait;
use zeroline_core::AppResult;
use zeroline_domain::AuditAction;

/// Immutable audit event payload emitted by application services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Subject that performed the action (`api`, a hostname, `worker:<id>`).
    pub actor: String,
    /// Stable audit action identifier.
    pub action: AuditAction,
    /// Target resource type label.
    pub target_type: String,
    /// Target resource identifier.
    pub target_id: String,
    /// Human-readable detail line.
    pub message: String,
}

/// Port for persisting append-only audit events.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Persists one audit event. Entries are never mutated or deleted.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;
}
