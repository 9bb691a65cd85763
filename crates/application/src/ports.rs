mod audit;
mod cache;
mod repository;
mod workflow;

pub use audit::{AuditEvent, AuditRepository};
pub use cache::QueueStatsCache;
pub use repository::{
    BlueprintRepository, DeviceRepository, NewDevice, NewEnrollmentToken, TokenRepository,
};
pub use workflow::{
    ClaimedJob, CreateRunInput, FinalizeRunInput, QueueStats, WorkerHeartbeatInput,
    WorkflowRepository, WorkflowRun,
};
