//! Application services and ports.

#![forbid(unsafe_code)]

mod blueprint_service;
mod device_service;
mod enrollment_service;
mod ports;
mod workflow_service;

pub use blueprint_service::BlueprintService;
pub use device_service::DeviceService;
pub use enrollment_service::{
    EnrollmentService, IssueTokenInput, IssuedToken, RegisterDeviceInput,
};
pub use ports::{
    AuditEvent, AuditRepository, BlueprintRepository, ClaimedJob, CreateRunInput, DeviceRepository,
    FinalizeRunInput, NewDevice, NewEnrollmentToken, QueueStats, QueueStatsCache, TokenRepository,
    WorkerHeartbeatInput, WorkflowRepository, WorkflowRun,
};
pub use workflow_service::{StartRunInput, WorkflowService};
