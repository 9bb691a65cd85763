use zeroline_application::{BlueprintService, DeviceService, EnrollmentService, WorkflowService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub enrollment_service: EnrollmentService,
    pub device_service: DeviceService,
    pub blueprint_service: BlueprintService,
    pub workflow_service: WorkflowService,
    pub api_key: String,
}
