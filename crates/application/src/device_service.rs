use std::sync::Arc;

use uuid::Uuid;
use zeroline_core::{AppError, AppResult};
use zeroline_domain::Device;

use crate::ports::DeviceRepository;

/// Read-side service over registered devices.
#[derive(Clone)]
pub struct DeviceService {
    repository: Arc<dyn DeviceRepository>,
}

impl DeviceService {
    /// Creates a device service.
    #[must_use]
    pub fn new(repository: Arc<dyn DeviceRepository>) -> Self {
        Self { repository }
    }

    /// Lists all registered devices.
    pub async fn list_devices(&self) -> AppResult<Vec<Device>> {
        self.repository.list_devices().await
    }

    /// Returns one device by identifier.
    pub async fn get_device(&self, device_id: Uuid) -> AppResult<Device> {
        self.repository
            .find_device(device_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("device '{device_id}' not found")))
    }
}
