use std::sync::Arc;

use uuid::Uuid;
use zeroline_core::{AppError, AppResult};
use zeroline_domain::{AuditAction, Blueprint, BlueprintInput};

use crate::ports::{AuditEvent, AuditRepository, BlueprintRepository};

/// Application service for blueprint management.
#[derive(Clone)]
pub struct BlueprintService {
    repository: Arc<dyn BlueprintRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl BlueprintService {
    /// Creates a blueprint service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn BlueprintRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            repository,
            audit_repository,
        }
    }

    /// Creates one blueprint.
    pub async fn create_blueprint(&self, input: BlueprintInput) -> AppResult<Blueprint> {
        let blueprint = Blueprint::new(input)?;
        let blueprint = self.repository.create_blueprint(blueprint).await?;

        self.append_audit(AuditAction::BlueprintCreated, &blueprint)
            .await?;

        Ok(blueprint)
    }

    /// Lists all blueprints.
    pub async fn list_blueprints(&self) -> AppResult<Vec<Blueprint>> {
        self.repository.list_blueprints().await
    }

    /// Returns one blueprint by identifier.
    pub async fn get_blueprint(&self, blueprint_id: Uuid) -> AppResult<Blueprint> {
        self.repository
            .find_blueprint(blueprint_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("blueprint '{blueprint_id}' not found")))
    }

    /// Replaces one existing blueprint.
    ///
    /// In-flight workflow runs referencing the blueprint are not
    /// retroactively affected; they read whatever state exists when the
    /// worker loads it.
    pub async fn update_blueprint(
        &self,
        blueprint_id: Uuid,
        input: BlueprintInput,
    ) -> AppResult<Blueprint> {
        let blueprint = Blueprint::with_id(blueprint_id, input)?;
        let blueprint = self
            .repository
            .update_blueprint(blueprint)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("blueprint '{blueprint_id}' not found")))?;

        self.append_audit(AuditAction::BlueprintUpdated, &blueprint)
            .await?;

        Ok(blueprint)
    }

    /// Deletes one blueprint.
    pub async fn delete_blueprint(&self, blueprint_id: Uuid) -> AppResult<()> {
        let blueprint = self.get_blueprint(blueprint_id).await?;

        let deleted = self.repository.delete_blueprint(blueprint_id).await?;
        if !deleted {
            return Err(AppError::NotFound(format!(
                "blueprint '{blueprint_id}' not found"
            )));
        }

        self.append_audit(AuditAction::BlueprintDeleted, &blueprint)
            .await?;

        Ok(())
    }

    async fn append_audit(&self, action: AuditAction, blueprint: &Blueprint) -> AppResult<()> {
        self.audit_repository
            .append_event(AuditEvent {
                actor: "api".to_owned(),
                action,
                target_type: "blueprint".to_owned(),
                target_id: blueprint.id.to_string(),
                message: blueprint.name.clone(),
            })
            .await
    }
}
