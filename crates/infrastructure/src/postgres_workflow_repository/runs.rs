use super::*;

impl PostgresWorkflowRepository {
    pub(super) async fn create_run_impl(&self, input: CreateRunInput) -> AppResult<WorkflowRun> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to start workflow run creation transaction: {error}"
            ))
        })?;

        let row = sqlx::query_as::<_, WorkflowRunRow>(&format!(
            r#"
            INSERT INTO workflow_runs (device_id, blueprint_id, status, steps)
            VALUES ($1, $2, 'queued', '[]'::JSONB)
            RETURNING {RUN_COLUMNS}
            "#
        ))
        .bind(input.device_id)
        .bind(input.blueprint_id)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to create workflow run for device '{}': {error}",
                input.device_id
            ))
        })?;

        sqlx::query("UPDATE devices SET status = 'provisioning' WHERE id = $1")
            .bind(input.device_id)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to mark device '{}' provisioning: {error}",
                    input.device_id
                ))
            })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to commit workflow run creation transaction: {error}"
            ))
        })?;

        workflow_run_from_row(row)
    }

    pub(super) async fn find_run_impl(&self, run_id: Uuid) -> AppResult<Option<WorkflowRun>> {
        let row = sqlx::query_as::<_, WorkflowRunRow>(&format!(
            "SELECT {RUN_COLUMNS} FROM workflow_runs WHERE id = $1"
        ))
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find workflow run '{run_id}': {error}"))
        })?;

        row.map(workflow_run_from_row).transpose()
    }

    pub(super) async fn mark_run_provisioning_impl(&self, run_id: Uuid) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE workflow_runs
            SET status = 'provisioning', updated_at = now()
            WHERE id = $1 AND status = 'queued'
            "#,
        )
        .bind(run_id)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to mark workflow run '{run_id}' provisioning: {error}"
            ))
        })?;

        Ok(())
    }

    pub(super) async fn finalize_run_impl(
        &self,
        input: FinalizeRunInput,
    ) -> AppResult<WorkflowRun> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to start workflow run finalization transaction: {error}"
            ))
        })?;

        let row = sqlx::query_as::<_, WorkflowRunRow>(&format!(
            r#"
            UPDATE workflow_runs
            SET
                status = $2,
                steps = $3,
                last_error = $4,
                updated_at = now()
            WHERE id = $1
            RETURNING {RUN_COLUMNS}
            "#
        ))
        .bind(input.run_id)
        .bind(input.status.as_str())
        .bind(run_steps_to_json(&input.steps)?)
        .bind(input.last_error)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to finalize workflow run '{}': {error}",
                input.run_id
            ))
        })?;

        if let Some(device_status) = input.device_status {
            sqlx::query("UPDATE devices SET status = $2 WHERE id = $1")
                .bind(row.device_id)
                .bind(device_status.as_str())
                .execute(&mut *transaction)
                .await
                .map_err(|error| {
                    AppError::Internal(format!(
                        "failed to update device '{}' status during run finalization: {error}",
                        row.device_id
                    ))
                })?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to commit workflow run finalization transaction: {error}"
            ))
        })?;

        workflow_run_from_row(row)
    }
}
