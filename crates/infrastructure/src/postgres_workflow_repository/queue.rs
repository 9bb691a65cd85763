use super::*;

impl PostgresWorkflowRepository {
    pub(super) async fn enqueue_job_impl(&self, run_id: Uuid, dry_run: bool) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO provisioning_jobs (run_id, dry_run, status)
            VALUES ($1, $2, 'pending')
            ON CONFLICT (run_id)
            DO NOTHING
            "#,
        )
        .bind(run_id)
        .bind(dry_run)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to enqueue provisioning job for run '{run_id}': {error}"
            ))
        })?;

        Ok(())
    }

    pub(super) async fn claim_jobs_impl(
        &self,
        worker_id: &str,
        limit: usize,
        lease_seconds: u32,
    ) -> AppResult<Vec<ClaimedJob>> {
        let claim_rows = sqlx::query_as::<_, ClaimedJobRow>(
            r#"
            WITH candidate_jobs AS (
                SELECT id
                FROM provisioning_jobs
                WHERE (
                        status = 'pending'
                        OR (status = 'leased' AND lease_expires_at < now())
                      )
                ORDER BY created_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE provisioning_jobs jobs
            SET
                status = 'leased',
                leased_by = $2,
                lease_token = gen_random_uuid()::TEXT,
                lease_expires_at = now() + make_interval(secs => $3::INT),
                updated_at = now(),
                last_error = NULL
            FROM candidate_jobs
            WHERE jobs.id = candidate_jobs.id
            RETURNING jobs.id AS job_id, jobs.run_id, jobs.dry_run, jobs.lease_token
            "#,
        )
        .bind(i64::try_from(limit).map_err(|error| {
            AppError::Validation(format!("invalid provisioning claim limit: {error}"))
        })?)
        .bind(worker_id)
        .bind(i32::try_from(lease_seconds).map_err(|error| {
            AppError::Validation(format!("invalid provisioning lease_seconds: {error}"))
        })?)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to claim provisioning jobs for worker '{worker_id}': {error}"
            ))
        })?;

        Ok(claim_rows.into_iter().map(claimed_job_from_row).collect())
    }

    pub(super) async fn complete_job_impl(
        &self,
        job_id: Uuid,
        worker_id: &str,
        lease_token: &str,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE provisioning_jobs
            SET
                status = 'completed',
                leased_by = NULL,
                lease_token = NULL,
                lease_expires_at = NULL,
                updated_at = now()
            WHERE id = $1
              AND leased_by = $2
              AND lease_token = $3
              AND status = 'leased'
            "#,
        )
        .bind(job_id)
        .bind(worker_id)
        .bind(lease_token)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to complete provisioning job '{job_id}' for worker '{worker_id}': {error}"
            ))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "provisioning job '{job_id}' is not currently leased by worker '{worker_id}' with matching lease token"
            )));
        }

        Ok(())
    }

    pub(super) async fn fail_job_impl(
        &self,
        job_id: Uuid,
        worker_id: &str,
        lease_token: &str,
        error_message: &str,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE provisioning_jobs
            SET
                status = 'failed',
                leased_by = NULL,
                lease_token = NULL,
                lease_expires_at = NULL,
                updated_at = now(),
                last_error = $4
            WHERE id = $1
              AND leased_by = $2
              AND lease_token = $3
              AND status = 'leased'
            "#,
        )
        .bind(job_id)
        .bind(worker_id)
        .bind(lease_token)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to mark provisioning job '{job_id}' as failed for worker '{worker_id}': {error}"
            ))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "provisioning job '{job_id}' is not currently leased by worker '{worker_id}' with matching lease token"
            )));
        }

        Ok(())
    }

    pub(super) async fn upsert_worker_heartbeat_impl(
        &self,
        worker_id: &str,
        input: WorkerHeartbeatInput,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO worker_heartbeats (
                worker_id,
                last_seen_at,
                last_claimed_jobs,
                last_executed_jobs,
                last_failed_jobs,
                updated_at
            )
            VALUES ($1, now(), $2, $3, $4, now())
            ON CONFLICT (worker_id)
            DO UPDATE SET
                last_seen_at = now(),
                last_claimed_jobs = EXCLUDED.last_claimed_jobs,
                last_executed_jobs = EXCLUDED.last_executed_jobs,
                last_failed_jobs = EXCLUDED.last_failed_jobs,
                updated_at = now()
            "#,
        )
        .bind(worker_id)
        .bind(i64::from(input.claimed_jobs))
        .bind(i64::from(input.executed_jobs))
        .bind(i64::from(input.failed_jobs))
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to upsert worker heartbeat for '{worker_id}': {error}"
            ))
        })?;

        Ok(())
    }

    pub(super) async fn queue_stats_impl(
        &self,
        active_window_seconds: u32,
    ) -> AppResult<QueueStats> {
        let queue_stats = sqlx::query_as::<_, QueueStatsRow>(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0) AS pending_jobs,
                COALESCE(SUM(CASE WHEN status = 'leased' THEN 1 ELSE 0 END), 0) AS leased_jobs,
                COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0) AS completed_jobs,
                COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0) AS failed_jobs,
                COALESCE(
                    SUM(
                        CASE
                            WHEN status = 'leased' AND lease_expires_at < now() THEN 1
                            ELSE 0
                        END
                    ),
                    0
                ) AS expired_leases
            FROM provisioning_jobs
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load provisioning queue stats: {error}"))
        })?;

        let active_workers = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM worker_heartbeats
            WHERE last_seen_at >= now() - make_interval(secs => $1::INT)
            "#,
        )
        .bind(i32::try_from(active_window_seconds).map_err(|error| {
            AppError::Validation(format!("invalid active heartbeat window: {error}"))
        })?)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load active worker stats: {error}"))
        })?;

        Ok(QueueStats {
            pending_jobs: queue_stats.pending_jobs,
            leased_jobs: queue_stats.leased_jobs,
            completed_jobs: queue_stats.completed_jobs,
            failed_jobs: queue_stats.failed_jobs,
            expired_leases: queue_stats.expired_leases,
            active_workers,
        })
    }
}
