use super::*;

impl WorkflowService {
    /// Claims queued provisioning jobs for one worker.
    pub async fn claim_jobs_for_worker(
        &self,
        worker_id: &str,
        limit: usize,
        lease_seconds: u32,
    ) -> AppResult<Vec<ClaimedJob>> {
        if worker_id.trim().is_empty() {
            return Err(AppError::Validation(
                "worker_id must not be empty".to_owned(),
            ));
        }

        if limit == 0 {
            return Err(AppError::Validation(
                "limit must be greater than zero".to_owned(),
            ));
        }

        if lease_seconds == 0 {
            return Err(AppError::Validation(
                "lease_seconds must be greater than zero".to_owned(),
            ));
        }

        self.repository
            .claim_jobs(worker_id, limit, lease_seconds)
            .await
    }

    /// Stores one worker heartbeat snapshot for queue observability.
    pub async fn heartbeat_worker(
        &self,
        worker_id: &str,
        input: WorkerHeartbeatInput,
    ) -> AppResult<()> {
        if worker_id.trim().is_empty() {
            return Err(AppError::Validation(
                "worker_id must not be empty".to_owned(),
            ));
        }

        self.repository
            .upsert_worker_heartbeat(worker_id, input)
            .await
    }

    /// Returns queue and worker heartbeat stats for operations.
    pub async fn queue_stats(&self, active_window_seconds: u32) -> AppResult<QueueStats> {
        if active_window_seconds == 0 {
            return Err(AppError::Validation(
                "active_window_seconds must be greater than zero".to_owned(),
            ));
        }

        if self.queue_stats_cache_ttl_seconds > 0
            && let Some(cache) = &self.queue_stats_cache
            && let Some(stats) = cache.get_queue_stats(active_window_seconds).await?
        {
            return Ok(stats);
        }

        let stats = self.repository.queue_stats(active_window_seconds).await?;

        if self.queue_stats_cache_ttl_seconds > 0
            && let Some(cache) = &self.queue_stats_cache
        {
            cache
                .set_queue_stats(active_window_seconds, stats, self.queue_stats_cache_ttl_seconds)
                .await?;
        }

        Ok(stats)
    }
}
