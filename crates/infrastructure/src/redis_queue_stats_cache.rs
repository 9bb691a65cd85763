//! Redis-backed provisioning queue stats cache.

use async_trait::async_trait;
use redis::AsyncCommands;

use zeroline_application::{QueueStats, QueueStatsCache};
use zeroline_core::{AppError, AppResult};

/// Redis implementation of the queue stats cache port.
#[derive(Clone)]
pub struct RedisQueueStatsCache {
    client: redis::Client,
    key_prefix: String,
}

impl RedisQueueStatsCache {
    /// Creates a cache adapter with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn key_for(&self, active_window_seconds: u32) -> String {
        format!("{}:window={active_window_seconds}", self.key_prefix)
    }

    fn encode_stats(stats: QueueStats) -> String {
        format!(
            "{},{},{},{},{},{}",
            stats.pending_jobs,
            stats.leased_jobs,
            stats.completed_jobs,
            stats.failed_jobs,
            stats.expired_leases,
            stats.active_workers
        )
    }

    fn decode_stats(value: &str) -> AppResult<QueueStats> {
        let parts: Vec<&str> = value.split(',').collect();
        if parts.len() != 6 {
            return Err(AppError::Internal(format!(
                "invalid queue stats cache value '{value}'"
            )));
        }

        Ok(QueueStats {
            pending_jobs: parse_metric(parts[0], "pending_jobs")?,
            leased_jobs: parse_metric(parts[1], "leased_jobs")?,
            completed_jobs: parse_metric(parts[2], "completed_jobs")?,
            failed_jobs: parse_metric(parts[3], "failed_jobs")?,
            expired_leases: parse_metric(parts[4], "expired_leases")?,
            active_workers: parse_metric(parts[5], "active_workers")?,
        })
    }
}

#[async_trait]
impl QueueStatsCache for RedisQueueStatsCache {
    async fn get_queue_stats(
        &self,
        active_window_seconds: u32,
    ) -> AppResult<Option<QueueStats>> {
        let key = self.key_for(active_window_seconds);
        let mut connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))?;

        let encoded: Option<String> = connection.get(key).await.map_err(|error| {
            AppError::Internal(format!("failed to read queue stats cache entry: {error}"))
        })?;

        encoded.as_deref().map(Self::decode_stats).transpose()
    }

    async fn set_queue_stats(
        &self,
        active_window_seconds: u32,
        stats: QueueStats,
        ttl_seconds: u32,
    ) -> AppResult<()> {
        if ttl_seconds == 0 {
            return Ok(());
        }

        let key = self.key_for(active_window_seconds);
        let value = Self::encode_stats(stats);
        let mut connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))?;

        connection
            .set_ex(key, value, u64::from(ttl_seconds))
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to write queue stats cache entry: {error}"))
            })
    }
}

fn parse_metric(value: &str, metric_name: &str) -> AppResult<i64> {
    value.parse::<i64>().map_err(|error| {
        AppError::Internal(format!(
            "invalid queue stats cache field '{metric_name}' value '{value}': {error}"
        ))
    })
}
