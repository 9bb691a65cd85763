use async_trait::async_trait;
use zeroline_core::AppResult;

use super::workflow::QueueStats;

/// Port for short-lived caching of aggregate queue stats.
#[async_trait]
pub trait QueueStatsCache: Send + Sync {
    /// Returns cached stats for one heartbeat window, when fresh.
    async fn get_queue_stats(&self, active_window_seconds: u32)
    -> AppResult<Option<QueueStats>>;

    /// Stores stats for one heartbeat window with a TTL.
    async fn set_queue_stats(
        &self,
        active_window_seconds: u32,
        stats: QueueStats,
        ttl_seconds: u32,
    ) -> AppResult<()>;
}
