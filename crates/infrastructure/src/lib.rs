//! PostgreSQL and Redis adapters behind the application ports.

#![forbid(unsafe_code)]

mod postgres_audit_repository;
mod postgres_blueprint_repository;
mod postgres_device_repository;
mod postgres_token_repository;
mod postgres_workflow_repository;
mod redis_queue_stats_cache;

pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_blueprint_repository::PostgresBlueprintRepository;
pub use postgres_device_repository::PostgresDeviceRepository;
pub use postgres_token_repository::PostgresTokenRepository;
pub use postgres_workflow_repository::PostgresWorkflowRepository;
pub use redis_queue_stats_cache::RedisQueueStatsCache;
