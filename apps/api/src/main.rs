//! Zeroline API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use zeroline_application::{
    BlueprintService, DeviceService, EnrollmentService, QueueStatsCache, WorkflowService,
};
use zeroline_core::AppError;
use zeroline_infrastructure::{
    PostgresAuditRepository, PostgresBlueprintRepository, PostgresDeviceRepository,
    PostgresTokenRepository, PostgresWorkflowRepository, RedisQueueStatsCache,
};

use crate::api_config::{ApiConfig, init_tracing};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let token_repository = Arc::new(PostgresTokenRepository::new(pool.clone()));
    let device_repository = Arc::new(PostgresDeviceRepository::new(pool.clone()));
    let blueprint_repository = Arc::new(PostgresBlueprintRepository::new(pool.clone()));
    let workflow_repository = Arc::new(PostgresWorkflowRepository::new(pool.clone()));
    let audit_repository = Arc::new(PostgresAuditRepository::new(pool));

    let enrollment_service = EnrollmentService::new(
        token_repository,
        audit_repository.clone(),
        config.enrollment_base_url.clone(),
    );
    let device_service = DeviceService::new(device_repository.clone());
    let blueprint_service =
        BlueprintService::new(blueprint_repository.clone(), audit_repository.clone());

    let mut workflow_service = WorkflowService::new(
        workflow_repository,
        device_repository,
        blueprint_repository,
        audit_repository,
    );

    if let Some(redis_url) = &config.redis_url {
        let redis_client = redis::Client::open(redis_url.as_str()).map_err(|error| {
            AppError::Validation(format!("invalid REDIS_URL: {error}"))
        })?;
        let stats_cache: Arc<dyn QueueStatsCache> = Arc::new(RedisQueueStatsCache::new(
            redis_client,
            "zeroline:queue-stats",
        ));
        workflow_service = workflow_service
            .with_queue_stats_cache(stats_cache, config.queue_stats_cache_ttl_seconds);
    }

    let app_state = AppState {
        enrollment_service,
        device_service,
        blueprint_service,
        workflow_service,
        api_key: config.api_key.clone(),
    };

    let protected_routes = Router::new()
        .route(
            "/enrollment/tokens",
            post(handlers::enrollment::issue_token_handler),
        )
        .route("/devices", get(handlers::devices::list_devices_handler))
        .route(
            "/devices/{device_id}",
            get(handlers::devices::get_device_handler),
        )
        .route(
            "/blueprints",
            get(handlers::blueprints::list_blueprints_handler)
                .post(handlers::blueprints::create_blueprint_handler),
        )
        .route(
            "/blueprints/{blueprint_id}",
            get(handlers::blueprints::get_blueprint_handler)
                .put(handlers::blueprints::update_blueprint_handler)
                .delete(handlers::blueprints::delete_blueprint_handler),
        )
        .route(
            "/workflows/devices/{device_id}",
            post(handlers::workflows::start_workflow_handler),
        )
        .route(
            "/workflows/queue/stats",
            get(handlers::workflows::queue_stats_handler),
        )
        .route(
            "/workflows/{run_id}",
            get(handlers::workflows::get_workflow_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_api_key,
        ));

    let app = Router::new()
        .route("/healthz", get(handlers::health::health_handler))
        .route(
            "/enrollment/register",
            post(handlers::enrollment::register_device_handler),
        )
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let address = config.socket_address()?;

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "zeroline-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
