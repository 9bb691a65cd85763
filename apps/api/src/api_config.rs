use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use tracing_subscriber::EnvFilter;
use url::Url;
use zeroline_core::AppError;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub api_key: String,
    pub api_host: String,
    pub api_port: u16,
    pub enrollment_base_url: String,
    pub redis_url: Option<String>,
    pub queue_stats_cache_ttl_seconds: u32,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let database_url = required_env("DATABASE_URL")?;
        let api_key = required_env("API_KEY")?;

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8000);

        let enrollment_base_url = env::var("ENROLLMENT_BASE_URL")
            .unwrap_or_else(|_| "https://api.localhost".to_owned())
            .trim_end_matches('/')
            .to_owned();
        Url::parse(&enrollment_base_url).map_err(|error| {
            AppError::Validation(format!("invalid ENROLLMENT_BASE_URL: {error}"))
        })?;

        let redis_url = env::var("REDIS_URL")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let queue_stats_cache_ttl_seconds = match env::var("QUEUE_STATS_CACHE_TTL_SECONDS") {
            Ok(value) => value.parse::<u32>().map_err(|error| {
                AppError::Validation(format!(
                    "invalid QUEUE_STATS_CACHE_TTL_SECONDS value '{value}': {error}"
                ))
            })?,
            Err(_) => 5,
        };

        Ok(Self {
            migrate_only,
            database_url,
            api_key,
            api_host,
            api_port,
            enrollment_base_url,
            redis_url,
            queue_stats_cache_ttl_seconds,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}
