//! Process configuration loaded once at startup from the environment.

use anyhow::{Context, Result};

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub broker_redis_url: String,
    pub metrics_port: u16,

    pub scheduler_batch_size: i64,
    pub scheduler_tick_interval_ms: u64,
    pub scheduler_min_poll_interval_ms: u64,
    pub scheduler_max_poll_interval_ms: u64,
    pub scheduler_adaptive_polling: bool,
    pub scheduler_lock_ttl_secs: u64,

    pub worker_concurrency: usize,
    pub worker_id: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let broker_redis_url = std::env::var("BROKER_REDIS_URL").unwrap_or_else(|_| redis_url.clone());

        let metrics_port = std::env::var("METRICS_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(9091);

        let scheduler_batch_size = std::env::var("SCHEDULER_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100);

        let scheduler_tick_interval_ms = std::env::var("SCHEDULER_TICK_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5_000);

        let scheduler_min_poll_interval_ms = std::env::var("SCHEDULER_MIN_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1_000);

        let scheduler_max_poll_interval_ms = std::env::var("SCHEDULER_MAX_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5_000);

        let scheduler_adaptive_polling = std::env::var("SCHEDULER_ADAPTIVE_POLLING")
            .ok()
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let scheduler_lock_ttl_secs = std::env::var("SCHEDULER_LOCK_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        let worker_concurrency = std::env::var("WORKER_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(4);

        let worker_id = std::env::var("WORKER_ID")
            .unwrap_or_else(|_| format!("worker-{}", uuid::Uuid::new_v4()));

        Ok(Self {
            database_url,
            redis_url,
            broker_redis_url,
            metrics_port,
            scheduler_batch_size,
            scheduler_tick_interval_ms,
            scheduler_min_poll_interval_ms,
            scheduler_max_poll_interval_ms,
            scheduler_adaptive_polling,
            scheduler_lock_ttl_secs,
            worker_concurrency,
            worker_id,
        })
    }
}
