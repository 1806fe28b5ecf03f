//! Scheduler poller process entrypoint. Env var names mirror the original
//! `scheduler.py` (`SCHEDULER_TICK_INTERVAL`, `SCHEDULER_BATCH_SIZE`,
//! `SCHEDULER_ADAPTIVE_POLLING`, `SCHEDULER_MIN_INTERVAL`,
//! `SCHEDULER_MAX_INTERVAL`, `METRICS_PORT`).

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::info;

use scheduler_core::broker::RedisBroker;
use scheduler_core::coordination::RedisCoordinationStore;
use scheduler_core::persistence::PersistenceGateway;
use scheduler_core::poller::{Poller, PollerConfig};
use scheduler_core::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    let gateway = PersistenceGateway::new(pool);

    let coordination = Arc::new(RedisCoordinationStore::connect(&config.redis_url).await?);
    let broker = Arc::new(RedisBroker::connect(&config.broker_redis_url).await?);

    let metrics_handle = scheduler_core::metrics::install_recorder()?;
    tokio::spawn(scheduler_core::metrics::serve(
        config.metrics_port,
        metrics_handle,
    ));

    let poller_config = PollerConfig {
        batch_size: config.scheduler_batch_size,
        lock_ttl_secs: config.scheduler_lock_ttl_secs,
        tick_interval: Duration::from_millis(config.scheduler_tick_interval_ms),
        min_poll_interval: Duration::from_millis(config.scheduler_min_poll_interval_ms),
        max_poll_interval: Duration::from_millis(config.scheduler_max_poll_interval_ms),
        adaptive_polling: config.scheduler_adaptive_polling,
    };
    let poller = Poller::new(gateway, coordination, broker, poller_config);

    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal");
        shutdown_signal.cancel();
    });

    poller.run(shutdown).await
}
