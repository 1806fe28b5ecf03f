//! Execution worker process entrypoint. Spawns `WORKER_CONCURRENCY`
//! concurrent handler loops sharing one broker connection pool and one
//! rate limiter.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::info;

use scheduler_core::broker::RedisBroker;
use scheduler_core::coordination::RedisCoordinationStore;
use scheduler_core::persistence::PersistenceGateway;
use scheduler_core::ratelimit::CoordinationRateLimiter;
use scheduler_core::worker::{ExecutionWorker, RetryPolicy};
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

    let broker = Arc::new(RedisBroker::connect(&config.broker_redis_url).await?);
    let coordination = RedisCoordinationStore::connect(&config.redis_url).await?;
    let rate_limiter = Arc::new(CoordinationRateLimiter::new(coordination));

    let metrics_handle = scheduler_core::metrics::install_recorder()?;
    tokio::spawn(scheduler_core::metrics::serve(
        config.metrics_port,
        metrics_handle,
    ));

    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal");
        shutdown_signal.cancel();
    });

    let mut handles = Vec::with_capacity(config.worker_concurrency);
    for i in 0..config.worker_concurrency {
        let worker = ExecutionWorker::new(
            gateway.clone(),
            broker.clone(),
            rate_limiter.clone(),
            RetryPolicy::default(),
            format!("{}-{i}", config.worker_id),
        );
        let shutdown = shutdown.clone();
        handles.push(tokio::spawn(async move { worker.run(shutdown).await }));
    }

    for handle in handles {
        let _ = handle.await;
    }

    Ok(())
}
