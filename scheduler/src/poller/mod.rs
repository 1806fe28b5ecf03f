//! The scheduler poller: finds due jobs, claims them under a cluster-wide
//! lock, enqueues an execution, and advances the job's next fire time.
//!
//! Grounded on spec prose for the claim algorithm itself (the original
//! `scheduler_service.py` only wraps Celery Beat and never shipped the real
//! distributed-lock claim code in this pack), realized with the teacher's
//! `Service`/`CancellationToken`/`tokio::select!` shutdown idiom from
//! `kernel/jobs/worker.rs` and the `FOR UPDATE NOWAIT` row-lock fallback
//! from `kernel/jobs/job.rs`'s `claim_jobs()`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::broker::{execute_job_task, TaskBroker};
use crate::coordination::CoordinationStore;
use crate::cron;
use crate::domain::Job;
use crate::events::SchedulerEvent;
use crate::persistence::PersistenceGateway;

#[derive(Clone, Debug)]
pub struct PollerConfig {
    pub batch_size: i64,
    pub lock_ttl_secs: u64,
    /// Fixed sleep between ticks when `adaptive_polling` is off.
    pub tick_interval: Duration,
    pub min_poll_interval: Duration,
    pub max_poll_interval: Duration,
    pub adaptive_polling: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            lock_ttl_secs: 30,
            tick_interval: Duration::from_secs(5),
            min_poll_interval: Duration::from_secs(1),
            max_poll_interval: Duration::from_secs(5),
            adaptive_polling: false,
        }
    }
}

pub struct Poller<C, B> {
    gateway: PersistenceGateway,
    coordination: Arc<C>,
    broker: Arc<B>,
    config: PollerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClaimOutcome {
    Enqueued,
    LockContended,
    RaceLost,
}

impl<C, B> Poller<C, B>
where
    C: CoordinationStore + 'static,
    B: TaskBroker + 'static,
{
    pub fn new(
        gateway: PersistenceGateway,
        coordination: Arc<C>,
        broker: Arc<B>,
        config: PollerConfig,
    ) -> Self {
        Self {
            gateway,
            coordination,
            broker,
            config,
        }
    }

    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let mut interval = self.config.tick_interval;

        loop {
            if shutdown.is_cancelled() {
                info!("poller shutting down");
                return Ok(());
            }

            let started = std::time::Instant::now();
            let enqueued = match self.tick().await {
                Ok(n) => n,
                Err(e) => {
                    error!(error = %e, "poller tick failed");
                    0
                }
            };
            metrics::histogram!("poll_duration_seconds").record(started.elapsed().as_secs_f64());

            if self.config.adaptive_polling {
                interval = if enqueued == 0 {
                    (interval * 2).min(self.config.max_poll_interval)
                } else {
                    self.config.min_poll_interval
                };
            } else {
                interval = self.config.tick_interval;
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.cancelled() => {
                    info!("poller shutting down mid-sleep");
                    return Ok(());
                }
            }
        }
    }

    /// One scan-and-claim pass. Returns the number of executions enqueued.
    async fn tick(&self) -> anyhow::Result<u64> {
        match self.broker.promote_due().await {
            Ok(n) if n > 0 => debug!(promoted = n, "moved delayed tasks into ready queue"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "promote_due failed"),
        }

        let now = Utc::now();
        let due = self
            .gateway
            .find_due_jobs(now, self.config.batch_size)
            .await?;
        metrics::counter!("jobs_polled_total", "status" => "due").increment(due.len() as u64);

        let mut enqueued = 0u64;
        for job in due {
            match self.claim_and_enqueue(&job).await {
                Ok(ClaimOutcome::Enqueued) => {
                    enqueued += 1;
                    metrics::counter!("jobs_enqueued_total", "status" => "ok").increment(1);
                }
                Ok(ClaimOutcome::LockContended) => {
                    metrics::counter!("lock_failures_total").increment(1);
                }
                Ok(ClaimOutcome::RaceLost) => {
                    debug!(job_id = %job.id, "job changed under us between scan and claim");
                }
                Err(e) => {
                    warn!(job_id = %job.id, error = %e, "claim failed");
                    metrics::counter!("jobs_enqueued_total", "status" => "error").increment(1);
                }
            }
        }
        Ok(enqueued)
    }

    async fn claim_and_enqueue(&self, job: &Job) -> anyhow::Result<ClaimOutcome> {
        let lock_key = format!("scheduler:lock:{}", job.id);

        let have_coordination_lock = self
            .coordination
            .acquire_lock(&lock_key, self.config.lock_ttl_secs)
            .await
            .unwrap_or(false);

        if have_coordination_lock {
            let outcome = self.do_claim(job.id).await;
            // best-effort: a crashed holder still releases via TTL
            let _ = self.coordination.release_lock(&lock_key).await;
            return outcome;
        }

        // Coordination store unavailable or contended: fall back to a
        // Postgres row lock for the duration of this claim.
        self.claim_with_row_lock(job.id).await
    }

    async fn do_claim(&self, job_id: Uuid) -> anyhow::Result<ClaimOutcome> {
        let Some(current) = self.gateway.find_job(job_id).await? else {
            return Ok(ClaimOutcome::RaceLost);
        };
        if !current.enabled || current.next_fire_at.map(|t| t > Utc::now()).unwrap_or(true) {
            return Ok(ClaimOutcome::RaceLost);
        }
        self.claim_transaction(&current).await?;
        Ok(ClaimOutcome::Enqueued)
    }

    async fn claim_with_row_lock(&self, job_id: Uuid) -> anyhow::Result<ClaimOutcome> {
        let mut tx = self.gateway.pool().begin().await?;
        let locked = match self.gateway.try_lock_job_row(&mut tx, job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tx.rollback().await?;
                return Ok(ClaimOutcome::RaceLost);
            }
            Err(_) => {
                tx.rollback().await?;
                return Ok(ClaimOutcome::LockContended);
            }
        };
        if !locked.enabled || locked.next_fire_at.map(|t| t > Utc::now()).unwrap_or(true) {
            tx.rollback().await?;
            return Ok(ClaimOutcome::RaceLost);
        }

        let now = Utc::now();
        let next = cron::next_fire_after(&locked.cron_expression, &locked.timezone, now)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        self.gateway
            .advance_job(&mut tx, locked.id, now, next)
            .await?;
        tx.commit().await?;

        self.insert_and_publish(locked.id).await?;
        Ok(ClaimOutcome::Enqueued)
    }

    async fn claim_transaction(&self, job: &Job) -> anyhow::Result<()> {
        let now = Utc::now();
        let next = cron::next_fire_after(&job.cron_expression, &job.timezone, now)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        let mut tx = self.gateway.pool().begin().await?;
        self.gateway.advance_job(&mut tx, job.id, now, next).await?;
        tx.commit().await?;

        self.insert_and_publish(job.id).await
    }

    async fn insert_and_publish(&self, job_id: Uuid) -> anyhow::Result<()> {
        let execution = self.gateway.insert_execution(job_id, 1).await?;
        self.broker
            .enqueue(execute_job_task(execution.id), None)
            .await?;
        SchedulerEvent::JobClaimed {
            job_id,
            execution_id: execution.id,
        }
        .log();
        Ok(())
    }
}
