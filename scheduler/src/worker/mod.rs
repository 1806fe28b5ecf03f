//! Execution worker: consumes `execute-job` tasks, fires the webhook, and
//! applies retry/backoff. Grounded on `execute_job.py`'s flow and exact
//! retry/dead-letter wording, realized with the `Service` +
//! `CancellationToken` shutdown idiom from `kernel/jobs/worker.rs`.

pub mod http;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::broker::{execute_job_task, Task, TaskBroker, EXECUTE_JOB_TASK, RUN_COLLECTION_TASK};
use crate::domain::ExecutionStatus;
use crate::events::SchedulerEvent;
use crate::loadrun::LoadRunOrchestrator;
use crate::persistence::PersistenceGateway;
use crate::ratelimit::RateLimiter;

pub use http::{execute_webhook, WebhookOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffType {
    Exponential,
    Linear,
    Fixed,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: i32,
    pub backoff_base_secs: i64,
    pub backoff_type: BackoffType,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_secs: 60,
            backoff_type: BackoffType::Exponential,
        }
    }
}

impl RetryPolicy {
    /// Delay before the given (1-based) retry attempt, in seconds.
    pub fn backoff_secs(&self, attempt: i32) -> i64 {
        match self.backoff_type {
            BackoffType::Exponential => self.backoff_base_secs * 2i64.pow((attempt - 1).max(0) as u32),
            BackoffType::Linear => self.backoff_base_secs * attempt as i64,
            BackoffType::Fixed => self.backoff_base_secs,
        }
    }
}

pub const EXECUTION_HARD_TIMEOUT: Duration = Duration::from_secs(300);
pub const EXECUTION_SOFT_TIMEOUT: Duration = Duration::from_secs(270);

pub struct ExecutionWorker<B, R> {
    gateway: PersistenceGateway,
    broker: Arc<B>,
    rate_limiter: Arc<R>,
    http_client: reqwest::Client,
    retry_policy: RetryPolicy,
    worker_id: String,
    loadrun: Arc<LoadRunOrchestrator>,
}

impl<B, R> ExecutionWorker<B, R>
where
    B: TaskBroker + 'static,
    R: RateLimiter + 'static,
{
    pub fn new(
        gateway: PersistenceGateway,
        broker: Arc<B>,
        rate_limiter: Arc<R>,
        retry_policy: RetryPolicy,
        worker_id: String,
    ) -> Self {
        let loadrun = Arc::new(LoadRunOrchestrator::new(gateway.clone()));
        Self {
            gateway,
            broker,
            rate_limiter,
            http_client: reqwest::Client::builder()
                .timeout(EXECUTION_HARD_TIMEOUT)
                .build()
                .expect("reqwest client builds"),
            retry_policy,
            worker_id,
            loadrun,
        }
    }

    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        loop {
            if shutdown.is_cancelled() {
                info!(worker_id = %self.worker_id, "worker shutting down");
                return Ok(());
            }

            let task = tokio::select! {
                t = self.broker.dequeue(&self.worker_id) => t?,
                _ = shutdown.cancelled() => {
                    info!(worker_id = %self.worker_id, "worker shutting down mid-poll");
                    return Ok(());
                }
            };

            let Some(task) = task else { continue };
            let outcome = match task.task.as_str() {
                EXECUTE_JOB_TASK => self.handle(&task).await,
                RUN_COLLECTION_TASK => self.handle_collection_run(&task).await,
                other => {
                    warn!(task = %other, "worker received unrecognized task, dropping");
                    Ok(())
                }
            };
            if let Err(e) = outcome {
                error!(worker_id = %self.worker_id, error = %e, "task handling failed");
            }
            self.broker.ack(&self.worker_id, &task).await?;
        }
    }

    async fn handle_collection_run(&self, task: &Task) -> anyhow::Result<()> {
        let run_id: Uuid = serde_json::from_value(
            task.args
                .get("run_id")
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("run-collection task missing run_id"))?,
        )?;
        self.loadrun.run(run_id).await
    }

    async fn handle(&self, task: &Task) -> anyhow::Result<()> {
        let execution_id: Uuid = serde_json::from_value(
            task.args
                .get("execution_id")
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("execute-job task missing execution_id"))?,
        )?;

        let Some(execution) = self.gateway.find_execution(execution_id).await? else {
            // redelivered after the row was already cleaned up; nothing to do
            return Ok(());
        };
        if execution.is_terminal() {
            return Ok(());
        }

        let Some(job) = self.gateway.find_job(execution.job_id).await? else {
            self.gateway
                .finish_execution(
                    execution_id,
                    ExecutionStatus::Failure,
                    None,
                    None,
                    None,
                    Some("job not found".to_string()),
                )
                .await?;
            return Ok(());
        };

        if !job.enabled {
            self.gateway
                .finish_execution(
                    execution_id,
                    ExecutionStatus::Failure,
                    None,
                    None,
                    None,
                    Some("Job is disabled".to_string()),
                )
                .await?;
            return Ok(());
        }

        let Some(webhook) = self.gateway.find_webhook_for_job(job.id).await? else {
            self.gateway
                .finish_execution(
                    execution_id,
                    ExecutionStatus::Failure,
                    None,
                    None,
                    None,
                    Some("Webhook not found".to_string()),
                )
                .await?;
            return Ok(());
        };

        // Rate-limit check does not consume a retry attempt.
        let tier = self.gateway.find_tier_for_account(job.account_id).await?;
        let check = self.rate_limiter.check_rate_limit(webhook.id, tier).await;
        if !check.allowed {
            self.gateway
                .finish_execution(
                    execution_id,
                    ExecutionStatus::Failure,
                    None,
                    None,
                    None,
                    Some("rate limit exceeded".to_string()),
                )
                .await?;
            return Ok(());
        }
        self.rate_limiter.increment(webhook.id).await.ok();

        self.gateway
            .mark_execution_running(execution_id, &self.worker_id)
            .await?;
        SchedulerEvent::ExecutionStarted {
            execution_id,
            worker_id: self.worker_id.clone(),
            attempt: execution.attempt,
        }
        .log();

        let started = std::time::Instant::now();
        let outcome = tokio::time::timeout(
            EXECUTION_SOFT_TIMEOUT,
            execute_webhook(&self.http_client, &webhook),
        )
        .await;
        let duration_ms = started.elapsed().as_millis() as i64;

        match outcome {
            Ok(Ok(response)) => {
                self.gateway
                    .finish_execution(
                        execution_id,
                        ExecutionStatus::Success,
                        Some(duration_ms),
                        Some(response.status as i32),
                        Some(response.body),
                        None,
                    )
                    .await?;
                SchedulerEvent::ExecutionSucceeded {
                    execution_id,
                    duration_ms,
                }
                .log();
            }
            Ok(Err(err)) => {
                self.handle_failure(
                    &job,
                    &execution,
                    duration_ms,
                    &err.to_string(),
                    ExecutionStatus::Failure,
                )
                .await?;
            }
            Err(_elapsed) => {
                warn!(
                    execution_id = %execution_id,
                    soft_timeout_secs = EXECUTION_SOFT_TIMEOUT.as_secs(),
                    "execution exceeded soft timeout"
                );
                self.handle_failure(
                    &job,
                    &execution,
                    duration_ms,
                    "execution exceeded soft timeout",
                    ExecutionStatus::TimedOut,
                )
                .await?;
            }
        }

        Ok(())
    }

    async fn handle_failure(
        &self,
        job: &crate::domain::Job,
        execution: &crate::domain::JobExecution,
        duration_ms: i64,
        error: &str,
        status: ExecutionStatus,
    ) -> anyhow::Result<()> {
        if execution.attempt >= self.retry_policy.max_attempts {
            self.gateway
                .finish_execution(
                    execution.id,
                    ExecutionStatus::DeadLetter,
                    Some(duration_ms),
                    None,
                    None,
                    Some(format!(
                        "Max attempts ({}) exceeded. Last error: {error}",
                        self.retry_policy.max_attempts
                    )),
                )
                .await?;
            SchedulerEvent::ExecutionDeadLettered {
                execution_id: execution.id,
                total_attempts: execution.attempt,
                final_error: error.to_string(),
            }
            .log();
            return Ok(());
        }

        self.gateway
            .finish_execution(
                execution.id,
                status,
                Some(duration_ms),
                None,
                None,
                Some(error.to_string()),
            )
            .await?;
        SchedulerEvent::ExecutionFailed {
            execution_id: execution.id,
            error: error.to_string(),
            attempt: execution.attempt,
            will_retry: true,
        }
        .log();

        let backoff = self.retry_policy.backoff_secs(execution.attempt);
        let next_attempt = execution.attempt + 1;
        let retry = self
            .gateway
            .create_retry_execution(job.id, next_attempt)
            .await?;
        let eta = Utc::now() + chrono::Duration::seconds(backoff);
        self.broker
            .enqueue(execute_job_task(retry.id), Some(eta))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_backoff_doubles_each_attempt() {
        let policy = RetryPolicy {
            max_attempts: 3,
            backoff_base_secs: 60,
            backoff_type: BackoffType::Exponential,
        };
        assert_eq!(policy.backoff_secs(1), 60);
        assert_eq!(policy.backoff_secs(2), 120);
        assert_eq!(policy.backoff_secs(3), 240);
    }

    #[test]
    fn linear_backoff_scales_with_attempt() {
        let policy = RetryPolicy {
            max_attempts: 3,
            backoff_base_secs: 30,
            backoff_type: BackoffType::Linear,
        };
        assert_eq!(policy.backoff_secs(1), 30);
        assert_eq!(policy.backoff_secs(2), 60);
    }

    #[test]
    fn fixed_backoff_is_constant() {
        let policy = RetryPolicy {
            max_attempts: 5,
            backoff_base_secs: 15,
            backoff_type: BackoffType::Fixed,
        };
        assert_eq!(policy.backoff_secs(1), 15);
        assert_eq!(policy.backoff_secs(4), 15);
    }
}
