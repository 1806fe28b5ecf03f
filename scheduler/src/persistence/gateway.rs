//! Typed access to the relational store backing jobs, executions, collection
//! runs, and reports. One inherent method per operation the scheduler,
//! worker, and load-run orchestrator need; no generic CRUD trait is exposed
//! upward, since the set of callers is small and fixed.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    CollectionReport, CollectionResult, CollectionRun, ExecutionStatus, Job, JobExecution,
    LatencyStats, RunStatus, Subscription, Tier, Webhook,
};

#[derive(Clone)]
pub struct PersistenceGateway {
    pool: PgPool,
}

impl PersistenceGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Jobs due at or before `now`, oldest-next-fire first, capped at
    /// `batch_size`. Drives the poller's scan.
    pub async fn find_due_jobs(&self, now: DateTime<Utc>, batch_size: i64) -> sqlx::Result<Vec<Job>> {
        sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE enabled AND next_fire_at <= $1 \
             ORDER BY next_fire_at ASC LIMIT $2",
        )
        .bind(now)
        .bind(batch_size)
        .fetch_all(&self.pool)
        .await
    }

    /// Exclusive row lock fallback for the scheduler's claim step, used
    /// when the coordination-store lock can't be taken. Non-blocking:
    /// returns `Ok(None)` rather than waiting if another transaction
    /// already holds the row.
    pub async fn try_lock_job_row(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        job_id: Uuid,
    ) -> sqlx::Result<Option<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1 FOR UPDATE NOWAIT")
            .bind(job_id)
            .fetch_optional(&mut **tx)
            .await
    }

    pub async fn find_job(&self, job_id: Uuid) -> sqlx::Result<Option<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Tier of the account owning `account_id`, defaulting to `Free` when no
    /// subscription row exists (an account without a subscription is
    /// treated the same as a free plan, matching `_get_plan_type`'s
    /// fall-through in the original rate limiter).
    pub async fn find_tier_for_account(&self, account_id: Uuid) -> sqlx::Result<Tier> {
        let subscription =
            sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE account_id = $1")
                .bind(account_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(subscription.map(|s| s.tier()).unwrap_or(Tier::Free))
    }

    pub async fn find_webhook_for_job(&self, job_id: Uuid) -> sqlx::Result<Option<Webhook>> {
        sqlx::query_as::<_, Webhook>("SELECT * FROM webhooks WHERE job_id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn insert_execution(
        &self,
        job_id: Uuid,
        attempt: i32,
    ) -> sqlx::Result<JobExecution> {
        sqlx::query_as::<_, JobExecution>(
            "INSERT INTO job_executions (id, job_id, status, attempt, created_at) \
             VALUES ($1, $2, 'queued', $3, now()) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(job_id)
        .bind(attempt)
        .fetch_one(&self.pool)
        .await
    }

    /// Advances `next_fire_at`/`last_fire_at` for a job as part of the same
    /// transaction that created its new execution row, so a crash between
    /// the two never produces a duplicate fire — at worst a missed one.
    pub async fn advance_job(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        job_id: Uuid,
        fired_at: DateTime<Utc>,
        next_fire_at: DateTime<Utc>,
    ) -> sqlx::Result<()> {
        sqlx::query("UPDATE jobs SET last_fire_at = $1, next_fire_at = $2 WHERE id = $3")
            .bind(fired_at)
            .bind(next_fire_at)
            .bind(job_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn find_execution(&self, execution_id: Uuid) -> sqlx::Result<Option<JobExecution>> {
        sqlx::query_as::<_, JobExecution>("SELECT * FROM job_executions WHERE id = $1")
            .bind(execution_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn mark_execution_running(
        &self,
        execution_id: Uuid,
        worker_id: &str,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE job_executions SET status = 'running', worker_id = $1, started_at = now() \
             WHERE id = $2",
        )
        .bind(worker_id)
        .bind(execution_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn finish_execution(
        &self,
        execution_id: Uuid,
        status: ExecutionStatus,
        duration_ms: Option<i64>,
        response_status: Option<i32>,
        response_body: Option<String>,
        error_message: Option<String>,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE job_executions SET status = $1, finished_at = now(), duration_ms = $2, \
             response_status = $3, response_body = $4, error_message = $5 WHERE id = $6",
        )
        .bind(status)
        .bind(duration_ms)
        .bind(response_status)
        .bind(response_body)
        .bind(error_message)
        .bind(execution_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Appends a new execution row for a retry attempt, to be delivered no
    /// earlier than `eta` by the broker. Never mutates the failed
    /// execution's own attempt counter.
    pub async fn create_retry_execution(
        &self,
        job_id: Uuid,
        attempt: i32,
    ) -> sqlx::Result<JobExecution> {
        self.insert_execution(job_id, attempt).await
    }

    pub async fn find_run(&self, run_id: Uuid) -> sqlx::Result<Option<CollectionRun>> {
        sqlx::query_as::<_, CollectionRun>("SELECT * FROM collection_runs WHERE id = $1")
            .bind(run_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Webhooks belonging to a collection, ordered by `(execution_order ASC
    /// NULLS LAST, id ASC)`. `id` stands in for `created_at` as the tiebreak
    /// since it is a time-ordered v7 UUID, sparing the table a redundant
    /// timestamp column.
    pub async fn find_webhooks_for_collection(&self, collection_id: Uuid) -> sqlx::Result<Vec<Webhook>> {
        sqlx::query_as::<_, Webhook>(
            "SELECT * FROM webhooks WHERE collection_id = $1 \
             ORDER BY execution_order ASC NULLS LAST, id ASC",
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn mark_run_running(&self, run_id: Uuid) -> sqlx::Result<()> {
        sqlx::query("UPDATE collection_runs SET status = 'running', started_at = now() WHERE id = $1")
            .bind(run_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn finish_run(&self, run_id: Uuid, status: RunStatus) -> sqlx::Result<()> {
        sqlx::query("UPDATE collection_runs SET status = $1, completed_at = now() WHERE id = $2")
            .bind(status)
            .bind(run_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Resets a completed/failed/cancelled run back to `pending`, nulling
    /// its timestamps and purging prior reports+results, so the caller can
    /// re-enqueue a `run-collection` task for it.
    pub async fn reset_run_for_rerun(&self, run_id: Uuid) -> sqlx::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "DELETE FROM collection_results WHERE report_id IN \
             (SELECT id FROM collection_reports WHERE run_id = $1)",
        )
        .bind(run_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM collection_reports WHERE run_id = $1")
            .bind(run_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE collection_runs SET status = 'pending', started_at = NULL, completed_at = NULL \
             WHERE id = $1",
        )
        .bind(run_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await
    }

    pub async fn create_report(&self, run_id: Uuid) -> sqlx::Result<CollectionReport> {
        sqlx::query_as::<_, CollectionReport>(
            "INSERT INTO collection_reports \
             (id, run_id, total_count, success_count, failed_count) \
             VALUES ($1, $2, 0, 0, 0) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(run_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn update_report(
        &self,
        report_id: Uuid,
        total_count: i64,
        success_count: i64,
        failed_count: i64,
        latency: &LatencyStats,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE collection_reports SET total_count = $1, success_count = $2, \
             failed_count = $3, avg_ms = $4, min_ms = $5, max_ms = $6, p95_ms = $7, p99_ms = $8 \
             WHERE id = $9",
        )
        .bind(total_count)
        .bind(success_count)
        .bind(failed_count)
        .bind(latency.avg_ms)
        .bind(latency.min_ms)
        .bind(latency.max_ms)
        .bind(latency.p95_ms)
        .bind(latency.p99_ms)
        .bind(report_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn append_result(&self, result: &CollectionResult) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO collection_results \
             (id, report_id, endpoint, method, request_headers, request_body, response_status, \
              response_headers, response_body, response_time_ms, is_success, error_message, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(result.id)
        .bind(result.report_id)
        .bind(&result.endpoint)
        .bind(&result.method)
        .bind(&result.request_headers)
        .bind(&result.request_body)
        .bind(result.response_status)
        .bind(&result.response_headers)
        .bind(&result.response_body)
        .bind(result.response_time_ms)
        .bind(result.is_success)
        .bind(&result.error_message)
        .bind(result.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Cascades an account delete to its jobs, executions, collections,
    /// runs, reports, results, and subscription in one transaction. Callers
    /// are expected to have already attempted external billing
    /// cancellation; a failure there is logged but never blocks this call.
    pub async fn cascade_delete_account(&self, account_id: Uuid) -> sqlx::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "DELETE FROM job_executions WHERE job_id IN (SELECT id FROM jobs WHERE account_id = $1)",
        )
        .bind(account_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM webhooks WHERE job_id IN (SELECT id FROM jobs WHERE account_id = $1) \
                     OR collection_id IN (SELECT id FROM collections WHERE account_id = $1)")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "DELETE FROM collection_results WHERE report_id IN (\
                SELECT cr.id FROM collection_reports cr \
                JOIN collection_runs run ON run.id = cr.run_id \
                JOIN collections c ON c.id = run.collection_id WHERE c.account_id = $1)",
        )
        .bind(account_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "DELETE FROM collection_reports WHERE run_id IN (\
                SELECT run.id FROM collection_runs run \
                JOIN collections c ON c.id = run.collection_id WHERE c.account_id = $1)",
        )
        .bind(account_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "DELETE FROM collection_runs WHERE collection_id IN \
             (SELECT id FROM collections WHERE account_id = $1)",
        )
        .bind(account_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM collections WHERE account_id = $1")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM jobs WHERE account_id = $1")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM subscriptions WHERE account_id = $1")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }
}
