//! Load-run orchestrator: fans a collection's webhooks out across
//! `concurrent_users` virtual users for `duration_seconds`, then aggregates
//! per-request samples into percentile statistics.
//!
//! Scheduling and body-draining are grounded on the standalone load-test
//! worker in `other_examples/0a7d37e3_cbaugus-rust_loadtest__src-worker.rs.rs`
//! (reference-only, not a teacher): absolute-time `sleep_until` to avoid
//! drift, and draining the response body to avoid memory growth at high
//! throughput. The per-request percentile-sampling trick in that file is
//! deliberately not carried over — this core records every request.

pub mod stats;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::domain::result::{truncate, RESULT_BODY_TRUNCATE_BYTES, RESULT_ERROR_TRUNCATE_BYTES};
use crate::domain::{CollectionResult, RunStatus, Webhook};
use crate::events::SchedulerEvent;
use crate::persistence::PersistenceGateway;

pub use stats::aggregate;

const PER_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct LoadRunOrchestrator {
    gateway: PersistenceGateway,
    http_client: reqwest::Client,
}

impl LoadRunOrchestrator {
    pub fn new(gateway: PersistenceGateway) -> Self {
        Self {
            gateway,
            http_client: reqwest::Client::builder()
                .timeout(PER_REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client builds"),
        }
    }

    /// Drives a `CollectionRun` from `pending` to `completed`/`cancelled`.
    /// Loads everything it needs from `run_id` alone, so a `run-collection`
    /// task handler never has to carry more than that id.
    pub async fn run(&self, run_id: Uuid) -> anyhow::Result<()> {
        let Some(run) = self.gateway.find_run(run_id).await? else {
            warn!(run_id = %run_id, "collection run not found, dropping");
            return Ok(());
        };

        self.gateway.mark_run_running(run_id).await?;
        let endpoints = self
            .gateway
            .find_webhooks_for_collection(run.collection_id)
            .await?;
        let report = self.gateway.create_report(run_id).await?;

        let endpoints = Arc::new(endpoints);
        let deadline = Instant::now() + Duration::from_secs(run.duration_seconds as u64);

        let mut handles = Vec::with_capacity(run.concurrent_users as usize);
        for _ in 0..run.concurrent_users {
            let gateway = self.gateway.clone();
            let client = self.http_client.clone();
            let endpoints = endpoints.clone();
            handles.push(tokio::spawn(async move {
                run_virtual_user(
                    gateway,
                    client,
                    run_id,
                    report.id,
                    endpoints,
                    deadline,
                    run.requests_per_second,
                )
                .await
            }));
        }

        let mut latencies = Vec::new();
        let mut successes = Vec::new();
        for handle in handles {
            match handle.await {
                Ok((mut user_latencies, mut user_successes)) => {
                    latencies.append(&mut user_latencies);
                    successes.append(&mut user_successes);
                }
                Err(e) => warn!(run_id = %run_id, error = %e, "virtual user task panicked"),
            }
        }

        let aggregated = aggregate(&latencies, &successes);
        self.gateway
            .update_report(
                report.id,
                aggregated.total,
                aggregated.success,
                aggregated.failed,
                &aggregated.latency,
            )
            .await?;

        // A run can only become `cancelled` via the per-iteration status
        // poll below; re-read it to land on the right terminal status
        // instead of always reporting `completed`.
        let final_status = match self.gateway.find_run(run_id).await? {
            Some(r) if r.status == RunStatus::Cancelled => RunStatus::Cancelled,
            _ => RunStatus::Completed,
        };
        self.gateway.finish_run(run_id, final_status).await?;
        SchedulerEvent::RunCompleted {
            run_id,
            total: aggregated.total,
            success: aggregated.success,
            failed: aggregated.failed,
        }
        .log();
        Ok(())
    }
}

async fn run_virtual_user(
    gateway: PersistenceGateway,
    client: reqwest::Client,
    run_id: Uuid,
    report_id: Uuid,
    endpoints: Arc<Vec<Webhook>>,
    deadline: Instant,
    requests_per_second: Option<f64>,
) -> (Vec<i64>, Vec<bool>) {
    let mut latencies = Vec::new();
    let mut successes = Vec::new();

    if endpoints.is_empty() {
        return (latencies, successes);
    }

    while Instant::now() < deadline {
        match gateway.find_run(run_id).await {
            Ok(Some(run)) if run.status == RunStatus::Cancelled => break,
            Err(e) => warn!(run_id = %run_id, error = %e, "failed to poll run status"),
            _ => {}
        }

        let iteration_started = Instant::now();

        for endpoint in endpoints.iter() {
            if Instant::now() >= deadline {
                break;
            }
            let result = perform_sample(&client, report_id, endpoint).await;
            latencies.push(result.response_time_ms);
            successes.push(result.is_success);
            if let Err(e) = gateway.append_result(&result).await {
                warn!(report_id = %report_id, error = %e, "failed to persist sample");
            }
        }

        // requests_per_second caps whole iterations over the endpoint list,
        // not individual requests — preserved deliberately per design.
        if let Some(rps) = requests_per_second {
            if rps > 0.0 {
                let target = Duration::from_secs_f64(1.0 / rps);
                let elapsed = iteration_started.elapsed();
                if target > elapsed {
                    tokio::time::sleep(target - elapsed).await;
                }
            }
        }
    }

    (latencies, successes)
}

async fn perform_sample(
    client: &reqwest::Client,
    report_id: Uuid,
    endpoint: &Webhook,
) -> CollectionResult {
    let started = Instant::now();
    let method = reqwest::Method::from_bytes(endpoint.method.as_str().as_bytes())
        .unwrap_or(reqwest::Method::GET);
    let mut request = client.request(method, &endpoint.url);
    for (key, value) in endpoint.headers_map() {
        request = request.header(key, value);
    }

    let outcome = request.send().await;
    let response_time_ms = started.elapsed().as_millis() as i64;

    match outcome {
        Ok(mut response) => {
            let status = response.status().as_u16();
            // Keep only the first RESULT_BODY_TRUNCATE_BYTES, but keep
            // draining past that so connection reuse doesn't accumulate
            // memory across a long, high-throughput run.
            let mut captured = Vec::with_capacity(RESULT_BODY_TRUNCATE_BYTES);
            while let Ok(Some(chunk)) = response.chunk().await {
                if captured.len() < RESULT_BODY_TRUNCATE_BYTES {
                    captured.extend_from_slice(&chunk);
                }
            }
            let body = String::from_utf8_lossy(&captured).to_string();

            CollectionResult {
                id: Uuid::now_v7(),
                report_id,
                endpoint: endpoint.url.clone(),
                method: endpoint.method.as_str().to_string(),
                request_headers: serde_json::to_value(endpoint.headers_map()).unwrap_or_default(),
                request_body: None,
                response_status: Some(status as i32),
                response_headers: serde_json::json!({}),
                response_body: Some(truncate(&body, RESULT_BODY_TRUNCATE_BYTES)),
                response_time_ms,
                is_success: (200..400).contains(&status),
                error_message: None,
                created_at: Utc::now(),
            }
        }
        Err(e) => CollectionResult {
            id: Uuid::now_v7(),
            report_id,
            endpoint: endpoint.url.clone(),
            method: endpoint.method.as_str().to_string(),
            request_headers: serde_json::to_value(endpoint.headers_map()).unwrap_or_default(),
            request_body: None,
            response_status: None,
            response_headers: serde_json::json!({}),
            response_body: None,
            response_time_ms,
            is_success: false,
            error_message: Some(truncate(&e.to_string(), RESULT_ERROR_TRUNCATE_BYTES)),
            created_at: Utc::now(),
        },
    }
}
