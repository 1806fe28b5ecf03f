//! Minimal Prometheus exposition + health endpoint. Ambient operational
//! plumbing, not a CRUD controller, so it stays in scope alongside the
//! scheduler/worker processes.

use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    Ok(handle)
}

pub async fn serve(port: u16, handle: PrometheusHandle) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/metrics", get(move || render(handle.clone())));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "metrics server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn render(handle: PrometheusHandle) -> String {
    handle.render()
}
