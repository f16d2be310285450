//! Health/readiness/metrics HTTP sidecar.
//!
//! Plain HTTP 200 responders for orchestrator probes plus a JSON dump of the
//! broker counters. No broker logic lives here; the sidecar only observes.
//!
//! - `GET /healthz` → `{"status":"ok"}`
//! - `GET /ready` → `{"status":"ready"}`
//! - `GET /metrics` → current [`MetricsSnapshot`](crate::MetricsSnapshot)

use crate::metrics::BrokerMetrics;
use crate::Result;
use axum::extract::State;
use axum::routing::get;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub struct HttpSidecar {
    metrics: Arc<BrokerMetrics>,
    port: u16,
}

impl HttpSidecar {
    pub fn new(metrics: Arc<BrokerMetrics>, port: u16) -> Self {
        Self { metrics, port }
    }

    /// Serves until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(("0.0.0.0", self.port)).await?;
        info!(port = self.port, "health HTTP server listening");

        axum::serve(listener, router(self.metrics))
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("health HTTP server shut down");
        Ok(())
    }
}

fn router(metrics: Arc<BrokerMetrics>) -> axum::Router {
    axum::Router::new()
        .route("/healthz", get(healthz))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics_snapshot))
        .with_state(metrics)
}

async fn healthz() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn ready() -> Json<Value> {
    Json(json!({"status": "ready"}))
}

async fn metrics_snapshot(State(metrics): State<Arc<BrokerMetrics>>) -> Json<Value> {
    Json(serde_json::to_value(metrics.snapshot()).unwrap_or_else(|_| json!({})))
}
