//! Read-only HTTP view of the monitor state.
//!
//! This module provides an HTTP server that:
//! - Serves the dashboard read surface as JSON
//! - Takes only the shared read lock, so it never stalls a tick
//!
//! # Architecture
//!
//! ```text
//! MonitorLoop ──write──→ MonitorState ←──read── GET /api/* ──→ dashboard UI
//! ```

use crate::monitor::{cutoff_before, DashboardView, SharedMonitor, RECENT_ALERTS_SHOWN};
use crate::core::{AlertEvent, PanelSnapshot, Sample, WindowSummary};
use crate::stats::{SharedSyncStats, SyncStatsSnapshot};
use axum::{
    extract::{Query, State},
    http::HeaderValue,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Horizon used for "alerts in the window" counts
    pub window_horizon: Duration,
}

impl ServerConfig {
    pub fn new(port: u16, window_horizon: Duration) -> Self {
        Self {
            port,
            window_horizon,
        }
    }
}

/// Shared server state
struct ServerState {
    monitor: SharedMonitor,
    stats: SharedSyncStats,
    window_horizon: Duration,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub last_sync: Option<DateTime<Utc>>,
}

/// Vitals window response
#[derive(Debug, Serialize, Deserialize)]
pub struct VitalsResponse {
    pub latest: Option<Sample>,
    pub series: Vec<Sample>,
    pub summary: Option<WindowSummary>,
    pub emergency_active: bool,
}

/// Alert log response
#[derive(Debug, Serialize, Deserialize)]
pub struct AlertsResponse {
    /// Most recent first
    pub alerts: Vec<AlertEvent>,
    /// Alerts at or after `since`
    pub count_since: usize,
    pub since: DateTime<Utc>,
}

/// Query parameters for GET /api/alerts
#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    /// Maximum number of alerts returned
    pub limit: Option<usize>,
    /// Count alerts from this many seconds ago (defaults to the window horizon)
    pub since_secs: Option<u64>,
}

/// GET /health
async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    let last_sync = state.monitor.read().await.last_sync();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        last_sync,
    })
}

/// GET /api/dashboard
async fn dashboard(State(state): State<Arc<ServerState>>) -> Json<DashboardView> {
    let monitor = state.monitor.read().await;
    Json(monitor.dashboard(Utc::now()))
}

/// GET /api/vitals
async fn vitals(State(state): State<Arc<ServerState>>) -> Json<VitalsResponse> {
    let monitor = state.monitor.read().await;
    Json(VitalsResponse {
        latest: monitor.latest(),
        series: monitor.series(),
        summary: monitor.window_summary(),
        emergency_active: monitor.emergency_active(),
    })
}

/// GET /api/alerts
async fn alerts(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<AlertsQuery>,
) -> Json<AlertsResponse> {
    let horizon = query
        .since_secs
        .map(Duration::from_secs)
        .unwrap_or(state.window_horizon);
    let since = cutoff_before(Utc::now(), horizon);

    let monitor = state.monitor.read().await;
    Json(AlertsResponse {
        alerts: monitor.recent_alerts(query.limit.unwrap_or(RECENT_ALERTS_SHOWN)),
        count_since: monitor.alert_count_since(since),
        since,
    })
}

/// GET /api/panels
async fn panels(State(state): State<Arc<ServerState>>) -> Json<PanelSnapshot> {
    let monitor = state.monitor.read().await;
    Json(monitor.panel_snapshot().clone())
}

/// GET /api/stats
async fn stats(State(state): State<Arc<ServerState>>) -> Json<SyncStatsSnapshot> {
    Json(state.stats.snapshot())
}

/// Build the router over the shared monitor state.
pub fn router(monitor: SharedMonitor, stats: SharedSyncStats, window_horizon: Duration) -> Router {
    let state = Arc::new(ServerState {
        monitor,
        stats,
        window_horizon,
    });

    Router::new()
        .route("/health", get(health))
        .route("/api/dashboard", get(dashboard))
        .route("/api/vitals", get(vitals))
        .route("/api/alerts", get(alerts))
        .route("/api/panels", get(panels))
        .route("/api/stats", get(stats))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
    monitor: SharedMonitor,
    stats: SharedSyncStats,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(monitor, stats, config.window_horizon);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("PulseGuard read API listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
