// Main entry point - Dependency injection, refresh loop and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::query_service::QueryService;
use crate::application::refresh_service::{RefreshService, spawn_refresh_loop};
use crate::application::snapshot_cache::SnapshotCache;
use crate::application::ubpk::strategy_for;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::provider_client::ProviderClient;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    get_driver_aggregates, get_driver_history, get_driver_week, get_snapshot, get_summary,
    get_trip_metric, get_week_improvement, get_weekly_history, get_weekly_metrics, health_check,
    list_driver_improvement, list_trip_metrics,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_app_config()?;
    let addr = config.server.socket_addr()?;

    // Infrastructure
    let repository = Arc::new(ProviderClient::new(config.provider.clone())?);
    let strategy = strategy_for(config.refresh.ubpk_mode);

    // Application
    let cache = Arc::new(SnapshotCache::new());
    let refresh_service = RefreshService::new(repository, strategy);
    let refresh_task = spawn_refresh_loop(refresh_service, cache.clone(), config.refresh.interval());

    let state = Arc::new(AppState {
        query_service: QueryService::new(cache),
    });

    // Presentation
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/summary", get(get_summary))
        .route("/api/metrics/trip", get(list_trip_metrics))
        .route("/api/metrics/trip/:trip_id", get(get_trip_metric))
        .route("/api/metrics/driver", get(get_driver_aggregates))
        .route("/api/metrics/weekly", get(get_weekly_metrics))
        .route("/api/metrics/history", get(get_weekly_history))
        .route("/api/metrics/improvement", get(get_week_improvement))
        .route("/api/metrics/improvement/drivers", get(list_driver_improvement))
        .route("/api/drivers/:driver_id/weeks/:week", get(get_driver_week))
        .route("/api/drivers/:driver_id/history", get(get_driver_history))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!(
        %addr,
        ubpk_mode = ?config.refresh.ubpk_mode,
        interval_secs = config.refresh.interval_secs,
        "Starting fleet-safety-metrics service"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    refresh_task.abort();
    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
