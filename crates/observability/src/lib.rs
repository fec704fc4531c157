//! # tribuna-observability
//!
//! Observability-Crate fuer Tribuna:
//! - Structured Logging via tracing-subscriber, optional zusaetzlich in Dateien
//! - Health-Check-Endpunkt (`/health`) mit Relais- und Sitzungsstatus
//! - Prometheus-kompatible Metriken (`/metrics`)
//! - Request-Tracing fuer den HTTP-Server

pub mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;

pub use health::{health_router, HealthResponse, HealthState, HealthStatus};
pub use logging::{logging_initialisieren, panic_hook_installieren, LogKonfig};
pub use metrics::{metrics_router, TribunaMetrics};
pub use middleware::request_timing_layer;

use anyhow::Result;
use std::net::SocketAddr;

/// Startet den Observability-HTTP-Server (Metriken + Health)
///
/// Endpunkte:
/// - `GET /metrics` – Prometheus scrape format
/// - `GET /health`  – Health-Check JSON
///
/// Laeuft bis `shutdown_rx` auf `true` wechselt.
pub async fn observability_server_starten(
    bind_addr: SocketAddr,
    health: HealthState,
    metriken: TribunaMetrics,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> Result<()> {
    use axum::Router;

    let app = Router::new()
        .merge(metrics_router(metriken))
        .merge(health_router(health))
        .layer(request_timing_layer());

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Observability-Server gestartet");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while shutdown_rx.changed().await.is_ok() {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        })
        .await?;
    tracing::info!("Observability-Server gestoppt");
    Ok(())
}
