//! Prometheus-kompatible Metriken fuer Tribuna
//!
//! Registrierte Metriken:
//! - `tribuna_ticks_total` – Counter: verarbeitete Sekundentakte
//! - `tribuna_zeit_abgelaufen_total` – Counter: abgelaufene Redezeiten
//! - `tribuna_apartes_total` – Counter: vergebene Apartes
//! - `tribuna_aktionen_abgelehnt_total` – Counter: abgelehnte Bedienaktionen
//! - `tribuna_takt_stoerungen_total` – Counter: verspaetete Sekundentakte
//! - `tribuna_relais_verbunden` – Gauge: 1 wenn das Relais verbunden ist
//! - `tribuna_restzeit_sekunden` – Gauge: Restzeit des Live-Redners

use anyhow::Result;
use axum::{response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Alle Tribuna-Prometheus-Metriken
#[derive(Clone)]
pub struct TribunaMetrics {
    pub registry: Arc<Registry>,

    pub ticks_total: IntCounter,
    pub zeit_abgelaufen_total: IntCounter,
    pub apartes_total: IntCounter,
    pub aktionen_abgelehnt_total: IntCounter,
    pub takt_stoerungen_total: IntCounter,

    pub relais_verbunden: IntGauge,
    pub restzeit_sekunden: IntGauge,
}

fn zaehler(registry: &Registry, name: &str, hilfe: &str) -> Result<IntCounter> {
    let c = IntCounter::with_opts(Opts::new(name, hilfe))?;
    registry.register(Box::new(c.clone()))?;
    Ok(c)
}

fn anzeige(registry: &Registry, name: &str, hilfe: &str) -> Result<IntGauge> {
    let g = IntGauge::with_opts(Opts::new(name, hilfe))?;
    registry.register(Box::new(g.clone()))?;
    Ok(g)
}

impl TribunaMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let ticks_total = zaehler(
            &registry,
            "tribuna_ticks_total",
            "Anzahl verarbeiteter Sekundentakte",
        )?;
        let zeit_abgelaufen_total = zaehler(
            &registry,
            "tribuna_zeit_abgelaufen_total",
            "Anzahl abgelaufener Redezeiten",
        )?;
        let apartes_total = zaehler(
            &registry,
            "tribuna_apartes_total",
            "Anzahl vergebener Apartes",
        )?;
        let aktionen_abgelehnt_total = zaehler(
            &registry,
            "tribuna_aktionen_abgelehnt_total",
            "Anzahl abgelehnter Bedienaktionen",
        )?;
        let takt_stoerungen_total = zaehler(
            &registry,
            "tribuna_takt_stoerungen_total",
            "Anzahl verspaeteter Sekundentakte",
        )?;

        let relais_verbunden = anzeige(
            &registry,
            "tribuna_relais_verbunden",
            "1 wenn das Relais verbunden ist",
        )?;
        let restzeit_sekunden = anzeige(
            &registry,
            "tribuna_restzeit_sekunden",
            "Restzeit des Live-Redners in Sekunden",
        )?;

        Ok(Self {
            registry: Arc::new(registry),
            ticks_total,
            zeit_abgelaufen_total,
            apartes_total,
            aktionen_abgelehnt_total,
            takt_stoerungen_total,
            relais_verbunden,
            restzeit_sekunden,
        })
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: TribunaMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(
    axum::extract::State(metriken): axum::extract::State<TribunaMetrics>,
) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
