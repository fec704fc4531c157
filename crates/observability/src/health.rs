//! Health-Check-Endpunkt fuer Tribuna
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime, Relais-Verbindung und
//! Sitzungsphase. Ohne Relais ist das System `degraded`: die Redezeit
//! laeuft weiter, nur die Audiosteuerung fehlt.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tribuna_core::{SessionSnapshot, Sitzungsphase};

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub relay_connected: bool,
    pub phase: Sitzungsphase,
    pub remaining_seconds: u32,
}

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    start_time: Arc<Instant>,
    relay_connected: Arc<AtomicBool>,
    /// Taktgeber gestoert: Sitzung braucht den Bediener
    takt_gestoert: Arc<AtomicBool>,
    sitzung: Arc<RwLock<(Sitzungsphase, u32)>>,
}

impl HealthState {
    pub fn neu() -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            relay_connected: Arc::new(AtomicBool::new(false)),
            takt_gestoert: Arc::new(AtomicBool::new(false)),
            sitzung: Arc::new(RwLock::new((Sitzungsphase::Idle, 0))),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn relais_verbunden(&self) -> bool {
        self.relay_connected.load(Ordering::Relaxed)
    }

    pub fn takt_gestoert_setzen(&self, gestoert: bool) {
        self.takt_gestoert.store(gestoert, Ordering::Relaxed);
    }

    /// Uebernimmt Relais-Status und Phase aus einem Snapshot
    pub fn aktualisieren(&self, snapshot: &SessionSnapshot) {
        self.relay_connected
            .store(snapshot.relay_connected, Ordering::Relaxed);
        *self.sitzung.write() = (snapshot.phase, snapshot.remaining_seconds);
        if snapshot.clock_running {
            self.takt_gestoert.store(false, Ordering::Relaxed);
        }
    }

    pub fn status(&self) -> HealthStatus {
        if self.takt_gestoert.load(Ordering::Relaxed) {
            HealthStatus::Unhealthy
        } else if self.relais_verbunden() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        }
    }

    pub fn antwort(&self) -> HealthResponse {
        let (phase, remaining_seconds) = *self.sitzung.read();
        HealthResponse {
            status: self.status(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.uptime_seconds(),
            relay_connected: self.relais_verbunden(),
            phase,
            remaining_seconds,
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::neu()
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Systemstatus zurueck
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let response = state.antwort();
    let http_status = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK, // 200 auch bei degraded (Probe soll nicht failen)
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (http_status, Json(response))
}
