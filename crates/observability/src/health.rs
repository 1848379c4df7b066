//! Health-Check-Endpunkt fuer Podium
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime, aktiven Sessions und freien Ports

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Port-Pool erschoepft, neue Sessions werden abgelehnt
    Degraded,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub sessions: usize,
    pub ports_verfuegbar: usize,
}

/// Geteilter Zustand fuer den Health-Check-Handler
///
/// Wird periodisch vom Server mit dem Koordinator-Zustand aktualisiert.
#[derive(Clone)]
pub struct HealthState {
    start_time: Arc<Instant>,
    sessions: Arc<AtomicUsize>,
    ports_verfuegbar: Arc<AtomicUsize>,
}

impl HealthState {
    pub fn neu(ports_verfuegbar: usize) -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            sessions: Arc::new(AtomicUsize::new(0)),
            ports_verfuegbar: Arc::new(AtomicUsize::new(ports_verfuegbar)),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn kapazitaet_setzen(&self, sessions: usize, ports_verfuegbar: usize) {
        self.sessions.store(sessions, Ordering::Relaxed);
        self.ports_verfuegbar.store(ports_verfuegbar, Ordering::Relaxed);
    }

    pub fn status(&self) -> HealthStatus {
        if self.ports_verfuegbar.load(Ordering::Relaxed) == 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    fn antwort(&self) -> HealthResponse {
        HealthResponse {
            status: self.status(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.uptime_seconds(),
            sessions: self.sessions.load(Ordering::Relaxed),
            ports_verfuegbar: self.ports_verfuegbar.load(Ordering::Relaxed),
        }
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – 200 auch bei degraded, die Probe soll nicht fehlschlagen
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.antwort()))
}
