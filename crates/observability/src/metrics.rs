//! Prometheus-kompatible Metriken fuer Podium
//!
//! Registrierte Metriken:
//! - `podium_sessions_active` – Gauge: Aktive Endpunkt-Sessions
//! - `podium_conferences_active` – Gauge: Aktive Konferenzen
//! - `podium_ports_allocated` – Gauge: Vergebene Server-Ports
//! - `podium_floor_events_total` – Counter: Floor-Ereignisse (kind)
//! - `podium_floor_decisions_total` – Counter: Floor-Entscheidungen (ergebnis)

use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Alle Podium-Prometheus-Metriken
#[derive(Clone)]
pub struct FloorMetrics {
    pub registry: Arc<Registry>,

    pub sessions_active: IntGauge,
    pub conferences_active: IntGauge,
    pub ports_allocated: IntGauge,

    pub floor_events_total: IntCounterVec,
    pub floor_decisions_total: IntCounterVec,
}

impl FloorMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        // --- Zustand ---
        let sessions_active = IntGauge::with_opts(Opts::new(
            "podium_sessions_active",
            "Anzahl aktiver Endpunkt-Sessions",
        ))?;
        registry.register(Box::new(sessions_active.clone()))?;

        let conferences_active = IntGauge::with_opts(Opts::new(
            "podium_conferences_active",
            "Anzahl aktiver Konferenzen",
        ))?;
        registry.register(Box::new(conferences_active.clone()))?;

        let ports_allocated = IntGauge::with_opts(Opts::new(
            "podium_ports_allocated",
            "Anzahl vergebener Server-Ports",
        ))?;
        registry.register(Box::new(ports_allocated.clone()))?;

        // --- Floor-Control ---
        let floor_events_total = IntCounterVec::new(
            Opts::new("podium_floor_events_total", "Gemeldete Floor-Ereignisse"),
            &["kind"],
        )?;
        registry.register(Box::new(floor_events_total.clone()))?;

        let floor_decisions_total = IntCounterVec::new(
            Opts::new(
                "podium_floor_decisions_total",
                "An Endpunkte weitergeleitete Floor-Entscheidungen",
            ),
            &["ergebnis"],
        )?;
        registry.register(Box::new(floor_decisions_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            sessions_active,
            conferences_active,
            ports_allocated,
            floor_events_total,
            floor_decisions_total,
        })
    }

    /// Uebernimmt eine Momentaufnahme des Koordinator-Zustands
    pub fn zustand_setzen(&self, sessions: usize, konferenzen: usize, ports: usize) {
        self.sessions_active.set(sessions as i64);
        self.conferences_active.set(konferenzen as i64);
        self.ports_allocated.set(ports as i64);
    }

    /// Zaehlt ein Floor-Ereignis (`floor_request`, `floor_release`, `floor_query`)
    pub fn ereignis_zaehlen(&self, art: &str) {
        self.floor_events_total.with_label_values(&[art]).inc();
    }

    /// Zaehlt eine weitergeleitete Entscheidung
    pub fn entscheidung_zaehlen(&self, granted: bool) {
        let ergebnis = if granted { "granted" } else { "released" };
        self.floor_decisions_total.with_label_values(&[ergebnis]).inc();
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
pub fn metrics_router(metriken: FloorMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<FloorMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    #[test]
    fn zustand_setzen() {
        let metriken = FloorMetrics::neu().unwrap();
        metriken.zustand_setzen(3, 1, 3);
        assert_eq!(metriken.sessions_active.get(), 3);
        assert_eq!(metriken.conferences_active.get(), 1);
        assert_eq!(metriken.ports_allocated.get(), 3);

        metriken.zustand_setzen(0, 0, 0);
        assert_eq!(metriken.sessions_active.get(), 0);
    }

    #[test]
    fn ereignisse_nach_art() {
        let metriken = FloorMetrics::neu().unwrap();
        metriken.ereignis_zaehlen("floor_request");
        metriken.ereignis_zaehlen("floor_request");
        metriken.ereignis_zaehlen("floor_query");

        let anfragen = metriken
            .floor_events_total
            .with_label_values(&["floor_request"])
            .get();
        assert_eq!(anfragen, 2);
        assert_eq!(
            metriken.floor_events_total.with_label_values(&["floor_release"]).get(),
            0
        );
    }

    #[test]
    fn entscheidungen_getrennt_gezaehlt() {
        let metriken = FloorMetrics::neu().unwrap();
        metriken.entscheidung_zaehlen(true);
        metriken.entscheidung_zaehlen(false);
        metriken.entscheidung_zaehlen(true);

        assert_eq!(metriken.floor_decisions_total.with_label_values(&["granted"]).get(), 2);
        assert_eq!(metriken.floor_decisions_total.with_label_values(&["released"]).get(), 1);
    }

    #[test]
    fn export_prometheus_format() {
        let metriken = FloorMetrics::neu().unwrap();
        metriken.zustand_setzen(2, 1, 2);
        metriken.ereignis_zaehlen("floor_release");

        let output = metriken.exportieren().unwrap();
        assert!(output.contains("podium_sessions_active 2"));
        assert!(output.contains("podium_floor_events_total{kind=\"floor_release\"} 1"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[tokio::test]
    async fn metrics_endpunkt_liefert_text() {
        let metriken = FloorMetrics::neu().unwrap();
        metriken.zustand_setzen(1, 1, 1);

        let antwort = metrics_router(metriken)
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::OK);

        let body = to_bytes(antwort.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("podium_conferences_active 1"));
    }
}
