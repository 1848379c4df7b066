//! podium-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod api;
pub mod config;
pub mod richtlinie;

use anyhow::Result;
use config::ServerConfig;
use podium_observability::{observability_server_starten, FloorMetrics, HealthState};
use podium_protocol::JsonCodec;
use podium_session::{ereignis_kanal, PortPool, SessionKoordinator};
use std::sync::Arc;
use std::time::Duration;

use crate::api::{v1_router, ApiState};
use crate::richtlinie::FloorRichtlinie;

/// Intervall, in dem Metriken und Health-Status aktualisiert werden
const ZUSTAND_INTERVALL: Duration = Duration::from_secs(1);

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Port-Pool und Session-Koordinator aufbauen
    /// 2. Floor-Richtlinie und Zustands-Aktualisierung starten
    /// 3. Observability-Server starten (optional)
    /// 4. REST-API starten
    /// 5. Auf Ctrl-C warten, danach alle Sessions stoppen
    pub async fn starten(self) -> Result<()> {
        let server_ip = self.config.server_ip()?;
        let pool = Arc::new(PortPool::neu(self.config.port_bereich()));

        tracing::info!(
            server_name = %self.config.server.name,
            server_ip = %server_ip,
            port_min = pool.bereich().min(),
            port_max = pool.bereich().max(),
            api_port = self.config.netzwerk.api_port,
            "Server startet"
        );

        let (sink, ereignisse) = ereignis_kanal();
        let koordinator =
            SessionKoordinator::neu(server_ip, Arc::clone(&pool), Arc::new(JsonCodec::new()), sink);

        let metriken = FloorMetrics::neu()?;
        let health = HealthState::neu(pool.verfuegbar_anzahl());

        // Floor-Richtlinie
        let richtlinie = FloorRichtlinie::neu(
            koordinator.clone(),
            metriken.clone(),
            self.config.richtlinie.auto_gewaehren,
        );
        tokio::spawn(richtlinie.ausfuehren(ereignisse));

        // Metriken und Health aus dem Koordinator-Zustand
        tokio::spawn(zustand_aktualisieren(
            koordinator.clone(),
            metriken.clone(),
            health.clone(),
        ));

        if self.config.observability.aktiviert {
            let adresse = self.config.observability_bind_adresse()?;
            let (metriken, health) = (metriken.clone(), health.clone());
            tokio::spawn(async move {
                if let Err(e) = observability_server_starten(adresse, metriken, health).await {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            });
        }

        // REST-API
        let api_adresse = self.config.api_bind_adresse()?;
        let app = v1_router(ApiState {
            koordinator: koordinator.clone(),
            metriken,
        });
        let listener = tokio::net::TcpListener::bind(api_adresse).await?;
        tracing::info!(addr = %api_adresse, "REST-API gestartet");

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
        koordinator.alle_stoppen().await;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(fehler = %e, "Ctrl-C-Handler konnte nicht installiert werden");
        std::future::pending::<()>().await;
    }
}

/// Uebertraegt periodisch die Koordinator-Statistik in Metriken und Health
async fn zustand_aktualisieren(
    koordinator: SessionKoordinator,
    metriken: FloorMetrics,
    health: HealthState,
) {
    let mut intervall = tokio::time::interval(ZUSTAND_INTERVALL);
    loop {
        intervall.tick().await;
        let statistik = koordinator.statistik();
        metriken.zustand_setzen(
            statistik.sessions,
            statistik.konferenzen,
            statistik.ports_vergeben,
        );
        health.kapazitaet_setzen(statistik.sessions, statistik.ports_verfuegbar);
    }
}
