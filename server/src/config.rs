//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use podium_session::ports::{STANDARD_MAX_PORT, STANDARD_MIN_PORT};
use podium_session::PortBereich;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Port-Bereich fuer Endpunkt-Sessions
    pub ports: PortEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
    /// Standard-Richtlinie fuer Floor-Entscheidungen
    pub richtlinie: RichtlinienEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Podium Server".into(),
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Server-IP: Sessions binden hier und sie wird Endpunkten mitgeteilt
    pub bind_adresse: String,
    /// Port fuer die REST-API
    pub api_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "127.0.0.1".into(),
            api_port: 10080,
        }
    }
}

/// Port-Bereich fuer Endpunkt-Sessions
///
/// Als `u32` eingelesen, damit ungueltige Werte (z.B. 70000) nicht schon beim
/// Parsen scheitern, sondern auf den Standard-Bereich zurueckfallen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortEinstellungen {
    pub min: u32,
    pub max: u32,
}

impl Default for PortEinstellungen {
    fn default() -> Self {
        Self {
            min: STANDARD_MIN_PORT as u32,
            max: STANDARD_MAX_PORT as u32,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    /// Port fuer Metriken und Health (Standard: 9300)
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            port: 9300,
        }
    }
}

/// Standard-Richtlinie
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RichtlinienEinstellungen {
    /// Jede Anfrage automatisch gewaehren, Freigaben bestaetigen
    ///
    /// `false`: Entscheidungen kommen ausschliesslich ueber die REST-API.
    pub auto_gewaehren: bool,
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Server-IP fuer Sessions und Antworten
    pub fn server_ip(&self) -> anyhow::Result<IpAddr> {
        self.netzwerk.bind_adresse.parse().map_err(|e| {
            anyhow::anyhow!(
                "Ungueltige bind_adresse '{}': {e}",
                self.netzwerk.bind_adresse
            )
        })
    }

    /// Validierter Port-Bereich (Standard-Bereich bei ungueltigen Grenzen)
    pub fn port_bereich(&self) -> PortBereich {
        PortBereich::neu(self.ports.min, self.ports.max)
    }

    /// Gibt die Bind-Adresse fuer die REST-API zurueck
    pub fn api_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        Ok(SocketAddr::new(self.server_ip()?, self.netzwerk.api_port))
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn observability_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        Ok(SocketAddr::new(self.server_ip()?, self.observability.port))
    }
}
