//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable, die Vorrang vor der Konfigurationsdatei hat:
//! - `PODIUM_LOG_LEVEL`: Log-Level oder Filter-Direktive, Standard: info
//! - `PODIUM_LOG_FORMAT`: Format (text/json), Standard: text

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "PODIUM_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "PODIUM_LOG_FORMAT";

/// Initialisiert das Logging-System
///
/// Ungueltige Level fallen auf `info`, unbekannte Formate auf `text` zurueck.
/// Schlaegt fehl, wenn bereits ein globaler Subscriber gesetzt ist.
pub fn logging_initialisieren(level: &str, format: &str) -> Result<()> {
    let level = log_level_aus_env().unwrap_or_else(|| level.to_string());
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));

    let format = log_format_aus_env().unwrap_or_else(|| format.to_string());

    let ergebnis = match format.as_str() {
        "json" => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        _ => fmt().with_env_filter(filter).with_target(true).try_init(),
    };

    ergebnis.map_err(|e| anyhow!("Logging konnte nicht initialisiert werden: {e}"))
}

/// Log-Level aus der Umgebung, falls gesetzt
pub fn log_level_aus_env() -> Option<String> {
    std::env::var(ENV_LOG_LEVEL).ok()
}

/// Log-Format aus der Umgebung, falls gesetzt
pub fn log_format_aus_env() -> Option<String> {
    std::env::var(ENV_LOG_FORMAT).ok()
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_gueltige_werte() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(log_level_gueltig(level), "{level} sollte gueltig sein");
        }
    }

    #[test]
    fn log_level_ungueltige_werte() {
        assert!(!log_level_gueltig("verbose"));
        assert!(!log_level_gueltig("INFO")); // Gross-/Kleinschreibung
        assert!(!log_level_gueltig(""));
    }

    #[test]
    fn log_format_werte() {
        assert!(log_format_gueltig("text"));
        assert!(log_format_gueltig("json"));
        assert!(!log_format_gueltig("xml"));
        assert!(!log_format_gueltig("JSON"));
    }

    #[test]
    fn log_format_aus_env_gesetzt_und_entfernt() {
        std::env::set_var(ENV_LOG_FORMAT, "json");
        assert_eq!(log_format_aus_env().as_deref(), Some("json"));
        std::env::remove_var(ENV_LOG_FORMAT);
        assert_eq!(log_format_aus_env(), None);
    }

    #[test]
    fn zweite_initialisierung_schlaegt_fehl() {
        // Erste Initialisierung kann durch andere Tests bereits erfolgt sein
        let _ = logging_initialisieren("debug", "text");
        assert!(logging_initialisieren("debug", "text").is_err());
    }
}
