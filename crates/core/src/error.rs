//! Fehlertypen fuer Podium
//!
//! Zentraler Fehler-Enum fuer crate-uebergreifende Fehlerzustaende.
//! Untermodule definieren eigene Fehler und konvertieren via `#[from]`.

use thiserror::Error;

/// Globaler Result-Alias fuer Podium
pub type Result<T> = std::result::Result<T, PodiumError>;

/// Crate-uebergreifende Fehler im Podium-System
#[derive(Debug, Error)]
pub enum PodiumError {
    #[error("Transport nicht unterstuetzt: {0}")]
    TransportNichtUnterstuetzt(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = PodiumError::TransportNichtUnterstuetzt("SCTP".into());
        assert_eq!(e.to_string(), "Transport nicht unterstuetzt: SCTP");
    }
}
