//! Fehlertypen fuer den Session-Kern

use podium_core::types::{ConferenceId, EndpointId};
use podium_core::PodiumError;
use podium_protocol::CodecError;
use thiserror::Error;

/// Fehlertyp fuer Port-Pool, Endpunkt-Sessions und Koordinator
#[derive(Debug, Error)]
pub enum SessionError {
    /// Kein freier Server-Port im konfigurierten Bereich
    #[error("Kein freier Port verfuegbar (Port-Pool erschoepft)")]
    PortPoolErschoepft,

    /// Freigabe eines Ports, der nicht vergeben ist (Buchhaltungsfehler)
    #[error("Port {0} ist nicht vergeben")]
    PortNichtVergeben(u16),

    /// Unbekannte Transport-Art in der Session-Anfrage
    #[error("Transport nicht unterstuetzt: {0}")]
    TransportNichtUnterstuetzt(String),

    /// Endpunkt ist nicht registriert
    #[error("Unbekannter Endpunkt: {0}")]
    UnbekannterEndpunkt(EndpointId),

    /// Endpunkt oder Konferenz ist nicht registriert
    #[error("Unbekannter Endpunkt oder Konferenz: {endpoint_id}, {conference_id}")]
    UnbekannterEndpunktOderKonferenz {
        endpoint_id: EndpointId,
        conference_id: ConferenceId,
    },

    /// Fuer diese Endpunkt-ID laeuft bereits eine Session
    #[error("Endpunkt hat bereits eine aktive Session: {0}")]
    EndpunktBereitsAktiv(EndpointId),

    /// Kodieren oder Dekodieren einer Nachricht fehlgeschlagen
    #[error("Codec-Fehler: {0}")]
    Codec(#[from] CodecError),

    /// Socket-Fehler (Bind, Accept, Senden, Empfangen)
    #[error("Transport-Fehler: {0}")]
    Transport(#[from] std::io::Error),

    /// Nachricht konnte nicht in die Send-Queue eingereiht werden
    #[error("Senden fehlgeschlagen: {0}")]
    SendeFehler(&'static str),

    /// Session ist bereits beendet
    #[error("Session beendet: {0}")]
    SessionBeendet(EndpointId),

    /// Konferenz hat keine registrierten Endpunkte
    #[error("Unbekannte Konferenz: {0}")]
    UnbekannteKonferenz(ConferenceId),
}

impl SessionError {
    /// HTTP-Statuscode fuer die REST-API
    pub fn http_status(&self) -> u16 {
        match self {
            Self::TransportNichtUnterstuetzt(_) => 400,
            Self::UnbekannterEndpunkt(_)
            | Self::UnbekannterEndpunktOderKonferenz { .. }
            | Self::UnbekannteKonferenz(_) => 404,
            Self::EndpunktBereitsAktiv(_) => 409,
            Self::SessionBeendet(_) => 410,
            Self::PortPoolErschoepft | Self::SendeFehler(_) => 503,
            Self::PortNichtVergeben(_) | Self::Codec(_) | Self::Transport(_) => 500,
        }
    }

    /// Maschinenlesbarer Fehlercode
    pub fn code(&self) -> &'static str {
        match self {
            Self::PortPoolErschoepft => "port_pool_erschoepft",
            Self::PortNichtVergeben(_) => "port_nicht_vergeben",
            Self::TransportNichtUnterstuetzt(_) => "transport_nicht_unterstuetzt",
            Self::UnbekannterEndpunkt(_) => "unbekannter_endpunkt",
            Self::UnbekannterEndpunktOderKonferenz { .. } => "unbekannter_endpunkt_oder_konferenz",
            Self::EndpunktBereitsAktiv(_) => "endpunkt_bereits_aktiv",
            Self::Codec(_) => "codec",
            Self::Transport(_) => "transport",
            Self::SendeFehler(_) => "sende_fehler",
            Self::SessionBeendet(_) => "session_beendet",
            Self::UnbekannteKonferenz(_) => "unbekannte_konferenz",
        }
    }
}

impl From<PodiumError> for SessionError {
    fn from(fehler: PodiumError) -> Self {
        match fehler {
            PodiumError::TransportNichtUnterstuetzt(t) => Self::TransportNichtUnterstuetzt(t),
        }
    }
}

/// Result-Typ fuer den Session-Kern
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_zuordnung() {
        assert_eq!(SessionError::PortPoolErschoepft.http_status(), 503);
        assert_eq!(SessionError::TransportNichtUnterstuetzt("SCTP".into()).http_status(), 400);
        assert_eq!(SessionError::UnbekannterEndpunkt(EndpointId(1)).http_status(), 404);
        assert_eq!(SessionError::EndpunktBereitsAktiv(EndpointId(1)).http_status(), 409);
        assert_eq!(
            SessionError::Transport(std::io::Error::other("bind")).http_status(),
            500
        );
    }

    #[test]
    fn podium_fehler_wird_abgebildet() {
        let fehler: SessionError = PodiumError::TransportNichtUnterstuetzt("SCTP".into()).into();
        assert_eq!(fehler.code(), "transport_nicht_unterstuetzt");
        assert!(matches!(fehler, SessionError::TransportNichtUnterstuetzt(t) if t == "SCTP"));
    }

    #[test]
    fn unbekannte_konferenz_ist_404() {
        let fehler = SessionError::UnbekannteKonferenz(ConferenceId(9));
        assert_eq!(fehler.http_status(), 404);
        assert_eq!(fehler.code(), "unbekannte_konferenz");
        assert_eq!(fehler.to_string(), "Unbekannte Konferenz: conference:9");
    }
}
