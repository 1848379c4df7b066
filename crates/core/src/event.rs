//! Floor-Ereignisse und Beobachter-Schnittstelle
//!
//! Endpunkt-Sessions melden eingehende FloorRequest-, FloorRelease- und
//! FloorQuery-Nachrichten als `FloorEvent`. Die Richtlinien-Schicht der
//! Host-Anwendung registriert einen `FloorEventSink` und trifft darauf ihre
//! Floor-Entscheidungen; Podium selbst entscheidet nie.

use crate::types::{ConferenceId, EndpointId};
use serde::{Deserialize, Serialize};

/// Ereignisse, die an die Richtlinien-Schicht gemeldet werden
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "typ", rename_all = "PascalCase")]
pub enum FloorEvent {
    /// Ein Endpunkt fordert einen Floor an
    FloorRequest {
        endpoint_id: EndpointId,
        conference_id: ConferenceId,
    },
    /// Ein Endpunkt gibt einen Floor frei
    FloorRelease {
        endpoint_id: EndpointId,
        conference_id: ConferenceId,
    },
    /// Ein Endpunkt fragt den Status eines Floors ab
    FloorQuery {
        endpoint_id: EndpointId,
        conference_id: ConferenceId,
    },
}

impl FloorEvent {
    /// Endpunkt, der das Ereignis ausgeloest hat
    pub fn endpoint_id(&self) -> EndpointId {
        match self {
            Self::FloorRequest { endpoint_id, .. }
            | Self::FloorRelease { endpoint_id, .. }
            | Self::FloorQuery { endpoint_id, .. } => *endpoint_id,
        }
    }

    /// Konferenz des ausloesenden Endpunkts
    pub fn conference_id(&self) -> ConferenceId {
        match self {
            Self::FloorRequest { conference_id, .. }
            | Self::FloorRelease { conference_id, .. }
            | Self::FloorQuery { conference_id, .. } => *conference_id,
        }
    }

    /// Kurzname fuer Logs und Metrik-Labels
    pub fn art(&self) -> &'static str {
        match self {
            Self::FloorRequest { .. } => "floor_request",
            Self::FloorRelease { .. } => "floor_release",
            Self::FloorQuery { .. } => "floor_query",
        }
    }
}

/// Beobachter fuer Floor-Ereignisse
///
/// Wird aus den Empfangs-Tasks der Sessions aufgerufen und darf daher nicht
/// blockieren. Die Kanal-Implementierung liegt im Session-Crate.
pub trait FloorEventSink: Send + Sync + 'static {
    /// Meldet ein Ereignis an die Host-Anwendung
    fn melden(&self, event: FloorEvent);
}
