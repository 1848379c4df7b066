//! Dekodierte Protokoll-Nachricht
//!
//! `FloorMessage` ist die typisierte Sicht auf eine Nachricht: Primitive,
//! Header-Felder und die fuer den Session-Kern relevanten Attribute.
//! Eine gespeicherte eingehende Nachricht dient spaeter als Bezug fuer die
//! Korrelation ausgehender Status-Antworten (Transaction-ID, Floor-Request-ID).

use podium_core::types::{ConferenceId, EndpointId, FloorId};
use serde::{Deserialize, Serialize};

use crate::primitive::{Primitive, RequestStatus};

/// Eine dekodierte Floor-Control-Nachricht
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorMessage {
    /// Typ der Nachricht
    pub primitive: Primitive,
    /// Konferenz-ID aus dem Header
    pub conference_id: ConferenceId,
    /// Transaction-ID aus dem Header (0 = serverinitiiert)
    pub transaction_id: u16,
    /// User-ID aus dem Header
    pub user_id: EndpointId,
    /// FLOOR-ID-Attribut
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor_id: Option<FloorId>,
    /// FLOOR-REQUEST-ID-Attribut
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor_request_id: Option<u16>,
    /// REQUEST-STATUS-Attribut
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_status: Option<RequestStatus>,
}

impl FloorMessage {
    /// Erstellt eine Nachricht ohne Attribute
    pub fn neu(
        primitive: Primitive,
        conference_id: ConferenceId,
        user_id: EndpointId,
        transaction_id: u16,
    ) -> Self {
        Self {
            primitive,
            conference_id,
            transaction_id,
            user_id,
            floor_id: None,
            floor_request_id: None,
            request_status: None,
        }
    }

    /// Setzt das FLOOR-ID-Attribut
    pub fn mit_floor_id(mut self, floor_id: FloorId) -> Self {
        self.floor_id = Some(floor_id);
        self
    }

    /// Setzt das FLOOR-REQUEST-ID-Attribut
    pub fn mit_floor_request_id(mut self, id: u16) -> Self {
        self.floor_request_id = Some(id);
        self
    }

    /// Setzt das REQUEST-STATUS-Attribut
    pub fn mit_status(mut self, status: RequestStatus) -> Self {
        self.request_status = Some(status);
        self
    }

    pub fn primitive(&self) -> Primitive {
        self.primitive
    }

    pub fn floor_id(&self) -> Option<FloorId> {
        self.floor_id
    }
}
