//! podium-core – Gemeinsame Typen, Traits und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Podium-Crates gemeinsam genutzt werden: Identifikationstypen fuer
//! Endpunkte, Konferenzen und Floors, die Transport-Art einer Session und die
//! Floor-Ereignisse, die an die Richtlinien-Schicht gemeldet werden.

pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{PodiumError, Result};
pub use event::{FloorEvent, FloorEventSink};
pub use types::{ConferenceId, EndpointId, FloorId, TransportKind};
