//! podium-protocol – Codec-Gateway fuer das Floor-Control-Protokoll
//!
//! Der Session-Kern beruehrt nie rohe Protokoll-Bytes. Dieses Crate definiert
//! die schmale Schnittstelle, ueber die er Nachrichten dekodiert und Antworten
//! kodiert, sowie die dabei ausgetauschten Typen.
//!
//! ## Module
//! - [`primitive`] – Primitive (Nachrichtentypen) und Request-Status
//! - [`message`] – Dekodierte Nachricht mit typisierten Attributen
//! - [`gateway`] – `CodecGateway`-Trait
//! - [`wire`] – `JsonCodec`, laengenpraefixierte JSON-Frames fuer Entwicklung und Tests
//! - [`error`] – Codec-Fehler

pub mod error;
pub mod gateway;
pub mod message;
pub mod primitive;
pub mod wire;

pub use error::{CodecError, CodecResult};
pub use gateway::{CodecGateway, Kopfdaten};
pub use message::FloorMessage;
pub use primitive::{Primitive, RequestStatus};
pub use wire::JsonCodec;
