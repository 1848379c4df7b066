//! Codec-Gateway – schmale Schnittstelle zwischen Session-Kern und Wire-Format
//!
//! Eine Endpunkt-Session uebergibt jedes empfangene Datagramm bzw. jeden
//! TCP-Frame an [`CodecGateway::decode`] und erzeugt Antworten ausschliesslich
//! ueber die `hello_ack`/`floor_request_status`/`floor_status`-Builder.
//! Das konkrete Bit-Layout liegt vollstaendig in der Implementierung.
//!
//! ```text
//! Transport (Bytes) --> decode() --> FloorMessage --> Dispatcher
//! Dispatcher --> floor_status()/... --> Bytes --> Transport
//! ```

use bytes::Bytes;
use podium_core::types::{ConferenceId, EndpointId, FloorId};

use crate::error::CodecResult;
use crate::message::FloorMessage;
use crate::primitive::RequestStatus;

/// Header-Daten einer ausgehenden Nachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kopfdaten {
    pub conference_id: ConferenceId,
    pub endpoint_id: EndpointId,
}

/// Schnittstelle zum Protokoll-Codec
///
/// Implementierungen muessen zustandslos bzw. intern synchronisiert sein, da
/// alle Sessions dieselbe Instanz (`Arc<dyn CodecGateway>`) teilen.
pub trait CodecGateway: Send + Sync + 'static {
    /// Dekodiert eine vollstaendige Nachricht
    fn decode(&self, daten: &[u8]) -> CodecResult<FloorMessage>;

    /// Laenge des ersten vollstaendigen Frames im Stream-Puffer
    ///
    /// `Ok(None)` solange noch Bytes fehlen. Ein Fehler bedeutet, dass der
    /// Stream nicht mehr synchronisiert werden kann.
    fn frame_laenge(&self, puffer: &[u8]) -> CodecResult<Option<usize>>;

    /// HelloAck als Antwort auf ein Hello
    fn hello_ack(&self, kopf: &Kopfdaten, hello: &FloorMessage) -> CodecResult<Bytes>;

    /// FloorRequestStatus, korreliert mit `bezug` (falls vorhanden)
    fn floor_request_status(
        &self,
        kopf: &Kopfdaten,
        bezug: Option<&FloorMessage>,
        floor_id: Option<FloorId>,
        status: RequestStatus,
    ) -> CodecResult<Bytes>;

    /// FloorStatus, korreliert mit `bezug` oder unaufgefordert (`None`)
    fn floor_status(
        &self,
        kopf: &Kopfdaten,
        bezug: Option<&FloorMessage>,
        floor_id: Option<FloorId>,
        status: RequestStatus,
    ) -> CodecResult<Bytes>;
}
