//! JSON-Wire-Format fuer Entwicklung und Tests
//!
//! `JsonCodec` implementiert das `CodecGateway` mit laengenpraefixierten
//! JSON-Frames. Es ersetzt nicht das binaere Floor-Control-Format, sondern
//! erlaubt End-to-End-Betrieb ohne externen Protokoll-Codec.
//!
//! ## Frame-Format
//!
//! ```text
//! +--------+--------+--------+--------+----...----+
//! | Laenge (u32 BE)                   | JSON      |
//! +--------+--------+--------+--------+----...----+
//! ```
//!
//! Die Laenge gibt die Anzahl der Payload-Bytes an (ohne die 4 Laengen-Bytes).
//! Dasselbe Format gilt fuer UDP-Datagramme und TCP-Streams.

use bytes::{BufMut, Bytes, BytesMut};
use podium_core::types::FloorId;

use crate::error::{CodecError, CodecResult};
use crate::gateway::{CodecGateway, Kopfdaten};
use crate::message::FloorMessage;
use crate::primitive::{Primitive, RequestStatus};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (64 KiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Groesse des Laengen-Felds in Bytes
pub const LENGTH_FIELD_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// Codec-Gateway mit laengenpraefixierten JSON-Frames
#[derive(Debug, Clone)]
pub struct JsonCodec {
    /// Maximale erlaubte Payload-Groesse in Bytes
    max_frame_size: usize,
}

impl JsonCodec {
    /// Erstellt einen neuen `JsonCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Erstellt einen `JsonCodec` mit benutzerdefinierter maximaler Frame-Groesse
    pub fn mit_max_groesse(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Gibt die konfigurierte maximale Frame-Groesse zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Kodiert eine beliebige Nachricht als Frame
    ///
    /// Wird intern fuer alle Antworten genutzt und von Test-Clients, um
    /// Anfragen an den Server zu erzeugen.
    pub fn kodieren(&self, nachricht: &FloorMessage) -> CodecResult<Bytes> {
        let json = serde_json::to_vec(nachricht).map_err(|e| {
            CodecError::kodierung(format!("JSON-Serialisierung fehlgeschlagen: {e}"))
        })?;

        if json.len() > self.max_frame_size {
            return Err(CodecError::FrameZuGross {
                laenge: json.len(),
                maximum: self.max_frame_size,
            });
        }

        let mut buf = BytesMut::with_capacity(LENGTH_FIELD_SIZE + json.len());
        buf.put_u32(json.len() as u32);
        buf.put_slice(&json);
        Ok(buf.freeze())
    }

    /// Liest das Laengen-Feld und prueft die Maximalgroesse
    fn payload_laenge(&self, puffer: &[u8]) -> CodecResult<Option<usize>> {
        if puffer.len() < LENGTH_FIELD_SIZE {
            return Ok(None);
        }
        let laenge = u32::from_be_bytes([puffer[0], puffer[1], puffer[2], puffer[3]]) as usize;
        if laenge > self.max_frame_size {
            return Err(CodecError::FrameZuGross {
                laenge,
                maximum: self.max_frame_size,
            });
        }
        Ok(Some(laenge))
    }

    /// Baut eine Antwort und uebernimmt die Korrelationsdaten aus `bezug`
    fn antwort(
        &self,
        primitive: Primitive,
        kopf: &Kopfdaten,
        bezug: Option<&FloorMessage>,
        floor_id: Option<FloorId>,
        status: Option<RequestStatus>,
    ) -> CodecResult<Bytes> {
        let mut nachricht = FloorMessage::neu(
            primitive,
            kopf.conference_id,
            kopf.endpoint_id,
            bezug.map(|b| b.transaction_id).unwrap_or(0),
        );
        nachricht.floor_id = floor_id;
        nachricht.floor_request_id = bezug.and_then(|b| b.floor_request_id);
        nachricht.request_status = status;
        self.kodieren(&nachricht)
    }
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecGateway for JsonCodec {
    fn decode(&self, daten: &[u8]) -> CodecResult<FloorMessage> {
        let laenge = self
            .payload_laenge(daten)?
            .ok_or_else(|| CodecError::dekodierung("Laengen-Feld unvollstaendig"))?;

        let payload = &daten[LENGTH_FIELD_SIZE..];
        if payload.len() != laenge {
            return Err(CodecError::dekodierung(format!(
                "Laenge stimmt nicht: Header {} Bytes, erhalten {} Bytes",
                laenge,
                payload.len()
            )));
        }

        serde_json::from_slice(payload).map_err(|e| {
            CodecError::dekodierung(format!("JSON-Deserialisierung fehlgeschlagen: {e}"))
        })
    }

    fn frame_laenge(&self, puffer: &[u8]) -> CodecResult<Option<usize>> {
        Ok(self
            .payload_laenge(puffer)?
            .map(|laenge| LENGTH_FIELD_SIZE + laenge)
            .filter(|gesamt| puffer.len() >= *gesamt))
    }

    fn hello_ack(&self, kopf: &Kopfdaten, hello: &FloorMessage) -> CodecResult<Bytes> {
        self.antwort(Primitive::HelloAck, kopf, Some(hello), None, None)
    }

    fn floor_request_status(
        &self,
        kopf: &Kopfdaten,
        bezug: Option<&FloorMessage>,
        floor_id: Option<FloorId>,
        status: RequestStatus,
    ) -> CodecResult<Bytes> {
        self.antwort(Primitive::FloorRequestStatus, kopf, bezug, floor_id, Some(status))
    }

    fn floor_status(
        &self,
        kopf: &Kopfdaten,
        bezug: Option<&FloorMessage>,
        floor_id: Option<FloorId>,
        status: RequestStatus,
    ) -> CodecResult<Bytes> {
        self.antwort(Primitive::FloorStatus, kopf, bezug, floor_id, Some(status))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
