//! Kanal-basierter `FloorEventSink`
//!
//! Die Richtlinien-Schicht liest Floor-Ereignisse aus einem unbegrenzten
//! tokio-mpsc-Kanal. Melden blockiert nie den Session-Task.

use podium_core::event::{FloorEvent, FloorEventSink};
use std::sync::Arc;
use tokio::sync::mpsc;

/// `FloorEventSink`, der Ereignisse in einen mpsc-Kanal schreibt
#[derive(Debug, Clone)]
pub struct KanalSink {
    tx: mpsc::UnboundedSender<FloorEvent>,
}

impl KanalSink {
    pub fn neu(tx: mpsc::UnboundedSender<FloorEvent>) -> Self {
        Self { tx }
    }
}

impl FloorEventSink for KanalSink {
    fn melden(&self, event: FloorEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!(
                endpoint_id = %event.endpoint_id(),
                art = event.art(),
                "Kein Ereignis-Empfaenger mehr, Ereignis verworfen"
            );
        }
    }
}

/// Erstellt Sink und zugehoerigen Empfaenger
pub fn ereignis_kanal() -> (Arc<KanalSink>, mpsc::UnboundedReceiver<FloorEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(KanalSink::neu(tx)), rx)
}
