//! Fehlertypen fuer das Codec-Gateway

use thiserror::Error;

/// Fehler beim Dekodieren oder Kodieren von Protokoll-Nachrichten
#[derive(Debug, Error)]
pub enum CodecError {
    /// Eingehende Bytes sind keine gueltige Nachricht
    #[error("Dekodierung fehlgeschlagen: {0}")]
    Dekodierung(String),

    /// Ausgehende Nachricht konnte nicht erzeugt werden
    #[error("Kodierung fehlgeschlagen: {0}")]
    Kodierung(String),

    /// Frame ueberschreitet die erlaubte Groesse
    #[error("Frame zu gross: {laenge} Bytes (Maximum: {maximum} Bytes)")]
    FrameZuGross { laenge: usize, maximum: usize },
}

impl CodecError {
    /// Erstellt einen Dekodierungsfehler
    pub fn dekodierung(msg: impl Into<String>) -> Self {
        Self::Dekodierung(msg.into())
    }

    /// Erstellt einen Kodierungsfehler
    pub fn kodierung(msg: impl Into<String>) -> Self {
        Self::Kodierung(msg.into())
    }
}

/// Result-Typ fuer das Codec-Gateway
pub type CodecResult<T> = Result<T, CodecError>;
