//! Gemeinsame Identifikationstypen fuer Podium
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! Endpunkt-, Konferenz- und Floor-IDs zur Compilezeit auszuschliessen.
//! Die Werte selbst vergibt der Aufrufer (Media-Server), Podium erzeugt
//! keine eigenen IDs.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::PodiumError;

/// Eindeutige Endpunkt-ID (pro Prozess eindeutig, vom Aufrufer vergeben)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(pub u64);

impl EndpointId {
    /// Gibt den inneren Wert zurueck
    pub fn inner(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EndpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "endpoint:{}", self.0)
    }
}

/// Konferenz-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConferenceId(pub u64);

impl ConferenceId {
    /// Gibt den inneren Wert zurueck
    pub fn inner(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConferenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conference:{}", self.0)
    }
}

/// Floor-ID (16 Bit wie im FLOOR-ID-Attribut)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FloorId(pub u16);

impl std::fmt::Display for FloorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "floor:{}", self.0)
    }
}

/// Transport-Art einer Endpunkt-Session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransportKind {
    Udp,
    Tcp,
}

impl TransportKind {
    /// Protokoll-Bezeichnung wie in der Session-Aushandlung
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Udp => "UDP",
            Self::Tcp => "TCP",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.als_str())
    }
}

impl FromStr for TransportKind {
    type Err = PodiumError;

    /// Akzeptiert "UDP" und "TCP" (Gross-/Kleinschreibung egal)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UDP" => Ok(Self::Udp),
            "TCP" => Ok(Self::Tcp),
            _ => Err(PodiumError::TransportNichtUnterstuetzt(s.to_string())),
        }
    }
}
