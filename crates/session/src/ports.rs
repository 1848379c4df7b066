//! Port-Pool – Vergabe und Wiederverwendung von Server-Ports
//!
//! Jede Endpunkt-Session bekommt einen eigenen lokalen Port aus einem
//! konfigurierten Bereich. Freigegebene Ports landen auf einer Free-List
//! (LIFO) und werden vor dem Weiterzaehlen wiederverwendet.
//!
//! ## Invarianten
//! - Ein vergebener Port wird nie ein zweites Mal herausgegeben
//! - Die Freigabe eines nicht vergebenen Ports ist ein Buchhaltungsfehler
//!   und wird als `PortNichtVergeben` gemeldet, der Zustand bleibt unveraendert
//!
//! Thread-safe durch einen einzelnen Mutex um den gesamten Pool-Zustand.

use parking_lot::Mutex;
use std::collections::HashSet;

use crate::error::{SessionError, SessionResult};

/// Standard-Bereich falls die Konfiguration ungueltig ist
pub const STANDARD_MIN_PORT: u16 = 50000;
pub const STANDARD_MAX_PORT: u16 = 50999;

// ---------------------------------------------------------------------------
// PortBereich
// ---------------------------------------------------------------------------

/// Inklusiver Port-Bereich [min, max]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortBereich {
    min: u16,
    max: u16,
}

impl PortBereich {
    /// Validiert den Bereich und faellt bei ungueltigen Grenzen auf den
    /// Standard-Bereich zurueck
    ///
    /// Ungueltig: `min < 1`, `max > 65535` oder `min > max`.
    pub fn neu(min: u32, max: u32) -> Self {
        if min < 1 || max > u16::MAX as u32 || min > max {
            tracing::warn!(
                min,
                max,
                standard_min = STANDARD_MIN_PORT,
                standard_max = STANDARD_MAX_PORT,
                "Ungueltiger Port-Bereich, verwende Standard-Bereich"
            );
            return Self::default();
        }
        Self {
            min: min as u16,
            max: max as u16,
        }
    }

    pub fn min(&self) -> u16 {
        self.min
    }

    pub fn max(&self) -> u16 {
        self.max
    }

    /// Anzahl der Ports im Bereich
    pub fn groesse(&self) -> usize {
        (self.max - self.min) as usize + 1
    }

    /// Prueft ob ein Port im Bereich liegt
    pub fn enthaelt(&self, port: u16) -> bool {
        (self.min..=self.max).contains(&port)
    }
}

impl Default for PortBereich {
    fn default() -> Self {
        Self {
            min: STANDARD_MIN_PORT,
            max: STANDARD_MAX_PORT,
        }
    }
}

// ---------------------------------------------------------------------------
// PortPool
// ---------------------------------------------------------------------------

/// Pool der Server-Ports fuer Endpunkt-Sessions
///
/// Wird vom Koordinator besessen und als `Arc<PortPool>` in die Sessions
/// injiziert.
#[derive(Debug)]
pub struct PortPool {
    bereich: PortBereich,
    inner: Mutex<PortPoolInner>,
}

#[derive(Debug)]
struct PortPoolInner {
    /// Naechster noch nie vergebene Port (u32, damit max = 65535 nicht ueberlaeuft)
    naechster: u32,
    /// Freigegebene Ports (LIFO)
    frei: Vec<u16>,
    /// Aktuell an Sessions vergebene Ports
    vergeben: HashSet<u16>,
}

impl PortPool {
    /// Erstellt einen neuen Pool ueber dem gegebenen Bereich
    pub fn neu(bereich: PortBereich) -> Self {
        Self {
            bereich,
            inner: Mutex::new(PortPoolInner {
                naechster: bereich.min() as u32,
                frei: Vec::new(),
                vergeben: HashSet::new(),
            }),
        }
    }

    /// Gibt den konfigurierten Bereich zurueck
    pub fn bereich(&self) -> PortBereich {
        self.bereich
    }

    /// Vergibt einen Port
    ///
    /// Bevorzugt zuletzt freigegebene Ports, danach den naechsten unbenutzten.
    pub fn zuteilen(&self) -> SessionResult<u16> {
        let mut inner = self.inner.lock();

        let port = if let Some(port) = inner.frei.pop() {
            port
        } else if inner.naechster <= self.bereich.max() as u32 {
            let port = inner.naechster as u16;
            inner.naechster += 1;
            port
        } else {
            tracing::warn!(
                min = self.bereich.min(),
                max = self.bereich.max(),
                vergeben = inner.vergeben.len(),
                "Port-Pool erschoepft"
            );
            return Err(SessionError::PortPoolErschoepft);
        };

        inner.vergeben.insert(port);
        tracing::debug!(port, "Port vergeben");
        Ok(port)
    }

    /// Gibt einen Port an den Pool zurueck
    pub fn freigeben(&self, port: u16) -> SessionResult<()> {
        let mut inner = self.inner.lock();

        if !inner.vergeben.remove(&port) {
            tracing::warn!(port, "Freigabe eines nicht vergebenen Ports");
            return Err(SessionError::PortNichtVergeben(port));
        }

        inner.frei.push(port);
        tracing::debug!(port, "Port freigegeben");
        Ok(())
    }

    /// Prueft ob ein Port aktuell vergeben ist
    pub fn ist_vergeben(&self, port: u16) -> bool {
        self.inner.lock().vergeben.contains(&port)
    }

    /// Anzahl der aktuell vergebenen Ports
    pub fn vergeben_anzahl(&self) -> usize {
        self.inner.lock().vergeben.len()
    }

    /// Anzahl der noch vergebbaren Ports
    pub fn verfuegbar_anzahl(&self) -> usize {
        self.bereich.groesse() - self.vergeben_anzahl()
    }
}

impl Default for PortPool {
    fn default() -> Self {
        Self::neu(PortBereich::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
