//! Konferenz-Register – Mitgliedschaft und Rundsenden von Floor-Status
//!
//! Das `KonferenzRegister` ordnet Endpunkt-Sessions ihren Konferenzen zu und
//! sendet FloorStatus-Nachrichten an alle anderen Mitglieder einer Konferenz.
//!
//! ## Invarianten
//! - Eine Konferenz ohne Mitglieder existiert nicht: das Entfernen des letzten
//!   Mitglieds loescht die Konferenz unter derselben Shard-Sperre
//! - Rundsenden erreicht jedes andere Mitglied genau einmal, nie den Absender

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use podium_core::types::{ConferenceId, EndpointId, FloorId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::endpoint::EndpointSession;

/// Register aller aktiven Konferenzen
///
/// Thread-safe und `Clone`-faehig (innerer Arc).
#[derive(Clone, Default)]
pub struct KonferenzRegister {
    konferenzen: Arc<DashMap<ConferenceId, HashMap<EndpointId, Arc<EndpointSession>>>>,
}

impl KonferenzRegister {
    /// Erstellt ein leeres Register
    pub fn neu() -> Self {
        Self::default()
    }

    /// Fuegt eine Session ihrer Konferenz hinzu
    ///
    /// Legt die Konferenz bei Bedarf an. Eine bereits registrierte Session
    /// mit derselben Endpunkt-ID wird ersetzt und zurueckgegeben.
    pub fn endpunkt_hinzufuegen(
        &self,
        session: Arc<EndpointSession>,
    ) -> Option<Arc<EndpointSession>> {
        let conference_id = session.conference_id();
        let endpoint_id = session.endpoint_id();

        let verdraengt = self
            .konferenzen
            .entry(conference_id)
            .or_default()
            .insert(endpoint_id, session);

        if verdraengt.is_some() {
            tracing::error!(
                endpoint_id = %endpoint_id,
                conference_id = %conference_id,
                "Endpunkt war bereits in der Konferenz registriert, ersetzt"
            );
        } else {
            tracing::debug!(
                endpoint_id = %endpoint_id,
                conference_id = %conference_id,
                "Endpunkt zur Konferenz hinzugefuegt"
            );
        }
        verdraengt
    }

    /// Entfernt einen Endpunkt, leere Konferenzen werden geloescht
    pub fn endpunkt_entfernen(&self, conference_id: ConferenceId, endpoint_id: EndpointId) -> bool {
        self.entfernen_wenn(conference_id, endpoint_id, |_| true)
    }

    /// Entfernt einen Endpunkt nur, wenn genau diese Session registriert ist
    pub(crate) fn session_entfernen(&self, session: &Arc<EndpointSession>) -> bool {
        self.entfernen_wenn(session.conference_id(), session.endpoint_id(), |aktuell| {
            Arc::ptr_eq(aktuell, session)
        })
    }

    fn entfernen_wenn(
        &self,
        conference_id: ConferenceId,
        endpoint_id: EndpointId,
        bedingung: impl FnOnce(&Arc<EndpointSession>) -> bool,
    ) -> bool {
        let Entry::Occupied(mut eintrag) = self.konferenzen.entry(conference_id) else {
            return false;
        };

        let passt = eintrag.get().get(&endpoint_id).is_some_and(bedingung);
        if !passt {
            return false;
        }

        eintrag.get_mut().remove(&endpoint_id);
        if eintrag.get().is_empty() {
            eintrag.remove();
            tracing::info!(conference_id = %conference_id, "Leere Konferenz geloescht");
        }

        tracing::debug!(
            endpoint_id = %endpoint_id,
            conference_id = %conference_id,
            "Endpunkt aus der Konferenz entfernt"
        );
        true
    }

    /// Sendet einen FloorStatus an alle Mitglieder ausser `ausser`
    ///
    /// Fehler einzelner Empfaenger werden geloggt und unterbrechen die
    /// Zustellung an die uebrigen nicht. Gibt die Anzahl erfolgreicher
    /// Zustellungen zurueck.
    pub fn rundsenden(
        &self,
        conference_id: ConferenceId,
        ausser: EndpointId,
        floor_id: Option<FloorId>,
        granted: bool,
    ) -> usize {
        let empfaenger: Vec<Arc<EndpointSession>> = match self.konferenzen.get(&conference_id) {
            Some(mitglieder) => mitglieder
                .iter()
                .filter(|(id, _)| **id != ausser)
                .map(|(_, session)| Arc::clone(session))
                .collect(),
            None => return 0,
        };

        let mut zugestellt = 0usize;
        for session in &empfaenger {
            match session.floor_status_senden(floor_id, granted) {
                Ok(()) => zugestellt += 1,
                Err(e) => {
                    tracing::warn!(
                        empfaenger = %session.endpoint_id(),
                        conference_id = %conference_id,
                        fehler = %e,
                        "FloorStatus konnte nicht zugestellt werden"
                    );
                }
            }
        }

        tracing::debug!(
            conference_id = %conference_id,
            absender = %ausser,
            granted,
            zugestellt,
            "FloorStatus rundgesendet"
        );
        zugestellt
    }

    /// Prueft ob ein Endpunkt Mitglied der Konferenz ist
    pub fn existiert(&self, conference_id: ConferenceId, endpoint_id: EndpointId) -> bool {
        self.konferenzen
            .get(&conference_id)
            .is_some_and(|m| m.contains_key(&endpoint_id))
    }

    /// Session eines Mitglieds
    pub fn mitglied(
        &self,
        conference_id: ConferenceId,
        endpoint_id: EndpointId,
    ) -> Option<Arc<EndpointSession>> {
        self.konferenzen
            .get(&conference_id)
            .and_then(|m| m.get(&endpoint_id).cloned())
    }

    /// Endpunkt-IDs aller Mitglieder, aufsteigend sortiert
    pub fn mitglieder(&self, conference_id: ConferenceId) -> Vec<EndpointId> {
        let mut ids: Vec<EndpointId> = self
            .konferenzen
            .get(&conference_id)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    pub fn mitglied_anzahl(&self, conference_id: ConferenceId) -> usize {
        self.konferenzen
            .get(&conference_id)
            .map(|m| m.len())
            .unwrap_or(0)
    }

    pub fn konferenz_anzahl(&self) -> usize {
        self.konferenzen.len()
    }

    pub fn konferenz_ids(&self) -> Vec<ConferenceId> {
        self.konferenzen.iter().map(|e| *e.key()).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::test_session;
    use crate::events::ereignis_kanal;
    use podium_protocol::{CodecGateway, JsonCodec, Primitive, RequestStatus};

    fn session(
        endpoint_id: u64,
        conference_id: u64,
    ) -> (Arc<EndpointSession>, tokio::sync::mpsc::Receiver<bytes::Bytes>) {
        let (sink, _) = ereignis_kanal();
        test_session(endpoint_id, conference_id, Arc::new(JsonCodec::new()), sink)
    }

    #[test]
    fn hinzufuegen_und_entfernen() {
        let register = KonferenzRegister::neu();
        let (a, _ra) = session(1, 5);
        let (b, _rb) = session(2, 5);

        assert!(register.endpunkt_hinzufuegen(a).is_none());
        assert!(register.endpunkt_hinzufuegen(b).is_none());
        assert_eq!(register.mitglieder(ConferenceId(5)), vec![EndpointId(1), EndpointId(2)]);
        assert_eq!(register.konferenz_anzahl(), 1);

        assert!(register.endpunkt_entfernen(ConferenceId(5), EndpointId(1)));
        assert!(!register.endpunkt_entfernen(ConferenceId(5), EndpointId(1)));
        assert_eq!(register.mitglied_anzahl(ConferenceId(5)), 1);

        // Letztes Mitglied entfernt -> Konferenz geloescht
        assert!(register.endpunkt_entfernen(ConferenceId(5), EndpointId(2)));
        assert_eq!(register.konferenz_anzahl(), 0);
        assert!(register.konferenz_ids().is_empty());
    }

    #[test]
    fn doppelte_endpunkt_id_verdraengt() {
        let register = KonferenzRegister::neu();
        let (alt, _r1) = session(1, 5);
        let (neu, _r2) = session(1, 5);

        register.endpunkt_hinzufuegen(Arc::clone(&alt));
        let verdraengt = register.endpunkt_hinzufuegen(Arc::clone(&neu)).unwrap();
        assert!(Arc::ptr_eq(&verdraengt, &alt));
        assert_eq!(register.mitglied_anzahl(ConferenceId(5)), 1);

        // Entfernen der verdraengten Instanz laesst die neue stehen
        assert!(!register.session_entfernen(&alt));
        assert!(register.existiert(ConferenceId(5), EndpointId(1)));
        assert!(register.session_entfernen(&neu));
        assert_eq!(register.konferenz_anzahl(), 0);
    }

    #[test]
    fn rundsenden_erreicht_alle_ausser_absender() {
        let register = KonferenzRegister::neu();
        let (a, mut ra) = session(1, 5);
        let (b, mut rb) = session(2, 5);
        let (c, mut rc) = session(3, 5);
        let (d, mut rd) = session(4, 6);
        for s in [a, b, c, d] {
            register.endpunkt_hinzufuegen(s);
        }

        let zugestellt = register.rundsenden(ConferenceId(5), EndpointId(1), Some(FloorId(2)), true);
        assert_eq!(zugestellt, 2);

        assert!(ra.try_recv().is_err(), "Absender erhaelt nichts");
        assert!(rd.try_recv().is_err(), "Andere Konferenz erhaelt nichts");

        let codec = JsonCodec::new();
        for rx in [&mut rb, &mut rc] {
            let status = codec.decode(&rx.try_recv().unwrap()).unwrap();
            assert_eq!(status.primitive(), Primitive::FloorStatus);
            assert_eq!(status.floor_id(), Some(FloorId(2)));
            assert_eq!(status.request_status, Some(RequestStatus::Granted));
            assert!(rx.try_recv().is_err(), "Genau eine Nachricht pro Empfaenger");
        }
    }

    #[test]
    fn rundsenden_zaehlt_nur_erfolgreiche_zustellungen() {
        let register = KonferenzRegister::neu();
        let (a, _ra) = session(1, 5);
        let (b, rb) = session(2, 5);
        let (c, mut rc) = session(3, 5);
        for s in [a, b, c] {
            register.endpunkt_hinzufuegen(s);
        }
        // Queue von Endpunkt 2 geschlossen
        drop(rb);

        assert_eq!(register.rundsenden(ConferenceId(5), EndpointId(1), None, false), 1);
        assert!(rc.try_recv().is_ok());
    }

    #[test]
    fn rundsenden_an_unbekannte_konferenz() {
        let register = KonferenzRegister::neu();
        assert_eq!(register.rundsenden(ConferenceId(99), EndpointId(1), None, true), 0);
    }

    #[test]
    fn konferenz_nie_leer_beobachtbar() {
        let register = KonferenzRegister::neu();
        let sessions: Vec<_> = (1..=4).map(|i| session(i, 7)).collect();

        std::thread::scope(|scope| {
            for (s, _) in &sessions {
                let register = register.clone();
                let s = Arc::clone(s);
                scope.spawn(move || {
                    for _ in 0..200 {
                        register.endpunkt_hinzufuegen(Arc::clone(&s));
                        register.endpunkt_entfernen(s.conference_id(), s.endpoint_id());
                    }
                });
            }
            let register = register.clone();
            scope.spawn(move || {
                for _ in 0..2000 {
                    if register.konferenz_ids().contains(&ConferenceId(7)) {
                        // Darf inzwischen verschwunden sein, aber nie leer
                        let anzahl = register
                            .konferenzen
                            .get(&ConferenceId(7))
                            .map(|m| m.len());
                        assert_ne!(anzahl, Some(0));
                    }
                }
            });
        });

        assert_eq!(register.konferenz_anzahl(), 0);
    }
}
