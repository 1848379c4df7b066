//! Session-Koordinator – Einstiegspunkt fuer Host-Anwendung und REST-API
//!
//! Der `SessionKoordinator` besitzt den Port-Pool, das Endpunkt-Register und
//! das Konferenz-Register. Er startet und stoppt Sessions und leitet die
//! Entscheidungen der Richtlinien-Schicht an die betroffenen Sessions weiter.
//! Eigene Floor-Entscheidungen trifft er nicht.
//!
//! ## Aufraeumen
//! Sessions, die durch Transport-Fehler oder Schliessen der Gegenstelle
//! enden, melden sich ueber einen Kanal. Ein Hintergrund-Task entfernt sie
//! aus beiden Registern, sofern dort noch dieselbe Instanz eingetragen ist.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use podium_core::event::FloorEventSink;
use podium_core::types::{ConferenceId, EndpointId, TransportKind};
use podium_protocol::CodecGateway;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

use crate::conference::KonferenzRegister;
use crate::endpoint::{EndpointSession, SessionParameter, SessionUmgebung};
use crate::error::{SessionError, SessionResult};
use crate::ports::PortPool;

/// Floor-Control-Rolle des Servers in jeder Antwort
pub const FLOOR_CONTROL_ROLLE: &str = "s-only";
/// Verbindungsaufbau-Rolle des Servers in jeder Antwort
pub const SETUP_ROLLE: &str = "passive";

// ---------------------------------------------------------------------------
// Anfrage / Antwort
// ---------------------------------------------------------------------------

/// Anfrage zum Starten einer Endpunkt-Session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionAnfrage {
    pub endpoint_id: EndpointId,
    pub remote_ip: IpAddr,
    pub remote_port: u16,
    pub conference_id: ConferenceId,
    /// "UDP" oder "TCP" (Gross-/Kleinschreibung egal)
    pub transport: String,
}

/// Verbindungsparameter, die der Endpunkt fuer den Aufbau benoetigt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionAntwort {
    pub server_port: u16,
    pub server_ip: IpAddr,
    pub floor_control_role: String,
    pub setup: String,
    pub conference_id: ConferenceId,
    pub endpoint_id: EndpointId,
    pub transport: TransportKind,
}

/// Momentaufnahme fuer Monitoring und `/v1/stats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KoordinatorStatistik {
    pub sessions: usize,
    pub konferenzen: usize,
    pub ports_vergeben: usize,
    pub ports_verfuegbar: usize,
}

// ---------------------------------------------------------------------------
// SessionKoordinator
// ---------------------------------------------------------------------------

/// Verwaltet alle Endpunkt-Sessions
///
/// `Clone`-faehig (innerer Arc), alle Klone teilen denselben Zustand.
#[derive(Clone)]
pub struct SessionKoordinator {
    inner: Arc<KoordinatorInner>,
}

struct KoordinatorInner {
    endpunkte: DashMap<EndpointId, Arc<EndpointSession>>,
    konferenzen: KonferenzRegister,
    pool: Arc<PortPool>,
    server_ip: IpAddr,
    codec: Arc<dyn CodecGateway>,
    ereignisse: Arc<dyn FloorEventSink>,
    beendet_tx: mpsc::UnboundedSender<Arc<EndpointSession>>,
}

impl SessionKoordinator {
    /// Erstellt den Koordinator und startet den Aufraeum-Task
    ///
    /// Muss innerhalb einer tokio-Runtime aufgerufen werden.
    pub fn neu(
        server_ip: IpAddr,
        pool: Arc<PortPool>,
        codec: Arc<dyn CodecGateway>,
        ereignisse: Arc<dyn FloorEventSink>,
    ) -> Self {
        let (beendet_tx, beendet_rx) = mpsc::unbounded_channel();

        let koordinator = Self {
            inner: Arc::new(KoordinatorInner {
                endpunkte: DashMap::new(),
                konferenzen: KonferenzRegister::neu(),
                pool,
                server_ip,
                codec,
                ereignisse,
                beendet_tx,
            }),
        };

        tokio::spawn(aufraeum_task(Arc::downgrade(&koordinator.inner), beendet_rx));

        tracing::info!(
            server_ip = %server_ip,
            port_min = koordinator.inner.pool.bereich().min(),
            port_max = koordinator.inner.pool.bereich().max(),
            "Session-Koordinator initialisiert"
        );
        koordinator
    }

    // -----------------------------------------------------------------------
    // Lebenszyklus
    // -----------------------------------------------------------------------

    /// Startet eine Session und registriert sie
    pub async fn session_starten(&self, anfrage: SessionAnfrage) -> SessionResult<SessionAntwort> {
        let transport: TransportKind = anfrage.transport.parse()?;

        if self.inner.endpunkte.contains_key(&anfrage.endpoint_id) {
            tracing::warn!(endpoint_id = %anfrage.endpoint_id, "Endpunkt hat bereits eine Session");
            return Err(SessionError::EndpunktBereitsAktiv(anfrage.endpoint_id));
        }

        let parameter = SessionParameter {
            endpoint_id: anfrage.endpoint_id,
            conference_id: anfrage.conference_id,
            remote: SocketAddr::new(anfrage.remote_ip, anfrage.remote_port),
            transport,
        };
        let session = EndpointSession::starten(parameter, self.umgebung()).await?;

        // Paralleler Start mit derselben ID: der zweite verliert
        let eingetragen = match self.inner.endpunkte.entry(anfrage.endpoint_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(eintrag) => {
                eintrag.insert(Arc::clone(&session));
                true
            }
        };
        if !eingetragen {
            session.stoppen().await;
            return Err(SessionError::EndpunktBereitsAktiv(anfrage.endpoint_id));
        }
        self.inner.konferenzen.endpunkt_hinzufuegen(Arc::clone(&session));

        Ok(SessionAntwort {
            server_port: session.server_port(),
            server_ip: self.inner.server_ip,
            floor_control_role: FLOOR_CONTROL_ROLLE.to_string(),
            setup: SETUP_ROLLE.to_string(),
            conference_id: anfrage.conference_id,
            endpoint_id: anfrage.endpoint_id,
            transport,
        })
    }

    /// Stoppt eine Session, gibt ihren Port frei und entfernt sie aus der Konferenz
    pub async fn session_stoppen(&self, endpoint_id: EndpointId) -> SessionResult<()> {
        let (_, session) = self
            .inner
            .endpunkte
            .remove(&endpoint_id)
            .ok_or(SessionError::UnbekannterEndpunkt(endpoint_id))?;

        self.inner.konferenzen.session_entfernen(&session);
        session.stoppen().await;
        Ok(())
    }

    /// Stoppt alle Sessions (Server-Shutdown)
    pub async fn alle_stoppen(&self) {
        let ids: Vec<EndpointId> = self.inner.endpunkte.iter().map(|e| *e.key()).collect();
        let anzahl = ids.len();

        for id in ids {
            if let Err(e) = self.session_stoppen(id).await {
                tracing::debug!(endpoint_id = %id, fehler = %e, "Session bereits entfernt");
            }
        }
        tracing::info!(anzahl, "Alle Sessions gestoppt");
    }

    // -----------------------------------------------------------------------
    // Weiterleitung von Richtlinien-Entscheidungen
    // -----------------------------------------------------------------------

    /// Beantwortet den letzten FloorRequest/FloorRelease des Endpunkts
    pub fn floor_request_beantworten(
        &self,
        conference_id: ConferenceId,
        endpoint_id: EndpointId,
        granted: bool,
    ) -> SessionResult<()> {
        self.mitglied(conference_id, endpoint_id)?
            .floor_request_beantworten(granted)
    }

    /// Sendet den gewuenschten Floor des Endpunkts an alle anderen Mitglieder
    ///
    /// Gibt die Anzahl der Empfaenger zurueck.
    pub fn floor_status_rundsenden(
        &self,
        conference_id: ConferenceId,
        endpoint_id: EndpointId,
        granted: bool,
    ) -> SessionResult<usize> {
        let quelle = self.mitglied(conference_id, endpoint_id)?;
        let floor_id = quelle.floor_zustand().wanted_floor_id;
        Ok(self
            .inner
            .konferenzen
            .rundsenden(conference_id, endpoint_id, floor_id, granted))
    }

    /// Beantwortet die letzte FloorQuery des Endpunkts
    pub fn floor_query_beantworten(
        &self,
        conference_id: ConferenceId,
        endpoint_id: EndpointId,
        granted: bool,
    ) -> SessionResult<()> {
        self.mitglied(conference_id, endpoint_id)?
            .floor_query_beantworten(granted)
    }

    fn mitglied(
        &self,
        conference_id: ConferenceId,
        endpoint_id: EndpointId,
    ) -> SessionResult<Arc<EndpointSession>> {
        self.inner
            .konferenzen
            .mitglied(conference_id, endpoint_id)
            .ok_or(SessionError::UnbekannterEndpunktOderKonferenz {
                endpoint_id,
                conference_id,
            })
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    pub fn endpunkt(&self, endpoint_id: EndpointId) -> Option<Arc<EndpointSession>> {
        self.inner.endpunkte.get(&endpoint_id).map(|e| Arc::clone(e.value()))
    }

    pub fn konferenz_mitglieder(&self, conference_id: ConferenceId) -> Vec<EndpointId> {
        self.inner.konferenzen.mitglieder(conference_id)
    }

    pub fn endpunkt_anzahl(&self) -> usize {
        self.inner.endpunkte.len()
    }

    pub fn konferenz_anzahl(&self) -> usize {
        self.inner.konferenzen.konferenz_anzahl()
    }

    pub fn server_ip(&self) -> IpAddr {
        self.inner.server_ip
    }

    pub fn port_pool(&self) -> &Arc<PortPool> {
        &self.inner.pool
    }

    pub fn statistik(&self) -> KoordinatorStatistik {
        KoordinatorStatistik {
            sessions: self.endpunkt_anzahl(),
            konferenzen: self.konferenz_anzahl(),
            ports_vergeben: self.inner.pool.vergeben_anzahl(),
            ports_verfuegbar: self.inner.pool.verfuegbar_anzahl(),
        }
    }

    fn umgebung(&self) -> SessionUmgebung {
        SessionUmgebung {
            pool: Arc::clone(&self.inner.pool),
            codec: Arc::clone(&self.inner.codec),
            ereignisse: Arc::clone(&self.inner.ereignisse),
            server_ip: self.inner.server_ip,
            beendet_tx: Some(self.inner.beendet_tx.clone()),
        }
    }
}

/// Entfernt selbststaendig beendete Sessions aus beiden Registern
async fn aufraeum_task(
    inner: Weak<KoordinatorInner>,
    mut beendet_rx: mpsc::UnboundedReceiver<Arc<EndpointSession>>,
) {
    while let Some(session) = beendet_rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };

        let endpoint_id = session.endpoint_id();
        let entfernt = inner
            .endpunkte
            .remove_if(&endpoint_id, |_, aktuell| Arc::ptr_eq(aktuell, &session))
            .is_some();

        if entfernt {
            inner.konferenzen.session_entfernen(&session);
            tracing::info!(
                endpoint_id = %endpoint_id,
                conference_id = %session.conference_id(),
                "Beendete Session aufgeraeumt"
            );
        }
    }
    tracing::debug!("Aufraeum-Task beendet");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
