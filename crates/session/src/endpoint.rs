//! Endpunkt-Session – Transport, Floor-Zustand und Dispatch pro Endpunkt
//!
//! Jede Session besitzt einen Server-Port aus dem `PortPool`, genau einen
//! Transport und einen eigenen tokio-Task, der Empfang und Versand treibt.
//!
//! ## Architektur
//!
//! ```text
//! Transport::empfangen()
//!     |
//!     v
//! CodecGateway::decode()         <- Fehler: warn + verwerfen
//!     |
//!     v
//! nachricht_empfangen()          <- FloorZustand aktualisieren
//!     |
//!     +--> FloorEventSink::melden()      (FloorRequest/Release/Query)
//!     +--> Send-Queue (mpsc) --> Transport::senden()   (HelloAck)
//! ```
//!
//! Antworten der Richtlinien-Schicht (`floor_request_beantworten` usw.)
//! laufen ebenfalls ueber die Send-Queue und blockieren nie.
//!
//! ## Lebensende
//! Explizites `stoppen()`, Transport-Fehler oder Schliessen durch die
//! Gegenstelle beenden den Task. Der Port wird in jedem Fall genau einmal
//! an den Pool zurueckgegeben.

use bytes::Bytes;
use parking_lot::Mutex;
use podium_core::event::{FloorEvent, FloorEventSink};
use podium_core::types::{ConferenceId, EndpointId, FloorId, TransportKind};
use podium_protocol::{CodecGateway, FloorMessage, Kopfdaten, Primitive, RequestStatus};
use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::{SessionError, SessionResult};
use crate::ports::PortPool;
use crate::transport::{Transport, TransportEreignis};

/// Groesse der Send-Queue pro Session
pub const SEND_QUEUE_GROESSE: usize = 64;

/// Anzahl Ports, die beim Binden probiert werden, falls ein Port extern belegt ist
const BIND_VERSUCHE: usize = 8;

// ---------------------------------------------------------------------------
// Parameter und Umgebung
// ---------------------------------------------------------------------------

/// Identitaet und Gegenstelle einer neuen Session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionParameter {
    pub endpoint_id: EndpointId,
    pub conference_id: ConferenceId,
    pub remote: SocketAddr,
    pub transport: TransportKind,
}

/// Gemeinsame Abhaengigkeiten aller Sessions, vom Koordinator injiziert
#[derive(Clone)]
pub struct SessionUmgebung {
    pub pool: Arc<PortPool>,
    pub codec: Arc<dyn CodecGateway>,
    pub ereignisse: Arc<dyn FloorEventSink>,
    /// Lokale IP, auf der Sockets und Listener gebunden werden
    pub server_ip: IpAddr,
    /// Meldet Sessions, die ohne `stoppen()` geendet haben
    pub beendet_tx: Option<mpsc::UnboundedSender<Arc<EndpointSession>>>,
}

// ---------------------------------------------------------------------------
// FloorZustand
// ---------------------------------------------------------------------------

/// Floor-bezogener Zustand einer Session
///
/// Jede zuletzt empfangene Nachricht einer Art belegt genau einen Slot und
/// wird von einer neueren derselben Art ueberschrieben.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FloorZustand {
    pub wanted_floor_id: Option<FloorId>,
    pub query_floor_id: Option<FloorId>,
    pub letzte_floor_request: Option<FloorMessage>,
    pub letzte_floor_release: Option<FloorMessage>,
    pub letzte_floor_query: Option<FloorMessage>,
}

/// Grund fuer das Ende des Session-Tasks
#[derive(Debug)]
enum Beendigung {
    Gestoppt,
    GegenstelleGetrennt,
    TransportFehler(io::Error),
}

// ---------------------------------------------------------------------------
// EndpointSession
// ---------------------------------------------------------------------------

/// Server-seitige Session eines Endpunkts
pub struct EndpointSession {
    endpoint_id: EndpointId,
    conference_id: ConferenceId,
    remote: SocketAddr,
    transport: TransportKind,
    server_port: u16,
    zustand: Mutex<FloorZustand>,
    codec: Arc<dyn CodecGateway>,
    ereignisse: Arc<dyn FloorEventSink>,
    pool: Arc<PortPool>,
    sende_tx: mpsc::Sender<Bytes>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
    /// `true`, solange der Session-Task Transport und Port haelt
    task_laeuft: watch::Sender<bool>,
    port_freigegeben: AtomicBool,
}

impl fmt::Debug for EndpointSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointSession")
            .field("endpoint_id", &self.endpoint_id)
            .field("conference_id", &self.conference_id)
            .field("remote", &self.remote)
            .field("transport", &self.transport)
            .field("server_port", &self.server_port)
            .finish_non_exhaustive()
    }
}

impl EndpointSession {
    /// Vergibt einen Port, bindet den Transport und startet den Session-Task
    ///
    /// Kehrt zurueck, sobald Socket bzw. Listener gebunden ist. TCP nimmt die
    /// erste eingehende Verbindung danach im Session-Task an.
    pub async fn starten(
        parameter: SessionParameter,
        umgebung: SessionUmgebung,
    ) -> SessionResult<Arc<Self>> {
        let (server_port, transport) = Self::transport_binden(&parameter, &umgebung).await?;

        let (sende_tx, sende_rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let session = Arc::new(Self {
            endpoint_id: parameter.endpoint_id,
            conference_id: parameter.conference_id,
            remote: parameter.remote,
            transport: parameter.transport,
            server_port,
            zustand: Mutex::new(FloorZustand::default()),
            codec: umgebung.codec,
            ereignisse: umgebung.ereignisse,
            pool: umgebung.pool,
            sende_tx,
            shutdown_tx,
            task: Mutex::new(None),
            task_laeuft: watch::Sender::new(true),
            port_freigegeben: AtomicBool::new(false),
        });

        let task = tokio::spawn(Arc::clone(&session).session_loop(
            transport,
            sende_rx,
            shutdown_rx,
            umgebung.beendet_tx,
        ));
        *session.task.lock() = Some(task);

        tracing::info!(
            endpoint_id = %session.endpoint_id,
            conference_id = %session.conference_id,
            remote = %session.remote,
            transport = %session.transport,
            server_port,
            "Endpunkt-Session gestartet"
        );
        Ok(session)
    }

    /// Vergibt Ports, bis einer gebunden werden kann
    ///
    /// Extern belegte Ports bleiben waehrend der Versuche reserviert und
    /// werden danach zurueckgegeben.
    async fn transport_binden(
        parameter: &SessionParameter,
        umgebung: &SessionUmgebung,
    ) -> SessionResult<(u16, Transport)> {
        let mut belegt = Vec::new();
        let mut ergebnis = Err(SessionError::PortPoolErschoepft);

        for _ in 0..BIND_VERSUCHE {
            let port = match umgebung.pool.zuteilen() {
                Ok(port) => port,
                Err(e) => {
                    ergebnis = Err(e);
                    break;
                }
            };
            let lokal = SocketAddr::new(umgebung.server_ip, port);

            match Transport::oeffnen(
                parameter.transport,
                lokal,
                parameter.remote,
                Arc::clone(&umgebung.codec),
            )
            .await
            {
                Ok(transport) => {
                    ergebnis = Ok((port, transport));
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                    tracing::warn!(port, "Port extern belegt, versuche naechsten");
                    belegt.push(port);
                    ergebnis = Err(SessionError::Transport(e));
                }
                Err(e) => {
                    tracing::warn!(
                        endpoint_id = %parameter.endpoint_id,
                        lokal = %lokal,
                        fehler = %e,
                        "Transport konnte nicht gebunden werden"
                    );
                    belegt.push(port);
                    ergebnis = Err(SessionError::Transport(e));
                    break;
                }
            }
        }

        for port in belegt {
            if let Err(e) = umgebung.pool.freigeben(port) {
                tracing::error!(port, fehler = %e, "Port-Rueckgabe nach Bind-Fehler fehlgeschlagen");
            }
        }
        ergebnis
    }

    /// Session-Task: Empfang, Versand und Shutdown
    async fn session_loop(
        self: Arc<Self>,
        mut transport: Transport,
        mut sende_rx: mpsc::Receiver<Bytes>,
        mut shutdown_rx: watch::Receiver<bool>,
        beendet_tx: Option<mpsc::UnboundedSender<Arc<EndpointSession>>>,
    ) {
        let grund = loop {
            tokio::select! {
                ereignis = transport.empfangen() => match ereignis {
                    Ok(TransportEreignis::Daten(daten)) => self.nachricht_empfangen(&daten),
                    Ok(TransportEreignis::Verbunden(peer)) => {
                        tracing::info!(
                            endpoint_id = %self.endpoint_id,
                            peer = %peer,
                            "TCP-Verbindung angenommen"
                        );
                    }
                    Ok(TransportEreignis::Geschlossen) => break Beendigung::GegenstelleGetrennt,
                    Err(e) => break Beendigung::TransportFehler(e),
                },

                Some(daten) = sende_rx.recv(), if transport.sendebereit() => {
                    if let Err(e) = transport.senden(daten).await {
                        tracing::warn!(
                            endpoint_id = %self.endpoint_id,
                            fehler = %e,
                            "Senden fehlgeschlagen"
                        );
                    }
                }

                _ = shutdown_rx.changed() => break Beendigung::Gestoppt,
            }
        };

        transport.schliessen().await;
        self.port_freigeben();
        self.task_laeuft.send_replace(false);

        match grund {
            Beendigung::Gestoppt => {
                tracing::debug!(endpoint_id = %self.endpoint_id, "Session-Task gestoppt");
            }
            Beendigung::GegenstelleGetrennt => {
                tracing::info!(endpoint_id = %self.endpoint_id, "Gegenstelle hat die Verbindung geschlossen");
                Self::beendigung_melden(&self, beendet_tx);
            }
            Beendigung::TransportFehler(e) => {
                tracing::warn!(endpoint_id = %self.endpoint_id, fehler = %e, "Session wegen Transport-Fehler beendet");
                Self::beendigung_melden(&self, beendet_tx);
            }
        }
    }

    fn beendigung_melden(
        session: &Arc<Self>,
        beendet_tx: Option<mpsc::UnboundedSender<Arc<EndpointSession>>>,
    ) {
        if let Some(tx) = beendet_tx {
            if tx.send(Arc::clone(session)).is_err() {
                tracing::debug!(endpoint_id = %session.endpoint_id, "Koordinator nicht mehr erreichbar");
            }
        }
    }

    /// Stoppt den Session-Task und gibt den Port zurueck
    ///
    /// Idempotent. Jeder Aufrufer kehrt erst zurueck, wenn der Transport
    /// geschlossen und der Port wieder im Pool ist.
    pub async fn stoppen(&self) {
        let _ = self.shutdown_tx.send(true);

        let task = self.task.lock().take();
        match task {
            Some(task) => {
                if let Err(e) = task.await {
                    tracing::error!(endpoint_id = %self.endpoint_id, fehler = %e, "Session-Task abgebrochen");
                }
                // Task kann vor der Freigabe abgebrochen sein
                self.port_freigeben();
                self.task_laeuft.send_replace(false);
                tracing::info!(endpoint_id = %self.endpoint_id, "Endpunkt-Session gestoppt");
            }
            None => {
                // Ein anderer Aufrufer wartet bereits auf den Task
                let mut laeuft = self.task_laeuft.subscribe();
                let _ = laeuft.wait_for(|laeuft| !*laeuft).await;
            }
        }
    }

    /// Gibt den Port genau einmal zurueck
    fn port_freigeben(&self) {
        if self.port_freigegeben.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.pool.freigeben(self.server_port) {
            tracing::error!(
                endpoint_id = %self.endpoint_id,
                port = self.server_port,
                fehler = %e,
                "Port-Rueckgabe fehlgeschlagen"
            );
        }
    }

    // -----------------------------------------------------------------------
    // Eingehende Nachrichten
    // -----------------------------------------------------------------------

    /// Dekodiert eine eingehende Nachricht und verarbeitet sie
    ///
    /// Nicht dekodierbare Daten werden verworfen, die Session bleibt offen.
    pub fn nachricht_empfangen(&self, daten: &[u8]) {
        let nachricht = match self.codec.decode(daten) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(
                    endpoint_id = %self.endpoint_id,
                    bytes = daten.len(),
                    fehler = %e,
                    "Nachricht nicht dekodierbar, verworfen"
                );
                return;
            }
        };

        tracing::trace!(
            endpoint_id = %self.endpoint_id,
            primitive = %nachricht.primitive(),
            transaction_id = nachricht.transaction_id,
            "Nachricht empfangen"
        );

        match nachricht.primitive() {
            Primitive::Hello => self.hello_beantworten(&nachricht),

            Primitive::FloorRequest => {
                let floor_id = nachricht.floor_id();
                {
                    let mut zustand = self.zustand.lock();
                    zustand.wanted_floor_id = floor_id;
                    zustand.letzte_floor_request = Some(nachricht);
                }
                tracing::info!(
                    endpoint_id = %self.endpoint_id,
                    floor_id = ?floor_id,
                    "FloorRequest empfangen"
                );
                self.melden(FloorEvent::FloorRequest {
                    endpoint_id: self.endpoint_id,
                    conference_id: self.conference_id,
                });
            }

            Primitive::FloorRelease => {
                self.zustand.lock().letzte_floor_release = Some(nachricht);
                tracing::info!(endpoint_id = %self.endpoint_id, "FloorRelease empfangen");
                self.melden(FloorEvent::FloorRelease {
                    endpoint_id: self.endpoint_id,
                    conference_id: self.conference_id,
                });
            }

            Primitive::FloorQuery => {
                let floor_id = nachricht.floor_id();
                {
                    let mut zustand = self.zustand.lock();
                    zustand.query_floor_id = floor_id;
                    zustand.letzte_floor_query = Some(nachricht);
                }
                tracing::info!(
                    endpoint_id = %self.endpoint_id,
                    floor_id = ?floor_id,
                    "FloorQuery empfangen"
                );
                self.melden(FloorEvent::FloorQuery {
                    endpoint_id: self.endpoint_id,
                    conference_id: self.conference_id,
                });
            }

            Primitive::FloorRequestStatusAck | Primitive::FloorStatusAck => {
                tracing::debug!(
                    endpoint_id = %self.endpoint_id,
                    primitive = %nachricht.primitive(),
                    "Bestaetigung empfangen"
                );
            }

            andere => {
                tracing::warn!(
                    endpoint_id = %self.endpoint_id,
                    primitive = %andere,
                    "Nicht unterstuetztes Primitive, ignoriert"
                );
            }
        }
    }

    fn hello_beantworten(&self, hello: &FloorMessage) {
        let ergebnis = self
            .codec
            .hello_ack(&self.kopf(), hello)
            .map_err(SessionError::from)
            .and_then(|bytes| self.einreihen(bytes));

        match ergebnis {
            Ok(()) => tracing::debug!(endpoint_id = %self.endpoint_id, "HelloAck eingereiht"),
            Err(e) => {
                tracing::warn!(endpoint_id = %self.endpoint_id, fehler = %e, "HelloAck fehlgeschlagen")
            }
        }
    }

    fn melden(&self, event: FloorEvent) {
        tracing::debug!(
            endpoint_id = %self.endpoint_id,
            art = event.art(),
            "Floor-Ereignis gemeldet"
        );
        self.ereignisse.melden(event);
    }

    // -----------------------------------------------------------------------
    // Ausgehende Antworten
    // -----------------------------------------------------------------------

    /// Beantwortet den letzten FloorRequest bzw. FloorRelease
    ///
    /// `granted` korreliert mit dem letzten FloorRequest, sonst mit dem
    /// letzten FloorRelease (ersatzweise dem letzten FloorRequest).
    pub fn floor_request_beantworten(&self, granted: bool) -> SessionResult<()> {
        let bytes = {
            let zustand = self.zustand.lock();
            let bezug = if granted {
                zustand.letzte_floor_request.as_ref()
            } else {
                zustand
                    .letzte_floor_release
                    .as_ref()
                    .or(zustand.letzte_floor_request.as_ref())
            };
            self.codec.floor_request_status(
                &self.kopf(),
                bezug,
                zustand.wanted_floor_id,
                RequestStatus::aus_entscheidung(granted),
            )?
        };

        self.einreihen(bytes)?;
        tracing::debug!(endpoint_id = %self.endpoint_id, granted, "FloorRequestStatus eingereiht");
        Ok(())
    }

    /// Sendet einen unaufgeforderten FloorStatus
    pub fn floor_status_senden(&self, floor_id: Option<FloorId>, granted: bool) -> SessionResult<()> {
        let bytes = self.codec.floor_status(
            &self.kopf(),
            None,
            floor_id,
            RequestStatus::aus_entscheidung(granted),
        )?;
        self.einreihen(bytes)
    }

    /// Beantwortet die letzte FloorQuery mit einem FloorStatus
    pub fn floor_query_beantworten(&self, granted: bool) -> SessionResult<()> {
        let bytes = {
            let zustand = self.zustand.lock();
            self.codec.floor_status(
                &self.kopf(),
                zustand.letzte_floor_query.as_ref(),
                zustand.query_floor_id,
                RequestStatus::aus_entscheidung(granted),
            )?
        };

        self.einreihen(bytes)?;
        tracing::debug!(endpoint_id = %self.endpoint_id, granted, "FloorStatus auf Query eingereiht");
        Ok(())
    }

    /// Legt kodierte Bytes in die Send-Queue, ohne zu blockieren
    fn einreihen(&self, bytes: Bytes) -> SessionResult<()> {
        match self.sende_tx.try_send(bytes) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(endpoint_id = %self.endpoint_id, "Send-Queue voll, Nachricht verworfen");
                Err(SessionError::SendeFehler("Send-Queue voll"))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(endpoint_id = %self.endpoint_id, "Send-Queue geschlossen");
                Err(SessionError::SessionBeendet(self.endpoint_id))
            }
        }
    }

    fn kopf(&self) -> Kopfdaten {
        Kopfdaten {
            conference_id: self.conference_id,
            endpoint_id: self.endpoint_id,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn endpoint_id(&self) -> EndpointId {
        self.endpoint_id
    }

    pub fn conference_id(&self) -> ConferenceId {
        self.conference_id
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    /// Kopie des aktuellen Floor-Zustands
    pub fn floor_zustand(&self) -> FloorZustand {
        self.zustand.lock().clone()
    }

    /// `true` sobald der Session-Task beendet und der Port zurueckgegeben ist
    pub fn ist_beendet(&self) -> bool {
        self.port_freigegeben.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// Test-Hilfen
// ---------------------------------------------------------------------------

/// Session ohne Transport: ausgehende Bytes landen im zurueckgegebenen Receiver
#[cfg(test)]
pub(crate) fn test_session(
    endpoint_id: u64,
    conference_id: u64,
    codec: Arc<dyn CodecGateway>,
    ereignisse: Arc<dyn FloorEventSink>,
) -> (Arc<EndpointSession>, mpsc::Receiver<Bytes>) {
    use std::net::Ipv4Addr;

    let pool = Arc::new(PortPool::default());
    let server_port = pool.zuteilen().expect("Test-Pool hat freie Ports");
    let (sende_tx, sende_rx) = mpsc::channel(SEND_QUEUE_GROESSE);
    let (shutdown_tx, _) = watch::channel(false);

    let session = Arc::new(EndpointSession {
        endpoint_id: EndpointId(endpoint_id),
        conference_id: ConferenceId(conference_id),
        remote: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9),
        transport: TransportKind::Udp,
        server_port,
        zustand: Mutex::new(FloorZustand::default()),
        codec,
        ereignisse,
        pool,
        sende_tx,
        shutdown_tx,
        task: Mutex::new(None),
        task_laeuft: watch::Sender::new(false),
        port_freigegeben: AtomicBool::new(false),
    });
    (session, sende_rx)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
