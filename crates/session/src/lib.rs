//! podium-session – Session-Kern des Floor-Control-Servers
//!
//! Verwaltet pro Endpunkt eine Session mit eigenem Server-Port und Transport,
//! verarbeitet eingehende Floor-Nachrichten und verteilt Floor-Status an die
//! uebrigen Mitglieder einer Konferenz.
//!
//! ## Module
//! - [`ports`] – Port-Pool mit Free-List
//! - [`transport`] – UDP-Assoziation und TCP-Verbindung
//! - [`endpoint`] – Endpunkt-Session, Floor-Zustand und Dispatch
//! - [`conference`] – Konferenz-Register und Rundsenden
//! - [`coordinator`] – Session-Koordinator (Start, Stopp, Weiterleitung)
//! - [`events`] – Kanal-basierter `FloorEventSink`
//! - [`error`] – Fehlertypen

pub mod conference;
pub mod coordinator;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod ports;
pub mod transport;

pub use conference::KonferenzRegister;
pub use coordinator::{KoordinatorStatistik, SessionAnfrage, SessionAntwort, SessionKoordinator};
pub use endpoint::{EndpointSession, FloorZustand, SessionParameter, SessionUmgebung};
pub use error::{SessionError, SessionResult};
pub use events::{ereignis_kanal, KanalSink};
pub use ports::{PortBereich, PortPool};
pub use transport::Transport;
