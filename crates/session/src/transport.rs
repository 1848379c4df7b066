//! Transport einer Endpunkt-Session – UDP-Assoziation oder TCP-Verbindung
//!
//! Jede Session besitzt genau einen `Transport`, der beim Start gewaehlt und
//! danach nie gewechselt wird. Beide Varianten bieten dieselben Operationen:
//! `empfangen`, `senden` und `schliessen`.
//!
//! ```text
//! Transport::Udp(UdpAssociation)   Socket auf dem Server-Port, sendet an die Remote-Adresse
//! Transport::Tcp(TcpConnection)    Listener auf dem Server-Port, erste Verbindung wird angenommen
//! ```
//!
//! TCP-Frames werden ueber `CodecGateway::frame_laenge` aus dem Stream
//! geschnitten, UDP-Datagramme sind immer genau eine Nachricht.

use bytes::{Bytes, BytesMut};
use futures_util::{SinkExt, StreamExt};
use podium_core::types::TransportKind;
use podium_protocol::CodecGateway;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio_util::codec::{Decoder, Encoder, Framed};

/// Maximale UDP-Datagrammgroesse
const UDP_BUFFER_SIZE: usize = 65_536;

// ---------------------------------------------------------------------------
// TransportEreignis
// ---------------------------------------------------------------------------

/// Ergebnis eines Empfangsschritts
#[derive(Debug)]
pub enum TransportEreignis {
    /// Eine vollstaendige Nachricht (Datagramm oder TCP-Frame)
    Daten(Bytes),
    /// TCP: die erste eingehende Verbindung wurde angenommen
    Verbunden(SocketAddr),
    /// TCP: die Gegenstelle hat die Verbindung geschlossen
    Geschlossen,
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Transport-Handle einer Endpunkt-Session
pub enum Transport {
    Udp(UdpAssociation),
    Tcp(TcpConnection),
}

impl Transport {
    /// Bindet den Transport auf der lokalen Adresse
    ///
    /// Kehrt erst zurueck, wenn Socket bzw. Listener empfangsbereit ist.
    pub async fn oeffnen(
        art: TransportKind,
        lokal: SocketAddr,
        remote: SocketAddr,
        codec: Arc<dyn CodecGateway>,
    ) -> io::Result<Self> {
        match art {
            TransportKind::Udp => Ok(Self::Udp(UdpAssociation::binden(lokal, remote).await?)),
            TransportKind::Tcp => Ok(Self::Tcp(TcpConnection::lauschen(lokal, codec).await?)),
        }
    }

    /// Tatsaechlich gebundene lokale Adresse
    pub fn lokale_adresse(&self) -> io::Result<SocketAddr> {
        match self {
            Self::Udp(udp) => udp.socket.local_addr(),
            Self::Tcp(tcp) => tcp.listener.local_addr(),
        }
    }

    /// Prueft ob `senden` aktuell moeglich ist
    ///
    /// TCP kann erst nach angenommener Verbindung senden.
    pub fn sendebereit(&self) -> bool {
        match self {
            Self::Udp(_) => true,
            Self::Tcp(tcp) => tcp.verbindung.is_some(),
        }
    }

    /// Wartet auf das naechste Transport-Ereignis
    ///
    /// Cancel-safe, darf in `tokio::select!` verwendet werden.
    pub async fn empfangen(&mut self) -> io::Result<TransportEreignis> {
        match self {
            Self::Udp(udp) => udp.empfangen().await,
            Self::Tcp(tcp) => tcp.empfangen().await,
        }
    }

    /// Sendet eine kodierte Nachricht
    pub async fn senden(&mut self, daten: Bytes) -> io::Result<()> {
        match self {
            Self::Udp(udp) => udp.senden(&daten).await,
            Self::Tcp(tcp) => tcp.senden(daten).await,
        }
    }

    /// Schliesst Socket, Listener und eine eventuell angenommene Verbindung
    pub async fn schliessen(self) {
        match self {
            Self::Udp(udp) => udp.schliessen(),
            Self::Tcp(tcp) => tcp.schliessen().await,
        }
    }
}

// ---------------------------------------------------------------------------
// UdpAssociation
// ---------------------------------------------------------------------------

/// UDP-Socket auf dem Server-Port, gekoppelt an die Remote-Adresse des Endpunkts
pub struct UdpAssociation {
    socket: UdpSocket,
    remote: SocketAddr,
    puffer: Vec<u8>,
}

impl UdpAssociation {
    async fn binden(lokal: SocketAddr, remote: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(lokal).await?;
        tracing::debug!(lokal = %lokal, remote = %remote, "UDP-Socket gebunden");
        Ok(Self {
            socket,
            remote,
            puffer: vec![0u8; UDP_BUFFER_SIZE],
        })
    }

    async fn empfangen(&mut self) -> io::Result<TransportEreignis> {
        let (laenge, absender) = self.socket.recv_from(&mut self.puffer).await?;
        tracing::trace!(bytes = laenge, absender = %absender, "UDP-Datagramm empfangen");
        Ok(TransportEreignis::Daten(Bytes::copy_from_slice(
            &self.puffer[..laenge],
        )))
    }

    async fn senden(&self, daten: &[u8]) -> io::Result<()> {
        self.socket.send_to(daten, self.remote).await?;
        tracing::trace!(bytes = daten.len(), ziel = %self.remote, "UDP-Datagramm gesendet");
        Ok(())
    }

    fn schliessen(self) {
        tracing::debug!(remote = %self.remote, "UDP-Socket geschlossen");
    }
}

// ---------------------------------------------------------------------------
// TcpConnection
// ---------------------------------------------------------------------------

/// TCP-Listener auf dem Server-Port und die erste angenommene Verbindung
pub struct TcpConnection {
    listener: TcpListener,
    verbindung: Option<Framed<TcpStream, GatewayFrames>>,
    codec: Arc<dyn CodecGateway>,
}

impl TcpConnection {
    async fn lauschen(lokal: SocketAddr, codec: Arc<dyn CodecGateway>) -> io::Result<Self> {
        let listener = TcpListener::bind(lokal).await?;
        tracing::debug!(lokal = %lokal, "TCP-Listener gestartet");
        Ok(Self {
            listener,
            verbindung: None,
            codec,
        })
    }

    async fn empfangen(&mut self) -> io::Result<TransportEreignis> {
        if let Some(framed) = self.verbindung.as_mut() {
            return match framed.next().await {
                Some(Ok(frame)) => Ok(TransportEreignis::Daten(frame)),
                Some(Err(e)) => Err(e),
                None => Ok(TransportEreignis::Geschlossen),
            };
        }

        // Weitere Verbindungen bleiben im Backlog, nur die erste wird bedient
        let (stream, peer) = self.listener.accept().await?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(fehler = %e, "TCP_NODELAY konnte nicht gesetzt werden");
        }
        self.verbindung = Some(Framed::new(
            stream,
            GatewayFrames::neu(Arc::clone(&self.codec)),
        ));
        Ok(TransportEreignis::Verbunden(peer))
    }

    async fn senden(&mut self, daten: Bytes) -> io::Result<()> {
        match self.verbindung.as_mut() {
            Some(framed) => framed.send(daten).await,
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "Noch keine TCP-Verbindung angenommen",
            )),
        }
    }

    async fn schliessen(self) {
        if let Some(framed) = self.verbindung {
            let mut stream = framed.into_inner();
            if let Err(e) = stream.shutdown().await {
                tracing::debug!(fehler = %e, "TCP-Shutdown fehlgeschlagen");
            }
        }
        tracing::debug!("TCP-Listener geschlossen");
    }
}

// ---------------------------------------------------------------------------
// GatewayFrames – tokio-util Codec fuer TCP
// ---------------------------------------------------------------------------

/// Schneidet vollstaendige Frames anhand des Codec-Gateways aus dem Stream
///
/// Ausgehende Bytes sind bereits vollstaendig kodiert und werden unveraendert
/// geschrieben.
pub struct GatewayFrames {
    codec: Arc<dyn CodecGateway>,
}

impl GatewayFrames {
    pub fn neu(codec: Arc<dyn CodecGateway>) -> Self {
        Self { codec }
    }
}

impl Decoder for GatewayFrames {
    type Item = Bytes;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.codec.frame_laenge(src) {
            Ok(Some(laenge)) => Ok(Some(src.split_to(laenge).freeze())),
            Ok(None) => Ok(None),
            Err(e) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        }
    }
}

impl Encoder<Bytes> for GatewayFrames {
    type Error = io::Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&item);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
