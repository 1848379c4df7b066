//! Standard-Richtlinie fuer Floor-Entscheidungen
//!
//! Liest `FloorEvent`s aus dem Ereignis-Kanal, zaehlt sie und trifft bei
//! `auto_gewaehren` eine einfache Entscheidung:
//!
//! ```text
//! FloorRequest  -> Antwort granted  + FloorStatus granted an alle anderen
//! FloorRelease  -> Antwort released + FloorStatus released an alle anderen
//! FloorQuery    -> FloorStatus granted an den Anfragenden
//! ```
//!
//! Ohne `auto_gewaehren` werden Ereignisse nur protokolliert, die
//! Entscheidungen kommen dann ueber die REST-API.

use podium_core::event::FloorEvent;
use podium_observability::FloorMetrics;
use podium_session::{SessionKoordinator, SessionResult};
use tokio::sync::mpsc;

/// Verarbeitet Floor-Ereignisse des Koordinators
pub struct FloorRichtlinie {
    koordinator: SessionKoordinator,
    metriken: FloorMetrics,
    auto_gewaehren: bool,
}

impl FloorRichtlinie {
    pub fn neu(koordinator: SessionKoordinator, metriken: FloorMetrics, auto_gewaehren: bool) -> Self {
        Self {
            koordinator,
            metriken,
            auto_gewaehren,
        }
    }

    /// Laeuft bis der Ereignis-Kanal geschlossen wird
    pub async fn ausfuehren(self, mut ereignisse: mpsc::UnboundedReceiver<FloorEvent>) {
        tracing::info!(auto_gewaehren = self.auto_gewaehren, "Floor-Richtlinie gestartet");
        while let Some(event) = ereignisse.recv().await {
            self.ereignis_verarbeiten(event);
        }
        tracing::debug!("Ereignis-Kanal geschlossen, Floor-Richtlinie beendet");
    }

    /// Zaehlt ein Ereignis und entscheidet gegebenenfalls
    pub fn ereignis_verarbeiten(&self, event: FloorEvent) {
        self.metriken.ereignis_zaehlen(event.art());
        tracing::info!(
            endpoint_id = %event.endpoint_id(),
            conference_id = %event.conference_id(),
            art = event.art(),
            "Floor-Ereignis"
        );

        if !self.auto_gewaehren {
            return;
        }

        if let Err(e) = self.entscheiden(event) {
            tracing::warn!(
                endpoint_id = %event.endpoint_id(),
                art = event.art(),
                fehler = %e,
                "Automatische Entscheidung fehlgeschlagen"
            );
        }
    }

    fn entscheiden(&self, event: FloorEvent) -> SessionResult<()> {
        let conference_id = event.conference_id();
        let endpoint_id = event.endpoint_id();

        match event {
            FloorEvent::FloorRequest { .. } => {
                self.koordinator
                    .floor_request_beantworten(conference_id, endpoint_id, true)?;
                self.koordinator
                    .floor_status_rundsenden(conference_id, endpoint_id, true)?;
                self.metriken.entscheidung_zaehlen(true);
            }
            FloorEvent::FloorRelease { .. } => {
                self.koordinator
                    .floor_request_beantworten(conference_id, endpoint_id, false)?;
                self.koordinator
                    .floor_status_rundsenden(conference_id, endpoint_id, false)?;
                self.metriken.entscheidung_zaehlen(false);
            }
            FloorEvent::FloorQuery { .. } => {
                self.koordinator
                    .floor_query_beantworten(conference_id, endpoint_id, true)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podium_core::types::{ConferenceId, EndpointId, FloorId};
    use podium_protocol::{CodecGateway, FloorMessage, JsonCodec, Primitive, RequestStatus};
    use podium_session::{ereignis_kanal, PortBereich, PortPool, SessionAnfrage};
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::UdpSocket;

    async fn aufbau(
        min: u32,
        max: u32,
    ) -> (SessionKoordinator, mpsc::UnboundedReceiver<FloorEvent>, FloorMetrics) {
        let (sink, events) = ereignis_kanal();
        let koordinator = SessionKoordinator::neu(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            Arc::new(PortPool::neu(PortBereich::neu(min, max))),
            Arc::new(JsonCodec::new()),
            sink,
        );
        (koordinator, events, FloorMetrics::neu().unwrap())
    }

    async fn endpunkt(k: &SessionKoordinator, id: u64) -> (UdpSocket, u16) {
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let remote = client.local_addr().unwrap();
        let antwort = k
            .session_starten(SessionAnfrage {
                endpoint_id: EndpointId(id),
                remote_ip: remote.ip(),
                remote_port: remote.port(),
                conference_id: ConferenceId(5),
                transport: "UDP".into(),
            })
            .await
            .unwrap();
        (client, antwort.server_port)
    }

    async fn empfangen(client: &UdpSocket) -> FloorMessage {
        let mut buf = vec![0u8; 4096];
        let (n, _) = tokio::time::timeout(Duration::from_secs(2), client.recv_from(&mut buf))
            .await
            .expect("Timeout")
            .unwrap();
        JsonCodec::new().decode(&buf[..n]).unwrap()
    }

    #[tokio::test]
    async fn auto_gewaehren_beantwortet_und_sendet_rund() {
        let (k, mut events, metriken) = aufbau(45000, 45009).await;
        let (c1, port1) = endpunkt(&k, 1).await;
        let (c2, _) = endpunkt(&k, 2).await;

        let anfrage = FloorMessage::neu(Primitive::FloorRequest, ConferenceId(5), EndpointId(1), 7)
            .mit_floor_id(FloorId(1));
        c1.send_to(&JsonCodec::new().kodieren(&anfrage).unwrap(), ("127.0.0.1", port1))
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
            .unwrap();
        let richtlinie = FloorRichtlinie::neu(k.clone(), metriken.clone(), true);
        richtlinie.ereignis_verarbeiten(event);

        let status = empfangen(&c1).await;
        assert_eq!(status.primitive(), Primitive::FloorRequestStatus);
        assert_eq!(status.request_status, Some(RequestStatus::Granted));

        let rund = empfangen(&c2).await;
        assert_eq!(rund.primitive(), Primitive::FloorStatus);
        assert_eq!(rund.floor_id(), Some(FloorId(1)));

        assert_eq!(
            metriken.floor_events_total.with_label_values(&["floor_request"]).get(),
            1
        );
        assert_eq!(metriken.floor_decisions_total.with_label_values(&["granted"]).get(), 1);

        k.alle_stoppen().await;
    }

    #[tokio::test]
    async fn ohne_auto_gewaehren_nur_zaehlen() {
        let (k, _events, metriken) = aufbau(45010, 45019).await;
        let (c1, _) = endpunkt(&k, 1).await;

        let richtlinie = FloorRichtlinie::neu(k.clone(), metriken.clone(), false);
        richtlinie.ereignis_verarbeiten(FloorEvent::FloorRequest {
            endpoint_id: EndpointId(1),
            conference_id: ConferenceId(5),
        });

        let mut buf = [0u8; 64];
        let ergebnis =
            tokio::time::timeout(Duration::from_millis(150), c1.recv_from(&mut buf)).await;
        assert!(ergebnis.is_err(), "Keine Antwort ohne auto_gewaehren");
        assert_eq!(
            metriken.floor_events_total.with_label_values(&["floor_request"]).get(),
            1
        );

        k.alle_stoppen().await;
    }

    #[tokio::test]
    async fn ereignis_fuer_gestoppten_endpunkt_wird_ignoriert() {
        let (k, _events, metriken) = aufbau(45020, 45029).await;
        let richtlinie = FloorRichtlinie::neu(k.clone(), metriken.clone(), true);

        richtlinie.ereignis_verarbeiten(FloorEvent::FloorRelease {
            endpoint_id: EndpointId(9),
            conference_id: ConferenceId(5),
        });
        assert_eq!(metriken.floor_decisions_total.with_label_values(&["released"]).get(), 0);
    }
}
