//! Integration-Tests fuer UDP-Sessions ueber echte Loopback-Sockets

use podium_core::event::FloorEvent;
use podium_core::types::{ConferenceId, EndpointId, FloorId};
use podium_protocol::{CodecGateway, FloorMessage, JsonCodec, Primitive, RequestStatus};
use podium_session::{
    ereignis_kanal, PortBereich, PortPool, SessionAnfrage, SessionError, SessionKoordinator,
};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc::UnboundedReceiver;

const TIMEOUT: Duration = Duration::from_secs(2);

fn koordinator(min: u32, max: u32) -> (SessionKoordinator, UnboundedReceiver<FloorEvent>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let (sink, events) = ereignis_kanal();
    let k = SessionKoordinator::neu(
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        Arc::new(PortPool::neu(PortBereich::neu(min, max))),
        Arc::new(JsonCodec::new()),
        sink,
    );
    (k, events)
}

async fn client() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0").await.unwrap()
}

fn anfrage(endpoint_id: u64, conference_id: u64, remote: SocketAddr) -> SessionAnfrage {
    SessionAnfrage {
        endpoint_id: EndpointId(endpoint_id),
        remote_ip: remote.ip(),
        remote_port: remote.port(),
        conference_id: ConferenceId(conference_id),
        transport: "UDP".to_string(),
    }
}

async fn senden(client: &UdpSocket, server_port: u16, nachricht: &FloorMessage) {
    let bytes = JsonCodec::new().kodieren(nachricht).unwrap();
    client.send_to(&bytes, ("127.0.0.1", server_port)).await.unwrap();
}

async fn empfangen(client: &UdpSocket) -> FloorMessage {
    let mut buf = vec![0u8; 4096];
    let (n, _) = tokio::time::timeout(TIMEOUT, client.recv_from(&mut buf))
        .await
        .expect("Timeout beim Warten auf Antwort")
        .unwrap();
    JsonCodec::new().decode(&buf[..n]).unwrap()
}

async fn nichts_empfangen(client: &UdpSocket) {
    let mut buf = vec![0u8; 4096];
    let ergebnis =
        tokio::time::timeout(Duration::from_millis(150), client.recv_from(&mut buf)).await;
    assert!(ergebnis.is_err(), "Keine Nachricht erwartet");
}

async fn naechstes_ereignis(events: &mut UnboundedReceiver<FloorEvent>) -> FloorEvent {
    tokio::time::timeout(TIMEOUT, events.recv())
        .await
        .expect("Timeout beim Warten auf Ereignis")
        .unwrap()
}

#[tokio::test]
async fn szenario_zwei_endpunkte_in_konferenz_5() {
    let (k, mut events) = koordinator(43000, 43019);
    let c1 = client().await;
    let c2 = client().await;

    let a1 = k.session_starten(anfrage(1, 5, c1.local_addr().unwrap())).await.unwrap();
    let a2 = k.session_starten(anfrage(2, 5, c2.local_addr().unwrap())).await.unwrap();
    assert_ne!(a1.server_port, a2.server_port);
    assert_eq!(k.konferenz_mitglieder(ConferenceId(5)), vec![EndpointId(1), EndpointId(2)]);

    // Hello -> HelloAck
    senden(&c1, a1.server_port, &FloorMessage::neu(Primitive::Hello, ConferenceId(5), EndpointId(1), 1)).await;
    let ack = empfangen(&c1).await;
    assert_eq!(ack.primitive(), Primitive::HelloAck);
    assert_eq!(ack.transaction_id, 1);

    // FloorRequest -> genau ein Ereignis, keine Antwort
    let anfrage = FloorMessage::neu(Primitive::FloorRequest, ConferenceId(5), EndpointId(1), 2)
        .mit_floor_id(FloorId(2))
        .mit_floor_request_id(17);
    senden(&c1, a1.server_port, &anfrage).await;
    assert_eq!(
        naechstes_ereignis(&mut events).await,
        FloorEvent::FloorRequest {
            endpoint_id: EndpointId(1),
            conference_id: ConferenceId(5),
        }
    );
    nichts_empfangen(&c1).await;
    assert_eq!(
        k.endpunkt(EndpointId(1)).unwrap().floor_zustand().wanted_floor_id,
        Some(FloorId(2))
    );

    // Richtlinie gewaehrt
    k.floor_request_beantworten(ConferenceId(5), EndpointId(1), true).unwrap();
    let status = empfangen(&c1).await;
    assert_eq!(status.primitive(), Primitive::FloorRequestStatus);
    assert_eq!(status.transaction_id, 2);
    assert_eq!(status.floor_request_id, Some(17));
    assert_eq!(status.request_status, Some(RequestStatus::Granted));

    // Rundsenden erreicht nur Endpunkt 2
    let empfaenger = k.floor_status_rundsenden(ConferenceId(5), EndpointId(1), true).unwrap();
    assert_eq!(empfaenger, 1);
    let status = empfangen(&c2).await;
    assert_eq!(status.primitive(), Primitive::FloorStatus);
    assert_eq!(status.floor_id(), Some(FloorId(2)));
    assert_eq!(status.request_status, Some(RequestStatus::Granted));
    assert_eq!(status.user_id, EndpointId(2));
    nichts_empfangen(&c1).await;

    // Stoppen von Endpunkt 1
    k.session_stoppen(EndpointId(1)).await.unwrap();
    assert!(k.endpunkt(EndpointId(1)).is_none());
    assert_eq!(k.konferenz_mitglieder(ConferenceId(5)), vec![EndpointId(2)]);
    assert!(!k.port_pool().ist_vergeben(a1.server_port));

    // Letztes Mitglied -> Konferenz verschwindet
    k.session_stoppen(EndpointId(2)).await.unwrap();
    assert_eq!(k.konferenz_anzahl(), 0);
    assert_eq!(k.statistik().ports_vergeben, 0);
}

#[tokio::test]
async fn dekodierfehler_beendet_session_nicht() {
    let (k, _events) = koordinator(43020, 43029);
    let c1 = client().await;
    let a1 = k.session_starten(anfrage(1, 5, c1.local_addr().unwrap())).await.unwrap();

    c1.send_to(b"\x00\x00\x00\x05kaputt", ("127.0.0.1", a1.server_port))
        .await
        .unwrap();
    senden(&c1, a1.server_port, &FloorMessage::neu(Primitive::Hello, ConferenceId(5), EndpointId(1), 9)).await;

    let ack = empfangen(&c1).await;
    assert_eq!(ack.primitive(), Primitive::HelloAck);
    assert_eq!(ack.transaction_id, 9);
    assert_eq!(k.endpunkt_anzahl(), 1);

    k.alle_stoppen().await;
}

#[tokio::test]
async fn gestoppter_port_ist_wieder_vergebbar() {
    let (k, _events) = koordinator(43030, 43030);
    let c1 = client().await;

    let a1 = k.session_starten(anfrage(1, 5, c1.local_addr().unwrap())).await.unwrap();
    assert_eq!(a1.server_port, 43030);
    assert!(matches!(
        k.session_starten(anfrage(2, 5, c1.local_addr().unwrap())).await,
        Err(SessionError::PortPoolErschoepft)
    ));

    k.session_stoppen(EndpointId(1)).await.unwrap();
    let a2 = k.session_starten(anfrage(2, 5, c1.local_addr().unwrap())).await.unwrap();
    assert_eq!(a2.server_port, 43030);

    k.alle_stoppen().await;
}

#[tokio::test]
async fn stoppen_unbekannter_endpunkt() {
    let (k, _events) = koordinator(43040, 43049);
    let c1 = client().await;
    k.session_starten(anfrage(1, 5, c1.local_addr().unwrap())).await.unwrap();

    assert!(matches!(
        k.session_stoppen(EndpointId(99)).await,
        Err(SessionError::UnbekannterEndpunkt(EndpointId(99)))
    ));

    k.session_stoppen(EndpointId(1)).await.unwrap();
    // Zweites Stoppen: unbekannt, kein doppeltes Freigeben
    assert!(matches!(
        k.session_stoppen(EndpointId(1)).await,
        Err(SessionError::UnbekannterEndpunkt(_))
    ));
    assert_eq!(k.statistik().ports_vergeben, 0);
    assert_eq!(k.statistik().ports_verfuegbar, 10);
}

#[tokio::test]
async fn ports_bleiben_ueber_start_stopp_folgen_disjunkt() {
    let (k, _events) = koordinator(43100, 43139);
    let c1 = client().await;
    let remote = c1.local_addr().unwrap();

    let mut aktiv = Vec::new();
    for runde in 0..3u64 {
        for i in 0..8u64 {
            let id = runde * 100 + i;
            let antwort = k.session_starten(anfrage(id, runde % 2, remote)).await.unwrap();
            assert!((43100..=43139).contains(&antwort.server_port));
            aktiv.push((EndpointId(id), antwort.server_port));
        }

        let ports: HashSet<u16> = aktiv.iter().map(|(_, p)| *p).collect();
        assert_eq!(ports.len(), aktiv.len(), "Port doppelt vergeben");

        // Jeden zweiten stoppen
        let (stoppen, behalten): (Vec<_>, Vec<_>) =
            aktiv.into_iter().enumerate().partition(|(i, _)| i % 2 == 0);
        for (_, (id, _)) in stoppen {
            k.session_stoppen(id).await.unwrap();
        }
        aktiv = behalten.into_iter().map(|(_, e)| e).collect();
        assert_eq!(k.statistik().ports_vergeben, aktiv.len());
    }

    k.alle_stoppen().await;
    assert_eq!(k.statistik().sessions, 0);
}

#[tokio::test]
async fn floor_release_und_query_ueber_udp() {
    let (k, mut events) = koordinator(43050, 43059);
    let c1 = client().await;
    let a1 = k.session_starten(anfrage(1, 5, c1.local_addr().unwrap())).await.unwrap();

    senden(
        &c1,
        a1.server_port,
        &FloorMessage::neu(Primitive::FloorQuery, ConferenceId(5), EndpointId(1), 3)
            .mit_floor_id(FloorId(8)),
    )
    .await;
    assert!(matches!(naechstes_ereignis(&mut events).await, FloorEvent::FloorQuery { .. }));

    k.floor_query_beantworten(ConferenceId(5), EndpointId(1), true).unwrap();
    let status = empfangen(&c1).await;
    assert_eq!(status.primitive(), Primitive::FloorStatus);
    assert_eq!(status.transaction_id, 3);
    assert_eq!(status.floor_id(), Some(FloorId(8)));

    senden(
        &c1,
        a1.server_port,
        &FloorMessage::neu(Primitive::FloorRelease, ConferenceId(5), EndpointId(1), 4),
    )
    .await;
    assert!(matches!(naechstes_ereignis(&mut events).await, FloorEvent::FloorRelease { .. }));

    k.floor_request_beantworten(ConferenceId(5), EndpointId(1), false).unwrap();
    let status = empfangen(&c1).await;
    assert_eq!(status.primitive(), Primitive::FloorRequestStatus);
    assert_eq!(status.transaction_id, 4);
    assert_eq!(status.request_status, Some(RequestStatus::Released));

    k.alle_stoppen().await;
}
