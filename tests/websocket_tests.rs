mod common;

use common::{CaptureLogger, RecordingStore, StubProvider};
use futures_util::{stream, SinkExt, StreamExt};
use std::io;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use transit_tracker::adapters::inbound::WebSocketGateway;
use transit_tracker::adapters::outbound::init_noop_logger;
use transit_tracker::domains::broadcast::BroadcastHub;
use transit_tracker::domains::logger::DynLogger;
use transit_tracker::domains::tracking::{ActiveEntity, DirectionTable};
use transit_tracker::GeoPoint;

async fn wait_for_subscribers(hub: &BroadcastHub, expected: usize) {
    for _ in 0..100 {
        if hub.subscriber_count() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("subscriber count stuck at {}", hub.subscriber_count());
}

fn parked_hub(logger: DynLogger) -> BroadcastHub {
    let mut parked = ActiveEntity::new(7, "KBX 707");
    parked.last_position = Some(GeoPoint::new(-1.1, 37.0));
    BroadcastHub::new(
        common::settings(),
        RecordingStore::with(vec![parked]),
        StubProvider::new(common::two_points()),
        DirectionTable::new(&common::routes()).unwrap(),
        logger,
    )
}

#[tokio::test]
async fn client_gets_full_snapshot_then_deltas() {
    let hub = parked_hub(init_noop_logger());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let gateway = WebSocketGateway::new(hub.clone(), init_noop_logger());
    let server = tokio::spawn(async move { gateway.serve(listener).await });

    let (mut socket, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

    let first = socket.next().await.unwrap().unwrap();
    let body: serde_json::Value = serde_json::from_str(first.to_text().unwrap()).unwrap();
    assert_eq!(body["event"], "vehicleUpdate");
    assert_eq!(body["kind"], "full");
    assert_eq!(body["data"][0]["id"], 7);
    assert_eq!(body["data"][0]["lat"], -1.1);

    wait_for_subscribers(&hub, 1).await;
    hub.tick().await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    hub.tick().await;

    let second = socket.next().await.unwrap().unwrap();
    let body: serde_json::Value = serde_json::from_str(second.to_text().unwrap()).unwrap();
    assert_eq!(body["kind"], "delta");
    assert_eq!(body["data"][0]["label"], "KBX 707");

    socket.send(Message::Close(None)).await.unwrap();
    wait_for_subscribers(&hub, 0).await;

    server.abort();
}

#[tokio::test]
async fn failed_accept_does_not_stop_the_endpoint() {
    let capture = CaptureLogger::new();
    let hub = parked_hub(capture.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let client = tokio::spawn(async move { connect_async(format!("ws://{}", addr)).await });
    let accepted = listener.accept().await.unwrap();

    let incoming = stream::iter(vec![
        Err(io::Error::new(io::ErrorKind::Other, "too many open files")),
        Ok(accepted),
    ])
    .chain(stream::pending());
    let gateway = WebSocketGateway::new(hub.clone(), capture.clone());
    let server = tokio::spawn(async move { gateway.serve_incoming(incoming).await });

    let (mut socket, _) = client.await.unwrap().unwrap();
    let first = socket.next().await.unwrap().unwrap();
    let body: serde_json::Value = serde_json::from_str(first.to_text().unwrap()).unwrap();
    assert_eq!(body["kind"], "full");
    assert!(capture.contains("Accept failed: too many open files"));
    assert!(!server.is_finished());

    server.abort();
}
