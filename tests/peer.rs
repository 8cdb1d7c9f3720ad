//! End-to-end tests of two peers over loopback TCP.

mod common;

use common::{collect, config, Record};
use misra_pingpong::{MisraError, Peer};
use std::time::Duration;
use tokio::{net::TcpListener, sync::mpsc};

#[tokio::test]
async fn two_peers_take_turns_over_tcp() {
    let listener_a = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let listener_b = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address_a = listener_a.local_addr().unwrap();
    let address_b = listener_b.local_addr().unwrap();
    let (events, mut seen) = mpsc::unbounded_channel();

    let mut config_a = config(true);
    config_a.send_address = address_b.to_string();
    let mut config_b = config(false);
    config_b.send_address = address_a.to_string();

    let a = tokio::spawn(
        Peer::new(config_a, Record::new("A", events.clone())).run_with_listener(listener_a),
    );
    let b = tokio::spawn(Peer::new(config_b, Record::new("B", events)).run_with_listener(listener_b));

    let sections = collect(&mut seen, 4, Duration::from_secs(10)).await;
    assert_eq!(sections, vec![("B", 2), ("A", 3), ("B", 4), ("A", 5)]);

    a.abort();
    b.abort();
}

#[tokio::test]
async fn peer_stops_when_its_predecessor_disconnects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let next = TcpListener::bind("127.0.0.1:0").await.unwrap();

    let mut config = config(false);
    config.send_address = next.local_addr().unwrap().to_string();
    let (events, _seen) = mpsc::unbounded_channel();
    let peer = tokio::spawn(Peer::new(config, Record::new("B", events)).run_with_listener(listener));

    let previous = tokio::net::TcpStream::connect(address).await.unwrap();
    let (_next_side, _) = next.accept().await.unwrap();
    drop(previous);

    let result = tokio::time::timeout(Duration::from_secs(5), peer)
        .await
        .expect("peer kept running")
        .unwrap();
    assert!(matches!(result, Err(MisraError::InboundClosed)));
}

#[tokio::test]
async fn invalid_config_is_rejected_before_connecting() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = config(false);
    config.loss_probability = 2.0;
    let (events, _seen) = mpsc::unbounded_channel();

    let result = Peer::new(config, Record::new("A", events))
        .run_with_listener(listener)
        .await;
    assert!(matches!(result, Err(MisraError::Config(_))));
}
