mod common;

use std::io::ErrorKind;

use common::socket_pair;
use evaluation::socket::{PortRegistry, Received, TcpSocket, TimeoutKind, resolve_ipv4};

#[test]
fn test_simple_open_close() {
    let mut sock = TcpSocket::new();
    assert!(!sock.is_open());

    sock.create().unwrap();
    assert!(sock.is_open());
    sock.close().unwrap();
    assert!(!sock.is_open());
}

#[test]
fn test_double_close_is_reported() {
    let mut sock = TcpSocket::new();
    sock.create().unwrap();
    sock.close().unwrap();

    let err = sock.close().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotConnected);
}

#[test]
fn test_registry_blocks_second_bind() {
    let registry = PortRegistry::new();

    let mut sock = TcpSocket::with_registry(registry.clone());
    sock.create().unwrap();
    sock.bind(0).unwrap();
    let port = sock.local_port().unwrap();
    assert!(registry.contains(port));

    let mut sock2 = TcpSocket::with_registry(registry.clone());
    sock2.create().unwrap();
    let err = sock2.bind(port).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AddrInUse);

    sock.close().unwrap();
    assert!(!registry.contains(port));
    sock2.close().unwrap();
}

#[test]
fn test_drop_releases_port() {
    let registry = PortRegistry::new();
    let port = {
        let mut sock = TcpSocket::with_registry(registry.clone());
        sock.create().unwrap();
        sock.bind(0).unwrap();
        sock.local_port().unwrap()
    };

    assert!(!registry.contains(port));
    assert!(registry.is_empty());
}

#[test]
fn test_bind_requires_created_socket() {
    let mut sock = TcpSocket::new();
    let err = sock.bind(0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotConnected);
}

#[test]
fn test_take_leaves_closed_socket() {
    let mut sock = TcpSocket::new();
    sock.create().unwrap();
    sock.bind(0).unwrap();
    let port = sock.local_port();

    let moved = std::mem::take(&mut sock);
    assert!(!sock.is_open());
    assert!(moved.is_open());
    assert_eq!(moved.local_port(), port);
}

#[tokio::test]
async fn test_listen_connect_accept() {
    let (server, client) = socket_pair().await;

    assert!(server.is_open());
    assert!(client.is_open());
    assert_eq!(
        server.peer_addr().unwrap().port(),
        client.local_port().unwrap()
    );
}

#[tokio::test]
async fn test_messaging() {
    let (mut server, mut client) = socket_pair().await;

    assert_eq!(client.send(b"Hello Server!", true).await, 13);
    assert_eq!(&server.receive().await[..], b"Hello Server!");

    assert_eq!(server.send(b"Hello Client!", true).await, 13);
    assert_eq!(&client.receive().await[..], b"Hello Client!");
}

#[tokio::test]
async fn test_receive_timeout_then_close() {
    let (mut server, mut client) = socket_pair().await;
    server.set_timeout(TimeoutKind::Receive, 20).unwrap();

    assert_eq!(server.recv_chunk().await, Received::TimedOut);
    assert!(server.receive().await.is_empty());

    client.close().unwrap();
    assert_eq!(server.recv_chunk().await, Received::Closed);
}

#[tokio::test]
async fn test_set_timeout_tracks_values() {
    let (mut server, _client) = socket_pair().await;

    assert_eq!(server.timeout(TimeoutKind::Receive), 0);
    server.set_timeout(TimeoutKind::Receive, 100).unwrap();
    server.set_timeout(TimeoutKind::Receive, 100).unwrap();
    server.set_timeout(TimeoutKind::Send, 50).unwrap();

    assert_eq!(server.timeout(TimeoutKind::Receive), 100);
    assert_eq!(server.timeout(TimeoutKind::Send), 50);

    server.close().unwrap();
    assert_eq!(server.timeout(TimeoutKind::Receive), 0);
    assert!(server.set_timeout(TimeoutKind::Receive, 10).is_err());
}

#[tokio::test]
async fn test_connect_rejects_invalid_address() {
    let mut client = TcpSocket::new();
    client.create().unwrap();

    let err = client.connect("not-an-ip", 80).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    // The socket is untouched by an address error
    assert!(client.is_open());
}

#[tokio::test]
async fn test_connect_refused_closes_socket() {
    let port = {
        let mut sock = TcpSocket::new();
        sock.create().unwrap();
        sock.bind(0).unwrap();
        sock.local_port().unwrap()
    };

    let mut client = TcpSocket::new();
    client.create().unwrap();
    assert!(client.connect("127.0.0.1", port).await.is_err());
    assert!(!client.is_open());
}

#[tokio::test]
async fn test_send_on_closed_socket() {
    let mut sock = TcpSocket::new();

    assert_eq!(sock.send(b"data", true).await, 0);
    let err = sock.send_all(b"data").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WriteZero);
}

#[tokio::test]
async fn test_accept_requires_listening_socket() {
    let mut sock = TcpSocket::new();
    sock.create().unwrap();

    let err = sock.accept().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotConnected);
}

#[tokio::test]
async fn test_resolve_ipv4_literal() {
    assert_eq!(resolve_ipv4("127.0.0.1", 80).await.unwrap(), "127.0.0.1");
}
