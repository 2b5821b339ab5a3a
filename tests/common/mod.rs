//! Shared helpers for integration tests. Every socket binds port 0 so the
//! tests can run in parallel.

#![allow(dead_code)]

use std::time::Duration;

use evaluation::config::Config;
use evaluation::http::parser::read_response;
use evaluation::http::response::Response;
use evaluation::http::router::Router;
use evaluation::server::{HttpServer, Shutdown};
use evaluation::socket::{TcpSocket, TimeoutKind};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Returns `(server side, client side)` of one loopback connection.
pub async fn socket_pair() -> (TcpSocket, TcpSocket) {
    let mut listener = TcpSocket::new();
    listener.create().unwrap();
    listener.bind(0).unwrap();
    listener.listen(1).unwrap();
    let port = listener.local_port().unwrap();

    let mut client = TcpSocket::new();
    client.create().unwrap();
    client.connect("127.0.0.1", port).await.unwrap();

    let server = listener.accept().await.unwrap();
    (server, client)
}

pub async fn connect(port: u16) -> TcpSocket {
    let mut client = TcpSocket::new();
    client.create().unwrap();
    client.connect("127.0.0.1", port).await.unwrap();
    client.set_timeout(TimeoutKind::Receive, 1000).unwrap();
    client
}

/// Sends `bytes` on a fresh connection and parses the reply.
pub async fn exchange(port: u16, bytes: &[u8]) -> Response {
    let mut client = connect(port).await;
    assert_eq!(client.send(bytes, true).await, bytes.len());
    read_response(&mut client).await.unwrap()
}

pub fn body_json(response: &Response) -> serde_json::Value {
    serde_json::from_slice(&response.body).unwrap()
}

pub fn pretty_error(error: &str, message: &str) -> Vec<u8> {
    let value = serde_json::json!({ "error": error, "message": message });
    serde_json::to_string_pretty(&value).unwrap().into_bytes()
}

/// An [`HttpServer`] running on a background task.
pub struct TestServer {
    pub port: u16,
    notify: broadcast::Sender<()>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    pub async fn start(router: Router) -> Self {
        let cfg = Config {
            port: 0,
            backlog: 4,
            // Each exchange waits out one receive timeout for the body
            recv_timeout_ms: 100,
            ..Config::default()
        };
        let mut server = HttpServer::new(&cfg, router);
        server.init().unwrap();
        let port = server.local_port().unwrap();

        let (notify, shutdown) = Shutdown::channel();
        let handle = tokio::spawn(async move { server.run(shutdown).await });

        Self {
            port,
            notify,
            handle,
        }
    }

    /// Signals shutdown and waits for the accept loop to return.
    pub async fn stop(self) -> anyhow::Result<()> {
        self.notify.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(2), self.handle)
            .await
            .expect("server did not stop in time")
            .unwrap()
    }
}
