mod common;

use common::{TestServer, body_json, connect, exchange, pretty_error};
use evaluation::api::{self, ApiState};
use evaluation::config::Config;
use evaluation::http::router::Router;
use evaluation::server::{HttpServer, ServerState, Shutdown};
use evaluation::socket::{PortRegistry, TcpSocket};

async fn start_api() -> TestServer {
    TestServer::start(api::router(ApiState::default())).await
}

#[tokio::test]
async fn test_query_ids_increase_across_connections() {
    let server = start_api().await;

    let first = exchange(server.port, b"GET /v0/GetQueryID HTTP/1.1\r\n\r\n").await;
    let second = exchange(server.port, b"GET /v0/GetQueryID HTTP/1.1\r\n\r\n").await;

    assert_eq!(first.code, 200);
    assert_eq!(body_json(&first)["query_ID"], 0);
    assert_eq!(second.code, 200);
    assert_eq!(body_json(&second)["query_ID"], 1);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_malformed_request_gets_400() {
    let server = start_api().await;

    let response = exchange(server.port, b"Not an HTTP Request").await;
    assert_eq!(response.code, 400);
    assert_eq!(response.status, "Bad Request");
    assert_eq!(response.headers.get("content-type"), Some("application/json"));
    assert_eq!(response.body, pretty_error("Bad Request", "Error parsing request."));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_silent_client_gets_400() {
    let server = start_api().await;

    let mut client = connect(server.port).await;
    let response = evaluation::http::read_response(&mut client).await.unwrap();
    assert_eq!(response.code, 400);
    assert_eq!(response.body, pretty_error("Bad Request", "Error parsing request."));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_wrong_version_gets_505() {
    let server = start_api().await;

    let response = exchange(server.port, b"GET /v0/GetQueryID HTTP/1.0\r\n\r\n").await;
    assert_eq!(response.code, 505);
    assert_eq!(
        response.body,
        pretty_error("HTTP Version Not Supported", "HTTP/1.1 Must be Used.")
    );

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_body_without_length_gets_411() {
    let server = start_api().await;

    let response = exchange(server.port, b"POST /v0/ReportMetrics HTTP/1.1\r\n\r\n{}").await;
    assert_eq!(response.code, 411);
    assert_eq!(
        response.body,
        pretty_error(
            "Length Required",
            "Content-Length header must be specified when sending a request body"
        )
    );

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_invalid_content_length_gets_400() {
    let server = start_api().await;

    let response = exchange(
        server.port,
        b"POST /v0/ReportMetrics HTTP/1.1\r\nContent-Length: ABCDEFG\r\n\r\n{}",
    )
    .await;
    assert_eq!(response.code, 400);
    assert_eq!(
        response.body,
        pretty_error("Bad Request", "Specified content length (ABCDEFG) is invalid")
    );

    let response = exchange(
        server.port,
        b"POST /v0/ReportMetrics HTTP/1.1\r\nContent-Length: 69\r\n\r\n{}",
    )
    .await;
    assert_eq!(response.code, 400);
    assert_eq!(
        response.body,
        pretty_error(
            "Bad Request",
            "Provided content length 69 does not match actual content length 2"
        )
    );

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_unknown_resource_gets_404() {
    let server = start_api().await;
    let expected = pretty_error("Not Found", "Resource (API function) not found");

    let response = exchange(server.port, b"GET /v0/DoesNotExist HTTP/1.1\r\n\r\n").await;
    assert_eq!(response.code, 404);
    assert_eq!(response.body, expected);

    let response = exchange(
        server.port,
        b"POST /v1/GetQueryID HTTP/1.1\r\nContent-Length: 2\r\n\r\n{}",
    )
    .await;
    assert_eq!(response.code, 404);
    assert_eq!(response.body, expected);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_empty_router_answers_404() {
    let server = TestServer::start(Router::new()).await;

    let response = exchange(server.port, b"GET /v0/GetQueryID HTTP/1.1\r\n\r\n").await;
    assert_eq!(response.code, 404);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_listener() {
    let server = start_api().await;
    let port = server.port;

    server.stop().await.unwrap();

    let mut client = TcpSocket::new();
    client.create().unwrap();
    assert!(client.connect("127.0.0.1", port).await.is_err());
}

#[tokio::test]
async fn test_dropped_sender_stops_server() {
    let cfg = Config {
        port: 0,
        ..Config::default()
    };
    let mut server = HttpServer::new(&cfg, Router::new());
    let (notify, shutdown) = Shutdown::channel();
    drop(notify);

    server.run(shutdown).await.unwrap();
    assert_eq!(server.state(), ServerState::ShutDown);

    // A stopped server does not start again
    let (_notify, shutdown) = Shutdown::channel();
    assert!(server.run(shutdown).await.is_err());
}

#[tokio::test]
async fn test_init_failure_leaves_server_uninitialized() {
    let registry = PortRegistry::new();
    let mut holder = TcpSocket::with_registry(registry.clone());
    holder.create().unwrap();
    holder.bind(0).unwrap();
    let taken = holder.local_port().unwrap();

    let cfg = Config {
        port: taken,
        ..Config::default()
    };
    let mut server = HttpServer::new(&cfg, Router::new()).with_registry(registry.clone());

    assert!(server.init().is_err());
    assert_eq!(server.state(), ServerState::Uninitialized);
    assert_eq!(server.local_port(), None);

    let (_notify, shutdown) = Shutdown::channel();
    assert!(server.run(shutdown).await.is_err());

    // Freeing the port lets a retry succeed
    holder.close().unwrap();
    server.init().unwrap();
    assert_eq!(server.state(), ServerState::Listening);
    assert_eq!(server.local_port(), Some(taken));
}

#[tokio::test]
async fn test_init_is_idempotent() {
    let cfg = Config {
        port: 0,
        ..Config::default()
    };
    let mut server = HttpServer::new(&cfg, Router::new());

    server.init().unwrap();
    let port = server.local_port();
    server.init().unwrap();
    assert_eq!(server.local_port(), port);
}
