//! One-shot outbound requests.

use anyhow::Context;
use tracing::debug;

use crate::http::parser::read_response;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::socket::{TcpSocket, TimeoutKind};

/// Connects to `ip:port`, sends `request`, and parses a single response.
///
/// The response body runs until the peer closes or no data arrives for
/// `recv_timeout_ms`, so a server that keeps the connection open costs one
/// timeout per call.
pub async fn send_request(
    ip: &str,
    port: u16,
    request: &Request,
    recv_timeout_ms: u64,
) -> anyhow::Result<Response> {
    let mut socket = TcpSocket::new();
    socket.create().context("Unable to open socket")?;
    socket
        .connect(ip, port)
        .await
        .with_context(|| format!("Unable to connect to {ip}:{port}"))?;
    socket.set_timeout(TimeoutKind::Receive, recv_timeout_ms)?;

    socket
        .send_all(&request.to_bytes())
        .await
        .context("Unable to send request")?;
    debug!(ip, port, resource = %request.resource, "Request sent");

    let response = read_response(&mut socket)
        .await
        .context("Unable to parse response")?;
    debug!(ip, port, code = response.code, "Response received");
    Ok(response)
}
