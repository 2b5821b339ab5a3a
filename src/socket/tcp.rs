use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, trace, warn};

use crate::socket::registry::PortRegistry;

/// Size of the buffer handed to a single read.
pub const RECV_BUFFER_SIZE: usize = 4096;

/// Which direction a timeout applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    /// Applies to each read performed by [`TcpSocket::recv_chunk`]
    Receive,
    /// Applies to each write performed by [`TcpSocket::send`]
    Send,
}

/// Outcome of a single read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// The peer sent bytes (never empty)
    Data(Bytes),
    /// Nothing arrived within the receive timeout; the peer may still send more
    TimedOut,
    /// The peer closed its side, the read failed, or the socket is not connected
    Closed,
}

enum Inner {
    Closed,
    Created(tokio::net::TcpSocket),
    Listening(TcpListener),
    Connected(TcpStream),
}

/// Owner of exactly one IPv4 stream socket, or none.
///
/// The type is move-only. `std::mem::take` moves the handle out and leaves a
/// closed socket behind. Dropping an open socket closes it.
///
/// Failures are returned and logged at `warn`; none of them panic. The caller
/// decides whether to retry or give up on the connection.
pub struct TcpSocket {
    inner: Inner,
    /// Port claimed in `registry` by a successful bind.
    port: Option<u16>,
    registry: Option<PortRegistry>,
    send_timeout_ms: u64,
    recv_timeout_ms: u64,
}

impl Default for TcpSocket {
    fn default() -> Self {
        Self {
            inner: Inner::Closed,
            port: None,
            registry: None,
            send_timeout_ms: 0,
            recv_timeout_ms: 0,
        }
    }
}

impl std::fmt::Debug for TcpSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpSocket")
            .field("state", &self.state_name())
            .field("local_port", &self.local_port())
            .field("send_timeout_ms", &self.send_timeout_ms)
            .field("recv_timeout_ms", &self.recv_timeout_ms)
            .finish()
    }
}

impl TcpSocket {
    /// Creates a closed socket. Call [`create`](Self::create) before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a closed socket whose binds are checked against `registry`.
    pub fn with_registry(registry: PortRegistry) -> Self {
        let mut socket = Self::default();
        socket.registry = Some(registry);
        socket
    }

    fn from_stream(stream: TcpStream) -> Self {
        let mut socket = Self::default();
        socket.inner = Inner::Connected(stream);
        socket
    }

    fn state_name(&self) -> &'static str {
        match self.inner {
            Inner::Closed => "closed",
            Inner::Created(_) => "created",
            Inner::Listening(_) => "listening",
            Inner::Connected(_) => "connected",
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.inner, Inner::Closed)
    }

    /// Opens a new IPv4 stream socket.
    ///
    /// An already open socket is closed first.
    pub fn create(&mut self) -> io::Result<()> {
        if self.is_open() {
            warn!(state = self.state_name(), "Re-creating open socket, closing old handle");
            let _ = self.close();
        }

        let socket = tokio::net::TcpSocket::new_v4().inspect_err(|e| {
            warn!(error = %e, "Unable to open socket");
        })?;

        #[cfg(feature = "reuseaddr")]
        if let Err(e) = socket.set_reuseaddr(true) {
            warn!(error = %e, "Unable to set SO_REUSEADDR");
        }

        self.inner = Inner::Created(socket);
        trace!("Opened socket");
        Ok(())
    }

    /// Binds to `port` on all interfaces. Port 0 picks an ephemeral port,
    /// see [`local_port`](Self::local_port).
    pub fn bind(&mut self, port: u16) -> io::Result<()> {
        let Inner::Created(socket) = &self.inner else {
            warn!(port, state = self.state_name(), "Tried to bind socket in wrong state");
            return Err(not_connected("bind requires a freshly created socket"));
        };

        if port != 0 {
            if let Some(registry) = &self.registry {
                if !registry.claim(port) {
                    warn!(port, "Unable to bind socket: port already in use in this process");
                    return Err(io::Error::new(
                        io::ErrorKind::AddrInUse,
                        format!("port {port} already in use"),
                    ));
                }
            }
        }

        let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
        if let Err(e) = socket.bind(addr) {
            warn!(port, error = %e, "Unable to bind socket");
            if port != 0 {
                if let Some(registry) = &self.registry {
                    registry.release(port);
                }
            }
            return Err(e);
        }

        let bound = socket.local_addr().map(|a| a.port()).unwrap_or(port);
        if port == 0 {
            if let Some(registry) = &self.registry {
                registry.claim(bound);
            }
        }
        self.port = Some(bound);
        debug!(port = bound, "Bound socket");
        Ok(())
    }

    /// Marks the bound socket passive with room for `backlog` pending peers.
    ///
    /// A failed listen leaves the socket closed.
    pub fn listen(&mut self, backlog: u32) -> io::Result<()> {
        match std::mem::replace(&mut self.inner, Inner::Closed) {
            Inner::Created(socket) => match socket.listen(backlog) {
                Ok(listener) => {
                    self.inner = Inner::Listening(listener);
                    debug!(port = ?self.port, backlog, "Socket listening");
                    Ok(())
                }
                Err(e) => {
                    warn!(port = ?self.port, error = %e, "Socket unable to listen");
                    self.release_port();
                    Err(e)
                }
            },
            other => {
                self.inner = other;
                warn!(state = self.state_name(), "Tried to listen on socket in wrong state");
                Err(not_connected("listen requires a bound socket"))
            }
        }
    }

    /// Waits for a peer and returns a new socket owning the connection.
    pub async fn accept(&self) -> io::Result<TcpSocket> {
        let Inner::Listening(listener) = &self.inner else {
            warn!(state = self.state_name(), "Tried to accept on socket that is not listening");
            return Err(not_connected("accept requires a listening socket"));
        };

        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(%peer, port = ?self.port, "Accepted connection");
                Ok(TcpSocket::from_stream(stream))
            }
            Err(e) => {
                warn!(port = ?self.port, error = %e, "Accept failed");
                Err(e)
            }
        }
    }

    /// Connects to a dotted IPv4 address. A failed connect leaves the
    /// socket closed.
    pub async fn connect(&mut self, ip: &str, port: u16) -> io::Result<()> {
        let addr: Ipv4Addr = ip.parse().map_err(|_| {
            warn!(ip, "Connect failed: not a valid IPv4 address");
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{ip} is not a valid address"),
            )
        })?;

        let socket = match std::mem::replace(&mut self.inner, Inner::Closed) {
            Inner::Created(socket) => socket,
            other => {
                self.inner = other;
                warn!(state = self.state_name(), "Tried to connect socket in wrong state");
                return Err(not_connected("connect requires a freshly created socket"));
            }
        };

        debug!(ip, port, "Attempting to connect");
        match socket.connect(SocketAddr::V4(SocketAddrV4::new(addr, port))).await {
            Ok(stream) => {
                self.inner = Inner::Connected(stream);
                debug!(ip, port, "Connect succeeded");
                Ok(())
            }
            Err(e) => {
                warn!(ip, port, error = %e, "Connect failed");
                self.release_port();
                Err(e)
            }
        }
    }

    /// Writes `bytes` and returns how many were written.
    ///
    /// With `full` the write is repeated until everything is sent or a write
    /// fails. Without it a single write is attempted. The caller compares the
    /// result with `bytes.len()`.
    pub async fn send(&mut self, bytes: &[u8], full: bool) -> usize {
        let timeout_ms = self.send_timeout_ms;
        let Inner::Connected(stream) = &mut self.inner else {
            warn!(state = self.state_name(), "Tried to send on socket that is not connected");
            return 0;
        };
        if bytes.is_empty() {
            return 0;
        }

        trace!(len = bytes.len(), "Sending message");
        let mut sent = 0;
        loop {
            match with_timeout(timeout_ms, stream.write(&bytes[sent..])).await {
                Ok(0) => {
                    warn!("Send failed: peer stopped accepting data");
                    break;
                }
                Ok(n) => {
                    sent += n;
                    trace!(n, sent, total = bytes.len(), "Sent bytes");
                }
                Err(e) => {
                    warn!(error = %e, "Send failed");
                    break;
                }
            }
            if sent >= bytes.len() || !full {
                break;
            }
        }

        if sent < bytes.len() {
            warn!(sent, total = bytes.len(), "Failed to send full message");
        }
        sent
    }

    /// Sends every byte of `bytes` or fails.
    pub async fn send_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let sent = self.send(bytes, true).await;
        if sent < bytes.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("sent {sent} of {} bytes", bytes.len()),
            ));
        }
        Ok(())
    }

    /// Performs exactly one read of at most [`RECV_BUFFER_SIZE`] bytes.
    pub async fn recv_chunk(&mut self) -> Received {
        let timeout_ms = self.recv_timeout_ms;
        let Inner::Connected(stream) = &mut self.inner else {
            warn!(state = self.state_name(), "Tried to receive on socket that is not connected");
            return Received::Closed;
        };

        let mut buf = BytesMut::with_capacity(RECV_BUFFER_SIZE);
        match with_timeout(timeout_ms, stream.read_buf(&mut buf)).await {
            Ok(0) => {
                trace!("Peer closed connection");
                Received::Closed
            }
            Ok(n) => {
                trace!(n, "Received bytes");
                Received::Data(buf.freeze())
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                trace!(timeout_ms, "Receive timed out");
                Received::TimedOut
            }
            Err(e) => {
                warn!(error = %e, "Receive failed");
                Received::Closed
            }
        }
    }

    /// Single read collapsed to bytes: empty on timeout, close, or failure.
    pub async fn receive(&mut self) -> Bytes {
        match self.recv_chunk().await {
            Received::Data(bytes) => bytes,
            Received::TimedOut | Received::Closed => Bytes::new(),
        }
    }

    /// Sets the receive or send timeout in milliseconds (0 disables it).
    ///
    /// Setting the value already in effect succeeds without doing anything.
    pub fn set_timeout(&mut self, kind: TimeoutKind, timeout_ms: u64) -> io::Result<()> {
        if !self.is_open() {
            warn!(?kind, "Tried to set timeout on closed socket");
            return Err(not_connected("socket is closed"));
        }

        let slot = match kind {
            TimeoutKind::Receive => &mut self.recv_timeout_ms,
            TimeoutKind::Send => &mut self.send_timeout_ms,
        };
        if *slot == timeout_ms {
            debug!(?kind, timeout_ms, "Socket timeout already set");
            return Ok(());
        }
        *slot = timeout_ms;
        debug!(?kind, timeout_ms, "Set socket timeout");
        Ok(())
    }

    pub fn timeout(&self, kind: TimeoutKind) -> u64 {
        match kind {
            TimeoutKind::Receive => self.recv_timeout_ms,
            TimeoutKind::Send => self.send_timeout_ms,
        }
    }

    /// Releases the handle. Closing a closed socket is reported as an error.
    pub fn close(&mut self) -> io::Result<()> {
        if !self.is_open() {
            warn!("Tried to close closed socket");
            return Err(not_connected("socket already closed"));
        }

        let port = self.local_port();
        self.release_port();
        self.inner = Inner::Closed;
        self.send_timeout_ms = 0;
        self.recv_timeout_ms = 0;
        trace!(port = ?port, "Closed socket");
        Ok(())
    }

    /// The local port, if the socket is bound or connected.
    pub fn local_port(&self) -> Option<u16> {
        let addr = match &self.inner {
            Inner::Closed => return None,
            Inner::Created(socket) => socket.local_addr(),
            Inner::Listening(listener) => listener.local_addr(),
            Inner::Connected(stream) => stream.local_addr(),
        };
        match addr {
            Ok(addr) if addr.port() != 0 => Some(addr.port()),
            _ => self.port,
        }
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        match &self.inner {
            Inner::Connected(stream) => stream.peer_addr().ok(),
            _ => None,
        }
    }

    fn release_port(&mut self) {
        if let (Some(port), Some(registry)) = (self.port.take(), &self.registry) {
            debug!(port, "Releasing port from registry");
            registry.release(port);
        }
    }
}

impl Drop for TcpSocket {
    fn drop(&mut self) {
        if self.is_open() {
            let _ = self.close();
        }
    }
}

/// Resolves `host` to the dotted form of its first IPv4 address.
pub async fn resolve_ipv4(host: &str, port: u16) -> io::Result<String> {
    let addrs = tokio::net::lookup_host((host, port)).await.inspect_err(|e| {
        warn!(host, error = %e, "Address lookup failed");
    })?;

    addrs
        .into_iter()
        .find(SocketAddr::is_ipv4)
        .map(|addr| addr.ip().to_string())
        .ok_or_else(|| {
            warn!(host, "Address lookup returned no IPv4 address");
            io::Error::new(io::ErrorKind::NotFound, format!("no IPv4 address for {host}"))
        })
}

fn not_connected(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, msg.to_string())
}

async fn with_timeout<T>(
    timeout_ms: u64,
    fut: impl Future<Output = io::Result<T>>,
) -> io::Result<T> {
    if timeout_ms == 0 {
        return fut.await;
    }
    match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("no progress within {timeout_ms} ms"),
        )),
    }
}
