use std::io;
use std::time::Duration;

use anyhow::{Context, bail};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::http::router::Router;
use crate::http::worker::HttpWorker;
use crate::server::shutdown::{Shutdown, ShutdownCause};
use crate::socket::{PortRegistry, TcpSocket};

/// First pause after a failed accept.
const ACCEPT_BACKOFF_START: Duration = Duration::from_millis(10);
/// Longest pause between accept attempts.
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Lifecycle of an [`HttpServer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// No listener yet, or listener setup failed
    Uninitialized,
    /// Listener bound and accepting
    Listening,
    /// Shutdown observed; the listener is closed
    ShutDown,
}

/// Single-threaded HTTP server.
///
/// Connections are served one at a time: each accepted connection is read,
/// validated, dispatched and answered before the next accept.
pub struct HttpServer {
    port: u16,
    backlog: u32,
    recv_timeout_ms: u64,
    listener: TcpSocket,
    router: Router,
    state: ServerState,
}

impl HttpServer {
    pub fn new(config: &Config, router: Router) -> Self {
        Self {
            port: config.port,
            backlog: config.backlog,
            recv_timeout_ms: config.recv_timeout_ms,
            listener: TcpSocket::new(),
            router,
            state: ServerState::Uninitialized,
        }
    }

    /// Checks the listener's bind against `registry`. Must be called
    /// before [`init`](Self::init).
    pub fn with_registry(mut self, registry: PortRegistry) -> Self {
        self.listener = TcpSocket::with_registry(registry);
        self
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Port the listener is bound to, once initialized.
    pub fn local_port(&self) -> Option<u16> {
        self.listener.local_port()
    }

    /// Creates, binds and starts the listener. Any failure leaves the server
    /// uninitialized with the listener closed.
    pub fn init(&mut self) -> io::Result<()> {
        if self.state == ServerState::Listening {
            return Ok(());
        }

        info!(port = self.port, backlog = self.backlog, "Setting up HTTP server");
        if let Err(e) = self.open_listener() {
            error!(port = self.port, error = %e, "Unable to set up listener");
            if self.listener.is_open() {
                let _ = self.listener.close();
            }
            return Err(e);
        }

        self.state = ServerState::Listening;
        Ok(())
    }

    fn open_listener(&mut self) -> io::Result<()> {
        self.listener.create()?;
        self.listener.bind(self.port)?;
        self.listener.listen(self.backlog)
    }

    /// Serves connections until `shutdown` completes.
    ///
    /// Initializes the listener first if needed. A pending shutdown wins
    /// over a pending connection. Accept failures are logged and skipped;
    /// listener setup failure is returned.
    pub async fn run(&mut self, mut shutdown: Shutdown) -> anyhow::Result<()> {
        if self.state == ServerState::ShutDown {
            bail!("server already shut down");
        }
        self.init().context("Unable to start HTTP server")?;
        info!(port = ?self.local_port(), "Accepting connections");

        let listener = &self.listener;
        let router = &self.router;
        let recv_timeout_ms = self.recv_timeout_ms;

        let mut backoff = AcceptBackoff::new();
        loop {
            tokio::select! {
                biased;

                cause = shutdown.recv() => {
                    match cause {
                        ShutdownCause::Requested => info!("Shutdown signal received"),
                        ShutdownCause::SendersDropped => {
                            info!("Shutdown channel closed, stopping")
                        }
                    }
                    break;
                }

                accepted = listener.accept() => match accepted {
                    Ok(socket) => {
                        backoff.reset();
                        HttpWorker::new(socket, router, recv_timeout_ms).run().await;
                    }
                    Err(e) => {
                        let delay = backoff.next_delay();
                        warn!(
                            error = %e,
                            retry_in_ms = delay.as_millis() as u64,
                            "Accept failed, waiting for next connection"
                        );
                        // Shutdown still wins while backing off
                        tokio::select! {
                            biased;
                            _ = shutdown.recv() => {
                                info!("Shutdown signal received");
                                break;
                            }
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                },
            }
        }

        let _ = self.listener.close();
        self.state = ServerState::ShutDown;
        info!("HTTP server stopped");
        Ok(())
    }
}

/// Doubling pause between failed accepts, so a persistent error such as
/// running out of descriptors does not spin the loop.
#[derive(Debug)]
struct AcceptBackoff {
    next: Duration,
}

impl AcceptBackoff {
    fn new() -> Self {
        Self {
            next: ACCEPT_BACKOFF_START,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(ACCEPT_BACKOFF_MAX);
        delay
    }

    fn reset(&mut self) {
        self.next = ACCEPT_BACKOFF_START;
    }
}
