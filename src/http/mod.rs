//! HTTP/1.1 protocol implementation.
//!
//! This module implements a minimal HTTP/1.1 server on top of [`crate::socket`].
//! One connection carries exactly one request and one response.
//!
//! # Architecture
//!
//! - **`headers`**: insertion-ordered, case-insensitive header list
//! - **`request`** / **`response`**: message model and constructors
//! - **`parser`**: builds messages from a [`SocketStream`](crate::socket::SocketStream)
//! - **`writer`**: serializes messages to their wire form
//! - **`router`**: the [`Handler`](router::Handler) interface and the resource table
//! - **`worker`**: the per-connection state machine
//! - **`client`**: one-shot outbound requests
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌──────────────────┐
//!        │     Reading      │ ← parse one request (bounded receive timeout)
//!        └──────┬───────────┘
//!               │ parse error → 400 ─────────────┐
//!               ▼                                │
//!        ┌──────────────────┐                    │
//!        │    Validating    │ ← version, content-length
//!        └──────┬───────────┘                    │
//!               │ rejected → 505 / 411 / 400 ────┤
//!               ▼                                │
//!        ┌──────────────────┐                    │
//!        │   Dispatching    │ ← handler or 404   │
//!        └──────┬───────────┘                    │
//!               ▼                                ▼
//!        ┌──────────────────────────────────────────┐
//!        │                 Closed                   │
//!        └──────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use evaluation::http::{HttpWorker, Router};
//! use evaluation::socket::TcpSocket;
//!
//! let mut listener = TcpSocket::new();
//! listener.create()?;
//! listener.bind(8080)?;
//! listener.listen(10)?;
//!
//! let router = Router::new();
//! loop {
//!     let socket = listener.accept().await?;
//!     HttpWorker::new(socket, &router, 10).run().await;
//! }
//! ```

pub mod client;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod router;
pub mod worker;
pub mod writer;

pub use headers::Headers;
pub use parser::{ParseError, read_request, read_response};
pub use request::{Method, Request};
pub use response::{Response, StatusCode};
pub use router::{Handler, HandlerFuture, Router};
pub use worker::HttpWorker;
