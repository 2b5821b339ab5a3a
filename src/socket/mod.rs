//! Raw TCP transport.
//!
//! This module wraps the OS stream socket in a small, state-tracking type and
//! layers an incremental tokenizer on top of it.
//!
//! - **`tcp`**: [`TcpSocket`], a move-only owner of one stream socket
//!   (create / bind / listen / accept / connect / send / receive / close)
//! - **`stream`**: [`SocketStream`], a pull-based word/line reader over a
//!   borrowed socket
//! - **`registry`**: [`PortRegistry`], in-process port bookkeeping used when
//!   `SO_REUSEADDR` would otherwise let two sockets share a port
//!
//! # Socket lifecycle
//!
//! ```text
//!   Closed ──create──▶ Created ──bind──▶ Created(bound) ──listen──▶ Listening
//!                         │                                          │
//!                         └──connect──▶ Connected ◀──────accept──────┘
//! ```
//!
//! Any state returns to `Closed` through [`TcpSocket::close`] or drop.

pub mod registry;
pub mod stream;
pub mod tcp;

pub use registry::PortRegistry;
pub use stream::{EndOfInput, SocketStream};
pub use tcp::{RECV_BUFFER_SIZE, Received, TcpSocket, TimeoutKind, resolve_ipv4};
