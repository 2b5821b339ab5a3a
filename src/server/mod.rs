//! Listener lifecycle and the accept loop.

pub mod listener;
pub mod shutdown;

pub use listener::{HttpServer, ServerState};
pub use shutdown::{Shutdown, ShutdownCause};
