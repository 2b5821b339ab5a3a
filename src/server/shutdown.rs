use tokio::sync::broadcast::{self, error::RecvError};

/// Why [`Shutdown::recv`] completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    /// A shutdown request was broadcast
    Requested,
    /// Every sender was dropped, so no request can arrive any more
    SendersDropped,
}

/// Shutdown request as seen by the accept loop.
///
/// Once `recv` has completed, every later call returns the same cause
/// immediately.
#[derive(Debug)]
pub struct Shutdown {
    cause: Option<ShutdownCause>,
    notify: broadcast::Receiver<()>,
}

impl Shutdown {
    pub fn new(notify: broadcast::Receiver<()>) -> Shutdown {
        Shutdown {
            cause: None,
            notify,
        }
    }

    /// A fresh channel: send `()` on the returned sender (or drop every
    /// clone of it) to shut down.
    pub fn channel() -> (broadcast::Sender<()>, Shutdown) {
        let (notify, receiver) = broadcast::channel(1);
        (notify, Shutdown::new(receiver))
    }

    pub fn is_shutdown(&self) -> bool {
        self.cause.is_some()
    }

    pub fn cause(&self) -> Option<ShutdownCause> {
        self.cause
    }

    /// Waits for a request or for the last sender to go away.
    pub async fn recv(&mut self) -> ShutdownCause {
        if let Some(cause) = self.cause {
            return cause;
        }

        let cause = match self.notify.recv().await {
            // A lagged receiver still saw at least one request
            Ok(()) | Err(RecvError::Lagged(_)) => ShutdownCause::Requested,
            Err(RecvError::Closed) => ShutdownCause::SendersDropped,
        };
        self.cause = Some(cause);
        cause
    }
}
