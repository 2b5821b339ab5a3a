//! In-process port bookkeeping.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Set of ports currently bound by sockets sharing this registry.
///
/// With `SO_REUSEADDR` the OS lets two sockets in one process bind the same
/// port. Sockets attached to the same registry check it before binding and
/// release their port on close, so that conflict is still reported.
///
/// Cloning is cheap and yields a handle to the same set.
#[derive(Debug, Clone, Default)]
pub struct PortRegistry {
    ports: Arc<Mutex<HashSet<u16>>>,
}

impl PortRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `port`. Returns `false` if another socket already holds it.
    pub fn claim(&self, port: u16) -> bool {
        let mut ports = self.ports.lock().unwrap_or_else(|e| e.into_inner());
        ports.insert(port)
    }

    /// Releases `port`. Releasing a port that was never claimed is a no-op.
    pub fn release(&self, port: u16) {
        let mut ports = self.ports.lock().unwrap_or_else(|e| e.into_inner());
        ports.remove(&port);
    }

    pub fn contains(&self, port: u16) -> bool {
        let ports = self.ports.lock().unwrap_or_else(|e| e.into_inner());
        ports.contains(&port)
    }

    pub fn len(&self) -> usize {
        self.ports.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
