use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};
use crate::socket::TcpSocket;

/// Future returned by [`Handler::handle`].
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// Business logic bound to one resource.
///
/// A handler receives a request that already passed protocol validation and
/// must send exactly one response on `socket` before its future completes.
/// Errors are logged by the worker; they never reach the accept loop.
pub trait Handler: Send + Sync {
    fn handle<'a>(&'a self, request: &'a Request, socket: &'a mut TcpSocket) -> HandlerFuture<'a>;
}

/// Resource path to handler table with a 404 fallback.
///
/// Routing looks at the resource only, never the method.
pub struct Router {
    routes: HashMap<String, Box<dyn Handler>>,
    fallback: Box<dyn Handler>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            fallback: Box::new(NotFound),
        }
    }

    /// Binds `resource` to `handler`, replacing any earlier binding.
    pub fn route(mut self, resource: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.routes.insert(resource.into(), Box::new(handler));
        self
    }

    /// The handler for `resource`, or the not-found handler.
    pub fn handler(&self, resource: &str) -> &dyn Handler {
        match self.routes.get(resource) {
            Some(handler) => handler.as_ref(),
            None => {
                debug!(resource, "No handler for resource");
                self.fallback.as_ref()
            }
        }
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.routes.contains_key(resource)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Answers every request with 404 and the fixed error body.
pub struct NotFound;

impl Handler for NotFound {
    fn handle<'a>(&'a self, _request: &'a Request, socket: &'a mut TcpSocket) -> HandlerFuture<'a> {
        Box::pin(async move {
            let response =
                Response::error(StatusCode::NotFound, "Resource (API function) not found");
            send_response(socket, &response).await
        })
    }
}

/// Serializes `response` and writes all of it to `socket`.
pub async fn send_response(socket: &mut TcpSocket, response: &Response) -> anyhow::Result<()> {
    socket.send_all(&response.to_bytes()).await?;
    Ok(())
}
