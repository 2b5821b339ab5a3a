use tracing::{debug, info, warn};

use crate::http::parser::read_request;
use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};
use crate::http::router::{Router, send_response};
use crate::socket::{TcpSocket, TimeoutKind};

/// Receive timeout applied to accepted connections unless configured.
pub const DEFAULT_RECV_TIMEOUT_MS: u64 = 10;

/// Why a parsed request was refused before dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: StatusCode,
    pub message: String,
}

impl Rejection {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn into_response(self) -> Response {
        Response::error(self.status, &self.message)
    }
}

/// Drives one accepted connection through a single exchange:
/// read, validate, dispatch, respond. The socket is closed when the worker
/// is dropped, whatever the outcome.
pub struct HttpWorker<'r> {
    socket: TcpSocket,
    router: &'r Router,
    recv_timeout_ms: u64,
}

impl<'r> HttpWorker<'r> {
    pub fn new(socket: TcpSocket, router: &'r Router, recv_timeout_ms: u64) -> Self {
        Self {
            socket,
            router,
            recv_timeout_ms,
        }
    }

    pub async fn run(mut self) {
        // Bounded so an idle client cannot stall the accept loop
        if let Err(e) = self
            .socket
            .set_timeout(TimeoutKind::Receive, self.recv_timeout_ms)
        {
            warn!(error = %e, "Unable to set receive timeout, dropping connection");
            return;
        }

        let request = match read_request(&mut self.socket).await {
            Ok(request) => request,
            Err(e) => {
                info!(error = %e, "Rejecting malformed request");
                self.reply(Response::error(StatusCode::BadRequest, "Error parsing request."))
                    .await;
                return;
            }
        };

        debug!(
            method = %request.method,
            resource = %request.resource,
            body_len = request.body.len(),
            "Parsed request"
        );

        if let Err(rejection) = validate(&request) {
            info!(
                resource = %request.resource,
                status = rejection.status.as_u16(),
                message = %rejection.message,
                "Rejecting request"
            );
            self.reply(rejection.into_response()).await;
            return;
        }

        let handler = self.router.handler(&request.resource);
        if let Err(e) = handler.handle(&request, &mut self.socket).await {
            warn!(resource = %request.resource, error = %e, "Handler failed");
        }
    }

    async fn reply(&mut self, response: Response) {
        if let Err(e) = send_response(&mut self.socket, &response).await {
            warn!(code = response.code, error = %e, "Unable to send response");
        }
    }
}

/// Protocol checks applied before dispatch: the version must be HTTP/1.1,
/// and a body must come with a `content-length` matching its size.
pub fn validate(request: &Request) -> Result<(), Rejection> {
    if request.version != "HTTP/1.1" {
        return Err(Rejection::new(
            StatusCode::HttpVersionNotSupported,
            "HTTP/1.1 Must be Used.",
        ));
    }

    if request.body.is_empty() {
        return Ok(());
    }

    let Some(declared) = request.header("content-length") else {
        return Err(Rejection::new(
            StatusCode::LengthRequired,
            "Content-Length header must be specified when sending a request body",
        ));
    };

    let Ok(length) = declared.parse::<usize>() else {
        return Err(Rejection::new(
            StatusCode::BadRequest,
            format!("Specified content length ({declared}) is invalid"),
        ));
    };

    if length != request.body.len() {
        return Err(Rejection::new(
            StatusCode::BadRequest,
            format!(
                "Provided content length {length} does not match actual content length {}",
                request.body.len()
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::Method;

    fn post(body: &[u8]) -> Request {
        let mut request = Request::new(Method::POST, "/v0/SubmitFeedback");
        request.body = body.to_vec();
        request
    }

    #[test]
    fn accepts_bodiless_request() {
        assert_eq!(validate(&Request::new(Method::GET, "/v0/GetQueryID")), Ok(()));
    }

    #[test]
    fn rejects_other_versions() {
        let mut request = Request::new(Method::GET, "/v0/GetQueryID");
        request.version = "HTTP/1.0".to_string();

        let rejection = validate(&request).unwrap_err();
        assert_eq!(rejection.status, StatusCode::HttpVersionNotSupported);
        assert_eq!(rejection.message, "HTTP/1.1 Must be Used.");
    }

    #[test]
    fn body_needs_content_length() {
        let rejection = validate(&post(b"{}")).unwrap_err();
        assert_eq!(rejection.status, StatusCode::LengthRequired);
    }

    #[test]
    fn content_length_must_be_numeric() {
        let mut request = post(b"{}");
        request.headers.insert("content-length", "ABCDEFG");

        let rejection = validate(&request).unwrap_err();
        assert_eq!(rejection.status, StatusCode::BadRequest);
        assert_eq!(rejection.message, "Specified content length (ABCDEFG) is invalid");
    }

    #[test]
    fn negative_content_length_is_invalid() {
        let mut request = post(b"{}");
        request.headers.insert("content-length", "-2");

        let rejection = validate(&request).unwrap_err();
        assert_eq!(rejection.message, "Specified content length (-2) is invalid");
    }

    #[test]
    fn content_length_must_match_body() {
        let mut request = post(b"{}");
        request.headers.insert("content-length", "69");

        let rejection = validate(&request).unwrap_err();
        assert_eq!(rejection.status, StatusCode::BadRequest);
        assert_eq!(
            rejection.message,
            "Provided content length 69 does not match actual content length 2"
        );
    }

    #[test]
    fn matching_content_length_passes() {
        let mut request = post(b"{}");
        request.headers.insert("content-length", "2");
        assert_eq!(validate(&request), Ok(()));
    }
}
