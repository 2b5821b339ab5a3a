use serde::Serialize;

use crate::http::headers::Headers;
use crate::http::writer::serialize_response;

/// HTTP status codes emitted by the server.
///
/// - `Ok` (200): Request successful
/// - `BadRequest` (400): Malformed request, content length, or body
/// - `NotFound` (404): No handler for the resource
/// - `LengthRequired` (411): Body sent without `Content-Length`
/// - `HttpVersionNotSupported` (505): Anything but HTTP/1.1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 411 Length Required
    LengthRequired,
    /// 505 HTTP Version Not Supported
    HttpVersionNotSupported,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// ```
    /// # use evaluation::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::LengthRequired.as_u16(), 411);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::LengthRequired => 411,
            StatusCode::HttpVersionNotSupported => 505,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use evaluation::http::response::StatusCode;
    /// assert_eq!(StatusCode::HttpVersionNotSupported.reason_phrase(), "HTTP Version Not Supported");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::LengthRequired => "Length Required",
            StatusCode::HttpVersionNotSupported => "HTTP Version Not Supported",
        }
    }
}

/// A complete HTTP response, either built locally or parsed off the wire.
///
/// `code` and `status` are kept as sent so that responses with codes outside
/// [`StatusCode`] still parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Defaults to "HTTP/1.1"
    pub version: String,
    pub code: u16,
    /// Reason phrase
    pub status: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

/// Body of every error response.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: &'a str,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// ```
/// # use evaluation::http::response::{ResponseBuilder, StatusCode};
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(b"{}".to_vec())
///     .build();
/// assert_eq!(response.headers.get("Content-Length"), Some("2"));
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Headers,
    body: Vec<u8>,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Builds the final Response, adding `Content-Length` unless one was set.
    pub fn build(mut self) -> Response {
        if !self.headers.contains_key("Content-Length") {
            self.headers
                .insert("Content-Length", self.body.len().to_string());
        }

        Response {
            version: "HTTP/1.1".to_string(),
            code: self.status.as_u16(),
            status: self.status.reason_phrase().to_string(),
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// A bare response line with no headers and no body.
    pub fn new(code: u16, status: impl Into<String>) -> Self {
        Self {
            version: "HTTP/1.1".to_string(),
            code,
            status: status.into(),
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// 200 OK with an empty body.
    pub fn ok() -> Self {
        ResponseBuilder::new(StatusCode::Ok).build()
    }

    /// A JSON response, pretty printed with 2-space indentation.
    ///
    /// # Arguments
    ///
    /// * `status` - Status code and reason phrase of the response
    /// * `body` - JSON value to send
    ///
    /// # Example
    ///
    /// ```
    /// # use evaluation::http::response::{Response, StatusCode};
    /// let response = Response::json(StatusCode::Ok, &serde_json::json!({"query_ID": 0}));
    /// assert_eq!(response.body, b"{\n  \"query_ID\": 0\n}");
    /// assert_eq!(response.headers.get("Content-Type"), Some("application/json"));
    /// ```
    pub fn json(status: StatusCode, body: &serde_json::Value) -> Self {
        ResponseBuilder::new(status)
            .header("Content-Type", "application/json")
            .body(format!("{body:#}").into_bytes())
            .build()
    }

    /// `{"error": <reason phrase>, "message": <message>}` with the matching
    /// status line.
    ///
    /// # Arguments
    ///
    /// * `status` - Error status; its reason phrase fills the `error` field
    /// * `message` - Human readable detail for the `message` field
    ///
    /// # Example
    ///
    /// ```
    /// # use evaluation::http::response::{Response, StatusCode};
    /// let response = Response::error(StatusCode::NotFound, "Resource (API function) not found");
    /// assert_eq!(response.code, 404);
    /// assert_eq!(response.status, "Not Found");
    /// ```
    pub fn error(status: StatusCode, message: &str) -> Self {
        let body = ErrorBody {
            error: status.reason_phrase(),
            message,
        };
        let body = serde_json::to_value(&body).unwrap_or_default();
        Self::json(status, &body)
    }

    /// Wire form: status line, headers, blank line, raw body.
    pub fn to_bytes(&self) -> Vec<u8> {
        serialize_response(self)
    }
}
