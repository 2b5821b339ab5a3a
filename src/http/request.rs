use crate::http::headers::Headers;
use crate::http::writer::serialize_request;

/// HTTP request methods.
///
/// Any token outside the standard set parses to `UNKNOWN`, which the request
/// parser rejects once the rest of the request line has been checked.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GET,
    HEAD,
    POST,
    PUT,
    DELETE,
    CONNECT,
    OPTIONS,
    TRACE,
    PATCH,
    UNKNOWN,
}

/// A parsed or outgoing HTTP request.
///
/// Parsed requests carry lower-cased header names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request target, used as the routing key (e.g. "/v0/GetQueryID")
    pub resource: String,
    /// HTTP version; only "HTTP/1.1" is served
    pub version: String,
    pub headers: Headers,
    /// Raw body bytes, exactly as received
    pub body: Vec<u8>,
}

/// Builder for constructing Request objects.
pub struct RequestBuilder {
    method: Option<Method>,
    resource: Option<String>,
    version: Option<String>,
    headers: Headers,
    body: Vec<u8>,
}

impl Method {
    /// Parses a method token (case-sensitive).
    ///
    /// ```
    /// # use evaluation::http::request::Method;
    /// assert_eq!(Method::parse("GET"), Method::GET);
    /// assert_eq!(Method::parse("get"), Method::UNKNOWN);
    /// ```
    pub fn parse(s: &str) -> Self {
        match s {
            "GET" => Method::GET,
            "HEAD" => Method::HEAD,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "CONNECT" => Method::CONNECT,
            "OPTIONS" => Method::OPTIONS,
            "TRACE" => Method::TRACE,
            "PATCH" => Method::PATCH,
            _ => Method::UNKNOWN,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::CONNECT => "CONNECT",
            Method::OPTIONS => "OPTIONS",
            Method::TRACE => "TRACE",
            Method::PATCH => "PATCH",
            Method::UNKNOWN => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            resource: None,
            version: None,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        Ok(Request {
            method: self.method.ok_or("method missing")?,
            resource: self.resource.ok_or("resource missing")?,
            version: self.version.unwrap_or_else(|| "HTTP/1.1".to_string()),
            headers: self.headers,
            body: self.body,
        })
    }
}

impl Request {
    /// A bodiless HTTP/1.1 request.
    pub fn new(method: Method, resource: impl Into<String>) -> Self {
        Self {
            method,
            resource: resource.into(),
            version: "HTTP/1.1".to_string(),
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// An HTTP/1.1 request carrying `body` as compact JSON, with
    /// `Content-Type` and `Content-Length` set.
    ///
    /// # Arguments
    ///
    /// * `method` - Request method
    /// * `resource` - Request target, e.g. "/v0/ReportMetrics"
    /// * `body` - JSON value serialized without whitespace
    ///
    /// # Example
    ///
    /// ```
    /// # use evaluation::http::request::{Method, Request};
    /// let req = Request::with_json(Method::POST, "/v0/ReportMetrics", &serde_json::json!({"n": 1}));
    /// assert_eq!(req.body, br#"{"n":1}"#);
    /// assert_eq!(req.header("content-length"), Some("7"));
    /// ```
    pub fn with_json(method: Method, resource: impl Into<String>, body: &serde_json::Value) -> Self {
        let body = body.to_string().into_bytes();
        let mut request = Self::new(method, resource);
        request.headers.insert("Content-Type", "application/json");
        request.headers.insert("Content-Length", body.len().to_string());
        request.body = body;
        request
    }

    /// Retrieves a header value by name, ignoring case.
    ///
    /// # Returns
    ///
    /// `Some(&str)` with the header value if present, `None` otherwise.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    /// Wire form: request line, headers, blank line, raw body.
    pub fn to_bytes(&self) -> Vec<u8> {
        serialize_request(self)
    }
}
