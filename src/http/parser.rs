use std::fmt;

use crate::http::headers::Headers;
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::socket::{SocketStream, TcpSocket};

/// Why a message could not be parsed. Any of these means "no message":
/// partial requests are never returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// One of the three start-line tokens is missing (including nothing
    /// received at all)
    EmptyStartLine,
    /// The start-line tokens span more than one line
    MultiLineStartLine,
    /// Non-whitespace after the third request-line token
    TrailingGarbage(String),
    /// Method token outside the known set
    UnknownMethod(String),
    /// Status code token is not a number
    InvalidStatusCode(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::EmptyStartLine => write!(f, "incomplete start line"),
            ParseError::MultiLineStartLine => write!(f, "start line spans multiple lines"),
            ParseError::TrailingGarbage(rest) => {
                write!(f, "unexpected data after request line: {rest:?}")
            }
            ParseError::UnknownMethod(method) => write!(f, "unknown method {method:?}"),
            ParseError::InvalidStatusCode(code) => write!(f, "invalid status code {code:?}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Reads one request from `socket`.
pub async fn read_request(socket: &mut TcpSocket) -> Result<Request, ParseError> {
    let mut stream = SocketStream::new(socket);
    parse_request(&mut stream).await
}

/// Reads one response from `socket`.
pub async fn read_response(socket: &mut TcpSocket) -> Result<Response, ParseError> {
    let mut stream = SocketStream::new(socket);
    parse_response(&mut stream).await
}

pub async fn parse_request(stream: &mut SocketStream<'_>) -> Result<Request, ParseError> {
    // Request line
    let method = stream.next_word().await;
    let resource = stream.next_word().await;
    let version = stream.next_word().await;

    if method.is_empty() || resource.is_empty() || version.is_empty() {
        return Err(ParseError::EmptyStartLine);
    }
    if stream.passed_buffer().contains(&b'\n') {
        return Err(ParseError::MultiLineStartLine);
    }

    let parsed_method = Method::parse(&method);

    let rest = stream.next_line(false).await;
    if rest.chars().any(|c| !c.is_whitespace()) {
        return Err(ParseError::TrailingGarbage(rest.trim().to_string()));
    }
    if parsed_method == Method::UNKNOWN {
        return Err(ParseError::UnknownMethod(method));
    }

    let headers = parse_headers(stream).await;
    let body = stream.remaining().await;

    Ok(Request {
        method: parsed_method,
        resource,
        version,
        headers,
        body,
    })
}

pub async fn parse_response(stream: &mut SocketStream<'_>) -> Result<Response, ParseError> {
    // Status line
    let version = stream.next_word().await;
    let code = stream.next_word().await;

    if version.is_empty() || code.is_empty() {
        return Err(ParseError::EmptyStartLine);
    }
    if stream.passed_buffer().contains(&b'\n') {
        return Err(ParseError::MultiLineStartLine);
    }

    let code = code
        .parse::<u16>()
        .map_err(|_| ParseError::InvalidStatusCode(code))?;
    let status = stream.next_line(true).await;

    let headers = parse_headers(stream).await;
    let body = stream.remaining().await;

    Ok(Response {
        version,
        code,
        status,
        headers,
        body,
    })
}

/// Reads `Name: value` lines until a blank line, a line without `:`, or the
/// end of input. The line that ends the section is consumed, leaving the
/// cursor on the first body byte.
///
/// Names are lower-cased and values lose leading whitespace. A repeated
/// name keeps the last value.
async fn parse_headers(stream: &mut SocketStream<'_>) -> Headers {
    let mut headers = Headers::new();

    loop {
        let line = stream.next_line(false).await;
        if line.is_empty() {
            break;
        }

        let Some((key, value)) = line.split_once(':') else {
            break;
        };
        headers.insert(key.to_ascii_lowercase(), value.trim_start());
    }

    headers
}
