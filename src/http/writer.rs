//! Wire serialization for requests and responses.
//!
//! Both message kinds share the same layout: start line, one `Name: value`
//! line per header in insertion order, a blank line, then the body bytes
//! unchanged. Every line ends in CRLF.

use crate::http::headers::Headers;
use crate::http::request::Request;
use crate::http::response::Response;

pub fn serialize_request(req: &Request) -> Vec<u8> {
    let start_line = format!("{} {} {}", req.method, req.resource, req.version);
    serialize(&start_line, &req.headers, &req.body)
}

pub fn serialize_response(resp: &Response) -> Vec<u8> {
    let start_line = format!("{} {} {}", resp.version, resp.code, resp.status);
    serialize(&start_line, &resp.headers, &resp.body)
}

fn serialize(start_line: &str, headers: &Headers, body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(start_line.len() + body.len() + 64);

    buf.extend_from_slice(start_line.as_bytes());
    buf.extend_from_slice(b"\r\n");

    for (k, v) in headers.iter() {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf.extend_from_slice(body);
    buf
}
