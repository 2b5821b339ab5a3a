//! Evaluation - minimal HTTP/1.1 server on raw TCP sockets
//!
//! Core library for the socket layer, the HTTP parser and serializer,
//! the accept loop, and the `/v0` API stubs.

pub mod api;
pub mod config;
pub mod http;
pub mod server;
pub mod socket;
