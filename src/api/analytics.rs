//! Forwarding of clicked search results to the analytics service.
//!
//! Each report is sent as its own HTTP/1.1 POST over a fresh connection.
//! Forwarding is best effort: failures are logged and never reach the
//! client whose request triggered them.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::http::client::send_request;
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::socket::resolve_ipv4;

/// Receive timeout for the analytics service's reply.
const RESPONSE_TIMEOUT_MS: u64 = 1000;

/// One clicked result, as sent to the analytics service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClickReport {
    #[serde(rename = "query_ID")]
    pub query_id: u64,
    pub raw_query: String,
    pub clicked_link: String,
    pub query_timestamp: String,
}

/// Client for the analytics service at a fixed URL.
#[derive(Debug, Clone)]
pub struct AnalyticsClient {
    url: Url,
}

impl AnalyticsClient {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Builds the POST carrying `report`, addressed to the URL's path with
    /// a matching `Host` header.
    pub fn build_request(&self, report: &ClickReport) -> Result<Request> {
        let body = serde_json::to_value(report).context("Unable to encode click report")?;

        let path = match self.url.path() {
            "" => "/",
            path => path,
        };
        let mut request = Request::with_json(Method::POST, path, &body);

        let host = self.url.host_str().context("Analytics URL missing host")?;
        let host_value = match self.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        request.headers.insert("Host", host_value);
        request.headers.insert("Connection", "close");
        Ok(request)
    }

    /// Sends `report` and returns the service's response.
    pub async fn forward(&self, report: &ClickReport) -> Result<Response> {
        let host = self.url.host_str().context("Analytics URL missing host")?;
        let port = self
            .url
            .port_or_known_default()
            .context("Analytics URL missing port")?;
        let ip = resolve_ipv4(host, port)
            .await
            .with_context(|| format!("Unable to resolve {host}"))?;

        let request = self.build_request(report)?;
        debug!(ip, port, query_id = report.query_id, "Forwarding click report");
        send_request(&ip, port, &request, RESPONSE_TIMEOUT_MS).await
    }

    /// Forwards `report` on a detached task.
    pub fn spawn_forward(&self, report: ClickReport) {
        let client = self.clone();
        tokio::spawn(async move {
            match client.forward(&report).await {
                Ok(response) if response.code == 200 => {
                    info!(query_id = report.query_id, "Click report forwarded");
                }
                Ok(response) => {
                    warn!(
                        query_id = report.query_id,
                        code = response.code,
                        status = %response.status,
                        "Analytics service rejected click report"
                    );
                }
                Err(e) => {
                    warn!(query_id = report.query_id, error = %e, "Unable to forward click report");
                }
            }
        });
    }
}
