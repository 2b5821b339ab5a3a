//! Stub business logic for the `/v0` API.
//!
//! Every handler answers with canned JSON. Bodies are parsed strictly:
//! a body that does not match the expected shape gets a 400 from the handler
//! itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info};

use crate::api::analytics::{AnalyticsClient, ClickReport};
use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};
use crate::http::router::{Handler, HandlerFuture, send_response};
use crate::socket::TcpSocket;

const SUGGESTIONS: [&str; 3] = [
    "how do i make a website",
    "how do i make bread",
    "how do i make friends",
];

/// Source of query IDs, unique for the lifetime of one counter.
#[derive(Debug, Default)]
pub struct QueryIdCounter {
    next: AtomicU64,
}

impl QueryIdCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts counting at `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// `GET /v0/GetAutofill`
pub struct GetAutofill;

impl Handler for GetAutofill {
    fn handle<'a>(&'a self, request: &'a Request, socket: &'a mut TcpSocket) -> HandlerFuture<'a> {
        Box::pin(async move {
            let response = autofill(request);
            send_response(socket, &response).await
        })
    }
}

fn autofill(request: &Request) -> Response {
    let wanted = match request.header("num-suggestions") {
        None => SUGGESTIONS.len(),
        Some(n) => match n.trim().parse::<usize>() {
            Ok(n) => n,
            Err(_) => {
                return Response::error(
                    StatusCode::BadRequest,
                    &format!("Num-Suggestions ({n}) is not a number"),
                );
            }
        },
    };
    debug!(
        partial_query = request.header("partial-query").unwrap_or_default(),
        wanted,
        "Autofill requested"
    );

    let suggestions: Vec<&str> = SUGGESTIONS.iter().copied().take(wanted).collect();
    Response::json(StatusCode::Ok, &json!({ "suggestions": suggestions }))
}

/// `GET /v0/GetQueryID`
pub struct GetQueryId {
    counter: Arc<QueryIdCounter>,
}

impl GetQueryId {
    pub fn new(counter: Arc<QueryIdCounter>) -> Self {
        Self { counter }
    }
}

impl Handler for GetQueryId {
    fn handle<'a>(&'a self, _request: &'a Request, socket: &'a mut TcpSocket) -> HandlerFuture<'a> {
        Box::pin(async move {
            let id = self.counter.next_id();
            debug!(query_id = id, "Issued query ID");
            send_response(socket, &Response::json(StatusCode::Ok, &json!({ "query_ID": id }))).await
        })
    }
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(rename = "query_ID")]
    query_id: u64,
    raw_query: String,
    results: Vec<String>,
    /// Index into `results`
    clicked: usize,
    query_timestamp: String,
}

/// `POST /v0/ReportSearchResults`
///
/// Answers first, then hands the click to the analytics service (if one
/// is configured) on a detached task.
pub struct ReportSearchResults {
    analytics: Option<AnalyticsClient>,
}

impl ReportSearchResults {
    pub fn new(analytics: Option<AnalyticsClient>) -> Self {
        Self { analytics }
    }
}

impl Handler for ReportSearchResults {
    fn handle<'a>(&'a self, request: &'a Request, socket: &'a mut TcpSocket) -> HandlerFuture<'a> {
        Box::pin(async move {
            let results: SearchResults = match parse_body(request) {
                Ok(results) => results,
                Err(response) => return send_response(socket, &response).await,
            };

            let Some(link) = results.results.get(results.clicked).cloned() else {
                let message = format!(
                    "Clicked index {} is out of range for {} results",
                    results.clicked,
                    results.results.len()
                );
                return send_response(socket, &Response::error(StatusCode::BadRequest, &message))
                    .await;
            };

            send_response(socket, &Response::ok()).await?;

            let report = ClickReport {
                query_id: results.query_id,
                raw_query: results.raw_query,
                clicked_link: link,
                query_timestamp: results.query_timestamp,
            };
            match &self.analytics {
                Some(analytics) => analytics.spawn_forward(report),
                None => debug!(query_id = report.query_id, "No analytics service, click dropped"),
            }
            Ok(())
        })
    }
}

#[derive(Debug, Deserialize)]
struct Feedback {
    label: String,
    title: String,
    text: String,
}

/// `POST /v0/SubmitFeedback`
pub struct SubmitFeedback;

impl Handler for SubmitFeedback {
    fn handle<'a>(&'a self, request: &'a Request, socket: &'a mut TcpSocket) -> HandlerFuture<'a> {
        Box::pin(async move {
            let response = match parse_body::<Feedback>(request) {
                Ok(feedback) => {
                    info!(
                        label = %feedback.label,
                        title = %feedback.title,
                        text_len = feedback.text.len(),
                        "Feedback received"
                    );
                    Response::ok()
                }
                Err(response) => response,
            };
            send_response(socket, &response).await
        })
    }
}

/// `GET /v0/GetQueryData`
pub struct GetQueryData;

impl Handler for GetQueryData {
    fn handle<'a>(&'a self, _request: &'a Request, socket: &'a mut TcpSocket) -> HandlerFuture<'a> {
        Box::pin(async move {
            send_response(socket, &Response::json(StatusCode::Ok, &json!({ "queries": [] }))).await
        })
    }
}

/// `POST /v0/ReportMetrics`
pub struct ReportMetrics;

impl Handler for ReportMetrics {
    fn handle<'a>(&'a self, request: &'a Request, socket: &'a mut TcpSocket) -> HandlerFuture<'a> {
        Box::pin(async move {
            let response = match parse_body::<serde_json::Map<String, serde_json::Value>>(request) {
                Ok(metrics) => {
                    info!(fields = metrics.len(), "Metrics received");
                    Response::ok()
                }
                Err(response) => response,
            };
            send_response(socket, &response).await
        })
    }
}

/// Decodes the JSON body or produces the 400 to send instead.
fn parse_body<T: DeserializeOwned>(request: &Request) -> Result<T, Response> {
    serde_json::from_slice(&request.body).map_err(|e| {
        debug!(resource = %request.resource, error = %e, "Malformed JSON body");
        Response::error(StatusCode::BadRequest, "Malformed JSON body")
    })
}
