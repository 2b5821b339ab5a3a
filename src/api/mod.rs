//! The `/v0` resource table.
//!
//! Routing lives here; the handlers themselves live in [`handlers`] and the
//! outbound click reporting in [`analytics`].

pub mod analytics;
pub mod handlers;

use std::sync::Arc;

use crate::config::Config;
use crate::http::router::Router;

use analytics::AnalyticsClient;
use handlers::{
    GetAutofill, GetQueryData, GetQueryId, QueryIdCounter, ReportMetrics, ReportSearchResults,
    SubmitFeedback,
};

/// State shared by the handlers for the lifetime of one server.
#[derive(Debug, Clone, Default)]
pub struct ApiState {
    pub query_ids: Arc<QueryIdCounter>,
    pub analytics: Option<AnalyticsClient>,
}

impl ApiState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            query_ids: Arc::new(QueryIdCounter::new()),
            analytics: config.analytics_url.clone().map(AnalyticsClient::new),
        }
    }
}

/// Builds the router for every `/v0` resource.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/v0/GetAutofill", GetAutofill)
        .route("/v0/GetQueryID", GetQueryId::new(state.query_ids))
        .route("/v0/ReportSearchResults", ReportSearchResults::new(state.analytics))
        .route("/v0/SubmitFeedback", SubmitFeedback)
        .route("/v0/GetQueryData", GetQueryData)
        .route("/v0/ReportMetrics", ReportMetrics)
}
