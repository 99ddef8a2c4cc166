pub mod graphql;
pub mod rest;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::BackendConfig;
use crate::models::{Event, EventDraft};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Server responded with status: {0}")]
    Status(u16),
    /// Application error reported inside a GraphQL response body.
    #[error("{0}")]
    Protocol(String),
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("server returned no event")]
    MissingEvent,
}

/// Result of an extraction request. `Ok(None)` is the "nothing found" outcome,
/// not a failure.
pub type Extracted = Result<Option<Event>, TransportError>;

/// One backend protocol. Implementations never leak wire field names past
/// this boundary.
#[async_trait]
pub trait TransportAdapter: Send + Sync {
    fn kind(&self) -> &'static str;
    async fn fetch_extracted_event(&self, html: &str, url: &str) -> Extracted;
    async fn submit_event(&self, draft: &EventDraft) -> Result<Event, TransportError>;
}

pub fn connect(backend: &BackendConfig) -> Arc<dyn TransportAdapter> {
    match backend {
        BackendConfig::Rest {
            endpoint,
            html_limit,
        } => Arc::new(rest::RestAdapter::new(endpoint.clone(), *html_limit)),
        BackendConfig::Graphql {
            endpoint,
            html_limit,
        } => Arc::new(graphql::GraphqlAdapter::new(endpoint.clone(), *html_limit)),
    }
}

/// Leading `limit` characters of `html`, or all of it when unlimited.
pub(crate) fn truncate_html(html: &str, limit: Option<usize>) -> &str {
    match limit {
        Some(limit) => match html.char_indices().nth(limit) {
            Some((idx, _)) => &html[..idx],
            None => html,
        },
        None => html,
    }
}

/// JSON has no NaN; mirror `JSON.stringify` and send `null`.
pub(crate) fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
