use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{finite, truncate_html, Extracted, TransportAdapter, TransportError};
use crate::models::{id_from_value, number_from_value, Event, EventDraft};
use crate::timestamps::{WireFormat, WireTimestamp};

pub const DEFAULT_ENDPOINT: &str = "https://67e13a6b58cc6bf78524e238.mockapi.io/api/v1/Event";
pub const DEFAULT_HTML_LIMIT: usize = 200;

/// Plain JSON CRUD backend: `POST` creates a record from page markup,
/// `PUT` writes the edited draft back.
pub struct RestAdapter {
    endpoint: String,
    html_limit: Option<usize>,
    client: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest<'a> {
    raw_html: &'a str,
    url: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    title: &'a str,
    provider: &'a str,
    summary: &'a str,
    price_amount: Option<f64>,
    active_time_range_lower: Option<WireTimestamp>,
    active_time_range_upper: Option<WireTimestamp>,
    description: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RestEvent {
    id: Option<Value>,
    title: Option<String>,
    provider: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    price_amount: Option<Value>,
    active_time_range_lower: Option<Value>,
    active_time_range_upper: Option<Value>,
    raw_html: Option<String>,
    url: Option<String>,
}

impl RestEvent {
    fn into_event(self) -> Event {
        let instant = |value: Option<Value>| {
            value
                .as_ref()
                .and_then(WireTimestamp::from_value)
                .and_then(|wire| wire.to_instant())
        };
        Event {
            id: id_from_value(self.id.as_ref()),
            title: self.title.unwrap_or_default(),
            provider: self.provider.unwrap_or_default(),
            summary: self.summary.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            price_amount: number_from_value(self.price_amount.as_ref()),
            active_time_range_lower: instant(self.active_time_range_lower),
            active_time_range_upper: instant(self.active_time_range_upper),
            raw_html: self.raw_html,
            url: self.url,
        }
    }
}

impl RestAdapter {
    pub fn new(endpoint: impl Into<String>, html_limit: Option<usize>) -> Self {
        Self {
            endpoint: endpoint.into(),
            html_limit,
            client: Client::new(),
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(StatusCode, String), TransportError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(endpoint = %self.endpoint, %status, bytes = body.len(), "rest response");
        Ok((status, body))
    }
}

#[async_trait]
impl TransportAdapter for RestAdapter {
    fn kind(&self) -> &'static str {
        "rest"
    }

    async fn fetch_extracted_event(&self, html: &str, url: &str) -> Extracted {
        let payload = CreateRequest {
            raw_html: truncate_html(html, self.html_limit),
            url,
        };
        let (status, body) = self
            .send(self.client.post(&self.endpoint).json(&payload))
            .await?;
        interpret_fetch(status, &body)
    }

    async fn submit_event(&self, draft: &EventDraft) -> Result<Event, TransportError> {
        let payload = update_payload(draft);
        let (status, body) = self
            .send(self.client.put(&self.endpoint).json(&payload))
            .await?;
        interpret_submit(status, &body)
    }
}

fn update_payload(draft: &EventDraft) -> UpdateRequest<'_> {
    let wire = |instant| WireTimestamp::encode(instant, WireFormat::UnixSeconds);
    UpdateRequest {
        title: &draft.title,
        provider: &draft.provider,
        summary: &draft.summary,
        price_amount: finite(draft.price_amount),
        active_time_range_lower: draft.active_time_range_lower.map(wire),
        active_time_range_upper: draft.active_time_range_upper.map(wire),
        description: &draft.description,
    }
}

fn parse_body(status: StatusCode, body: &str) -> Result<Option<RestEvent>, TransportError> {
    if !status.is_success() {
        return Err(TransportError::Status(status.as_u16()));
    }
    let value: Value = serde_json::from_str(body)?;
    match value {
        Value::Object(_) => Ok(Some(serde_json::from_value(value)?)),
        _ => Ok(None),
    }
}

/// A body without an `id` means the server found nothing worth recording.
pub fn interpret_fetch(status: StatusCode, body: &str) -> Extracted {
    Ok(parse_body(status, body)?
        .map(RestEvent::into_event)
        .filter(Event::has_id))
}

pub fn interpret_submit(status: StatusCode, body: &str) -> Result<Event, TransportError> {
    parse_body(status, body)?
        .map(RestEvent::into_event)
        .ok_or(TransportError::MissingEvent)
}
