use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{finite, truncate_html, Extracted, TransportAdapter, TransportError};
use crate::models::{id_from_value, number_from_value, Event, EventDraft};
use crate::timestamps::{WireFormat, WireTimestamp};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:4000/graphql";

const CREATE_FIELD: &str = "createEvent";

const CREATE_EVENT: &str = r#"mutation CreateEvent($input: CreateEventInput!) {
  createEvent(input: $input) {
    id
    title
    provider
    summary
    description
    priceAmount
    url
    activeTimeRange { lower upper }
  }
}"#;

/// Single-endpoint GraphQL backend. Extraction and submit share the
/// `createEvent` mutation; an `id` in the input marks an edit. Application
/// errors arrive inside a 200 response and are surfaced through
/// [`TransportError::Protocol`].
pub struct GraphqlAdapter {
    endpoint: String,
    html_limit: Option<usize>,
    client: Client,
}

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a, I> {
    query: &'a str,
    variables: Variables<I>,
}

#[derive(Debug, Serialize)]
struct Variables<I> {
    input: I,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateEventInput<'a> {
    raw_html: &'a str,
    url: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitEventInput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    title: &'a str,
    provider: &'a str,
    summary: &'a str,
    description: &'a str,
    price_amount: Option<f64>,
    active_time_range: TimeRangeInput,
}

#[derive(Debug, Serialize)]
struct TimeRangeInput {
    lower: Option<WireTimestamp>,
    upper: Option<WireTimestamp>,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GraphqlEvent {
    id: Option<Value>,
    title: Option<String>,
    provider: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    price_amount: Option<Value>,
    active_time_range: Option<TimeRange>,
    raw_html: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TimeRange {
    lower: Option<Value>,
    upper: Option<Value>,
}

impl GraphqlEvent {
    fn into_event(self) -> Event {
        let range = self.active_time_range.unwrap_or_default();
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
            active_time_range_lower: instant(range.lower),
            active_time_range_upper: instant(range.upper),
            raw_html: self.raw_html,
            url: self.url,
        }
    }
}

impl GraphqlAdapter {
    pub fn new(endpoint: impl Into<String>, html_limit: Option<usize>) -> Self {
        Self {
            endpoint: endpoint.into(),
            html_limit,
            client: Client::new(),
        }
    }

    async fn execute<I: Serialize + Send + Sync>(
        &self,
        query: &str,
        input: I,
    ) -> Result<(StatusCode, String), TransportError> {
        let request = GraphqlRequest {
            query,
            variables: Variables { input },
        };
        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(endpoint = %self.endpoint, %status, bytes = body.len(), "graphql response");
        Ok((status, body))
    }
}

#[async_trait]
impl TransportAdapter for GraphqlAdapter {
    fn kind(&self) -> &'static str {
        "graphql"
    }

    async fn fetch_extracted_event(&self, html: &str, url: &str) -> Extracted {
        let input = CreateEventInput {
            raw_html: truncate_html(html, self.html_limit),
            url,
        };
        let (status, body) = self.execute(CREATE_EVENT, input).await?;
        interpret_fetch(status, &body)
    }

    async fn submit_event(&self, draft: &EventDraft) -> Result<Event, TransportError> {
        let (status, body) = self.execute(CREATE_EVENT, submit_input(draft)).await?;
        interpret_submit(status, &body)
    }
}

fn submit_input(draft: &EventDraft) -> SubmitEventInput<'_> {
    let wire = |instant| WireTimestamp::encode(instant, WireFormat::Iso8601);
    SubmitEventInput {
        id: draft.id.as_deref().filter(|id| !id.trim().is_empty()),
        title: &draft.title,
        provider: &draft.provider,
        summary: &draft.summary,
        description: &draft.description,
        price_amount: finite(draft.price_amount),
        active_time_range: TimeRangeInput {
            lower: draft.active_time_range_lower.map(wire),
            upper: draft.active_time_range_upper.map(wire),
        },
    }
}

fn parse_payload(
    status: StatusCode,
    body: &str,
    field: &str,
) -> Result<Option<Event>, TransportError> {
    if !status.is_success() {
        return Err(TransportError::Status(status.as_u16()));
    }
    let response: GraphqlResponse = serde_json::from_str(body)?;
    if let Some(first) = response.errors.and_then(|errors| errors.into_iter().next()) {
        warn!(message = %first.message, "graphql reported an error");
        return Err(TransportError::Protocol(first.message));
    }
    match response.data.and_then(|mut data| data.get_mut(field).map(Value::take)) {
        Some(node @ Value::Object(_)) => {
            let event: GraphqlEvent = serde_json::from_value(node)?;
            Ok(Some(event.into_event()))
        }
        _ => Ok(None),
    }
}

pub fn interpret_fetch(status: StatusCode, body: &str) -> Extracted {
    Ok(parse_payload(status, body, CREATE_FIELD)?.filter(Event::has_id))
}

pub fn interpret_submit(status: StatusCode, body: &str) -> Result<Event, TransportError> {
    parse_payload(status, body, CREATE_FIELD)?.ok_or(TransportError::MissingEvent)
}
