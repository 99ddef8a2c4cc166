use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, error, info};

use crate::form::{Banner, BannerKind, Field, FormController, FormState, Region};
use crate::host::BrowserHost;
use crate::models::Event;
use crate::timestamps::TimestampCodec;
use crate::transport::{TransportAdapter, TransportError};

pub const EMPTY_RESULT_MESSAGE: &str = "No event data found. You can add it manually.";
pub const SUBMIT_SUCCESS_MESSAGE: &str = "Event updated successfully!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionState {
    Idle,
    Loading,
    Populated,
    EmptyResult,
    Failed,
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Tab query or script injection failed.
    #[error(transparent)]
    Host(anyhow::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("a request is already in flight")]
    Busy,
}

struct Shared {
    form: FormController,
    state: ExtractionState,
    last_synced: Option<Event>,
}

/// Drives extraction and submit against one host and one adapter.
///
/// At most one network-bound operation runs at a time; a trigger that
/// arrives while another is pending gets [`WorkflowError::Busy`] and
/// leaves the draft alone.
pub struct Workflow {
    host: Arc<dyn BrowserHost>,
    adapter: Arc<dyn TransportAdapter>,
    shared: Mutex<Shared>,
    in_flight: tokio::sync::Mutex<()>,
}

impl Workflow {
    pub fn new(
        host: Arc<dyn BrowserHost>,
        adapter: Arc<dyn TransportAdapter>,
        codec: TimestampCodec,
    ) -> Self {
        Self {
            host,
            adapter,
            shared: Mutex::new(Shared {
                form: FormController::new(codec),
                state: ExtractionState::Idle,
                last_synced: None,
            }),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn adapter_kind(&self) -> &'static str {
        self.adapter.kind()
    }

    pub fn state(&self) -> ExtractionState {
        self.lock().state
    }

    pub fn fields(&self) -> FormState {
        self.lock().form.fields().clone()
    }

    pub fn region(&self) -> Region {
        self.lock().form.region()
    }

    pub fn banner(&self) -> Option<Banner> {
        self.lock().form.banner().cloned()
    }

    /// The record as the server last returned it.
    pub fn last_synced(&self) -> Option<Event> {
        self.lock().last_synced.clone()
    }

    pub fn set_field(&self, field: Field, value: impl Into<String>) {
        self.lock().form.set_field(field, value);
    }

    /// Idle/any → Loading → {Populated, EmptyResult, Failed}. Every failure is
    /// absorbed into the resulting state; only `Busy` is returned as an error.
    pub async fn extract(&self) -> Result<ExtractionState, WorkflowError> {
        let _guard = self.in_flight.try_lock().map_err(|_| {
            debug!("extraction ignored, request already in flight");
            WorkflowError::Busy
        })?;

        {
            let mut shared = self.lock();
            shared.form.show_loading();
            shared.state = ExtractionState::Loading;
        }
        info!(adapter = self.adapter.kind(), "extraction started");

        let outcome = self.fetch_from_active_tab().await;

        let mut shared = self.lock();
        let next = match outcome {
            Ok(Some(event)) if event.has_id() => {
                info!(id = event.id.as_deref().unwrap_or_default(), "event extracted");
                shared.form.render(&event);
                shared.last_synced = Some(event);
                ExtractionState::Populated
            }
            Ok(_) => {
                info!("no event found, falling back to manual entry");
                shared.form.reset();
                shared.last_synced = None;
                shared.form.show_banner(BannerKind::Advisory, EMPTY_RESULT_MESSAGE);
                ExtractionState::EmptyResult
            }
            Err(err) => {
                error!(%err, "extraction failed");
                shared.form.reset();
                shared.last_synced = None;
                shared
                    .form
                    .show_banner(BannerKind::Error, format!("Error: {err}"));
                ExtractionState::Failed
            }
        };
        shared.form.show_form();
        shared.state = next;
        Ok(next)
    }

    async fn fetch_from_active_tab(&self) -> Result<Option<Event>, WorkflowError> {
        let tab = self.host.active_tab().await.map_err(WorkflowError::Host)?;
        if tab.id.is_none() {
            return Err(WorkflowError::Host(anyhow::anyhow!(
                "active tab has no id: {}",
                tab.url
            )));
        }
        let html = self
            .host
            .capture_html(&tab)
            .await
            .map_err(WorkflowError::Host)?;
        debug!(url = %tab.url, bytes = html.len(), "captured page markup");
        Ok(self.adapter.fetch_extracted_event(&html, &tab.url).await?)
    }

    /// Sends the current draft. On failure the entered values stay in place.
    pub async fn submit(&self) -> Result<Event, WorkflowError> {
        let _guard = self.in_flight.try_lock().map_err(|_| {
            debug!("submit ignored, request already in flight");
            WorkflowError::Busy
        })?;

        let draft = {
            let mut shared = self.lock();
            shared.form.show_loading();
            shared.form.collect()
        };
        info!(adapter = self.adapter.kind(), editing = draft.id.is_some(), "submitting event");

        let result = self.adapter.submit_event(&draft).await;

        let mut shared = self.lock();
        shared.form.show_form();
        match result {
            Ok(event) => {
                shared.form.render(&event);
                shared
                    .form
                    .show_banner(BannerKind::Success, SUBMIT_SUCCESS_MESSAGE);
                shared.last_synced = Some(event.clone());
                Ok(event)
            }
            Err(err) => {
                error!(%err, "submit failed");
                shared
                    .form
                    .show_banner(BannerKind::Error, format!("Error: {err}"));
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::StaticPage;
    use crate::test_support::{FailingHost, ScriptedAdapter};
    use crate::transport::{graphql, rest};
    use reqwest::StatusCode;
    use serde_json::json;
    use tokio::sync::Notify;

    fn codec() -> TimestampCodec {
        TimestampCodec::with_zone(chrono_tz::UTC)
    }

    fn page() -> Arc<dyn BrowserHost> {
        Arc::new(StaticPage::new(
            "https://example.com/talk",
            "<html><body>Talk</body></html>",
        ))
    }

    fn rest_body(body: serde_json::Value) -> ScriptedAdapter {
        let body = body.to_string();
        ScriptedAdapter::fetching(move || rest::interpret_fetch(StatusCode::OK, &body))
    }

    fn graphql_body(body: serde_json::Value) -> ScriptedAdapter {
        let body = body.to_string();
        ScriptedAdapter::fetching(move || graphql::interpret_fetch(StatusCode::OK, &body))
    }

    #[tokio::test]
    async fn populates_the_form_from_a_rest_record() {
        let adapter = Arc::new(rest_body(json!({
            "id": "1",
            "title": "Talk",
            "priceAmount": 10,
            "activeTimeRangeLower": 1_700_000_000
        })));
        let workflow = Workflow::new(page(), adapter.clone(), codec());

        assert_eq!(workflow.state(), ExtractionState::Idle);
        let state = workflow.extract().await.expect("not busy");

        assert_eq!(state, ExtractionState::Populated);
        let fields = workflow.fields();
        assert_eq!(fields.title, "Talk");
        assert_eq!(fields.price_amount, "10");
        assert!(!fields.active_time_range_lower.is_empty());
        assert_eq!(fields.id, "1");
        assert_eq!(workflow.region(), Region::Form);
        assert!(workflow.banner().is_none());

        let calls = adapter.fetch_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "https://example.com/talk");
        assert!(calls[0].0.contains("<body>Talk</body>"));
    }

    #[tokio::test]
    async fn missing_id_falls_back_to_manual_entry() {
        let workflow = Workflow::new(page(), Arc::new(rest_body(json!({}))), codec());
        workflow.set_field(Field::Title, "stale");

        let state = workflow.extract().await.expect("not busy");

        assert_eq!(state, ExtractionState::EmptyResult);
        assert_eq!(workflow.fields(), FormState::default());
        assert_eq!(workflow.region(), Region::Form);
        let banner = workflow.banner().expect("banner");
        assert_eq!(banner.kind, BannerKind::Advisory);
        assert!(banner.text.contains("manually"));
    }

    #[tokio::test]
    async fn graphql_errors_fail_the_extraction() {
        let workflow = Workflow::new(
            page(),
            Arc::new(graphql_body(json!({"errors": [{"message": "boom"}]}))),
            codec(),
        );
        workflow.set_field(Field::Title, "stale");

        let state = workflow.extract().await.expect("not busy");

        assert_eq!(state, ExtractionState::Failed);
        assert_eq!(workflow.fields(), FormState::default());
        let banner = workflow.banner().expect("banner");
        assert_eq!(banner.kind, BannerKind::Error);
        assert_eq!(banner.text, "Error: boom");
    }

    #[tokio::test]
    async fn graphql_time_range_renders_both_bounds() {
        let workflow = Workflow::new(
            page(),
            Arc::new(graphql_body(json!({
                "data": {
                    "createEvent": {
                        "id": "9",
                        "activeTimeRange": {
                            "lower": "2024-01-01T00:00:00Z",
                            "upper": "2024-01-02T00:00:00Z"
                        }
                    }
                }
            }))),
            codec(),
        );

        assert_eq!(
            workflow.extract().await.expect("not busy"),
            ExtractionState::Populated
        );
        let fields = workflow.fields();
        assert!(!fields.active_time_range_lower.is_empty());
        assert!(!fields.active_time_range_upper.is_empty());
        assert_ne!(fields.active_time_range_lower, fields.active_time_range_upper);
    }

    #[tokio::test]
    async fn http_status_failure_is_shown_verbatim() {
        let adapter = ScriptedAdapter::fetching(|| {
            rest::interpret_fetch(StatusCode::SERVICE_UNAVAILABLE, "")
        });
        let workflow = Workflow::new(page(), Arc::new(adapter), codec());

        assert_eq!(
            workflow.extract().await.expect("not busy"),
            ExtractionState::Failed
        );
        assert_eq!(
            workflow.banner().map(|b| b.text),
            Some("Error: Server responded with status: 503".to_string())
        );
    }

    #[tokio::test]
    async fn host_failure_is_recoverable() {
        let adapter = Arc::new(rest_body(json!({"id": "1"})));
        let workflow = Workflow::new(
            Arc::new(FailingHost::new("cannot access chrome:// pages")),
            adapter.clone(),
            codec(),
        );

        assert_eq!(
            workflow.extract().await.expect("not busy"),
            ExtractionState::Failed
        );
        assert_eq!(
            workflow.banner().map(|b| b.text),
            Some("Error: cannot access chrome:// pages".to_string())
        );
        assert_eq!(workflow.region(), Region::Form);
        assert!(adapter.fetch_calls().is_empty());
    }

    #[tokio::test]
    async fn overlapping_trigger_is_rejected() {
        let gate = Arc::new(Notify::new());
        let adapter = Arc::new(rest_body(json!({"id": "1", "title": "Talk"})).gated(gate.clone()));
        let workflow = Workflow::new(page(), adapter.clone(), codec());

        let (first, second, ()) = tokio::join!(workflow.extract(), workflow.extract(), async {
            gate.notify_one();
        });

        assert_eq!(first.expect("first runs"), ExtractionState::Populated);
        assert!(matches!(second, Err(WorkflowError::Busy)));
        assert_eq!(adapter.fetch_calls().len(), 1);
        assert_eq!(workflow.fields().title, "Talk");
    }

    #[tokio::test]
    async fn submit_during_extraction_is_rejected() {
        let gate = Arc::new(Notify::new());
        let adapter = Arc::new(rest_body(json!({"id": "1", "title": "Talk"})).gated(gate.clone()));
        let workflow = Workflow::new(page(), adapter.clone(), codec());
        workflow.set_field(Field::Title, "Typed before extraction");

        let (submitted, ()) = tokio::join!(
            async {
                let (extracted, submitted) = tokio::join!(workflow.extract(), async {
                    let submitted = workflow.submit().await;
                    assert_eq!(workflow.fields().title, "Typed before extraction");
                    assert_eq!(workflow.state(), ExtractionState::Loading);
                    submitted
                });
                assert_eq!(extracted.expect("extract runs"), ExtractionState::Populated);
                submitted
            },
            async {
                gate.notify_one();
            }
        );

        assert!(matches!(submitted, Err(WorkflowError::Busy)));
        assert!(adapter.submitted().is_empty());
        assert_eq!(workflow.fields().title, "Talk");
    }

    #[tokio::test]
    async fn submit_renders_the_saved_record() {
        let adapter = Arc::new(
            rest_body(json!({"id": "1", "title": "Talk"})).submitting(|draft| {
                let body = json!({"id": "1", "title": draft.title, "priceAmount": 25}).to_string();
                rest::interpret_submit(StatusCode::OK, &body)
            }),
        );
        let workflow = Workflow::new(page(), adapter.clone(), codec());
        workflow.extract().await.expect("not busy");

        workflow.set_field(Field::Title, "Talk (updated)");
        workflow.set_field(Field::PriceAmount, "25");
        workflow.set_field(Field::ActiveTimeRangeLower, "2024-05-01T18:00");
        let saved = workflow.submit().await.expect("submit ok");

        assert_eq!(saved.title, "Talk (updated)");
        let sent = adapter.submitted();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].id.as_deref(), Some("1"));
        assert_eq!(sent[0].price_amount, 25.0);
        assert!(sent[0].active_time_range_lower.is_some());

        let banner = workflow.banner().expect("banner");
        assert_eq!(banner.kind, BannerKind::Success);
        assert_eq!(banner.text, SUBMIT_SUCCESS_MESSAGE);
        assert_eq!(workflow.fields().price_amount, "25");
        assert_eq!(
            workflow.last_synced().map(|e| e.title),
            Some("Talk (updated)".to_string())
        );
    }

    #[tokio::test]
    async fn failed_submit_keeps_entered_values() {
        let adapter = Arc::new(
            rest_body(json!({}))
                .submitting(|_| rest::interpret_submit(StatusCode::INTERNAL_SERVER_ERROR, "")),
        );
        let workflow = Workflow::new(page(), adapter, codec());
        workflow.extract().await.expect("not busy");

        workflow.set_field(Field::Title, "Hand typed");
        workflow.set_field(Field::Description, "Notes");
        let err = workflow.submit().await.expect_err("submit fails");

        assert_eq!(err.to_string(), "Server responded with status: 500");
        let fields = workflow.fields();
        assert_eq!(fields.title, "Hand typed");
        assert_eq!(fields.description, "Notes");
        assert_eq!(workflow.region(), Region::Form);
        assert_eq!(
            workflow.banner().map(|b| b.text),
            Some("Error: Server responded with status: 500".to_string())
        );
    }

    #[tokio::test]
    async fn non_numeric_price_is_sent_as_nan() {
        let adapter = Arc::new(ScriptedAdapter::default());
        let workflow = Workflow::new(page(), adapter.clone(), codec());

        workflow.set_field(Field::PriceAmount, "twelve");
        workflow.submit().await.expect("submit ok");

        let sent = adapter.submitted();
        assert!(sent[0].price_amount.is_nan());
    }
}
