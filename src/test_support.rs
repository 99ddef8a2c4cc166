use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Notify;

use crate::host::{ActiveTab, BrowserHost};
use crate::models::{Event, EventDraft};
use crate::transport::{Extracted, TransportAdapter, TransportError};

type FetchFn = Box<dyn Fn() -> Extracted + Send + Sync>;
type SubmitFn = Box<dyn Fn(&EventDraft) -> Result<Event, TransportError> + Send + Sync>;

/// Adapter whose responses are produced by closures, recording every call.
pub(crate) struct ScriptedAdapter {
    fetch: FetchFn,
    submit: SubmitFn,
    gate: Option<Arc<Notify>>,
    fetch_calls: Mutex<Vec<(String, String)>>,
    submitted: Mutex<Vec<EventDraft>>,
}

impl Default for ScriptedAdapter {
    fn default() -> Self {
        Self {
            fetch: Box::new(|| Ok(None)),
            submit: Box::new(|draft| {
                Ok(Event {
                    id: draft.id.clone(),
                    title: draft.title.clone(),
                    ..Event::default()
                })
            }),
            gate: None,
            fetch_calls: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedAdapter {
    pub(crate) fn fetching(fetch: impl Fn() -> Extracted + Send + Sync + 'static) -> Self {
        Self {
            fetch: Box::new(fetch),
            ..Self::default()
        }
    }

    pub(crate) fn submitting(
        mut self,
        submit: impl Fn(&EventDraft) -> Result<Event, TransportError> + Send + Sync + 'static,
    ) -> Self {
        self.submit = Box::new(submit);
        self
    }

    /// Holds every fetch until the gate is notified.
    pub(crate) fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn fetch_calls(&self) -> Vec<(String, String)> {
        self.fetch_calls.lock().unwrap().clone()
    }

    pub(crate) fn submitted(&self) -> Vec<EventDraft> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransportAdapter for ScriptedAdapter {
    fn kind(&self) -> &'static str {
        "scripted"
    }

    async fn fetch_extracted_event(&self, html: &str, url: &str) -> Extracted {
        self.fetch_calls
            .lock()
            .unwrap()
            .push((html.to_string(), url.to_string()));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        (self.fetch)()
    }

    async fn submit_event(&self, draft: &EventDraft) -> Result<Event, TransportError> {
        self.submitted.lock().unwrap().push(draft.clone());
        (self.submit)(draft)
    }
}

pub(crate) struct FailingHost {
    message: String,
}

impl FailingHost {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl BrowserHost for FailingHost {
    async fn active_tab(&self) -> Result<ActiveTab> {
        Err(anyhow!("{}", self.message))
    }

    async fn capture_html(&self, _tab: &ActiveTab) -> Result<String> {
        Err(anyhow!("{}", self.message))
    }
}
