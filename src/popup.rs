use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::PopupConfig;
use crate::form::Field;
use crate::host::BrowserHost;
use crate::models::Event;
use crate::settings::{PopupSettings, SettingsBackend, SettingsError};
use crate::timestamps::TimestampCodec;
use crate::transport::{self, TransportAdapter};
use crate::workflow::{ExtractionState, Workflow, WorkflowError};

/// One open popup: the persisted preference plus the extraction workflow.
pub struct Popup {
    workflow: Workflow,
    settings: Arc<dyn SettingsBackend>,
    auto_extract: AtomicBool,
}

impl Popup {
    /// Reads the preference without triggering anything.
    pub async fn load(
        host: Arc<dyn BrowserHost>,
        adapter: Arc<dyn TransportAdapter>,
        settings: Arc<dyn SettingsBackend>,
        codec: TimestampCodec,
    ) -> Self {
        let preference = match settings.load().await {
            Ok(preference) => preference,
            Err(err) => {
                warn!(%err, "failed to load popup settings, using defaults");
                PopupSettings::default()
            }
        };
        Self {
            workflow: Workflow::new(host, adapter, codec),
            settings,
            auto_extract: AtomicBool::new(preference.auto_extract),
        }
    }

    /// Loads the preference and, when auto-extract is on, runs extraction
    /// before returning.
    pub async fn open(
        host: Arc<dyn BrowserHost>,
        adapter: Arc<dyn TransportAdapter>,
        settings: Arc<dyn SettingsBackend>,
        codec: TimestampCodec,
    ) -> Self {
        let popup = Self::load(host, adapter, settings, codec).await;
        if let Some(Err(err)) = popup.auto_extract_if_enabled().await {
            warn!(%err, "auto-extract skipped");
        }
        popup
    }

    pub async fn from_config(
        config: &PopupConfig,
        host: Arc<dyn BrowserHost>,
        settings: Arc<dyn SettingsBackend>,
    ) -> Self {
        let adapter = transport::connect(&config.backend);
        info!(adapter = adapter.kind(), "popup opening");
        Self::open(host, adapter, settings, config.codec()).await
    }

    pub async fn auto_extract_if_enabled(
        &self,
    ) -> Option<Result<ExtractionState, WorkflowError>> {
        if !self.auto_extract() {
            return None;
        }
        info!("auto-extract enabled");
        Some(self.workflow.extract().await)
    }

    pub fn auto_extract(&self) -> bool {
        self.auto_extract.load(Ordering::SeqCst)
    }

    /// Toggle handler. The in-memory value follows the toggle even if the
    /// write fails.
    pub async fn set_auto_extract(&self, enabled: bool) -> Result<(), SettingsError> {
        self.auto_extract.store(enabled, Ordering::SeqCst);
        self.settings
            .save(&PopupSettings {
                auto_extract: enabled,
            })
            .await
    }

    pub async fn extract(&self) -> Result<ExtractionState, WorkflowError> {
        self.workflow.extract().await
    }

    pub async fn submit(&self) -> Result<Event, WorkflowError> {
        self.workflow.submit().await
    }

    pub fn set_field(&self, field: Field, value: impl Into<String>) {
        self.workflow.set_field(field, value);
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }
}
