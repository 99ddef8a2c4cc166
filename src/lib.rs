pub mod config;
pub mod form;
pub mod host;
pub mod models;
pub mod popup;
pub mod settings;
pub mod timestamps;
pub mod transport;
pub mod workflow;
mod utils;

#[cfg(test)]
mod test_support;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use config::{BackendConfig, ConfigError, PopupConfig};
pub use form::{Banner, BannerKind, Field, FormController, FormState, Region};
pub use host::{ActiveTab, BrowserHost, StaticPage};
pub use models::{Event, EventDraft};
pub use popup::Popup;
pub use settings::{InMemorySettings, JsonSettingsFile, PopupSettings, SettingsBackend};
pub use timestamps::{TimestampCodec, WireFormat, WireTimestamp};
pub use transport::{TransportAdapter, TransportError};
pub use workflow::{ExtractionState, Workflow, WorkflowError};

/// Installs a fmt subscriber filtered by `RUST_LOG`, defaulting to
/// `event_clipper=info`. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("{}=info", env!("CARGO_CRATE_NAME")))),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
