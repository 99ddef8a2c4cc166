use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::timestamps::TimestampCodec;
use crate::transport::{graphql, rest};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown backend kind: {0}")]
    UnknownBackend(String),
    #[error("unknown time zone: {0}")]
    UnknownTimezone(String),
    #[error("invalid html limit: {0}")]
    InvalidHtmlLimit(String),
}

/// Which backend protocol the popup talks to. Chosen once, never negotiated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    Rest {
        endpoint: String,
        #[serde(default = "default_rest_limit")]
        html_limit: Option<usize>,
    },
    Graphql {
        endpoint: String,
        #[serde(default)]
        html_limit: Option<usize>,
    },
}

fn default_rest_limit() -> Option<usize> {
    Some(rest::DEFAULT_HTML_LIMIT)
}

impl BackendConfig {
    pub fn rest_default() -> Self {
        BackendConfig::Rest {
            endpoint: rest::DEFAULT_ENDPOINT.to_string(),
            html_limit: default_rest_limit(),
        }
    }

    pub fn graphql_default() -> Self {
        BackendConfig::Graphql {
            endpoint: graphql::DEFAULT_ENDPOINT.to_string(),
            html_limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupConfig {
    pub backend: BackendConfig,
    /// `None` uses the machine's local zone.
    #[serde(default)]
    pub timezone: Option<Tz>,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::rest_default(),
            timezone: None,
        }
    }
}

impl PopupConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut backend = match read("EVENT_CLIPPER_BACKEND").as_deref() {
            None | Some("rest") => BackendConfig::rest_default(),
            Some("graphql") => BackendConfig::graphql_default(),
            Some(other) => return Err(ConfigError::UnknownBackend(other.to_string())),
        };

        let (endpoint, html_limit) = match &mut backend {
            BackendConfig::Rest {
                endpoint,
                html_limit,
            }
            | BackendConfig::Graphql {
                endpoint,
                html_limit,
            } => (endpoint, html_limit),
        };
        if let Some(value) = read("EVENT_CLIPPER_ENDPOINT") {
            *endpoint = value;
        }
        if let Some(value) = read("EVENT_CLIPPER_HTML_LIMIT") {
            *html_limit = match value.as_str() {
                "none" | "unlimited" => None,
                number => Some(
                    number
                        .parse::<usize>()
                        .map_err(|_| ConfigError::InvalidHtmlLimit(value.clone()))?,
                ),
            };
        }

        let timezone = match read("EVENT_CLIPPER_TIMEZONE") {
            None => None,
            Some(name) if name.eq_ignore_ascii_case("local") => None,
            Some(name) => Some(
                name.parse::<Tz>()
                    .map_err(|_| ConfigError::UnknownTimezone(name.clone()))?,
            ),
        };

        Ok(Self { backend, timezone })
    }

    pub fn codec(&self) -> TimestampCodec {
        match self.timezone {
            Some(tz) => TimestampCodec::with_zone(tz),
            None => TimestampCodec::local(),
        }
    }
}
