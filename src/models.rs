use chrono::{DateTime, Utc};
use serde_json::Value;

/// Canonical event record, independent of which backend produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    pub id: Option<String>,
    pub title: String,
    pub provider: String,
    pub summary: String,
    pub description: String,
    pub price_amount: Option<f64>,
    pub active_time_range_lower: Option<DateTime<Utc>>,
    pub active_time_range_upper: Option<DateTime<Utc>>,
    pub raw_html: Option<String>,
    pub url: Option<String>,
}

impl Event {
    /// A record only counts as extracted once the backend has assigned it an id.
    pub fn has_id(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.trim().is_empty())
    }
}

/// Values collected from the form, ready to be encoded by an adapter.
///
/// `price_amount` may be NaN when the user typed something non-numeric.
#[derive(Debug, Clone, Default)]
pub struct EventDraft {
    pub id: Option<String>,
    pub title: String,
    pub provider: String,
    pub summary: String,
    pub description: String,
    pub price_amount: f64,
    pub active_time_range_lower: Option<DateTime<Utc>>,
    pub active_time_range_upper: Option<DateTime<Utc>>,
}

pub(crate) fn id_from_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn number_from_value(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
