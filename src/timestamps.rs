use chrono::{
    DateTime, Local, LocalResult, NaiveDateTime, SecondsFormat, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::Value;

/// Format of `<input type="datetime-local">`, minute precision.
pub const LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M";

const LOCAL_INPUT_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

const NAIVE_ISO_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// How a backend encodes instants on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    UnixSeconds,
    Iso8601,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    Unix(i64),
    Iso(String),
}

impl WireTimestamp {
    pub fn encode(instant: DateTime<Utc>, format: WireFormat) -> Self {
        match format {
            WireFormat::UnixSeconds => WireTimestamp::Unix(instant.timestamp()),
            WireFormat::Iso8601 => {
                WireTimestamp::Iso(instant.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
        }
    }

    /// Reads whatever a backend sent for a time field. Numbers and numeric
    /// strings are epoch seconds, any other string is kept as ISO text.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i64))
                .map(WireTimestamp::Unix),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else if let Ok(secs) = trimmed.parse::<i64>() {
                    Some(WireTimestamp::Unix(secs))
                } else {
                    Some(WireTimestamp::Iso(trimmed.to_string()))
                }
            }
            _ => None,
        }
    }

    pub fn to_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            WireTimestamp::Unix(secs) => DateTime::from_timestamp(*secs, 0),
            WireTimestamp::Iso(text) => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    // No offset given: read as UTC.
                    NAIVE_ISO_FORMATS
                        .iter()
                        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                        .map(|naive| naive.and_utc())
                }),
        }
    }
}

/// Converts between editable local date-time strings and wire instants.
///
/// `zone == None` means the machine's local zone; a named zone keeps the
/// conversion deterministic regardless of where the popup runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampCodec {
    zone: Option<Tz>,
}

impl TimestampCodec {
    pub fn local() -> Self {
        Self { zone: None }
    }

    pub fn with_zone(zone: Tz) -> Self {
        Self { zone: Some(zone) }
    }

    pub fn zone(&self) -> Option<Tz> {
        self.zone
    }

    /// Parses a local date-time field. Empty or malformed input yields `None`.
    pub fn parse_local(&self, text: &str) -> Option<DateTime<Utc>> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        let naive = LOCAL_INPUT_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())?;
        match self.zone {
            Some(tz) => resolve(&tz, &naive),
            None => resolve(&Local, &naive),
        }
    }

    /// Renders an instant for editing, truncated to the minute.
    pub fn format_local(&self, instant: DateTime<Utc>) -> String {
        let truncated = instant
            .with_second(0)
            .and_then(|dt| dt.with_nanosecond(0))
            .unwrap_or(instant);
        match self.zone {
            Some(tz) => truncated.with_timezone(&tz).format(LOCAL_FORMAT).to_string(),
            None => truncated
                .with_timezone(&Local)
                .format(LOCAL_FORMAT)
                .to_string(),
        }
    }

    pub fn to_wire(&self, text: &str, format: WireFormat) -> Option<WireTimestamp> {
        self.parse_local(text)
            .map(|instant| WireTimestamp::encode(instant, format))
    }

    pub fn from_wire(&self, wire: Option<&WireTimestamp>) -> String {
        wire.and_then(WireTimestamp::to_instant)
            .map(|instant| self.format_local(instant))
            .unwrap_or_default()
    }
}

fn resolve<Z: TimeZone>(zone: &Z, naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
    match zone.from_local_datetime(naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(dt, _) => Some(dt.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}
