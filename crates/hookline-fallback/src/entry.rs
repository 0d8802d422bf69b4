//! The on-disk record format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line of a fallback log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackEntry {
  #[serde(with = "timestamp")]
  pub timestamp: DateTime<Utc>,
  pub hook:      String,
  /// Opaque payload; only the replay function interprets it.
  pub data:      serde_json::Value,
  /// Absent on hand-written lines; absent means pending.
  #[serde(default)]
  pub replayed:  bool,
}

impl FallbackEntry {
  pub fn new(hook: &str, data: serde_json::Value) -> Self {
    Self { timestamp: Utc::now(), hook: hook.to_owned(), data, replayed: false }
  }

  /// Parse one line; `None` for blank or malformed lines.
  pub(crate) fn parse_line(line: &str) -> Option<Self> {
    let line = line.trim();
    if line.is_empty() {
      return None;
    }
    serde_json::from_str(line).ok()
  }
}

/// Written as RFC 3339. Also reads the zone-less ISO-8601 form older hook
/// scripts produced, taking it as UTC.
mod timestamp {
  use chrono::{DateTime, NaiveDateTime, Utc};
  use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

  pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.to_rfc3339())
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(d)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
      return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
      .map(|naive| naive.and_utc())
      .map_err(D::Error::custom)
  }
}
