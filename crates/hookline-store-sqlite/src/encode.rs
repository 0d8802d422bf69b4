//! Encoding and decoding helpers between hookline types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that string comparison orders them correctly. List fields are stored as
//! compact JSON. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use hookline_core::session::SessionState;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── JSON lists ──────────────────────────────────────────────────────────────

pub fn encode_list<T: serde::Serialize>(items: &[T]) -> Result<String> {
  Ok(serde_json::to_string(items)?)
}

pub fn decode_list<T: serde::de::DeserializeOwned>(s: &str) -> Result<Vec<T>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `session_state` row.
pub struct RawSessionState {
  pub project_name:   String,
  pub todo_list:      String,
  pub current_focus:  String,
  pub next_steps:     String,
  pub files_modified: String,
  pub updated_at:     String,
}

impl RawSessionState {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      project_name:   row.get(0)?,
      todo_list:      row.get(1)?,
      current_focus:  row.get(2)?,
      next_steps:     row.get(3)?,
      files_modified: row.get(4)?,
      updated_at:     row.get(5)?,
    })
  }

  pub fn into_state(self) -> Result<SessionState> {
    Ok(SessionState {
      project_name:   self.project_name,
      todo_list:      decode_list(&self.todo_list)?,
      current_focus:  self.current_focus,
      next_steps:     decode_list(&self.next_steps)?,
      files_modified: decode_list(&self.files_modified)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn encoded_timestamps_sort_lexically() {
    let a = Utc.with_ymd_and_hms(2026, 3, 1, 9, 59, 59).unwrap();
    let b = a + chrono::Duration::milliseconds(1);
    let c = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
    let (ea, eb, ec) = (encode_dt(a), encode_dt(b), encode_dt(c));
    assert_eq!(ea.len(), eb.len());
    assert!(ea < eb && eb < ec);
    assert_eq!(decode_dt(&eb).unwrap(), b);
  }
}
