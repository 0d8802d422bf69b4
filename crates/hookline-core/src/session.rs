//! Session state — what a work session leaves behind for the next one.
//!
//! One [`SessionState`] row exists per project. It is created by the first
//! session-end save and replaced wholesale by every later save; nothing in
//! hookline deletes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Persisted state ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
  pub project_name:   String,
  /// Free-form to-do items as handed over by the assistant, in order.
  pub todo_list:      Vec<serde_json::Value>,
  pub current_focus:  String,
  pub next_steps:     Vec<String>,
  pub files_modified: Vec<String>,
  /// Store-assigned on every save.
  pub updated_at:     DateTime<Utc>,
}

/// Input to [`crate::store::WorkStore::save_session_state`]. Every field the
/// caller leaves out defaults to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
  #[serde(default)]
  pub todo_list:      Vec<serde_json::Value>,
  #[serde(default)]
  pub current_focus:  String,
  #[serde(default)]
  pub next_steps:     Vec<String>,
  #[serde(default)]
  pub files_modified: Vec<String>,
}

impl SessionSnapshot {
  /// Attach the project and timestamp. `files_modified` is a set: duplicates
  /// are dropped, first occurrence wins.
  pub fn into_state(self, project_name: &str, at: DateTime<Utc>) -> SessionState {
    let mut files_modified: Vec<String> = Vec::with_capacity(self.files_modified.len());
    for f in self.files_modified {
      if !files_modified.contains(&f) {
        files_modified.push(f);
      }
    }
    SessionState {
      project_name: project_name.to_owned(),
      todo_list: self.todo_list,
      current_focus: self.current_focus,
      next_steps: self.next_steps,
      files_modified,
      updated_at: at,
    }
  }
}

// ─── Session lifecycle ───────────────────────────────────────────────────────

/// The project and phase that own a feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPhase {
  pub project_name: String,
  pub phase:        String,
}

/// Result of registering a session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartedSession {
  pub session_id: Uuid,
  /// True when a session opened moments ago was reused instead of creating a
  /// duplicate.
  pub reused:     bool,
}

/// Request to auto-close a session. Also the `session_end` fallback payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClose {
  /// Close this session; when absent, the project's newest open session from
  /// the last 24 hours is closed instead.
  pub session_id:   Option<Uuid>,
  pub project_name: String,
  pub closed_at:    DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloseOutcome {
  pub closed:        bool,
  /// `in_progress` todos put back to `pending`.
  pub demoted_todos: u64,
}

/// Summary text written on sessions closed without a manual summary.
pub const AUTO_CLOSE_SUMMARY: &str = "Session auto-closed (no manual /session-end)";

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn snapshot_defaults_when_fields_absent() {
    let snap: SessionSnapshot = serde_json::from_str("{}").unwrap();
    assert_eq!(snap, SessionSnapshot::default());

    let snap: SessionSnapshot =
      serde_json::from_str(r#"{"current_focus":"parser","next_steps":["tests"]}"#).unwrap();
    assert_eq!(snap.current_focus, "parser");
    assert!(snap.todo_list.is_empty());
  }

  #[test]
  fn files_modified_is_deduplicated() {
    let snap = SessionSnapshot {
      files_modified: vec!["a.rs".into(), "b.rs".into(), "a.rs".into()],
      ..Default::default()
    };
    let state = snap.into_state("proj", Utc::now());
    assert_eq!(state.files_modified, ["a.rs", "b.rs"]);
  }
}
