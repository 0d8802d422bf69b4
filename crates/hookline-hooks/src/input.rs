//! The JSON object a host writes to a hook's stdin.
//!
//! Fields differ per hook event, so everything is optional and unknown keys
//! are ignored. Session-state fields (`todo_list`, `current_focus`, ...) sit
//! at the top level and are collected into a [`SessionSnapshot`].

use std::path::{Path, PathBuf};

use hookline_core::session::SessionSnapshot;
use serde::Deserialize;
use serde_json::Value;
use crate::config::HookConfig;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
  pub session_id:      Option<String>,
  pub cwd:             Option<PathBuf>,
  pub hook_event_name: Option<String>,

  // ── Tool events ───────────────────────────────────────────────────────
  pub tool_name:     Option<String>,
  pub tool_input:    Option<Value>,
  #[serde(alias = "tool_output")]
  pub tool_response: Option<Value>,
  pub tool_error:    Option<Value>,
  pub duration_ms:   Option<i64>,

  // ── Sub-agents ────────────────────────────────────────────────────────
  #[serde(alias = "agent_id")]
  pub subagent_id:   Option<String>,
  #[serde(alias = "agent_type")]
  pub subagent_type: Option<String>,
  #[serde(alias = "prompt")]
  pub task_prompt:   Option<String>,
  pub workspace_dir: Option<String>,

  pub project_name: Option<String>,
  #[serde(flatten)]
  pub snapshot:     SessionSnapshot,
}

impl HookInput {
  /// Parse stdin. Empty input is `{}`. On malformed input the caller logs
  /// the error and carries on with the default; a hook never fails on what
  /// the host sent.
  pub fn parse(raw: &str) -> serde_json::Result<Self> {
    if raw.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_json::from_str(raw)
  }

  /// The project a hook acts on: configured name, then the input's
  /// `project_name`, then the basename of `cwd`.
  pub fn project_name(&self, config: &HookConfig) -> String {
    config
      .project_name
      .clone()
      .or_else(|| self.project_name.clone().filter(|p| !p.is_empty()))
      .or_else(|| {
        self
          .cwd
          .as_deref()
          .and_then(Path::file_name)
          .map(|n| n.to_string_lossy().into_owned())
      })
      .unwrap_or_else(|| "unknown".to_owned())
  }

  /// The `sql` (or `query`) string of a database tool call.
  pub fn sql(&self) -> Option<&str> {
    let input = self.tool_input.as_ref()?;
    ["sql", "query"].iter().find_map(|k| input.get(k)?.as_str())
  }

  /// The tool's error, as text.
  pub fn tool_error_text(&self) -> Option<String> {
    match self.tool_error.as_ref()? {
      Value::Null => None,
      Value::Bool(false) => None,
      Value::String(s) if s.is_empty() => None,
      Value::String(s) => Some(s.clone()),
      other => Some(other.to_string()),
    }
  }
}

/// Serialized size of an optional JSON value; `0` when absent.
pub fn json_size(value: Option<&Value>) -> i64 {
  value.map_or(0, |v| match v {
    Value::String(s) => s.len() as i64,
    other => other.to_string().len() as i64,
  })
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn empty_input_is_default_and_garbage_is_reported() {
    assert!(HookInput::parse(" \n").unwrap().tool_name.is_none());
    let err = HookInput::parse("not json").unwrap_err();
    assert!(err.is_syntax());
    assert!(HookInput::parse("[1, 2]").is_err());
  }

  #[test]
  fn aliases_and_snapshot_fields() {
    let input = HookInput::parse(
      &json!({
        "agent_id": "a-1",
        "agent_type": "reviewer",
        "prompt": "look",
        "tool_output": {"rows": 1},
        "current_focus": "replay",
        "next_steps": ["ship"],
        "unrelated": true,
      })
      .to_string(),
    )
    .unwrap();
    assert_eq!(input.subagent_id.as_deref(), Some("a-1"));
    assert_eq!(input.subagent_type.as_deref(), Some("reviewer"));
    assert_eq!(input.task_prompt.as_deref(), Some("look"));
    assert!(input.tool_response.is_some());
    assert_eq!(input.snapshot.current_focus, "replay");
    assert_eq!(input.snapshot.next_steps, ["ship"]);
  }

  #[test]
  fn project_name_precedence() {
    let mut config = HookConfig::fallback_defaults();
    let mut input = HookInput { cwd: Some("/work/hookline".into()), ..Default::default() };
    assert_eq!(input.project_name(&config), "hookline");

    input.project_name = Some("from-input".into());
    assert_eq!(input.project_name(&config), "from-input");

    config.project_name = Some("from-env".into());
    assert_eq!(input.project_name(&config), "from-env");

    assert_eq!(HookInput::default().project_name(&HookConfig::fallback_defaults()), "unknown");
  }

  #[test]
  fn sql_from_tool_input() {
    let input = HookInput { tool_input: Some(json!({"query": "SELECT 1"})), ..Default::default() };
    assert_eq!(input.sql(), Some("SELECT 1"));
  }

  #[test]
  fn tool_error_text_ignores_falsy_values() {
    let mut input = HookInput { tool_error: Some(json!(false)), ..Default::default() };
    assert_eq!(input.tool_error_text(), None);
    input.tool_error = Some(json!("boom"));
    assert_eq!(input.tool_error_text().as_deref(), Some("boom"));
  }

  #[test]
  fn sizes() {
    assert_eq!(json_size(None), 0);
    assert_eq!(json_size(Some(&json!("abc"))), 3);
    assert_eq!(json_size(Some(&json!({"a": 1}))), 7);
  }
}
