//! Hook records — the rows lifecycle hooks persist, and the payloads of the
//! fallback log when the database cannot be reached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, session::SessionClose};

pub const MCP_USAGE: &str = "mcp_usage";
pub const SUBAGENT_START: &str = "subagent_start";
pub const SESSION_END: &str = "session_end";

const MAX_ERROR_LEN: usize = 500;
const MAX_TASK_LEN: usize = 1000;

// ─── MCP usage ───────────────────────────────────────────────────────────────

/// One call of an MCP tool, as seen by the post-tool-use hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpUsage {
  pub tool_name:         String,
  pub mcp_server:        String,
  pub execution_time_ms: i64,
  pub success:           bool,
  pub error_message:     Option<String>,
  pub input_size_bytes:  i64,
  pub output_size_bytes: i64,
  pub session_id:        Option<String>,
  pub project_name:      Option<String>,
  /// Older payloads omit it; they replay as "now".
  #[serde(default = "Utc::now")]
  pub called_at:         DateTime<Utc>,
}

impl McpUsage {
  /// Caps the stored error text.
  pub fn with_error(mut self, error: Option<String>) -> Self {
    self.success = error.is_none();
    self.error_message = error.map(|e| truncate(&e, MAX_ERROR_LEN));
    self
  }
}

/// The server segment of an `mcp__<server>__<tool>` tool name; `None` for
/// built-in tools.
pub fn mcp_server(tool_name: &str) -> Option<&str> {
  let rest = tool_name.strip_prefix("mcp__")?;
  let server = rest.split("__").next()?;
  (!server.is_empty()).then_some(server)
}

// ─── Agent spawns ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpawn {
  /// The sub-agent's own id; the upsert key.
  pub session_id:        String,
  pub agent_type:        String,
  pub task_description:  String,
  pub workspace_dir:     String,
  pub parent_session_id: Option<Uuid>,
  #[serde(default = "Utc::now")]
  pub spawned_at:        DateTime<Utc>,
}

impl AgentSpawn {
  pub fn new(
    subagent_id: &str,
    agent_type: Option<&str>,
    task_prompt: Option<&str>,
    workspace_dir: Option<&str>,
    parent_session_id: Option<&str>,
    spawned_at: DateTime<Utc>,
  ) -> Self {
    let task = task_prompt.filter(|t| !t.is_empty()).unwrap_or("No description");
    Self {
      session_id: subagent_id.to_owned(),
      agent_type: agent_type.unwrap_or("unknown").to_owned(),
      task_description: truncate(task, MAX_TASK_LEN),
      workspace_dir: workspace_dir.unwrap_or("unknown").to_owned(),
      // Non-UUID parents are dropped rather than rejected.
      parent_session_id: parent_session_id.and_then(|p| Uuid::parse_str(p).ok()),
      spawned_at,
    }
  }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

/// Every record kind that can sit in a fallback log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookRecord {
  McpUsage(McpUsage),
  AgentSpawn(AgentSpawn),
  SessionClose(SessionClose),
}

impl HookRecord {
  /// The fallback log this record belongs to.
  pub fn hook_name(&self) -> &'static str {
    match self {
      Self::McpUsage(_) => MCP_USAGE,
      Self::AgentSpawn(_) => SUBAGENT_START,
      Self::SessionClose(_) => SESSION_END,
    }
  }

  /// Serialise the record as the opaque `data` object of a fallback entry.
  pub fn to_payload(&self) -> Result<serde_json::Value> {
    Ok(match self {
      Self::McpUsage(r) => serde_json::to_value(r)?,
      Self::AgentSpawn(r) => serde_json::to_value(r)?,
      Self::SessionClose(r) => serde_json::to_value(r)?,
    })
  }

  /// Rebuild a record from a fallback entry's hook name and payload.
  pub fn from_payload(hook: &str, data: serde_json::Value) -> Result<Self> {
    let wrap = |source| Error::Payload { hook: hook.to_owned(), source };
    match hook {
      MCP_USAGE => serde_json::from_value(data).map(Self::McpUsage).map_err(wrap),
      SUBAGENT_START => serde_json::from_value(data).map(Self::AgentSpawn).map_err(wrap),
      SESSION_END => serde_json::from_value(data).map(Self::SessionClose).map_err(wrap),
      other => Err(Error::UnknownHook(other.to_owned())),
    }
  }
}

fn truncate(s: &str, max_chars: usize) -> String { s.chars().take(max_chars).collect() }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn server_from_tool_name() {
    assert_eq!(mcp_server("mcp__postgres__execute_sql"), Some("postgres"));
    assert_eq!(mcp_server("mcp__filesystem__read_file"), Some("filesystem"));
    assert_eq!(mcp_server("Read"), None);
    assert_eq!(mcp_server("mcp__"), None);
  }

  #[test]
  fn spawn_normalises_inputs() {
    let long = "x".repeat(1500);
    let spawn = AgentSpawn::new("a1", None, Some(&long), None, Some("not-a-uuid"), Utc::now());
    assert_eq!(spawn.agent_type, "unknown");
    assert_eq!(spawn.task_description.chars().count(), 1000);
    assert_eq!(spawn.workspace_dir, "unknown");
    assert_eq!(spawn.parent_session_id, None);

    let parent = Uuid::new_v4().to_string();
    let spawn = AgentSpawn::new("a2", Some("coder"), Some(""), None, Some(&parent), Utc::now());
    assert_eq!(spawn.task_description, "No description");
    assert!(spawn.parent_session_id.is_some());
  }

  #[test]
  fn payload_dispatch_by_hook_name() {
    let close = SessionClose {
      session_id:   None,
      project_name: "hookline".into(),
      closed_at:    Utc::now(),
    };
    let record = HookRecord::SessionClose(close.clone());
    let payload = record.to_payload().unwrap();

    let back = HookRecord::from_payload(record.hook_name(), payload.clone()).unwrap();
    assert_eq!(back, HookRecord::SessionClose(close));

    assert!(matches!(
      HookRecord::from_payload("mcp_usage", payload.clone()),
      Err(Error::Payload { .. })
    ));
    assert!(matches!(
      HookRecord::from_payload("todo_sync", payload),
      Err(Error::UnknownHook(_))
    ));
  }

  #[test]
  fn error_text_is_capped() {
    let usage = McpUsage {
      tool_name:         "mcp__x__y".into(),
      mcp_server:        "x".into(),
      execution_time_ms: 0,
      success:           true,
      error_message:     None,
      input_size_bytes:  0,
      output_size_bytes: 0,
      session_id:        None,
      project_name:      None,
      called_at:         Utc::now(),
    }
    .with_error(Some("e".repeat(600)));
    assert!(!usage.success);
    assert_eq!(usage.error_message.unwrap().len(), 500);
  }

  #[test]
  fn legacy_spawn_payload_without_timestamp_decodes() {
    let data = serde_json::json!({
      "session_id": "agent-7",
      "agent_type": "reviewer",
      "task_description": "check",
      "workspace_dir": "/work",
      "parent_session_id": null,
    });
    let record = HookRecord::from_payload(SUBAGENT_START, data).unwrap();
    assert!(matches!(record, HookRecord::AgentSpawn(ref s) if s.session_id == "agent-7"));
  }
}
