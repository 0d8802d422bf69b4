//! `mcp-usage`: PostToolUse telemetry for MCP tools.

use chrono::Utc;
use hookline_core::{
  record::{HookRecord, McpUsage, mcp_server},
  store::WorkStore,
};
use tracing::debug;

use super::HookContext;
use crate::{
  input::{HookInput, json_size},
  output::HookOutcome,
};

/// Tools called too often to be worth a row each.
const SKIPPED_TOOLS: &[&str] = &["mcp__memory__search_nodes"];

pub async fn run<S: WorkStore>(ctx: &HookContext<S>, input: &HookInput) -> HookOutcome {
  let tool = input.tool_name.as_deref().unwrap_or_default();
  let Some(server) = mcp_server(tool) else {
    return HookOutcome::empty();
  };
  if SKIPPED_TOOLS.contains(&tool) {
    debug!(tool, "skipped tool");
    return HookOutcome::empty();
  }

  let usage = McpUsage {
    tool_name:         tool.to_owned(),
    mcp_server:        server.to_owned(),
    execution_time_ms: input.duration_ms.unwrap_or_default(),
    success:           true,
    error_message:     None,
    input_size_bytes:  json_size(input.tool_input.as_ref()),
    output_size_bytes: json_size(input.tool_response.as_ref()),
    session_id:        ctx.config.session_id.clone().or_else(|| input.session_id.clone()),
    project_name:      Some(input.project_name(&ctx.config)),
    called_at:         Utc::now(),
  }
  .with_error(input.tool_error_text());

  let persisted = ctx.persist_or_queue(HookRecord::McpUsage(usage)).await;
  debug!(tool, ?persisted, "mcp usage recorded");
  HookOutcome::empty()
}
