//! `validate-write`: the PreToolUse gate over database writes.

use hookline_core::{store::WorkStore, write::WriteRequest};
use hookline_sql::Error as SqlError;
use tracing::debug;

use super::HookContext;
use crate::{guard, input::HookInput, output::HookOutcome};

/// Only tools whose name mentions `postgres` or `execute` are checked.
pub fn is_database_tool(tool_name: &str) -> bool {
  let lower = tool_name.to_ascii_lowercase();
  lower.contains("postgres") || lower.contains("execute")
}

pub async fn run<S: WorkStore>(ctx: &HookContext<S>, input: &HookInput) -> HookOutcome {
  let tool = input.tool_name.as_deref().unwrap_or_default();
  if !is_database_tool(tool) {
    return HookOutcome::allow(format!("Not a database operation: {tool}"));
  }

  let request = match structured_request(input) {
    Some(request) => request,
    None => {
      let Some(sql) = input.sql() else {
        return HookOutcome::allow("No SQL provided");
      };
      if !hookline_sql::mentions_write(sql) {
        return HookOutcome::allow("Not an INSERT/UPDATE operation");
      }
      match hookline_sql::classify(sql) {
        Ok(request) => request,
        Err(SqlError::NotAWrite) => return HookOutcome::allow("Not an INSERT/UPDATE operation"),
        Err(e) => {
          debug!(error = %e, "could not classify write");
          return HookOutcome::allow(format!("Could not classify statement ({e}); not checked"));
        }
      }
    }
  };

  let decision = guard::evaluate(ctx.store(), &ctx.rules, &request).await;
  HookOutcome::decision(&decision)
}

/// A `tool_input` that already names `operation`, `table` and `columns`.
fn structured_request(input: &HookInput) -> Option<WriteRequest> {
  let value = input.tool_input.as_ref()?;
  if value.get("operation").is_none() || value.get("table").is_none() {
    return None;
  }
  serde_json::from_value::<WriteRequest>(value.clone()).ok().map(WriteRequest::normalized)
}
