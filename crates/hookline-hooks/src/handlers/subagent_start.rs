//! `subagent-start`: record which agent was spawned, by whom, for what.

use chrono::Utc;
use hookline_core::{
  record::{AgentSpawn, HookRecord},
  store::WorkStore,
};
use tracing::{debug, info};

use super::HookContext;
use crate::{input::HookInput, output::HookOutcome};

pub async fn run<S: WorkStore>(ctx: &HookContext<S>, input: &HookInput) -> HookOutcome {
  let Some(subagent_id) = input.subagent_id.as_deref().filter(|id| !id.is_empty()) else {
    debug!("subagent start without an id; nothing recorded");
    return HookOutcome::empty();
  };

  let workspace = input
    .workspace_dir
    .clone()
    .or_else(|| input.cwd.as_ref().map(|p| p.display().to_string()));
  let parent = input.session_id.as_deref().or(ctx.config.session_id.as_deref());
  let spawn = AgentSpawn::new(
    subagent_id,
    input.subagent_type.as_deref(),
    input.task_prompt.as_deref(),
    workspace.as_deref(),
    parent,
    Utc::now(),
  );

  let persisted = ctx.persist_or_queue(HookRecord::AgentSpawn(spawn)).await;
  info!(subagent = subagent_id, ?persisted, "subagent spawn recorded");
  HookOutcome::empty()
}

#[cfg(test)]
mod tests {
  use hookline_core::record::SUBAGENT_START;
  use serde_json::json;
  use uuid::Uuid;

  use super::*;
  use crate::{handlers::test_support::context, testing::MemoryStore};

  fn input(parent: &str) -> HookInput {
    serde_json::from_value(json!({
      "subagent_id": "agent-1",
      "subagent_type": "reviewer",
      "task_prompt": "review the replay engine",
      "session_id": parent,
      "cwd": "/work/hookline",
    }))
    .unwrap()
  }

  #[tokio::test]
  async fn spawn_is_stored() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path(), Some(MemoryStore::default()));
    let parent = Uuid::new_v4();

    let out = run(&ctx, &input(&parent.to_string())).await;
    assert_eq!(out, HookOutcome::empty());

    let spawns = ctx.store().unwrap().spawns();
    assert_eq!(spawns.len(), 1);
    assert_eq!(spawns[0].agent_type, "reviewer");
    assert_eq!(spawns[0].workspace_dir, "/work/hookline");
    assert_eq!(spawns[0].parent_session_id, Some(parent));
  }

  #[tokio::test]
  async fn outage_queues_spawn() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path(), Some(MemoryStore::failing()));
    run(&ctx, &input("not-a-uuid")).await;
    assert_eq!(ctx.fallback.pending_count(SUBAGENT_START), 1);
  }

  #[tokio::test]
  async fn missing_id_records_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path(), None);
    run(&ctx, &HookInput::default()).await;
    assert!(ctx.fallback.all_pending().is_empty());
  }
}
