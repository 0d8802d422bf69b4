//! `fallback status` and `fallback replay`: manual access to the queue.

use hookline_core::store::WorkStore;
use serde_json::json;
use tracing::warn;

use super::HookContext;
use crate::{output::HookOutcome, replay};

pub fn status<S: WorkStore>(ctx: &HookContext<S>) -> HookOutcome {
  let pending = ctx.fallback.all_pending();
  let total: usize = pending.values().sum();
  HookOutcome::json(json!({
    "directory": ctx.fallback.dir(),
    "pending": pending,
    "total": total,
  }))
}

/// Exit 1 when there is no database or something stayed pending.
pub async fn replay<S: WorkStore>(
  ctx: &HookContext<S>,
  hook: Option<&str>,
  max_entries: Option<usize>,
) -> HookOutcome {
  let Some(store) = ctx.store() else {
    warn!("replay requested without a database");
    return HookOutcome::json(json!({
      "error": "Database not available",
      "pending": ctx.fallback.all_pending(),
    }))
    .with_exit(1);
  };

  let max = max_entries.unwrap_or(ctx.config.replay_max);
  let report = replay::replay_all(store, &ctx.fallback, hook, max).await;
  let exit = if report.failed.is_empty() && report.remaining.is_empty() { 0 } else { 1 };
  match serde_json::to_value(&report) {
    Ok(value) => HookOutcome::json(value).with_exit(exit),
    Err(_) => HookOutcome::empty().with_exit(exit),
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use hookline_core::record::{AgentSpawn, HookRecord, SUBAGENT_START};

  use super::*;
  use crate::{handlers::test_support::context, testing::MemoryStore};

  fn queue_spawns(ctx: &HookContext<MemoryStore>, n: usize) {
    for i in 0..n {
      let spawn = AgentSpawn::new(&format!("a-{i}"), None, None, None, None, Utc::now());
      ctx.queue(&HookRecord::AgentSpawn(spawn));
    }
  }

  #[test]
  fn status_lists_pending_counts() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path(), None);
    queue_spawns(&ctx, 2);

    let out = status(&ctx);
    assert_eq!(out.output["pending"][SUBAGENT_START], 2);
    assert_eq!(out.output["total"], 2);
  }

  #[tokio::test]
  async fn bounded_manual_replay() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path(), Some(MemoryStore::default()));
    queue_spawns(&ctx, 3);

    let out = replay(&ctx, Some(SUBAGENT_START), Some(2)).await;
    assert_eq!(out.exit, 1);
    assert_eq!(out.output["replayed"][SUBAGENT_START], 2);
    assert_eq!(out.output["remaining"][SUBAGENT_START], 1);

    let out = replay(&ctx, None, None).await;
    assert_eq!(out.exit, 0);
    assert!(!ctx.fallback.path(SUBAGENT_START).unwrap().exists());
  }

  #[tokio::test]
  async fn replay_without_database_fails_softly() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path(), None);
    let out = replay(&ctx, None, None).await;
    assert_eq!(out.exit, 1);
    assert_eq!(out.output["error"], "Database not available");
  }
}
