//! `session-end`: save the session state, then auto-close the session.

use chrono::Utc;
use hookline_core::{record::HookRecord, session::SessionClose, store::WorkStore};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use super::{HookContext, Persisted};
use crate::{input::HookInput, output::HookOutcome, session};

pub async fn run<S: WorkStore>(ctx: &HookContext<S>, input: &HookInput) -> HookOutcome {
  let project = input.project_name(&ctx.config);
  let saved = session::save(ctx.store(), &project, input.snapshot.clone()).await;

  let session_id = input
    .session_id
    .as_deref()
    .or(ctx.config.session_id.as_deref())
    .and_then(|id| Uuid::parse_str(id).ok());
  let close = SessionClose { session_id, project_name: project.clone(), closed_at: Utc::now() };

  let closed = match ctx.store() {
    Some(store) => match store.close_session(close.clone()).await {
      Ok(outcome) => {
        info!(
          project = %project,
          closed = outcome.closed,
          demoted = outcome.demoted_todos,
          "session closed"
        );
        let mut msg = if outcome.closed { "session closed" } else { "no open session" }.to_owned();
        if outcome.demoted_todos > 0 {
          msg.push_str(&format!(", {} todos back to pending", outcome.demoted_todos));
        }
        msg
      }
      Err(e) => {
        warn!(project = %project, error = %e, "session close failed; queueing");
        queued_message(ctx.queue(&HookRecord::SessionClose(close)))
      }
    },
    None => queued_message(ctx.queue(&HookRecord::SessionClose(close))),
  };

  let exit = if saved.success { 0 } else { 1 };
  HookOutcome::json(json!({ "systemMessage": format!("{}; {closed}", saved.message) }))
    .with_exit(exit)
}

fn queued_message(persisted: Persisted) -> String {
  match persisted {
    Persisted::Queued => "session close queued for replay".to_owned(),
    _ => "session close could not be recorded".to_owned(),
  }
}

#[cfg(test)]
mod tests {
  use hookline_core::record::SESSION_END;
  use serde_json::json;

  use super::*;
  use crate::{handlers::test_support::context, testing::MemoryStore};

  fn input() -> HookInput {
    serde_json::from_value(json!({
      "cwd": "/work/hookline",
      "current_focus": "handlers",
      "todo_list": [{"content": "finish", "status": "in_progress"}],
    }))
    .unwrap()
  }

  #[tokio::test]
  async fn saves_state_and_closes_newest_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::default().with_in_progress_todos("hookline", 2);
    store.start_session("hookline", Utc::now()).await.unwrap();
    let ctx = context(dir.path(), Some(store));

    let out = run(&ctx, &input()).await;
    assert_eq!(out.exit, 0);
    let msg = out.output["systemMessage"].as_str().unwrap();
    assert!(msg.contains("session closed, 2 todos back to pending"), "{msg}");

    let store = ctx.store().unwrap();
    assert!(store.sessions()[0].ended_at.is_some());
    let state = store.get_session_state("hookline").await.unwrap().unwrap();
    assert_eq!(state.current_focus, "handlers");
  }

  #[tokio::test]
  async fn without_database_queues_close_and_warns() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path(), None);
    let out = run(&ctx, &input()).await;
    assert_eq!(out.exit, 1);
    assert_eq!(ctx.fallback.pending_count(SESSION_END), 1);

    let entry = &ctx.fallback.entries(SESSION_END).unwrap()[0];
    assert_eq!(entry.data["project_name"], "hookline");
  }

  #[tokio::test]
  async fn failing_store_queues_close() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path(), Some(MemoryStore::failing()));
    let out = run(&ctx, &input()).await;
    assert_eq!(out.exit, 1);
    assert_eq!(ctx.fallback.pending_count(SESSION_END), 1);
  }
}
