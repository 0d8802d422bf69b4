//! `session-start`: replay queued records, register the session and hand the
//! saved state back to the assistant.
//!
//! This is the one place replay runs automatically.

use std::fmt::Write as _;

use chrono::Utc;
use hookline_core::{
  session::{SessionState, StartedSession},
  store::WorkStore,
};
use serde_json::json;
use tracing::{info, warn};

use super::HookContext;
use crate::{
  input::HookInput,
  output::HookOutcome,
  replay::{self, ReplayReport},
};

pub async fn run<S: WorkStore>(ctx: &HookContext<S>, input: &HookInput) -> HookOutcome {
  let project = input.project_name(&ctx.config);

  let Some(store) = ctx.store() else {
    let pending: usize = ctx.fallback.all_pending().values().sum();
    warn!(project = %project, pending, "session start without database");
    let message = if pending > 0 {
      format!("Database unavailable; {pending} hook records queued for replay")
    } else {
      "Database unavailable; session not registered".to_owned()
    };
    return HookOutcome::json(json!({ "additionalContext": message, "systemMessage": message }));
  };

  let report = replay::replay_all(store, &ctx.fallback, None, ctx.config.replay_max).await;

  let started = match store.start_session(&project, Utc::now()).await {
    Ok(started) => Some(started),
    Err(e) => {
      warn!(project = %project, error = %e, "could not register session");
      None
    }
  };
  let state = store.get_session_state(&project).await.unwrap_or_else(|e| {
    warn!(project = %project, error = %e, "could not load session state");
    None
  });

  if let Some(s) = started {
    info!(project = %project, session = %s.session_id, reused = s.reused, "session started");
  }
  HookOutcome::json(json!({
    "additionalContext": context_text(&project, started, state.as_ref(), &report),
    "systemMessage": system_message(&project, started, &report),
  }))
}

fn context_text(
  project: &str,
  started: Option<StartedSession>,
  state: Option<&SessionState>,
  report: &ReplayReport,
) -> String {
  let mut out = format!("## Session: {project}\n");
  if let Some(s) = started {
    let verb = if s.reused { "Resumed" } else { "Started" };
    let _ = writeln!(out, "{verb} session {}", s.session_id);
  }

  match state {
    Some(state) => {
      let _ = writeln!(out, "\nPrevious state (saved {}):", state.updated_at.format("%Y-%m-%d %H:%M"));
      if !state.current_focus.is_empty() {
        let _ = writeln!(out, "Focus: {}", state.current_focus);
      }
      if !state.next_steps.is_empty() {
        out.push_str("Next steps:\n");
        for step in &state.next_steps {
          let _ = writeln!(out, "- {step}");
        }
      }
      if !state.todo_list.is_empty() {
        let _ = writeln!(out, "Saved todos: {}", state.todo_list.len());
      }
    }
    None => out.push_str("\nNo saved state for this project.\n"),
  }

  if report.total() > 0 {
    let _ = writeln!(out, "\nReplayed {} queued hook records.", report.total());
  }
  let remaining: usize = report.remaining.values().sum();
  if remaining > 0 {
    let _ = writeln!(out, "{remaining} hook records still queued.");
  }
  out
}

fn system_message(
  project: &str,
  started: Option<StartedSession>,
  report: &ReplayReport,
) -> String {
  let mut msg = match started {
    Some(s) if s.reused => format!("Resumed session for {project}"),
    Some(_) => format!("Session started for {project}"),
    None => format!("Session for {project} not registered"),
  };
  if report.total() > 0 {
    let _ = write!(msg, "; replayed {} queued records", report.total());
  }
  msg
}

#[cfg(test)]
mod tests {
  use hookline_core::{
    record::{AgentSpawn, HookRecord},
    session::SessionSnapshot,
  };

  use super::*;
  use crate::{handlers::test_support::context, testing::MemoryStore};

  fn input() -> HookInput { HookInput { cwd: Some("/work/hookline".into()), ..Default::default() } }

  #[tokio::test]
  async fn replays_queue_and_restores_state() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::default();
    store
      .save_session_state("hookline", SessionSnapshot {
        current_focus: "replay engine".into(),
        next_steps: vec!["write docs".into()],
        ..Default::default()
      })
      .await
      .unwrap();
    let ctx = context(dir.path(), Some(store));

    let spawn = AgentSpawn::new("a-1", None, None, None, None, Utc::now());
    ctx.queue(&HookRecord::AgentSpawn(spawn));

    let out = run(&ctx, &input()).await;
    assert_eq!(out.exit, 0);
    let text = out.output["additionalContext"].as_str().unwrap();
    assert!(text.contains("Focus: replay engine"), "{text}");
    assert!(text.contains("- write docs"), "{text}");
    assert!(text.contains("Replayed 1 queued"), "{text}");
    assert_eq!(ctx.fallback.pending_count("subagent_start"), 0);
    assert_eq!(ctx.store().unwrap().spawns().len(), 1);
  }

  #[tokio::test]
  async fn second_start_within_a_minute_reuses_session() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path(), Some(MemoryStore::default()));
    run(&ctx, &input()).await;
    let out = run(&ctx, &input()).await;
    assert!(out.output["systemMessage"].as_str().unwrap().starts_with("Resumed"));
    assert_eq!(ctx.store().unwrap().sessions().len(), 1);
  }

  #[tokio::test]
  async fn without_database_reports_queue() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path(), None);
    let spawn = AgentSpawn::new("a-1", None, None, None, None, Utc::now());
    ctx.queue(&HookRecord::AgentSpawn(spawn));

    let out = run(&ctx, &input()).await;
    assert_eq!(out.exit, 0);
    assert!(out.output["systemMessage"].as_str().unwrap().contains("1 hook records queued"));
  }
}
