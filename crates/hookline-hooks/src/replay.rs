//! Replay dispatch: fallback entries back into the database.

use std::collections::BTreeMap;

use hookline_core::{record::HookRecord, store::WorkStore};
use hookline_fallback::{Error as FallbackError, FallbackLog};
use serde::Serialize;
use tracing::{info, warn};

/// Apply one decoded record to the store.
pub async fn apply<S: WorkStore>(store: &S, record: HookRecord) -> Result<(), S::Error> {
  match record {
    HookRecord::McpUsage(usage) => store.record_mcp_usage(usage).await,
    HookRecord::AgentSpawn(spawn) => store.record_agent_spawn(spawn).await,
    HookRecord::SessionClose(close) => store.close_session(close).await.map(|_| ()),
  }
}

/// Decode and apply one fallback payload. Anything that goes wrong leaves
/// the entry pending.
pub async fn replay_record<S: WorkStore>(store: &S, hook: &str, data: serde_json::Value) -> bool {
  let record = match HookRecord::from_payload(hook, data) {
    Ok(record) => record,
    Err(e) => {
      warn!(hook, error = %e, "fallback entry does not decode");
      return false;
    }
  };
  match apply(store, record).await {
    Ok(()) => true,
    Err(e) => {
      warn!(hook, error = %e, "fallback entry replay failed");
      false
    }
  }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
  /// Entries replayed per hook.
  pub replayed:  BTreeMap<String, usize>,
  /// Hooks another process was already replaying.
  pub busy:      Vec<String>,
  /// Hooks whose log could not be read or rewritten.
  pub failed:    Vec<String>,
  /// Pending entries left afterwards.
  pub remaining: BTreeMap<String, usize>,
}

impl ReplayReport {
  pub fn total(&self) -> usize { self.replayed.values().sum() }
}

/// Replay every pending log (or only `only`), at most `max_entries` per
/// hook.
pub async fn replay_all<S: WorkStore>(
  store: &S,
  log: &FallbackLog,
  only: Option<&str>,
  max_entries: usize,
) -> ReplayReport {
  let mut report = ReplayReport::default();
  let hooks: Vec<String> = match only {
    Some(hook) => vec![hook.to_owned()],
    None => log.all_pending().into_keys().collect(),
  };

  for hook in &hooks {
    let result = log
      .replay(hook, max_entries, |data| replay_record(store, hook, data))
      .await;
    match result {
      Ok(0) => {}
      Ok(n) => {
        info!(hook = %hook, replayed = n, "replayed fallback entries");
        report.replayed.insert(hook.clone(), n);
      }
      Err(FallbackError::Busy(_)) => {
        info!(hook = %hook, "replay already running elsewhere");
        report.busy.push(hook.clone());
      }
      Err(e) => {
        warn!(hook = %hook, error = %e, "replay failed");
        report.failed.push(hook.clone());
      }
    }
  }

  report.remaining = log.all_pending();
  report
}
