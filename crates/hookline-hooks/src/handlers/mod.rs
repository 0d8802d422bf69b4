//! One module per hook subcommand.
//!
//! Handlers take the parsed [`HookInput`](crate::input::HookInput) and a
//! [`HookContext`] and return a [`HookOutcome`](crate::output::HookOutcome).
//! They never return errors; whatever goes wrong is logged and degraded.

pub mod fallback;
pub mod mcp_usage;
pub mod session_end;
pub mod session_start;
pub mod subagent_start;
pub mod validate_write;

use hookline_core::{record::HookRecord, rules::RuleSet, store::WorkStore};
use hookline_fallback::FallbackLog;
use tracing::{debug, error, warn};

use crate::{config::HookConfig, replay};

/// Everything a handler may touch, built once per process.
pub struct HookContext<S> {
  pub config:   HookConfig,
  pub store:    Option<S>,
  pub fallback: FallbackLog,
  pub rules:    RuleSet,
}

/// Where a telemetry record ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persisted {
  Stored,
  Queued,
  Lost,
}

impl<S: WorkStore> HookContext<S> {
  pub fn new(config: HookConfig, store: Option<S>) -> Self {
    let fallback = FallbackLog::new(config.fallback_dir.clone());
    Self { config, store, fallback, rules: RuleSet::standard() }
  }

  pub fn store(&self) -> Option<&S> { self.store.as_ref() }

  /// Write `record` to the database, or append it to its hook's fallback
  /// log when there is no database or the write fails.
  pub async fn persist_or_queue(&self, record: HookRecord) -> Persisted {
    let hook = record.hook_name();
    if let Some(store) = self.store() {
      match replay::apply(store, record.clone()).await {
        Ok(()) => {
          debug!(hook, "record stored");
          return Persisted::Stored;
        }
        Err(e) => warn!(hook, error = %e, "store write failed; queueing"),
      }
    }
    self.queue(&record)
  }

  pub fn queue(&self, record: &HookRecord) -> Persisted {
    let hook = record.hook_name();
    let payload = match record.to_payload() {
      Ok(payload) => payload,
      Err(e) => {
        error!(hook, error = %e, "record does not serialize; dropped");
        return Persisted::Lost;
      }
    };
    if self.fallback.append(hook, &payload) { Persisted::Queued } else { Persisted::Lost }
  }
}
