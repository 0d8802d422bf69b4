//! The `WorkStore` trait.
//!
//! The trait is implemented by storage backends (`hookline-store-pg`,
//! `hookline-store-sqlite`). The interceptor, the replay dispatcher and the
//! hook handlers depend on this abstraction, never on a concrete driver.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  record::{AgentSpawn, McpUsage},
  session::{
    CloseOutcome, ProjectPhase, SessionClose, SessionSnapshot, SessionState, StartedSession,
  },
};

/// Abstraction over the work-tracking database.
///
/// Implementations hold exactly one connection and carry their own connect
/// and statement timeouts; callers treat every error as "database
/// unavailable" and degrade instead of failing.
pub trait WorkStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Cheap liveness check (`SELECT 1`).
  fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Constraint registry ───────────────────────────────────────────────

  /// Allowed values for `table.column` from the column registry. `None` when
  /// the registry has no entry (the column is then unconstrained).
  fn valid_values<'a>(
    &'a self,
    table: &'a str,
    column: &'a str,
  ) -> impl Future<Output = Result<Option<Vec<String>>, Self::Error>> + Send + 'a;

  /// The project (and its phase) that owns `feature_id`. `None` if the
  /// feature or its project does not exist.
  fn project_phase(
    &self,
    feature_id: Uuid,
  ) -> impl Future<Output = Result<Option<ProjectPhase>, Self::Error>> + Send + '_;

  // ── Session state ─────────────────────────────────────────────────────

  /// Upsert the state row for `project_name`: insert, or replace every
  /// mutable field and refresh `updated_at`.
  fn save_session_state<'a>(
    &'a self,
    project_name: &'a str,
    snapshot: SessionSnapshot,
  ) -> impl Future<Output = Result<SessionState, Self::Error>> + Send + 'a;

  fn get_session_state<'a>(
    &'a self,
    project_name: &'a str,
  ) -> impl Future<Output = Result<Option<SessionState>, Self::Error>> + Send + 'a;

  // ── Sessions ──────────────────────────────────────────────────────────

  /// Register a session start, reusing an open session for the same project
  /// that began less than a minute before `at`.
  fn start_session<'a>(
    &'a self,
    project_name: &'a str,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<StartedSession, Self::Error>> + Send + 'a;

  /// Mark a session ended (keeping any existing summary) and demote the
  /// project's `in_progress` todos to `pending`, in one transaction.
  fn close_session(
    &self,
    close: SessionClose,
  ) -> impl Future<Output = Result<CloseOutcome, Self::Error>> + Send + '_;

  // ── Hook telemetry ────────────────────────────────────────────────────

  fn record_mcp_usage(
    &self,
    usage: McpUsage,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Upsert keyed by the sub-agent's `session_id`.
  fn record_agent_spawn(
    &self,
    spawn: AgentSpawn,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
