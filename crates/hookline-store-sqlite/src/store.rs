//! [`SqliteStore`] — the SQLite implementation of [`WorkStore`].

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use rusqlite::OptionalExtension as _;
use tracing::debug;
use uuid::Uuid;

use hookline_core::{
  record::{AgentSpawn, McpUsage},
  session::{
    AUTO_CLOSE_SUMMARY, CloseOutcome, ProjectPhase, SessionClose, SessionSnapshot,
    SessionState, StartedSession,
  },
  store::WorkStore,
};

use crate::{
  Error, Result,
  encode::{RawSessionState, decode_list, decode_uuid, encode_dt, encode_list, encode_uuid},
  schema::SCHEMA,
};

/// Sessions opened this recently are reused instead of duplicated.
const REUSE_WINDOW: Duration = Duration::seconds(60);
/// Auto-close only looks this far back for an open session.
const CLOSE_WINDOW: Duration = Duration::hours(24);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A hookline work store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self.execute_batch(SCHEMA).await
  }

  /// Run raw SQL (several statements allowed). Used to seed the registry,
  /// projects and features from fixtures.
  pub async fn execute_batch(&self, sql: impl Into<String>) -> Result<()> {
    let sql = sql.into();
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── WorkStore impl ──────────────────────────────────────────────────────────

impl WorkStore for SqliteStore {
  type Error = Error;

  async fn ping(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Constraint registry ───────────────────────────────────────────────────

  async fn valid_values(&self, table: &str, column: &str) -> Result<Option<Vec<String>>> {
    let table = table.to_owned();
    let column = column.to_owned();

    let raw: Option<Option<String>> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT valid_values FROM column_registry
               WHERE table_name = ?1 AND column_name = ?2",
              rusqlite::params![table, column],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.flatten().as_deref().map(decode_list::<String>).transpose()
  }

  async fn project_phase(&self, feature_id: Uuid) -> Result<Option<ProjectPhase>> {
    let id_str = encode_uuid(feature_id);

    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT p.project_name, p.phase
                 FROM projects p
                 JOIN features f ON f.project_id = p.project_id
                 WHERE f.feature_id = ?1",
                rusqlite::params![id_str],
                |row| Ok(ProjectPhase { project_name: row.get(0)?, phase: row.get(1)? }),
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  // ── Session state ─────────────────────────────────────────────────────────

  async fn save_session_state(
    &self,
    project_name: &str,
    snapshot: SessionSnapshot,
  ) -> Result<SessionState> {
    let state = snapshot.into_state(project_name, Utc::now());

    let name   = state.project_name.clone();
    let todos  = encode_list(&state.todo_list)?;
    let focus  = state.current_focus.clone();
    let next   = encode_list(&state.next_steps)?;
    let files  = encode_list(&state.files_modified)?;
    let at_str = encode_dt(state.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO session_state
             (project_name, todo_list, current_focus, next_steps, files_modified, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (project_name) DO UPDATE SET
             todo_list      = excluded.todo_list,
             current_focus  = excluded.current_focus,
             next_steps     = excluded.next_steps,
             files_modified = excluded.files_modified,
             updated_at     = excluded.updated_at",
          rusqlite::params![name, todos, focus, next, files, at_str],
        )?;
        Ok(())
      })
      .await?;

    debug!(project = %state.project_name, "saved session state");
    Ok(state)
  }

  async fn get_session_state(&self, project_name: &str) -> Result<Option<SessionState>> {
    let name = project_name.to_owned();

    let raw: Option<RawSessionState> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT project_name, todo_list, current_focus, next_steps,
                      files_modified, updated_at
               FROM session_state WHERE project_name = ?1",
              rusqlite::params![name],
              RawSessionState::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSessionState::into_state).transpose()
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn start_session(&self, project_name: &str, at: DateTime<Utc>) -> Result<StartedSession> {
    let name = project_name.to_owned();
    let cutoff = encode_dt(at - REUSE_WINDOW);
    let at_str = encode_dt(at);
    let fresh = encode_uuid(Uuid::new_v4());

    let (id_str, reused): (String, bool) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let existing: Option<String> = tx
          .query_row(
            "SELECT session_id FROM sessions
             WHERE project_name = ?1 AND session_end IS NULL AND session_start > ?2
             ORDER BY session_start DESC LIMIT 1",
            rusqlite::params![name, cutoff],
            |row| row.get(0),
          )
          .optional()?;

        let out = match existing {
          Some(id) => (id, true),
          None => {
            tx.execute(
              "INSERT INTO sessions (session_id, project_name, session_start)
               VALUES (?1, ?2, ?3)",
              rusqlite::params![fresh, name, at_str],
            )?;
            (fresh, false)
          }
        };
        tx.commit()?;
        Ok(out)
      })
      .await?;

    Ok(StartedSession { session_id: decode_uuid(&id_str)?, reused })
  }

  async fn close_session(&self, close: SessionClose) -> Result<CloseOutcome> {
    let session_id = close.session_id.map(encode_uuid);
    let project = close.project_name.clone();
    let at_str = encode_dt(close.closed_at);
    let cutoff = encode_dt(close.closed_at - CLOSE_WINDOW);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let closed = match session_id {
          Some(id) => tx.execute(
            "UPDATE sessions
             SET session_end = ?1, session_summary = COALESCE(session_summary, ?2)
             WHERE session_id = ?3 AND session_end IS NULL",
            rusqlite::params![at_str, AUTO_CLOSE_SUMMARY, id],
          )?,
          None => tx.execute(
            "UPDATE sessions
             SET session_end = ?1, session_summary = COALESCE(session_summary, ?2)
             WHERE session_id = (
               SELECT session_id FROM sessions
               WHERE project_name = ?3 AND session_end IS NULL AND session_start > ?4
               ORDER BY session_start DESC LIMIT 1
             )",
            rusqlite::params![at_str, AUTO_CLOSE_SUMMARY, project, cutoff],
          )?,
        };

        let demoted = tx.execute(
          "UPDATE todos SET status = 'pending', updated_at = ?1
           WHERE status = 'in_progress' AND is_deleted = 0
             AND project_id IN (SELECT project_id FROM projects WHERE project_name = ?2)",
          rusqlite::params![at_str, project],
        )?;

        tx.commit()?;
        Ok(CloseOutcome { closed: closed > 0, demoted_todos: demoted as u64 })
      })
      .await?;

    debug!(project = %close.project_name, ?outcome, "closed session");
    Ok(outcome)
  }

  // ── Hook telemetry ────────────────────────────────────────────────────────

  async fn record_mcp_usage(&self, usage: McpUsage) -> Result<()> {
    let called_at = encode_dt(usage.called_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO mcp_usage (
             mcp_server, tool_name, execution_time_ms, success, error_message,
             input_size_bytes, output_size_bytes, session_id, project_name, called_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            usage.mcp_server,
            usage.tool_name,
            usage.execution_time_ms,
            usage.success,
            usage.error_message,
            usage.input_size_bytes,
            usage.output_size_bytes,
            usage.session_id,
            usage.project_name,
            called_at,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn record_agent_spawn(&self, spawn: AgentSpawn) -> Result<()> {
    let parent = spawn.parent_session_id.map(encode_uuid);
    let spawned_at = encode_dt(spawn.spawned_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO agent_sessions (
             session_id, agent_type, task_description, workspace_dir,
             parent_session_id, spawned_at, success
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL)
           ON CONFLICT (session_id) DO UPDATE SET
             task_description  = excluded.task_description,
             parent_session_id = excluded.parent_session_id",
          rusqlite::params![
            spawn.session_id,
            spawn.agent_type,
            spawn.task_description,
            spawn.workspace_dir,
            parent,
            spawned_at,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
