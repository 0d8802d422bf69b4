//! [`PgStore`] — the PostgreSQL implementation of [`WorkStore`].

use std::{str::FromStr, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use sqlx::{
  Connection as _, Executor as _, PgConnection,
  postgres::PgConnectOptions,
  types::Json,
};
use tokio::sync::Mutex;
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

use crate::{Error, Result, schema::SCHEMA};

const REUSE_WINDOW: TimeDelta = TimeDelta::seconds(60);
const CLOSE_WINDOW: TimeDelta = TimeDelta::hours(24);

/// Client-side connect bound and server-side per-statement bound.
#[derive(Debug, Clone, Copy)]
pub struct PgTimeouts {
  pub connect:   Duration,
  pub statement: Duration,
}

impl Default for PgTimeouts {
  fn default() -> Self {
    Self { connect: Duration::from_secs(3), statement: Duration::from_millis(5000) }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A work store backed by a single PostgreSQL connection.
pub struct PgStore {
  conn: Mutex<PgConnection>,
}

impl PgStore {
  /// Connect to `url` (`postgres://…` or `postgresql://…`).
  pub async fn connect(url: &str, timeouts: PgTimeouts) -> Result<Self> {
    let options = PgConnectOptions::from_str(url)?
      .options([("statement_timeout", timeouts.statement.as_millis().to_string())]);

    let conn = tokio::time::timeout(timeouts.connect, PgConnection::connect_with(&options))
      .await
      .map_err(|_| Error::ConnectTimeout(timeouts.connect))??;

    debug!(host = options.get_host(), "connected to postgres");
    Ok(Self { conn: Mutex::new(conn) })
  }

  /// Create the `claude` schema and tables if they are missing.
  pub async fn init_schema(&self) -> Result<()> {
    let mut conn = self.conn.lock().await;
    (&mut *conn).execute(SCHEMA).await?;
    Ok(())
  }

  /// Run raw SQL (several statements allowed) on the store's connection.
  pub async fn execute_batch(&self, sql: &str) -> Result<()> {
    let mut conn = self.conn.lock().await;
    (&mut *conn).execute(sql).await?;
    Ok(())
  }
}

type StateRow = (
  String,
  Json<Vec<serde_json::Value>>,
  Option<String>,
  Json<Vec<serde_json::Value>>,
  Vec<String>,
  DateTime<Utc>,
);

fn state_from_row(row: StateRow) -> SessionState {
  let (project_name, Json(todo_list), current_focus, Json(next_steps), files_modified, updated_at) =
    row;
  SessionState {
    project_name,
    todo_list,
    current_focus: current_focus.unwrap_or_default(),
    // Older rows hold non-string steps; keep them as their JSON text.
    next_steps: next_steps
      .into_iter()
      .map(|v| match v {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
      })
      .collect(),
    files_modified,
    updated_at,
  }
}

// ─── WorkStore impl ──────────────────────────────────────────────────────────

impl WorkStore for PgStore {
  type Error = Error;

  async fn ping(&self) -> Result<()> {
    let mut conn = self.conn.lock().await;
    conn.ping().await?;
    Ok(())
  }

  // ── Constraint registry ───────────────────────────────────────────────────

  async fn valid_values(&self, table: &str, column: &str) -> Result<Option<Vec<String>>> {
    let mut conn = self.conn.lock().await;
    let values: Option<Option<Json<Vec<String>>>> = sqlx::query_scalar(
      "SELECT to_jsonb(valid_values)
       FROM claude.column_registry
       WHERE table_name = $1 AND column_name = $2",
    )
    .bind(table)
    .bind(column)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(values.flatten().map(|Json(v)| v))
  }

  async fn project_phase(&self, feature_id: Uuid) -> Result<Option<ProjectPhase>> {
    let mut conn = self.conn.lock().await;
    let row: Option<(String, String)> = sqlx::query_as(
      "SELECT p.project_name, p.phase
       FROM claude.projects p
       JOIN claude.features f ON f.project_id = p.project_id
       WHERE f.feature_id = $1",
    )
    .bind(feature_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|(project_name, phase)| ProjectPhase { project_name, phase }))
  }

  // ── Session state ─────────────────────────────────────────────────────────

  async fn save_session_state(
    &self,
    project_name: &str,
    snapshot: SessionSnapshot,
  ) -> Result<SessionState> {
    let state = snapshot.into_state(project_name, Utc::now());

    let mut conn = self.conn.lock().await;
    let row: StateRow = sqlx::query_as(
      "INSERT INTO claude.session_state
         (project_name, todo_list, current_focus, next_steps, files_modified, updated_at)
       VALUES ($1, $2, $3, $4, $5, NOW())
       ON CONFLICT (project_name) DO UPDATE SET
         todo_list      = EXCLUDED.todo_list,
         current_focus  = EXCLUDED.current_focus,
         next_steps     = EXCLUDED.next_steps,
         files_modified = EXCLUDED.files_modified,
         updated_at     = NOW()
       RETURNING project_name, todo_list, current_focus, next_steps,
                 files_modified, updated_at",
    )
    .bind(&state.project_name)
    .bind(Json(&state.todo_list))
    .bind(&state.current_focus)
    .bind(Json(&state.next_steps))
    .bind(&state.files_modified)
    .fetch_one(&mut *conn)
    .await?;

    debug!(project = project_name, "saved session state");
    Ok(state_from_row(row))
  }

  async fn get_session_state(&self, project_name: &str) -> Result<Option<SessionState>> {
    let mut conn = self.conn.lock().await;
    let row: Option<StateRow> = sqlx::query_as(
      "SELECT project_name,
              COALESCE(todo_list, '[]'::jsonb),
              current_focus,
              COALESCE(next_steps, '[]'::jsonb),
              COALESCE(files_modified, '{}'::text[]),
              updated_at
       FROM claude.session_state
       WHERE project_name = $1",
    )
    .bind(project_name)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(state_from_row))
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn start_session(&self, project_name: &str, at: DateTime<Utc>) -> Result<StartedSession> {
    let mut conn = self.conn.lock().await;
    let mut tx = conn.begin().await?;

    let existing: Option<Uuid> = sqlx::query_scalar(
      "SELECT session_id FROM claude.sessions
       WHERE project_name = $1 AND session_end IS NULL AND session_start > $2
       ORDER BY session_start DESC
       LIMIT 1",
    )
    .bind(project_name)
    .bind(at - REUSE_WINDOW)
    .fetch_optional(&mut *tx)
    .await?;

    let started = match existing {
      Some(session_id) => StartedSession { session_id, reused: true },
      None => {
        let session_id: Uuid = sqlx::query_scalar(
          "INSERT INTO claude.sessions (session_id, project_name, session_start)
           VALUES (gen_random_uuid(), $1, $2)
           RETURNING session_id",
        )
        .bind(project_name)
        .bind(at)
        .fetch_one(&mut *tx)
        .await?;
        StartedSession { session_id, reused: false }
      }
    };

    tx.commit().await?;
    Ok(started)
  }

  async fn close_session(&self, close: SessionClose) -> Result<CloseOutcome> {
    let mut conn = self.conn.lock().await;
    let mut tx = conn.begin().await?;

    let closed = match close.session_id {
      Some(id) => sqlx::query(
        "UPDATE claude.sessions
         SET session_end = $1, session_summary = COALESCE(session_summary, $2)
         WHERE session_id = $3 AND session_end IS NULL",
      )
      .bind(close.closed_at)
      .bind(AUTO_CLOSE_SUMMARY)
      .bind(id)
      .execute(&mut *tx)
      .await?,
      None => sqlx::query(
        "UPDATE claude.sessions
         SET session_end = $1, session_summary = COALESCE(session_summary, $2)
         WHERE session_id = (
           SELECT session_id FROM claude.sessions
           WHERE project_name = $3 AND session_end IS NULL AND session_start > $4
           ORDER BY session_start DESC
           LIMIT 1
         )",
      )
      .bind(close.closed_at)
      .bind(AUTO_CLOSE_SUMMARY)
      .bind(&close.project_name)
      .bind(close.closed_at - CLOSE_WINDOW)
      .execute(&mut *tx)
      .await?,
    };

    let demoted = sqlx::query(
      "UPDATE claude.todos t
       SET status = 'pending', updated_at = $1
       FROM claude.projects p
       WHERE t.project_id = p.project_id
         AND p.project_name = $2
         AND t.status = 'in_progress'
         AND NOT t.is_deleted",
    )
    .bind(close.closed_at)
    .bind(&close.project_name)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let outcome = CloseOutcome {
      closed:        closed.rows_affected() > 0,
      demoted_todos: demoted.rows_affected(),
    };
    debug!(project = %close.project_name, ?outcome, "closed session");
    Ok(outcome)
  }

  // ── Hook telemetry ────────────────────────────────────────────────────────

  async fn record_mcp_usage(&self, usage: McpUsage) -> Result<()> {
    // Session ids that are not UUIDs cannot be stored; keep the row anyway.
    let session_id = usage.session_id.as_deref().and_then(|s| Uuid::parse_str(s).ok());

    let mut conn = self.conn.lock().await;
    sqlx::query(
      "INSERT INTO claude.mcp_usage (
         mcp_server, tool_name, execution_time_ms, success, error_message,
         input_size_bytes, output_size_bytes, session_id, project_name, called_at
       ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(&usage.mcp_server)
    .bind(&usage.tool_name)
    .bind(usage.execution_time_ms)
    .bind(usage.success)
    .bind(&usage.error_message)
    .bind(usage.input_size_bytes)
    .bind(usage.output_size_bytes)
    .bind(session_id)
    .bind(&usage.project_name)
    .bind(usage.called_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
  }

  async fn record_agent_spawn(&self, spawn: AgentSpawn) -> Result<()> {
    let mut conn = self.conn.lock().await;
    sqlx::query(
      "INSERT INTO claude.agent_sessions (
         session_id, agent_type, task_description, workspace_dir,
         parent_session_id, spawned_at, success
       ) VALUES ($1, $2, $3, $4, $5, $6, NULL)
       ON CONFLICT (session_id) DO UPDATE SET
         task_description  = EXCLUDED.task_description,
         parent_session_id = EXCLUDED.parent_session_id",
    )
    .bind(&spawn.session_id)
    .bind(&spawn.agent_type)
    .bind(&spawn.task_description)
    .bind(&spawn.workspace_dir)
    .bind(spawn.parent_session_id)
    .bind(spawn.spawned_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
  }
}
