//! Driver selection: one [`WorkStore`] over whichever backend the
//! connection string names.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use hookline_core::{
  record::{AgentSpawn, McpUsage},
  session::{
    CloseOutcome, ProjectPhase, SessionClose, SessionSnapshot, SessionState, StartedSession,
  },
  store::WorkStore,
};
use hookline_store_pg::{PgStore, PgTimeouts};
use hookline_store_sqlite::SqliteStore;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::HookConfig;

/// Which adapter a connection string selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Driver {
  Postgres(String),
  Sqlite(PathBuf),
}

impl Driver {
  /// `postgres://`/`postgresql://` → Postgres; `sqlite:` URLs and bare
  /// `.db`/`.sqlite`/`.sqlite3` paths → SQLite; anything else → `None`.
  pub fn from_url(url: &str) -> Option<Self> {
    let url = url.trim();
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
      return Some(Self::Postgres(url.to_owned()));
    }
    if let Some(rest) = url.strip_prefix("sqlite:") {
      let path = rest.strip_prefix("//").unwrap_or(rest);
      return (!path.is_empty()).then(|| Self::Sqlite(PathBuf::from(path)));
    }
    let is_db_file = [".db", ".sqlite", ".sqlite3"].iter().any(|ext| url.ends_with(ext));
    is_db_file.then(|| Self::Sqlite(PathBuf::from(url)))
  }
}

#[derive(Debug, Error)]
pub enum StoreError {
  #[error(transparent)]
  Postgres(#[from] hookline_store_pg::Error),
  #[error(transparent)]
  Sqlite(#[from] hookline_store_sqlite::Error),
}

/// The store a hook process talks to.
pub enum AnyStore {
  Postgres(PgStore),
  Sqlite(SqliteStore),
}

/// Open the configured store. `None` when nothing is configured or the
/// backend cannot be reached in time; callers then degrade.
pub async fn connect(config: &HookConfig) -> Option<AnyStore> {
  let Some(url) = config.database_url.as_deref() else {
    debug!("no database configured");
    return None;
  };
  let Some(driver) = Driver::from_url(url) else {
    warn!("unrecognised database url scheme; running without a database");
    return None;
  };

  let result = match driver {
    Driver::Postgres(url) => {
      let timeouts = PgTimeouts {
        connect:   config.connect_timeout,
        statement: config.statement_timeout,
      };
      PgStore::connect(&url, timeouts).await.map(AnyStore::Postgres).map_err(StoreError::from)
    }
    Driver::Sqlite(path) => {
      match tokio::time::timeout(config.connect_timeout, SqliteStore::open(&path)).await {
        Ok(opened) => opened.map(AnyStore::Sqlite).map_err(StoreError::from),
        Err(_) => {
          warn!(path = %path.display(), "timed out opening sqlite store");
          return None;
        }
      }
    }
  };

  match result {
    Ok(store) => Some(store),
    Err(e) => {
      warn!(error = %e, "database unavailable");
      None
    }
  }
}

macro_rules! delegate {
  ($self:ident, $store:ident => $call:expr) => {
    match $self {
      AnyStore::Postgres($store) => Ok($call.await?),
      AnyStore::Sqlite($store) => Ok($call.await?),
    }
  };
}

impl WorkStore for AnyStore {
  type Error = StoreError;

  async fn ping(&self) -> Result<(), StoreError> { delegate!(self, s => s.ping()) }

  async fn valid_values(
    &self,
    table: &str,
    column: &str,
  ) -> Result<Option<Vec<String>>, StoreError> {
    delegate!(self, s => s.valid_values(table, column))
  }

  async fn project_phase(&self, feature_id: Uuid) -> Result<Option<ProjectPhase>, StoreError> {
    delegate!(self, s => s.project_phase(feature_id))
  }

  async fn save_session_state(
    &self,
    project_name: &str,
    snapshot: SessionSnapshot,
  ) -> Result<SessionState, StoreError> {
    delegate!(self, s => s.save_session_state(project_name, snapshot))
  }

  async fn get_session_state(
    &self,
    project_name: &str,
  ) -> Result<Option<SessionState>, StoreError> {
    delegate!(self, s => s.get_session_state(project_name))
  }

  async fn start_session(
    &self,
    project_name: &str,
    at: DateTime<Utc>,
  ) -> Result<StartedSession, StoreError> {
    delegate!(self, s => s.start_session(project_name, at))
  }

  async fn close_session(&self, close: SessionClose) -> Result<CloseOutcome, StoreError> {
    delegate!(self, s => s.close_session(close))
  }

  async fn record_mcp_usage(&self, usage: McpUsage) -> Result<(), StoreError> {
    delegate!(self, s => s.record_mcp_usage(usage))
  }

  async fn record_agent_spawn(&self, spawn: AgentSpawn) -> Result<(), StoreError> {
    delegate!(self, s => s.record_agent_spawn(spawn))
  }
}
