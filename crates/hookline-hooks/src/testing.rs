//! An in-memory [`WorkStore`] for interceptor and handler tests.

use std::{
  collections::{BTreeMap, HashMap},
  sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
  },
};

use chrono::{DateTime, TimeDelta, Utc};
use hookline_core::{
  record::{AgentSpawn, McpUsage},
  session::{
    CloseOutcome, ProjectPhase, SessionClose, SessionSnapshot, SessionState, StartedSession,
  },
  store::WorkStore,
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
#[error("store unavailable")]
pub struct Unavailable;

#[derive(Debug, Clone)]
pub struct OpenSession {
  pub id:         Uuid,
  pub project:    String,
  pub started_at: DateTime<Utc>,
  pub ended_at:   Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct MemoryStore {
  fail:        AtomicBool,
  registry:    HashMap<(String, String), Vec<String>>,
  phases:      HashMap<Uuid, ProjectPhase>,
  states:      Mutex<BTreeMap<String, SessionState>>,
  sessions:    Mutex<Vec<OpenSession>>,
  in_progress: Mutex<HashMap<String, u64>>,
  usage:       Mutex<Vec<McpUsage>>,
  spawns:      Mutex<Vec<AgentSpawn>>,
}

impl MemoryStore {
  /// A store whose every call fails.
  pub fn failing() -> Self {
    let store = Self::default();
    store.set_failing(true);
    store
  }

  pub fn set_failing(&self, fail: bool) { self.fail.store(fail, Ordering::SeqCst); }

  pub fn with_registry(mut self, table: &str, column: &str, values: &[&str]) -> Self {
    self.registry.insert(
      (table.into(), column.into()),
      values.iter().map(|v| (*v).to_owned()).collect(),
    );
    self
  }

  pub fn with_phase(mut self, feature: Uuid, project: &str, phase: &str) -> Self {
    self
      .phases
      .insert(feature, ProjectPhase { project_name: project.into(), phase: phase.into() });
    self
  }

  pub fn with_in_progress_todos(self, project: &str, count: u64) -> Self {
    self.in_progress.lock().unwrap().insert(project.into(), count);
    self
  }

  pub fn usage(&self) -> Vec<McpUsage> { self.usage.lock().unwrap().clone() }

  pub fn spawns(&self) -> Vec<AgentSpawn> { self.spawns.lock().unwrap().clone() }

  pub fn sessions(&self) -> Vec<OpenSession> { self.sessions.lock().unwrap().clone() }

  pub fn state_count(&self) -> usize { self.states.lock().unwrap().len() }

  fn check(&self) -> Result<(), Unavailable> {
    if self.fail.load(Ordering::SeqCst) { Err(Unavailable) } else { Ok(()) }
  }
}

impl WorkStore for MemoryStore {
  type Error = Unavailable;

  async fn ping(&self) -> Result<(), Unavailable> { self.check() }

  async fn valid_values(
    &self,
    table: &str,
    column: &str,
  ) -> Result<Option<Vec<String>>, Unavailable> {
    self.check()?;
    Ok(self.registry.get(&(table.to_owned(), column.to_owned())).cloned())
  }

  async fn project_phase(&self, feature_id: Uuid) -> Result<Option<ProjectPhase>, Unavailable> {
    self.check()?;
    Ok(self.phases.get(&feature_id).cloned())
  }

  async fn save_session_state(
    &self,
    project_name: &str,
    snapshot: SessionSnapshot,
  ) -> Result<SessionState, Unavailable> {
    self.check()?;
    let state = snapshot.into_state(project_name, Utc::now());
    self.states.lock().unwrap().insert(project_name.to_owned(), state.clone());
    Ok(state)
  }

  async fn get_session_state(
    &self,
    project_name: &str,
  ) -> Result<Option<SessionState>, Unavailable> {
    self.check()?;
    Ok(self.states.lock().unwrap().get(project_name).cloned())
  }

  async fn start_session(
    &self,
    project_name: &str,
    at: DateTime<Utc>,
  ) -> Result<StartedSession, Unavailable> {
    self.check()?;
    let mut sessions = self.sessions.lock().unwrap();
    let recent = sessions.iter().find(|s| {
      s.project == project_name && s.ended_at.is_none() && at - s.started_at < TimeDelta::seconds(60)
    });
    if let Some(s) = recent {
      return Ok(StartedSession { session_id: s.id, reused: true });
    }
    let id = Uuid::new_v4();
    sessions.push(OpenSession {
      id,
      project: project_name.to_owned(),
      started_at: at,
      ended_at: None,
    });
    Ok(StartedSession { session_id: id, reused: false })
  }

  async fn close_session(&self, close: SessionClose) -> Result<CloseOutcome, Unavailable> {
    self.check()?;
    let mut sessions = self.sessions.lock().unwrap();
    let target = match close.session_id {
      Some(id) => sessions.iter_mut().find(|s| s.id == id && s.ended_at.is_none()),
      None => sessions
        .iter_mut()
        .filter(|s| {
          s.project == close.project_name
            && s.ended_at.is_none()
            && close.closed_at - s.started_at < TimeDelta::hours(24)
        })
        .max_by_key(|s| s.started_at),
    };
    let closed = match target {
      Some(s) => {
        s.ended_at = Some(close.closed_at);
        true
      }
      None => false,
    };
    let demoted_todos =
      self.in_progress.lock().unwrap().remove(&close.project_name).unwrap_or_default();
    Ok(CloseOutcome { closed, demoted_todos })
  }

  async fn record_mcp_usage(&self, usage: McpUsage) -> Result<(), Unavailable> {
    self.check()?;
    self.usage.lock().unwrap().push(usage);
    Ok(())
  }

  async fn record_agent_spawn(&self, spawn: AgentSpawn) -> Result<(), Unavailable> {
    self.check()?;
    let mut spawns = self.spawns.lock().unwrap();
    spawns.retain(|s| s.session_id != spawn.session_id);
    spawns.push(spawn);
    Ok(())
  }
}
