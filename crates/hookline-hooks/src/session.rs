//! Session state save: one best-effort upsert, no retry, no fallback log.

use hookline_core::{session::SessionSnapshot, store::WorkStore};
use tracing::{info, warn};

/// Outcome of [`save`], surfaced to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveResult {
  pub success: bool,
  pub message: String,
}

pub async fn save<S: WorkStore>(
  store: Option<&S>,
  project_name: &str,
  snapshot: SessionSnapshot,
) -> SaveResult {
  let Some(store) = store else {
    warn!(project = project_name, "session state not saved: no database");
    return SaveResult { success: false, message: "Database not available".into() };
  };

  match store.save_session_state(project_name, snapshot).await {
    Ok(state) => {
      info!(project = project_name, todos = state.todo_list.len(), "session state saved");
      SaveResult {
        success: true,
        message: format!(
          "Session state saved for {project_name} ({} todos, {} next steps)",
          state.todo_list.len(),
          state.next_steps.len()
        ),
      }
    }
    Err(e) => {
      warn!(project = project_name, error = %e, "session state save failed");
      SaveResult { success: false, message: format!("Failed to save session state: {e}") }
    }
  }
}
