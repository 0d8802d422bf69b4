//! The write interceptor.
//!
//! Judges one [`WriteRequest`] against a [`RuleSet`] and produces a
//! [`Decision`]. Rules are evaluated independently and their findings
//! accumulate. Any lookup that fails (no database, query error, missing
//! row) is recorded as an informational note and never blocks.

use hookline_core::{
  decision::{Decision, Verdict},
  rules::{PhaseGate, RuleSet},
  store::WorkStore,
  write::{ColumnValue, Operation, WriteRequest},
};
use tracing::{debug, warn};
use uuid::Uuid;

pub async fn evaluate<S: WorkStore>(
  store: Option<&S>,
  rules: &RuleSet,
  request: &WriteRequest,
) -> Decision {
  let mut decision = Decision::allow();
  if !rules.is_constrained(&request.table) {
    return decision;
  }

  check_enums(store, rules, request, &mut decision).await;
  check_parent_links(rules, request, &mut decision);
  if request.operation == Operation::Insert
    && let Some(gate) = rules.phase_gate(&request.table)
  {
    check_phase(store, gate, request, &mut decision).await;
  }

  debug!(table = %request.table, verdict = %decision.verdict, "evaluated write");
  decision
}

// ─── Enumerated values ───────────────────────────────────────────────────────

async fn check_enums<S: WorkStore>(
  store: Option<&S>,
  rules: &RuleSet,
  request: &WriteRequest,
  decision: &mut Decision,
) {
  let table = request.table.as_str();
  let assigned: Vec<(&str, &str)> = rules
    .enum_columns(table)
    .iter()
    .filter_map(|column| {
      let value = request.value(column)?;
      if value.is_blank() {
        return None;
      }
      match value {
        ColumnValue::Text(text) => Some((column.as_str(), text.as_str())),
        _ => {
          decision.note(format!("{table}.{column} is not a literal; not checked"));
          None
        }
      }
    })
    .collect();

  if assigned.is_empty() {
    return;
  }
  let Some(store) = store else {
    decision.note("Database not available for validation");
    return;
  };

  for (column, value) in assigned {
    let allowed = match store.valid_values(table, column).await {
      Ok(Some(values)) if !values.is_empty() => values,
      Ok(_) => continue,
      Err(e) => {
        warn!(table, column, error = %e, "column registry lookup failed");
        decision.note(format!("Could not load valid values for {table}.{column}"));
        continue;
      }
    };
    if !allowed.iter().any(|v| v == value) {
      decision.push(Verdict::Block, format!("Invalid value '{value}' for {table}.{column}"));
      decision.suggest(format!("{table}.{column}"), allowed);
    }
  }
}

// ─── Parent links ────────────────────────────────────────────────────────────

/// Inserts must supply the column; updates must not blank it.
fn check_parent_links(rules: &RuleSet, request: &WriteRequest, decision: &mut Decision) {
  for link in rules.parent_links(&request.table) {
    let missing = match request.operation {
      Operation::Insert => !request.has_value(&link.required_column),
      Operation::Update => request.value(&link.required_column).is_some_and(ColumnValue::is_blank),
    };
    if missing {
      decision.push(link.severity.verdict(), format!("{} ({})", link.message, link.help));
    }
  }
}

// ─── Phase gate ──────────────────────────────────────────────────────────────

async fn check_phase<S: WorkStore>(
  store: Option<&S>,
  gate: &PhaseGate,
  request: &WriteRequest,
  decision: &mut Decision,
) {
  let Some(raw) = request.value(&gate.link_column).filter(|v| !v.is_blank()) else {
    decision.note(format!("No {}; phase not checked", gate.link_column));
    return;
  };
  let feature_id = match raw {
    ColumnValue::Text(s) | ColumnValue::Expr(s) => Uuid::parse_str(s.trim().trim_matches('\'')).ok(),
    ColumnValue::Null => None,
  };
  let Some(feature_id) = feature_id else {
    decision.note(format!("Could not extract {}; phase not checked", gate.link_column));
    return;
  };
  let Some(store) = store else {
    decision.note("Database not available; phase not checked");
    return;
  };

  match store.project_phase(feature_id).await {
    Ok(Some(project)) if gate.allows(&project.phase) => {
      decision.note(format!(
        "Project '{}' is in '{}' phase - OK",
        project.project_name, project.phase
      ));
    }
    Ok(Some(project)) => {
      decision.push(
        Verdict::Block,
        format!(
          "Cannot create {}: project '{}' is in '{}' phase; allowed phases: {}",
          request.table,
          project.project_name,
          project.phase,
          gate.allowed_phases.join(", "),
        ),
      );
      decision.suggest("phase", gate.allowed_phases.iter().cloned());
    }
    Ok(None) => decision.note("Could not find project for feature; phase not checked"),
    Err(e) => {
      warn!(%feature_id, error = %e, "phase lookup failed");
      decision.note("Phase lookup failed; phase not checked");
    }
  }
}

#[cfg(test)]
mod tests {
  use hookline_core::rules::{ParentLinkConstraint, Severity};

  use super::*;
  use crate::testing::MemoryStore;

  const FEATURE: &str = "5f0c3a51-0d7f-4a52-9a3b-2a4f1c6e7b10";

  fn store() -> MemoryStore {
    MemoryStore::default()
      .with_registry("feedback", "status", &["new", "triaged", "resolved"])
      .with_registry("build_tasks", "status", &["todo", "in_progress", "completed"])
  }

  fn insert(table: &str) -> WriteRequest { WriteRequest::new(Operation::Insert, table) }

  fn text(s: &str) -> ColumnValue { ColumnValue::Text(s.into()) }

  #[tokio::test]
  async fn unconstrained_table_passes_through() {
    let d = evaluate(Some(&store()), &RuleSet::standard(), &insert("notes").with("x", text("y")))
      .await;
    assert_eq!(d, Decision::allow());
  }

  #[tokio::test]
  async fn enum_value_outside_set_blocks_with_suggestion() {
    let req = insert("feedback").with("status", text("bogus"));
    let d = evaluate(Some(&store()), &RuleSet::standard(), &req).await;
    assert_eq!(d.verdict, Verdict::Block);
    assert_eq!(d.summary(), "Invalid value 'bogus' for feedback.status");
    assert_eq!(
      d.suggestions["feedback.status"].iter().collect::<Vec<_>>(),
      ["new", "resolved", "triaged"]
    );
  }

  #[tokio::test]
  async fn enum_value_inside_set_allows() {
    let req = insert("feedback").with("status", text("triaged"));
    let d = evaluate(Some(&store()), &RuleSet::standard(), &req).await;
    assert_eq!(d.verdict, Verdict::Allow);
    assert!(d.suggestions.is_empty());
  }

  #[tokio::test]
  async fn unregistered_and_blank_values_are_not_checked() {
    let req = insert("feedback")
      .with("priority", text("urgent"))
      .with("status", ColumnValue::Null);
    let d = evaluate(Some(&store()), &RuleSet::standard(), &req).await;
    assert_eq!(d.verdict, Verdict::Allow);
  }

  #[tokio::test]
  async fn registry_failure_fails_open() {
    let req = insert("feedback").with("status", text("bogus"));
    let d = evaluate(Some(&MemoryStore::failing()), &RuleSet::standard(), &req).await;
    assert_eq!(d.verdict, Verdict::Allow);
    assert!(d.summary().contains("Could not load valid values"));

    let d = evaluate(None::<&MemoryStore>, &RuleSet::standard(), &req).await;
    assert_eq!(d.verdict, Verdict::Allow);
    assert_eq!(d.summary(), "Database not available for validation");
  }

  #[tokio::test]
  async fn blocking_parent_link() {
    let rules = RuleSet::standard();
    let d = evaluate(None::<&MemoryStore>, &rules, &insert("features").with("name", text("x")))
      .await;
    assert_eq!(d.verdict, Verdict::Block);
    assert!(d.summary().starts_with("features must have a project_id"));

    let d = evaluate(
      None::<&MemoryStore>,
      &rules,
      &insert("features").with("project_id", text("")),
    )
    .await;
    assert_eq!(d.verdict, Verdict::Block);

    let d = evaluate(
      None::<&MemoryStore>,
      &rules,
      &insert("features").with("project_id", ColumnValue::Expr("$1".into())),
    )
    .await;
    assert_eq!(d.verdict, Verdict::Allow);
  }

  #[tokio::test]
  async fn warning_parent_link_never_blocks() {
    let d = evaluate(None::<&MemoryStore>, &RuleSet::standard(), &insert("documents")).await;
    assert_eq!(d.verdict, Verdict::Warn);
    assert_eq!(d.messages(Verdict::Warn).count(), 1);
  }

  #[tokio::test]
  async fn failures_accumulate() {
    let rules = RuleSet::empty()
      .with_enum_columns("feedback", &["status"])
      .with_parent_link(ParentLinkConstraint {
        table:           "feedback".into(),
        required_column: "project_id".into(),
        severity:        Severity::Warning,
        message:         "feedback should have a project".into(),
        help:            "link it".into(),
      });
    let req = insert("feedback").with("status", text("bogus"));
    let d = evaluate(Some(&store()), &rules, &req).await;
    assert_eq!(d.verdict, Verdict::Block);
    assert_eq!(d.messages(Verdict::Block).count(), 1);
    assert_eq!(d.messages(Verdict::Warn).count(), 1);
  }

  #[tokio::test]
  async fn update_clearing_parent_link_is_flagged() {
    let rules = RuleSet::standard();
    let clear = WriteRequest::new(Operation::Update, "features").with("project_id", ColumnValue::Null);
    assert_eq!(evaluate(None::<&MemoryStore>, &rules, &clear).await.verdict, Verdict::Block);

    let untouched = WriteRequest::new(Operation::Update, "features").with("name", text("x"));
    assert_eq!(evaluate(None::<&MemoryStore>, &rules, &untouched).await.verdict, Verdict::Allow);
  }

  #[tokio::test]
  async fn phase_gate_blocks_design_and_allows_implementation() {
    let feature = Uuid::parse_str(FEATURE).unwrap();
    let req = insert("build_tasks").with("feature_id", text(FEATURE)).with("status", text("todo"));

    let design = store().with_phase(feature, "hookline", "design");
    let d = evaluate(Some(&design), &RuleSet::standard(), &req).await;
    assert_eq!(d.verdict, Verdict::Block);
    let summary = d.summary();
    assert!(summary.contains("'design'"), "{summary}");
    assert!(summary.contains("planning, implementation"), "{summary}");

    let implementing = store().with_phase(feature, "hookline", "implementation");
    let d = evaluate(Some(&implementing), &RuleSet::standard(), &req).await;
    assert_eq!(d.verdict, Verdict::Allow);
  }

  #[tokio::test]
  async fn phase_unknown_fails_open() {
    let req = insert("build_tasks").with("feature_id", text(FEATURE));
    let d = evaluate(Some(&store()), &RuleSet::standard(), &req).await;
    assert_eq!(d.verdict, Verdict::Allow);
    assert!(d.summary().contains("Could not find project"));

    let d = evaluate(Some(&MemoryStore::failing()), &RuleSet::standard(), &req).await;
    assert_eq!(d.verdict, Verdict::Allow);

    let req = insert("build_tasks").with("feature_id", ColumnValue::Expr("$2".into()));
    let d = evaluate(Some(&store()), &RuleSet::standard(), &req).await;
    assert_eq!(d.verdict, Verdict::Allow);
    assert!(d.summary().contains("Could not extract feature_id"));
  }
}
