//! Static per-table validation policy.
//!
//! Which columns are enum-constrained is static; the allowed values themselves
//! live in the database's column registry and are fetched per evaluation.
//! Parent links and phase gates are fully static.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::decision::Verdict;

// ─── Constraint kinds ────────────────────────────────────────────────────────

/// How a missing parent link is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Blocking,
  Warning,
}

impl Severity {
  pub fn verdict(self) -> Verdict {
    match self {
      Self::Blocking => Verdict::Block,
      Self::Warning => Verdict::Warn,
    }
  }
}

/// A registered set of allowed values for `(table, column)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConstraint {
  pub table:          String,
  pub column:         String,
  pub allowed_values: BTreeSet<String>,
}

impl EnumConstraint {
  pub fn key(&self) -> String { format!("{}.{}", self.table, self.column) }

  pub fn allows(&self, value: &str) -> bool { self.allowed_values.contains(value) }
}

/// A child row must name its parent in `required_column` when inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentLinkConstraint {
  pub table:           String,
  pub required_column: String,
  pub severity:        Severity,
  pub message:         String,
  /// Shown to the caller as the suggested fix.
  pub help:            String,
}

/// Task-like rows may only be linked to a feature whose project sits in one of
/// `allowed_phases`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseGate {
  pub table:          String,
  pub link_column:    String,
  pub allowed_phases: Vec<String>,
}

impl PhaseGate {
  pub fn allows(&self, phase: &str) -> bool {
    self.allowed_phases.iter().any(|p| p == phase)
  }
}

// ─── RuleSet ─────────────────────────────────────────────────────────────────

/// The constrained-table registry.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
  enum_columns: BTreeMap<String, Vec<String>>,
  parent_links: Vec<ParentLinkConstraint>,
  phase_gates:  Vec<PhaseGate>,
}

impl RuleSet {
  pub fn empty() -> Self { Self::default() }

  /// Declare `columns` of `table` as registry-backed enums.
  pub fn with_enum_columns(mut self, table: &str, columns: &[&str]) -> Self {
    let entry = self.enum_columns.entry(table.to_owned()).or_default();
    for column in columns {
      if !entry.iter().any(|c| c == column) {
        entry.push((*column).to_owned());
      }
    }
    self
  }

  /// Add a parent-link rule. A second rule for the same `(table, column)`
  /// replaces the first.
  pub fn with_parent_link(mut self, link: ParentLinkConstraint) -> Self {
    self.parent_links.retain(|l| {
      !(l.table == link.table && l.required_column == link.required_column)
    });
    self.parent_links.push(link);
    self
  }

  pub fn with_phase_gate(mut self, gate: PhaseGate) -> Self {
    self.phase_gates.retain(|g| g.table != gate.table);
    self.phase_gates.push(gate);
    self
  }

  /// True when any rule mentions `table`.
  pub fn is_constrained(&self, table: &str) -> bool {
    self.enum_columns.contains_key(table)
      || self.parent_links.iter().any(|l| l.table == table)
      || self.phase_gates.iter().any(|g| g.table == table)
  }

  pub fn enum_columns(&self, table: &str) -> &[String] {
    self.enum_columns.get(table).map(Vec::as_slice).unwrap_or_default()
  }

  pub fn parent_links<'a>(
    &'a self,
    table: &'a str,
  ) -> impl Iterator<Item = &'a ParentLinkConstraint> + 'a {
    self.parent_links.iter().filter(move |l| l.table == table)
  }

  pub fn phase_gate(&self, table: &str) -> Option<&PhaseGate> {
    self.phase_gates.iter().find(|g| g.table == table)
  }

  /// The work-tracking schema's policy.
  pub fn standard() -> Self {
    Self::empty()
      .with_enum_columns("feedback", &["feedback_type", "status", "priority"])
      .with_enum_columns("features", &["status", "priority"])
      .with_enum_columns("build_tasks", &["status", "priority"])
      .with_enum_columns("projects", &["status", "phase", "priority"])
      .with_enum_columns("work_tasks", &["status", "priority"])
      .with_enum_columns("documents", &["status", "doc_type"])
      .with_parent_link(link(
        "build_tasks",
        "feature_id",
        Severity::Blocking,
        "build_tasks must have a feature_id to prevent orphans",
        "First create/find a feature, then link the task to it",
      ))
      .with_parent_link(link(
        "features",
        "project_id",
        Severity::Blocking,
        "features must have a project_id to prevent orphans",
        "Find the project_id from claude.projects first",
      ))
      .with_parent_link(link(
        "documents",
        "project_id",
        Severity::Warning,
        "documents should be linked to a project",
        "Consider linking to a project or use document_projects table",
      ))
      .with_parent_link(link(
        "work_tasks",
        "project_id",
        Severity::Warning,
        "work_tasks should have a project_id",
        "Link task to a project for better organization",
      ))
      .with_phase_gate(PhaseGate {
        table:          "build_tasks".into(),
        link_column:    "feature_id".into(),
        allowed_phases: vec!["planning".into(), "implementation".into()],
      })
  }
}

fn link(
  table: &str,
  column: &str,
  severity: Severity,
  message: &str,
  help: &str,
) -> ParentLinkConstraint {
  ParentLinkConstraint {
    table: table.into(),
    required_column: column.into(),
    severity,
    message: message.into(),
    help: help.into(),
  }
}
