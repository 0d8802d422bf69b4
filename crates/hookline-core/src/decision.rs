//! Decisions — the output of write validation.
//!
//! A decision is produced synchronously, handed back to the caller and never
//! persisted. Its verdict is the most severe verdict of any triggered rule.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ─── Verdict ─────────────────────────────────────────────────────────────────

/// Ordered by severity: `Allow < Warn < Block`.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Verdict {
  #[default]
  Allow,
  Warn,
  Block,
}

impl Verdict {
  /// Process exit code of the hook contract: 0 allow, 1 warn, 2 block.
  pub fn exit_code(self) -> u8 {
    match self {
      Self::Allow => 0,
      Self::Warn => 1,
      Self::Block => 2,
    }
  }
}

// ─── Decision ────────────────────────────────────────────────────────────────

/// One human-readable finding. `Allow`-level reasons are informational notes
/// (e.g. why a check was skipped).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reason {
  pub severity: Verdict,
  pub message:  String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
  pub verdict:     Verdict,
  /// In the order the rules were evaluated.
  pub reasons:     Vec<Reason>,
  /// Machine-readable hints, e.g. `"features.status" → {"planned", ...}`.
  pub suggestions: BTreeMap<String, BTreeSet<String>>,
}

impl Decision {
  pub fn allow() -> Self { Self::default() }

  /// Record a finding and escalate the verdict. Failures accumulate; nothing
  /// short-circuits.
  pub fn push(&mut self, severity: Verdict, message: impl Into<String>) {
    self.verdict = self.verdict.max(severity);
    self.reasons.push(Reason { severity, message: message.into() });
  }

  pub fn note(&mut self, message: impl Into<String>) {
    self.push(Verdict::Allow, message);
  }

  pub fn suggest<I, S>(&mut self, key: impl Into<String>, values: I)
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self
      .suggestions
      .entry(key.into())
      .or_default()
      .extend(values.into_iter().map(Into::into));
  }

  pub fn messages(&self, severity: Verdict) -> impl Iterator<Item = &str> {
    self
      .reasons
      .iter()
      .filter(move |r| r.severity == severity)
      .map(|r| r.message.as_str())
  }

  /// A single summary line: the errors when blocked, else the warnings, else
  /// the notes.
  pub fn summary(&self) -> String {
    [Verdict::Block, Verdict::Warn, Verdict::Allow]
      .into_iter()
      .map(|sev| self.messages(sev).collect::<Vec<_>>())
      .find(|msgs| !msgs.is_empty())
      .map(|msgs| msgs.join("; "))
      .unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn block_dominates_warn_dominates_allow() {
    let mut d = Decision::allow();
    d.note("checked");
    assert_eq!(d.verdict, Verdict::Allow);
    d.push(Verdict::Block, "bad status");
    d.push(Verdict::Warn, "no project");
    assert_eq!(d.verdict, Verdict::Block);
    assert_eq!(d.reasons.len(), 3);
    assert_eq!(d.summary(), "bad status");
  }

  #[test]
  fn summary_falls_back_to_warnings_then_notes() {
    let mut d = Decision::allow();
    d.note("phase ok");
    assert_eq!(d.summary(), "phase ok");
    d.push(Verdict::Warn, "a");
    d.push(Verdict::Warn, "b");
    assert_eq!(d.summary(), "a; b");
  }

  #[test]
  fn exit_codes() {
    assert_eq!(Verdict::Allow.exit_code(), 0);
    assert_eq!(Verdict::Warn.exit_code(), 1);
    assert_eq!(Verdict::Block.exit_code(), 2);
  }

  #[test]
  fn suggestions_merge_into_sets() {
    let mut d = Decision::allow();
    d.suggest("features.status", ["planned", "done"]);
    d.suggest("features.status", ["planned"]);
    assert_eq!(d.suggestions["features.status"].len(), 2);
  }
}
