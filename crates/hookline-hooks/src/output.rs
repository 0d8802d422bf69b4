//! What a hook prints: one JSON object plus an exit code.

use std::collections::BTreeMap;

use hookline_core::decision::{Decision, Verdict};
use serde::Serialize;
use serde_json::{Value, json};

/// The decision object of the write interceptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionOutput {
  pub decision:    Verdict,
  pub reason:      String,
  pub warnings:    Vec<String>,
  pub errors:      Vec<String>,
  pub suggestions: BTreeMap<String, Vec<String>>,
}

impl From<&Decision> for DecisionOutput {
  fn from(d: &Decision) -> Self {
    let collect = |sev| -> Vec<String> { d.messages(sev).map(str::to_owned).collect() };
    Self {
      decision:    d.verdict,
      reason:      d.summary(),
      warnings:    collect(Verdict::Warn),
      errors:      collect(Verdict::Block),
      suggestions: d
        .suggestions
        .iter()
        .map(|(k, v)| (k.clone(), v.iter().cloned().collect()))
        .collect(),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HookOutcome {
  pub output: Value,
  pub exit:   u8,
}

impl HookOutcome {
  /// `{}` with exit 0.
  pub fn empty() -> Self { Self { output: json!({}), exit: 0 } }

  pub fn decision(decision: &Decision) -> Self {
    let exit = decision.verdict.exit_code();
    let output = serde_json::to_value(DecisionOutput::from(decision)).unwrap_or_else(|_| json!({}));
    Self { output, exit }
  }

  /// Allow with a single informational reason.
  pub fn allow(reason: impl Into<String>) -> Self {
    let mut d = Decision::allow();
    d.note(reason);
    Self::decision(&d)
  }

  pub fn json(output: Value) -> Self { Self { output, exit: 0 } }

  pub fn with_exit(mut self, exit: u8) -> Self {
    self.exit = exit;
    self
  }
}
