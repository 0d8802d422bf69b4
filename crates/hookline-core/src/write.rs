//! Write requests — the proposed mutations the interceptor judges.
//!
//! A request is built per intercepted tool call, either by the SQL classifier
//! in `hookline-sql` or directly from a structured tool input, and discarded
//! once a decision has been produced.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ─── Operation ───────────────────────────────────────────────────────────────

/// The kind of mutation a request represents.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Operation {
  Insert,
  Update,
}

// ─── Column values ───────────────────────────────────────────────────────────

/// A single value assigned to a column.
///
/// The classifier cannot evaluate SQL, so anything that is neither a string
/// literal nor `NULL` is kept verbatim as an opaque expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum ColumnValue {
  /// A quoted string literal, already unescaped.
  Text(String),
  /// SQL `NULL` (or JSON `null` in a structured request).
  Null,
  /// Numbers, placeholders, function calls, casts, sub-selects.
  Expr(String),
}

impl ColumnValue {
  /// True for `NULL` and for the empty string literal — the markers that count
  /// as "no value" for parent links and enum checks.
  pub fn is_blank(&self) -> bool {
    match self {
      Self::Null => true,
      Self::Text(s) => s.trim().is_empty(),
      Self::Expr(e) => e.trim().is_empty(),
    }
  }

  /// The literal text, if this is a string literal.
  pub fn as_text(&self) -> Option<&str> {
    match self {
      Self::Text(s) => Some(s),
      _ => None,
    }
  }
}

impl From<serde_json::Value> for ColumnValue {
  fn from(value: serde_json::Value) -> Self {
    match value {
      serde_json::Value::Null => Self::Null,
      serde_json::Value::String(s) => Self::Text(s),
      other => Self::Expr(other.to_string()),
    }
  }
}

impl From<ColumnValue> for serde_json::Value {
  fn from(value: ColumnValue) -> Self {
    match value {
      ColumnValue::Null => serde_json::Value::Null,
      ColumnValue::Text(s) | ColumnValue::Expr(s) => serde_json::Value::String(s),
    }
  }
}

// ─── WriteRequest ────────────────────────────────────────────────────────────

/// A proposed `INSERT` or `UPDATE` against one table.
///
/// Table and column names are stored lower-case without schema prefix or
/// quoting; values keep their original case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRequest {
  pub operation: Operation,
  pub table:     String,
  #[serde(default)]
  pub columns:   BTreeMap<String, ColumnValue>,
}

impl WriteRequest {
  pub fn new(operation: Operation, table: impl Into<String>) -> Self {
    Self {
      operation,
      table: normalize_identifier(&table.into()),
      columns: BTreeMap::new(),
    }
  }

  /// Builder-style column assignment.
  pub fn with(mut self, column: &str, value: ColumnValue) -> Self {
    self.columns.insert(normalize_identifier(column), value);
    self
  }

  pub fn value(&self, column: &str) -> Option<&ColumnValue> {
    self.columns.get(column)
  }

  /// True when `column` is present and holds something other than a blank
  /// marker.
  pub fn has_value(&self, column: &str) -> bool {
    self.value(column).is_some_and(|v| !v.is_blank())
  }

  /// Re-normalise names on a request that arrived as structured JSON.
  pub fn normalized(self) -> Self {
    Self {
      operation: self.operation,
      table:     normalize_identifier(&self.table),
      columns:   self
        .columns
        .into_iter()
        .map(|(k, v)| (normalize_identifier(&k), v))
        .collect(),
    }
  }
}

/// Lower-case an identifier and strip quoting and any schema prefix
/// (`claude."Features"` → `features`).
pub fn normalize_identifier(raw: &str) -> String {
  let last = raw.rsplit('.').next().unwrap_or(raw);
  last.trim().trim_matches('"').to_lowercase()
}
