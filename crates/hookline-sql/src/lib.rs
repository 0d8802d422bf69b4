//! Heuristic SQL classifier for hookline.
//!
//! Turns the raw SQL text of an intercepted tool call into a
//! [`WriteRequest`]. Pure and synchronous; no database dependency.
//!
//! This is a pattern matcher, not a SQL parser: it understands
//! `INSERT INTO t (cols) VALUES (vals)` (first row only) and
//! `UPDATE t SET col = val, ...`, which covers the statements the internal
//! tools issue. Anything else is an [`Error`], and callers treat every error
//! as "cannot classify, allow".
//!
//! # Quick start
//!
//! ```no_run
//! use hookline_core::write::{ColumnValue, Operation};
//!
//! let req = hookline_sql::classify(
//!   "INSERT INTO claude.features (project_id, status) VALUES (NULL, 'planned')",
//! )
//! .unwrap();
//! assert_eq!(req.operation, Operation::Insert);
//! assert_eq!(req.table, "features");
//! assert_eq!(req.value("project_id"), Some(&ColumnValue::Null));
//! ```

pub mod error;
mod parse;

pub use error::{Error, Result};
use hookline_core::write::WriteRequest;

/// Classify a single SQL statement.
pub fn classify(sql: &str) -> Result<WriteRequest> { parse::classify(sql) }

/// Quick keyword test used before full classification: true when the text
/// mentions `INSERT` or `UPDATE` anywhere.
pub fn mentions_write(sql: &str) -> bool {
  let lower = sql.to_ascii_lowercase();
  lower.contains("insert") || lower.contains("update")
}
