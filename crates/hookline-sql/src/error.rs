//! Error types for the hookline SQL classifier.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
  #[error("statement is not an INSERT or UPDATE")]
  NotAWrite,

  #[error("INSERT has no column list")]
  MissingColumnList,

  #[error("INSERT has no VALUES row")]
  MissingValues,

  #[error("{columns} columns but {values} values")]
  ColumnCountMismatch { columns: usize, values: usize },

  #[error("UPDATE has no SET clause")]
  MissingSet,

  #[error("malformed assignment: {0:?}")]
  MalformedAssignment(String),

  #[error("unterminated quoted literal")]
  UnterminatedLiteral,

  #[error("unbalanced parentheses")]
  Unbalanced,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
