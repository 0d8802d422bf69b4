//! Error type for `hookline-fallback`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// Hook names become file names; only `[A-Za-z0-9_-]` is accepted.
  #[error("invalid hook name: {0:?}")]
  InvalidHookName(String),

  #[error("replay of {0:?} is already running")]
  Busy(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
