//! Error type for `hookline-store-pg`.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("could not connect within {0:?}")]
  ConnectTimeout(Duration),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
