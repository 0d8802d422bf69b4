//! Error types for the hook layer.
//!
//! Handlers do not return errors; only configuration loading can fail, and
//! `main` falls back to defaults when it does.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("config error: {0}")]
  Config(#[from] config::ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
