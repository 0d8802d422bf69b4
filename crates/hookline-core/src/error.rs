//! Error types for `hookline-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("no replay handler for hook {0:?}")]
  UnknownHook(String),

  #[error("hook {hook:?} payload does not decode: {source}")]
  Payload {
    hook:   String,
    #[source]
    source: serde_json::Error,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
