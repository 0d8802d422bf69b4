//! JSONL write-ahead log for hook data that could not reach the database.
//!
//! Each hook name owns one file, `<dir>/<hook>_fallback.jsonl`, holding one
//! [`FallbackEntry`] per line in append order. Hooks only ever append; the
//! replay engine is the single writer that rewrites the file, and it deletes
//! the file once every entry has been replayed.
//!
//! Replay is single-flight per hook name: it holds an advisory lock on
//! `<hook>_fallback.lock` for its whole run, and a second replay of the same
//! hook fails fast with [`Error::Busy`].

mod entry;
mod log;
mod replay;

pub mod error;

pub use entry::FallbackEntry;
pub use error::{Error, Result};
pub use log::FallbackLog;
