//! Hook handlers for the work-tracking database.
//!
//! Every hook is a short-lived process: the host writes one JSON object to
//! stdin, the handler decides or records something, and exactly one JSON
//! object goes back on stdout together with an exit code (`0` allow, `1`
//! warn, `2` block). Handlers never fail outward; infrastructure trouble is
//! logged and the hook degrades:
//!
//! - the write interceptor ([`guard`]) allows what it cannot check,
//! - telemetry hooks queue records in the fallback log,
//! - session start replays that log once the database is back.

pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod input;
pub mod output;
pub mod replay;
pub mod session;
pub mod store;

pub use error::{Error, Result};

#[cfg(test)]
mod testing;
