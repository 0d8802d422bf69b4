//! PostgreSQL backend for the hookline work store.
//!
//! Every hook invocation is a short-lived process, so [`PgStore`] holds one
//! connection rather than a pool. Connecting is bounded by a timeout and
//! every statement runs under a server-side `statement_timeout`, so a slow or
//! unreachable database costs a hook a few seconds at most.
//!
//! All tables live in the `claude` schema.

mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{PgStore, PgTimeouts};
