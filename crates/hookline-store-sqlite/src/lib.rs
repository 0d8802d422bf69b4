//! SQLite backend for the hookline work store.
//!
//! Used for local single-user setups (`sqlite:` connection strings or plain
//! `.db` paths) and as the store behind most tests. Wraps [`tokio_rusqlite`]
//! so all database access runs on a dedicated thread without blocking the
//! async runtime.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
