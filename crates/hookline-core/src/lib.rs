//! Core types and trait definitions for hookline.
//!
//! This crate is deliberately free of database and filesystem dependencies.
//! Every other crate depends on it: the SQL classifier produces its
//! [`WriteRequest`](write::WriteRequest)s, the store adapters implement its
//! [`WorkStore`](store::WorkStore) trait, and the hook binary turns its
//! [`Decision`](decision::Decision)s into exit codes.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod decision;
pub mod error;
pub mod record;
pub mod rules;
pub mod session;
pub mod store;
pub mod write;

pub use error::{Error, Result};
