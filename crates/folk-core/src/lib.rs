//! Core types and trait definitions for the Folk persons aggregator.
//!
//! This crate is deliberately free of database dependencies. All other
//! crates depend on it; it depends on nothing heavier than serde and the
//! tokio sync primitives.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod aggregate;
pub mod error;
pub mod matcher;
pub mod merge;
pub mod notify;
pub mod record;
pub mod source;
pub mod store;

pub use error::{Error, Result};
pub use record::{ContactId, ContactRecord, PersonId};
