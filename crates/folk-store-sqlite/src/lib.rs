//! SQLite backend for the Folk identity store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Every mutating operation is
//! one SQLite transaction; change notifications are published only after
//! the transaction commits.

mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
