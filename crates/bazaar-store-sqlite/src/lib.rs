//! SQLite backend for the bazaar commerce core.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every mutating operation runs inside a
//! `BEGIN IMMEDIATE` transaction, which takes the database write lock up front
//! and plays the role of row-level `SELECT ... FOR UPDATE` locking.

mod encode;
mod ops;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{DEFAULT_BUSY_TIMEOUT, SqliteStore};

#[cfg(test)]
mod tests;
