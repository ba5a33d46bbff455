//! SQLite backend for the rollbook attendance store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread pool without blocking the async runtime. The `(student_id, day)`
//! UNIQUE index in the schema is the uniqueness invariant the upsert path
//! relies on.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
