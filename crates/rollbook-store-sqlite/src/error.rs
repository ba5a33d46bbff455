//! Error type for `rollbook-store-sqlite`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] rollbook_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// Attempted to correct, update or delete a record that was not found.
  #[error("attendance record not found: {0}")]
  RecordNotFound(String),

  /// Enrollment with a roll number that is already taken.
  #[error("roll number {0} is already enrolled")]
  RollNumberTaken(i64),

  #[error("student not found: {0}")]
  StudentNotFound(Uuid),
}

/// Fold backend errors into the core taxonomy so the API boundary can map
/// them to status codes without knowing this crate.
impl From<Error> for rollbook_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(core) => core,
      Error::Json(e) => rollbook_core::Error::Serialization(e),
      Error::RecordNotFound(key) => rollbook_core::Error::RecordNotFound(key),
      Error::RollNumberTaken(n) => {
        rollbook_core::Error::DuplicateRecord(format!("roll number {n}"))
      }
      Error::StudentNotFound(id) => {
        rollbook_core::Error::StudentNotFound(id.to_string())
      }
      other => rollbook_core::Error::Storage(other.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
