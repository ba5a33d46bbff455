//! Error taxonomy for `rollbook-core`.
//!
//! Everything except [`Error::Storage`] and [`Error::Serialization`] is a
//! caller error; backends convert their own error types into this enum so
//! the API boundary can map variants to status codes in one place.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid date: {0:?}")]
  InvalidDate(String),

  #[error("invalid status {0:?}: must be one of Present, Absent, Leave")]
  InvalidStatus(String),

  #[error("invalid student identifier: {0:?}")]
  InvalidIdentifier(String),

  #[error("missing required field(s): {0}")]
  MissingRequiredField(String),

  #[error("student not found: {0}")]
  StudentNotFound(String),

  #[error("no matching students found")]
  NoMatchingStudents,

  #[error("attendance record not found: {0}")]
  RecordNotFound(String),

  #[error("duplicate attendance record: {0}")]
  DuplicateRecord(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// Infrastructure failure (connectivity, I/O). Propagates to the boundary
  /// unchanged; never retried by the core.
  #[error("storage error: {0}")]
  Storage(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
