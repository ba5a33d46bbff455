//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use rollbook_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] CoreError),
}

/// The status-code mapping for the whole error taxonomy lives here and
/// nowhere else.
impl From<CoreError> for ApiError {
  fn from(e: CoreError) -> Self {
    match e {
      CoreError::InvalidDate(_)
      | CoreError::InvalidStatus(_)
      | CoreError::InvalidIdentifier(_)
      | CoreError::MissingRequiredField(_) => Self::BadRequest(e.to_string()),
      CoreError::StudentNotFound(_)
      | CoreError::NoMatchingStudents
      | CoreError::RecordNotFound(_) => Self::NotFound(e.to_string()),
      CoreError::DuplicateRecord(_) => Self::Conflict(e.to_string()),
      CoreError::Serialization(_) | CoreError::Storage(_) => Self::Store(e),
    }
  }
}

impl ApiError {
  /// Fold a backend error into the taxonomy and map it to a status code.
  pub fn from_store<E: Into<CoreError>>(e: E) -> Self {
    Self::from(e.into())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "message": message }))).into_response()
  }
}
