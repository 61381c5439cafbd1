//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure is rendered in the response envelope:
//! `{"success": false, "error": "<message>"}`.

use axum::{
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use fibreflow_core::store::{ErrorClass, StoreError};
use thiserror::Error;

use crate::response::Envelope;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  BadRequest(String),

  #[error("method not allowed")]
  MethodNotAllowed,

  #[error("{0}")]
  Internal(String),

  #[error("{0} timed out")]
  Timeout(&'static str),

  #[error("store error: {source}")]
  Store {
    class:  ErrorClass,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error(transparent)]
  Import(#[from] fibreflow_import::Error),
}

impl ApiError {
  /// Wrap a backend error, keeping its classification.
  pub fn store<E: StoreError>(err: E) -> Self {
    Self::Store { class: err.class(), source: Box::new(err) }
  }

  pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
    Self::NotFound(format!("{what} {id} not found"))
  }

  pub fn missing(param: &str) -> Self { Self::BadRequest(format!("{param} is required")) }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) | ApiError::Import(_) => StatusCode::BAD_REQUEST,
      ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
      ApiError::Internal(_) | ApiError::Timeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
      ApiError::Store { class, .. } => match class {
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
        ErrorClass::Conflict => StatusCode::CONFLICT,
        ErrorClass::Invalid => StatusCode::BAD_REQUEST,
        ErrorClass::Transient | ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }

  fn message(&self) -> String {
    match self {
      // Validation and constraint messages are meant for the caller.
      ApiError::Store { class: ErrorClass::Internal | ErrorClass::Transient, .. } => {
        "internal server error".to_owned()
      }
      ApiError::Store { source, .. } => source.to_string(),
      other => other.to_string(),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    (status, Envelope::<()>::failure(self.message())).into_response()
  }
}

/// Convenience alias for handler results.
pub type ApiResult<T> = Result<T, ApiError>;
