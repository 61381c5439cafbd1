//! Error type for `fibreflow-store-sqlite`.

use fibreflow_core::store::{ErrorClass, StoreError};
use rusqlite::ffi;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0}")]
  Core(#[from] fibreflow_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("contractor not found: {0}")]
  ContractorNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl StoreError for Error {
  fn class(&self) -> ErrorClass {
    match self {
      Self::Core(_) => ErrorClass::Invalid,
      Self::Json(_) => ErrorClass::Internal,
      Self::ContractorNotFound(_) => ErrorClass::NotFound,
      Self::Database(tokio_rusqlite::Error::Rusqlite(e)) => classify_sqlite(e),
      Self::Database(_) => ErrorClass::Internal,
    }
  }
}

fn classify_sqlite(e: &rusqlite::Error) -> ErrorClass {
  let rusqlite::Error::SqliteFailure(err, _) = e else {
    return ErrorClass::Internal;
  };
  match err.extended_code {
    ffi::SQLITE_CONSTRAINT_UNIQUE
    | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    | ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ErrorClass::Conflict,
    _ => match err.code {
      ffi::ErrorCode::DatabaseBusy | ffi::ErrorCode::DatabaseLocked => ErrorClass::Transient,
      ffi::ErrorCode::ConstraintViolation => ErrorClass::Invalid,
      _ => ErrorClass::Internal,
    },
  }
}
