//! Error types for `fibreflow-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0} is required")]
  MissingField(&'static str),

  #[error("invalid {field}: {reason}")]
  InvalidField { field: &'static str, reason: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
    Self::InvalidField { field, reason: reason.into() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
