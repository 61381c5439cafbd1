//! Error types for the import codecs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unsupported file format: {0:?}")]
  UnsupportedFormat(String),

  #[error("file has no header row")]
  MissingHeader,

  #[error("workbook has no worksheets")]
  NoWorksheet,

  #[error("CSV error: {0}")]
  Csv(#[from] csv::Error),

  #[error("workbook error: {0}")]
  Workbook(#[from] calamine::Error),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
