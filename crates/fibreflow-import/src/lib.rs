//! Spreadsheet codecs for FibreFlow bulk imports and exports.
//!
//! Turns uploaded CSV or Excel files into loose [`Record`]s keyed by the
//! file's own header names; the typed row builders in
//! [`fibreflow_core::import`] take it from there. Pure synchronous; no HTTP
//! or database dependencies.

pub mod error;
mod read;
mod write;

use fibreflow_core::record::Record;
use strum::{Display, EnumString};

pub use error::{Error, Result};
pub use write::{STAFF_EXPORT_HEADER, staff_csv};

/// An uploaded file's encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Format {
  #[strum(to_string = "csv")]
  Csv,
  /// Any workbook calamine can open (`.xlsx`, `.xlsm`, `.xls`, `.ods`).
  #[strum(to_string = "xlsx", serialize = "xls", serialize = "xlsm", serialize = "ods")]
  Excel,
}

impl Format {
  /// Guess from a file name's extension.
  pub fn from_path(path: &str) -> Option<Self> {
    let (_, ext) = path.rsplit_once('.')?;
    ext.parse().ok()
  }

  /// Guess from a `Content-Type` header value.
  pub fn from_content_type(content_type: &str) -> Option<Self> {
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    match mime.as_str() {
      "text/csv" | "application/csv" | "text/plain" => Some(Self::Csv),
      "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
      | "application/vnd.ms-excel"
      | "application/vnd.oasis.opendocument.spreadsheet" => Some(Self::Excel),
      _ => None,
    }
  }

  /// Pick the format from an explicit name (`?format=`), falling back to the
  /// request's `Content-Type`.
  pub fn detect(explicit: Option<&str>, content_type: Option<&str>) -> Result<Self> {
    match (explicit, content_type) {
      (Some(name), _) => name.trim().parse().map_err(|_| Error::UnsupportedFormat(name.to_owned())),
      (None, Some(ct)) => {
        Self::from_content_type(ct).ok_or_else(|| Error::UnsupportedFormat(ct.to_owned()))
      }
      (None, None) => Err(Error::UnsupportedFormat("unspecified".to_owned())),
    }
  }

  pub fn content_type(self) -> &'static str {
    match self {
      Self::Csv => "text/csv",
      Self::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    }
  }
}

/// Read every data row of `bytes` as a record. For workbooks only the first
/// worksheet is read. Rows with no non-empty cell are skipped.
pub fn read_records(bytes: &[u8], format: Format) -> Result<Vec<Record>> {
  match format {
    Format::Csv => read::csv_records(bytes),
    Format::Excel => read::workbook_records(bytes),
  }
}
