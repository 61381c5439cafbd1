//! Shared machinery for bulk imports: row normalisation, de-duplication,
//! batching and the report returned to the caller.
//!
//! Rows that fail normalisation are reported individually; valid rows are
//! written in batches of [`BATCH_SIZE`], and a failed batch is reported as a
//! whole without aborting the rest of the import.

use std::{collections::HashSet, ops::Range};

use serde::{Deserialize, Serialize};

use crate::{Result, record::Record};

/// Rows per multi-row upsert statement.
pub const BATCH_SIZE: usize = 500;

/// A typed row that can be built from a loose [`Record`] and upserted on a
/// natural key.
pub trait ImportRow: Sized {
  fn from_record(record: &Record) -> Result<Self>;

  /// The value of the natural key the upsert conflicts on.
  fn natural_key(&self) -> &str;
}

/// One problem found during an import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportIssue {
  /// Zero-based index of the offending input row, for row-level problems.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub row:     Option<usize>,
  /// Zero-based batch index, for batch-level failures.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub batch:   Option<usize>,
  pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
  /// Rows received.
  pub total:      usize,
  /// Rows written (inserted or updated).
  pub upserted:   usize,
  /// Rows rejected during normalisation or lost to a failed batch.
  pub failed:     usize,
  /// Rows dropped because a later row carried the same natural key.
  pub duplicates: usize,
  /// Batches attempted.
  pub batches:    usize,
  pub errors:     Vec<ImportIssue>,
}

impl ImportReport {
  pub fn is_clean(&self) -> bool { self.errors.is_empty() }

  pub fn batch_succeeded(&mut self, rows: usize) {
    self.batches += 1;
    self.upserted += rows;
  }

  pub fn batch_failed(&mut self, batch: usize, rows: usize, message: impl Into<String>) {
    self.batches += 1;
    self.failed += rows;
    self.errors.push(ImportIssue { row: None, batch: Some(batch), message: message.into() });
  }
}

/// Rows ready to be written, plus the report so far.
#[derive(Debug)]
pub struct Prepared<T> {
  pub rows:   Vec<T>,
  pub report: ImportReport,
}

impl<T> Prepared<T> {
  /// Split the rows into write batches of at most `size`.
  pub fn batches(&self, size: usize) -> impl Iterator<Item = (usize, Range<usize>, &[T])> {
    let size = size.max(1);
    self.rows.chunks(size).enumerate().map(move |(i, chunk)| {
      let start = i * size;
      (i, start..start + chunk.len(), chunk)
    })
  }
}

/// Normalise every record, collecting row errors, then collapse duplicate
/// natural keys so that the last occurrence wins.
pub fn prepare<T: ImportRow>(records: &[Record]) -> Prepared<T> {
  let mut report = ImportReport { total: records.len(), ..ImportReport::default() };
  let mut parsed = Vec::with_capacity(records.len());

  for (row, record) in records.iter().enumerate() {
    match T::from_record(record) {
      Ok(r) => parsed.push(r),
      Err(e) => {
        report.failed += 1;
        report.errors.push(ImportIssue { row: Some(row), batch: None, message: e.to_string() });
      }
    }
  }

  let mut seen = HashSet::with_capacity(parsed.len());
  let mut rows: Vec<T> = Vec::with_capacity(parsed.len());
  for r in parsed.into_iter().rev() {
    if seen.insert(r.natural_key().to_owned()) {
      rows.push(r);
    } else {
      report.duplicates += 1;
    }
  }
  rows.reverse();

  Prepared { rows, report }
}
