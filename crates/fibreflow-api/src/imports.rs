//! Shared plumbing for bulk imports: reading an uploaded file and writing
//! prepared rows batch by batch.

use std::future::Future;

use axum::http::{HeaderMap, header};
use bytes::Bytes;
use fibreflow_core::{
  import::{BATCH_SIZE, ImportReport, ImportRow, prepare},
  record::Record,
  store::StoreError,
};
use fibreflow_import::{Format, read_records};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
  error::{ApiError, ApiResult},
  retry::RetryPolicy,
};

/// Query parameters of the raw-file import endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct FileParams {
  pub format:     Option<String>,
  pub project_id: Option<Uuid>,
}

/// A decoded upload.
pub(crate) struct Upload {
  pub records:     Vec<Record>,
  pub format:      Format,
  /// Hex SHA-256 of the raw bytes.
  pub fingerprint: String,
  pub size:        usize,
}

pub(crate) fn fingerprint(bytes: &[u8]) -> String { hex::encode(Sha256::digest(bytes)) }

pub(crate) fn read_upload(
  params: &FileParams,
  headers: &HeaderMap,
  body: &Bytes,
) -> ApiResult<Upload> {
  if body.is_empty() {
    return Err(ApiError::BadRequest("request body is empty".to_owned()));
  }
  let content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok());
  let format = Format::detect(params.format.as_deref(), content_type)?;
  let records = read_records(body, format)?;
  Ok(Upload { records, format, fingerprint: fingerprint(body), size: body.len() })
}

/// Normalise `records` as `T`, then write them in batches through `write`.
///
/// Each batch is retried per `retry`; a batch that still fails is recorded
/// in the report and the remaining batches are attempted anyway.
pub(crate) async fn run_import<T, E, F, Fut>(
  records: &[Record],
  retry: &RetryPolicy,
  what: &'static str,
  mut write: F,
) -> ImportReport
where
  T: ImportRow + Clone,
  E: StoreError,
  F: FnMut(Vec<T>) -> Fut,
  Fut: Future<Output = Result<usize, E>>,
{
  let mut prepared = prepare::<T>(records);
  let mut report = std::mem::take(&mut prepared.report);

  for (batch, rows, chunk) in prepared.batches(BATCH_SIZE) {
    match retry.run(what, || write(chunk.to_vec())).await {
      Ok(n) => report.batch_succeeded(n),
      Err(e) => {
        tracing::warn!(operation = what, batch, ?rows, error = %e, "import batch failed");
        report.batch_failed(batch, chunk.len(), e.to_string());
      }
    }
  }

  tracing::info!(
    operation = what,
    total = report.total,
    upserted = report.upserted,
    failed = report.failed,
    duplicates = report.duplicates,
    batches = report.batches,
    "import finished"
  );
  report
}

/// One-line outcome for the envelope's `message`.
pub(crate) fn summary(report: &ImportReport) -> String {
  format!(
    "imported {} of {} rows ({} failed, {} duplicates)",
    report.upserted, report.total, report.failed, report.duplicates
  )
}

#[cfg(test)]
mod tests {
  use std::{
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
  };

  use fibreflow_core::{staff::NewStaff, store::ErrorClass};
  use serde_json::json;
  use thiserror::Error;

  use super::*;

  #[derive(Debug, Error)]
  #[error("{0:?}")]
  struct Fake(ErrorClass);

  impl StoreError for Fake {
    fn class(&self) -> ErrorClass { self.0 }
  }

  fn staff_records(n: usize) -> Vec<Record> {
    (0..n)
      .map(|i| {
        json!({ "Employee ID": format!("E{i:04}"), "Name": format!("Staff {i}") })
          .as_object()
          .unwrap()
          .clone()
      })
      .collect()
  }

  #[tokio::test]
  async fn failed_batch_is_reported_and_later_batches_still_run() {
    let retry = RetryPolicy {
      attempts:   3,
      base_delay: Duration::from_millis(1),
      timeout:    Duration::from_millis(200),
    };
    let calls = &AtomicU32::new(0);
    let report = run_import::<NewStaff, _, _, _>(
      &staff_records(600),
      &retry,
      "import staff",
      move |rows| async move {
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
          Err(Fake(ErrorClass::Conflict))
        } else {
          Ok(rows.len())
        }
      },
    )
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.total, 600);
    assert_eq!(report.batches, 2);
    assert_eq!(report.failed, BATCH_SIZE);
    assert_eq!(report.upserted, 100);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].batch, Some(0));
    assert_eq!(report.errors[0].row, None);
    assert!(!report.is_clean());
  }

  #[test]
  fn fingerprint_is_hex_sha256() {
    assert_eq!(
      fingerprint(b"abc"),
      "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
  }

  #[test]
  fn upload_requires_a_known_format() {
    let body = Bytes::from_static(b"pole_number\nP1\n");
    let params = FileParams::default();

    let mut headers = HeaderMap::new();
    assert!(matches!(read_upload(&params, &headers, &body), Err(ApiError::Import(_))));

    headers.insert(header::CONTENT_TYPE, "text/csv".parse().unwrap());
    let upload = read_upload(&params, &headers, &body).unwrap();
    assert_eq!(upload.format, Format::Csv);
    assert_eq!(upload.records.len(), 1);
  }
}
