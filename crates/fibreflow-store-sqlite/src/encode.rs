//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! UUIDs are stored as hyphenated lowercase strings, timestamps as RFC 3339
//! with microseconds, calendar dates as `YYYY-MM-DD`, status enums by their
//! snake_case name and lists as compact JSON arrays.
//!
//! The `*_col` readers run inside `tokio_rusqlite` closures, so parse
//! failures surface as [`rusqlite::Error::FromSqlConversionFailure`] on the
//! offending column.

use std::{error::Error as StdError, str::FromStr};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Row, types::Type};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::Result;

const DATE_FORMAT: &str = "%Y-%m-%d";

// ─── Writers ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn encode_opt_uuid(id: Option<Uuid>) -> Option<String> { id.map(encode_uuid) }

/// Fixed-width so that text order matches time order.
pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn encode_opt_date(d: Option<NaiveDate>) -> Option<String> { d.map(encode_date) }

pub fn encode_enum(e: impl AsRef<str>) -> String { e.as_ref().to_owned() }

pub fn encode_json<T: Serialize + ?Sized>(v: &T) -> Result<String> {
  Ok(serde_json::to_string(v)?)
}

// ─── Readers ─────────────────────────────────────────────────────────────────

fn conversion_failure(
  row: &Row<'_>,
  column: &str,
  err: impl StdError + Send + Sync + 'static,
) -> rusqlite::Error {
  let idx = row.as_ref().column_index(column).unwrap_or(0);
  rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_col<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<T>>
where
  T: FromStr,
  T::Err: StdError + Send + Sync + 'static,
{
  let raw: Option<String> = row.get(column)?;
  raw
    .map(|s| s.parse::<T>().map_err(|e| conversion_failure(row, column, e)))
    .transpose()
}

fn present<T>(row: &Row<'_>, column: &str, value: Option<T>) -> rusqlite::Result<T> {
  let idx = row.as_ref().column_index(column)?;
  value.ok_or(rusqlite::Error::InvalidColumnType(idx, column.to_owned(), Type::Null))
}

pub fn uuid_col(row: &Row<'_>, column: &str) -> rusqlite::Result<Uuid> {
  let v = opt_uuid_col(row, column)?;
  present(row, column, v)
}

pub fn opt_uuid_col(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<Uuid>> {
  parse_col(row, column)
}

pub fn dt_col(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
  let v = opt_dt_col(row, column)?;
  present(row, column, v)
}

pub fn opt_dt_col(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
  let raw: Option<String> = row.get(column)?;
  raw
    .map(|s| {
      DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_failure(row, column, e))
    })
    .transpose()
}

pub fn date_col(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<NaiveDate>> {
  let raw: Option<String> = row.get(column)?;
  raw
    .map(|s| {
      NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| conversion_failure(row, column, e))
    })
    .transpose()
}

/// A strum-backed status enum stored by name.
pub fn enum_col<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<T>
where
  T: FromStr,
  T::Err: StdError + Send + Sync + 'static,
{
  let v = parse_col(row, column)?;
  present(row, column, v)
}

pub fn opt_enum_col<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<T>>
where
  T: FromStr,
  T::Err: StdError + Send + Sync + 'static,
{
  parse_col(row, column)
}

pub fn json_col<T: DeserializeOwned>(row: &Row<'_>, column: &str) -> rusqlite::Result<T> {
  let raw: String = row.get(column)?;
  serde_json::from_str(&raw).map_err(|e| conversion_failure(row, column, e))
}
