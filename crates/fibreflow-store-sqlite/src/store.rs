//! [`SqliteStore`], the SQLite implementation of the FibreFlow store traits.
//!
//! One submodule per area implements the matching trait from
//! [`fibreflow_core::store`].

mod analytics;
mod audit;
mod clients;
mod contractors;
mod procurement;
mod projects;
mod sow;
mod staff;
mod suppliers;

use std::path::Path;

use fibreflow_core::store::{ListQuery, StoreBase};
use rusqlite::types::Value;

use crate::{Error, Result, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A FibreFlow store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

impl StoreBase for SqliteStore {
  type Error = Error;
}

// ─── Dynamic filters ─────────────────────────────────────────────────────────

/// Accumulates `WHERE` conditions with positional parameters for list
/// queries. Values are owned so the filter can move into a connection
/// closure.
#[derive(Debug, Default)]
pub(crate) struct Filter {
  conds:  Vec<String>,
  values: Vec<Value>,
}

impl Filter {
  /// Start from the filters every area shares: `status` and `text` over
  /// `text_columns`.
  pub fn from_query(query: &ListQuery, text_columns: &[&str]) -> Self {
    let mut f = Self::default();
    if let Some(status) = &query.status {
      f.eq("status", status.clone());
    }
    if let Some(text) = query.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
      f.contains_any(text_columns, text);
    }
    f
  }

  pub fn eq(&mut self, column: &str, value: impl Into<Value>) {
    self.conds.push(format!("{column} = ?"));
    self.values.push(value.into());
  }

  /// Case-insensitive substring match on any of `columns`.
  pub fn contains_any(&mut self, columns: &[&str], text: &str) {
    if columns.is_empty() {
      return;
    }
    let pattern = format!("%{}%", text.to_lowercase());
    let any = columns
      .iter()
      .map(|c| format!("lower(COALESCE({c}, '')) LIKE ?"))
      .collect::<Vec<_>>()
      .join(" OR ");
    self.conds.push(format!("({any})"));
    self
      .values
      .extend(columns.iter().map(|_| Value::Text(pattern.clone())));
  }

  /// Render `SELECT {columns} FROM {table} WHERE … ORDER BY {order} LIMIT …`.
  pub fn select(
    mut self,
    columns: &str,
    table: &str,
    order: &str,
    query: &ListQuery,
  ) -> (String, Vec<Value>) {
    let where_clause = if self.conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", self.conds.join(" AND "))
    };
    let sql =
      format!("SELECT {columns} FROM {table} {where_clause} ORDER BY {order} LIMIT ? OFFSET ?");
    self.values.push(Value::Integer(query.limit() as i64));
    self.values.push(Value::Integer(query.offset() as i64));
    (sql, self.values)
  }
}

/// `(?, ?, …), (?, ?, …)` for a multi-row `VALUES` clause.
pub(crate) fn placeholders(rows: usize, columns: usize) -> String {
  let row = format!("({})", vec!["?"; columns].join(", "));
  vec![row; rows].join(", ")
}

/// Run a rendered [`Filter`] and decode each row with `map`.
pub(crate) fn query_all<T>(
  conn: &rusqlite::Connection,
  sql: &str,
  values: &[Value],
  map: impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt
    .query_map(rusqlite::params_from_iter(values.iter()), map)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn filter_renders_status_text_and_paging() {
    let q = ListQuery {
      text: Some(" Acme ".into()),
      status: Some("active".into()),
      limit: Some(10),
      offset: Some(20),
      ..ListQuery::default()
    };
    let (sql, values) =
      Filter::from_query(&q, &["company_name", "email"]).select("*", "clients", "id", &q);
    assert!(sql.contains("WHERE status = ? AND (lower(COALESCE(company_name, '')) LIKE ?"));
    assert!(sql.ends_with("ORDER BY id LIMIT ? OFFSET ?"));
    assert_eq!(values.len(), 5);
    assert_eq!(values[1], Value::Text("%acme%".into()));
    assert_eq!(values[3], Value::Integer(10));
    assert_eq!(values[4], Value::Integer(20));
  }

  #[test]
  fn placeholders_shape() {
    assert_eq!(placeholders(2, 3), "(?, ?, ?), (?, ?, ?)");
  }
}
