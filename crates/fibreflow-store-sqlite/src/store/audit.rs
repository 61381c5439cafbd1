use chrono::Utc;
use fibreflow_core::{
  audit::{AuditEntry, AuditQuery, NewAuditEntry},
  store::{AuditStore, DEFAULT_LIST_LIMIT},
};
use rusqlite::{Row, types::Value};
use uuid::Uuid;

use super::{SqliteStore, query_all};
use crate::{
  Result,
  encode::{
    dt_col, encode_dt, encode_enum, encode_json, encode_opt_uuid, encode_uuid, enum_col, json_col,
    opt_uuid_col, uuid_col,
  },
};

const COLUMNS: &str = "id, entity_type, entity_id, action, actor, details, created_at";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
  Ok(AuditEntry {
    id:          uuid_col(row, "id")?,
    entity_type: row.get("entity_type")?,
    entity_id:   opt_uuid_col(row, "entity_id")?,
    action:      enum_col(row, "action")?,
    actor:       row.get("actor")?,
    details:     json_col(row, "details")?,
    created_at:  dt_col(row, "created_at")?,
  })
}

impl AuditStore for SqliteStore {
  async fn record_audit(&self, entry: NewAuditEntry) -> Result<AuditEntry> {
    let id = encode_uuid(Uuid::new_v4());
    let entity_id = encode_opt_uuid(entry.entity_id);
    let action = encode_enum(entry.action);
    let details = encode_json(&entry.details)?;
    let now = encode_dt(Utc::now());

    let entry = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "INSERT INTO audit_log ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           RETURNING {COLUMNS}"
        );
        let entry = conn.query_row(
          &sql,
          rusqlite::params![id, entry.entity_type, entity_id, action, entry.actor, details, now],
          entry_from_row,
        )?;
        Ok(entry)
      })
      .await?;
    Ok(entry)
  }

  async fn list_audit(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>> {
    let mut conds = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    if let Some(entity_type) = &query.entity_type {
      conds.push("entity_type = ?");
      values.push(Value::Text(entity_type.clone()));
    }
    if let Some(entity_id) = query.entity_id {
      conds.push("entity_id = ?");
      values.push(Value::Text(encode_uuid(entity_id)));
    }
    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };
    values.push(Value::Integer(query.limit.unwrap_or(DEFAULT_LIST_LIMIT) as i64));
    let sql = format!(
      "SELECT {COLUMNS} FROM audit_log {where_clause}
       ORDER BY created_at DESC, rowid DESC LIMIT ?"
    );

    let entries = self
      .conn
      .call(move |conn| Ok(query_all(conn, &sql, &values, entry_from_row)?))
      .await?;
    Ok(entries)
  }
}
