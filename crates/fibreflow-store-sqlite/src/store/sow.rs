use chrono::Utc;
use fibreflow_core::{
  sow::{
    CustomerDrop, FibreSegment, NewCustomerDrop, NewFibreSegment, NewPole, Pole, SowSummary,
  },
  store::{ListQuery, SowStore},
};
use rusqlite::{Row, types::Value};
use uuid::Uuid;

use super::{Filter, SqliteStore, placeholders, query_all};
use crate::{
  Result,
  encode::{dt_col, encode_dt, encode_uuid, uuid_col},
};

/// How one SOW input type maps onto its table.
trait SowTable: Send + 'static {
  const TABLE: &'static str;
  const KEY: &'static str;
  /// Data columns after `id, project_id, <KEY>` and before the timestamps.
  const FIELDS: &'static [&'static str];

  fn key(&self) -> &str;
  fn field_values(self) -> Vec<Value>;
}

impl SowTable for NewPole {
  const FIELDS: &'static [&'static str] =
    &["status", "pole_type", "height", "latitude", "longitude", "zone", "pon"];
  const KEY: &'static str = "pole_number";
  const TABLE: &'static str = "sow_poles";

  fn key(&self) -> &str { &self.pole_number }

  fn field_values(self) -> Vec<Value> {
    vec![
      self.status.into(),
      self.pole_type.into(),
      self.height.into(),
      self.latitude.into(),
      self.longitude.into(),
      self.zone.into(),
      self.pon.into(),
    ]
  }
}

impl SowTable for NewCustomerDrop {
  const FIELDS: &'static [&'static str] =
    &["pole_number", "address", "status", "cable_length", "latitude", "longitude"];
  const KEY: &'static str = "drop_number";
  const TABLE: &'static str = "sow_drops";

  fn key(&self) -> &str { &self.drop_number }

  fn field_values(self) -> Vec<Value> {
    vec![
      self.pole_number.into(),
      self.address.into(),
      self.status.into(),
      self.cable_length.into(),
      self.latitude.into(),
      self.longitude.into(),
    ]
  }
}

impl SowTable for NewFibreSegment {
  const FIELDS: &'static [&'static str] = &[
    "from_point",
    "to_point",
    "cable_type",
    "fibre_count",
    "length",
    "status",
    "contractor",
  ];
  const KEY: &'static str = "segment_id";
  const TABLE: &'static str = "sow_fibre";

  fn key(&self) -> &str { &self.segment_id }

  fn field_values(self) -> Vec<Value> {
    vec![
      self.from_point.into(),
      self.to_point.into(),
      self.cable_type.into(),
      self.fibre_count.map(i64::from).into(),
      self.length.into(),
      self.status.into(),
      self.contractor.into(),
    ]
  }
}

/// One multi-row `INSERT … ON CONFLICT (project_id, key) DO UPDATE`.
///
/// On conflict the existing row keeps its id and `created_at`, and columns
/// the incoming row leaves empty keep their stored value.
fn upsert_sql<T: SowTable>(rows: usize) -> String {
  let table = T::TABLE;
  let key = T::KEY;
  let columns = ["id", "project_id", key]
    .into_iter()
    .chain(T::FIELDS.iter().copied())
    .chain(["created_at", "updated_at"])
    .collect::<Vec<_>>();
  let set = T::FIELDS
    .iter()
    .map(|c| format!("{c} = COALESCE(excluded.{c}, {table}.{c})"))
    .chain(["updated_at = excluded.updated_at".to_owned()])
    .collect::<Vec<_>>()
    .join(", ");
  format!(
    "INSERT INTO {table} ({}) VALUES {} ON CONFLICT (project_id, {key}) DO UPDATE SET {set}",
    columns.join(", "),
    placeholders(rows, columns.len()),
  )
}

fn upsert_values<T: SowTable>(project_id: Uuid, batch: Vec<T>) -> Vec<Value> {
  let project_id = encode_uuid(project_id);
  let now = encode_dt(Utc::now());
  let mut values = Vec::with_capacity(batch.len() * (T::FIELDS.len() + 5));
  for row in batch {
    values.push(Value::Text(encode_uuid(Uuid::new_v4())));
    values.push(Value::Text(project_id.clone()));
    values.push(Value::Text(row.key().trim().to_owned()));
    values.extend(row.field_values());
    values.push(Value::Text(now.clone()));
    values.push(Value::Text(now.clone()));
  }
  values
}

impl SqliteStore {
  async fn upsert_sow<T: SowTable>(&self, project_id: Uuid, batch: Vec<T>) -> Result<usize> {
    if batch.is_empty() {
      return Ok(0);
    }
    let rows = batch.len();
    let sql = upsert_sql::<T>(rows);
    let values = upsert_values(project_id, batch);

    self
      .conn
      .call(move |conn| Ok(conn.execute(&sql, rusqlite::params_from_iter(values))?))
      .await?;
    tracing::debug!(table = T::TABLE, %project_id, rows, "upserted sow batch");
    Ok(rows)
  }
}

// ─── Row decoding ────────────────────────────────────────────────────────────

const POLE_COLUMNS: &str = "id, project_id, pole_number, status, pole_type, height, latitude, \
                            longitude, zone, pon, created_at, updated_at";

fn pole_from_row(row: &Row<'_>) -> rusqlite::Result<Pole> {
  Ok(Pole {
    id:          uuid_col(row, "id")?,
    project_id:  uuid_col(row, "project_id")?,
    pole_number: row.get("pole_number")?,
    status:      row.get("status")?,
    pole_type:   row.get("pole_type")?,
    height:      row.get("height")?,
    latitude:    row.get("latitude")?,
    longitude:   row.get("longitude")?,
    zone:        row.get("zone")?,
    pon:         row.get("pon")?,
    created_at:  dt_col(row, "created_at")?,
    updated_at:  dt_col(row, "updated_at")?,
  })
}

const DROP_COLUMNS: &str = "id, project_id, drop_number, pole_number, address, status, \
                            cable_length, latitude, longitude, created_at, updated_at";

fn drop_from_row(row: &Row<'_>) -> rusqlite::Result<CustomerDrop> {
  Ok(CustomerDrop {
    id:           uuid_col(row, "id")?,
    project_id:   uuid_col(row, "project_id")?,
    drop_number:  row.get("drop_number")?,
    pole_number:  row.get("pole_number")?,
    address:      row.get("address")?,
    status:       row.get("status")?,
    cable_length: row.get("cable_length")?,
    latitude:     row.get("latitude")?,
    longitude:    row.get("longitude")?,
    created_at:   dt_col(row, "created_at")?,
    updated_at:   dt_col(row, "updated_at")?,
  })
}

const FIBRE_COLUMNS: &str = "id, project_id, segment_id, from_point, to_point, cable_type, \
                             fibre_count, length, status, contractor, created_at, updated_at";

fn fibre_from_row(row: &Row<'_>) -> rusqlite::Result<FibreSegment> {
  Ok(FibreSegment {
    id:          uuid_col(row, "id")?,
    project_id:  uuid_col(row, "project_id")?,
    segment_id:  row.get("segment_id")?,
    from_point:  row.get("from_point")?,
    to_point:    row.get("to_point")?,
    cable_type:  row.get("cable_type")?,
    fibre_count: row.get("fibre_count")?,
    length:      row.get("length")?,
    status:      row.get("status")?,
    contractor:  row.get("contractor")?,
    created_at:  dt_col(row, "created_at")?,
    updated_at:  dt_col(row, "updated_at")?,
  })
}

/// SOW lists are always scoped to one project.
fn sow_filter(query: &ListQuery, key: &str) -> Option<Filter> {
  let project_id = query.project_id?;
  let mut filter = Filter::from_query(query, &[key]);
  filter.eq("project_id", encode_uuid(project_id));
  Some(filter)
}

impl SowStore for SqliteStore {
  async fn upsert_poles(&self, project_id: Uuid, batch: Vec<NewPole>) -> Result<usize> {
    self.upsert_sow(project_id, batch).await
  }

  async fn upsert_drops(&self, project_id: Uuid, batch: Vec<NewCustomerDrop>) -> Result<usize> {
    self.upsert_sow(project_id, batch).await
  }

  async fn upsert_fibre(&self, project_id: Uuid, batch: Vec<NewFibreSegment>) -> Result<usize> {
    self.upsert_sow(project_id, batch).await
  }

  async fn list_poles(&self, query: &ListQuery) -> Result<Vec<Pole>> {
    let Some(filter) = sow_filter(query, "pole_number") else {
      return Ok(Vec::new());
    };
    let (sql, values) = filter.select(POLE_COLUMNS, "sow_poles", "pole_number", query);
    let poles = self
      .conn
      .call(move |conn| Ok(query_all(conn, &sql, &values, pole_from_row)?))
      .await?;
    Ok(poles)
  }

  async fn list_drops(&self, query: &ListQuery) -> Result<Vec<CustomerDrop>> {
    let Some(filter) = sow_filter(query, "drop_number") else {
      return Ok(Vec::new());
    };
    let (sql, values) = filter.select(DROP_COLUMNS, "sow_drops", "drop_number", query);
    let drops = self
      .conn
      .call(move |conn| Ok(query_all(conn, &sql, &values, drop_from_row)?))
      .await?;
    Ok(drops)
  }

  async fn list_fibre(&self, query: &ListQuery) -> Result<Vec<FibreSegment>> {
    let Some(filter) = sow_filter(query, "segment_id") else {
      return Ok(Vec::new());
    };
    let (sql, values) = filter.select(FIBRE_COLUMNS, "sow_fibre", "segment_id", query);
    let fibre = self
      .conn
      .call(move |conn| Ok(query_all(conn, &sql, &values, fibre_from_row)?))
      .await?;
    Ok(fibre)
  }

  async fn sow_summary(&self, project_id: Uuid) -> Result<SowSummary> {
    let id = encode_uuid(project_id);
    let (poles, drops, fibre_segments, fibre_length) = self
      .conn
      .call(move |conn| {
        let counts = conn.query_row(
          "SELECT
             (SELECT COUNT(*) FROM sow_poles WHERE project_id = ?1),
             (SELECT COUNT(*) FROM sow_drops WHERE project_id = ?1),
             (SELECT COUNT(*) FROM sow_fibre WHERE project_id = ?1),
             (SELECT COALESCE(SUM(length), 0.0) FROM sow_fibre WHERE project_id = ?1)",
          [id],
          |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )?;
        Ok(counts)
      })
      .await?;
    Ok(SowSummary { project_id, poles, drops, fibre_segments, fibre_length })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pole_upsert_statement_shape() {
    let sql = upsert_sql::<NewPole>(2);
    assert!(sql.starts_with(
      "INSERT INTO sow_poles (id, project_id, pole_number, status, pole_type, height, latitude, \
       longitude, zone, pon, created_at, updated_at) VALUES (?"
    ));
    assert!(sql.contains("ON CONFLICT (project_id, pole_number) DO UPDATE SET"));
    assert!(sql.contains("status = COALESCE(excluded.status, sow_poles.status)"));
    assert!(sql.ends_with("updated_at = excluded.updated_at"));
    assert_eq!(sql.matches('?').count(), 24);
  }
}
