use chrono::Utc;
use fibreflow_core::{
  staff::{NewStaff, Staff, StaffUpdate},
  store::{ListQuery, StaffStore},
  validate::Validate,
};
use rusqlite::{OptionalExtension as _, Row, types::Value};
use uuid::Uuid;

use super::{Filter, SqliteStore, query_all};
use crate::{
  Result,
  encode::{
    date_col, dt_col, encode_dt, encode_enum, encode_opt_date, encode_opt_uuid, encode_uuid,
    enum_col, opt_uuid_col, uuid_col,
  },
};

const COLUMNS: &str = "id, employee_id, name, email, phone, department, position, status, \
                       join_date, manager_id, created_at, updated_at";

fn staff_from_row(row: &Row<'_>) -> rusqlite::Result<Staff> {
  Ok(Staff {
    id:          uuid_col(row, "id")?,
    employee_id: row.get("employee_id")?,
    name:        row.get("name")?,
    email:       row.get("email")?,
    phone:       row.get("phone")?,
    department:  row.get("department")?,
    position:    row.get("position")?,
    status:      enum_col(row, "status")?,
    join_date:   date_col(row, "join_date")?,
    manager_id:  opt_uuid_col(row, "manager_id")?,
    created_at:  dt_col(row, "created_at")?,
    updated_at:  dt_col(row, "updated_at")?,
  })
}

/// Bind values for one `staff` row in `COLUMNS` order.
fn staff_values(s: NewStaff, now: &str) -> [Value; 12] {
  [
    Value::Text(encode_uuid(Uuid::new_v4())),
    Value::Text(s.employee_id.trim().to_owned()),
    Value::Text(s.name.trim().to_owned()),
    s.email.into(),
    s.phone.into(),
    s.department.into(),
    s.position.into(),
    s.status.map(encode_enum).into(),
    encode_opt_date(s.join_date).into(),
    encode_opt_uuid(s.manager_id).into(),
    Value::Text(now.to_owned()),
    Value::Text(now.to_owned()),
  ]
}

impl StaffStore for SqliteStore {
  async fn create_staff(&self, input: NewStaff) -> Result<Staff> {
    input.validate()?;
    let input = NewStaff { status: Some(input.status.unwrap_or_default()), ..input };
    let values = staff_values(input, &encode_dt(Utc::now()));

    let staff = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "INSERT INTO staff ({COLUMNS})
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
           RETURNING {COLUMNS}"
        );
        Ok(conn.query_row(&sql, rusqlite::params_from_iter(values), staff_from_row)?)
      })
      .await?;
    Ok(staff)
  }

  async fn get_staff(&self, id: Uuid) -> Result<Option<Staff>> {
    let id = encode_uuid(id);
    let staff = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {COLUMNS} FROM staff WHERE id = ?1");
        Ok(conn.query_row(&sql, [id], staff_from_row).optional()?)
      })
      .await?;
    Ok(staff)
  }

  async fn list_staff(&self, query: &ListQuery) -> Result<Vec<Staff>> {
    let (sql, values) =
      Filter::from_query(query, &["employee_id", "name", "email", "department", "position"])
        .select(COLUMNS, "staff", "name, employee_id", query);
    let staff = self
      .conn
      .call(move |conn| Ok(query_all(conn, &sql, &values, staff_from_row)?))
      .await?;
    Ok(staff)
  }

  async fn update_staff(&self, id: Uuid, update: StaffUpdate) -> Result<Option<Staff>> {
    update.validate()?;
    let id = encode_uuid(id);
    let now = encode_dt(Utc::now());
    let status = update.status.map(encode_enum);
    let join_date = encode_opt_date(update.join_date);
    let manager_id = encode_opt_uuid(update.manager_id);

    let staff = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "UPDATE staff SET
             employee_id = COALESCE(?2, employee_id),
             name        = COALESCE(?3, name),
             email       = COALESCE(?4, email),
             phone       = COALESCE(?5, phone),
             department  = COALESCE(?6, department),
             position    = COALESCE(?7, position),
             status      = COALESCE(?8, status),
             join_date   = COALESCE(?9, join_date),
             manager_id  = COALESCE(?10, manager_id),
             updated_at  = ?11
           WHERE id = ?1
           RETURNING {COLUMNS}"
        );
        let staff = conn
          .query_row(
            &sql,
            rusqlite::params![
              id,
              update.employee_id.as_deref().map(str::trim),
              update.name.as_deref().map(str::trim),
              update.email,
              update.phone,
              update.department,
              update.position,
              status,
              join_date,
              manager_id,
              now,
            ],
            staff_from_row,
          )
          .optional()?;
        Ok(staff)
      })
      .await?;
    Ok(staff)
  }

  async fn delete_staff(&self, id: Uuid) -> Result<bool> {
    let id = encode_uuid(id);
    let n = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM staff WHERE id = ?1", [id])?))
      .await?;
    Ok(n > 0)
  }

  async fn upsert_staff(&self, batch: Vec<NewStaff>) -> Result<usize> {
    if batch.is_empty() {
      return Ok(0);
    }
    for s in &batch {
      s.validate()?;
    }
    let rows = batch.len();
    let now = encode_dt(Utc::now());
    let batch: Vec<[Value; 12]> = batch.into_iter().map(|s| staff_values(s, &now)).collect();

    // Existing rows keep their id and created_at; blank import cells, status
    // included, do not erase stored values. New rows without a status start
    // out active.
    let sql = format!(
      "INSERT INTO staff ({COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, COALESCE(?8, 'active'), ?9, ?10, ?11, ?12)
       ON CONFLICT (employee_id) DO UPDATE SET
         name       = excluded.name,
         email      = COALESCE(excluded.email, staff.email),
         phone      = COALESCE(excluded.phone, staff.phone),
         department = COALESCE(excluded.department, staff.department),
         position   = COALESCE(excluded.position, staff.position),
         status     = COALESCE(?8, staff.status),
         join_date  = COALESCE(excluded.join_date, staff.join_date),
         manager_id = COALESCE(excluded.manager_id, staff.manager_id),
         updated_at = excluded.updated_at"
    );

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut written = 0;
        {
          let mut stmt = tx.prepare(&sql)?;
          for values in batch {
            written += stmt.execute(rusqlite::params_from_iter(values))?;
          }
        }
        tx.commit()?;
        Ok(written)
      })
      .await?;
    tracing::debug!(rows, written, "upserted staff batch");
    Ok(rows)
  }
}
