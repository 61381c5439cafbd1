use chrono::Utc;
use fibreflow_core::{
  client::{Client, ClientUpdate, NewClient},
  store::{ClientStore, ListQuery},
  validate::Validate,
};
use rusqlite::{OptionalExtension as _, Row};
use uuid::Uuid;

use super::{Filter, SqliteStore, query_all};
use crate::{
  Result,
  encode::{dt_col, encode_dt, encode_enum, encode_uuid, enum_col, uuid_col},
};

const COLUMNS: &str = "id, company_name, contact_person, email, phone, address, city, \
                       province, industry, status, notes, created_at, updated_at";

fn client_from_row(row: &Row<'_>) -> rusqlite::Result<Client> {
  Ok(Client {
    id:             uuid_col(row, "id")?,
    company_name:   row.get("company_name")?,
    contact_person: row.get("contact_person")?,
    email:          row.get("email")?,
    phone:          row.get("phone")?,
    address:        row.get("address")?,
    city:           row.get("city")?,
    province:       row.get("province")?,
    industry:       row.get("industry")?,
    status:         enum_col(row, "status")?,
    notes:          row.get("notes")?,
    created_at:     dt_col(row, "created_at")?,
    updated_at:     dt_col(row, "updated_at")?,
  })
}

impl ClientStore for SqliteStore {
  async fn create_client(&self, input: NewClient) -> Result<Client> {
    input.validate()?;
    let id = encode_uuid(Uuid::new_v4());
    let now = encode_dt(Utc::now());
    let status = encode_enum(input.status);

    let client = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "INSERT INTO clients (id, company_name, contact_person, email, phone, address,
             city, province, industry, status, notes, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
           RETURNING {COLUMNS}"
        );
        let client = conn.query_row(
          &sql,
          rusqlite::params![
            id,
            input.company_name.trim(),
            input.contact_person,
            input.email,
            input.phone,
            input.address,
            input.city,
            input.province,
            input.industry,
            status,
            input.notes,
            now,
          ],
          client_from_row,
        )?;
        Ok(client)
      })
      .await?;
    Ok(client)
  }

  async fn get_client(&self, id: Uuid) -> Result<Option<Client>> {
    let id = encode_uuid(id);
    let client = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {COLUMNS} FROM clients WHERE id = ?1");
        Ok(conn.query_row(&sql, [id], client_from_row).optional()?)
      })
      .await?;
    Ok(client)
  }

  async fn list_clients(&self, query: &ListQuery) -> Result<Vec<Client>> {
    let (sql, values) = Filter::from_query(query, &["company_name", "contact_person", "email"])
      .select(COLUMNS, "clients", "company_name", query);
    let clients = self
      .conn
      .call(move |conn| Ok(query_all(conn, &sql, &values, client_from_row)?))
      .await?;
    Ok(clients)
  }

  async fn update_client(&self, id: Uuid, update: ClientUpdate) -> Result<Option<Client>> {
    update.validate()?;
    let id = encode_uuid(id);
    let now = encode_dt(Utc::now());
    let status = update.status.map(encode_enum);

    let client = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "UPDATE clients SET
             company_name   = COALESCE(?2, company_name),
             contact_person = COALESCE(?3, contact_person),
             email          = COALESCE(?4, email),
             phone          = COALESCE(?5, phone),
             address        = COALESCE(?6, address),
             city           = COALESCE(?7, city),
             province       = COALESCE(?8, province),
             industry       = COALESCE(?9, industry),
             status         = COALESCE(?10, status),
             notes          = COALESCE(?11, notes),
             updated_at     = ?12
           WHERE id = ?1
           RETURNING {COLUMNS}"
        );
        let client = conn
          .query_row(
            &sql,
            rusqlite::params![
              id,
              update.company_name.as_deref().map(str::trim),
              update.contact_person,
              update.email,
              update.phone,
              update.address,
              update.city,
              update.province,
              update.industry,
              status,
              update.notes,
              now,
            ],
            client_from_row,
          )
          .optional()?;
        Ok(client)
      })
      .await?;
    Ok(client)
  }

  async fn delete_client(&self, id: Uuid) -> Result<bool> {
    let id = encode_uuid(id);
    let n = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM clients WHERE id = ?1", [id])?))
      .await?;
    Ok(n > 0)
  }
}
