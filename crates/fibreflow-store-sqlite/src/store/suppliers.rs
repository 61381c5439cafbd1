use chrono::Utc;
use fibreflow_core::{
  store::{ListQuery, SupplierStore},
  supplier::{NewSupplier, Supplier, SupplierUpdate},
  validate::Validate,
};
use rusqlite::{OptionalExtension as _, Row};
use uuid::Uuid;

use super::{Filter, SqliteStore, query_all};
use crate::{
  Result,
  encode::{dt_col, encode_dt, encode_enum, encode_json, encode_uuid, enum_col, json_col, uuid_col},
};

const COLUMNS: &str = "id, name, supplier_code, contact_person, email, phone, city, province, \
                       country, categories, certifications, rating, performance_score, status, \
                       preferred, created_at, updated_at";

fn supplier_from_row(row: &Row<'_>) -> rusqlite::Result<Supplier> {
  Ok(Supplier {
    id:                uuid_col(row, "id")?,
    name:              row.get("name")?,
    supplier_code:     row.get("supplier_code")?,
    contact_person:    row.get("contact_person")?,
    email:             row.get("email")?,
    phone:             row.get("phone")?,
    city:              row.get("city")?,
    province:          row.get("province")?,
    country:           row.get("country")?,
    categories:        json_col(row, "categories")?,
    certifications:    json_col(row, "certifications")?,
    rating:            row.get("rating")?,
    performance_score: row.get("performance_score")?,
    status:            enum_col(row, "status")?,
    preferred:         row.get("preferred")?,
    created_at:        dt_col(row, "created_at")?,
    updated_at:        dt_col(row, "updated_at")?,
  })
}

impl SupplierStore for SqliteStore {
  async fn create_supplier(&self, input: NewSupplier) -> Result<Supplier> {
    input.validate()?;
    let id = encode_uuid(Uuid::new_v4());
    let now = encode_dt(Utc::now());
    let categories = encode_json(&input.categories)?;
    let certifications = encode_json(&input.certifications)?;
    let status = encode_enum(input.status);

    let supplier = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "INSERT INTO suppliers ({COLUMNS})
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)
           RETURNING {COLUMNS}"
        );
        let supplier = conn.query_row(
          &sql,
          rusqlite::params![
            id,
            input.name.trim(),
            input.supplier_code.trim(),
            input.contact_person,
            input.email,
            input.phone,
            input.city,
            input.province,
            input.country,
            categories,
            certifications,
            input.rating,
            input.performance_score,
            status,
            input.preferred,
            now,
          ],
          supplier_from_row,
        )?;
        Ok(supplier)
      })
      .await?;
    Ok(supplier)
  }

  async fn get_supplier(&self, id: Uuid) -> Result<Option<Supplier>> {
    let id = encode_uuid(id);
    let supplier = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {COLUMNS} FROM suppliers WHERE id = ?1");
        Ok(conn.query_row(&sql, [id], supplier_from_row).optional()?)
      })
      .await?;
    Ok(supplier)
  }

  async fn list_suppliers(&self, query: &ListQuery) -> Result<Vec<Supplier>> {
    let (sql, values) =
      Filter::from_query(query, &["name", "supplier_code", "contact_person", "email"])
        .select(COLUMNS, "suppliers", "name, id", query);
    let suppliers = self
      .conn
      .call(move |conn| Ok(query_all(conn, &sql, &values, supplier_from_row)?))
      .await?;
    Ok(suppliers)
  }

  async fn update_supplier(&self, id: Uuid, update: SupplierUpdate) -> Result<Option<Supplier>> {
    update.validate()?;
    let id = encode_uuid(id);
    let now = encode_dt(Utc::now());
    let categories = update.categories.as_ref().map(encode_json).transpose()?;
    let certifications = update.certifications.as_ref().map(encode_json).transpose()?;
    let status = update.status.map(encode_enum);

    let supplier = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "UPDATE suppliers SET
             name              = COALESCE(?2, name),
             supplier_code     = COALESCE(?3, supplier_code),
             contact_person    = COALESCE(?4, contact_person),
             email             = COALESCE(?5, email),
             phone             = COALESCE(?6, phone),
             city              = COALESCE(?7, city),
             province          = COALESCE(?8, province),
             country           = COALESCE(?9, country),
             categories        = COALESCE(?10, categories),
             certifications    = COALESCE(?11, certifications),
             rating            = COALESCE(?12, rating),
             performance_score = COALESCE(?13, performance_score),
             status            = COALESCE(?14, status),
             preferred         = COALESCE(?15, preferred),
             updated_at        = ?16
           WHERE id = ?1
           RETURNING {COLUMNS}"
        );
        let supplier = conn
          .query_row(
            &sql,
            rusqlite::params![
              id,
              update.name.as_deref().map(str::trim),
              update.supplier_code.as_deref().map(str::trim),
              update.contact_person,
              update.email,
              update.phone,
              update.city,
              update.province,
              update.country,
              categories,
              certifications,
              update.rating,
              update.performance_score,
              status,
              update.preferred,
              now,
            ],
            supplier_from_row,
          )
          .optional()?;
        Ok(supplier)
      })
      .await?;
    Ok(supplier)
  }

  async fn delete_supplier(&self, id: Uuid) -> Result<bool> {
    let id = encode_uuid(id);
    let n = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM suppliers WHERE id = ?1", [id])?))
      .await?;
    Ok(n > 0)
  }
}
