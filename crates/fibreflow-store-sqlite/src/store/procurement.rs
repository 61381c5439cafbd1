use chrono::Utc;
use fibreflow_core::{
  procurement::{Boq, BoqUpdate, NewBoq, NewRfq, Rfq, RfqUpdate, boq_total},
  store::{ListQuery, ProcurementStore},
  validate::Validate,
};
use rusqlite::{OptionalExtension as _, Row};
use uuid::Uuid;

use super::{Filter, SqliteStore, query_all};
use crate::{
  Result,
  encode::{
    date_col, dt_col, encode_dt, encode_enum, encode_json, encode_opt_date, encode_opt_uuid,
    encode_uuid, enum_col, json_col, opt_uuid_col, uuid_col,
  },
};

// ─── BOQ ─────────────────────────────────────────────────────────────────────

const BOQ_COLUMNS: &str = "id, project_id, boq_number, title, version, status, currency, items, \
                           total_amount, notes, created_at, updated_at";

fn boq_from_row(row: &Row<'_>) -> rusqlite::Result<Boq> {
  Ok(Boq {
    id:           uuid_col(row, "id")?,
    project_id:   uuid_col(row, "project_id")?,
    boq_number:   row.get("boq_number")?,
    title:        row.get("title")?,
    version:      row.get("version")?,
    status:       enum_col(row, "status")?,
    currency:     row.get("currency")?,
    items:        json_col(row, "items")?,
    total_amount: row.get("total_amount")?,
    notes:        row.get("notes")?,
    created_at:   dt_col(row, "created_at")?,
    updated_at:   dt_col(row, "updated_at")?,
  })
}

// ─── RFQ ─────────────────────────────────────────────────────────────────────

const RFQ_COLUMNS: &str = "id, project_id, rfq_number, title, description, category, \
                           required_certifications, boq_id, status, due_date, \
                           invited_supplier_ids, awarded_supplier_id, created_at, updated_at";

fn rfq_from_row(row: &Row<'_>) -> rusqlite::Result<Rfq> {
  Ok(Rfq {
    id:                      uuid_col(row, "id")?,
    project_id:              uuid_col(row, "project_id")?,
    rfq_number:              row.get("rfq_number")?,
    title:                   row.get("title")?,
    description:             row.get("description")?,
    category:                row.get("category")?,
    required_certifications: json_col(row, "required_certifications")?,
    boq_id:                  opt_uuid_col(row, "boq_id")?,
    status:                  enum_col(row, "status")?,
    due_date:                date_col(row, "due_date")?,
    invited_supplier_ids:    json_col(row, "invited_supplier_ids")?,
    awarded_supplier_id:     opt_uuid_col(row, "awarded_supplier_id")?,
    created_at:              dt_col(row, "created_at")?,
    updated_at:              dt_col(row, "updated_at")?,
  })
}

fn project_filter(query: &ListQuery, text_columns: &[&str]) -> Filter {
  let mut filter = Filter::from_query(query, text_columns);
  if let Some(project_id) = query.project_id {
    filter.eq("project_id", encode_uuid(project_id));
  }
  filter
}

impl ProcurementStore for SqliteStore {
  async fn create_boq(&self, input: NewBoq) -> Result<Boq> {
    input.validate()?;
    let id = encode_uuid(Uuid::new_v4());
    let project_id = encode_uuid(input.project_id);
    let now = encode_dt(Utc::now());
    let status = encode_enum(input.status);
    let total = boq_total(&input.items);
    let items = encode_json(&input.items)?;

    let boq = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "INSERT INTO boqs ({BOQ_COLUMNS})
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
           RETURNING {BOQ_COLUMNS}"
        );
        let boq = conn.query_row(
          &sql,
          rusqlite::params![
            id,
            project_id,
            input.boq_number.trim(),
            input.title.trim(),
            input.version,
            status,
            input.currency.trim(),
            items,
            total,
            input.notes,
            now,
          ],
          boq_from_row,
        )?;
        Ok(boq)
      })
      .await?;
    Ok(boq)
  }

  async fn get_boq(&self, id: Uuid) -> Result<Option<Boq>> {
    let id = encode_uuid(id);
    let boq = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {BOQ_COLUMNS} FROM boqs WHERE id = ?1");
        Ok(conn.query_row(&sql, [id], boq_from_row).optional()?)
      })
      .await?;
    Ok(boq)
  }

  async fn list_boqs(&self, query: &ListQuery) -> Result<Vec<Boq>> {
    let (sql, values) = project_filter(query, &["boq_number", "title"]).select(
      BOQ_COLUMNS,
      "boqs",
      "boq_number, version DESC",
      query,
    );
    let boqs = self
      .conn
      .call(move |conn| Ok(query_all(conn, &sql, &values, boq_from_row)?))
      .await?;
    Ok(boqs)
  }

  async fn update_boq(&self, id: Uuid, update: BoqUpdate) -> Result<Option<Boq>> {
    update.validate()?;
    let id = encode_uuid(id);
    let now = encode_dt(Utc::now());
    let status = update.status.map(encode_enum);
    let total = update.items.as_deref().map(boq_total);
    let items = update.items.as_ref().map(encode_json).transpose()?;

    let boq = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "UPDATE boqs SET
             boq_number   = COALESCE(?2, boq_number),
             title        = COALESCE(?3, title),
             version      = COALESCE(?4, version),
             status       = COALESCE(?5, status),
             currency     = COALESCE(?6, currency),
             items        = COALESCE(?7, items),
             total_amount = COALESCE(?8, total_amount),
             notes        = COALESCE(?9, notes),
             updated_at   = ?10
           WHERE id = ?1
           RETURNING {BOQ_COLUMNS}"
        );
        let boq = conn
          .query_row(
            &sql,
            rusqlite::params![
              id,
              update.boq_number.as_deref().map(str::trim),
              update.title.as_deref().map(str::trim),
              update.version,
              status,
              update.currency.as_deref().map(str::trim),
              items,
              total,
              update.notes,
              now,
            ],
            boq_from_row,
          )
          .optional()?;
        Ok(boq)
      })
      .await?;
    Ok(boq)
  }

  async fn delete_boq(&self, id: Uuid) -> Result<bool> {
    let id = encode_uuid(id);
    let n = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM boqs WHERE id = ?1", [id])?))
      .await?;
    Ok(n > 0)
  }

  async fn create_rfq(&self, input: NewRfq) -> Result<Rfq> {
    input.validate()?;
    let id = encode_uuid(Uuid::new_v4());
    let project_id = encode_uuid(input.project_id);
    let now = encode_dt(Utc::now());
    let certifications = encode_json(&input.required_certifications)?;
    let boq_id = encode_opt_uuid(input.boq_id);
    let status = encode_enum(input.status);
    let due = encode_opt_date(input.due_date);
    let invited = encode_json(&input.invited_supplier_ids)?;
    let awarded = encode_opt_uuid(input.awarded_supplier_id);

    let rfq = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "INSERT INTO rfqs ({RFQ_COLUMNS})
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
           RETURNING {RFQ_COLUMNS}"
        );
        let rfq = conn.query_row(
          &sql,
          rusqlite::params![
            id,
            project_id,
            input.rfq_number.trim(),
            input.title.trim(),
            input.description,
            input.category,
            certifications,
            boq_id,
            status,
            due,
            invited,
            awarded,
            now,
          ],
          rfq_from_row,
        )?;
        Ok(rfq)
      })
      .await?;
    Ok(rfq)
  }

  async fn get_rfq(&self, id: Uuid) -> Result<Option<Rfq>> {
    let id = encode_uuid(id);
    let rfq = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {RFQ_COLUMNS} FROM rfqs WHERE id = ?1");
        Ok(conn.query_row(&sql, [id], rfq_from_row).optional()?)
      })
      .await?;
    Ok(rfq)
  }

  async fn list_rfqs(&self, query: &ListQuery) -> Result<Vec<Rfq>> {
    let (sql, values) = project_filter(query, &["rfq_number", "title", "category"]).select(
      RFQ_COLUMNS,
      "rfqs",
      "created_at DESC, id",
      query,
    );
    let rfqs = self
      .conn
      .call(move |conn| Ok(query_all(conn, &sql, &values, rfq_from_row)?))
      .await?;
    Ok(rfqs)
  }

  async fn update_rfq(&self, id: Uuid, update: RfqUpdate) -> Result<Option<Rfq>> {
    update.validate()?;
    let Some(current) = self.get_rfq(id).await? else {
      return Ok(None);
    };
    update.check_award_against(&current)?;

    let id = encode_uuid(id);
    let now = encode_dt(Utc::now());
    let certifications = update.required_certifications.as_ref().map(encode_json).transpose()?;
    let boq_id = encode_opt_uuid(update.boq_id);
    let status = update.status.map(encode_enum);
    let due = encode_opt_date(update.due_date);
    let invited = update.invited_supplier_ids.as_ref().map(encode_json).transpose()?;
    let awarded = encode_opt_uuid(update.awarded_supplier_id);

    let rfq = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "UPDATE rfqs SET
             rfq_number              = COALESCE(?2, rfq_number),
             title                   = COALESCE(?3, title),
             description             = COALESCE(?4, description),
             category                = COALESCE(?5, category),
             required_certifications = COALESCE(?6, required_certifications),
             boq_id                  = COALESCE(?7, boq_id),
             status                  = COALESCE(?8, status),
             due_date                = COALESCE(?9, due_date),
             invited_supplier_ids    = COALESCE(?10, invited_supplier_ids),
             awarded_supplier_id     = COALESCE(?11, awarded_supplier_id),
             updated_at              = ?12
           WHERE id = ?1
           RETURNING {RFQ_COLUMNS}"
        );
        let rfq = conn
          .query_row(
            &sql,
            rusqlite::params![
              id,
              update.rfq_number.as_deref().map(str::trim),
              update.title.as_deref().map(str::trim),
              update.description,
              update.category,
              certifications,
              boq_id,
              status,
              due,
              invited,
              awarded,
              now,
            ],
            rfq_from_row,
          )
          .optional()?;
        Ok(rfq)
      })
      .await?;
    Ok(rfq)
  }

  async fn delete_rfq(&self, id: Uuid) -> Result<bool> {
    let id = encode_uuid(id);
    let n = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM rfqs WHERE id = ?1", [id])?))
      .await?;
    Ok(n > 0)
  }
}
