use chrono::{NaiveDate, Utc};
use fibreflow_core::{
  contractor::{
    Assignment, AssignmentUpdate, Contractor, ContractorDocument, ContractorUpdate,
    NewAssignment, NewContractor, NewDocument,
  },
  rag::{RagHistoryEntry, RagInputs, RagScores, RagStatus},
  store::{ContractorStore, ListQuery},
  validate::Validate,
};
use rusqlite::{OptionalExtension as _, Row};
use uuid::Uuid;

use super::{Filter, SqliteStore, query_all};
use crate::{
  Error, Result,
  encode::{
    date_col, dt_col, encode_date, encode_dt, encode_enum, encode_json, encode_opt_date,
    encode_uuid, enum_col, json_col, opt_dt_col, opt_enum_col, uuid_col,
  },
};

// ─── Contractors ─────────────────────────────────────────────────────────────

const COLUMNS: &str = "id, company_name, registration_number, contact_person, email, phone, \
                       business_type, services, insurance_coverage, insurance_expiry, \
                       bbbee_level, status, rag_overall, rag_financial, rag_compliance, \
                       rag_performance, rag_safety, rag_updated_at, created_at, updated_at";

fn rag_from_row(row: &Row<'_>) -> rusqlite::Result<Option<RagScores>> {
  let overall: Option<RagStatus> = opt_enum_col(row, "rag_overall")?;
  let Some(overall) = overall else {
    return Ok(None);
  };
  let part = |column| opt_enum_col(row, column).map(|s| s.unwrap_or(overall));
  Ok(Some(RagScores {
    overall,
    financial: part("rag_financial")?,
    compliance: part("rag_compliance")?,
    performance: part("rag_performance")?,
    safety: part("rag_safety")?,
  }))
}

fn contractor_from_row(row: &Row<'_>) -> rusqlite::Result<Contractor> {
  Ok(Contractor {
    id:                  uuid_col(row, "id")?,
    company_name:        row.get("company_name")?,
    registration_number: row.get("registration_number")?,
    contact_person:      row.get("contact_person")?,
    email:               row.get("email")?,
    phone:               row.get("phone")?,
    business_type:       row.get("business_type")?,
    services:            json_col(row, "services")?,
    insurance_coverage:  row.get("insurance_coverage")?,
    insurance_expiry:    date_col(row, "insurance_expiry")?,
    bbbee_level:         row.get("bbbee_level")?,
    status:              enum_col(row, "status")?,
    rag:                 rag_from_row(row)?,
    rag_updated_at:      opt_dt_col(row, "rag_updated_at")?,
    created_at:          dt_col(row, "created_at")?,
    updated_at:          dt_col(row, "updated_at")?,
  })
}

// ─── Assignments ─────────────────────────────────────────────────────────────

const ASSIGNMENT_COLUMNS: &str = "id, contractor_id, project_id, status, start_date, end_date, \
                                  quality_score, safety_incidents, created_at, updated_at";

fn assignment_from_row(row: &Row<'_>) -> rusqlite::Result<Assignment> {
  Ok(Assignment {
    id:               uuid_col(row, "id")?,
    contractor_id:    uuid_col(row, "contractor_id")?,
    project_id:       uuid_col(row, "project_id")?,
    status:           enum_col(row, "status")?,
    start_date:       date_col(row, "start_date")?,
    end_date:         date_col(row, "end_date")?,
    quality_score:    row.get("quality_score")?,
    safety_incidents: row.get("safety_incidents")?,
    created_at:       dt_col(row, "created_at")?,
    updated_at:       dt_col(row, "updated_at")?,
  })
}

// ─── Documents ───────────────────────────────────────────────────────────────

const DOCUMENT_COLUMNS: &str =
  "id, contractor_id, document_type, document_number, expiry_date, verified, created_at";

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<ContractorDocument> {
  Ok(ContractorDocument {
    id:              uuid_col(row, "id")?,
    contractor_id:   uuid_col(row, "contractor_id")?,
    document_type:   row.get("document_type")?,
    document_number: row.get("document_number")?,
    expiry_date:     date_col(row, "expiry_date")?,
    verified:        row.get("verified")?,
    created_at:      dt_col(row, "created_at")?,
  })
}

// ─── RAG history ─────────────────────────────────────────────────────────────

const HISTORY_COLUMNS: &str = "id, contractor_id, previous_overall, overall, financial, \
                               compliance, performance, safety, calculated_at";

fn history_from_row(row: &Row<'_>) -> rusqlite::Result<RagHistoryEntry> {
  Ok(RagHistoryEntry {
    id:               uuid_col(row, "id")?,
    contractor_id:    uuid_col(row, "contractor_id")?,
    previous_overall: opt_enum_col(row, "previous_overall")?,
    scores:           RagScores {
      overall:     enum_col(row, "overall")?,
      financial:   enum_col(row, "financial")?,
      compliance:  enum_col(row, "compliance")?,
      performance: enum_col(row, "performance")?,
      safety:      enum_col(row, "safety")?,
    },
    calculated_at:    dt_col(row, "calculated_at")?,
  })
}

/// Aggregates over a contractor's assignments, as stored.
const RAG_AGGREGATES: &str = "
  SELECT
    c.insurance_coverage,
    c.insurance_expiry,
    (SELECT COUNT(*) FROM contractor_projects p
      WHERE p.contractor_id = c.id AND p.status IN ('assigned', 'in_progress')),
    (SELECT COUNT(*) FROM contractor_projects p
      WHERE p.contractor_id = c.id AND p.status IN ('assigned', 'in_progress')
        AND p.end_date IS NOT NULL AND p.end_date < ?2),
    (SELECT AVG(p.quality_score) FROM contractor_projects p
      WHERE p.contractor_id = c.id AND p.status = 'completed'
        AND p.quality_score IS NOT NULL),
    (SELECT COALESCE(SUM(p.safety_incidents), 0) FROM contractor_projects p
      WHERE p.contractor_id = c.id),
    (SELECT COUNT(*) FROM contractor_documents d
      WHERE d.contractor_id = c.id AND d.expiry_date IS NOT NULL AND d.expiry_date < ?2)
  FROM contractors c
  WHERE c.id = ?1";

impl ContractorStore for SqliteStore {
  async fn create_contractor(&self, input: NewContractor) -> Result<Contractor> {
    input.validate()?;
    let id = encode_uuid(Uuid::new_v4());
    let now = encode_dt(Utc::now());
    let services = encode_json(&input.services)?;
    let expiry = encode_opt_date(input.insurance_expiry);
    let status = encode_enum(input.status);

    let contractor = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "INSERT INTO contractors (id, company_name, registration_number, contact_person,
             email, phone, business_type, services, insurance_coverage, insurance_expiry,
             bbbee_level, status, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
           RETURNING {COLUMNS}"
        );
        let contractor = conn.query_row(
          &sql,
          rusqlite::params![
            id,
            input.company_name.trim(),
            input.registration_number.trim(),
            input.contact_person,
            input.email,
            input.phone,
            input.business_type,
            services,
            input.insurance_coverage,
            expiry,
            input.bbbee_level,
            status,
            now,
          ],
          contractor_from_row,
        )?;
        Ok(contractor)
      })
      .await?;
    Ok(contractor)
  }

  async fn get_contractor(&self, id: Uuid) -> Result<Option<Contractor>> {
    let id = encode_uuid(id);
    let contractor = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {COLUMNS} FROM contractors WHERE id = ?1");
        Ok(conn.query_row(&sql, [id], contractor_from_row).optional()?)
      })
      .await?;
    Ok(contractor)
  }

  async fn list_contractors(&self, query: &ListQuery) -> Result<Vec<Contractor>> {
    let (sql, values) = Filter::from_query(
      query,
      &["company_name", "registration_number", "contact_person", "email"],
    )
    .select(COLUMNS, "contractors", "company_name, id", query);
    let contractors = self
      .conn
      .call(move |conn| Ok(query_all(conn, &sql, &values, contractor_from_row)?))
      .await?;
    Ok(contractors)
  }

  async fn update_contractor(
    &self,
    id: Uuid,
    update: ContractorUpdate,
  ) -> Result<Option<Contractor>> {
    update.validate()?;
    let id = encode_uuid(id);
    let now = encode_dt(Utc::now());
    let services = update.services.as_ref().map(encode_json).transpose()?;
    let expiry = encode_opt_date(update.insurance_expiry);
    let status = update.status.map(encode_enum);

    let contractor = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "UPDATE contractors SET
             company_name        = COALESCE(?2, company_name),
             registration_number = COALESCE(?3, registration_number),
             contact_person      = COALESCE(?4, contact_person),
             email               = COALESCE(?5, email),
             phone               = COALESCE(?6, phone),
             business_type       = COALESCE(?7, business_type),
             services            = COALESCE(?8, services),
             insurance_coverage  = COALESCE(?9, insurance_coverage),
             insurance_expiry    = COALESCE(?10, insurance_expiry),
             bbbee_level         = COALESCE(?11, bbbee_level),
             status              = COALESCE(?12, status),
             updated_at          = ?13
           WHERE id = ?1
           RETURNING {COLUMNS}"
        );
        let contractor = conn
          .query_row(
            &sql,
            rusqlite::params![
              id,
              update.company_name.as_deref().map(str::trim),
              update.registration_number.as_deref().map(str::trim),
              update.contact_person,
              update.email,
              update.phone,
              update.business_type,
              services,
              update.insurance_coverage,
              expiry,
              update.bbbee_level,
              status,
              now,
            ],
            contractor_from_row,
          )
          .optional()?;
        Ok(contractor)
      })
      .await?;
    Ok(contractor)
  }

  async fn delete_contractor(&self, id: Uuid) -> Result<bool> {
    let id = encode_uuid(id);
    let n = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM contractors WHERE id = ?1", [id])?))
      .await?;
    Ok(n > 0)
  }

  // ── Assignments ───────────────────────────────────────────────────────

  async fn create_assignment(&self, input: NewAssignment) -> Result<Assignment> {
    input.validate()?;
    let id = encode_uuid(Uuid::new_v4());
    let contractor_id = encode_uuid(input.contractor_id);
    let project_id = encode_uuid(input.project_id);
    let status = encode_enum(input.status);
    let start = encode_opt_date(input.start_date);
    let end = encode_opt_date(input.end_date);
    let now = encode_dt(Utc::now());

    let assignment = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "INSERT INTO contractor_projects ({ASSIGNMENT_COLUMNS})
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
           RETURNING {ASSIGNMENT_COLUMNS}"
        );
        let assignment = conn.query_row(
          &sql,
          rusqlite::params![
            id,
            contractor_id,
            project_id,
            status,
            start,
            end,
            input.quality_score,
            input.safety_incidents,
            now,
          ],
          assignment_from_row,
        )?;
        Ok(assignment)
      })
      .await?;
    Ok(assignment)
  }

  async fn list_assignments(&self, contractor_id: Uuid) -> Result<Vec<Assignment>> {
    let contractor_id = encode_uuid(contractor_id);
    let assignments = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {ASSIGNMENT_COLUMNS} FROM contractor_projects
           WHERE contractor_id = ?1
           ORDER BY created_at DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([contractor_id], assignment_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(assignments)
  }

  async fn update_assignment(
    &self,
    id: Uuid,
    update: AssignmentUpdate,
  ) -> Result<Option<Assignment>> {
    update.validate()?;
    let id = encode_uuid(id);
    let status = update.status.map(encode_enum);
    let start = encode_opt_date(update.start_date);
    let end = encode_opt_date(update.end_date);
    let now = encode_dt(Utc::now());

    let assignment = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "UPDATE contractor_projects SET
             status           = COALESCE(?2, status),
             start_date       = COALESCE(?3, start_date),
             end_date         = COALESCE(?4, end_date),
             quality_score    = COALESCE(?5, quality_score),
             safety_incidents = COALESCE(?6, safety_incidents),
             updated_at       = ?7
           WHERE id = ?1
           RETURNING {ASSIGNMENT_COLUMNS}"
        );
        let assignment = conn
          .query_row(
            &sql,
            rusqlite::params![
              id,
              status,
              start,
              end,
              update.quality_score,
              update.safety_incidents,
              now,
            ],
            assignment_from_row,
          )
          .optional()?;
        Ok(assignment)
      })
      .await?;
    Ok(assignment)
  }

  // ── Documents ─────────────────────────────────────────────────────────

  async fn create_document(&self, input: NewDocument) -> Result<ContractorDocument> {
    input.validate()?;
    let id = encode_uuid(Uuid::new_v4());
    let contractor_id = encode_uuid(input.contractor_id);
    let expiry = encode_opt_date(input.expiry_date);
    let now = encode_dt(Utc::now());

    let document = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "INSERT INTO contractor_documents ({DOCUMENT_COLUMNS})
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           RETURNING {DOCUMENT_COLUMNS}"
        );
        let document = conn.query_row(
          &sql,
          rusqlite::params![
            id,
            contractor_id,
            input.document_type.trim(),
            input.document_number,
            expiry,
            input.verified,
            now,
          ],
          document_from_row,
        )?;
        Ok(document)
      })
      .await?;
    Ok(document)
  }

  async fn list_documents(&self, contractor_id: Uuid) -> Result<Vec<ContractorDocument>> {
    let contractor_id = encode_uuid(contractor_id);
    let documents = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {DOCUMENT_COLUMNS} FROM contractor_documents
           WHERE contractor_id = ?1
           ORDER BY document_type, created_at"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([contractor_id], document_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(documents)
  }

  async fn delete_document(&self, id: Uuid) -> Result<bool> {
    let id = encode_uuid(id);
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM contractor_documents WHERE id = ?1", [id])?)
      })
      .await?;
    Ok(n > 0)
  }

  // ── RAG ───────────────────────────────────────────────────────────────

  async fn rag_inputs(&self, contractor_id: Uuid, today: NaiveDate) -> Result<Option<RagInputs>> {
    let id = encode_uuid(contractor_id);
    let today = encode_date(today);

    let inputs = self
      .conn
      .call(move |conn| {
        let inputs = conn
          .query_row(RAG_AGGREGATES, [id, today], |row| {
            Ok(RagInputs {
              insurance_coverage: row.get(0)?,
              insurance_expiry:   date_col(row, "insurance_expiry")?,
              active_projects:    row.get(2)?,
              overdue_projects:   row.get(3)?,
              average_quality:    row.get(4)?,
              safety_incidents:   row.get(5)?,
              expired_documents:  row.get(6)?,
            })
          })
          .optional()?;
        Ok(inputs)
      })
      .await?;
    Ok(inputs)
  }

  async fn apply_rag(&self, contractor_id: Uuid, scores: RagScores) -> Result<RagHistoryEntry> {
    let id = encode_uuid(contractor_id);
    let history_id = encode_uuid(Uuid::new_v4());
    let now = encode_dt(Utc::now());
    let parts = [
      encode_enum(scores.overall),
      encode_enum(scores.financial),
      encode_enum(scores.compliance),
      encode_enum(scores.performance),
      encode_enum(scores.safety),
    ];

    let entry = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let previous: Option<Option<String>> = tx
          .query_row(
            "SELECT rag_overall FROM contractors WHERE id = ?1",
            [&id],
            |r| r.get(0),
          )
          .optional()?;
        let Some(previous) = previous else {
          return Ok(None);
        };

        tx.execute(
          "UPDATE contractors SET
             rag_overall = ?2, rag_financial = ?3, rag_compliance = ?4,
             rag_performance = ?5, rag_safety = ?6, rag_updated_at = ?7
           WHERE id = ?1",
          rusqlite::params![id, parts[0], parts[1], parts[2], parts[3], parts[4], now],
        )?;

        let sql = format!(
          "INSERT INTO contractor_rag_history ({HISTORY_COLUMNS})
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
           RETURNING {HISTORY_COLUMNS}"
        );
        let entry = tx.query_row(
          &sql,
          rusqlite::params![
            history_id, id, previous, parts[0], parts[1], parts[2], parts[3], parts[4], now,
          ],
          history_from_row,
        )?;

        tx.commit()?;
        Ok(Some(entry))
      })
      .await?;

    entry.ok_or(Error::ContractorNotFound(contractor_id))
  }

  async fn rag_history(&self, contractor_id: Uuid, limit: usize) -> Result<Vec<RagHistoryEntry>> {
    let id = encode_uuid(contractor_id);
    let limit = limit as i64;
    let history = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {HISTORY_COLUMNS} FROM contractor_rag_history
           WHERE contractor_id = ?1
           ORDER BY calculated_at DESC, rowid DESC
           LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id, limit], history_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(history)
  }
}
