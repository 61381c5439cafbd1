use chrono::Utc;
use fibreflow_core::{
  project::{NewProject, Project, ProjectUpdate},
  store::{ListQuery, ProjectStore},
  validate::Validate,
};
use rusqlite::{OptionalExtension as _, Row};
use uuid::Uuid;

use super::{Filter, SqliteStore, query_all};
use crate::{
  Result,
  encode::{
    date_col, dt_col, encode_dt, encode_enum, encode_opt_date, encode_opt_uuid, encode_uuid,
    enum_col, opt_uuid_col, uuid_col,
  },
};

const COLUMNS: &str = "id, project_code, name, client_id, status, start_date, end_date, budget, \
                       location, project_manager_id, description, created_at, updated_at";

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
  Ok(Project {
    id:                 uuid_col(row, "id")?,
    project_code:       row.get("project_code")?,
    name:               row.get("name")?,
    client_id:          opt_uuid_col(row, "client_id")?,
    status:             enum_col(row, "status")?,
    start_date:         date_col(row, "start_date")?,
    end_date:           date_col(row, "end_date")?,
    budget:             row.get("budget")?,
    location:           row.get("location")?,
    project_manager_id: opt_uuid_col(row, "project_manager_id")?,
    description:        row.get("description")?,
    created_at:         dt_col(row, "created_at")?,
    updated_at:         dt_col(row, "updated_at")?,
  })
}

impl ProjectStore for SqliteStore {
  async fn create_project(&self, input: NewProject) -> Result<Project> {
    input.validate()?;
    let id = encode_uuid(Uuid::new_v4());
    let now = encode_dt(Utc::now());
    let client_id = encode_opt_uuid(input.client_id);
    let manager_id = encode_opt_uuid(input.project_manager_id);
    let status = encode_enum(input.status);
    let start = encode_opt_date(input.start_date);
    let end = encode_opt_date(input.end_date);

    let project = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "INSERT INTO projects ({COLUMNS})
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
           RETURNING {COLUMNS}"
        );
        let project = conn.query_row(
          &sql,
          rusqlite::params![
            id,
            input.project_code.trim(),
            input.name.trim(),
            client_id,
            status,
            start,
            end,
            input.budget,
            input.location,
            manager_id,
            input.description,
            now,
          ],
          project_from_row,
        )?;
        Ok(project)
      })
      .await?;
    Ok(project)
  }

  async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
    let id = encode_uuid(id);
    let project = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {COLUMNS} FROM projects WHERE id = ?1");
        Ok(conn.query_row(&sql, [id], project_from_row).optional()?)
      })
      .await?;
    Ok(project)
  }

  async fn list_projects(&self, query: &ListQuery) -> Result<Vec<Project>> {
    let mut filter = Filter::from_query(query, &["project_code", "name", "location"]);
    if let Some(client_id) = query.client_id {
      filter.eq("client_id", encode_uuid(client_id));
    }
    let (sql, values) = filter.select(COLUMNS, "projects", "project_code", query);
    let projects = self
      .conn
      .call(move |conn| Ok(query_all(conn, &sql, &values, project_from_row)?))
      .await?;
    Ok(projects)
  }

  async fn update_project(&self, id: Uuid, update: ProjectUpdate) -> Result<Option<Project>> {
    update.validate()?;
    let id = encode_uuid(id);
    let now = encode_dt(Utc::now());
    let client_id = encode_opt_uuid(update.client_id);
    let manager_id = encode_opt_uuid(update.project_manager_id);
    let status = update.status.map(encode_enum);
    let start = encode_opt_date(update.start_date);
    let end = encode_opt_date(update.end_date);

    let project = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "UPDATE projects SET
             project_code       = COALESCE(?2, project_code),
             name               = COALESCE(?3, name),
             client_id          = COALESCE(?4, client_id),
             status             = COALESCE(?5, status),
             start_date         = COALESCE(?6, start_date),
             end_date           = COALESCE(?7, end_date),
             budget             = COALESCE(?8, budget),
             location           = COALESCE(?9, location),
             project_manager_id = COALESCE(?10, project_manager_id),
             description        = COALESCE(?11, description),
             updated_at         = ?12
           WHERE id = ?1
           RETURNING {COLUMNS}"
        );
        let project = conn
          .query_row(
            &sql,
            rusqlite::params![
              id,
              update.project_code.as_deref().map(str::trim),
              update.name.as_deref().map(str::trim),
              client_id,
              status,
              start,
              end,
              update.budget,
              update.location,
              manager_id,
              update.description,
              now,
            ],
            project_from_row,
          )
          .optional()?;
        Ok(project)
      })
      .await?;
    Ok(project)
  }

  async fn delete_project(&self, id: Uuid) -> Result<bool> {
    let id = encode_uuid(id);
    let n = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM projects WHERE id = ?1", [id])?))
      .await?;
    Ok(n > 0)
  }
}
