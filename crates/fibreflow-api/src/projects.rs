//! Handlers for `/api/projects`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/projects` | `?id` for one; else `?client_id&q&status&limit&offset` |
//! | `POST` | `/api/projects` | Body: [`NewProject`] |
//! | `PUT`/`PATCH` | `/api/projects?id=` | Body: [`ProjectUpdate`] |
//! | `DELETE` | `/api/projects?id=` | Removes the project's SOW records too |

use axum::extract::State;
use fibreflow_core::{
  audit::AuditAction,
  project::{NewProject, Project, ProjectUpdate},
  store::{AuditStore, ProjectStore},
};
use serde_json::{Value, json};

use crate::{
  AppState, audit,
  error::{ApiError, ApiResult},
  query::{IdParam, ListParams},
  response::{Actor, JsonBody, OneOrMany, QueryParams, Success},
};

const ENTITY: &str = "project";

/// `GET /api/projects`
pub async fn list<S: ProjectStore>(
  State(state): State<AppState<S>>,
  QueryParams(params): QueryParams<ListParams>,
) -> ApiResult<Success<OneOrMany<Project>>> {
  if let Some(id) = params.id {
    let project = state
      .store
      .get_project(id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::not_found(ENTITY, id))?;
    return Ok(Success::ok(OneOrMany::One(project)));
  }
  let query = params.to_query(state.query_limit);
  let projects = state.store.list_projects(&query).await.map_err(ApiError::store)?;
  Ok(Success::ok(OneOrMany::Many(projects)))
}

/// `POST /api/projects`
pub async fn create<S: ProjectStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  JsonBody(input): JsonBody<NewProject>,
) -> ApiResult<Success<Project>> {
  let project = state.store.create_project(input).await.map_err(ApiError::store)?;
  tracing::info!(project_id = %project.id, code = %project.project_code, "project created");
  audit::record(
    &*state.store,
    &actor,
    ENTITY,
    Some(project.id),
    AuditAction::Create,
    json!({ "project_code": project.project_code, "client_id": project.client_id }),
  )
  .await;
  Ok(Success::created(project))
}

/// `PUT|PATCH /api/projects?id=`
pub async fn update<S: ProjectStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  QueryParams(params): QueryParams<IdParam>,
  JsonBody(update): JsonBody<ProjectUpdate>,
) -> ApiResult<Success<Project>> {
  let id = params.require()?;
  let project = state
    .store
    .update_project(id, update)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found(ENTITY, id))?;
  audit::record(&*state.store, &actor, ENTITY, Some(id), AuditAction::Update, Value::Null).await;
  Ok(Success::ok(project))
}

/// `DELETE /api/projects?id=`
pub async fn delete<S: ProjectStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  QueryParams(params): QueryParams<IdParam>,
) -> ApiResult<Success<Value>> {
  let id = params.require()?;
  if !state.store.delete_project(id).await.map_err(ApiError::store)? {
    return Err(ApiError::not_found(ENTITY, id));
  }
  tracing::info!(project_id = %id, "project deleted");
  audit::record(&*state.store, &actor, ENTITY, Some(id), AuditAction::Delete, Value::Null).await;
  Ok(Success::ok(json!({ "id": id })).with_message("project deleted"))
}
