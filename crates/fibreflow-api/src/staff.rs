//! Handlers for `/api/staff`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/staff` | `?id` for one; else `?q&status&limit&offset` |
//! | `POST` | `/api/staff` | Body: [`NewStaff`] |
//! | `PUT`/`PATCH` | `/api/staff?id=` | Body: [`StaffUpdate`] |
//! | `DELETE` | `/api/staff?id=` | |
//! | `POST` | `/api/staff/import` | Body: `{"staff": [ {…}, … ]}` loose records |
//! | `POST` | `/api/staff/import/file` | Raw CSV/XLSX body, `?format=` or `Content-Type` |
//! | `GET`  | `/api/staff/export` | `text/csv` attachment |

use axum::{
  extract::State,
  http::{HeaderMap, header},
  response::{IntoResponse, Response},
};
use bytes::Bytes;
use fibreflow_core::{
  audit::AuditAction,
  import::ImportReport,
  record::Record,
  staff::{NewStaff, Staff, StaffUpdate},
  store::{AuditStore, StaffStore},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
  AppState, audit,
  error::{ApiError, ApiResult},
  imports::{self, FileParams},
  query::{IdParam, ListParams, collect_all},
  response::{Actor, JsonBody, OneOrMany, QueryParams, Success},
};

const ENTITY: &str = "staff";

/// `GET /api/staff`
pub async fn list<S: StaffStore>(
  State(state): State<AppState<S>>,
  QueryParams(params): QueryParams<ListParams>,
) -> ApiResult<Success<OneOrMany<Staff>>> {
  if let Some(id) = params.id {
    let member = state
      .store
      .get_staff(id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::not_found(ENTITY, id))?;
    return Ok(Success::ok(OneOrMany::One(member)));
  }
  let query = params.to_query(state.query_limit);
  let staff = state.store.list_staff(&query).await.map_err(ApiError::store)?;
  Ok(Success::ok(OneOrMany::Many(staff)))
}

/// `POST /api/staff`
pub async fn create<S: StaffStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  JsonBody(input): JsonBody<NewStaff>,
) -> ApiResult<Success<Staff>> {
  let member = state.store.create_staff(input).await.map_err(ApiError::store)?;
  tracing::info!(staff_id = %member.id, employee_id = %member.employee_id, "staff member created");
  audit::record(
    &*state.store,
    &actor,
    ENTITY,
    Some(member.id),
    AuditAction::Create,
    json!({ "employee_id": member.employee_id }),
  )
  .await;
  Ok(Success::created(member))
}

/// `PUT|PATCH /api/staff?id=`
pub async fn update<S: StaffStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  QueryParams(params): QueryParams<IdParam>,
  JsonBody(update): JsonBody<StaffUpdate>,
) -> ApiResult<Success<Staff>> {
  let id = params.require()?;
  let member = state
    .store
    .update_staff(id, update)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found(ENTITY, id))?;
  audit::record(&*state.store, &actor, ENTITY, Some(id), AuditAction::Update, Value::Null).await;
  Ok(Success::ok(member))
}

/// `DELETE /api/staff?id=`
pub async fn delete<S: StaffStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  QueryParams(params): QueryParams<IdParam>,
) -> ApiResult<Success<Value>> {
  let id = params.require()?;
  if !state.store.delete_staff(id).await.map_err(ApiError::store)? {
    return Err(ApiError::not_found(ENTITY, id));
  }
  audit::record(&*state.store, &actor, ENTITY, Some(id), AuditAction::Delete, Value::Null).await;
  Ok(Success::ok(json!({ "id": id })).with_message("staff member deleted"))
}

// ─── Import ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ImportBody {
  pub staff: Vec<Record>,
}

async fn upsert_records<S: StaffStore>(state: &AppState<S>, records: &[Record]) -> ImportReport {
  let store = &*state.store;
  imports::run_import::<NewStaff, _, _, _>(records, &state.retry, "staff import", |batch| {
    store.upsert_staff(batch)
  })
  .await
}

/// `POST /api/staff/import`
pub async fn import_json<S: StaffStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  JsonBody(body): JsonBody<ImportBody>,
) -> ApiResult<Success<ImportReport>> {
  let report = upsert_records(&state, &body.staff).await;
  audit::record(
    &*state.store,
    &actor,
    ENTITY,
    None,
    AuditAction::Import,
    json!({ "source": "json", "total": report.total, "upserted": report.upserted }),
  )
  .await;
  let message = imports::summary(&report);
  Ok(Success::ok(report).with_message(message))
}

/// `POST /api/staff/import/file[?format=csv|xlsx]`
pub async fn import_file<S: StaffStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  QueryParams(params): QueryParams<FileParams>,
  headers: HeaderMap,
  body: Bytes,
) -> ApiResult<Success<ImportReport>> {
  let upload = imports::read_upload(&params, &headers, &body)?;
  let report = upsert_records(&state, &upload.records).await;
  audit::record(
    &*state.store,
    &actor,
    ENTITY,
    None,
    AuditAction::Import,
    json!({
      "source": upload.format.to_string(),
      "sha256": upload.fingerprint,
      "bytes": upload.size,
      "total": report.total,
      "upserted": report.upserted,
    }),
  )
  .await;
  let message = imports::summary(&report);
  Ok(Success::ok(report).with_message(message))
}

// ─── Export ───────────────────────────────────────────────────────────────────

/// `GET /api/staff/export`
pub async fn export<S: StaffStore>(State(state): State<AppState<S>>) -> ApiResult<Response> {
  let store = &*state.store;
  let staff = collect_all(state.query_limit, move |query| async move { store.list_staff(&query).await })
    .await
    .map_err(ApiError::store)?;
  let csv = fibreflow_import::staff_csv(&staff).map_err(|e| ApiError::Internal(e.to_string()))?;
  tracing::info!(rows = staff.len(), "staff exported");
  Ok(
    (
      [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
        (header::CONTENT_DISPOSITION, "attachment; filename=\"staff.csv\""),
      ],
      csv,
    )
      .into_response(),
  )
}
