//! Handlers for `/api/sow`: scope-of-work poles, drops and fibre segments.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/sow/{kind}` | `kind` is `poles`, `drops` or `fibre`; `?project_id` required |
//! | `POST` | `/api/sow/{kind}` | Body: `{"project_id": …, "<kind>": [ {…}, … ]}` loose records |
//! | `POST` | `/api/sow/{kind}/import` | Raw CSV/XLSX body, `?project_id&format` |
//! | `GET`  | `/api/sow/summary` | `?project_id` |
//!
//! Imports upsert on `(project_id, natural key)` in batches; see
//! [`fibreflow_core::import`] for the normalisation rules.

use axum::{
  extract::{Path, State},
  http::HeaderMap,
};
use bytes::Bytes;
use fibreflow_core::{
  audit::AuditAction,
  import::ImportReport,
  record::Record,
  sow::{
    CustomerDrop, FibreSegment, NewCustomerDrop, NewFibreSegment, NewPole, Pole, SowKind,
    SowSummary,
  },
  store::{AuditStore, ListQuery, ProjectStore, SowStore},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
  AppState, audit,
  error::{ApiError, ApiResult},
  imports::{self, FileParams},
  query::ListParams,
  response::{Actor, JsonBody, QueryParams, Success},
};

fn parse_kind(raw: &str) -> ApiResult<SowKind> {
  raw.parse().map_err(|_| ApiError::NotFound(format!("unknown SOW record type {raw:?}")))
}

fn entity_type(kind: SowKind) -> String { format!("sow_{kind}") }

/// Make sure the project exists before writing rows that reference it.
async fn require_project<S: ProjectStore>(state: &AppState<S>, project_id: Uuid) -> ApiResult<()> {
  state
    .store
    .get_project(project_id)
    .await
    .map_err(ApiError::store)?
    .map(|_| ())
    .ok_or_else(|| ApiError::not_found("project", project_id))
}

async fn upsert_records<S: SowStore>(
  state: &AppState<S>,
  kind: SowKind,
  project_id: Uuid,
  records: &[Record],
) -> ImportReport {
  let store = &*state.store;
  let retry = &state.retry;
  match kind {
    SowKind::Poles => {
      imports::run_import::<NewPole, _, _, _>(records, retry, "pole import", |batch| {
        store.upsert_poles(project_id, batch)
      })
      .await
    }
    SowKind::Drops => {
      imports::run_import::<NewCustomerDrop, _, _, _>(records, retry, "drop import", |batch| {
        store.upsert_drops(project_id, batch)
      })
      .await
    }
    SowKind::Fibre => {
      imports::run_import::<NewFibreSegment, _, _, _>(records, retry, "fibre import", |batch| {
        store.upsert_fibre(project_id, batch)
      })
      .await
    }
  }
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// Rows of any one SOW table.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SowRows {
  Poles(Vec<Pole>),
  Drops(Vec<CustomerDrop>),
  Fibre(Vec<FibreSegment>),
}

/// `GET /api/sow/{kind}?project_id=`
pub async fn list<S: SowStore>(
  State(state): State<AppState<S>>,
  Path(kind): Path<String>,
  QueryParams(params): QueryParams<ListParams>,
) -> ApiResult<Success<SowRows>> {
  let kind = parse_kind(&kind)?;
  if params.project_id.is_none() {
    return Err(ApiError::missing("project_id"));
  }
  let query: ListQuery = params.to_query(state.query_limit);
  let rows = match kind {
    SowKind::Poles => SowRows::Poles(state.store.list_poles(&query).await.map_err(ApiError::store)?),
    SowKind::Drops => SowRows::Drops(state.store.list_drops(&query).await.map_err(ApiError::store)?),
    SowKind::Fibre => SowRows::Fibre(state.store.list_fibre(&query).await.map_err(ApiError::store)?),
  };
  Ok(Success::ok(rows))
}

// ─── Upsert ───────────────────────────────────────────────────────────────────

/// JSON import body. The record array may be keyed by the kind's own name
/// (`poles`, `drops`, `fibre`) or by `records`.
#[derive(Debug, Deserialize)]
pub struct UpsertBody {
  pub project_id: Uuid,
  #[serde(alias = "poles", alias = "drops", alias = "fibre")]
  pub records:    Vec<Record>,
}

/// `POST /api/sow/{kind}`
pub async fn upsert<S: SowStore + ProjectStore + AuditStore>(
  State(state): State<AppState<S>>,
  Path(kind): Path<String>,
  actor: Actor,
  JsonBody(body): JsonBody<UpsertBody>,
) -> ApiResult<Success<ImportReport>> {
  let kind = parse_kind(&kind)?;
  require_project(&state, body.project_id).await?;
  let report = upsert_records(&state, kind, body.project_id, &body.records).await;
  audit::record(
    &*state.store,
    &actor,
    &entity_type(kind),
    Some(body.project_id),
    AuditAction::Import,
    json!({ "source": "json", "total": report.total, "upserted": report.upserted }),
  )
  .await;
  let message = imports::summary(&report);
  Ok(Success::ok(report).with_message(message))
}

/// `POST /api/sow/{kind}/import?project_id=[&format=]`
pub async fn import_file<S: SowStore + ProjectStore + AuditStore>(
  State(state): State<AppState<S>>,
  Path(kind): Path<String>,
  actor: Actor,
  QueryParams(params): QueryParams<FileParams>,
  headers: HeaderMap,
  body: Bytes,
) -> ApiResult<Success<ImportReport>> {
  let kind = parse_kind(&kind)?;
  let project_id = params.project_id.ok_or_else(|| ApiError::missing("project_id"))?;
  require_project(&state, project_id).await?;
  let upload = imports::read_upload(&params, &headers, &body)?;
  tracing::info!(
    %kind,
    %project_id,
    format = %upload.format,
    rows = upload.records.len(),
    sha256 = %upload.fingerprint,
    "sow file received"
  );
  let report = upsert_records(&state, kind, project_id, &upload.records).await;
  audit::record(
    &*state.store,
    &actor,
    &entity_type(kind),
    Some(project_id),
    AuditAction::Import,
    json!({
      "source": upload.format.to_string(),
      "sha256": upload.fingerprint,
      "bytes": upload.size,
      "total": report.total,
      "upserted": report.upserted,
      "failed": report.failed,
    }),
  )
  .await;
  let message = imports::summary(&report);
  Ok(Success::ok(report).with_message(message))
}

// ─── Summary ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
  pub project_id: Option<Uuid>,
}

/// `GET /api/sow/summary?project_id=`
pub async fn summary<S: SowStore + ProjectStore>(
  State(state): State<AppState<S>>,
  QueryParams(params): QueryParams<SummaryParams>,
) -> ApiResult<Success<SowSummary>> {
  let project_id = params.project_id.ok_or_else(|| ApiError::missing("project_id"))?;
  require_project(&state, project_id).await?;
  let summary = state.store.sow_summary(project_id).await.map_err(ApiError::store)?;
  Ok(Success::ok(summary))
}
