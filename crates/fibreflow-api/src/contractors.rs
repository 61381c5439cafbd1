//! Handlers for `/api/contractors` and its sub-resources.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/contractors` | `?id` for one; else `?q&status&limit&offset` |
//! | `POST` | `/api/contractors` | Body: [`NewContractor`] |
//! | `PUT`/`PATCH` | `/api/contractors?id=` | Body: [`ContractorUpdate`] |
//! | `DELETE` | `/api/contractors?id=` | Cascades to assignments, documents, history |
//! | `GET`  | `/api/contractors/analytics` | [`ContractorAnalytics`] |
//! | `POST` | `/api/contractors/rag/calculate` | Body or query `contractor_id`; all when omitted |
//! | `GET`  | `/api/contractors/rag/history` | `?contractor_id[&limit]`, newest first |
//! | `GET`  | `/api/contractors/assignments` | `?contractor_id` |
//! | `POST` | `/api/contractors/assignments` | Body: [`NewAssignment`] |
//! | `PUT`/`PATCH` | `/api/contractors/assignments?id=` | Body: [`AssignmentUpdate`] |
//! | `GET`  | `/api/contractors/documents` | `?contractor_id` |
//! | `POST` | `/api/contractors/documents` | Body: [`NewDocument`] |
//! | `DELETE` | `/api/contractors/documents?id=` | |

use axum::extract::State;
use bytes::Bytes;
use chrono::{NaiveDate, Utc};
use fibreflow_core::{
  analytics::ContractorAnalytics,
  audit::AuditAction,
  contractor::{
    Assignment, AssignmentUpdate, Contractor, ContractorDocument, ContractorUpdate,
    NewAssignment, NewContractor, NewDocument,
  },
  rag::{RagHistoryEntry, RagStatus, evaluate},
  store::{AuditStore, ContractorStore, ErrorClass, StoreError},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
  AppState, audit,
  error::{ApiError, ApiResult},
  query::{IdParam, ListParams, collect_all},
  response::{Actor, JsonBody, OneOrMany, QueryParams, Success},
};

const ENTITY: &str = "contractor";
const DEFAULT_HISTORY_LIMIT: usize = 50;

// ─── CRUD ─────────────────────────────────────────────────────────────────────

/// `GET /api/contractors`
pub async fn list<S: ContractorStore>(
  State(state): State<AppState<S>>,
  QueryParams(params): QueryParams<ListParams>,
) -> ApiResult<Success<OneOrMany<Contractor>>> {
  if let Some(id) = params.id {
    let contractor = state
      .store
      .get_contractor(id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::not_found(ENTITY, id))?;
    return Ok(Success::ok(OneOrMany::One(contractor)));
  }
  let query = params.to_query(state.query_limit);
  let contractors = state.store.list_contractors(&query).await.map_err(ApiError::store)?;
  Ok(Success::ok(OneOrMany::Many(contractors)))
}

/// `POST /api/contractors`
pub async fn create<S: ContractorStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  JsonBody(input): JsonBody<NewContractor>,
) -> ApiResult<Success<Contractor>> {
  let contractor = state.store.create_contractor(input).await.map_err(ApiError::store)?;
  tracing::info!(contractor_id = %contractor.id, name = %contractor.company_name, "contractor created");
  audit::record(
    &*state.store,
    &actor,
    ENTITY,
    Some(contractor.id),
    AuditAction::Create,
    json!({ "registration_number": contractor.registration_number }),
  )
  .await;
  Ok(Success::created(contractor))
}

/// `PUT|PATCH /api/contractors?id=`
pub async fn update<S: ContractorStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  QueryParams(params): QueryParams<IdParam>,
  JsonBody(update): JsonBody<ContractorUpdate>,
) -> ApiResult<Success<Contractor>> {
  let id = params.require()?;
  let contractor = state
    .store
    .update_contractor(id, update)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found(ENTITY, id))?;
  audit::record(&*state.store, &actor, ENTITY, Some(id), AuditAction::Update, Value::Null).await;
  Ok(Success::ok(contractor))
}

/// `DELETE /api/contractors?id=`
pub async fn delete<S: ContractorStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  QueryParams(params): QueryParams<IdParam>,
) -> ApiResult<Success<Value>> {
  let id = params.require()?;
  if !state.store.delete_contractor(id).await.map_err(ApiError::store)? {
    return Err(ApiError::not_found(ENTITY, id));
  }
  tracing::info!(contractor_id = %id, "contractor deleted");
  audit::record(&*state.store, &actor, ENTITY, Some(id), AuditAction::Delete, Value::Null).await;
  Ok(Success::ok(json!({ "id": id })).with_message("contractor deleted"))
}

async fn all_contractors<S: ContractorStore>(state: &AppState<S>) -> ApiResult<Vec<Contractor>> {
  let store = &*state.store;
  collect_all(state.query_limit, move |query| async move { store.list_contractors(&query).await })
    .await
    .map_err(ApiError::store)
}

/// `GET /api/contractors/analytics`
pub async fn analytics<S: ContractorStore>(
  State(state): State<AppState<S>>,
) -> ApiResult<Success<ContractorAnalytics>> {
  let contractors = all_contractors(&state).await?;
  let today = Utc::now().date_naive();
  Ok(Success::ok(ContractorAnalytics::compute(&contractors, today)))
}

// ─── RAG ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct RagParams {
  pub contractor_id: Option<Uuid>,
}

/// Outcome of scoring one contractor.
#[derive(Debug, Serialize)]
pub struct RagResult {
  pub company_name: String,
  #[serde(flatten)]
  pub entry:        RagHistoryEntry,
  pub changed:      bool,
}

/// A not-found from the store becomes `None` so one deleted contractor does
/// not fail a run over everyone.
fn unless_vanished<T, E: StoreError>(result: Result<T, E>) -> ApiResult<Option<T>> {
  match result {
    Ok(value) => Ok(Some(value)),
    Err(e) if e.class() == ErrorClass::NotFound => Ok(None),
    Err(e) => Err(ApiError::store(e)),
  }
}

/// Score one contractor as of `today`, store the result and alert on a turn
/// to red. `Ok(None)` if the contractor was deleted before its inputs were
/// read or before its scores were stored.
async fn score_one<S: ContractorStore>(
  state: &AppState<S>,
  contractor: &Contractor,
  today: NaiveDate,
) -> ApiResult<Option<RagResult>> {
  let store = &*state.store;
  let id = contractor.id;
  let Some(inputs) = state.retry.run("rag inputs", || store.rag_inputs(id, today)).await? else {
    return Ok(None);
  };
  let scores = evaluate(&inputs, today);
  let Some(entry) = unless_vanished(store.apply_rag(id, scores).await)? else {
    tracing::debug!(contractor_id = %id, "contractor deleted during rag run");
    return Ok(None);
  };
  tracing::debug!(contractor_id = %id, overall = %scores.overall, "rag calculated");

  if entry.turned_red() {
    tracing::warn!(contractor_id = %id, name = %contractor.company_name, "contractor turned red");
    let subject = format!("RAG alert: {} is now red", contractor.company_name);
    let body = format!(
      "Contractor {} ({}) moved from {} to red.\n\nfinancial: {}\ncompliance: {}\nperformance: {}\nsafety: {}\n",
      contractor.company_name,
      contractor.registration_number,
      entry.previous_overall.map_or_else(|| "unscored".to_owned(), |s| s.to_string()),
      scores.financial,
      scores.compliance,
      scores.performance,
      scores.safety,
    );
    if let Err(e) = state.notifier.notify(&subject, &body).await {
      tracing::warn!(contractor_id = %id, error = %e, "failed to send RAG notification");
    }
  }

  Ok(Some(RagResult {
    company_name: contractor.company_name.clone(),
    changed: entry.changed(),
    entry,
  }))
}

/// `POST /api/contractors/rag/calculate`
///
/// The contractor may be named in a JSON body or the query string; with
/// neither, every contractor is recalculated.
pub async fn calculate_rag<S: ContractorStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  QueryParams(params): QueryParams<RagParams>,
  body: Bytes,
) -> ApiResult<Success<Vec<RagResult>>> {
  let from_body: RagParams = if body.iter().all(u8::is_ascii_whitespace) {
    RagParams::default()
  } else {
    serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
  };
  let today = Utc::now().date_naive();

  let contractors = match from_body.contractor_id.or(params.contractor_id) {
    Some(id) => vec![
      state
        .store
        .get_contractor(id)
        .await
        .map_err(ApiError::store)?
        .ok_or_else(|| ApiError::not_found(ENTITY, id))?,
    ],
    None => all_contractors(&state).await?,
  };

  let mut results = Vec::with_capacity(contractors.len());
  for contractor in &contractors {
    if let Some(result) = score_one(&state, contractor, today).await? {
      results.push(result);
    }
  }

  let red = results.iter().filter(|r| r.entry.scores.overall == RagStatus::Red).count();
  tracing::info!(contractors = results.len(), red, "rag recalculated");
  let entity_id = (results.len() == 1).then(|| results[0].entry.contractor_id);
  audit::record(
    &*state.store,
    &actor,
    ENTITY,
    entity_id,
    AuditAction::RagCalculate,
    json!({ "contractors": results.len(), "red": red }),
  )
  .await;

  let message = format!("calculated RAG for {} contractors", results.len());
  Ok(Success::ok(results).with_message(message))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  pub contractor_id: Option<Uuid>,
  pub limit:         Option<usize>,
}

/// `GET /api/contractors/rag/history?contractor_id=`
pub async fn rag_history<S: ContractorStore>(
  State(state): State<AppState<S>>,
  QueryParams(params): QueryParams<HistoryParams>,
) -> ApiResult<Success<Vec<RagHistoryEntry>>> {
  let id = params.contractor_id.ok_or_else(|| ApiError::missing("contractor_id"))?;
  let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).min(state.query_limit);
  let history = state.store.rag_history(id, limit).await.map_err(ApiError::store)?;
  Ok(Success::ok(history))
}

// ─── Assignments ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ContractorParams {
  pub contractor_id: Option<Uuid>,
}

impl ContractorParams {
  fn require(&self) -> ApiResult<Uuid> {
    self.contractor_id.ok_or_else(|| ApiError::missing("contractor_id"))
  }
}

/// `GET /api/contractors/assignments?contractor_id=`
pub async fn list_assignments<S: ContractorStore>(
  State(state): State<AppState<S>>,
  QueryParams(params): QueryParams<ContractorParams>,
) -> ApiResult<Success<Vec<Assignment>>> {
  let id = params.require()?;
  let assignments = state.store.list_assignments(id).await.map_err(ApiError::store)?;
  Ok(Success::ok(assignments))
}

/// `POST /api/contractors/assignments`
pub async fn create_assignment<S: ContractorStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  JsonBody(input): JsonBody<NewAssignment>,
) -> ApiResult<Success<Assignment>> {
  let assignment = state.store.create_assignment(input).await.map_err(ApiError::store)?;
  audit::record(
    &*state.store,
    &actor,
    "contractor_project",
    Some(assignment.id),
    AuditAction::Create,
    json!({ "contractor_id": assignment.contractor_id, "project_id": assignment.project_id }),
  )
  .await;
  Ok(Success::created(assignment))
}

/// `PUT|PATCH /api/contractors/assignments?id=`
pub async fn update_assignment<S: ContractorStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  QueryParams(params): QueryParams<IdParam>,
  JsonBody(update): JsonBody<AssignmentUpdate>,
) -> ApiResult<Success<Assignment>> {
  let id = params.require()?;
  let assignment = state
    .store
    .update_assignment(id, update)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("assignment", id))?;
  audit::record(
    &*state.store,
    &actor,
    "contractor_project",
    Some(id),
    AuditAction::Update,
    Value::Null,
  )
  .await;
  Ok(Success::ok(assignment))
}

// ─── Documents ────────────────────────────────────────────────────────────────

/// `GET /api/contractors/documents?contractor_id=`
pub async fn list_documents<S: ContractorStore>(
  State(state): State<AppState<S>>,
  QueryParams(params): QueryParams<ContractorParams>,
) -> ApiResult<Success<Vec<ContractorDocument>>> {
  let id = params.require()?;
  let documents = state.store.list_documents(id).await.map_err(ApiError::store)?;
  Ok(Success::ok(documents))
}

/// `POST /api/contractors/documents`
pub async fn create_document<S: ContractorStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  JsonBody(input): JsonBody<NewDocument>,
) -> ApiResult<Success<ContractorDocument>> {
  let document = state.store.create_document(input).await.map_err(ApiError::store)?;
  audit::record(
    &*state.store,
    &actor,
    "contractor_document",
    Some(document.id),
    AuditAction::Create,
    json!({ "contractor_id": document.contractor_id, "document_type": document.document_type }),
  )
  .await;
  Ok(Success::created(document))
}

/// `DELETE /api/contractors/documents?id=`
pub async fn delete_document<S: ContractorStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  QueryParams(params): QueryParams<IdParam>,
) -> ApiResult<Success<Value>> {
  let id = params.require()?;
  if !state.store.delete_document(id).await.map_err(ApiError::store)? {
    return Err(ApiError::not_found("document", id));
  }
  audit::record(
    &*state.store,
    &actor,
    "contractor_document",
    Some(id),
    AuditAction::Delete,
    Value::Null,
  )
  .await;
  Ok(Success::ok(json!({ "id": id })).with_message("document deleted"))
}
