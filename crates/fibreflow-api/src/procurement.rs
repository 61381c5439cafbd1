//! Handlers for `/api/boqs` and `/api/rfqs`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/boqs` | `?id` for one; else `?project_id&q&status&limit&offset` |
//! | `POST` | `/api/boqs` | Body: [`NewBoq`]; the total is computed from the items |
//! | `PUT`/`PATCH` | `/api/boqs?id=` | Body: [`BoqUpdate`] |
//! | `DELETE` | `/api/boqs?id=` | |
//! | `GET`  | `/api/rfqs` | as `/api/boqs` |
//! | `POST` | `/api/rfqs` | Body: [`NewRfq`] |
//! | `PUT`/`PATCH` | `/api/rfqs?id=` | Body: [`RfqUpdate`]; `awarded` needs a supplier |
//! | `DELETE` | `/api/rfqs?id=` | |
//! | `GET`  | `/api/rfqs/matches` | `?id[&limit]` ranked suppliers |

use axum::extract::State;
use fibreflow_core::{
  audit::AuditAction,
  procurement::{Boq, BoqUpdate, NewBoq, NewRfq, Rfq, RfqUpdate},
  store::{AuditStore, ProcurementStore, SupplierStore},
  supplier::{SupplierMatch, rank},
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
  AppState, audit,
  error::{ApiError, ApiResult},
  query::{IdParam, ListParams},
  response::{Actor, JsonBody, OneOrMany, QueryParams, Success},
  suppliers::all_suppliers,
};

const DEFAULT_MATCH_LIMIT: usize = 10;

// ─── BOQ ──────────────────────────────────────────────────────────────────────

/// `GET /api/boqs`
pub async fn list_boqs<S: ProcurementStore>(
  State(state): State<AppState<S>>,
  QueryParams(params): QueryParams<ListParams>,
) -> ApiResult<Success<OneOrMany<Boq>>> {
  if let Some(id) = params.id {
    let boq = state
      .store
      .get_boq(id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::not_found("boq", id))?;
    return Ok(Success::ok(OneOrMany::One(boq)));
  }
  let query = params.to_query(state.query_limit);
  let boqs = state.store.list_boqs(&query).await.map_err(ApiError::store)?;
  Ok(Success::ok(OneOrMany::Many(boqs)))
}

/// `POST /api/boqs`
pub async fn create_boq<S: ProcurementStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  JsonBody(input): JsonBody<NewBoq>,
) -> ApiResult<Success<Boq>> {
  let boq = state.store.create_boq(input).await.map_err(ApiError::store)?;
  audit::record(
    &*state.store,
    &actor,
    "boq",
    Some(boq.id),
    AuditAction::Create,
    json!({ "boq_number": boq.boq_number, "total_amount": boq.total_amount }),
  )
  .await;
  Ok(Success::created(boq))
}

/// `PUT|PATCH /api/boqs?id=`
pub async fn update_boq<S: ProcurementStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  QueryParams(params): QueryParams<IdParam>,
  JsonBody(update): JsonBody<BoqUpdate>,
) -> ApiResult<Success<Boq>> {
  let id = params.require()?;
  let boq = state
    .store
    .update_boq(id, update)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("boq", id))?;
  audit::record(
    &*state.store,
    &actor,
    "boq",
    Some(id),
    AuditAction::Update,
    json!({ "total_amount": boq.total_amount }),
  )
  .await;
  Ok(Success::ok(boq))
}

/// `DELETE /api/boqs?id=`
pub async fn delete_boq<S: ProcurementStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  QueryParams(params): QueryParams<IdParam>,
) -> ApiResult<Success<Value>> {
  let id = params.require()?;
  if !state.store.delete_boq(id).await.map_err(ApiError::store)? {
    return Err(ApiError::not_found("boq", id));
  }
  audit::record(&*state.store, &actor, "boq", Some(id), AuditAction::Delete, Value::Null).await;
  Ok(Success::ok(json!({ "id": id })).with_message("boq deleted"))
}

// ─── RFQ ──────────────────────────────────────────────────────────────────────

/// `GET /api/rfqs`
pub async fn list_rfqs<S: ProcurementStore>(
  State(state): State<AppState<S>>,
  QueryParams(params): QueryParams<ListParams>,
) -> ApiResult<Success<OneOrMany<Rfq>>> {
  if let Some(id) = params.id {
    let rfq = state
      .store
      .get_rfq(id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::not_found("rfq", id))?;
    return Ok(Success::ok(OneOrMany::One(rfq)));
  }
  let query = params.to_query(state.query_limit);
  let rfqs = state.store.list_rfqs(&query).await.map_err(ApiError::store)?;
  Ok(Success::ok(OneOrMany::Many(rfqs)))
}

/// `POST /api/rfqs`
pub async fn create_rfq<S: ProcurementStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  JsonBody(input): JsonBody<NewRfq>,
) -> ApiResult<Success<Rfq>> {
  let rfq = state.store.create_rfq(input).await.map_err(ApiError::store)?;
  audit::record(
    &*state.store,
    &actor,
    "rfq",
    Some(rfq.id),
    AuditAction::Create,
    json!({ "rfq_number": rfq.rfq_number }),
  )
  .await;
  Ok(Success::created(rfq))
}

/// `PUT|PATCH /api/rfqs?id=`
pub async fn update_rfq<S: ProcurementStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  QueryParams(params): QueryParams<IdParam>,
  JsonBody(update): JsonBody<RfqUpdate>,
) -> ApiResult<Success<Rfq>> {
  let id = params.require()?;
  let rfq = state
    .store
    .update_rfq(id, update)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("rfq", id))?;
  audit::record(
    &*state.store,
    &actor,
    "rfq",
    Some(id),
    AuditAction::Update,
    json!({ "status": rfq.status, "awarded_supplier_id": rfq.awarded_supplier_id }),
  )
  .await;
  Ok(Success::ok(rfq))
}

/// `DELETE /api/rfqs?id=`
pub async fn delete_rfq<S: ProcurementStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  QueryParams(params): QueryParams<IdParam>,
) -> ApiResult<Success<Value>> {
  let id = params.require()?;
  if !state.store.delete_rfq(id).await.map_err(ApiError::store)? {
    return Err(ApiError::not_found("rfq", id));
  }
  audit::record(&*state.store, &actor, "rfq", Some(id), AuditAction::Delete, Value::Null).await;
  Ok(Success::ok(json!({ "id": id })).with_message("rfq deleted"))
}

#[derive(Debug, Deserialize)]
pub struct MatchParams {
  pub id:    Option<Uuid>,
  pub limit: Option<usize>,
}

/// `GET /api/rfqs/matches?id=[&limit=]`
pub async fn matches<S: ProcurementStore + SupplierStore>(
  State(state): State<AppState<S>>,
  QueryParams(params): QueryParams<MatchParams>,
) -> ApiResult<Success<Vec<SupplierMatch>>> {
  let id = params.id.ok_or_else(|| ApiError::missing("id"))?;
  let rfq = state
    .store
    .get_rfq(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("rfq", id))?;
  let suppliers = all_suppliers(&state).await?;
  let mut ranked = rank(&suppliers, &rfq.criteria());
  ranked.truncate(params.limit.unwrap_or(DEFAULT_MATCH_LIMIT));
  Ok(Success::ok(ranked))
}
