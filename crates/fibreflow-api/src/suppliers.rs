//! Handlers for `/api/suppliers`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/suppliers` | `?id` for one; else `?q&status&limit&offset` |
//! | `POST` | `/api/suppliers` | Body: [`NewSupplier`] |
//! | `PUT`/`PATCH` | `/api/suppliers?id=` | Body: [`SupplierUpdate`] |
//! | `DELETE` | `/api/suppliers?id=` | |
//! | `GET`  | `/api/suppliers/search` | [`SupplierFilter`] fields as query parameters |
//! | `GET`  | `/api/suppliers/benchmark` | `?id` |

use axum::extract::State;
use fibreflow_core::{
  audit::AuditAction,
  store::{AuditStore, SupplierStore},
  supplier::{
    NewSupplier, Supplier, SupplierBenchmark, SupplierFilter, SupplierUpdate, benchmark as bench,
    search as filter_suppliers,
  },
};
use serde_json::{Value, json};

use crate::{
  AppState, audit,
  error::{ApiError, ApiResult},
  query::{IdParam, ListParams, collect_all},
  response::{Actor, JsonBody, OneOrMany, QueryParams, Success},
};

const ENTITY: &str = "supplier";

/// `GET /api/suppliers`
pub async fn list<S: SupplierStore>(
  State(state): State<AppState<S>>,
  QueryParams(params): QueryParams<ListParams>,
) -> ApiResult<Success<OneOrMany<Supplier>>> {
  if let Some(id) = params.id {
    let supplier = state
      .store
      .get_supplier(id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::not_found(ENTITY, id))?;
    return Ok(Success::ok(OneOrMany::One(supplier)));
  }
  let query = params.to_query(state.query_limit);
  let suppliers = state.store.list_suppliers(&query).await.map_err(ApiError::store)?;
  Ok(Success::ok(OneOrMany::Many(suppliers)))
}

/// `POST /api/suppliers`
pub async fn create<S: SupplierStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  JsonBody(input): JsonBody<NewSupplier>,
) -> ApiResult<Success<Supplier>> {
  let supplier = state.store.create_supplier(input).await.map_err(ApiError::store)?;
  tracing::info!(supplier_id = %supplier.id, code = %supplier.supplier_code, "supplier created");
  audit::record(
    &*state.store,
    &actor,
    ENTITY,
    Some(supplier.id),
    AuditAction::Create,
    json!({ "supplier_code": supplier.supplier_code }),
  )
  .await;
  Ok(Success::created(supplier))
}

/// `PUT|PATCH /api/suppliers?id=`
pub async fn update<S: SupplierStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  QueryParams(params): QueryParams<IdParam>,
  JsonBody(update): JsonBody<SupplierUpdate>,
) -> ApiResult<Success<Supplier>> {
  let id = params.require()?;
  let supplier = state
    .store
    .update_supplier(id, update)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found(ENTITY, id))?;
  audit::record(&*state.store, &actor, ENTITY, Some(id), AuditAction::Update, Value::Null).await;
  Ok(Success::ok(supplier))
}

/// `DELETE /api/suppliers?id=`
pub async fn delete<S: SupplierStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  QueryParams(params): QueryParams<IdParam>,
) -> ApiResult<Success<Value>> {
  let id = params.require()?;
  if !state.store.delete_supplier(id).await.map_err(ApiError::store)? {
    return Err(ApiError::not_found(ENTITY, id));
  }
  audit::record(&*state.store, &actor, ENTITY, Some(id), AuditAction::Delete, Value::Null).await;
  Ok(Success::ok(json!({ "id": id })).with_message("supplier deleted"))
}

pub(crate) async fn all_suppliers<S: SupplierStore>(state: &AppState<S>) -> ApiResult<Vec<Supplier>> {
  let store = &*state.store;
  collect_all(state.query_limit, move |query| async move { store.list_suppliers(&query).await })
    .await
    .map_err(ApiError::store)
}

/// `GET /api/suppliers/search`
pub async fn search<S: SupplierStore>(
  State(state): State<AppState<S>>,
  QueryParams(filter): QueryParams<SupplierFilter>,
) -> ApiResult<Success<Vec<Supplier>>> {
  let suppliers = all_suppliers(&state).await?;
  let hits: Vec<Supplier> = filter_suppliers(&suppliers, &filter).into_iter().cloned().collect();
  Ok(Success::ok(hits))
}

/// `GET /api/suppliers/benchmark?id=`
pub async fn benchmark<S: SupplierStore>(
  State(state): State<AppState<S>>,
  QueryParams(params): QueryParams<IdParam>,
) -> ApiResult<Success<SupplierBenchmark>> {
  let id = params.require()?;
  let suppliers = all_suppliers(&state).await?;
  let result = bench(&suppliers, id).ok_or_else(|| ApiError::not_found(ENTITY, id))?;
  Ok(Success::ok(result))
}
