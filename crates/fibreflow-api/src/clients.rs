//! Handlers for `/api/clients`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/clients` | `?id` for one; else `?q&status&limit&offset` |
//! | `POST` | `/api/clients` | Body: [`NewClient`] |
//! | `PUT`/`PATCH` | `/api/clients?id=` | Body: [`ClientUpdate`] |
//! | `DELETE` | `/api/clients?id=` | 409 while projects reference the client |

use axum::extract::State;
use fibreflow_core::{
  audit::AuditAction,
  client::{Client, ClientUpdate, NewClient},
  store::{AuditStore, ClientStore},
};
use serde_json::{Value, json};

use crate::{
  AppState, audit,
  error::{ApiError, ApiResult},
  query::{IdParam, ListParams},
  response::{Actor, JsonBody, OneOrMany, QueryParams, Success},
};

const ENTITY: &str = "client";

/// `GET /api/clients`
pub async fn list<S: ClientStore>(
  State(state): State<AppState<S>>,
  QueryParams(params): QueryParams<ListParams>,
) -> ApiResult<Success<OneOrMany<Client>>> {
  if let Some(id) = params.id {
    let client = state
      .store
      .get_client(id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::not_found(ENTITY, id))?;
    return Ok(Success::ok(OneOrMany::One(client)));
  }
  let query = params.to_query(state.query_limit);
  let clients = state.store.list_clients(&query).await.map_err(ApiError::store)?;
  Ok(Success::ok(OneOrMany::Many(clients)))
}

/// `POST /api/clients`
pub async fn create<S: ClientStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  JsonBody(input): JsonBody<NewClient>,
) -> ApiResult<Success<Client>> {
  let client = state.store.create_client(input).await.map_err(ApiError::store)?;
  tracing::info!(client_id = %client.id, name = %client.company_name, "client created");
  audit::record(
    &*state.store,
    &actor,
    ENTITY,
    Some(client.id),
    AuditAction::Create,
    json!({ "company_name": client.company_name }),
  )
  .await;
  Ok(Success::created(client))
}

/// `PUT|PATCH /api/clients?id=`
pub async fn update<S: ClientStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  QueryParams(params): QueryParams<IdParam>,
  JsonBody(update): JsonBody<ClientUpdate>,
) -> ApiResult<Success<Client>> {
  let id = params.require()?;
  let client = state
    .store
    .update_client(id, update)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found(ENTITY, id))?;
  audit::record(&*state.store, &actor, ENTITY, Some(id), AuditAction::Update, Value::Null).await;
  Ok(Success::ok(client))
}

/// `DELETE /api/clients?id=`
pub async fn delete<S: ClientStore + AuditStore>(
  State(state): State<AppState<S>>,
  actor: Actor,
  QueryParams(params): QueryParams<IdParam>,
) -> ApiResult<Success<Value>> {
  let id = params.require()?;
  if !state.store.delete_client(id).await.map_err(ApiError::store)? {
    return Err(ApiError::not_found(ENTITY, id));
  }
  tracing::info!(client_id = %id, "client deleted");
  audit::record(&*state.store, &actor, ENTITY, Some(id), AuditAction::Delete, Value::Null).await;
  Ok(Success::ok(json!({ "id": id })).with_message("client deleted"))
}
