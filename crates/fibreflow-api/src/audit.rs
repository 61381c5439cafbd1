//! The audit trail: best-effort writes from mutating handlers, and
//! `GET /api/audit` to read it back.

use axum::extract::State;
use fibreflow_core::{
  audit::{AuditAction, AuditEntry, AuditQuery, NewAuditEntry},
  store::AuditStore,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
  AppState,
  error::{ApiError, ApiResult},
  response::{Actor, QueryParams, Success},
};

const DEFAULT_AUDIT_LIMIT: usize = 100;

/// Append an entry. A failed write is logged and otherwise ignored.
pub(crate) async fn record<S: AuditStore>(
  store: &S,
  actor: &Actor,
  entity_type: &str,
  entity_id: Option<Uuid>,
  action: AuditAction,
  details: Value,
) {
  let entry = NewAuditEntry::new(entity_type, entity_id, action)
    .actor(actor.0.clone())
    .details(details);
  if let Err(e) = store.record_audit(entry).await {
    tracing::warn!(error = %e, entity_type, ?entity_id, %action, "failed to write audit entry");
  }
}

#[derive(Debug, Deserialize)]
pub struct AuditParams {
  pub entity_type: Option<String>,
  pub entity_id:   Option<Uuid>,
  pub limit:       Option<usize>,
}

/// `GET /api/audit[?entity_type=&entity_id=&limit=]`, newest first.
pub async fn list<S: AuditStore>(
  State(state): State<AppState<S>>,
  QueryParams(params): QueryParams<AuditParams>,
) -> ApiResult<Success<Vec<AuditEntry>>> {
  let query = AuditQuery {
    entity_type: params.entity_type.filter(|t| !t.trim().is_empty()),
    entity_id:   params.entity_id,
    limit:       Some(params.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).min(state.query_limit)),
  };
  let entries = state.store.list_audit(&query).await.map_err(ApiError::store)?;
  Ok(Success::ok(entries))
}
