//! JSON REST API for FibreFlow.
//!
//! Exposes an axum [`Router`] backed by any [`fibreflow_core::store::FibreStore`].
//! Every response, including errors, is wrapped in the
//! `{ success, data?, error?, message? }` envelope.
//!
//! Single records are addressed with `?id=<uuid>`; `PUT` and `PATCH` are
//! interchangeable. Unsupported methods on a known path answer 405 and
//! unknown paths 404, both in the envelope.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = fibreflow_api::router(AppState::new(store))
//!   .layer(fibreflow_api::cors_layer(&config.cors_origins)?);
//! ```

pub mod analytics;
pub mod audit;
pub mod clients;
pub mod contractors;
pub mod error;
mod imports;
pub mod notify;
pub mod procurement;
pub mod projects;
pub mod query;
pub mod response;
pub mod retry;
pub mod sow;
pub mod staff;
pub mod suppliers;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  http::{HeaderValue, Method, header::InvalidHeaderValue},
  routing::{get, post},
};
use fibreflow_core::store::FibreStore;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub use error::{ApiError, ApiResult};
pub use notify::Notifier;
pub use retry::RetryPolicy;

/// Largest list any endpoint returns unless configured otherwise.
pub const DEFAULT_QUERY_LIMIT: usize = 1000;

/// Upper bound on request bodies; spreadsheet uploads can be large.
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub store:       Arc<S>,
  pub notifier:    Arc<Notifier>,
  pub retry:       RetryPolicy,
  /// Cap on the number of rows a list endpoint returns.
  pub query_limit: usize,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:       Arc::clone(&self.store),
      notifier:    Arc::clone(&self.notifier),
      retry:       self.retry,
      query_limit: self.query_limit,
    }
  }
}

impl<S> AppState<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self {
      store,
      notifier: Arc::new(Notifier::Disabled),
      retry: RetryPolicy::default(),
      query_limit: DEFAULT_QUERY_LIMIT,
    }
  }

  pub fn with_notifier(mut self, notifier: Notifier) -> Self {
    self.notifier = Arc::new(notifier);
    self
  }

  pub fn with_query_limit(mut self, limit: usize) -> Self {
    self.query_limit = limit.max(1);
    self
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the `/api/...` router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: FibreStore + 'static,
{
  Router::new()
    // Clients
    .route(
      "/api/clients",
      get(clients::list::<S>)
        .post(clients::create::<S>)
        .put(clients::update::<S>)
        .patch(clients::update::<S>)
        .delete(clients::delete::<S>),
    )
    // Staff
    .route(
      "/api/staff",
      get(staff::list::<S>)
        .post(staff::create::<S>)
        .put(staff::update::<S>)
        .patch(staff::update::<S>)
        .delete(staff::delete::<S>),
    )
    .route("/api/staff/import", post(staff::import_json::<S>))
    .route("/api/staff/import/file", post(staff::import_file::<S>))
    .route("/api/staff/export", get(staff::export::<S>))
    // Contractors
    .route(
      "/api/contractors",
      get(contractors::list::<S>)
        .post(contractors::create::<S>)
        .put(contractors::update::<S>)
        .patch(contractors::update::<S>)
        .delete(contractors::delete::<S>),
    )
    .route("/api/contractors/analytics", get(contractors::analytics::<S>))
    .route("/api/contractors/rag/calculate", post(contractors::calculate_rag::<S>))
    .route("/api/contractors/rag/history", get(contractors::rag_history::<S>))
    .route(
      "/api/contractors/assignments",
      get(contractors::list_assignments::<S>)
        .post(contractors::create_assignment::<S>)
        .put(contractors::update_assignment::<S>)
        .patch(contractors::update_assignment::<S>),
    )
    .route(
      "/api/contractors/documents",
      get(contractors::list_documents::<S>)
        .post(contractors::create_document::<S>)
        .delete(contractors::delete_document::<S>),
    )
    // Suppliers
    .route(
      "/api/suppliers",
      get(suppliers::list::<S>)
        .post(suppliers::create::<S>)
        .put(suppliers::update::<S>)
        .patch(suppliers::update::<S>)
        .delete(suppliers::delete::<S>),
    )
    .route("/api/suppliers/search", get(suppliers::search::<S>))
    .route("/api/suppliers/benchmark", get(suppliers::benchmark::<S>))
    // Projects
    .route(
      "/api/projects",
      get(projects::list::<S>)
        .post(projects::create::<S>)
        .put(projects::update::<S>)
        .patch(projects::update::<S>)
        .delete(projects::delete::<S>),
    )
    // Procurement
    .route(
      "/api/boqs",
      get(procurement::list_boqs::<S>)
        .post(procurement::create_boq::<S>)
        .put(procurement::update_boq::<S>)
        .patch(procurement::update_boq::<S>)
        .delete(procurement::delete_boq::<S>),
    )
    .route(
      "/api/rfqs",
      get(procurement::list_rfqs::<S>)
        .post(procurement::create_rfq::<S>)
        .put(procurement::update_rfq::<S>)
        .patch(procurement::update_rfq::<S>)
        .delete(procurement::delete_rfq::<S>),
    )
    .route("/api/rfqs/matches", get(procurement::matches::<S>))
    // Scope of work
    .route("/api/sow/summary", get(sow::summary::<S>))
    .route("/api/sow/{kind}", get(sow::list::<S>).post(sow::upsert::<S>))
    .route("/api/sow/{kind}/import", post(sow::import_file::<S>))
    // Audit & analytics
    .route("/api/audit", get(audit::list::<S>))
    .route("/api/analytics/dashboard", get(analytics::dashboard::<S>))
    .fallback(not_found)
    .method_not_allowed_fallback(method_not_allowed)
    .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
    .with_state(state)
}

async fn not_found() -> ApiError { ApiError::NotFound("no such endpoint".to_owned()) }

async fn method_not_allowed() -> ApiError { ApiError::MethodNotAllowed }

// ─── CORS ─────────────────────────────────────────────────────────────────────

/// One CORS policy for the whole application: any origin when `origins` is
/// empty, otherwise exactly the listed origins.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer, InvalidHeaderValue> {
  let layer = CorsLayer::new()
    .allow_methods([
      Method::GET,
      Method::POST,
      Method::PUT,
      Method::PATCH,
      Method::DELETE,
      Method::OPTIONS,
    ])
    .allow_headers(Any);

  if origins.is_empty() {
    return Ok(layer.allow_origin(Any));
  }
  let origins = origins
    .iter()
    .map(|o| HeaderValue::from_str(o.trim()))
    .collect::<Result<Vec<_>, _>>()?;
  Ok(layer.allow_origin(AllowOrigin::list(origins)))
}
