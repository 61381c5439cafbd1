//! `GET /api/analytics/dashboard`: headline counts for the landing page.

use axum::extract::State;
use fibreflow_core::{analytics::DashboardSummary, store::AnalyticsStore};

use crate::{
  AppState,
  error::{ApiError, ApiResult},
  response::Success,
};

pub async fn dashboard<S: AnalyticsStore>(
  State(state): State<AppState<S>>,
) -> ApiResult<Success<DashboardSummary>> {
  let summary = state.store.dashboard_summary().await.map_err(ApiError::store)?;
  Ok(Success::ok(summary))
}
