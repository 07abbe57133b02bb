//! Handlers for `/dashboard` endpoints.

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use vaxtrack_core::{
  dashboard::{DashboardStats, RECENT_DRIVES},
  drive::DriveSummary,
  store::VaccinationStore,
};

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct LimitParams {
  #[serde(default = "default_limit")]
  pub limit: usize,
}

fn default_limit() -> usize { RECENT_DRIVES }

/// `GET /dashboard/stats`
pub async fn stats<S: VaccinationStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<DashboardStats>, ApiError> {
  let stats = state
    .store
    .dashboard(state.clock.today())
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(stats))
}

/// `GET /dashboard/recent-drives[?limit=N]`
pub async fn recent<S: VaccinationStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<LimitParams>,
) -> Result<Json<Vec<DriveSummary>>, ApiError> {
  let drives = state
    .store
    .recent_drives(state.clock.today(), params.limit)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(drives))
}

/// `GET /dashboard/upcoming-drives[?limit=N]`
pub async fn upcoming<S: VaccinationStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<LimitParams>,
) -> Result<Json<Vec<DriveSummary>>, ApiError> {
  let drives = state
    .store
    .upcoming_drives(state.clock.today(), params.limit)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(drives))
}
