//! Handlers for `/drives` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/drives` | Optional `?status=`, `?upcoming=true`, `?past=true` |
//! | `POST`   | `/drives` | 15-day lead time, one live drive per date |
//! | `GET`    | `/drives/{id}` | Drive plus its full ledger |
//! | `PUT`    | `/drives/{id}` | Partial update; only while upcoming |
//! | `DELETE` | `/drives/{id}` | Only while upcoming and empty |
//! | `POST`   | `/drives/{id}/cancel` | Frees the date |
//! | `GET`    | `/drives/{id}/eligible` | Students still to vaccinate |
//! | `POST`   | `/drives/{id}/vaccinate` | Body: `{"student_ids":[...]}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use uuid::Uuid;
use vaxtrack_core::{
  Error as Rule,
  drive::{Drive, DrivePatch, DriveQuery, DriveSummary, NewDrive},
  ledger::{DriveDetail, RecordRequest},
  store::VaccinationStore,
  student::Student,
};

use crate::{ApiState, Principal, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /drives`
pub async fn list<S: VaccinationStore>(
  State(state): State<ApiState<S>>,
  Query(query): Query<DriveQuery>,
) -> Result<Json<Vec<DriveSummary>>, ApiError> {
  let today = state.clock.today();
  let drives = state
    .store
    .list_drives(&query, today)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(drives))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /drives`
pub async fn create<S: VaccinationStore>(
  State(state): State<ApiState<S>>,
  principal: Principal,
  Json(body): Json<NewDrive>,
) -> Result<impl IntoResponse, ApiError> {
  let drive = state
    .store
    .create_drive(body, state.clock.today())
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(%principal, drive = %drive.id, date = %drive.date, "drive scheduled");
  Ok((StatusCode::CREATED, Json(drive)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /drives/{id}`
pub async fn get_one<S: VaccinationStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<DriveDetail>, ApiError> {
  let detail = state
    .store
    .get_drive(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(Rule::DriveNotFound(id))?;
  Ok(Json(detail))
}

// ─── Update / delete / cancel ────────────────────────────────────────────────

/// `PUT /drives/{id}`
pub async fn update<S: VaccinationStore>(
  State(state): State<ApiState<S>>,
  principal: Principal,
  Path(id): Path<Uuid>,
  Json(patch): Json<DrivePatch>,
) -> Result<Json<Drive>, ApiError> {
  let drive = state
    .store
    .update_drive(id, patch, state.clock.today())
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(%principal, drive = %id, "drive updated");
  Ok(Json(drive))
}

/// `DELETE /drives/{id}`
pub async fn remove<S: VaccinationStore>(
  State(state): State<ApiState<S>>,
  principal: Principal,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state
    .store
    .delete_drive(id, state.clock.today())
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(%principal, drive = %id, "drive deleted");
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /drives/{id}/cancel`
pub async fn cancel<S: VaccinationStore>(
  State(state): State<ApiState<S>>,
  principal: Principal,
  Path(id): Path<Uuid>,
) -> Result<Json<Drive>, ApiError> {
  let drive = state
    .store
    .cancel_drive(id)
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(%principal, drive = %id, "drive cancelled");
  Ok(Json(drive))
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// `GET /drives/{id}/eligible`
pub async fn eligible<S: VaccinationStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Student>>, ApiError> {
  let students = state
    .store
    .eligible_students(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(students))
}

/// `POST /drives/{id}/vaccinate`
pub async fn vaccinate<S: VaccinationStore>(
  State(state): State<ApiState<S>>,
  principal: Principal,
  Path(id): Path<Uuid>,
  Json(request): Json<RecordRequest>,
) -> Result<Json<DriveDetail>, ApiError> {
  let batch = request.student_ids.len();
  let detail = state
    .store
    .record_vaccinations(id, request, state.clock.today())
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(%principal, drive = %id, batch, "batch recorded");
  Ok(Json(detail))
}
