//! Handlers for `/students` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/students` | `?name=`, `?grade=5,6`, `?student_id=`, `?vaccination_status=&drive_id=` |
//! | `POST`   | `/students` | 409 on a duplicate `student_id` |
//! | `POST`   | `/students/bulk-import` | `file` part of a multipart form, or a raw CSV body |
//! | `GET`    | `/students/{id}` | Student plus vaccinations |
//! | `PUT`    | `/students/{id}` | Partial update |
//! | `DELETE` | `/students/{id}` | 409 while vaccinations reference the student |

use axum::{
  Json,
  extract::{FromRequest, Multipart, Path, Query, Request, State},
  http::{StatusCode, header},
  response::IntoResponse,
};
use bytes::Bytes;
use serde::Deserialize;
use uuid::Uuid;
use vaxtrack_core::{
  Error as Rule,
  import::{self, ImportReport},
  store::VaccinationStore,
  student::{
    NewStudent, Student, StudentPatch, StudentQuery, StudentRecord,
    VaccinationStatus,
  },
};

use crate::{ApiState, Principal, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub name:               Option<String>,
  /// Comma-separated grade labels.
  pub grade:              Option<String>,
  #[serde(alias = "studentId")]
  pub student_id:         Option<String>,
  #[serde(alias = "vaccinationStatus")]
  pub vaccination_status: Option<VaccinationStatus>,
  #[serde(alias = "driveId", alias = "vaccineId")]
  pub drive_id:           Option<Uuid>,
}

impl From<ListParams> for StudentQuery {
  fn from(p: ListParams) -> Self {
    let blank_to_none =
      |v: Option<String>| v.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty());
    StudentQuery {
      name:               blank_to_none(p.name),
      grades:             p
        .grade
        .map(|g| {
          g.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
        })
        .unwrap_or_default(),
      student_id:         blank_to_none(p.student_id),
      vaccination_status: p.vaccination_status,
      drive_id:           p.drive_id,
    }
  }
}

/// `GET /students`
pub async fn list<S: VaccinationStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Student>>, ApiError> {
  let query = StudentQuery::from(params);
  let students = state
    .store
    .list_students(&query)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(students))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /students`
pub async fn create<S: VaccinationStore>(
  State(state): State<ApiState<S>>,
  principal: Principal,
  Json(body): Json<NewStudent>,
) -> Result<impl IntoResponse, ApiError> {
  let student = state
    .store
    .add_student(body)
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(%principal, student = %student.student_id, "student added");
  Ok((StatusCode::CREATED, Json(student)))
}

/// Form field that carries the roster in a multipart upload.
const UPLOAD_FIELD: &str = "file";

/// The uploaded CSV bytes: the `file` part of a `multipart/form-data` body,
/// or the body itself for any other content type.
async fn read_upload(req: Request) -> Result<Bytes, ApiError> {
  let is_multipart = req
    .headers()
    .get(header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .is_some_and(|ct| ct.trim_start().starts_with("multipart/form-data"));

  if !is_multipart {
    return Bytes::from_request(req, &())
      .await
      .map_err(|e| ApiError::BadRequest(e.body_text()));
  }

  let mut form = Multipart::from_request(req, &())
    .await
    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
  while let Some(field) = form
    .next_field()
    .await
    .map_err(|e| ApiError::BadRequest(e.body_text()))?
  {
    if field.name() == Some(UPLOAD_FIELD) {
      return field
        .bytes()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()));
    }
  }
  Err(ApiError::BadRequest(format!(
    "multipart upload has no `{UPLOAD_FIELD}` part"
  )))
}

/// `POST /students/bulk-import`
///
/// Returns 201 with the import summary when every row lands, 207 with the
/// same summary when some rows were refused by the store.
pub async fn bulk_import<S: VaccinationStore>(
  State(state): State<ApiState<S>>,
  principal: Principal,
  req: Request,
) -> Result<impl IntoResponse, ApiError> {
  let body = read_upload(req).await?;
  let text = std::str::from_utf8(&body)
    .map_err(|_| ApiError::BadRequest("upload is not valid UTF-8".to_owned()))?;
  let rows = vaxtrack_csv::parse_students(text)?;
  let batch = rows.len();
  let report: ImportReport = import::commit(&*state.store, rows).await?;
  tracing::info!(%principal, batch, imported = report.imported, "roster imported");
  Ok((StatusCode::CREATED, Json(report)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /students/{id}`
pub async fn get_one<S: VaccinationStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<StudentRecord>, ApiError> {
  let record = state
    .store
    .get_student(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(Rule::StudentNotFound(id))?;
  Ok(Json(record))
}

// ─── Update / delete ─────────────────────────────────────────────────────────

/// `PUT /students/{id}`
pub async fn update<S: VaccinationStore>(
  State(state): State<ApiState<S>>,
  principal: Principal,
  Path(id): Path<Uuid>,
  Json(patch): Json<StudentPatch>,
) -> Result<Json<Student>, ApiError> {
  let student = state
    .store
    .update_student(id, patch)
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(%principal, student = %id, "student updated");
  Ok(Json(student))
}

/// `DELETE /students/{id}`
pub async fn remove<S: VaccinationStore>(
  State(state): State<ApiState<S>>,
  principal: Principal,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state
    .store
    .delete_student(id)
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(%principal, student = %id, "student deleted");
  Ok(StatusCode::NO_CONTENT)
}
