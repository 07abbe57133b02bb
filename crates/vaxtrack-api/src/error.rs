//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error renders as
//! `{"error": "<kind>", "message": "...", "details": {...}}`, where `details`
//! is present only for kinds that carry structure.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;
use vaxtrack_core::{Error as Rule, store::StoreError};

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Rule(#[from] Rule),

  #[error("csv error: {0}")]
  Csv(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Surface a domain rule carried by a store error as [`ApiError::Rule`];
  /// anything else is an internal failure.
  pub fn from_store<E: StoreError>(e: E) -> Self {
    match e.into_domain() {
      Ok(rule) => Self::Rule(rule),
      Err(other) => Self::Store(Box::new(other)),
    }
  }
}

impl From<vaxtrack_csv::Error> for ApiError {
  fn from(e: vaxtrack_csv::Error) -> Self {
    match e {
      vaxtrack_csv::Error::Rejected(rule) => Self::Rule(rule),
      other => Self::Csv(other.to_string()),
    }
  }
}

fn rule_status(rule: &Rule) -> StatusCode {
  match rule {
    Rule::DriveNotFound(_) | Rule::StudentNotFound(_) => StatusCode::NOT_FOUND,
    Rule::DateConflict(_)
    | Rule::AlreadyVaccinated(_)
    | Rule::InsufficientDoses { .. }
    | Rule::HasVaccinations(_)
    | Rule::DuplicateStudentId(_) => StatusCode::CONFLICT,
    Rule::PartialImportFailure(_) => StatusCode::MULTI_STATUS,
    Rule::UnknownStudents(_)
    | Rule::NotEligible(_)
    | Rule::InvalidHeaders { .. }
    | Rule::ValidationErrors(_) => StatusCode::UNPROCESSABLE_ENTITY,
    Rule::SchedulingTooSoon { .. }
    | Rule::DriveInPast(_)
    | Rule::DriveNotYetDue { .. }
    | Rule::Cancelled(_)
    | Rule::DriveClosed { .. }
    | Rule::EmptyBatch
    | Rule::InvalidInput(_) => StatusCode::BAD_REQUEST,
  }
}

fn rule_details(rule: &Rule) -> Value {
  match rule {
    Rule::DriveNotFound(id) => json!({ "drive_id": id }),
    Rule::StudentNotFound(id) => json!({ "student_id": id }),
    Rule::UnknownStudents(ids)
    | Rule::AlreadyVaccinated(ids)
    | Rule::NotEligible(ids) => json!({ "student_ids": ids }),
    Rule::SchedulingTooSoon { date, earliest } => {
      json!({ "date": date, "earliest": earliest })
    }
    Rule::DateConflict(date) | Rule::DriveInPast(date) => json!({ "date": date }),
    Rule::DriveNotYetDue { date, today } => json!({ "date": date, "today": today }),
    Rule::Cancelled(id) => json!({ "drive_id": id }),
    Rule::DriveClosed { id, status } => json!({ "drive_id": id, "status": status }),
    Rule::InsufficientDoses { remaining, requested } => {
      json!({ "remaining": remaining, "requested": requested })
    }
    Rule::HasVaccinations(count) => json!({ "vaccinations": count }),
    Rule::DuplicateStudentId(sid) => json!({ "student_id": sid }),
    Rule::InvalidHeaders { missing } => json!({ "missing": missing }),
    Rule::ValidationErrors(errors) => json!({ "errors": errors }),
    Rule::PartialImportFailure(report) => json!(report),
    Rule::EmptyBatch | Rule::InvalidInput(_) => Value::Null,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, kind, details) = match &self {
      ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request", Value::Null),
      ApiError::Rule(rule) => {
        tracing::warn!(kind = rule.kind(), "{rule}");
        (rule_status(rule), rule.kind(), rule_details(rule))
      }
      ApiError::Csv(_) => (StatusCode::BAD_REQUEST, "invalid_csv", Value::Null),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal", Value::Null)
      }
    };

    let mut body = json!({ "error": kind, "message": self.to_string() });
    if !details.is_null() {
      body["details"] = details;
    }
    (status, Json(body)).into_response()
  }
}
