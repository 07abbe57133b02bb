//! Error types for `vaxtrack-core`.
//!
//! Every rule violation the core can detect has its own variant carrying
//! enough structure for a caller to act on it (which students, how many doses
//! remain, which rows failed).

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  drive::DriveStatus,
  import::{ImportReport, RowError},
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("vaccination drive not found: {0}")]
  DriveNotFound(Uuid),

  #[error("student not found: {0}")]
  StudentNotFound(Uuid),

  #[error("unknown student record(s): {}", join_ids(.0))]
  UnknownStudents(Vec<Uuid>),

  #[error(
    "drives must be scheduled at least 15 days in advance \
     (requested {date}, earliest allowed {earliest})"
  )]
  SchedulingTooSoon { date: NaiveDate, earliest: NaiveDate },

  #[error("a vaccination drive is already scheduled for {0}")]
  DateConflict(NaiveDate),

  #[error("drive date {0} has already passed")]
  DriveInPast(NaiveDate),

  #[error("cannot record vaccinations for a drive on {date} (today is {today})")]
  DriveNotYetDue { date: NaiveDate, today: NaiveDate },

  #[error("vaccination drive {0} is cancelled")]
  Cancelled(Uuid),

  #[error("vaccination drive {id} is {status} and can no longer be changed")]
  DriveClosed { id: Uuid, status: DriveStatus },

  #[error(
    "not enough doses available: {remaining} remaining, {requested} requested"
  )]
  InsufficientDoses { remaining: u32, requested: usize },

  #[error("{} student(s) already vaccinated in this drive", .0.len())]
  AlreadyVaccinated(Vec<Uuid>),

  #[error("{} student(s) not in a grade covered by this drive", .0.len())]
  NotEligible(Vec<Uuid>),

  #[error("no students supplied")]
  EmptyBatch,

  #[error("{0} vaccination(s) are recorded against this record")]
  HasVaccinations(u32),

  #[error("student id already exists: {0}")]
  DuplicateStudentId(String),

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("missing required column(s): {}", .missing.join(", "))]
  InvalidHeaders { missing: Vec<String> },

  #[error("{} row(s) failed validation", .0.len())]
  ValidationErrors(Vec<RowError>),

  #[error(
    "imported {} student(s), {} row(s) failed",
    .0.imported,
    .0.failed.len()
  )]
  PartialImportFailure(ImportReport),
}

impl Error {
  /// Stable machine-readable name for the failure kind.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::DriveNotFound(_) | Self::StudentNotFound(_) => "not_found",
      Self::UnknownStudents(_) => "unknown_students",
      Self::SchedulingTooSoon { .. } => "scheduling_too_soon",
      Self::DateConflict(_) => "date_conflict",
      Self::DriveInPast(_) => "drive_in_past",
      Self::DriveNotYetDue { .. } => "drive_not_yet_due",
      Self::Cancelled(_) => "cancelled",
      Self::DriveClosed { .. } => "drive_closed",
      Self::InsufficientDoses { .. } => "insufficient_doses",
      Self::AlreadyVaccinated(_) => "already_vaccinated",
      Self::NotEligible(_) => "not_eligible",
      Self::EmptyBatch => "empty_batch",
      Self::HasVaccinations(_) => "has_vaccinations",
      Self::DuplicateStudentId(_) => "duplicate_student_id",
      Self::InvalidInput(_) => "invalid_input",
      Self::InvalidHeaders { .. } => "invalid_headers",
      Self::ValidationErrors(_) => "validation_errors",
      Self::PartialImportFailure(_) => "partial_import_failure",
    }
  }
}

/// Reject a blank required text field.
pub(crate) fn required(field: &str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::InvalidInput(format!("{field} is required")));
  }
  Ok(())
}

fn join_ids(ids: &[Uuid]) -> String {
  ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(", ")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
