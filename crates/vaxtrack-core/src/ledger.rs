//! The vaccination ledger: one row per (student, drive) pair.
//!
//! Recording is planned here as a pure function over a [`LedgerSnapshot`]
//! the store reads inside its write transaction. The store only persists
//! what [`plan_recording`] returns.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  drive::{Drive, DriveSummary},
  student::Student,
};

pub const DEFAULT_ADMINISTERED_BY: &str = "School Coordinator";

/// A single administered dose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vaccination {
  pub id:              Uuid,
  /// Record id of the student, not the school-issued identifier.
  pub student:         Uuid,
  pub drive_id:        Uuid,
  pub date:            NaiveDate,
  pub administered_by: String,
  pub notes:           Option<String>,
  /// The student's grade at the moment of recording.
  pub grade:           String,
}

// ─── Request ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordRequest {
  #[serde(alias = "studentIds")]
  pub student_ids:     Vec<Uuid>,
  #[serde(default, alias = "administeredBy")]
  pub administered_by: Option<String>,
  #[serde(default)]
  pub notes:           Option<String>,
}

impl RecordRequest {
  pub fn validate(&self) -> Result<()> {
    if self.student_ids.is_empty() {
      return Err(Error::EmptyBatch);
    }
    let mut seen = HashSet::with_capacity(self.student_ids.len());
    if let Some(dup) = self.student_ids.iter().find(|id| !seen.insert(**id)) {
      return Err(Error::InvalidInput(format!(
        "student {dup} appears more than once in the request"
      )));
    }
    Ok(())
  }

  fn administered_by(&self) -> String {
    self
      .administered_by
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .unwrap_or(DEFAULT_ADMINISTERED_BY)
      .to_owned()
  }
}

// ─── Planning ────────────────────────────────────────────────────────────────

/// What the store read about the request, inside the transaction.
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
  /// Current ledger size for the drive.
  pub recorded:           u32,
  /// Requested students that already hold a row for this drive.
  pub already_vaccinated: Vec<Uuid>,
  /// Requested students that exist.
  pub students:           Vec<Student>,
}

/// Check a recording request against the drive and the ledger and produce
/// the rows to insert.
///
/// Checks run in a fixed order so the reported failure is deterministic:
/// timing, cancellation, capacity, duplicates, existence, grade.
/// The request is expected to have passed [`RecordRequest::validate`] and the
/// drive to exist.
pub fn plan_recording(
  drive: &Drive,
  today: NaiveDate,
  request: &RecordRequest,
  snapshot: &LedgerSnapshot,
) -> Result<Vec<Vaccination>> {
  drive.ensure_recordable(today)?;

  let remaining = drive.total_doses.saturating_sub(snapshot.recorded);
  let requested = request.student_ids.len();
  if requested > remaining as usize {
    return Err(Error::InsufficientDoses { remaining, requested });
  }

  if !snapshot.already_vaccinated.is_empty() {
    let mut ids = snapshot.already_vaccinated.clone();
    ids.sort();
    return Err(Error::AlreadyVaccinated(ids));
  }

  let known: HashSet<Uuid> = snapshot.students.iter().map(|s| s.id).collect();
  let unknown: Vec<Uuid> = request
    .student_ids
    .iter()
    .copied()
    .filter(|id| !known.contains(id))
    .collect();
  if !unknown.is_empty() {
    return Err(Error::UnknownStudents(unknown));
  }

  let ineligible: Vec<Uuid> = snapshot
    .students
    .iter()
    .filter(|s| !drive.admits_grade(&s.grade))
    .map(|s| s.id)
    .collect();
  if !ineligible.is_empty() {
    return Err(Error::NotEligible(ineligible));
  }

  let administered_by = request.administered_by();
  let notes = request
    .notes
    .as_deref()
    .map(str::trim)
    .filter(|n| !n.is_empty())
    .map(str::to_owned);

  Ok(
    snapshot
      .students
      .iter()
      .map(|s| Vaccination {
        id: Uuid::new_v4(),
        student: s.id,
        drive_id: drive.id,
        date: today,
        administered_by: administered_by.clone(),
        notes: notes.clone(),
        grade: s.grade.clone(),
      })
      .collect(),
  )
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// A ledger row joined with the student it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
  #[serde(flatten)]
  pub vaccination: Vaccination,
  #[serde(rename = "student_record")]
  pub student:     Student,
}

/// A drive with its full ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveDetail {
  #[serde(flatten)]
  pub summary:      DriveSummary,
  pub vaccinations: Vec<LedgerEntry>,
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::drive::DriveStatus;

  fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn drive(date: NaiveDate, total: u32) -> Drive {
    Drive {
      id: Uuid::new_v4(),
      name: "Hep B".into(),
      vaccine_name: "Hepatitis B".into(),
      date,
      total_doses: total,
      available_doses: total,
      applicable_grades: vec!["5".into()],
      status: DriveStatus::Scheduled,
      description: None,
      created_at: Utc::now(),
    }
  }

  fn student(grade: &str) -> Student {
    Student {
      id: Uuid::new_v4(),
      student_id: format!("S-{}", Uuid::new_v4().simple()),
      name: "Asha".into(),
      date_of_birth: None,
      gender: None,
      grade: grade.into(),
      section: None,
      parent_name: None,
      contact_number: None,
      address: None,
      created_at: Utc::now(),
    }
  }

  fn request(students: &[&Student]) -> RecordRequest {
    RecordRequest {
      student_ids: students.iter().map(|s| s.id).collect(),
      ..Default::default()
    }
  }

  #[test]
  fn validate_rejects_empty_and_duplicate_batches() {
    assert!(matches!(
      RecordRequest::default().validate(),
      Err(Error::EmptyBatch)
    ));
    let id = Uuid::new_v4();
    let req = RecordRequest { student_ids: vec![id, id], ..Default::default() };
    assert!(matches!(req.validate(), Err(Error::InvalidInput(_))));
  }

  #[test]
  fn plans_one_row_per_student_with_grade_snapshot() {
    let today = day(2025, 3, 10);
    let d = drive(today, 5);
    let (a, b) = (student("5"), student("5"));
    let snapshot = LedgerSnapshot {
      students: vec![a.clone(), b.clone()],
      ..Default::default()
    };
    let rows = plan_recording(&d, today, &request(&[&a, &b]), &snapshot).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.grade == "5" && r.date == today));
    assert!(rows.iter().all(|r| r.administered_by == DEFAULT_ADMINISTERED_BY));
  }

  #[test]
  fn capacity_is_checked_before_duplicates() {
    let today = day(2025, 3, 10);
    let d = drive(today, 2);
    let (a, b) = (student("5"), student("5"));
    let snapshot = LedgerSnapshot {
      recorded:           1,
      already_vaccinated: vec![a.id],
      students:           vec![a.clone(), b.clone()],
    };
    let err = plan_recording(&d, today, &request(&[&a, &b]), &snapshot).unwrap_err();
    assert!(matches!(
      err,
      Error::InsufficientDoses { remaining: 1, requested: 2 }
    ));
  }

  #[test]
  fn already_vaccinated_rejects_whole_batch() {
    let today = day(2025, 3, 10);
    let d = drive(today, 10);
    let (a, b) = (student("5"), student("5"));
    let snapshot = LedgerSnapshot {
      recorded:           1,
      already_vaccinated: vec![a.id],
      students:           vec![a.clone(), b.clone()],
    };
    let err = plan_recording(&d, today, &request(&[&a, &b]), &snapshot).unwrap_err();
    assert!(matches!(err, Error::AlreadyVaccinated(ids) if ids == vec![a.id]));
  }

  #[test]
  fn unknown_and_ineligible_students_are_named() {
    let today = day(2025, 3, 10);
    let d = drive(today, 10);
    let a = student("5");
    let ghost = student("5");
    let snapshot = LedgerSnapshot { students: vec![a.clone()], ..Default::default() };
    let err =
      plan_recording(&d, today, &request(&[&a, &ghost]), &snapshot).unwrap_err();
    assert!(matches!(err, Error::UnknownStudents(ids) if ids == vec![ghost.id]));

    let senior = student("9");
    let snapshot = LedgerSnapshot { students: vec![senior.clone()], ..Default::default() };
    let err = plan_recording(&d, today, &request(&[&senior]), &snapshot).unwrap_err();
    assert!(matches!(err, Error::NotEligible(ids) if ids == vec![senior.id]));
  }

  #[test]
  fn grace_window_accepts_tomorrows_drive() {
    let today = day(2025, 3, 10);
    let d = drive(day(2025, 3, 11), 10);
    let a = student("5");
    let snapshot = LedgerSnapshot { students: vec![a.clone()], ..Default::default() };
    let rows = plan_recording(&d, today, &request(&[&a]), &snapshot).unwrap();
    assert_eq!(rows[0].date, today);

    let later = drive(day(2025, 3, 12), 10);
    assert!(matches!(
      plan_recording(&later, today, &request(&[&a]), &snapshot),
      Err(Error::DriveNotYetDue { .. })
    ));
  }
}
