//! The `VaccinationStore` trait.
//!
//! Implemented by storage backends (e.g. `vaxtrack-store-sqlite`). The HTTP
//! layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  dashboard::DashboardStats,
  drive::{Drive, DrivePatch, DriveQuery, DriveSummary, NewDrive},
  ledger::{DriveDetail, RecordRequest},
  report::{ReportPage, ReportQuery, ReportRow},
  student::{NewStudent, Student, StudentPatch, StudentQuery, StudentRecord},
};

/// A backend error that may carry a domain rule violation.
pub trait StoreError: std::error::Error + Send + Sync + Sized + 'static {
  /// Recover the [`crate::Error`] this failure represents, if it is one.
  fn into_domain(self) -> Result<crate::Error, Self>;
}

/// Abstraction over a vaxtrack storage backend.
///
/// Every method that depends on the calendar takes `today` explicitly so the
/// caller owns the clock. All methods return `Send` futures so the trait can
/// be used behind `axum` on a multi-threaded runtime.
pub trait VaccinationStore: Send + Sync {
  type Error: StoreError;

  // ── Students ──────────────────────────────────────────────────────────

  fn add_student(
    &self,
    input: NewStudent,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  /// The student and their vaccinations. `None` if not found.
  fn get_student(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<StudentRecord>, Self::Error>> + Send + '_;

  fn list_students<'a>(
    &'a self,
    query: &'a StudentQuery,
  ) -> impl Future<Output = Result<Vec<Student>, Self::Error>> + Send + 'a;

  fn update_student(
    &self,
    id: Uuid,
    patch: StudentPatch,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  /// Fails with `HasVaccinations` while any ledger row references the
  /// student.
  fn delete_student(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Drives ────────────────────────────────────────────────────────────

  fn create_drive(
    &self,
    input: NewDrive,
    today: NaiveDate,
  ) -> impl Future<Output = Result<Drive, Self::Error>> + Send + '_;

  /// The drive and its full ledger. `None` if not found.
  fn get_drive(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<DriveDetail>, Self::Error>> + Send + '_;

  fn list_drives<'a>(
    &'a self,
    query: &'a DriveQuery,
    today: NaiveDate,
  ) -> impl Future<Output = Result<Vec<DriveSummary>, Self::Error>> + Send + 'a;

  fn update_drive(
    &self,
    id: Uuid,
    patch: DrivePatch,
    today: NaiveDate,
  ) -> impl Future<Output = Result<Drive, Self::Error>> + Send + '_;

  fn delete_drive(
    &self,
    id: Uuid,
    today: NaiveDate,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn cancel_drive(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Drive, Self::Error>> + Send + '_;

  // ── Ledger ────────────────────────────────────────────────────────────

  /// Students the drive may still vaccinate. See
  /// [`crate::eligibility::resolve`].
  fn eligible_students(
    &self,
    drive_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Student>, Self::Error>> + Send + '_;

  /// Record a batch atomically. Either every requested student gets a row
  /// and the drive's dose projection is refreshed, or nothing changes.
  fn record_vaccinations(
    &self,
    drive_id: Uuid,
    request: RecordRequest,
    today: NaiveDate,
  ) -> impl Future<Output = Result<DriveDetail, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn dashboard(
    &self,
    today: NaiveDate,
  ) -> impl Future<Output = Result<DashboardStats, Self::Error>> + Send + '_;

  /// Drives dated on or before today, newest first.
  fn recent_drives(
    &self,
    today: NaiveDate,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<DriveSummary>, Self::Error>> + Send + '_;

  /// Scheduled drives dated after today, soonest first.
  fn upcoming_drives(
    &self,
    today: NaiveDate,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<DriveSummary>, Self::Error>> + Send + '_;

  /// One page of the ledger report, honouring `limit`/`offset`.
  fn report<'a>(
    &'a self,
    query: &'a ReportQuery,
  ) -> impl Future<Output = Result<ReportPage, Self::Error>> + Send + 'a;

  /// Every matching report row, ignoring paging.
  fn report_all<'a>(
    &'a self,
    query: &'a ReportQuery,
  ) -> impl Future<Output = Result<Vec<ReportRow>, Self::Error>> + Send + 'a;
}
