//! [`SqliteStore`], the SQLite implementation of [`VaccinationStore`].

use std::path::Path;

use chrono::{NaiveDate, Utc};
use rusqlite::TransactionBehavior;
use tracing::{debug, info};
use uuid::Uuid;
use vaxtrack_core::{
  Error as CoreError,
  dashboard::DashboardStats,
  drive::{Drive, DrivePatch, DriveQuery, DriveSummary, NewDrive},
  eligibility,
  ledger::{DriveDetail, LedgerSnapshot, RecordRequest, plan_recording},
  report::{ReportPage, ReportQuery, ReportRow},
  store::VaccinationStore,
  student::{NewStudent, Student, StudentPatch, StudentQuery, StudentRecord},
};

use crate::{Result, queries, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A vaxtrack store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection handle is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_owned();
    debug!(path = %path.display(), "opening sqlite store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection thread, surfacing both database and domain
  /// failures as [`crate::Error`].
  async fn with_conn<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut rusqlite::Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }
}

// ─── VaccinationStore impl ───────────────────────────────────────────────────

impl VaccinationStore for SqliteStore {
  type Error = crate::Error;

  // ── Students ──────────────────────────────────────────────────────────────

  async fn add_student(&self, input: NewStudent) -> Result<Student> {
    input.validate()?;
    let student = input.into_student(Utc::now());
    self
      .with_conn(move |conn| {
        queries::insert_student(conn, &student)?;
        Ok(student)
      })
      .await
  }

  async fn get_student(&self, id: Uuid) -> Result<Option<StudentRecord>> {
    self
      .with_conn(move |conn| {
        let Some(student) = queries::fetch_student(conn, id)? else {
          return Ok(None);
        };
        let vaccinations = queries::student_vaccinations(conn, id)?;
        Ok(Some(StudentRecord { student, vaccinations }))
      })
      .await
  }

  async fn list_students(&self, query: &StudentQuery) -> Result<Vec<Student>> {
    let query = query.clone();
    self
      .with_conn(move |conn| queries::search_students(conn, &query))
      .await
  }

  async fn update_student(&self, id: Uuid, patch: StudentPatch) -> Result<Student> {
    self
      .with_conn(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut student = queries::fetch_student(&tx, id)?
          .ok_or(CoreError::StudentNotFound(id))?;
        patch.apply(&mut student)?;
        queries::update_student(&tx, &student)?;
        tx.commit()?;
        Ok(student)
      })
      .await
  }

  async fn delete_student(&self, id: Uuid) -> Result<()> {
    self
      .with_conn(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if queries::fetch_student(&tx, id)?.is_none() {
          return Err(CoreError::StudentNotFound(id).into());
        }
        let recorded = queries::student_ledger_count(&tx, id)?;
        if recorded > 0 {
          return Err(CoreError::HasVaccinations(recorded).into());
        }
        queries::delete_student(&tx, id)?;
        tx.commit()?;
        Ok(())
      })
      .await
  }

  // ── Drives ────────────────────────────────────────────────────────────────

  async fn create_drive(&self, input: NewDrive, today: NaiveDate) -> Result<Drive> {
    input.validate(today)?;
    let drive = input.into_drive(Utc::now());
    self
      .with_conn(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if queries::date_taken(&tx, drive.date, None)? {
          return Err(CoreError::DateConflict(drive.date).into());
        }
        queries::insert_drive(&tx, &drive)?;
        tx.commit()?;
        Ok(drive)
      })
      .await
  }

  async fn get_drive(&self, id: Uuid) -> Result<Option<DriveDetail>> {
    self.with_conn(move |conn| queries::drive_detail(conn, id)).await
  }

  async fn list_drives(
    &self,
    query: &DriveQuery,
    today: NaiveDate,
  ) -> Result<Vec<DriveSummary>> {
    let query = query.clone();
    self
      .with_conn(move |conn| queries::search_drives(conn, &query, today))
      .await
  }

  async fn update_drive(
    &self,
    id: Uuid,
    patch: DrivePatch,
    today: NaiveDate,
  ) -> Result<Drive> {
    self
      .with_conn(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut drive =
          queries::fetch_drive(&tx, id)?.ok_or(CoreError::DriveNotFound(id))?;
        drive.ensure_editable(today)?;
        if let Some(date) = patch.moved_date(&drive) {
          // Lead time first, so a too-early date reports that rather than a
          // clash.
          vaxtrack_core::drive::check_lead_time(date, today)?;
          if queries::date_taken(&tx, date, Some(id))? {
            return Err(CoreError::DateConflict(date).into());
          }
        }
        let recorded = queries::ledger_count(&tx, id)?;
        patch.apply(&mut drive, recorded, today)?;
        queries::update_drive(&tx, &drive)?;
        tx.commit()?;
        Ok(drive)
      })
      .await
  }

  async fn delete_drive(&self, id: Uuid, today: NaiveDate) -> Result<()> {
    self
      .with_conn(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let drive =
          queries::fetch_drive(&tx, id)?.ok_or(CoreError::DriveNotFound(id))?;
        drive.ensure_editable(today)?;
        let recorded = queries::ledger_count(&tx, id)?;
        if recorded > 0 {
          return Err(CoreError::HasVaccinations(recorded).into());
        }
        queries::delete_drive(&tx, id)?;
        tx.commit()?;
        Ok(())
      })
      .await
  }

  async fn cancel_drive(&self, id: Uuid) -> Result<Drive> {
    self
      .with_conn(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut drive =
          queries::fetch_drive(&tx, id)?.ok_or(CoreError::DriveNotFound(id))?;
        drive.cancel()?;
        queries::update_drive(&tx, &drive)?;
        tx.commit()?;
        Ok(drive)
      })
      .await
  }

  // ── Ledger ────────────────────────────────────────────────────────────────

  async fn eligible_students(&self, drive_id: Uuid) -> Result<Vec<Student>> {
    self
      .with_conn(move |conn| {
        let drive = queries::fetch_drive(conn, drive_id)?
          .ok_or(CoreError::DriveNotFound(drive_id))?;
        let vaccinated = queries::vaccinated_set(conn, drive_id)?;
        let students = queries::all_students(conn)?;
        Ok(eligibility::resolve(&drive, students, &vaccinated))
      })
      .await
  }

  async fn record_vaccinations(
    &self,
    drive_id: Uuid,
    request: RecordRequest,
    today: NaiveDate,
  ) -> Result<DriveDetail> {
    request.validate()?;
    self
      .with_conn(move |conn| {
        // IMMEDIATE takes the write lock up front, so the ledger count read
        // below cannot go stale before the inserts.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut drive = queries::fetch_drive(&tx, drive_id)?
          .ok_or(CoreError::DriveNotFound(drive_id))?;

        let snapshot = LedgerSnapshot {
          recorded:           queries::ledger_count(&tx, drive_id)?,
          already_vaccinated: queries::vaccinated_among(
            &tx,
            drive_id,
            &request.student_ids,
          )?,
          students:           queries::students_by_ids(&tx, &request.student_ids)?,
        };
        let rows = plan_recording(&drive, today, &request, &snapshot)?;
        for row in &rows {
          queries::insert_vaccination(&tx, row)?;
        }
        drive.refresh_doses(snapshot.recorded + rows.len() as u32);
        queries::update_drive(&tx, &drive)?;
        tx.commit()?;

        info!(
          drive = %drive_id,
          recorded = rows.len(),
          available = drive.available_doses,
          status = %drive.status,
          "vaccinations recorded"
        );

        queries::drive_detail(conn, drive_id)?
          .ok_or(CoreError::DriveNotFound(drive_id).into())
      })
      .await
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn dashboard(&self, today: NaiveDate) -> Result<DashboardStats> {
    self.with_conn(move |conn| queries::dashboard(conn, today)).await
  }

  async fn recent_drives(
    &self,
    today: NaiveDate,
    limit: usize,
  ) -> Result<Vec<DriveSummary>> {
    self
      .with_conn(move |conn| queries::recent_drives(conn, today, limit))
      .await
  }

  async fn upcoming_drives(
    &self,
    today: NaiveDate,
    limit: usize,
  ) -> Result<Vec<DriveSummary>> {
    self
      .with_conn(move |conn| queries::upcoming_drives(conn, today, limit))
      .await
  }

  async fn report(&self, query: &ReportQuery) -> Result<ReportPage> {
    let query = query.clone();
    self
      .with_conn(move |conn| {
        Ok(ReportPage {
          total: queries::report_count(conn, &query)?,
          rows:  queries::report_rows(conn, &query, true)?,
        })
      })
      .await
  }

  async fn report_all(&self, query: &ReportQuery) -> Result<Vec<ReportRow>> {
    let query = query.clone();
    self
      .with_conn(move |conn| queries::report_rows(conn, &query, false))
      .await
  }
}
