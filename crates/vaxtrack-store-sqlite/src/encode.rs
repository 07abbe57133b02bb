//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339, calendar dates `YYYY-MM-DD`, UUIDs hyphenated
//! lowercase, and grade sets compact JSON arrays.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use uuid::Uuid;
use vaxtrack_core::{
  drive::{Drive, DriveStatus, DriveSummary},
  ledger::Vaccination,
  report::ReportRow,
  student::{Gender, Student},
};

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("date {s:?}: {e}")))
}

pub fn encode_grades(grades: &[String]) -> Result<String> {
  Ok(serde_json::to_string(grades)?)
}

pub fn decode_grades(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

fn decode_status(s: &str) -> Result<DriveStatus> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown drive status: {s:?}")))
}

fn decode_gender(s: &str) -> Result<Gender> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown gender: {s:?}")))
}

// ─── Column lists ────────────────────────────────────────────────────────────

pub const STUDENT_COLUMNS: &str = "s.id, s.student_id, s.name, \
  s.date_of_birth, s.gender, s.grade, s.section, s.parent_name, \
  s.contact_number, s.address, s.created_at";

pub const DRIVE_COLUMNS: &str = "d.id, d.name, d.vaccine_name, d.date, \
  d.total_doses, d.available_doses, d.applicable_grades, d.status, \
  d.description, d.created_at";

pub const VACCINATION_COLUMNS: &str =
  "v.id, v.student, v.drive_id, v.date, v.administered_by, v.notes, v.grade";

/// Correlated ledger count, selectable alongside [`DRIVE_COLUMNS`].
pub const VACCINATED_COUNT: &str =
  "(SELECT COUNT(*) FROM vaccinations vc WHERE vc.drive_id = d.id)";

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read from a `students` row.
pub struct RawStudent {
  pub id:             String,
  pub student_id:     String,
  pub name:           String,
  pub date_of_birth:  Option<String>,
  pub gender:         Option<String>,
  pub grade:          String,
  pub section:        Option<String>,
  pub parent_name:    Option<String>,
  pub contact_number: Option<String>,
  pub address:        Option<String>,
  pub created_at:     String,
}

impl RawStudent {
  /// Read [`STUDENT_COLUMNS`] starting at column `at`.
  pub fn read(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(at)?,
      student_id:     row.get(at + 1)?,
      name:           row.get(at + 2)?,
      date_of_birth:  row.get(at + 3)?,
      gender:         row.get(at + 4)?,
      grade:          row.get(at + 5)?,
      section:        row.get(at + 6)?,
      parent_name:    row.get(at + 7)?,
      contact_number: row.get(at + 8)?,
      address:        row.get(at + 9)?,
      created_at:     row.get(at + 10)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      id:             decode_uuid(&self.id)?,
      student_id:     self.student_id,
      name:           self.name,
      date_of_birth:  self.date_of_birth.as_deref().map(decode_date).transpose()?,
      gender:         self.gender.as_deref().map(decode_gender).transpose()?,
      grade:          self.grade,
      section:        self.section,
      parent_name:    self.parent_name,
      contact_number: self.contact_number,
      address:        self.address,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read from a `drives` row.
pub struct RawDrive {
  pub id:                String,
  pub name:              String,
  pub vaccine_name:      String,
  pub date:              String,
  pub total_doses:       u32,
  pub available_doses:   u32,
  pub applicable_grades: String,
  pub status:            String,
  pub description:       Option<String>,
  pub created_at:        String,
}

impl RawDrive {
  pub const WIDTH: usize = 10;

  /// Read [`DRIVE_COLUMNS`] starting at column `at`.
  pub fn read(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                row.get(at)?,
      name:              row.get(at + 1)?,
      vaccine_name:      row.get(at + 2)?,
      date:              row.get(at + 3)?,
      total_doses:       row.get(at + 4)?,
      available_doses:   row.get(at + 5)?,
      applicable_grades: row.get(at + 6)?,
      status:            row.get(at + 7)?,
      description:       row.get(at + 8)?,
      created_at:        row.get(at + 9)?,
    })
  }

  pub fn into_drive(self) -> Result<Drive> {
    Ok(Drive {
      id:                decode_uuid(&self.id)?,
      name:              self.name,
      vaccine_name:      self.vaccine_name,
      date:              decode_date(&self.date)?,
      total_doses:       self.total_doses,
      available_doses:   self.available_doses,
      applicable_grades: decode_grades(&self.applicable_grades)?,
      status:            decode_status(&self.status)?,
      description:       self.description,
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}

/// A drive row followed by [`VACCINATED_COUNT`].
pub struct RawDriveSummary {
  pub drive:            RawDrive,
  pub vaccinated_count: u32,
}

impl RawDriveSummary {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      drive:            RawDrive::read(row, 0)?,
      vaccinated_count: row.get(RawDrive::WIDTH)?,
    })
  }

  pub fn into_summary(self) -> Result<DriveSummary> {
    Ok(DriveSummary {
      drive:            self.drive.into_drive()?,
      vaccinated_count: self.vaccinated_count,
    })
  }
}

/// Raw strings read from a `vaccinations` row.
pub struct RawVaccination {
  pub id:              String,
  pub student:         String,
  pub drive_id:        String,
  pub date:            String,
  pub administered_by: String,
  pub notes:           Option<String>,
  pub grade:           String,
}

impl RawVaccination {
  pub const WIDTH: usize = 7;

  /// Read [`VACCINATION_COLUMNS`] starting at column `at`.
  pub fn read(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(at)?,
      student:         row.get(at + 1)?,
      drive_id:        row.get(at + 2)?,
      date:            row.get(at + 3)?,
      administered_by: row.get(at + 4)?,
      notes:           row.get(at + 5)?,
      grade:           row.get(at + 6)?,
    })
  }

  pub fn into_vaccination(self) -> Result<Vaccination> {
    Ok(Vaccination {
      id:              decode_uuid(&self.id)?,
      student:         decode_uuid(&self.student)?,
      drive_id:        decode_uuid(&self.drive_id)?,
      date:            decode_date(&self.date)?,
      administered_by: self.administered_by,
      notes:           self.notes,
      grade:           self.grade,
    })
  }
}

/// One flattened report line.
pub struct RawReportRow {
  pub student_id:       String,
  pub student_name:     String,
  pub grade:            String,
  pub section:          Option<String>,
  pub vaccine_name:     String,
  pub vaccination_date: String,
  pub drive_name:       String,
  pub drive_date:       String,
  pub administered_by:  String,
}

impl RawReportRow {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      student_id:       row.get(0)?,
      student_name:     row.get(1)?,
      grade:            row.get(2)?,
      section:          row.get(3)?,
      vaccine_name:     row.get(4)?,
      vaccination_date: row.get(5)?,
      drive_name:       row.get(6)?,
      drive_date:       row.get(7)?,
      administered_by:  row.get(8)?,
    })
  }

  pub fn into_row(self) -> Result<ReportRow> {
    Ok(ReportRow {
      student_id:       self.student_id,
      student_name:     self.student_name,
      grade:            self.grade,
      section:          self.section,
      vaccine_name:     self.vaccine_name,
      vaccination_date: decode_date(&self.vaccination_date)?,
      drive_name:       self.drive_name,
      drive_date:       decode_date(&self.drive_date)?,
      administered_by:  self.administered_by,
    })
  }
}
